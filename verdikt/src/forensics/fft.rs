use ndarray::Array2;
use rustfft::{FftPlanner, num_complex::Complex};

/// Log-magnitude of the centered 2-D discrete Fourier transform.
///
/// The zero-frequency term is shifted to the image center before taking
/// `ln(1 + |F|)`, so low-frequency energy sits in the middle of the plane
/// and periodic generation artifacts show up as off-center peaks.
pub fn log_magnitude_spectrum(gray: &Array2<f32>) -> Array2<f32> {
    let (height, width) = gray.dim();
    let mut planner = FftPlanner::<f32>::new();
    let row_fft = planner.plan_fft_forward(width);
    let col_fft = planner.plan_fft_forward(height);

    let mut rows: Vec<Complex<f32>> = gray
        .iter()
        .map(|&value| Complex::new(value, 0.0))
        .collect();
    for row in rows.chunks_exact_mut(width) {
        row_fft.process(row);
    }

    // Column pass over the transposed buffer.
    let mut cols = vec![Complex::new(0.0, 0.0); height * width];
    for y in 0..height {
        for x in 0..width {
            cols[x * height + y] = rows[y * width + x];
        }
    }
    for col in cols.chunks_exact_mut(height) {
        col_fft.process(col);
    }

    let mut shifted = Array2::<f32>::zeros((height, width));
    for x in 0..width {
        for y in 0..height {
            let magnitude = cols[x * height + y].norm();
            let shifted_y = (y + height / 2) % height;
            let shifted_x = (x + width / 2) % width;
            shifted[[shifted_y, shifted_x]] = magnitude.ln_1p();
        }
    }
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_image_concentrates_at_center() {
        let gray = Array2::from_elem((8, 8), 0.5f32);
        let spectrum = log_magnitude_spectrum(&gray);

        // All energy of a constant signal is in the DC term, which the
        // shift places at (h/2, w/2).
        let center = spectrum[[4, 4]];
        assert!(center > 1.0);
        for ((y, x), value) in spectrum.indexed_iter() {
            if (y, x) != (4, 4) {
                assert!(*value < 1e-3, "unexpected energy at ({y},{x})");
            }
        }
    }

    #[test]
    fn output_shape_matches_input() {
        let gray = Array2::<f32>::zeros((6, 10));
        assert_eq!(log_magnitude_spectrum(&gray).dim(), (6, 10));
    }
}
