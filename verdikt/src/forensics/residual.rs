use ndarray::Array2;

/// Fixed bank of 3x3 high-pass residual kernels.
///
/// Second-difference, horizontal/vertical edge and two diagonal kernels;
/// responses expose local noise statistics that survive neither resizing
/// nor recompression the way natural sensor noise does.
pub const RESIDUAL_KERNELS: [[[f32; 3]; 3]; 5] = [
    [
        [-0.25, 0.5, -0.25],
        [0.5, -1.0, 0.5],
        [-0.25, 0.5, -0.25],
    ],
    [
        [-1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
    ],
    [
        [-1.0, -1.0, -1.0],
        [1.0, 1.0, 1.0],
        [0.0, 0.0, 0.0],
    ],
    [
        [0.0, -1.0, 1.0],
        [-1.0, 1.0, 0.0],
        [1.0, 0.0, 0.0],
    ],
    [
        [1.0, -1.0, 0.0],
        [0.0, 1.0, -1.0],
        [0.0, 0.0, 0.0],
    ],
];

// Mirror indices across the border (reflect-101: the edge sample is not
// repeated), matching the convolution border used when these kernels were
// calibrated.
fn reflect(
    index: isize,
    len: usize,
) -> usize {
    let len = len as isize;
    let mut index = index;
    if index < 0 {
        index = -index;
    }
    if index >= len {
        index = 2 * (len - 1) - index;
    }
    index.clamp(0, len - 1) as usize
}

fn correlate_3x3(
    input: &Array2<f32>,
    kernel: &[[f32; 3]; 3],
) -> Array2<f32> {
    let (height, width) = input.dim();
    let mut output = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for ky in 0..3 {
                let sy = reflect(y as isize + ky as isize - 1, height);
                for kx in 0..3 {
                    let sx = reflect(x as isize + kx as isize - 1, width);
                    acc += input[[sy, sx]] * kernel[ky][kx];
                }
            }
            output[[y, x]] = acc;
        }
    }
    output
}

/// Applies the residual bank to a grayscale plane in [0,1], returning one
/// response plane per kernel. The plane is rescaled to the 0..255 range
/// first so the responses match the magnitude the bank was designed for.
pub fn apply_residual_bank(gray: &Array2<f32>) -> Vec<Array2<f32>> {
    let scaled = gray.mapv(|value| value * 255.0);
    RESIDUAL_KERNELS
        .iter()
        .map(|kernel| correlate_3x3(&scaled, kernel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_produces_five_planes_of_input_shape() {
        let gray = Array2::from_elem((5, 7), 0.25f32);
        let responses = apply_residual_bank(&gray);
        assert_eq!(responses.len(), 5);
        for plane in &responses {
            assert_eq!(plane.dim(), (5, 7));
        }
    }

    #[test]
    fn flat_input_yields_kernel_sum_times_level() {
        let gray = Array2::from_elem((6, 6), 0.8f32);
        let responses = apply_residual_bank(&gray);
        for (kernel, plane) in RESIDUAL_KERNELS.iter().zip(&responses) {
            let kernel_sum: f32 =
                kernel.iter().flatten().copied().sum::<f32>();
            let expected = kernel_sum * 0.8 * 255.0;
            for value in plane.iter() {
                assert!((value - expected).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn reflect_mirrors_without_repeating_edge() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(0, 5), 0);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(6, 5), 2);
    }
}
