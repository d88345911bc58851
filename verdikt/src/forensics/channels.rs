use image::RgbImage;
use ndarray::{Array2, Array3, s};

use super::{fft::log_magnitude_spectrum, residual::apply_residual_bank};

/// Channels per input tensor: 3 standardized RGB planes, 1 frequency
/// plane and 5 residual-filter planes.
pub const CHANNEL_COUNT: usize = 9;

pub const REFERENCE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const REFERENCE_STD: [f32; 3] = [0.229, 0.224, 0.225];

const NORMALIZE_EPS: f32 = 1e-6;

fn grayscale_plane(image: &RgbImage) -> Array2<f32> {
    let (width, height) = image.dimensions();
    let mut gray = Array2::<f32>::zeros((height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma =
            0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        gray[[y as usize, x as usize]] = luma / 255.0;
    }
    gray
}

fn zscore_in_place(plane: &mut Array2<f32>) {
    let count = plane.len() as f32;
    let mean = plane.sum() / count;
    let variance =
        plane.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / count;
    let std = variance.sqrt() + NORMALIZE_EPS;
    plane.mapv_inplace(|v| (v - mean) / std);
}

/// Builds the channel-first input tensor for one already-transformed
/// image: standardized RGB first, then the six per-image normalized
/// forensic planes. The output shape is `(9, height, width)`.
pub fn build_input_planes(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);
    let mut planes = Array3::<f32>::zeros((CHANNEL_COUNT, height, width));

    for (x, y, pixel) in image.enumerate_pixels() {
        for channel in 0..3 {
            let value = pixel.0[channel] as f32 / 255.0;
            planes[[channel, y as usize, x as usize]] = (value
                - REFERENCE_MEAN[channel])
                / REFERENCE_STD[channel];
        }
    }

    let gray = grayscale_plane(image);
    let mut frequency = log_magnitude_spectrum(&gray);
    zscore_in_place(&mut frequency);
    planes.slice_mut(s![3, .., ..]).assign(&frequency);

    for (index, mut response) in
        apply_residual_bank(&gray).into_iter().enumerate()
    {
        zscore_in_place(&mut response);
        planes.slice_mut(s![4 + index, .., ..]).assign(&response);
    }

    planes
}

#[cfg(test)]
mod tests {
    use image::Rgb;
    use ndarray::Axis;

    use super::*;

    fn gradient_image(
        width: u32,
        height: u32,
    ) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let value = ((x * 7 + y * 13) % 256) as u8;
            Rgb([value, value.wrapping_add(40), value.wrapping_add(90)])
        })
    }

    #[test]
    fn tensor_is_nine_by_input_size() {
        let image = gradient_image(32, 32);
        let planes = build_input_planes(&image);
        assert_eq!(planes.dim(), (CHANNEL_COUNT, 32, 32));
    }

    #[test]
    fn derived_channels_are_standardized() {
        let image = gradient_image(24, 24);
        let planes = build_input_planes(&image);
        for channel in 3..CHANNEL_COUNT {
            let plane = planes.index_axis(Axis(0), channel);
            let count = plane.len() as f32;
            let mean = plane.sum() / count;
            let variance = plane
                .iter()
                .map(|v| (v - mean) * (v - mean))
                .sum::<f32>()
                / count;
            assert!(mean.abs() < 1e-3, "channel {channel} mean {mean}");
            assert!(
                (variance.sqrt() - 1.0).abs() < 1e-2,
                "channel {channel} std {}",
                variance.sqrt()
            );
        }
    }

    #[test]
    fn rgb_channels_use_reference_statistics() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 0, 128]));
        let planes = build_input_planes(&image);
        let expected_r = (1.0 - REFERENCE_MEAN[0]) / REFERENCE_STD[0];
        let expected_g = (0.0 - REFERENCE_MEAN[1]) / REFERENCE_STD[1];
        assert!((planes[[0, 0, 0]] - expected_r).abs() < 1e-5);
        assert!((planes[[1, 0, 0]] - expected_g).abs() < 1e-5);
    }
}
