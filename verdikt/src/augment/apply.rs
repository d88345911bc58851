use image::{
    Rgb, RgbImage,
    imageops::{self, FilterType},
};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use super::plan::{Augmentation, upscaled_canvas};

/// Resize so the longest side equals `size`, then pad to a centered
/// square on a black canvas.
fn fit_to_square(
    image: &RgbImage,
    size: u32,
) -> RgbImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height).max(1);
    let scaled_width = (width * size / longest).max(1);
    let scaled_height = (height * size / longest).max(1);
    let scaled = imageops::resize(
        image,
        scaled_width,
        scaled_height,
        FilterType::Triangle,
    );

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([0, 0, 0]));
    let offset_x = (size - scaled_width) / 2;
    let offset_y = (size - scaled_height) / 2;
    imageops::overlay(
        &mut canvas,
        &scaled,
        offset_x as i64,
        offset_y as i64,
    );
    canvas
}

/// Applies one plan variant to a freshly decoded image, producing a
/// `size` by `size` RGB image.
pub fn apply_augmentation(
    image: &RgbImage,
    augmentation: &Augmentation,
    size: u32,
) -> RgbImage {
    match augmentation {
        Augmentation::Fit => fit_to_square(image, size),
        Augmentation::FitFlip => {
            imageops::flip_horizontal(&fit_to_square(image, size))
        },
        Augmentation::CropFromUpscaled {
            offset_x,
            offset_y,
        } => {
            let canvas = fit_to_square(image, upscaled_canvas(size));
            imageops::crop_imm(&canvas, *offset_x, *offset_y, size, size)
                .to_image()
        },
        Augmentation::Rotate {
            degrees,
        } => {
            let fitted = fit_to_square(image, size);
            rotate_about_center(
                &fitted,
                degrees.to_radians(),
                Interpolation::Bilinear,
                Rgb([0, 0, 0]),
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(
        width: u32,
        height: u32,
    ) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    #[test]
    fn every_variant_produces_target_size() {
        let image = test_image(300, 120);
        let variants = [
            Augmentation::Fit,
            Augmentation::FitFlip,
            Augmentation::CropFromUpscaled {
                offset_x: 3,
                offset_y: 6,
            },
            Augmentation::Rotate {
                degrees: 5.0,
            },
        ];
        for variant in &variants {
            let out = apply_augmentation(&image, variant, 64);
            assert_eq!(out.dimensions(), (64, 64), "{variant:?}");
        }
    }

    #[test]
    fn fit_pads_the_short_side_with_black() {
        let image = test_image(200, 100);
        let fitted = apply_augmentation(&image, &Augmentation::Fit, 64);
        // 200x100 scales to 64x32; rows above and below the centered
        // strip stay black.
        assert_eq!(fitted.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(fitted.get_pixel(0, 63), &Rgb([0, 0, 0]));
        assert_ne!(fitted.get_pixel(32, 32), &Rgb([0, 0, 0]));
    }

    #[test]
    fn flip_mirrors_the_fitted_image() {
        let image = test_image(64, 64);
        let fitted = apply_augmentation(&image, &Augmentation::Fit, 64);
        let flipped =
            apply_augmentation(&image, &Augmentation::FitFlip, 64);
        for y in [0u32, 17, 63] {
            assert_eq!(fitted.get_pixel(0, y), flipped.get_pixel(63, y));
        }
    }
}
