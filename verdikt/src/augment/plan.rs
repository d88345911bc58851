use rand::{Rng, SeedableRng, rngs::StdRng};

/// Fixed seed for the crop variants so a plan is reproducible run to run.
const CROP_SEED: u64 = 42;

/// Factor by which the canvas is enlarged before the crop variants.
pub const CROP_UPSCALE: f32 = 1.1;

const MAX_CROP_VARIANTS: usize = 3;
const ROTATION_DEGREES: [f32; 2] = [5.0, -5.0];

/// One deterministic inference-time transform. Every variant starts from
/// the same longest-side resize and pad-to-square step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Augmentation {
    /// Resize longest side to the target, pad to square, centered.
    Fit,
    /// `Fit` followed by a horizontal flip.
    FitFlip,
    /// Fit onto a canvas enlarged by [`CROP_UPSCALE`], then crop a
    /// target-sized window at the given offset.
    CropFromUpscaled {
        offset_x: u32,
        offset_y: u32,
    },
    /// `Fit` followed by a small rotation about the center.
    Rotate {
        degrees: f32,
    },
}

/// Ordered list of transforms for one run. The first entry is always the
/// identity fit; flip and crop variants follow before the rotations, in a
/// fixed order so aggregated scores are reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationPlan {
    pub target_size: u32,
    variants: Vec<Augmentation>,
}

impl AugmentationPlan {
    /// Plan used for plain (non-augmented) inference.
    pub fn identity(target_size: u32) -> Self {
        Self::build(target_size, 1)
    }

    pub fn build(
        target_size: u32,
        count: usize,
    ) -> Self {
        let count = count.max(1);
        let mut variants = vec![Augmentation::Fit];

        if count > 1 {
            variants.push(Augmentation::FitFlip);
        }

        let canvas = upscaled_canvas(target_size);
        let max_offset = canvas - target_size;
        let mut rng = StdRng::seed_from_u64(CROP_SEED);
        while variants.len() < count
            && variants.len() < 2 + MAX_CROP_VARIANTS
        {
            variants.push(Augmentation::CropFromUpscaled {
                offset_x: rng.gen_range(0..=max_offset),
                offset_y: rng.gen_range(0..=max_offset),
            });
        }

        for degrees in ROTATION_DEGREES {
            if variants.len() < count {
                variants.push(Augmentation::Rotate {
                    degrees,
                });
            }
        }

        variants.truncate(count);
        Self {
            target_size,
            variants,
        }
    }

    pub fn variants(&self) -> &[Augmentation] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Canvas edge length for the crop variants.
pub fn upscaled_canvas(target_size: u32) -> u32 {
    (target_size as f32 * CROP_UPSCALE).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_plan_has_single_fit() {
        let plan = AugmentationPlan::identity(448);
        assert_eq!(plan.variants(), &[Augmentation::Fit]);
    }

    #[test]
    fn two_variant_plan_is_fit_then_flip() {
        let plan = AugmentationPlan::build(448, 2);
        assert_eq!(
            plan.variants(),
            &[Augmentation::Fit, Augmentation::FitFlip]
        );
    }

    #[test]
    fn five_variant_plan_fills_with_crops() {
        let plan = AugmentationPlan::build(448, 5);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.variants()[0], Augmentation::Fit);
        assert_eq!(plan.variants()[1], Augmentation::FitFlip);
        for variant in &plan.variants()[2..] {
            assert!(matches!(
                variant,
                Augmentation::CropFromUpscaled { .. }
            ));
        }
    }

    #[test]
    fn eight_variant_plan_ends_with_both_rotations() {
        let plan = AugmentationPlan::build(448, 8);
        assert_eq!(plan.len(), 7);
        assert_eq!(
            plan.variants()[5],
            Augmentation::Rotate {
                degrees: 5.0
            }
        );
        assert_eq!(
            plan.variants()[6],
            Augmentation::Rotate {
                degrees: -5.0
            }
        );
    }

    #[test]
    fn crop_offsets_stay_inside_canvas() {
        let plan = AugmentationPlan::build(448, 8);
        let max_offset = upscaled_canvas(448) - 448;
        for variant in plan.variants() {
            if let Augmentation::CropFromUpscaled {
                offset_x,
                offset_y,
            } = variant
            {
                assert!(*offset_x <= max_offset);
                assert!(*offset_y <= max_offset);
            }
        }
    }

    #[test]
    fn plans_are_reproducible() {
        assert_eq!(
            AugmentationPlan::build(448, 8),
            AugmentationPlan::build(448, 8)
        );
    }
}
