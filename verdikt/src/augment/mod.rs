pub mod apply;
pub mod plan;

pub use apply::apply_augmentation;
pub use plan::{Augmentation, AugmentationPlan};
