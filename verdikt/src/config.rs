use serde::{Deserialize, Serialize};

use crate::backend::ComputeBackend;

pub const DEFAULT_IMAGE_SIZE: u32 = 448;
pub const DEFAULT_TTA_AUGMENTS: usize = 8;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_WORKERS: usize = 0;
pub const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.1;

/// Construction-time configuration, fixed for the lifetime of a
/// predictor.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub image_size: u32,
    pub tta_augments: usize,
    pub confidence_floor: f32,
    pub backend: ComputeBackend,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            tta_augments: DEFAULT_TTA_AUGMENTS,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            backend: ComputeBackend::Auto,
        }
    }
}

/// Run-scoped settings, mutable between operations, never during one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RunSettings {
    pub use_tta: bool,
    pub batch_size: usize,
    pub workers: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            use_tta: false,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}
