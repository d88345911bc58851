use std::path::{Path, PathBuf};

use candle_core::Tensor;
use image::{Rgb, RgbImage};
use verdikt::Scorer;

/// Writes a small solid-color PNG and returns its path.
pub fn write_png(
    dir: &Path,
    name: &str,
    color: [u8; 3],
) -> PathBuf {
    let path = dir.join(name);
    let image = RgbImage::from_pixel(24, 24, Rgb(color));
    image.save(&path).unwrap();
    path
}

/// Scores every batch item with the same fixed logit.
pub struct ConstScorer(pub f32);

impl Scorer for ConstScorer {
    fn score(
        &self,
        batch: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let count = batch.dim(0)?;
        Tensor::from_vec(
            vec![self.0; count],
            (count, 1),
            batch.device(),
        )
    }
}

/// Logit is the mean over all input channels, so scores depend on the
/// actual pixel content and on the applied transform.
pub struct MeanScorer;

impl Scorer for MeanScorer {
    fn score(
        &self,
        batch: &Tensor,
    ) -> candle_core::Result<Tensor> {
        batch.mean(3)?.mean(2)?.mean(1)?.unsqueeze(1)
    }
}

/// Fails with a resource-exhaustion message for any batch larger than
/// one item, succeeding otherwise.
pub struct OomAboveOneScorer;

impl Scorer for OomAboveOneScorer {
    fn score(
        &self,
        batch: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let count = batch.dim(0)?;
        if count > 1 {
            return Err(candle_core::Error::Msg(
                "backend allocator: out of memory".into(),
            ));
        }
        Tensor::from_vec(vec![2.0f32; count], (count, 1), batch.device())
    }
}

/// Fails with a resource-exhaustion message on every batch size.
pub struct AlwaysOomScorer;

impl Scorer for AlwaysOomScorer {
    fn score(
        &self,
        _batch: &Tensor,
    ) -> candle_core::Result<Tensor> {
        Err(candle_core::Error::Msg(
            "backend allocator: out of memory".into(),
        ))
    }
}
