use std::path::{Path, PathBuf};

use candle_core::Device;

use super::{
    PredictError,
    record::{
        PredictionOutcome, PredictionRecord, RunSummary, Verdict,
        confidence_from,
    },
};
use crate::{
    augment::AugmentationPlan,
    checkpoint,
    config::{DetectorConfig, RunSettings},
    model::Scorer,
    parameters::LoadReport,
    runner::BatchRunner,
    threshold::{SINGLE_MODEL_DEFAULT, resolve_threshold},
};

/// One classifier with its sidecar threshold and augmentation setup.
pub struct SinglePredictor {
    checkpoint_path: PathBuf,
    classifier: Box<dyn Scorer>,
    device: Device,
    config: DetectorConfig,
    pub default_threshold: Option<f32>,
    pub load_report: LoadReport,
}

impl SinglePredictor {
    pub fn load(
        checkpoint_path: &Path,
        config: DetectorConfig,
    ) -> Result<Self, PredictError> {
        let device =
            config.backend.device().map_err(PredictError::Device)?;
        let resolved = checkpoint::resolve(checkpoint_path, None, &device)
            .map_err(|source| PredictError::Resolve {
                path: checkpoint_path.display().to_string(),
                source,
            })?;
        let default_threshold = resolve_threshold(checkpoint_path);

        Ok(Self {
            checkpoint_path: checkpoint_path.to_path_buf(),
            classifier: Box::new(resolved.classifier),
            device,
            config,
            default_threshold,
            load_report: resolved.load_report,
        })
    }

    /// Test seam: wraps an already-built scorer.
    pub fn from_scorer(
        checkpoint_path: &Path,
        classifier: Box<dyn Scorer>,
        default_threshold: Option<f32>,
        config: DetectorConfig,
    ) -> Result<Self, PredictError> {
        let device =
            config.backend.device().map_err(PredictError::Device)?;
        Ok(Self {
            checkpoint_path: checkpoint_path.to_path_buf(),
            classifier,
            device,
            config,
            default_threshold,
            load_report: LoadReport::default(),
        })
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Override beats the sidecar value beats the fixed default.
    pub fn effective_threshold(
        &self,
        override_threshold: Option<f32>,
    ) -> f32 {
        override_threshold
            .or(self.default_threshold)
            .unwrap_or(SINGLE_MODEL_DEFAULT)
    }

    pub fn predict(
        &self,
        images: &[PathBuf],
        settings: &RunSettings,
        override_threshold: Option<f32>,
        truth: Option<&[Verdict]>,
        progress: Option<&dyn Fn(&PredictionRecord)>,
        batch_progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<PredictionOutcome, PredictError> {
        let threshold = self.effective_threshold(override_threshold);
        let plan = if settings.use_tta {
            AugmentationPlan::build(
                self.config.image_size,
                self.config.tta_augments,
            )
        } else {
            AugmentationPlan::identity(self.config.image_size)
        };

        let runner =
            BatchRunner::new(settings.batch_size, settings.workers);
        let probabilities = runner
            .run(
                images,
                &plan,
                &[self.classifier.as_ref()],
                &self.device,
                batch_progress,
            )?
            .remove(0);

        let mut summary = RunSummary::default();
        let records = images
            .iter()
            .zip(probabilities)
            .enumerate()
            .map(|(index, (path, probability))| {
                let verdict =
                    Verdict::from_probability(probability, threshold);
                summary.count(verdict);
                let record = PredictionRecord {
                    path: path.clone(),
                    probability,
                    threshold,
                    verdict,
                    confidence: confidence_from(probability, threshold),
                    member_probabilities: None,
                    truth: truth
                        .and_then(|labels| labels.get(index).copied()),
                };
                if let Some(progress) = progress {
                    progress(&record);
                }
                record
            })
            .collect();

        Ok(PredictionOutcome {
            records,
            summary,
        })
    }
}
