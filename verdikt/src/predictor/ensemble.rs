use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use candle_core::Device;

use super::{
    PredictError,
    record::{
        PredictionOutcome, PredictionRecord, RunSummary, Verdict,
    },
    vote::ensemble_vote,
};
use crate::{
    augment::AugmentationPlan,
    checkpoint,
    config::{DetectorConfig, RunSettings},
    discover::find_checkpoints,
    model::Scorer,
    runner::BatchRunner,
    threshold::{ENSEMBLE_MEMBER_DEFAULT, resolve_threshold},
};

/// The ensemble verdict is taken against the vote share midpoint.
pub const VOTE_THRESHOLD: f32 = 0.5;

pub struct EnsembleMember {
    pub name: String,
    pub threshold: f32,
    classifier: Box<dyn Scorer>,
}

impl EnsembleMember {
    pub fn new(
        name: impl Into<String>,
        threshold: f32,
        classifier: Box<dyn Scorer>,
    ) -> Self {
        Self {
            name: name.into(),
            threshold,
            classifier,
        }
    }
}

/// A set of independently-thresholded classifiers sharing one batch
/// pass, combined by confidence-weighted voting.
pub struct EnsemblePredictor {
    members: Vec<EnsembleMember>,
    device: Device,
    config: DetectorConfig,
}

impl std::fmt::Debug for EnsemblePredictor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EnsemblePredictor")
            .field(
                "members",
                &self
                    .members
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("device", &self.device)
            .field("config", &self.config)
            .finish()
    }
}

impl EnsemblePredictor {
    /// Loads every checkpoint in `model_dir`, sorted by file name. A
    /// member that fails to resolve is skipped with a warning; an
    /// ensemble with nothing left is an error.
    pub fn load(
        model_dir: &Path,
        config: DetectorConfig,
    ) -> Result<Self, PredictError> {
        let device =
            config.backend.device().map_err(PredictError::Device)?;
        let checkpoints = find_checkpoints(model_dir).map_err(
            |source| PredictError::ModelDir {
                dir: model_dir.display().to_string(),
                source,
            },
        )?;
        if checkpoints.is_empty() {
            return Err(PredictError::EmptyModelDir {
                dir: model_dir.display().to_string(),
            });
        }

        let mut members = Vec::new();
        for checkpoint_path in checkpoints {
            let name = checkpoint_path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("checkpoint")
                .to_string();
            match checkpoint::resolve(&checkpoint_path, None, &device) {
                Ok(resolved) => {
                    let threshold = resolve_threshold(&checkpoint_path)
                        .unwrap_or(ENSEMBLE_MEMBER_DEFAULT);
                    members.push(EnsembleMember::new(
                        name,
                        threshold,
                        Box::new(resolved.classifier),
                    ));
                },
                Err(error) => {
                    tracing::warn!(
                        checkpoint = %checkpoint_path.display(),
                        %error,
                        "skipping ensemble member"
                    );
                },
            }
        }

        Self::from_members(members, config, device)
    }

    /// Builds an ensemble from already-constructed members. Fails when
    /// the member list is empty.
    pub fn from_members(
        members: Vec<EnsembleMember>,
        config: DetectorConfig,
        device: Device,
    ) -> Result<Self, PredictError> {
        if members.is_empty() {
            return Err(PredictError::NoMembersLoaded);
        }
        Ok(Self {
            members,
            device,
            config,
        })
    }

    pub fn members(&self) -> &[EnsembleMember] {
        &self.members
    }

    /// Average of the member thresholds, for display.
    pub fn mean_member_threshold(&self) -> f32 {
        let total: f32 =
            self.members.iter().map(|member| member.threshold).sum();
        total / self.members.len() as f32
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
        let plan = if settings.use_tta {
            AugmentationPlan::build(
                self.config.image_size,
                self.config.tta_augments,
            )
        } else {
            AugmentationPlan::identity(self.config.image_size)
        };

        let scorers: Vec<&dyn Scorer> = self
            .members
            .iter()
            .map(|member| member.classifier.as_ref())
            .collect();
        let runner =
            BatchRunner::new(settings.batch_size, settings.workers);
        let per_model = runner.run(
            images,
            &plan,
            &scorers,
            &self.device,
            batch_progress,
        )?;

        let member_thresholds: BTreeMap<String, f32> = self
            .members
            .iter()
            .map(|member| (member.name.clone(), member.threshold))
            .collect();

        let mut summary = RunSummary::default();
        let records = images
            .iter()
            .enumerate()
            .map(|(index, path)| {
                let member_probabilities: BTreeMap<String, f32> = self
                    .members
                    .iter()
                    .zip(&per_model)
                    .map(|(member, probabilities)| {
                        (member.name.clone(), probabilities[index])
                    })
                    .collect();
                let (vote, confidence) = ensemble_vote(
                    &member_probabilities,
                    &member_thresholds,
                    override_threshold,
                    self.config.confidence_floor,
                );
                let verdict =
                    Verdict::from_probability(vote, VOTE_THRESHOLD);
                summary.count(verdict);
                let record = PredictionRecord {
                    path: path.clone(),
                    probability: vote,
                    threshold: VOTE_THRESHOLD,
                    verdict,
                    confidence,
                    member_probabilities: Some(member_probabilities),
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
