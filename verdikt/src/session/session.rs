use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{
    config::{DetectorConfig, RunSettings},
    eval::{EvalError, EvalReport, LabeledTestSet, compute_report},
    predictor::{
        EnsemblePredictor, PredictError, PredictionOutcome,
        PredictionRecord, SinglePredictor, Verdict,
    },
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Either one model or an ensemble; the loaded classifier set is
/// read-only for the session lifetime.
pub enum Predictor {
    Single(SinglePredictor),
    Ensemble(EnsemblePredictor),
}

impl Predictor {
    fn predict(
        &self,
        images: &[PathBuf],
        settings: &RunSettings,
        override_threshold: Option<f32>,
        truth: Option<&[Verdict]>,
        progress: Option<&dyn Fn(&PredictionRecord)>,
        batch_progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<PredictionOutcome, PredictError> {
        match self {
            Predictor::Single(single) => single.predict(
                images,
                settings,
                override_threshold,
                truth,
                progress,
                batch_progress,
            ),
            Predictor::Ensemble(ensemble) => ensemble.predict(
                images,
                settings,
                override_threshold,
                truth,
                progress,
                batch_progress,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub ensemble: bool,
    pub models: Vec<ModelInfo>,
    pub settings: RunSettings,
    pub threshold_override: Option<f32>,
}

/// Long-running detector state: a loaded predictor plus the run
/// parameters an interactive caller may adjust between operations.
///
/// Every interactive command maps onto one method here, so front ends
/// stay free of prediction logic.
pub struct DetectorSession {
    predictor: Predictor,
    pub settings: RunSettings,
    threshold_override: Option<f32>,
}

impl DetectorSession {
    pub fn new(
        predictor: Predictor,
        settings: RunSettings,
        threshold_override: Option<f32>,
    ) -> Self {
        Self {
            predictor,
            settings,
            threshold_override,
        }
    }

    pub fn with_single_model(
        checkpoint_path: &Path,
        config: DetectorConfig,
        settings: RunSettings,
        threshold_override: Option<f32>,
    ) -> Result<Self, SessionError> {
        let predictor = SinglePredictor::load(checkpoint_path, config)?;
        Ok(Self::new(
            Predictor::Single(predictor),
            settings,
            threshold_override,
        ))
    }

    pub fn with_ensemble(
        model_dir: &Path,
        config: DetectorConfig,
        settings: RunSettings,
        threshold_override: Option<f32>,
    ) -> Result<Self, SessionError> {
        let predictor = EnsemblePredictor::load(model_dir, config)?;
        Ok(Self::new(
            Predictor::Ensemble(predictor),
            settings,
            threshold_override,
        ))
    }

    pub fn classify(
        &self,
        images: &[PathBuf],
        progress: Option<&dyn Fn(&PredictionRecord)>,
        batch_progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<PredictionOutcome, SessionError> {
        let outcome = self.predictor.predict(
            images,
            &self.settings,
            self.threshold_override,
            None,
            progress,
            batch_progress,
        )?;
        Ok(outcome)
    }

    /// Runs the labeled test layout under `test_dir` and computes the
    /// final metrics from the per-image decisions.
    pub fn evaluate(
        &self,
        test_dir: &Path,
        progress: Option<&dyn Fn(&PredictionRecord)>,
        batch_progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<(PredictionOutcome, EvalReport), SessionError> {
        let test_set = LabeledTestSet::from_dir(test_dir)?;
        let outcome = self.predictor.predict(
            &test_set.images,
            &self.settings,
            self.threshold_override,
            Some(&test_set.truth),
            progress,
            batch_progress,
        )?;
        let predicted: Vec<Verdict> = outcome
            .records
            .iter()
            .map(|record| record.verdict)
            .collect();
        let report = compute_report(&test_set.truth, &predicted);
        Ok((outcome, report))
    }

    pub fn toggle_tta(&mut self) -> bool {
        self.settings.use_tta = !self.settings.use_tta;
        self.settings.use_tta
    }

    pub fn set_batch_size(
        &mut self,
        batch_size: usize,
    ) {
        self.settings.batch_size = batch_size.max(1);
    }

    pub fn set_workers(
        &mut self,
        workers: usize,
    ) {
        self.settings.workers = workers;
    }

    pub fn threshold_override(&self) -> Option<f32> {
        self.threshold_override
    }

    pub fn info(&self) -> SessionInfo {
        let (ensemble, models) = match &self.predictor {
            Predictor::Single(single) => {
                let name = single
                    .checkpoint_path()
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("model")
                    .to_string();
                (false, vec![ModelInfo {
                    name,
                    threshold: single.effective_threshold(
                        self.threshold_override,
                    ),
                }])
            },
            Predictor::Ensemble(ensemble) => {
                let models = ensemble
                    .members()
                    .iter()
                    .map(|member| ModelInfo {
                        name: member.name.clone(),
                        threshold: member.threshold,
                    })
                    .collect();
                (true, models)
            },
        };
        SessionInfo {
            ensemble,
            models,
            settings: self.settings,
            threshold_override: self.threshold_override,
        }
    }
}
