use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Binary verdict for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Real,
    Fake,
}

impl Verdict {
    /// Decision boundary is inclusive: a probability exactly at the
    /// threshold reads as fake.
    pub fn from_probability(
        probability: f32,
        threshold: f32,
    ) -> Self {
        if probability >= threshold {
            Verdict::Fake
        } else {
            Verdict::Real
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Real => "REAL",
            Verdict::Fake => "FAKE",
        }
    }
}

/// Distance-from-threshold confidence, clamped to [0,1]. Zero exactly at
/// the threshold, one at the opposite extreme.
pub fn confidence_from(
    probability: f32,
    threshold: f32,
) -> f32 {
    (2.0 * (probability - threshold).abs()).clamp(0.0, 1.0)
}

/// Per-image result of one predictor invocation.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub path: PathBuf,
    /// Model probability, or the ensemble vote share.
    pub probability: f32,
    /// Threshold the verdict was taken against (0.5 for ensemble votes).
    pub threshold: f32,
    pub verdict: Verdict,
    pub confidence: f32,
    /// Raw per-member probabilities; absent for single-model runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_probabilities: Option<BTreeMap<String, f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truth: Option<Verdict>,
}

impl PredictionRecord {
    pub fn is_misclassified(&self) -> bool {
        self.truth.is_some_and(|truth| truth != self.verdict)
    }
}

/// Running label counts for one run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunSummary {
    pub real_count: usize,
    pub fake_count: usize,
}

impl RunSummary {
    pub fn count(
        &mut self,
        verdict: Verdict,
    ) {
        match verdict {
            Verdict::Real => self.real_count += 1,
            Verdict::Fake => self.fake_count += 1,
        }
    }
}

/// Everything one `predict` call produces.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    pub records: Vec<PredictionRecord>,
    pub summary: RunSummary,
}
