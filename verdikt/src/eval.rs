use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{
    discover::find_images,
    predictor::{PredictError, Verdict},
};

/// Sub-directory holding synthetic (positive-class) images.
pub const FAKE_SUBDIR: &str = "fake";
/// Sub-directory holding authentic (negative-class) images.
pub const REAL_SUBDIR: &str = "real";

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("test directory must contain a {subdir} sub-directory")]
    MissingSubset {
        subdir: &'static str,
    },
    #[error("no images found in either test sub-directory")]
    EmptySubsets,
    #[error(transparent)]
    Predict(#[from] PredictError),
}

/// Labeled inputs for one evaluation pass; real images first, then fake,
/// with parallel ground-truth labels.
#[derive(Debug)]
pub struct LabeledTestSet {
    pub images: Vec<PathBuf>,
    pub truth: Vec<Verdict>,
}

impl LabeledTestSet {
    pub fn from_dir(test_dir: &Path) -> Result<Self, EvalError> {
        let real_dir = test_dir.join(REAL_SUBDIR);
        let fake_dir = test_dir.join(FAKE_SUBDIR);
        if !real_dir.is_dir() {
            return Err(EvalError::MissingSubset {
                subdir: REAL_SUBDIR,
            });
        }
        if !fake_dir.is_dir() {
            return Err(EvalError::MissingSubset {
                subdir: FAKE_SUBDIR,
            });
        }

        let real_images = find_images(&real_dir);
        let fake_images = find_images(&fake_dir);
        if real_images.is_empty() && fake_images.is_empty() {
            return Err(EvalError::EmptySubsets);
        }

        let mut truth = vec![Verdict::Real; real_images.len()];
        truth.extend(vec![Verdict::Fake; fake_images.len()]);
        let mut images = real_images;
        images.extend(fake_images);
        Ok(Self {
            images,
            truth,
        })
    }
}

/// 2x2 confusion matrix; rows are truth, columns are prediction, with
/// fake as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_real: usize,
    pub false_fake: usize,
    pub false_real: usize,
    pub true_fake: usize,
}

impl ConfusionMatrix {
    pub fn from_verdicts(
        truth: &[Verdict],
        predicted: &[Verdict],
    ) -> Self {
        let mut matrix = Self::default();
        for (truth, predicted) in truth.iter().zip(predicted) {
            match (truth, predicted) {
                (Verdict::Real, Verdict::Real) => matrix.true_real += 1,
                (Verdict::Real, Verdict::Fake) => matrix.false_fake += 1,
                (Verdict::Fake, Verdict::Real) => matrix.false_real += 1,
                (Verdict::Fake, Verdict::Fake) => matrix.true_fake += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_real + self.false_fake + self.false_real + self.true_fake
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EvalReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

/// Standard binary metrics from per-image decisions. Degenerate
/// denominators (no positive predictions, no positive truth) yield zero
/// rather than NaN.
pub fn compute_report(
    truth: &[Verdict],
    predicted: &[Verdict],
) -> EvalReport {
    let confusion = ConfusionMatrix::from_verdicts(truth, predicted);
    let total = confusion.total();
    let accuracy = if total == 0 {
        0.0
    } else {
        (confusion.true_real + confusion.true_fake) as f64 / total as f64
    };
    let predicted_fake = confusion.true_fake + confusion.false_fake;
    let precision = if predicted_fake == 0 {
        0.0
    } else {
        confusion.true_fake as f64 / predicted_fake as f64
    };
    let truly_fake = confusion.true_fake + confusion.false_real;
    let recall = if truly_fake == 0 {
        0.0
    } else {
        confusion.true_fake as f64 / truly_fake as f64
    };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    EvalReport {
        accuracy,
        precision,
        recall,
        f1,
        confusion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_fake_predictor_metrics() {
        // 3 real + 2 fake, predictor says fake every time.
        let truth = [
            Verdict::Real,
            Verdict::Real,
            Verdict::Real,
            Verdict::Fake,
            Verdict::Fake,
        ];
        let predicted = [Verdict::Fake; 5];
        let report = compute_report(&truth, &predicted);
        assert!((report.recall - 1.0).abs() < 1e-9);
        assert!((report.precision - 0.4).abs() < 1e-9);
        assert!((report.accuracy - 0.4).abs() < 1e-9);
        assert_eq!(report.confusion, ConfusionMatrix {
            true_real: 0,
            false_fake: 3,
            false_real: 0,
            true_fake: 2,
        });
    }

    #[test]
    fn perfect_predictions_score_one() {
        let truth = [Verdict::Real, Verdict::Fake];
        let report = compute_report(&truth, &truth);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.precision, 1.0);
        assert_eq!(report.recall, 1.0);
        assert_eq!(report.f1, 1.0);
    }

    #[test]
    fn degenerate_denominators_are_zero_not_nan() {
        let truth = [Verdict::Real, Verdict::Real];
        let predicted = [Verdict::Real, Verdict::Real];
        let report = compute_report(&truth, &predicted);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
        assert_eq!(report.f1, 0.0);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn missing_subset_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(REAL_SUBDIR)).unwrap();
        let error = LabeledTestSet::from_dir(dir.path()).unwrap_err();
        assert!(matches!(error, EvalError::MissingSubset {
            subdir: FAKE_SUBDIR
        }));
    }

    #[test]
    fn empty_subsets_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(REAL_SUBDIR)).unwrap();
        std::fs::create_dir(dir.path().join(FAKE_SUBDIR)).unwrap();
        let error = LabeledTestSet::from_dir(dir.path()).unwrap_err();
        assert!(matches!(error, EvalError::EmptySubsets));
    }

    #[test]
    fn labeled_set_orders_real_before_fake() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join(REAL_SUBDIR);
        let fake = dir.path().join(FAKE_SUBDIR);
        std::fs::create_dir(&real).unwrap();
        std::fs::create_dir(&fake).unwrap();
        std::fs::write(real.join("a.jpg"), b"x").unwrap();
        std::fs::write(fake.join("b.jpg"), b"x").unwrap();

        let set = LabeledTestSet::from_dir(dir.path()).unwrap();
        assert_eq!(set.truth, vec![Verdict::Real, Verdict::Fake]);
        assert_eq!(set.images.len(), 2);
    }
}
