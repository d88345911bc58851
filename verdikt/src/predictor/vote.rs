use std::collections::BTreeMap;

use super::record::confidence_from;
use crate::threshold::ENSEMBLE_MEMBER_DEFAULT;

/// Confidence-weighted vote across independently-thresholded members.
///
/// Each member votes 1 (fake) or 0 (real) against its own threshold, an
/// override taking precedence over every member threshold. Votes whose
/// distance-from-threshold confidence clears `confidence_floor` are
/// averaged weighted by that confidence; when no member clears the
/// floor the vote falls back to the plain mean of the binary decisions,
/// so a verdict always exists. Returns `(vote, confidence)`, both in
/// [0,1]. The aggregation is commutative, so map iteration order does
/// not matter.
pub fn ensemble_vote(
    member_probabilities: &BTreeMap<String, f32>,
    member_thresholds: &BTreeMap<String, f32>,
    override_threshold: Option<f32>,
    confidence_floor: f32,
) -> (f32, f32) {
    let mut weighted_sum = 0.0f32;
    let mut weight_sum = 0.0f32;
    let mut unweighted_votes = Vec::new();

    for (name, probability) in member_probabilities {
        let threshold = override_threshold.unwrap_or_else(|| {
            member_thresholds
                .get(name)
                .copied()
                .unwrap_or(ENSEMBLE_MEMBER_DEFAULT)
        });
        let decision =
            if *probability >= threshold { 1.0f32 } else { 0.0f32 };
        let confidence = confidence_from(*probability, threshold);

        if confidence >= confidence_floor {
            weighted_sum += decision * confidence;
            weight_sum += confidence;
        }
        unweighted_votes.push(decision);
    }

    let vote = if weight_sum > 0.0 {
        weighted_sum / weight_sum
    } else if unweighted_votes.is_empty() {
        0.0
    } else {
        unweighted_votes.iter().sum::<f32>()
            / unweighted_votes.len() as f32
    };

    let vote = vote.clamp(0.0, 1.0);
    let confidence = confidence_from(vote, 0.5);
    (vote, confidence)
}
