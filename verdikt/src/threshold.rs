use std::path::{Path, PathBuf};

use serde_json::Value;

/// Default decision threshold for an ensemble member with no sidecar.
pub const ENSEMBLE_MEMBER_DEFAULT: f32 = 0.25;
/// Default decision threshold for a lone model with no sidecar.
pub const SINGLE_MODEL_DEFAULT: f32 = 0.5;

const TRAINING_SUFFIX: &str = "_best";

/// Sidecar file candidates for a checkpoint, most specific first,
/// deduplicated while preserving order.
pub fn threshold_candidates(checkpoint_path: &Path) -> Vec<PathBuf> {
    let stem = checkpoint_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let base = stem.replace(TRAINING_SUFFIX, "");
    let folder = checkpoint_path.parent().unwrap_or(Path::new(""));

    let candidates = [
        folder.join(format!("{stem}_threshold.json")),
        folder.join(format!("{base}_threshold.json")),
        folder.join("threshold.json"),
    ];

    let mut unique = Vec::new();
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

/// Accepts an object with a numeric `best_threshold` or `threshold` key,
/// or a bare JSON number. Anything else is `None`.
fn parse_threshold(contents: &str) -> Option<f32> {
    let value: Value = serde_json::from_str(contents).ok()?;
    match value {
        Value::Object(map) => map
            .get("best_threshold")
            .or_else(|| map.get("threshold"))
            .and_then(Value::as_f64)
            .map(|threshold| threshold as f32),
        Value::Number(number) => {
            number.as_f64().map(|threshold| threshold as f32)
        },
        _ => None,
    }
}

/// Persisted decision threshold for a checkpoint, if any candidate
/// sidecar exists and parses. Unreadable or malformed sidecars degrade
/// to `None` so the caller falls back to its default.
pub fn resolve_threshold(checkpoint_path: &Path) -> Option<f32> {
    for candidate in threshold_candidates(checkpoint_path) {
        if !candidate.exists() {
            continue;
        }
        match std::fs::read_to_string(&candidate) {
            Ok(contents) => {
                if let Some(threshold) = parse_threshold(&contents) {
                    return Some(threshold);
                }
                tracing::warn!(
                    sidecar = %candidate.display(),
                    "ignoring unparsable threshold sidecar"
                );
            },
            Err(error) => {
                tracing::warn!(
                    sidecar = %candidate.display(),
                    %error,
                    "ignoring unreadable threshold sidecar"
                );
            },
        }
    }
    None
}
