use std::path::Path;

use candle_core::{DType, Device};
use thiserror::Error;

use crate::{
    model::{
        Architecture, Classifier,
        adapter::ADAPTER_PREFIX,
        arch::DEFAULT_ARCHITECTURE,
    },
    parameters::{LoadReport, WeightsError, WeightsLoader},
};

/// Ordered (substring, architecture) priority table applied to the
/// lowercased checkpoint stem. First match wins; size suffixes that
/// contain one another are ordered longest first.
pub const ARCH_PATTERNS: &[(&str, Architecture)] = &[
    ("efficientnetv2_xl", Architecture::Xl),
    ("efficientnetv2_l", Architecture::L),
    ("efficientnetv2_m", Architecture::M),
    ("efficientnetv2_s", Architecture::S),
    ("efficientnetv2_b3", Architecture::B3),
    ("efficientnetv2_b2", Architecture::B2),
    ("efficientnetv2_b1", Architecture::B1),
    ("efficientnetv2_b0", Architecture::B0),
];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Weights(#[from] WeightsError),
    #[error("failed to build {architecture} from {path}")]
    Build {
        architecture: &'static str,
        path: String,
        #[source]
        source: candle_core::Error,
    },
}

/// A classifier ready to run, plus how it was put together.
pub struct ResolvedCheckpoint {
    pub classifier: Classifier,
    pub load_report: LoadReport,
}

/// Architecture for a checkpoint stem, or `None` when nothing in the
/// priority table matches.
pub fn architecture_for_stem(stem: &str) -> Option<Architecture> {
    let stem = stem.to_ascii_lowercase();
    ARCH_PATTERNS
        .iter()
        .find(|(pattern, _)| stem.contains(pattern))
        .map(|(_, architecture)| *architecture)
}

/// Loads a checkpoint and builds the matching classifier variant.
///
/// The architecture comes from `explicit_arch` when given, otherwise
/// from the file name via [`ARCH_PATTERNS`], defaulting to the mid-sized
/// family member. A checkpoint carrying parameters under the adapter
/// prefix gets the channel-reduction variant; everything else reads the
/// forensic stack natively. Weights apply non-strictly; the returned
/// [`LoadReport`] says what did not line up and is logged here because a
/// dirty report can mask a checkpoint built for another revision.
pub fn resolve(
    path: &Path,
    explicit_arch: Option<Architecture>,
    device: &Device,
) -> Result<ResolvedCheckpoint, ResolveError> {
    let loader = WeightsLoader::from_file(path, device)?;

    let architecture = explicit_arch.unwrap_or_else(|| {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        architecture_for_stem(stem).unwrap_or_else(|| {
            tracing::debug!(
                checkpoint = %path.display(),
                fallback = DEFAULT_ARCHITECTURE.identifier(),
                "no architecture pattern matched, using fallback"
            );
            DEFAULT_ARCHITECTURE
        })
    });

    let vb = loader.var_builder(DType::F32, device);
    let adapted = loader.has_parameter_with_prefix(ADAPTER_PREFIX);
    let classifier = if adapted {
        Classifier::adapted(architecture, vb)
    } else {
        Classifier::direct(architecture, vb)
    }
    .map_err(|source| ResolveError::Build {
        architecture: architecture.identifier(),
        path: path.display().to_string(),
        source,
    })?;

    let load_report = loader.report();
    if !load_report.is_clean() {
        tracing::warn!(
            checkpoint = %path.display(),
            missing = load_report.missing.len(),
            unexpected = load_report.unexpected.len(),
            "checkpoint applied non-strictly"
        );
    }

    Ok(ResolvedCheckpoint {
        classifier,
        load_report,
    })
}
