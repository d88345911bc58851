use std::collections::HashMap;

use candle_core::{Device, Tensor};
use verdikt::{
    checkpoint::{architecture_for_stem, resolve},
    model::Architecture,
};

fn write_checkpoint(
    path: &std::path::Path,
    entries: &[(&str, Vec<usize>)],
) {
    let device = Device::Cpu;
    let tensors: HashMap<String, Tensor> = entries
        .iter()
        .map(|(name, dims)| {
            let tensor = Tensor::zeros(
                dims.as_slice(),
                candle_core::DType::F32,
                &device,
            )
            .unwrap();
            (name.to_string(), tensor)
        })
        .collect();
    candle_core::safetensors::save(&tensors, path).unwrap();
}

#[test]
fn stem_patterns_pick_the_exact_family_member() {
    assert_eq!(
        architecture_for_stem("efficientnetv2_xl_best"),
        Some(Architecture::Xl)
    );
    assert_eq!(
        architecture_for_stem("efficientnetv2_b0_run2"),
        Some(Architecture::B0)
    );
    assert_eq!(architecture_for_stem("mystery_model"), None);
}

#[test]
fn adapter_prefix_selects_the_adapted_variant() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("efficientnetv2_b0_best.safetensors");
    write_checkpoint(&path, &[(
        "stem.proj.weight",
        vec![3, 9, 1, 1],
    )]);

    let resolved = resolve(&path, None, &Device::Cpu).unwrap();
    assert!(resolved.classifier.is_adapted());
    assert_eq!(resolved.classifier.architecture(), Architecture::B0);
    // Only the adapter projection came from the checkpoint; everything
    // else kept its initialization and is reported.
    assert!(!resolved.load_report.is_clean());
    assert!(resolved.load_report.missing.len() > 1);
    assert!(resolved.load_report.unexpected.is_empty());
}

#[test]
fn plain_checkpoint_selects_the_direct_variant() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("efficientnetv2_b0.safetensors");
    write_checkpoint(&path, &[
        ("backbone.stem.conv.weight", vec![32, 9, 3, 3]),
        ("leftover.weight", vec![4]),
    ]);

    let resolved = resolve(&path, None, &Device::Cpu).unwrap();
    assert!(!resolved.classifier.is_adapted());
    assert_eq!(resolved.classifier.architecture(), Architecture::B0);
    assert_eq!(
        resolved.load_report.unexpected,
        vec!["leftover.weight".to_string()]
    );
}

#[test]
fn explicit_architecture_beats_the_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("efficientnetv2_b0.safetensors");
    write_checkpoint(&path, &[("unrelated", vec![1])]);

    let resolved =
        resolve(&path, Some(Architecture::B1), &Device::Cpu).unwrap();
    assert_eq!(resolved.classifier.architecture(), Architecture::B1);
}

#[test]
fn unknown_stem_falls_back_to_the_mid_sized_member() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detector_final.safetensors");
    write_checkpoint(&path, &[("unrelated", vec![1])]);

    let resolved = resolve(&path, None, &Device::Cpu).unwrap();
    assert_eq!(resolved.classifier.architecture(), Architecture::M);
}
