use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::{Arc, Mutex},
};

use candle_core::{DType, Device, Shape, Tensor};
use candle_nn::{Init, VarBuilder, var_builder::SimpleBackend};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("failed to read checkpoint {path}")]
    Load {
        path: String,
        #[source]
        source: candle_core::Error,
    },
}

/// Outcome of a non-strict weight application.
///
/// `missing` are parameters the network expected but the checkpoint did
/// not provide (they keep their initialization); `unexpected` are
/// checkpoint entries nothing consumed. Either list being non-empty may
/// indicate a checkpoint built for a different architecture revision, so
/// callers log the report rather than trusting the load silently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

struct LoaderState {
    tensors: HashMap<String, Tensor>,
    consumed: Mutex<HashSet<String>>,
    missing: Mutex<Vec<String>>,
}

/// Indexed view over one serialized checkpoint.
///
/// Parameter names can be inspected before any network is built, and the
/// derived [`VarBuilder`] applies weights non-strictly: names present in
/// the checkpoint must match the requested shape exactly, names absent
/// from it fall back to the requesting layer's initializer and are
/// recorded in the [`LoadReport`].
pub struct WeightsLoader {
    state: Arc<LoaderState>,
}

impl WeightsLoader {
    pub fn from_file(
        path: &Path,
        device: &Device,
    ) -> Result<Self, WeightsError> {
        let tensors = candle_core::safetensors::load(path, device)
            .map_err(|source| WeightsError::Load {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            state: Arc::new(LoaderState {
                tensors,
                consumed: Mutex::new(HashSet::new()),
                missing: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.state.tensors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_parameter_with_prefix(
        &self,
        prefix: &str,
    ) -> bool {
        self.state.tensors.keys().any(|name| name.starts_with(prefix))
    }

    pub fn var_builder(
        &self,
        dtype: DType,
        device: &Device,
    ) -> VarBuilder<'static> {
        let backend = TolerantBackend {
            state: self.state.clone(),
        };
        VarBuilder::from_backend(Box::new(backend), dtype, device.clone())
    }

    /// Missing and unexpected parameter names accumulated so far. Call
    /// after the network has pulled all of its weights.
    pub fn report(&self) -> LoadReport {
        let consumed = self.state.consumed.lock().unwrap();
        let mut unexpected: Vec<String> = self
            .state
            .tensors
            .keys()
            .filter(|name| !consumed.contains(*name))
            .cloned()
            .collect();
        unexpected.sort();
        let mut missing = self.state.missing.lock().unwrap().clone();
        missing.sort();
        LoadReport {
            missing,
            unexpected,
        }
    }
}

struct TolerantBackend {
    state: Arc<LoaderState>,
}

impl SimpleBackend for TolerantBackend {
    fn get(
        &self,
        s: Shape,
        name: &str,
        h: Init,
        dtype: DType,
        dev: &Device,
    ) -> candle_core::Result<Tensor> {
        match self.state.tensors.get(name) {
            Some(tensor) => {
                if tensor.shape() != &s {
                    return Err(candle_core::Error::Msg(format!(
                        "parameter \"{}\" has shape {:?}, expected {:?}",
                        name,
                        tensor.dims(),
                        s.dims()
                    )));
                }
                self.state
                    .consumed
                    .lock()
                    .unwrap()
                    .insert(name.to_string());
                tensor.to_dtype(dtype)?.to_device(dev)
            },
            None => {
                self.state.missing.lock().unwrap().push(name.to_string());
                let var = h.var(s, dtype, dev)?;
                Ok(var.as_tensor().clone())
            },
        }
    }

    fn get_unchecked(
        &self,
        name: &str,
        dtype: DType,
        dev: &Device,
    ) -> candle_core::Result<Tensor> {
        match self.state.tensors.get(name) {
            Some(tensor) => {
                self.state
                    .consumed
                    .lock()
                    .unwrap()
                    .insert(name.to_string());
                tensor.to_dtype(dtype)?.to_device(dev)
            },
            None => Err(candle_core::Error::CannotFindTensor {
                path: name.to_string(),
            }),
        }
    }

    fn contains_tensor(
        &self,
        name: &str,
    ) -> bool {
        self.state.tensors.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use candle_core::DType;

    use super::*;

    fn write_fixture(
        dir: &Path,
        entries: &[(&str, &[usize])],
    ) -> std::path::PathBuf {
        let device = Device::Cpu;
        let tensors: HashMap<String, Tensor> = entries
            .iter()
            .map(|(name, dims)| {
                let count: usize = dims.iter().product();
                let data: Vec<f32> =
                    (0..count).map(|i| i as f32).collect();
                (
                    name.to_string(),
                    Tensor::from_vec(data, *dims, &device).unwrap(),
                )
            })
            .collect();
        let path = dir.join("fixture.safetensors");
        candle_core::safetensors::save(&tensors, &path).unwrap();
        path
    }

    #[test]
    fn reports_missing_and_unexpected_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            &[("present", &[2, 2]), ("leftover", &[3])],
        );
        let device = Device::Cpu;
        let loader = WeightsLoader::from_file(&path, &device).unwrap();
        let vb = loader.var_builder(DType::F32, &device);

        let present = vb
            .get_with_hints((2, 2), "present", Init::Const(0.0))
            .unwrap();
        assert_eq!(
            present.to_vec2::<f32>().unwrap(),
            vec![vec![0.0, 1.0], vec![2.0, 3.0]]
        );

        let absent = vb
            .get_with_hints((4,), "absent", Init::Const(7.0))
            .unwrap();
        assert_eq!(
            absent.to_vec1::<f32>().unwrap(),
            vec![7.0, 7.0, 7.0, 7.0]
        );

        let report = loader.report();
        assert_eq!(report.missing, vec!["absent".to_string()]);
        assert_eq!(report.unexpected, vec!["leftover".to_string()]);
        assert!(!report.is_clean());
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), &[("weight", &[2, 3])]);
        let device = Device::Cpu;
        let loader = WeightsLoader::from_file(&path, &device).unwrap();
        let vb = loader.var_builder(DType::F32, &device);
        let result =
            vb.get_with_hints((3, 2), "weight", Init::Const(0.0));
        assert!(result.is_err());
    }

    #[test]
    fn prefix_lookup_sees_parameter_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            &[("stem.proj.weight", &[3, 9, 1, 1]), ("head.fc", &[1])],
        );
        let device = Device::Cpu;
        let loader = WeightsLoader::from_file(&path, &device).unwrap();
        assert!(loader.has_parameter_with_prefix("stem."));
        assert!(!loader.has_parameter_with_prefix("blocks."));
        assert_eq!(
            loader.parameter_names(),
            vec!["head.fc".to_string(), "stem.proj.weight".to_string()]
        );
    }
}
