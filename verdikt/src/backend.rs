use candle_core::Device;

/// Compute backend used for weight loading and batch inference.
///
/// Selection is explicit configuration carried by the caller, never
/// process-global state, so several backends can coexist in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeBackend {
    /// Pick the best available backend at construction time.
    Auto,
    Cpu,
    /// CUDA device with the given ordinal.
    Cuda(usize),
    Metal,
}

impl Default for ComputeBackend {
    fn default() -> Self {
        ComputeBackend::Auto
    }
}

impl ComputeBackend {
    /// Resolves `Auto` to a concrete backend.
    pub fn resolve(&self) -> ComputeBackend {
        match self {
            ComputeBackend::Auto => {
                if candle_core::utils::cuda_is_available() {
                    ComputeBackend::Cuda(0)
                } else if candle_core::utils::metal_is_available() {
                    ComputeBackend::Metal
                } else {
                    ComputeBackend::Cpu
                }
            },
            other => *other,
        }
    }

    pub fn device(&self) -> Result<Device, candle_core::Error> {
        match self.resolve() {
            ComputeBackend::Cpu => Ok(Device::Cpu),
            ComputeBackend::Cuda(ordinal) => Device::new_cuda(ordinal),
            ComputeBackend::Metal => Device::new_metal(0),
            ComputeBackend::Auto => unreachable!(),
        }
    }
}
