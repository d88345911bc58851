use candle_core::Tensor;
use candle_nn::{
    BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, VarBuilder,
    batch_norm, conv2d_no_bias, ops,
};

/// 1x1 channel-reduction stage in front of a 3-channel backbone.
///
/// Projects the full forensic stack down to three planes so backbones
/// trained with a pretrained RGB stem can consume it.
pub struct ChannelAdapter {
    proj: Conv2d,
    bn: BatchNorm,
}

/// Parameter-name prefix that marks a checkpoint as adapter-based.
pub const ADAPTER_PREFIX: &str = "stem.";

impl ChannelAdapter {
    pub fn new(
        in_channels: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let proj = conv2d_no_bias(
            in_channels,
            3,
            1,
            Conv2dConfig::default(),
            vb.pp("proj"),
        )?;
        let bn = batch_norm(3, BatchNormConfig::default(), vb.pp("bn"))?;
        Ok(Self {
            proj,
            bn,
        })
    }

    pub fn forward(
        &self,
        xs: &Tensor,
    ) -> candle_core::Result<Tensor> {
        ops::silu(&xs.apply(&self.proj)?.apply_t(&self.bn, false)?)
    }
}

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    use super::*;

    #[test]
    fn reduces_nine_channels_to_three() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let adapter = ChannelAdapter::new(9, vb.pp("stem")).unwrap();

        let input =
            Tensor::zeros((2, 9, 16, 16), DType::F32, &device).unwrap();
        let output = adapter.forward(&input).unwrap();
        assert_eq!(output.dims(), &[2, 3, 16, 16]);
    }
}
