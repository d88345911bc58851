use candle_core::Tensor;
use candle_nn::{
    BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, Linear, VarBuilder,
    batch_norm, conv2d, conv2d_no_bias, linear, ops,
};

/// One backbone stage: `repeats` blocks of the same shape, the first of
/// which applies the stride.
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    /// Fused blocks collapse expansion and depthwise into one 3x3 conv
    /// and carry no squeeze-excitation stage.
    pub fused: bool,
    pub expand_ratio: usize,
    pub channels: usize,
    pub repeats: usize,
    pub stride: usize,
}

impl StageSpec {
    pub const fn fused(
        expand_ratio: usize,
        channels: usize,
        repeats: usize,
        stride: usize,
    ) -> Self {
        Self {
            fused: true,
            expand_ratio,
            channels,
            repeats,
            stride,
        }
    }

    pub const fn squeezed(
        expand_ratio: usize,
        channels: usize,
        repeats: usize,
        stride: usize,
    ) -> Self {
        Self {
            fused: false,
            expand_ratio,
            channels,
            repeats,
            stride,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackboneConfig {
    pub stem_channels: usize,
    pub stages: Vec<StageSpec>,
    pub head_channels: usize,
}

const BN_CONFIG: BatchNormConfig = BatchNormConfig {
    eps: 1e-3,
    remove_mean: true,
    affine: true,
    momentum: 0.1,
};

fn conv_config(
    kernel: usize,
    stride: usize,
    groups: usize,
) -> Conv2dConfig {
    Conv2dConfig {
        padding: kernel / 2,
        stride,
        groups,
        ..Default::default()
    }
}

struct SqueezeExcite {
    reduce: Conv2d,
    expand: Conv2d,
}

impl SqueezeExcite {
    fn new(
        channels: usize,
        reduced: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let reduce = conv2d(
            channels,
            reduced,
            1,
            conv_config(1, 1, 1),
            vb.pp("reduce"),
        )?;
        let expand = conv2d(
            reduced,
            channels,
            1,
            conv_config(1, 1, 1),
            vb.pp("expand"),
        )?;
        Ok(Self {
            reduce,
            expand,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let scale = xs.mean_keepdim(3)?.mean_keepdim(2)?;
        let scale = ops::silu(&scale.apply(&self.reduce)?)?;
        let scale = ops::sigmoid(&scale.apply(&self.expand)?)?;
        xs.broadcast_mul(&scale)
    }
}

struct Block {
    expand_conv: Option<(Conv2d, BatchNorm)>,
    depthwise: Option<(Conv2d, BatchNorm)>,
    squeeze: Option<SqueezeExcite>,
    project_conv: Conv2d,
    project_bn: BatchNorm,
    residual: bool,
}

impl Block {
    fn new(
        in_channels: usize,
        spec: &StageSpec,
        stride: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let out_channels = spec.channels;
        let mid_channels = in_channels * spec.expand_ratio;
        let residual = stride == 1 && in_channels == out_channels;

        if spec.fused {
            // Fused block: one full 3x3 conv does expansion (or, with
            // expand ratio 1, the projection itself).
            if spec.expand_ratio == 1 {
                let project_conv = conv2d_no_bias(
                    in_channels,
                    out_channels,
                    3,
                    conv_config(3, stride, 1),
                    vb.pp("project_conv"),
                )?;
                let project_bn = batch_norm(
                    out_channels,
                    BN_CONFIG,
                    vb.pp("project_bn"),
                )?;
                return Ok(Self {
                    expand_conv: None,
                    depthwise: None,
                    squeeze: None,
                    project_conv,
                    project_bn,
                    residual,
                });
            }
            let expand_conv = conv2d_no_bias(
                in_channels,
                mid_channels,
                3,
                conv_config(3, stride, 1),
                vb.pp("expand_conv"),
            )?;
            let expand_bn =
                batch_norm(mid_channels, BN_CONFIG, vb.pp("expand_bn"))?;
            let project_conv = conv2d_no_bias(
                mid_channels,
                out_channels,
                1,
                conv_config(1, 1, 1),
                vb.pp("project_conv"),
            )?;
            let project_bn =
                batch_norm(out_channels, BN_CONFIG, vb.pp("project_bn"))?;
            return Ok(Self {
                expand_conv: Some((expand_conv, expand_bn)),
                depthwise: None,
                squeeze: None,
                project_conv,
                project_bn,
                residual,
            });
        }

        let expand_conv = conv2d_no_bias(
            in_channels,
            mid_channels,
            1,
            conv_config(1, 1, 1),
            vb.pp("expand_conv"),
        )?;
        let expand_bn =
            batch_norm(mid_channels, BN_CONFIG, vb.pp("expand_bn"))?;
        let dw_conv = conv2d_no_bias(
            mid_channels,
            mid_channels,
            3,
            conv_config(3, stride, mid_channels),
            vb.pp("dw_conv"),
        )?;
        let dw_bn = batch_norm(mid_channels, BN_CONFIG, vb.pp("dw_bn"))?;
        let reduced = (in_channels / 4).max(1);
        let squeeze =
            SqueezeExcite::new(mid_channels, reduced, vb.pp("se"))?;
        let project_conv = conv2d_no_bias(
            mid_channels,
            out_channels,
            1,
            conv_config(1, 1, 1),
            vb.pp("project_conv"),
        )?;
        let project_bn =
            batch_norm(out_channels, BN_CONFIG, vb.pp("project_bn"))?;
        Ok(Self {
            expand_conv: Some((expand_conv, expand_bn)),
            depthwise: Some((dw_conv, dw_bn)),
            squeeze: Some(squeeze),
            project_conv,
            project_bn,
            residual,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let mut ys = xs.clone();
        if let Some((conv, bn)) = &self.expand_conv {
            ys = ops::silu(&ys.apply(conv)?.apply_t(bn, false)?)?;
        }
        if let Some((conv, bn)) = &self.depthwise {
            ys = ops::silu(&ys.apply(conv)?.apply_t(bn, false)?)?;
        }
        if let Some(squeeze) = &self.squeeze {
            ys = squeeze.forward(&ys)?;
        }
        ys = ys.apply(&self.project_conv)?.apply_t(&self.project_bn, false)?;
        if self.expand_conv.is_none() {
            // Expansionless fused block: the projection conv is the whole
            // block and keeps its activation.
            ys = ops::silu(&ys)?;
        }
        if self.residual {
            ys = (ys + xs)?;
        }
        Ok(ys)
    }
}

/// Staged convolutional backbone with a single-logit head.
///
/// The channel count of the first conv is configurable so the same
/// network reads either raw 3-channel input behind an adapter or the
/// full forensic stack natively.
pub struct Backbone {
    stem_conv: Conv2d,
    stem_bn: BatchNorm,
    blocks: Vec<Block>,
    head_conv: Conv2d,
    head_bn: BatchNorm,
    fc: Linear,
}

impl Backbone {
    pub fn new(
        config: &BackboneConfig,
        in_channels: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let stem_conv = conv2d_no_bias(
            in_channels,
            config.stem_channels,
            3,
            conv_config(3, 2, 1),
            vb.pp("stem").pp("conv"),
        )?;
        let stem_bn = batch_norm(
            config.stem_channels,
            BN_CONFIG,
            vb.pp("stem").pp("bn"),
        )?;

        let mut blocks = Vec::new();
        let mut channels = config.stem_channels;
        let blocks_vb = vb.pp("blocks");
        let mut block_index = 0usize;
        for stage in &config.stages {
            for repeat in 0..stage.repeats {
                let stride = if repeat == 0 { stage.stride } else { 1 };
                let block = Block::new(
                    channels,
                    stage,
                    stride,
                    blocks_vb.pp(block_index),
                )?;
                blocks.push(block);
                channels = stage.channels;
                block_index += 1;
            }
        }

        let head_conv = conv2d_no_bias(
            channels,
            config.head_channels,
            1,
            conv_config(1, 1, 1),
            vb.pp("head").pp("conv"),
        )?;
        let head_bn = batch_norm(
            config.head_channels,
            BN_CONFIG,
            vb.pp("head").pp("bn"),
        )?;
        let fc = linear(config.head_channels, 1, vb.pp("head").pp("fc"))?;

        Ok(Self {
            stem_conv,
            stem_bn,
            blocks,
            head_conv,
            head_bn,
            fc,
        })
    }

    /// `(batch, in_channels, h, w)` -> one logit per batch item,
    /// `(batch, 1)`.
    pub fn forward(
        &self,
        xs: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let mut ys = ops::silu(
            &xs.apply(&self.stem_conv)?.apply_t(&self.stem_bn, false)?,
        )?;
        for block in &self.blocks {
            ys = block.forward(&ys)?;
        }
        ys = ops::silu(
            &ys.apply(&self.head_conv)?.apply_t(&self.head_bn, false)?,
        )?;
        // Global average pool over the spatial dims.
        let pooled = ys.mean(3)?.mean(2)?;
        pooled.apply(&self.fc)
    }
}
