use super::backbone::{BackboneConfig, StageSpec};

/// Members of the backbone family a checkpoint can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    B0,
    B1,
    B2,
    B3,
    S,
    M,
    L,
    Xl,
}

/// Fallback when a checkpoint name matches no known member.
pub const DEFAULT_ARCHITECTURE: Architecture = Architecture::M;

// B0 baseline; B1-B3 are width/depth scalings of it.
const STAGES_B0: &[StageSpec] = &[
    StageSpec::fused(1, 16, 1, 1),
    StageSpec::fused(4, 32, 2, 2),
    StageSpec::fused(4, 48, 2, 2),
    StageSpec::squeezed(4, 96, 3, 2),
    StageSpec::squeezed(6, 112, 5, 1),
    StageSpec::squeezed(6, 192, 8, 2),
];

const STAGES_S: &[StageSpec] = &[
    StageSpec::fused(1, 24, 2, 1),
    StageSpec::fused(4, 48, 4, 2),
    StageSpec::fused(4, 64, 4, 2),
    StageSpec::squeezed(4, 128, 6, 2),
    StageSpec::squeezed(6, 160, 9, 1),
    StageSpec::squeezed(6, 256, 15, 2),
];

const STAGES_M: &[StageSpec] = &[
    StageSpec::fused(1, 24, 3, 1),
    StageSpec::fused(4, 48, 5, 2),
    StageSpec::fused(4, 80, 5, 2),
    StageSpec::squeezed(4, 160, 7, 2),
    StageSpec::squeezed(6, 176, 14, 1),
    StageSpec::squeezed(6, 304, 18, 2),
    StageSpec::squeezed(6, 512, 5, 1),
];

const STAGES_L: &[StageSpec] = &[
    StageSpec::fused(1, 32, 4, 1),
    StageSpec::fused(4, 64, 7, 2),
    StageSpec::fused(4, 96, 7, 2),
    StageSpec::squeezed(4, 192, 10, 2),
    StageSpec::squeezed(6, 224, 19, 1),
    StageSpec::squeezed(6, 384, 25, 2),
    StageSpec::squeezed(6, 640, 7, 1),
];

const STAGES_XL: &[StageSpec] = &[
    StageSpec::fused(1, 32, 4, 1),
    StageSpec::fused(4, 64, 8, 2),
    StageSpec::fused(4, 96, 8, 2),
    StageSpec::squeezed(4, 192, 16, 2),
    StageSpec::squeezed(6, 256, 24, 1),
    StageSpec::squeezed(6, 512, 32, 2),
    StageSpec::squeezed(6, 640, 8, 1),
];

fn round_channels(value: f32) -> usize {
    let divisor = 8.0f32;
    let mut rounded = ((value + divisor / 2.0) / divisor).floor() * divisor;
    if rounded < divisor {
        rounded = divisor;
    }
    if rounded < 0.9 * value {
        rounded += divisor;
    }
    rounded as usize
}

fn scale_stages(
    stages: &[StageSpec],
    width: f32,
    depth: f32,
) -> Vec<StageSpec> {
    stages
        .iter()
        .map(|spec| StageSpec {
            channels: round_channels(spec.channels as f32 * width),
            repeats: (spec.repeats as f32 * depth).ceil() as usize,
            ..*spec
        })
        .collect()
}

impl Architecture {
    pub fn identifier(&self) -> &'static str {
        match self {
            Architecture::B0 => "efficientnetv2_b0",
            Architecture::B1 => "efficientnetv2_b1",
            Architecture::B2 => "efficientnetv2_b2",
            Architecture::B3 => "efficientnetv2_b3",
            Architecture::S => "efficientnetv2_s",
            Architecture::M => "efficientnetv2_m",
            Architecture::L => "efficientnetv2_l",
            Architecture::Xl => "efficientnetv2_xl",
        }
    }

    pub fn config(&self) -> BackboneConfig {
        let (stages, width, depth) = match self {
            Architecture::B0 => (STAGES_B0, 1.0, 1.0),
            Architecture::B1 => (STAGES_B0, 1.0, 1.1),
            Architecture::B2 => (STAGES_B0, 1.1, 1.2),
            Architecture::B3 => (STAGES_B0, 1.2, 1.4),
            Architecture::S => (STAGES_S, 1.0, 1.0),
            Architecture::M => (STAGES_M, 1.0, 1.0),
            Architecture::L => (STAGES_L, 1.0, 1.0),
            Architecture::Xl => (STAGES_XL, 1.0, 1.0),
        };
        let stem_channels = match self {
            Architecture::B0 | Architecture::B1 => 32,
            Architecture::B2 => round_channels(32.0 * 1.1),
            Architecture::B3 => round_channels(32.0 * 1.2),
            Architecture::S | Architecture::M => 24,
            Architecture::L | Architecture::Xl => 32,
        };
        let head_channels = match self {
            Architecture::B0 | Architecture::B1 => 1280,
            Architecture::B2 => round_channels(1280.0 * 1.1),
            Architecture::B3 => round_channels(1280.0 * 1.2),
            _ => 1280,
        };
        BackboneConfig {
            stem_channels,
            stages: scale_stages(stages, width, depth),
            head_channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_configs_are_unscaled() {
        let config = Architecture::S.config();
        assert_eq!(config.stem_channels, 24);
        assert_eq!(config.stages.len(), 6);
        assert_eq!(config.stages[5].channels, 256);
        assert_eq!(config.head_channels, 1280);
    }

    #[test]
    fn b3_scales_width_and_depth() {
        let b0 = Architecture::B0.config();
        let b3 = Architecture::B3.config();
        assert_eq!(b3.stem_channels, 40);
        assert_eq!(b3.head_channels, 1536);
        assert!(b3.stages[1].channels > b0.stages[1].channels);
        assert!(b3.stages[5].repeats > b0.stages[5].repeats);
    }

    #[test]
    fn round_channels_is_divisor_aligned() {
        assert_eq!(round_channels(32.0), 32);
        assert_eq!(round_channels(35.2), 32);
        assert_eq!(round_channels(38.4), 40);
        assert_eq!(round_channels(3.0), 8);
    }
}
