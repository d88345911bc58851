use candle_core::Tensor;
use candle_nn::VarBuilder;

use super::{
    adapter::ChannelAdapter,
    arch::Architecture,
    backbone::Backbone,
};
use crate::forensics::CHANNEL_COUNT;

/// Capability shared by everything the batch runner can drive: score a
/// stacked input batch into one raw logit per item.
pub trait Scorer: Send + Sync {
    fn score(
        &self,
        batch: &Tensor,
    ) -> candle_core::Result<Tensor>;
}

enum Network {
    /// Backbone reads the full forensic stack natively.
    Direct(Backbone),
    /// Channel-reduction adapter in front of a 3-channel backbone.
    Adapted {
        stem: ChannelAdapter,
        backbone: Backbone,
    },
}

/// One loaded network in evaluation mode. Weights are owned exclusively
/// and never mutated after construction.
pub struct Classifier {
    architecture: Architecture,
    network: Network,
}

impl Classifier {
    pub fn direct(
        architecture: Architecture,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let backbone = Backbone::new(
            &architecture.config(),
            CHANNEL_COUNT,
            vb.pp("backbone"),
        )?;
        Ok(Self {
            architecture,
            network: Network::Direct(backbone),
        })
    }

    pub fn adapted(
        architecture: Architecture,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let stem = ChannelAdapter::new(CHANNEL_COUNT, vb.pp("stem"))?;
        let backbone =
            Backbone::new(&architecture.config(), 3, vb.pp("backbone"))?;
        Ok(Self {
            architecture,
            network: Network::Adapted {
                stem,
                backbone,
            },
        })
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn is_adapted(&self) -> bool {
        matches!(self.network, Network::Adapted { .. })
    }
}

impl Scorer for Classifier {
    fn score(
        &self,
        batch: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match &self.network {
            Network::Direct(backbone) => backbone.forward(batch),
            Network::Adapted {
                stem,
                backbone,
            } => backbone.forward(&stem.forward(batch)?),
        }
    }
}
