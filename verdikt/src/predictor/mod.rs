pub mod ensemble;
pub mod record;
pub mod single;
pub mod vote;

use thiserror::Error;

pub use ensemble::{EnsembleMember, EnsemblePredictor};
pub use record::{
    PredictionOutcome, PredictionRecord, RunSummary, Verdict,
};
pub use single::SinglePredictor;
pub use vote::ensemble_vote;

use crate::{checkpoint::ResolveError, runner::RunnerError};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("checkpoint {path} could not be loaded")]
    Resolve {
        path: String,
        #[source]
        source: ResolveError,
    },
    #[error("compute backend initialization failed")]
    Device(#[source] candle_core::Error),
    #[error("model directory {dir} could not be read")]
    ModelDir {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no checkpoint files found in {dir}")]
    EmptyModelDir {
        dir: String,
    },
    #[error("no ensemble member could be loaded")]
    NoMembersLoaded,
}
