pub mod session;

pub use session::{
    DetectorSession, ModelInfo, Predictor, SessionError, SessionInfo,
};
