pub mod loader;

pub use loader::{LoadReport, WeightsError, WeightsLoader};
