pub mod batch;

pub use batch::{BatchRunner, RunnerError};
