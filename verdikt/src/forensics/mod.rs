pub mod channels;
pub mod fft;
pub mod residual;

pub use channels::{
    CHANNEL_COUNT, REFERENCE_MEAN, REFERENCE_STD, build_input_planes,
};
