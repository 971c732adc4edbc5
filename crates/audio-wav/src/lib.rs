mod error;
mod prepare;
mod wav;

pub use error::{AudioWavError, Result};
pub use prepare::{PreparedAudio, prepare_audio};
pub use wav::{CANONICAL_BITS_PER_SAMPLE, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE, WavHeader, inspect};
