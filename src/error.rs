//! Error handling for the pelengator library
//!
//! Every error in this crate is a precondition violation detected before any
//! sample is processed: a malformed configuration, a buffer set of the wrong
//! shape, or a broken alignment invariant between channels. Numeric
//! degeneracies (all-zero input, vanishing FFT energy) are absorbed internally
//! and never surface here.

use thiserror::Error;

/// A specialized Result type for pelengator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pelengator operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Spectrum size is not a power of two (or is smaller than 2)
    #[error("FFT size {0} is not a power of two >= 2")]
    InvalidFftSize(usize),

    /// Mixer phase increment outside [0, 2π)
    #[error("Angle increment {0} rad/sample is outside [0, 2π)")]
    InvalidAngleIncrement(f64),

    /// Invalid pipeline, band or filter configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wrong number of channel buffers handed to the pipeline
    #[error("Expected {expected} channel buffers, got {actual}")]
    ChannelCount { expected: usize, actual: usize },

    /// Channels of one pairing produced decimated samples on different inputs
    #[error("Channels of band {band} fell out of alignment at input sample {sample}")]
    Misaligned { band: usize, sample: usize },
}

impl Error {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
