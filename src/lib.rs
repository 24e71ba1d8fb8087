#![doc = include_str!("../readme.md")]

use num_complex::Complex;

pub mod dsp;
pub mod error;
pub mod pipeline;
pub mod synth;

pub use error::{Error, Result};
pub use pipeline::{
    BandConfig, BandOutput, BlockOutput, LmsConfig, PairingTopology, Pipeline, PipelineConfig,
};

/// Complex baseband sample; all DSP arithmetic is double precision.
pub type ComplexSample = Complex<f64>;

/**
 * Reinterpret an instrument byte buffer as signed 8-bit samples
 * (two's complement, the instrument's native binary sample format).
 */
pub fn samples_from_bytes(bytes: &[u8]) -> Vec<i8> {
    bytes.iter().map(|&b| b as i8).collect()
}
