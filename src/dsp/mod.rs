//! Digital Signal Processing (DSP) module.
//!
//! Building blocks of the direction-finding chain, leaves first:
//!
//! # Modules
//! - `oscillator`: mixer phase accumulator for down-conversion.
//! - `ring`: circular sample history used as the FIR delay line.
//! - `filters`: shared FIR coefficient tables.
//! - `downconverter`: per channel × band mixer, FIR low-pass and decimator.
//! - `spectrum`: windowed-FFT spectrum estimation.
//! - `lms`: two-tap complex LMS phase-difference estimator.
//!
//! # Traits
//! - [`DspBlock`]: a generic processing block that consumes a slice of inputs
//!   and returns whatever outputs it produced, keeping its state between calls.

pub mod downconverter;
pub mod filters;
pub mod lms;
pub mod oscillator;
pub mod ring;
pub mod spectrum;

pub trait DspBlock {
    type Input;
    type Output;

    fn process(&mut self, data: &[Self::Input]) -> Vec<Self::Output>;
}
