//! Local oscillator for digital down-conversion.
//!
//! The `LocalOscillator` keeps a phase angle in radians, wrapped to `[0, 2π)`,
//! and a fixed per-sample increment. Each call to [`LocalOscillator::next`]
//! returns the down-conversion mixer `(cos φ, -sin φ)` for the current phase and
//! then advances it. Because the increment is validated to lie in `[0, 2π)`,
//! a single subtraction of `2π` always suffices to wrap.
//!
//! # Example
//! ```
//! use pelengator::dsp::oscillator::LocalOscillator;
//!
//! // 125 kHz at 500 kHz: a quarter turn per sample
//! let mut lo = LocalOscillator::new(125_000.0, 500_000.0).unwrap();
//! let first = lo.next();
//! assert!((first.re - 1.0).abs() < 1e-12);
//! let second = lo.next();
//! assert!((second.im + 1.0).abs() < 1e-12);
//! ```

use std::f64::consts::TAU;

use num_complex::Complex;

use crate::{ComplexSample, Error, Result};

#[derive(Debug, Clone)]
pub struct LocalOscillator {
    /// Current mixer phase in radians, in [0, 2π)
    angle: f64,
    /// Phase advance per input sample, 2π·f/fs
    increment: f64,
}

impl LocalOscillator {
    /// Create an oscillator at `frequency` Hz for input sampled at `sample_rate` Hz.
    ///
    /// Fails if the resulting increment is not in `[0, 2π)`, i.e. if the
    /// frequency is negative or not below the sample rate.
    pub fn new(frequency: f64, sample_rate: f64) -> Result<Self> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(Error::config(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        Self::with_increment(TAU * frequency / sample_rate)
    }

    /// Create an oscillator from a raw phase increment in radians per sample.
    pub fn with_increment(increment: f64) -> Result<Self> {
        if !(0.0..TAU).contains(&increment) {
            return Err(Error::InvalidAngleIncrement(increment));
        }
        Ok(Self {
            angle: 0.0,
            increment,
        })
    }

    /// Mixer value for the current phase, then advance by one sample.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> ComplexSample {
        let mixer = Complex::new(self.angle.cos(), -self.angle.sin());
        self.angle += self.increment;
        if self.angle >= TAU {
            self.angle -= TAU;
        }
        mixer
    }

    /// Current phase in radians, in [0, 2π)
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Rewind the phase to zero.
    pub fn reset(&mut self) {
        self.angle = 0.0;
    }
}
