//! Two-tap complex LMS phase-difference estimator.
//!
//! For each aligned pair of baseband samples `(s0, s1)` from two channels the
//! filter forms `y = w0·s0 + w1·s1`, the error `e = d - y` against a fixed
//! reference `d`, and updates
//!
//! ```text
//! w0 += μ·s0·conj(e)
//! w1 += μ·s1·conj(e)
//! ```
//!
//! The reported value is the phase of the error, `atan2(Im e, Re e)`, in
//! (-π, π]. A negative real error reads π whatever the sign of its zero
//! imaginary part.
//!
//! The step size is fixed: there is no normalization by input power, so the
//! caller must keep `μ·(|s0|² + |s1|²)` small for the weights to stay bounded.
//!
//! # Example
//! ```
//! use num_complex::Complex;
//! use pelengator::dsp::lms::LmsFilter;
//!
//! let one = Complex::new(1.0, 0.0);
//! let mut lms = LmsFilter::new(0.01, one);
//! let mut angle = f64::NAN;
//! for _ in 0..2000 {
//!     angle = lms.step(one, one);
//! }
//! assert!(angle.abs() < 0.01);
//! ```

use std::f64::consts::PI;

use num_complex::Complex;

use super::DspBlock;
use crate::ComplexSample;

/// Step size of the reference configuration.
pub const DEFAULT_STEP_SIZE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct LmsFilter {
    weights: [ComplexSample; 2],
    desired: ComplexSample,
    step_size: f64,
    last_error: ComplexSample,
}

impl Default for LmsFilter {
    /// μ = 0.01 against the unit reference `1 + 0i`.
    fn default() -> Self {
        Self::new(DEFAULT_STEP_SIZE, Complex::new(1.0, 0.0))
    }
}

impl LmsFilter {
    /// Zero weights, fixed `step_size` μ and reference `desired`.
    pub fn new(step_size: f64, desired: ComplexSample) -> Self {
        Self {
            weights: [Complex::new(0.0, 0.0); 2],
            desired,
            step_size,
            last_error: Complex::new(0.0, 0.0),
        }
    }

    /// Weighted combination `w0·s0 + w1·s1`, without updating.
    #[inline]
    pub fn output(&self, s0: ComplexSample, s1: ComplexSample) -> ComplexSample {
        self.weights[0] * s0 + self.weights[1] * s1
    }

    /// Update the weights with one aligned pair and return the error angle in (-π, π].
    pub fn step(&mut self, s0: ComplexSample, s1: ComplexSample) -> f64 {
        let error = self.desired - self.output(s0, s1);
        let correction = error.conj() * self.step_size;
        self.weights[0] += s0 * correction;
        self.weights[1] += s1 * correction;
        self.last_error = error;
        error_angle(error)
    }

    /// Zero the weights and adopt a new reference.
    pub fn reset(&mut self, desired: ComplexSample) {
        self.weights = [Complex::new(0.0, 0.0); 2];
        self.desired = desired;
        self.last_error = Complex::new(0.0, 0.0);
    }

    pub fn weights(&self) -> [ComplexSample; 2] {
        self.weights
    }

    pub fn desired(&self) -> ComplexSample {
        self.desired
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Error of the most recent step (zero before the first one).
    pub fn last_error(&self) -> ComplexSample {
        self.last_error
    }
}

/// Phase of `error` folded into (-π, π].
fn error_angle(error: ComplexSample) -> f64 {
    let angle = error.im.atan2(error.re);
    if angle == -PI { PI } else { angle }
}

impl DspBlock for LmsFilter {
    type Input = (ComplexSample, ComplexSample);
    type Output = f64;

    fn process(&mut self, data: &[Self::Input]) -> Vec<f64> {
        data.iter().map(|&(s0, s1)| self.step(s0, s1)).collect()
    }
}
