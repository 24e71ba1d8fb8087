//! Windowed-FFT spectrum estimation.
//!
//! [`SpectrumEstimator`] turns a block of raw samples into a dB magnitude
//! spectrum normalized to its strongest bin:
//!
//! - Hamming window `0.54 - 0.46·cos(2π·i/(N-1))`
//! - iterative radix-2 FFT (bit-reversal permutation, then log2(N) butterfly
//!   passes with the twiddle `exp(-2πi/l)` recomputed per pass)
//! - magnitude squared, relative to the peak, in dB, floored at [`DB_FLOOR`]
//!
//! The peak power is floored at `1e-12` before normalizing, so an all-zero
//! block yields [`DB_FLOOR`] in every bin instead of a NaN.
//!
//! # Example
//!
//! ```
//! use pelengator::dsp::spectrum::SpectrumEstimator;
//!
//! let est = SpectrumEstimator::new(64).unwrap();
//! let tone: Vec<i8> = (0..64)
//!     .map(|n| (100.0 * (std::f64::consts::TAU * 8.0 * n as f64 / 64.0).cos()) as i8)
//!     .collect();
//! let db = est.estimate(&tone).unwrap();
//! assert_eq!(db.len(), 32);
//! assert_eq!(db[8], 0.0);
//! ```

use std::f64::consts::TAU;

use num_complex::Complex;

use crate::{ComplexSample, Error, Result};

/// Lowest reported level, in dB relative to the peak bin.
pub const DB_FLOOR: f64 = -120.0;

/// Peak power floor applied before normalizing.
const POWER_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct SpectrumEstimator {
    size: usize,
    window: Vec<f64>,
}

impl SpectrumEstimator {
    /// Create an estimator for blocks of `size` samples.
    ///
    /// `size` must be a power of two and at least 2.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(Error::InvalidFftSize(size));
        }
        Ok(Self {
            size,
            window: hamming_window(size),
        })
    }

    /// Block length N.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// One-sided spectrum of a real block: N/2 bins in dB relative to the peak.
    ///
    /// Bin `k` is centred on `k·fs/N`, see [`SpectrumEstimator::bin_frequency`].
    pub fn estimate(&self, samples: &[i8]) -> Result<Vec<f64>> {
        self.check_len(samples.len())?;

        let mut buffer: Vec<ComplexSample> = samples
            .iter()
            .zip(&self.window)
            .map(|(&s, &w)| Complex::new(s as f64 * w, 0.0))
            .collect();
        fft_in_place(&mut buffer);

        let power: Vec<f64> = buffer[..self.size / 2].iter().map(|c| c.norm_sqr()).collect();
        Ok(relative_db(&power))
    }

    /// Two-sided spectrum of a complex block: N bins in dB relative to the peak,
    /// shifted so that index 0 is `-fs/2` and index N/2 is DC.
    pub fn estimate_complex(&self, samples: &[ComplexSample]) -> Result<Vec<f64>> {
        self.check_len(samples.len())?;

        let mut buffer: Vec<ComplexSample> = samples
            .iter()
            .zip(&self.window)
            .map(|(&s, &w)| s * w)
            .collect();
        fft_in_place(&mut buffer);

        let half = self.size / 2;
        let power: Vec<f64> = (0..self.size)
            .map(|k| buffer[(k + half) % self.size].norm_sqr())
            .collect();
        Ok(relative_db(&power))
    }

    /// Centre frequency in Hz of bin `k` of [`SpectrumEstimator::estimate`].
    pub fn bin_frequency(&self, k: usize, sample_rate: f64) -> f64 {
        k as f64 * sample_rate / self.size as f64
    }

    /// Centre frequency in Hz of index `k` of [`SpectrumEstimator::estimate_complex`].
    pub fn shifted_bin_frequency(&self, k: usize, sample_rate: f64) -> f64 {
        (k as f64 - (self.size / 2) as f64) * sample_rate / self.size as f64
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(Error::config(format!(
                "spectrum block must hold {} samples, got {len}",
                self.size
            )));
        }
        Ok(())
    }
}

/// Index of the strongest bin (the first one reading 0 dB).
pub fn peak_bin(spectrum: &[f64]) -> Option<usize> {
    spectrum
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(i, _)| i)
}

/// Symmetric Hamming window of length `n` (n >= 2).
pub fn hamming_window(n: usize) -> Vec<f64> {
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (TAU * i as f64 / denom).cos())
        .collect()
}

/// In-place iterative radix-2 decimation-in-time FFT.
///
/// `buf.len()` must be a power of two, at least 2.
pub(crate) fn fft_in_place(buf: &mut [ComplexSample]) {
    let n = buf.len();
    debug_assert!(n >= 2 && n.is_power_of_two());
    let bits = n.trailing_zeros();

    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if j > i {
            buf.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let step = Complex::from_polar(1.0, -TAU / len as f64);
        for block in buf.chunks_exact_mut(len) {
            let (lo, hi) = block.split_at_mut(len / 2);
            let mut w = Complex::new(1.0, 0.0);
            for (a, b) in lo.iter_mut().zip(hi.iter_mut()) {
                let u = *a;
                let v = *b * w;
                *a = u + v;
                *b = u - v;
                w *= step;
            }
        }
        len <<= 1;
    }
}

fn relative_db(power: &[f64]) -> Vec<f64> {
    let peak = power.iter().copied().fold(0.0, f64::max).max(POWER_FLOOR);
    power
        .iter()
        .map(|&p| (10.0 * (p / peak).log10()).max(DB_FLOOR))
        .collect()
}
