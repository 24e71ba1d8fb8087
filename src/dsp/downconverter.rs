//! Complex digital down-converter with decimating FIR low-pass.
//!
//! A [`Downconverter`] turns a real stream of signed 8-bit samples into a
//! complex baseband stream centred on one [`Band`]:
//!
//! 1. mix each sample with the local oscillator `(cos φ, -sin φ)`, shifting the
//!    band centre to 0 Hz;
//! 2. push the mixed sample into a circular history as long as the tap table;
//! 3. every `decimation` inputs, convolve the table against the history
//!    (newest sample first) and emit the result.
//!
//! Output amplitude is not renormalised: the gain is the coefficient sum of
//! the table.
//!
//! # Example
//!
//! ```rust
//! use pelengator::dsp::downconverter::{Band, Downconverter};
//! use pelengator::dsp::filters::FirTaps;
//!
//! let taps = FirTaps::new(vec![1.0 / 8.0; 8]).unwrap();
//! let band = Band::new(24_000.0, 500_000.0, 20, taps).unwrap();
//! let mut ddc = Downconverter::new(&band);
//!
//! let outputs = (0..100).filter_map(|_| ddc.advance(10)).count();
//! assert_eq!(outputs, 5);
//! ```

use super::DspBlock;
use super::filters::FirTaps;
use super::oscillator::LocalOscillator;
use super::ring::HistoryRing;
use crate::{ComplexSample, Error, Result};

/// One target frequency band: centre frequency, decimation and coefficient table.
///
/// Cloning a `Band` shares the coefficient table.
#[derive(Debug, Clone)]
pub struct Band {
    center_frequency: f64,
    sample_rate: f64,
    decimation: usize,
    taps: FirTaps,
    /// Oscillator at phase zero, copied into every converter of this band
    oscillator: LocalOscillator,
}

impl Band {
    /// Describe a band of `center_frequency` Hz in a stream sampled at `sample_rate` Hz.
    ///
    /// # Errors
    /// - [`Error::Config`] if `decimation` is 0 or the sample rate is not positive
    /// - [`Error::InvalidAngleIncrement`] if the centre frequency maps to a
    ///   phase increment outside `[0, 2π)`
    pub fn new(
        center_frequency: f64,
        sample_rate: f64,
        decimation: usize,
        taps: FirTaps,
    ) -> Result<Self> {
        if decimation == 0 {
            return Err(Error::config("decimation factor must be greater than 0"));
        }
        let oscillator = LocalOscillator::new(center_frequency, sample_rate)?;
        Ok(Self {
            center_frequency,
            sample_rate,
            decimation,
            taps,
            oscillator,
        })
    }

    pub fn center_frequency(&self) -> f64 {
        self.center_frequency
    }

    /// Input sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Baseband sample rate in Hz.
    pub fn output_sample_rate(&self) -> f64 {
        self.sample_rate / self.decimation as f64
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn taps(&self) -> &FirTaps {
        &self.taps
    }

    /// Mixer phase advance per input sample, 2π·f_c/f_s.
    pub fn angle_increment(&self) -> f64 {
        self.oscillator.increment()
    }
}

/// Per channel × band down-conversion state.
///
/// All state is allocated at construction; [`Downconverter::advance`] performs
/// no allocation and cannot fail.
#[derive(Debug, Clone)]
pub struct Downconverter {
    band: Band,
    oscillator: LocalOscillator,
    history: HistoryRing,
    /// Inputs since the last output, in 0..decimation
    counter: usize,
}

impl Downconverter {
    pub fn new(band: &Band) -> Self {
        Self {
            band: band.clone(),
            oscillator: band.oscillator.clone(),
            history: HistoryRing::new(band.tap_count()),
            counter: 0,
        }
    }

    /// Consume one real input sample.
    ///
    /// Returns a filtered complex baseband sample when this input completes a
    /// decimation cycle, `None` otherwise.
    #[inline]
    pub fn advance(&mut self, sample: i8) -> Option<ComplexSample> {
        let mixed = self.oscillator.next() * sample as f64;
        self.history.push(mixed);

        self.counter += 1;
        if self.counter == self.band.decimation {
            self.counter = 0;
            Some(self.history.convolve(&self.band.taps))
        } else {
            None
        }
    }

    /// Return to the freshly constructed state.
    pub fn reset(&mut self) {
        self.oscillator.reset();
        self.history.clear();
        self.counter = 0;
    }

    pub fn band(&self) -> &Band {
        &self.band
    }

    /// Inputs consumed since the last output.
    pub fn pending(&self) -> usize {
        self.counter
    }
}

impl DspBlock for Downconverter {
    type Input = i8;
    type Output = ComplexSample;

    /// Run [`Downconverter::advance`] over a slice and collect the outputs.
    ///
    /// State carries across calls, so chunk boundaries do not matter.
    fn process(&mut self, data: &[i8]) -> Vec<ComplexSample> {
        let mut out = Vec::with_capacity(data.len() / self.band.decimation + 1);
        out.extend(data.iter().filter_map(|&s| self.advance(s)));
        out
    }
}
