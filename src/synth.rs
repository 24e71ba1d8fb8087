//! Synthetic multi-channel acquisition source.
//!
//! [`ToneSource`] stands in for the instrument: every channel carries a cosine
//! of its own frequency, phase and amplitude plus optional uniform noise, and
//! is quantized to signed 8-bit samples. Time runs on continuously from one
//! block to the next, so consecutive blocks join without a phase jump.
//!
//! Noise comes from a seeded ChaCha8 generator, so a given seed always yields
//! the same samples.
//!
//! # Example
//! ```
//! use pelengator::synth::ToneSource;
//!
//! let mut source = ToneSource::panoramic(4, 500_000.0, 2048, 7).unwrap();
//! let block = source.next_block();
//! assert_eq!(block.len(), 4);
//! assert!(block.iter().all(|ch| ch.len() == 2048));
//! ```

use std::f64::consts::{FRAC_PI_4, TAU};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Signal on one synthetic channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    /// Hz
    pub frequency: f64,
    /// Radians at sample 0
    pub phase: f64,
    /// Peak amplitude in sample units
    pub amplitude: f64,
    /// Peak-to-peak amplitude of the uniform noise, 0 for none
    pub noise: f64,
}

impl ToneSpec {
    pub fn new(frequency: f64, phase: f64, amplitude: f64, noise: f64) -> Self {
        Self {
            frequency,
            phase,
            amplitude,
            noise,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToneSource {
    sample_rate: f64,
    block_len: usize,
    tones: Vec<ToneSpec>,
    rng: ChaCha8Rng,
    /// Index of the next sample to produce
    position: u64,
}

impl ToneSource {
    /// One channel per entry of `tones`, blocks of `block_len` samples.
    pub fn new(sample_rate: f64, block_len: usize, tones: Vec<ToneSpec>, seed: u64) -> Result<Self> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(Error::config(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if tones.is_empty() {
            return Err(Error::config("synthetic source needs at least one channel"));
        }
        if let Some(t) = tones.iter().find(|t| {
            ![t.frequency, t.phase, t.amplitude, t.noise]
                .iter()
                .all(|v| v.is_finite())
                || t.noise < 0.0
        }) {
            return Err(Error::config(format!("invalid synthetic tone {t:?}")));
        }
        Ok(Self {
            sample_rate,
            block_len,
            tones,
            rng: ChaCha8Rng::seed_from_u64(seed),
            position: 0,
        })
    }

    /// Test pattern of the panoramic display: channel `k` carries
    /// `2 kHz + k·1 kHz` at phase `k·π/4`, amplitude 120, noise 5.
    pub fn panoramic(channels: usize, sample_rate: f64, block_len: usize, seed: u64) -> Result<Self> {
        let tones = (0..channels)
            .map(|k| ToneSpec::new(2_000.0 + 1_000.0 * k as f64, FRAC_PI_4 * k as f64, 120.0, 5.0))
            .collect();
        Self::new(sample_rate, block_len, tones, seed)
    }

    /// The same tone on every channel, channel `k` delayed by `k·phase_step` radians.
    ///
    /// Models a plane wave crossing a uniform linear array.
    pub fn phased_array(
        channels: usize,
        tone: ToneSpec,
        phase_step: f64,
        sample_rate: f64,
        block_len: usize,
        seed: u64,
    ) -> Result<Self> {
        let tones = (0..channels)
            .map(|k| ToneSpec {
                phase: tone.phase - phase_step * k as f64,
                ..tone.clone()
            })
            .collect();
        Self::new(sample_rate, block_len, tones, seed)
    }

    pub fn channels(&self) -> usize {
        self.tones.len()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn tones(&self) -> &[ToneSpec] {
        &self.tones
    }

    /// Samples produced so far on each channel.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Produce the next block, one buffer per channel.
    pub fn next_block(&mut self) -> Vec<Vec<i8>> {
        let start = self.position;
        let len = self.block_len as u64;
        let rate = self.sample_rate;
        let rng = &mut self.rng;
        let block = self
            .tones
            .iter()
            .map(|tone| {
                (start..start + len)
                    .map(|n| {
                        let t = n as f64 / rate;
                        let mut v = tone.amplitude * (TAU * tone.frequency * t + tone.phase).cos();
                        if tone.noise > 0.0 {
                            let half = tone.noise / 2.0;
                            v += rng.gen_range(-half..=half);
                        }
                        quantize(v)
                    })
                    .collect()
            })
            .collect();
        self.position += self.block_len as u64;
        block
    }
}

impl Iterator for ToneSource {
    type Item = Vec<Vec<i8>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_block())
    }
}

/// Round to the nearest integer and saturate to the i8 range.
fn quantize(v: f64) -> i8 {
    v.round().clamp(i8::MIN as f64, i8::MAX as f64) as i8
}
