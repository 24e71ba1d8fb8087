//! Multi-channel pipeline orchestrator.
//!
//! A [`Pipeline`] owns one [`Downconverter`] per channel × band and one
//! [`LmsFilter`] per band × channel pair. Each call to
//! [`Pipeline::process_block`] walks the channel buffers in lock-step, one
//! input sample index at a time:
//!
//! 1. every channel's sample is fed to that channel's converter for each band;
//! 2. for each pair, if both channels produced a baseband sample on this index
//!    the aligned pair is handed to the pair's LMS estimator, and if only one
//!    did the block fails with [`Error::Misaligned`].
//!
//! Readiness is recomputed on every input index, so a baseband sample is never
//! fed to an estimator twice.
//!
//! Buffers of unequal length are truncated to the shortest one; the dropped
//! tail is reported in [`BlockOutput::truncated`].

use num_complex::Complex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::dsp::downconverter::{Band, Downconverter};
use crate::dsp::filters::{FirTaps, REFERENCE_TAPS};
use crate::dsp::lms::{DEFAULT_STEP_SIZE, LmsFilter};
use crate::dsp::spectrum::SpectrumEstimator;
use crate::{ComplexSample, Error, Result};

/// Sample rate of the reference instrument configuration, in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 500_000.0;
/// First reference band (F_C1), in Hz.
pub const DEFAULT_FC1: f64 = 24_000.0;
/// Second reference band (F_C2), in Hz.
pub const DEFAULT_FC2: f64 = 25_400.0;
pub const DEFAULT_DECIMATION: usize = 20;
pub const DEFAULT_SPECTRUM_SIZE: usize = 1024;

/// One down-conversion band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Centre frequency in Hz
    pub center_frequency: f64,
    /// Decimation factor D
    pub decimation: usize,
    /// FIR coefficients, `taps[0]` applied to the newest sample
    pub taps: Vec<f64>,
}

impl BandConfig {
    pub fn new(center_frequency: f64, decimation: usize, taps: Vec<f64>) -> Self {
        Self {
            center_frequency,
            decimation,
            taps,
        }
    }

    /// Band at `center_frequency` with the reference decimation and table.
    pub fn reference(center_frequency: f64) -> Self {
        Self::new(center_frequency, DEFAULT_DECIMATION, REFERENCE_TAPS.to_vec())
    }
}

/// Which channel pairs get an LMS estimator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingTopology {
    /// Neighbouring channels around the array: (0,1), (1,2), ..., (K-1,0)
    #[default]
    Ring,
    /// Channel 0 against every other channel
    Reference,
    /// Every unordered pair
    AllPairs,
    /// A fixed list of pairs
    Explicit(Vec<(usize, usize)>),
}

impl PairingTopology {
    /// Resolve the topology for `channels` channels.
    ///
    /// A two-channel ring has a single pair; fewer than two channels have none.
    pub fn pairs(&self, channels: usize) -> Vec<(usize, usize)> {
        match self {
            PairingTopology::Ring => match channels {
                0 | 1 => Vec::new(),
                2 => vec![(0, 1)],
                k => (0..k).map(|i| (i, (i + 1) % k)).collect(),
            },
            PairingTopology::Reference => (1..channels).map(|i| (0, i)).collect(),
            PairingTopology::AllPairs => (0..channels)
                .flat_map(|i| (i + 1..channels).map(move |j| (i, j)))
                .collect(),
            PairingTopology::Explicit(pairs) => pairs.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmsConfig {
    /// Fixed step size μ
    pub step_size: f64,
    /// Reference value the weighted combination is driven towards
    pub desired: ComplexSample,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            desired: Complex::new(1.0, 0.0),
        }
    }
}

/// Complete pipeline configuration.
///
/// Missing fields take their [`Default`] values when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub channels: usize,
    /// Input sample rate in Hz, shared by every channel
    pub sample_rate: f64,
    pub bands: Vec<BandConfig>,
    pub topology: PairingTopology,
    pub lms: LmsConfig,
    /// Block length of diagnostic spectra (power of two)
    pub spectrum_size: usize,
    /// Compute spectra every this many blocks; 0 disables them
    pub spectrum_interval: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bands: vec![
                BandConfig::reference(DEFAULT_FC1),
                BandConfig::reference(DEFAULT_FC2),
            ],
            topology: PairingTopology::Ring,
            lms: LmsConfig::default(),
            spectrum_size: DEFAULT_SPECTRUM_SIZE,
            spectrum_interval: 0,
        }
    }
}

impl PipelineConfig {
    /// Check every precondition [`Pipeline::new`] relies on.
    pub fn validate(&self) -> Result<()> {
        self.resolve().map(|_| ())
    }

    fn resolve(&self) -> Result<(Vec<Band>, Vec<(usize, usize)>, SpectrumEstimator)> {
        if self.channels == 0 {
            return Err(Error::config("at least one channel is required"));
        }
        if !(self.sample_rate > 0.0) || !self.sample_rate.is_finite() {
            return Err(Error::config(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.bands.is_empty() {
            return Err(Error::config("at least one band is required"));
        }

        let bands = self
            .bands
            .iter()
            .map(|b| {
                let taps = FirTaps::new(b.taps.clone())?;
                Band::new(b.center_frequency, self.sample_rate, b.decimation, taps)
            })
            .collect::<Result<Vec<_>>>()?;

        let pairs = self.topology.pairs(self.channels);
        for &(a, b) in &pairs {
            if a >= self.channels || b >= self.channels {
                return Err(Error::config(format!(
                    "pair ({a}, {b}) refers to a channel outside 0..{}",
                    self.channels
                )));
            }
            if a == b {
                return Err(Error::config(format!("pair ({a}, {b}) pairs a channel with itself")));
            }
        }

        if !self.lms.step_size.is_finite() || self.lms.step_size < 0.0 {
            return Err(Error::config(format!(
                "LMS step size must be finite and non-negative, got {}",
                self.lms.step_size
            )));
        }
        if !self.lms.desired.is_finite() {
            return Err(Error::config("LMS reference must be finite"));
        }

        let spectrum = SpectrumEstimator::new(self.spectrum_size)?;
        Ok((bands, pairs, spectrum))
    }
}

/// Outputs of one band for one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandOutput {
    pub center_frequency: f64,
    /// Baseband samples produced during the block, per channel
    pub baseband: Vec<Vec<ComplexSample>>,
    /// LMS error angles produced during the block, per pair
    pub angles: Vec<Vec<f64>>,
}

impl BandOutput {
    /// Circular mean `atan2(Σsin, Σcos)` of the pair's angles in the block.
    pub fn mean_angle(&self, pair: usize) -> Option<f64> {
        let angles = self.angles.get(pair)?;
        if angles.is_empty() {
            return None;
        }
        let (sin, cos) = angles
            .iter()
            .fold((0.0, 0.0), |(s, c), a| (s + a.sin(), c + a.cos()));
        Some(sin.atan2(cos))
    }

    pub fn last_angle(&self, pair: usize) -> Option<f64> {
        self.angles.get(pair)?.last().copied()
    }
}

/// Everything produced by one [`Pipeline::process_block`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockOutput {
    /// One entry per configured band, in configuration order
    pub bands: Vec<BandOutput>,
    /// One-sided dB spectrum per channel, on blocks selected by `spectrum_interval`
    pub spectra: Option<Vec<Vec<f64>>>,
    /// Samples consumed from each channel buffer
    pub samples_used: usize,
    /// Samples dropped across all channels by truncating to the shortest buffer
    pub truncated: usize,
}

#[derive(Debug, Clone)]
struct BandState {
    band: Band,
    converters: Vec<Downconverter>,
    estimators: Vec<LmsFilter>,
    /// Output of each channel's converter on the current input index
    ready: Vec<Option<ComplexSample>>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    bands: Vec<BandState>,
    pairs: Vec<(usize, usize)>,
    spectrum: SpectrumEstimator,
    samples_processed: usize,
    blocks_processed: usize,
}

impl Pipeline {
    /// Validate `config` and allocate every channel, band and pair state.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let (bands, pairs, spectrum) = config.resolve()?;

        if pairs.is_empty() {
            warn!(
                channels = config.channels,
                "No channel pairs: LMS estimation disabled"
            );
        }

        let bands: Vec<BandState> = bands
            .into_iter()
            .map(|band| BandState {
                converters: (0..config.channels).map(|_| Downconverter::new(&band)).collect(),
                estimators: pairs
                    .iter()
                    .map(|_| LmsFilter::new(config.lms.step_size, config.lms.desired))
                    .collect(),
                ready: vec![None; config.channels],
                band,
            })
            .collect();

        for (i, state) in bands.iter().enumerate() {
            info!(
                band = i,
                center_frequency = state.band.center_frequency(),
                decimation = state.band.decimation(),
                taps = state.band.tap_count(),
                output_rate = state.band.output_sample_rate(),
                "Configured band"
            );
        }
        info!(
            channels = config.channels,
            pairs = pairs.len(),
            sample_rate = config.sample_rate,
            "Pipeline ready"
        );

        Ok(Self {
            config,
            bands,
            pairs,
            spectrum,
            samples_processed: 0,
            blocks_processed: 0,
        })
    }

    /// Drive one acquisition block, one buffer per channel.
    ///
    /// On [`Error::Misaligned`] the block is abandoned part-way and the
    /// pipeline should be [`reset`](Pipeline::reset) before further use.
    pub fn process_block(&mut self, buffers: &[&[i8]]) -> Result<BlockOutput> {
        let channels = self.config.channels;
        if buffers.len() != channels {
            return Err(Error::ChannelCount {
                expected: channels,
                actual: buffers.len(),
            });
        }

        let len = buffers.iter().map(|b| b.len()).min().unwrap_or(0);
        let truncated: usize = buffers.iter().map(|b| b.len() - len).sum();
        if truncated > 0 {
            warn!(
                samples_used = len,
                truncated, "Channel buffers differ in length, truncating to the shortest"
            );
        }

        let mut outputs: Vec<BandOutput> = self
            .bands
            .iter()
            .map(|state| {
                let expected = len / state.band.decimation() + 1;
                BandOutput {
                    center_frequency: state.band.center_frequency(),
                    baseband: (0..channels).map(|_| Vec::with_capacity(expected)).collect(),
                    angles: (0..self.pairs.len())
                        .map(|_| Vec::with_capacity(expected))
                        .collect(),
                }
            })
            .collect();

        for n in 0..len {
            for (b, (state, out)) in self.bands.iter_mut().zip(outputs.iter_mut()).enumerate() {
                for (c, converter) in state.converters.iter_mut().enumerate() {
                    let sample = converter.advance(buffers[c][n]);
                    if let Some(s) = sample {
                        out.baseband[c].push(s);
                    }
                    state.ready[c] = sample;
                }

                for (p, &(i, j)) in self.pairs.iter().enumerate() {
                    match (state.ready[i], state.ready[j]) {
                        (Some(s0), Some(s1)) => {
                            out.angles[p].push(state.estimators[p].step(s0, s1));
                        }
                        (None, None) => {}
                        _ => {
                            return Err(Error::Misaligned {
                                band: b,
                                sample: self.samples_processed + n,
                            });
                        }
                    }
                }
            }
        }

        self.samples_processed += len;
        self.blocks_processed += 1;

        let spectra = self.block_spectra(buffers, len)?;

        for (b, out) in outputs.iter().enumerate() {
            for (p, pair) in self.pairs.iter().enumerate() {
                trace!(
                    band = b,
                    pair = ?pair,
                    steps = out.angles[p].len(),
                    mean_angle = out.mean_angle(p),
                    "LMS pair"
                );
            }
        }
        debug!(
            block = self.blocks_processed,
            samples_used = len,
            outputs = outputs.first().map_or(0, |o| o.baseband[0].len()),
            spectra = spectra.is_some(),
            "Processed block"
        );

        Ok(BlockOutput {
            bands: outputs,
            spectra,
            samples_used: len,
            truncated,
        })
    }

    fn block_spectra(&self, buffers: &[&[i8]], len: usize) -> Result<Option<Vec<Vec<f64>>>> {
        let interval = self.config.spectrum_interval;
        if interval == 0 || self.blocks_processed % interval != 0 {
            return Ok(None);
        }
        let size = self.spectrum.size();
        if len < size {
            debug!(len, size, "Block shorter than spectrum size, skipping spectra");
            return Ok(None);
        }
        buffers
            .iter()
            .map(|b| self.spectrum.estimate(&b[..size]))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// One-sided dB spectrum of the leading `spectrum_size` samples of `samples`.
    pub fn spectrum(&self, samples: &[i8]) -> Result<Vec<f64>> {
        let size = self.spectrum.size();
        if samples.len() < size {
            return Err(Error::config(format!(
                "spectrum needs {size} samples, got {}",
                samples.len()
            )));
        }
        self.spectrum.estimate(&samples[..size])
    }

    /// Return every converter and estimator to its initial state.
    pub fn reset(&mut self) {
        for state in &mut self.bands {
            state.converters.iter_mut().for_each(Downconverter::reset);
            for estimator in &mut state.estimators {
                estimator.reset(self.config.lms.desired);
            }
            state.ready.fill(None);
        }
        self.samples_processed = 0;
        self.blocks_processed = 0;
    }

    /// Channel pairs, in the order of [`BandOutput::angles`].
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn bands(&self) -> impl Iterator<Item = &Band> {
        self.bands.iter().map(|s| &s.band)
    }

    pub fn spectrum_estimator(&self) -> &SpectrumEstimator {
        &self.spectrum
    }

    /// LMS estimator of `pair` on `band`.
    pub fn estimator(&self, band: usize, pair: usize) -> Option<&LmsFilter> {
        self.bands.get(band)?.estimators.get(pair)
    }

    /// Samples consumed per channel since construction or the last reset.
    pub fn samples_processed(&self) -> usize {
        self.samples_processed
    }

    pub fn blocks_processed(&self) -> usize {
        self.blocks_processed
    }
}
