//! Direction-finding pipeline runner
//!
//! Feeds multi-channel signed 8-bit acquisitions through the pelengator
//! pipeline and prints, per block, the LMS error angle of every channel pair
//! and the spectral peak of every channel.
//!
//! # Usage Examples
//!
//! ## Synthetic plane wave on a 4-element array
//! ```bash
//! pelengator synth --channels 4 --tone 24k --phase-step 0.4 -v
//! ```
//!
//! ## Panoramic test pattern (a different tone per channel)
//! ```bash
//! pelengator synth --panoramic --spectrum-interval 1
//! ```
//!
//! ## Raw capture files, one per channel, JSON output
//! ```bash
//! pelengator file ch0.bin ch1.bin ch2.bin ch3.bin --json
//! ```
//!
//! ## Custom configuration
//! ```bash
//! pelengator --config pipeline.json -b 24k -b 25.4k file ch0.bin ch1.bin
//! ```

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use crossbeam::channel;
use pelengator::dsp::filters::REFERENCE_TAPS;
use pelengator::dsp::spectrum::peak_bin;
use pelengator::synth::{ToneSource, ToneSpec};
use pelengator::{BandConfig, BlockOutput, PairingTopology, Pipeline, PipelineConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct Frequency(f64);

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(stripped) = s.strip_suffix('M') {
            let val: f64 = stripped.trim().parse().map_err(|_| "Invalid MHz value")?;
            Ok(Frequency(val * 1_000_000.0))
        } else if let Some(stripped) = s.strip_suffix('k') {
            let val: f64 = stripped.trim().parse().map_err(|_| "Invalid kHz value")?;
            Ok(Frequency(val * 1_000.0))
        } else {
            let val: f64 = s.parse().map_err(|_| "Invalid Hz value")?;
            Ok(Frequency(val))
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Topology {
    Ring,
    Reference,
    AllPairs,
}

impl From<Topology> for PairingTopology {
    fn from(t: Topology) -> Self {
        match t {
            Topology::Ring => PairingTopology::Ring,
            Topology::Reference => PairingTopology::Reference,
            Topology::AllPairs => PairingTopology::AllPairs,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-channel direction-finding DSP pipeline", long_about = None)]
struct Args {
    #[command(subcommand)]
    source: Source,

    /// Pipeline configuration file (JSON); the flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input sample rate in Hz (accepts k/M suffix, e.g. 500k)
    #[arg(short, long, global = true, value_parser = Frequency::from_str)]
    sample_rate: Option<Frequency>,

    /// Band centre frequency, repeat for several bands (e.g. -b 24k -b 25.4k)
    #[arg(short = 'b', long = "band", global = true, value_parser = Frequency::from_str)]
    bands: Vec<Frequency>,

    /// Decimation factor applied to every band
    #[arg(short, long, global = true)]
    decimation: Option<usize>,

    /// Channel pairing for the LMS estimators
    #[arg(long, global = true)]
    topology: Option<Topology>,

    /// LMS step size
    #[arg(long, global = true)]
    step_size: Option<f64>,

    /// Compute spectra every N blocks (0 disables)
    #[arg(long, global = true)]
    spectrum_interval: Option<usize>,

    /// Samples per channel per block
    #[arg(long, global = true, default_value_t = 8192)]
    block_size: usize,

    /// Output one JSON object per block
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Verbosity level (-v=info, -vv=debug, -vvv=trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Synthetic tones
    Synth {
        /// Number of channels
        #[arg(long, default_value_t = 4)]
        channels: usize,

        /// Tone frequency, identical on every channel
        #[arg(long, default_value = "24k", value_parser = Frequency::from_str)]
        tone: Frequency,

        /// Tone amplitude in sample units
        #[arg(long, default_value_t = 100.0)]
        amplitude: f64,

        /// Phase lag between neighbouring channels in radians
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        phase_step: f64,

        /// Peak-to-peak uniform noise in sample units
        #[arg(long, default_value_t = 2.0)]
        noise: f64,

        /// Noise generator seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Number of blocks to generate
        #[arg(short = 'n', long, default_value_t = 10)]
        blocks: usize,

        /// Use the panoramic test pattern instead of a common tone
        #[arg(long, default_value_t = false)]
        panoramic: bool,
    },
    /// Raw signed 8-bit captures, one file per channel
    File {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },
}

/// Blocks of per-channel samples from the selected source.
enum BlockSource {
    Synth {
        source: ToneSource,
        remaining: usize,
    },
    Files {
        channels: Vec<Vec<i8>>,
        offset: usize,
        block_size: usize,
    },
}

impl Iterator for BlockSource {
    type Item = Vec<Vec<i8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BlockSource::Synth { source, remaining } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                Some(source.next_block())
            }
            BlockSource::Files {
                channels,
                offset,
                block_size,
            } => {
                let shortest = channels.iter().map(|c| c.len()).min().unwrap_or(0);
                if *offset >= shortest {
                    return None;
                }
                let end = (*offset + *block_size).min(shortest);
                let block = channels.iter().map(|c| c[*offset..end].to_vec()).collect();
                *offset = end;
                Some(block)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct PairSummary {
    channels: (usize, usize),
    mean_angle: Option<f64>,
    last_angle: Option<f64>,
}

#[derive(Debug, Serialize)]
struct BandSummary {
    center_frequency: f64,
    outputs: usize,
    pairs: Vec<PairSummary>,
}

#[derive(Debug, Serialize)]
struct BlockSummary {
    block: usize,
    samples: usize,
    truncated: usize,
    bands: Vec<BandSummary>,
    /// Frequency of the strongest spectral bin per channel, in Hz
    #[serde(skip_serializing_if = "Option::is_none")]
    peaks: Option<Vec<f64>>,
}

impl BlockSummary {
    fn new(block: usize, output: &BlockOutput, pipeline: &Pipeline) -> Self {
        let bands = output
            .bands
            .iter()
            .map(|band| BandSummary {
                center_frequency: band.center_frequency,
                outputs: band.baseband.first().map_or(0, |b| b.len()),
                pairs: pipeline
                    .pairs()
                    .iter()
                    .enumerate()
                    .map(|(p, &channels)| PairSummary {
                        channels,
                        mean_angle: band.mean_angle(p),
                        last_angle: band.last_angle(p),
                    })
                    .collect(),
            })
            .collect();

        let estimator = pipeline.spectrum_estimator();
        let sample_rate = pipeline.config().sample_rate;
        let peaks = output.spectra.as_ref().map(|spectra| {
            spectra
                .iter()
                .map(|s| peak_bin(s).map_or(0.0, |k| estimator.bin_frequency(k, sample_rate)))
                .collect()
        });

        Self {
            block,
            samples: output.samples_used,
            truncated: output.truncated,
            bands,
            peaks,
        }
    }

    fn print_text(&self) {
        println!(
            "block {:>5}  {} samples{}",
            self.block,
            self.samples,
            if self.truncated > 0 {
                format!(" ({} truncated)", self.truncated)
            } else {
                String::new()
            }
        );
        for band in &self.bands {
            let angles: Vec<String> = band
                .pairs
                .iter()
                .map(|p| match p.mean_angle {
                    Some(a) => format!("{}-{}: {:+.4}", p.channels.0, p.channels.1, a),
                    None => format!("{}-{}: --", p.channels.0, p.channels.1),
                })
                .collect();
            println!(
                "  {:>9.1} Hz  {:>4} out  {}",
                band.center_frequency,
                band.outputs,
                angles.join("  ")
            );
        }
        if let Some(peaks) = &self.peaks {
            let peaks: Vec<String> = peaks.iter().map(|f| format!("{f:.0}")).collect();
            println!("  peaks [Hz]  {}", peaks.join("  "));
        }
    }
}

fn build_config(args: &Args, channels: usize) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            serde_json::from_str(&fs::read_to_string(path)?)?
        }
        None => PipelineConfig::default(),
    };

    config.channels = channels;
    if let Some(Frequency(rate)) = args.sample_rate {
        config.sample_rate = rate;
    }
    if !args.bands.is_empty() {
        let decimation = args
            .decimation
            .or_else(|| config.bands.first().map(|b| b.decimation))
            .unwrap_or(pelengator::pipeline::DEFAULT_DECIMATION);
        let taps = config
            .bands
            .first()
            .map(|b| b.taps.clone())
            .unwrap_or_else(|| REFERENCE_TAPS.to_vec());
        config.bands = args
            .bands
            .iter()
            .map(|&Frequency(f)| BandConfig::new(f, decimation, taps.clone()))
            .collect();
    } else if let Some(decimation) = args.decimation {
        config.bands.iter_mut().for_each(|b| b.decimation = decimation);
    }
    if let Some(topology) = args.topology {
        config.topology = topology.into();
    }
    if let Some(step_size) = args.step_size {
        config.lms.step_size = step_size;
    }
    if let Some(interval) = args.spectrum_interval {
        config.spectrum_interval = interval;
    }

    config.validate()?;
    Ok(config)
}

fn open_source(args: &Args, sample_rate: f64) -> Result<BlockSource, Box<dyn std::error::Error>> {
    match &args.source {
        Source::Synth {
            channels,
            tone,
            amplitude,
            phase_step,
            noise,
            seed,
            blocks,
            panoramic,
        } => {
            let source = if *panoramic {
                ToneSource::panoramic(*channels, sample_rate, args.block_size, *seed)?
            } else {
                let tone = ToneSpec::new(tone.0, 0.0, *amplitude, *noise);
                ToneSource::phased_array(
                    *channels,
                    tone,
                    *phase_step,
                    sample_rate,
                    args.block_size,
                    *seed,
                )?
            };
            Ok(BlockSource::Synth {
                source,
                remaining: *blocks,
            })
        }
        Source::File { paths } => {
            let channels = paths
                .iter()
                .map(|p| {
                    let bytes = fs::read(p)?;
                    info!("Read {} samples from {}", bytes.len(), p.display());
                    Ok(pelengator::samples_from_bytes(&bytes))
                })
                .collect::<Result<Vec<_>, std::io::Error>>()?;

            let shortest = channels.iter().map(|c| c.len()).min().unwrap_or(0);
            if channels.iter().any(|c| c.len() != shortest) {
                warn!(
                    shortest,
                    "Capture files differ in length, trailing samples are ignored"
                );
            }
            Ok(BlockSource::Files {
                channels,
                offset: 0,
                block_size: args.block_size,
            })
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing with verbosity level
    // 0 = WARN (quiet), 1 = INFO, 2 = DEBUG, 3+ = TRACE
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .try_init();

    if args.block_size == 0 {
        return Err("block size must be greater than 0".into());
    }

    let channels = match &args.source {
        Source::Synth { channels, .. } => *channels,
        Source::File { paths } => paths.len(),
    };
    let config = build_config(&args, channels)?;
    let source = open_source(&args, config.sample_rate)?;
    let mut pipeline = Pipeline::new(config)?;

    // Acquisition runs on its own thread; the pipeline waits only for the next block
    let (tx, rx) = channel::bounded::<Vec<Vec<i8>>>(4);
    let acquisition = thread::spawn(move || {
        for block in source {
            if tx.send(block).is_err() {
                debug!("Pipeline stopped, ending acquisition");
                break;
            }
        }
    });

    for (index, block) in rx.iter().enumerate() {
        let buffers: Vec<&[i8]> = block.iter().map(|b| b.as_slice()).collect();
        let output = pipeline.process_block(&buffers)?;
        let summary = BlockSummary::new(index, &output, &pipeline);

        if args.json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            summary.print_text();
        }
    }

    if acquisition.join().is_err() {
        return Err("acquisition thread panicked".into());
    }
    info!(
        blocks = pipeline.blocks_processed(),
        samples = pipeline.samples_processed(),
        "Done"
    );
    Ok(())
}
