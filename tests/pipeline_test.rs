//! End-to-end runs of the multi-channel pipeline

mod helpers;

use helpers::{as_slices, lowpass_taps, tone_i8};
use pelengator::synth::{ToneSource, ToneSpec};
use pelengator::{BandConfig, Error, LmsConfig, PairingTopology, Pipeline, PipelineConfig};

const FS: f64 = 500_000.0;
const FC1: f64 = 24_000.0;
const SETTLED: usize = 5;

fn single_band_config(desired: num_complex::Complex<f64>) -> PipelineConfig {
    PipelineConfig {
        channels: 4,
        sample_rate: FS,
        // Baseband magnitude A·gain/2 = 0.5 keeps μ·|s|² small
        bands: vec![BandConfig::new(FC1, 20, lowpass_taps(61, 0.01, 0.01))],
        topology: PairingTopology::Ring,
        lms: LmsConfig {
            step_size: 0.01,
            desired,
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_four_identical_channels_end_to_end() {
    let tone = tone_i8(FC1, FS, 100.0, 0.0, 2000);
    let buffers = vec![tone; 4];

    // First pass: learn the steady-state baseband value
    let mut probe = Pipeline::new(single_band_config(num_complex::Complex::new(1.0, 0.0)))
        .expect("valid config");
    let out = probe.process_block(&as_slices(&buffers)).expect("block");
    let band = &out.bands[0];

    assert!(band.baseband[0].len() >= 90);
    for ch in &band.baseband[1..] {
        assert_eq!(ch, &band.baseband[0]);
    }
    let steady = *band.baseband[0].last().expect("outputs");
    assert!((steady.norm() - 0.5).abs() < 0.01);

    // Second pass: reference equal to the steady-state output
    let mut pipeline = Pipeline::new(single_band_config(steady)).expect("valid config");
    let out = pipeline.process_block(&as_slices(&buffers)).expect("block");
    let band = &out.bands[0];

    assert_eq!(pipeline.pairs().len(), 4);
    assert_eq!(band.angles.len(), 4);
    for angles in &band.angles {
        assert_eq!(angles.len(), band.baseband[0].len());
        assert_eq!(angles, &band.angles[0]);
        for a in &angles[SETTLED..] {
            assert!(a.abs() < 0.05, "angle {a}");
        }
    }

    let estimator = pipeline.estimator(0, 0).expect("estimator");
    assert!(estimator.last_error().norm() < steady.norm());
    assert!(band.mean_angle(0).expect("angles").abs() < 0.05);
}

#[test]
fn test_default_configuration_runs_two_bands() {
    let mut pipeline = Pipeline::new(PipelineConfig::default()).expect("default config");
    let mut source = ToneSource::panoramic(4, FS, 5000, 11).expect("source");

    for _ in 0..3 {
        let block = source.next_block();
        let out = pipeline.process_block(&as_slices(&block)).expect("block");
        assert_eq!(out.bands.len(), 2);
        assert_eq!(out.bands[0].center_frequency, 24_000.0);
        assert_eq!(out.bands[1].center_frequency, 25_400.0);
        for band in &out.bands {
            assert!(band.baseband.iter().all(|b| b.len() == 250));
            assert!(band.angles.iter().flatten().all(|a| a.is_finite()));
        }
    }
    assert_eq!(pipeline.samples_processed(), 15_000);
}

#[test]
fn test_spectra_follow_channel_tones() {
    let config = PipelineConfig {
        spectrum_interval: 1,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(config).expect("valid config");
    let mut source = ToneSource::panoramic(4, FS, 4096, 3).expect("source");

    let block = source.next_block();
    let out = pipeline.process_block(&as_slices(&block)).expect("block");
    let spectra = out.spectra.expect("spectra every block");
    let est = pipeline.spectrum_estimator();

    for (ch, spectrum) in spectra.iter().enumerate() {
        let peak = pelengator::dsp::spectrum::peak_bin(spectrum).expect("bins");
        let expected = 2_000.0 + 1_000.0 * ch as f64;
        let resolution = FS / est.size() as f64;
        assert!((est.bin_frequency(peak, FS) - expected).abs() <= resolution);
    }
}

#[test]
fn test_mismatched_lengths_truncate() {
    let mut pipeline = Pipeline::new(single_band_config(num_complex::Complex::new(1.0, 0.0)))
        .expect("valid config");
    let buffers = vec![
        vec![1i8; 1000],
        vec![1i8; 1000],
        vec![1i8; 930],
        vec![1i8; 1000],
    ];
    let out = pipeline.process_block(&as_slices(&buffers)).expect("block");
    assert_eq!(out.samples_used, 930);
    assert_eq!(out.truncated, 210);
    assert!(out.bands[0].baseband.iter().all(|b| b.len() == 46));
}

#[test]
fn test_wrong_channel_count_is_rejected() {
    let mut pipeline = Pipeline::new(PipelineConfig::default()).expect("default config");
    let buffers = vec![vec![0i8; 100]; 3];
    assert_eq!(
        pipeline.process_block(&as_slices(&buffers)).unwrap_err(),
        Error::ChannelCount {
            expected: 4,
            actual: 3
        }
    );
}

#[test]
fn test_phased_array_baseband_phase_steps() {
    let tone = ToneSpec::new(FC1, 0.0, 100.0, 0.0);
    let mut source = ToneSource::phased_array(3, tone, 0.4, FS, 2000, 0).expect("source");
    let config = PipelineConfig {
        channels: 3,
        bands: vec![BandConfig::new(FC1, 20, lowpass_taps(61, 0.01, 1.0))],
        // Unit-gain baseband is far too strong for μ = 0.01, so no estimators here
        topology: PairingTopology::Explicit(Vec::new()),
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(config).expect("valid config");
    let block = source.next_block();
    let out = pipeline.process_block(&as_slices(&block)).expect("block");

    // Channel k lags channel 0 by k·0.4 rad at baseband
    let baseband = &out.bands[0].baseband;
    for n in SETTLED..baseband[0].len() {
        for k in 1..3 {
            let diff = (baseband[k][n] * baseband[0][n].conj()).arg();
            assert!((diff + 0.4 * k as f64).abs() < 0.02, "channel {k}: {diff}");
        }
    }
}
