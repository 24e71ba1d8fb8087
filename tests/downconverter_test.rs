//! Tone response of the down-converter with a designed low-pass table

mod helpers;

use approx::assert_abs_diff_eq;
use helpers::{lowpass_taps, tone_i8};
use pelengator::dsp::DspBlock;
use pelengator::dsp::downconverter::{Band, Downconverter};
use pelengator::dsp::filters::FirTaps;
use std::f64::consts::{PI, TAU};

const FS: f64 = 500_000.0;
const FC: f64 = 24_000.0;
const DECIMATION: usize = 20;
const AMPLITUDE: f64 = 100.0;
/// First output whose history is entirely filled with input
const SETTLED: usize = 4;

fn band(center: f64, gain: f64) -> Band {
    let taps = FirTaps::new(lowpass_taps(61, 0.01, gain)).expect("valid taps");
    Band::new(center, FS, DECIMATION, taps).expect("valid band")
}

fn wrap(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

#[test]
fn test_center_tone_magnitude() {
    let band = band(FC, 1.0);
    let input = tone_i8(FC, FS, AMPLITUDE, 0.0, 4000);
    let output = Downconverter::new(&band).process(&input);
    assert_eq!(output.len(), 200);

    // A real cosine splits evenly between +fc and -fc: half lands at DC
    let expected = AMPLITUDE * band.taps().gain() / 2.0;
    for s in &output[SETTLED..] {
        assert!(
            (s.norm() - expected).abs() < 0.01 * expected,
            "magnitude {} far from {expected}",
            s.norm()
        );
    }
}

#[test]
fn test_center_tone_phase_is_near_dc() {
    let band = band(FC, 1.0);
    let input = tone_i8(FC, FS, AMPLITUDE, 0.7, 4000);
    let output = Downconverter::new(&band).process(&input);

    for s in &output[SETTLED..] {
        assert_abs_diff_eq!(s.arg(), 0.7, epsilon = 0.01);
    }
    for pair in output[SETTLED..].windows(2) {
        assert!(wrap(pair[1].arg() - pair[0].arg()).abs() < 0.01);
    }
}

#[test]
fn test_out_of_band_tone_is_rejected() {
    let band = band(FC, 1.0);
    let input = tone_i8(FC + 100_000.0, FS, AMPLITUDE, 0.0, 4000);
    let output = Downconverter::new(&band).process(&input);

    let in_band = AMPLITUDE * band.taps().gain() / 2.0;
    for s in &output[SETTLED..] {
        assert!(s.norm() < 0.01 * in_band, "leaked {}", s.norm());
    }
}

#[test]
fn test_offset_tone_rotates_at_offset_frequency() {
    // Tone at F_C1 seen through the F_C2 band: 1.4 kHz below centre
    let band = band(25_400.0, 1.0);
    let input = tone_i8(FC, FS, AMPLITUDE, 0.0, 4000);
    let output = Downconverter::new(&band).process(&input);

    let step = -TAU * 1_400.0 / band.output_sample_rate();
    for pair in output[SETTLED..].windows(2) {
        assert_abs_diff_eq!(wrap(pair[1].arg() - pair[0].arg()), step, epsilon = 0.01);
    }
    for s in &output[SETTLED..] {
        assert!(s.norm() > 40.0 && s.norm() < 51.0);
    }
}

#[test]
fn test_reference_table_rejects_dc() {
    // The reference table sums to zero, so a 0 Hz band passes nothing of a constant
    let band = Band::new(0.0, FS, DECIMATION, FirTaps::reference()).expect("valid band");
    let output = Downconverter::new(&band).process(&vec![100i8; 2000]);
    assert_eq!(output.len(), 100);
    for s in &output[SETTLED..] {
        assert!(s.norm() < 1e-12);
    }
}

#[test]
fn test_identical_channels_give_identical_streams() {
    let band = band(FC, 0.02);
    let input = tone_i8(FC, FS, AMPLITUDE, 0.2, 2000);
    let a = Downconverter::new(&band).process(&input);
    let b = Downconverter::new(&band).process(&input);
    assert_eq!(a, b);
}
