//! Test helper utilities for generating synthetic channel data and filters

#![allow(dead_code)]

use std::f64::consts::{PI, TAU};

/// Generate a real tone quantized to signed 8-bit samples
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude` - Peak amplitude in sample units (at most 127)
/// * `phase` - Phase at sample 0 in radians
/// * `num_samples` - Number of samples to generate
pub fn tone_i8(
    frequency: f64,
    sample_rate: f64,
    amplitude: f64,
    phase: f64,
    num_samples: usize,
) -> Vec<i8> {
    let angular_freq = TAU * frequency / sample_rate;
    (0..num_samples)
        .map(|n| (amplitude * (angular_freq * n as f64 + phase).cos()).round() as i8)
        .collect()
}

/// Design a Hamming-windowed sinc low-pass filter
///
/// # Arguments
/// * `num_taps` - Number of coefficients (odd for a symmetric centre tap)
/// * `cutoff` - Cutoff frequency as a fraction of the sample rate (0 to 0.5)
/// * `gain` - Desired coefficient sum (DC gain)
pub fn lowpass_taps(num_taps: usize, cutoff: f64, gain: f64) -> Vec<f64> {
    let center = (num_taps - 1) as f64 / 2.0;
    let raw: Vec<f64> = (0..num_taps)
        .map(|i| {
            let x = i as f64 - center;
            let sinc = if x == 0.0 {
                2.0 * cutoff
            } else {
                (TAU * cutoff * x).sin() / (PI * x)
            };
            let window = 0.54 - 0.46 * (TAU * i as f64 / (num_taps - 1) as f64).cos();
            sinc * window
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|c| c * gain / sum).collect()
}

/// Borrow a set of channel buffers as the slice-of-slices the pipeline takes
pub fn as_slices(buffers: &[Vec<i8>]) -> Vec<&[i8]> {
    buffers.iter().map(|b| b.as_slice()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_i8_length_and_start() {
        let samples = tone_i8(1000.0, 8000.0, 100.0, 0.0, 16);
        assert_eq!(samples.len(), 16);
        assert_eq!(samples[0], 100);
        assert_eq!(samples[4], -100);
    }

    #[test]
    fn test_lowpass_taps_gain() {
        let taps = lowpass_taps(61, 0.01, 0.02);
        assert_eq!(taps.len(), 61);
        let sum: f64 = taps.iter().sum();
        assert!((sum - 0.02).abs() < 1e-12);
        // Symmetric around the centre tap
        for i in 0..61 {
            assert!((taps[i] - taps[60 - i]).abs() < 1e-15);
        }
    }
}
