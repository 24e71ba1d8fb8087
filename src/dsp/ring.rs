//! Fixed-capacity circular history for FIR delay lines.
//!
//! The ring always holds the most recent `capacity` samples written to it
//! (zeros until it has been filled once). Reading walks backward from the
//! newest sample, which is the order a direct-form FIR pairs samples with
//! coefficients: coefficient 0 meets the newest sample.

use num_complex::Complex;

use crate::ComplexSample;

#[derive(Debug, Clone)]
pub struct HistoryRing {
    buffer: Vec<ComplexSample>,
    /// Slot the next sample is written to
    cursor: usize,
}

impl HistoryRing {
    /// Create a zero-filled ring.
    ///
    /// `capacity` must be greater than zero; callers validate tap counts
    /// before building a ring.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            buffer: vec![Complex::new(0.0, 0.0); capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Store a sample over the oldest one and advance the write cursor.
    #[inline]
    pub fn push(&mut self, sample: ComplexSample) {
        self.buffer[self.cursor] = sample;
        self.cursor += 1;
        if self.cursor == self.buffer.len() {
            self.cursor = 0;
        }
    }

    /// Iterate from the newest sample back to the oldest.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &ComplexSample> + '_ {
        let (older, newer) = self.buffer.split_at(self.cursor);
        older.iter().rev().chain(newer.iter().rev())
    }

    /// Convolve `taps` against the history, `taps[0]` on the newest sample.
    ///
    /// Extra taps beyond the capacity are ignored; missing taps count as zero.
    #[inline]
    pub fn convolve(&self, taps: &[f64]) -> ComplexSample {
        taps.iter()
            .zip(self.iter_newest_first())
            .fold(Complex::new(0.0, 0.0), |acc, (&c, &s)| acc + s * c)
    }

    /// Zero the history and rewind the cursor.
    pub fn clear(&mut self) {
        self.buffer.fill(Complex::new(0.0, 0.0));
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> ComplexSample {
        Complex::new(re, 0.0)
    }

    #[test]
    fn test_new_ring_is_zero() {
        let ring = HistoryRing::new(5);
        assert_eq!(ring.capacity(), 5);
        assert!(ring.iter_newest_first().all(|s| s.norm() == 0.0));
    }

    #[test]
    fn test_newest_first_order() {
        let mut ring = HistoryRing::new(3);
        ring.push(c(1.0));
        ring.push(c(2.0));
        let order: Vec<f64> = ring.iter_newest_first().map(|s| s.re).collect();
        assert_eq!(order, vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_wraps_and_keeps_latest() {
        let mut ring = HistoryRing::new(3);
        for v in 1..=7 {
            ring.push(c(v as f64));
        }
        let order: Vec<f64> = ring.iter_newest_first().map(|s| s.re).collect();
        assert_eq!(order, vec![7.0, 6.0, 5.0]);
    }

    #[test]
    fn test_convolve_pairs_first_tap_with_newest() {
        let mut ring = HistoryRing::new(3);
        ring.push(c(1.0));
        ring.push(c(10.0));
        ring.push(c(100.0));
        // 1*100 + 0*10 + 0*1
        assert_eq!(ring.convolve(&[1.0, 0.0, 0.0]).re, 100.0);
        // 0*100 + 0*10 + 1*1
        assert_eq!(ring.convolve(&[0.0, 0.0, 1.0]).re, 1.0);
        assert_eq!(ring.convolve(&[1.0, 2.0, 3.0]).re, 100.0 + 20.0 + 3.0);
    }

    #[test]
    fn test_convolve_complex() {
        let mut ring = HistoryRing::new(2);
        ring.push(Complex::new(1.0, -1.0));
        ring.push(Complex::new(0.5, 2.0));
        let y = ring.convolve(&[2.0, -1.0]);
        assert_eq!(y, Complex::new(2.0 * 0.5 - 1.0, 2.0 * 2.0 + 1.0));
    }

    #[test]
    fn test_clear() {
        let mut ring = HistoryRing::new(4);
        ring.push(c(3.0));
        ring.clear();
        assert!(ring.iter_newest_first().all(|s| s.norm() == 0.0));
        ring.push(c(1.0));
        assert_eq!(ring.iter_newest_first().next().map(|s| s.re), Some(1.0));
    }
}
