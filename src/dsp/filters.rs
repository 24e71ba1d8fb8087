//! FIR coefficient tables.
//!
//! Coefficients are generated outside this crate and supplied as fixed tables.
//! [`FirTaps`] wraps a table in a shared, read-only buffer so that every
//! channel running the same band convolves against the same memory, and so
//! that concurrent channel states can hold it without copying.
//!
//! The ordering of a table is authoritative: `taps[0]` multiplies the most
//! recently written history sample. Tables are never re-derived or reordered
//! here.
//!
//! # Example
//!
//! ```
//! use pelengator::dsp::filters::{FirTaps, REFERENCE_TAPS};
//!
//! let taps = FirTaps::new(REFERENCE_TAPS.to_vec()).unwrap();
//! assert_eq!(taps.len(), 61);
//! let shared = taps.clone(); // cheap, same storage
//! assert_eq!(shared.as_slice().as_ptr(), taps.as_slice().as_ptr());
//! ```

use std::ops::Deref;
use std::sync::Arc;

use crate::{Error, Result};

/// Tap count of [`REFERENCE_TAPS`].
pub const REFERENCE_TAP_COUNT: usize = 61;

/// Coefficient table shipped with the instrument build of the direction finder.
///
/// Generated externally for 500 kHz input decimated by 20 (passband 0-200 Hz,
/// stopband above 12.5 kHz). It is odd-symmetric about the centre tap, so its
/// coefficient sum (and therefore its DC gain) is zero.
pub const REFERENCE_TAPS: [f64; REFERENCE_TAP_COUNT] = [
    -0.0000563303977127, -0.0000119583586124, -0.0000130316259547, -0.0000142253484869,
    -0.0000152838480442, -0.0000162326020046, -0.0000171600820158, -0.0000180429684566,
    -0.0000188086905799, -0.0000194372728780, -0.0000199423472368, -0.0000203158703565,
    -0.0000205385789983, -0.0000206100962494, -0.0000205363291769, -0.0000203080794742,
    -0.0000199120494929, -0.0000193472320107, -0.0000186179383377, -0.0000177243552015,
    -0.0000166696646939, -0.0000154662807987, -0.0000141283395674, -0.0000126654705475,
    -0.0000110875477845, -0.0000094085899355, -0.0000076428470819, -0.0000058024911620,
    -0.0000039019408147, -0.0000019607175531, 0.0000000000000000, 0.0000019607175531,
    0.0000039019408147, 0.0000058024911620, 0.0000076428470819, 0.0000094085899355,
    0.0000110875477845, 0.0000126654705475, 0.0000141283395674, 0.0000154662807987,
    0.0000166696646939, 0.0000177243552015, 0.0000186179383377, 0.0000193472320107,
    0.0000199120494929, 0.0000203080794742, 0.0000205363291769, 0.0000206100962494,
    0.0000205385789983, 0.0000203158703565, 0.0000199423472368, 0.0000194372728780,
    0.0000188086905799, 0.0000180429684566, 0.0000171600820158, 0.0000162326020046,
    0.0000152838480442, 0.0000142253484869, 0.0000130316259547, 0.0000119583586124,
    0.0000563303977127,
];

/// Shared read-only FIR coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct FirTaps {
    taps: Arc<[f64]>,
}

impl FirTaps {
    /// Wrap a coefficient table.
    ///
    /// Fails if the table is empty or holds a non-finite coefficient.
    pub fn new(taps: Vec<f64>) -> Result<Self> {
        if taps.is_empty() {
            return Err(Error::config("FIR table must have at least one tap"));
        }
        if let Some(i) = taps.iter().position(|c| !c.is_finite()) {
            return Err(Error::config(format!(
                "FIR coefficient {i} is not finite ({})",
                taps[i]
            )));
        }
        Ok(Self { taps: taps.into() })
    }

    /// The reference 61-tap table.
    pub fn reference() -> Self {
        Self {
            taps: Arc::from(&REFERENCE_TAPS[..]),
        }
    }

    /// Number of taps, which is also the history length of a filter using them.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Always false: construction rejects empty tables.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Sum of the coefficients, i.e. the filter gain at DC.
    pub fn gain(&self) -> f64 {
        self.taps.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.taps
    }
}

impl Deref for FirTaps {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.taps
    }
}
