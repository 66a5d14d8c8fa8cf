//! # Precision — Working Precision for MPFR Computations
//!
//! Chooses the number of mantissa bits used for every `rug::Float` created
//! while estimating a single index. The rule is
//!
//! ```text
//! precision = max(MIN_PRECISION_BITS, bit_length(n) + SLACK_BITS)
//! ```
//!
//! The slack covers the `log2(ln n)` growth of p_n over n plus the digits
//! lost in `ln`, `pow` and the series sums. Once chosen, the value is threaded
//! explicitly through the estimator; nothing in the pipeline falls back to
//! MPFR's global default precision.
//!
//! Precision that is too small does not raise an error. The symptom is a
//! degraded estimate, which the refinement search still turns into a genuine
//! probable prime, only further away from p_n.

use rug::Integer;

use crate::error::{Error, Result};

/// Floor for the automatic rule (~96 decimal digits).
pub const MIN_PRECISION_BITS: u32 = 320;

/// Bits added on top of the index bit length.
pub const SLACK_BITS: u32 = 2048;

/// Smallest accepted explicit override.
pub const MIN_OVERRIDE_BITS: u32 = 64;

/// Largest accepted explicit override.
pub const MAX_OVERRIDE_BITS: u32 = 131_072;

/// Working precision for an index.
pub fn working_precision(index: &Integer) -> u32 {
    index
        .significant_bits()
        .saturating_add(SLACK_BITS)
        .max(MIN_PRECISION_BITS)
}

/// Resolve an optional explicit override against the automatic rule.
pub fn resolve_precision(override_bits: Option<u32>, index: &Integer) -> Result<u32> {
    match override_bits {
        Some(bits) => validate_override(bits),
        None => Ok(working_precision(index)),
    }
}

/// Check an explicit override against the accepted range.
pub fn validate_override(bits: u32) -> Result<u32> {
    if (MIN_OVERRIDE_BITS..=MAX_OVERRIDE_BITS).contains(&bits) {
        Ok(bits)
    } else {
        Err(Error::InvalidPrecision {
            got: bits,
            min: MIN_OVERRIDE_BITS,
            max: MAX_OVERRIDE_BITS,
        })
    }
}
