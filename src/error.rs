//! # Error — Input Validation Failures
//!
//! Every variant here is raised synchronously, before any estimation or
//! primality testing begins. Tuner non-convergence is deliberately *not* an
//! error: it is reported through `ScanTelemetry::locked` together with the
//! final window/step/iteration count.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The prime index was zero or negative.
    #[error("prime index must be >= 1, got {0}")]
    InvalidIndex(String),

    #[error("scan window must be > 0")]
    InvalidWindow,

    #[error("scan step must be > 0")]
    InvalidStep,

    #[error("unsupported wheel modulus {0} (supported: 30, 210)")]
    UnsupportedWheel(u64),

    #[error("precision must be between {min} and {max} bits, got {got}")]
    InvalidPrecision { got: u32, min: u32, max: u32 },

    #[error("Miller-Rabin round count must be >= 1")]
    InvalidRounds,

    #[error("target prime count must be >= 1")]
    InvalidTargetCount,

    #[error("max iterations must be >= 1")]
    InvalidMaxIterations,

    #[error("cannot parse prime index {input:?}: {reason}")]
    ParseIndex { input: String, reason: String },

    /// The estimator produced NaN or infinity (only possible with a
    /// pathologically small precision override).
    #[error("estimate is not a finite number at {precision} bits")]
    NonFiniteEstimate { precision: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            Error::UnsupportedWheel(7).to_string(),
            "unsupported wheel modulus 7 (supported: 30, 210)"
        );
        assert_eq!(
            Error::InvalidIndex("0".into()).to_string(),
            "prime index must be >= 1, got 0"
        );
        let e = Error::InvalidPrecision {
            got: 8,
            min: 64,
            max: 131_072,
        };
        assert!(e.to_string().contains("got 8"));
    }
}
