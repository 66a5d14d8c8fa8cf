//! # Context — Per-Run Counters and Timing
//!
//! Diagnostic state for one prediction, refinement, generator or tuning run.
//! A `RunContext` is created by the caller and passed by `&mut` through the
//! pipeline, so two runs on different threads never share a counter.
//!
//! Counters:
//! - `candidates`: integers that reached the small-prime presieve.
//! - `presieve_rejections`: candidates removed by trial division.
//! - `oracle_calls`: invocations of a `PrimalityOracle` (screen and
//!   confirmation passes are counted separately).

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

#[derive(Debug)]
pub struct RunContext {
    candidates: u64,
    presieve_rejections: u64,
    oracle_calls: u64,
    start: Instant,
}

/// Immutable copy of the counters, suitable for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStats {
    pub candidates: u64,
    pub presieve_rejections: u64,
    pub oracle_calls: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RunContext {
    pub fn new() -> Self {
        RunContext {
            candidates: 0,
            presieve_rejections: 0,
            oracle_calls: 0,
            start: Instant::now(),
        }
    }

    pub fn record_candidate(&mut self) {
        self.candidates += 1;
    }

    pub fn record_presieve_rejection(&mut self) {
        self.presieve_rejections += 1;
    }

    pub fn record_oracle_call(&mut self) {
        self.oracle_calls += 1;
    }

    pub fn candidates(&self) -> u64 {
        self.candidates
    }

    pub fn presieve_rejections(&self) -> u64 {
        self.presieve_rejections
    }

    pub fn oracle_calls(&self) -> u64 {
        self.oracle_calls
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            candidates: self.candidates,
            presieve_rejections: self.presieve_rejections,
            oracle_calls: self.oracle_calls,
            elapsed: self.elapsed(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Percentage of candidates that never reached the oracle.
    pub fn prefilter_reduction_pct(&self) -> f64 {
        if self.candidates == 0 {
            return 0.0;
        }
        let reached = self.candidates - self.presieve_rejections;
        100.0 * (1.0 - reached as f64 / self.candidates as f64)
    }
}

pub(crate) fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub(crate) fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(millis(*d))
}
