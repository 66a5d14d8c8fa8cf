//! # Predictor — Top-Level nth-Prime Pipeline
//!
//! ```text
//! index ─► known grid ─(hit)──────────────────────────────► Exact
//!            │
//!            └(miss)► precision ─► estimator ─► refine ─────► Estimated
//! ```
//!
//! [`predict_nth_prime`] runs with defaults, GMP Miller–Rabin and a fresh
//! [`RunContext`]. [`predict_nth_prime_with`] takes everything explicitly.
//! [`predict_batch`] fans independent indices out over the Rayon pool; each
//! run owns its own context, so no counters are shared across threads.

use std::time::Duration;

use rayon::prelude::*;
use rug::{Float, Integer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::{serialize_millis, RunContext, RunStats};
use crate::decimal;
use crate::error::{Error, Result};
use crate::estimate_digits;
use crate::estimator::{self, Calibration, Estimate, Method, NewtonConfig};
use crate::known;
use crate::oracle::{MillerRabin, PrimalityOracle};
use crate::precision::{resolve_precision, validate_override};
use crate::refine::{refine, Phase, RefineConfig, Strategy, MIN_WINDOW};
use crate::wheel::Wheel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictConfig {
    /// Overrides the automatic working precision.
    pub precision_bits: Option<u32>,
    /// Overrides the bit-length Miller–Rabin schedule.
    pub round_count: Option<u32>,
    pub wheel: Wheel,
    pub method: Method,
    pub calibration: Calibration,
    pub newton: NewtonConfig,
    pub strategy: Strategy,
    /// Answer grid indices (10^0 … 10^18) exactly.
    pub use_known_table: bool,
}

impl Default for PredictConfig {
    fn default() -> Self {
        PredictConfig {
            precision_bits: None,
            round_count: None,
            wheel: Wheel::default(),
            method: Method::default(),
            calibration: Calibration::default(),
            newton: NewtonConfig::default(),
            strategy: Strategy::default(),
            use_known_table: true,
        }
    }
}

impl PredictConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(bits) = self.precision_bits {
            validate_override(bits)?;
        }
        if self.newton.terms == 0 {
            return Err(Error::Config("newton.terms must be >= 1".into()));
        }
        if self.newton.max_iterations == 0 {
            return Err(Error::Config("newton.max_iterations must be >= 1".into()));
        }
        if !self.calibration.c.is_finite() || !self.calibration.kappa_star.is_finite() {
            return Err(Error::Config("calibration constants must be finite".into()));
        }
        self.refine_config().validate()
    }

    pub fn refine_config(&self) -> RefineConfig {
        RefineConfig {
            wheel: self.wheel,
            round_count: self.round_count,
            strategy: self.strategy,
            min_window: MIN_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Looked up in the known grid.
    Exact,
    /// Estimator output refined to a probable prime.
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(serialize_with = "decimal::serialize")]
    pub index: Integer,
    #[serde(serialize_with = "decimal::serialize")]
    pub prime: Integer,
    /// Rounded estimate the refinement started from.
    #[serde(serialize_with = "decimal::serialize")]
    pub estimate: Integer,
    pub iterations: u32,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub converged: bool,
    pub source: Source,
    pub phase: Option<Phase>,
    pub precision_bits: u32,
    pub stats: RunStats,
}

impl Prediction {
    /// `|estimate − prime| / prime`, in parts per million.
    pub fn error_ppm(&self) -> f64 {
        if self.prime == 0 {
            return 0.0;
        }
        let diff = Integer::from(&self.estimate - &self.prime).abs();
        let ratio = Float::with_val(64, &diff) / Float::with_val(64, &self.prime);
        (ratio * 1_000_000u32).to_f64()
    }
}

/// Predict p_n with default settings.
pub fn predict_nth_prime(index: &Integer) -> Result<Prediction> {
    let mut ctx = RunContext::new();
    predict_nth_prime_with(index, &PredictConfig::default(), &MillerRabin, &mut ctx)
}

/// Predict p_n with an explicit configuration, oracle and run context.
pub fn predict_nth_prime_with<O: PrimalityOracle + ?Sized>(
    index: &Integer,
    config: &PredictConfig,
    oracle: &O,
    ctx: &mut RunContext,
) -> Result<Prediction> {
    if *index < 1u32 {
        return Err(Error::InvalidIndex(index.to_string()));
    }
    config.validate()?;
    let precision = resolve_precision(config.precision_bits, index)?;

    if config.use_known_table {
        if let Some(prime) = known::lookup(index) {
            info!(index = %index, prime = %prime, "known grid hit");
            return Ok(Prediction {
                index: index.clone(),
                estimate: prime.clone(),
                prime,
                iterations: 0,
                elapsed: ctx.elapsed(),
                converged: true,
                source: Source::Exact,
                phase: None,
                precision_bits: precision,
                stats: ctx.stats(),
            });
        }
    }

    let estimate: Estimate = estimator::estimate(
        index,
        config.method,
        &config.calibration,
        &config.newton,
        precision,
    )?;
    let refinement = refine(&estimate, index, &config.refine_config(), oracle, ctx)?;

    let stats = ctx.stats();
    info!(
        index_digits = estimate_digits(index),
        prime_digits = estimate_digits(&refinement.prime),
        phase = ?refinement.phase,
        candidates = refinement.candidates_tested,
        oracle_calls = stats.oracle_calls,
        oracle = oracle.name(),
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "prediction complete"
    );

    Ok(Prediction {
        index: index.clone(),
        prime: refinement.prime,
        iterations: estimate.iterations(),
        converged: estimate.converged(),
        estimate: estimate.into_rounded(),
        elapsed: stats.elapsed,
        source: Source::Estimated,
        phase: Some(refinement.phase),
        precision_bits: precision,
        stats,
    })
}

/// Predict many indices in parallel. Results keep the input order.
pub fn predict_batch(indices: &[Integer], config: &PredictConfig) -> Vec<Result<Prediction>> {
    indices
        .par_iter()
        .map(|index| {
            let mut ctx = RunContext::new();
            predict_nth_prime_with(index, config, &MillerRabin, &mut ctx)
        })
        .collect()
}
