//! # Tuner — Adaptive Window/Step Scanner
//!
//! A discrete feedback controller around a bounded scan. Each iteration
//! counts the probable primes in a fixed neighborhood of the estimate and
//! nudges the resolution `R = window / step` toward a neighborhood holding
//! exactly `target_count` primes.
//!
//! ## One Scan
//!
//! The rounded estimate is moved up to the next value congruent to the
//! current wheel residue (the residue rotates by one position per scan within
//! a run). Candidates are then
//!
//! ```text
//! center ± offset·M     offset = 0, step, 2·step, … ≤ window
//! ```
//!
//! with M the wheel modulus. Each candidate > 3 goes through the presieve
//! and the oracle at the configured round count. The scan stops early once
//! `max(target + 1, 10)` primes are seen.
//!
//! ## Transitions
//!
//! | Observed        | State     | Adjustment                                   |
//! |-----------------|-----------|----------------------------------------------|
//! | `== target`     | Locked    | none (terminal)                              |
//! | `< target`      | Expanding | window ×3/2 below 10000, else step − 1 (≥ 1) |
//! | `> target`      | Shrinking | window ×2/3 while > 2·step, else step + 1    |
//! | iterations out  | Failed    | none (terminal)                              |
//!
//! Non-convergence is not an error: a `Failed` run is reported through
//! [`ScanTelemetry::locked`] with the final window, step and iteration count.

use std::time::Instant;

use rug::Integer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::{millis, RunContext};
use crate::decimal;
use crate::error::{Error, Result};
use crate::estimator::Estimate;
use crate::oracle::{check_candidate, MillerRabin, PrimalityOracle};
use crate::precision::validate_override;
use crate::wheel::Wheel;

pub const DEFAULT_WINDOW: u64 = 64;
pub const DEFAULT_STEP: u64 = 2;
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
pub const DEFAULT_SCAN_ROUNDS: u32 = 50;

/// Window size past which an empty scan shrinks the step instead.
pub const WINDOW_SATURATION: u64 = 10_000;

/// Minimum number of primes a scan collects before stopping early.
const MIN_CAPTURE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub window: u64,
    pub step: u64,
    pub wheel: Wheel,
    pub round_count: u32,
    pub target_count: u32,
    pub max_iterations: u32,
    /// Precision for the estimate feeding the scan; automatic when unset.
    pub precision_bits: Option<u32>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            window: DEFAULT_WINDOW,
            step: DEFAULT_STEP,
            wheel: Wheel::default(),
            round_count: DEFAULT_SCAN_ROUNDS,
            target_count: 1,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            precision_bits: None,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(Error::InvalidWindow);
        }
        if self.step == 0 {
            return Err(Error::InvalidStep);
        }
        if self.round_count == 0 {
            return Err(Error::InvalidRounds);
        }
        if self.target_count == 0 {
            return Err(Error::InvalidTargetCount);
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidMaxIterations);
        }
        if let Some(bits) = self.precision_bits {
            validate_override(bits)?;
        }
        Ok(())
    }

    fn capture_limit(&self) -> usize {
        (self.target_count as usize + 1).max(MIN_CAPTURE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunerState {
    Scanning,
    Locked,
    Expanding,
    Shrinking,
    Failed,
}

impl TunerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TunerState::Locked | TunerState::Failed)
    }
}

/// Result of one bounded scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Probable primes in visiting order.
    pub primes: Vec<Integer>,
    pub residue: u32,
    pub candidates: u64,
}

/// Final report of a tuner run or manual scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanTelemetry {
    pub window: u64,
    pub step: u64,
    pub ratio: f64,
    pub prime_count: u32,
    pub iterations: u32,
    pub oracle_call_count: u64,
    pub elapsed_ms: f64,
    pub locked: bool,
    pub wheel_residue_label: String,
    #[serde(serialize_with = "decimal::serialize_opt")]
    pub prime_found: Option<Integer>,
}

/// Smallest value `>= n` congruent to `residue` mod the wheel modulus.
fn center_on_residue(n: &Integer, wheel: Wheel, residue: u32) -> Integer {
    let m = wheel.modulus();
    let r = n.mod_u(m);
    let adjust = (residue + m - r) % m;
    Integer::from(n + adjust)
}

/// One bounded scan around `estimate` using the `residue_index`-th residue.
pub fn scan_once<O: PrimalityOracle + ?Sized>(
    estimate: &Integer,
    window: u64,
    step: u64,
    config: &ScanConfig,
    residue_index: usize,
    oracle: &O,
    ctx: &mut RunContext,
) -> ScanOutcome {
    let wheel = config.wheel;
    let residue = wheel.residue(residue_index);
    let center = center_on_residue(estimate, wheel, residue);
    let cap = config.capture_limit();
    let modulus = u64::from(wheel);

    let mut primes = Vec::new();
    let mut candidates = 0u64;
    let mut test = |candidate: Integer, primes: &mut Vec<Integer>| {
        if candidate <= 3u32 {
            return;
        }
        candidates += 1;
        if check_candidate(oracle, &candidate, Some(config.round_count), ctx).is_prime() {
            primes.push(candidate);
        }
    };

    let mut offset = 0u64;
    while offset <= window && primes.len() < cap {
        let delta = Integer::from(offset) * modulus;
        test(Integer::from(&center + &delta), &mut primes);
        if offset > 0 && primes.len() < cap {
            test(Integer::from(&center - &delta), &mut primes);
        }
        offset = match offset.checked_add(step) {
            Some(o) => o,
            None => break,
        };
    }

    ScanOutcome {
        primes,
        residue,
        candidates,
    }
}

/// Live state of one tuner run.
#[derive(Debug, Clone)]
pub struct Tuner {
    config: ScanConfig,
    estimate: Integer,
    window: u64,
    step: u64,
    iterations: u32,
    state: TunerState,
    last: Option<ScanOutcome>,
}

impl Tuner {
    pub fn new(estimate: &Integer, config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Tuner {
            config: *config,
            estimate: estimate.clone(),
            window: config.window,
            step: config.step,
            iterations: 0,
            state: TunerState::Scanning,
            last: None,
        })
    }

    pub fn state(&self) -> TunerState {
        self.state
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn last_scan(&self) -> Option<&ScanOutcome> {
        self.last.as_ref()
    }

    /// Run one scan and apply the transition rule. No-op once terminal.
    pub fn advance<O: PrimalityOracle + ?Sized>(
        &mut self,
        oracle: &O,
        ctx: &mut RunContext,
    ) -> TunerState {
        if self.state.is_terminal() {
            return self.state;
        }
        if self.iterations >= self.config.max_iterations {
            self.state = TunerState::Failed;
            return self.state;
        }

        let outcome = scan_once(
            &self.estimate,
            self.window,
            self.step,
            &self.config,
            self.iterations as usize,
            oracle,
            ctx,
        );
        self.iterations += 1;
        let count = outcome.primes.len() as u32;
        let target = self.config.target_count;

        debug!(
            iteration = self.iterations,
            window = self.window,
            step = self.step,
            ratio = self.window as f64 / self.step as f64,
            count,
            "scan"
        );

        self.state = if count == target {
            TunerState::Locked
        } else if count < target {
            if self.window < WINDOW_SATURATION {
                self.window = (self.window * 3 / 2).max(self.window + 1);
            } else {
                self.step = self.step.saturating_sub(1).max(1);
            }
            TunerState::Expanding
        } else {
            if self.window > self.step.saturating_mul(2) {
                self.window = (u128::from(self.window) * 2 / 3) as u64;
            } else {
                self.step = self.step.saturating_add(1);
            }
            TunerState::Shrinking
        };
        self.last = Some(outcome);
        self.state
    }

    /// Advance until `Locked` or `Failed`.
    pub fn run<O: PrimalityOracle + ?Sized>(&mut self, oracle: &O, ctx: &mut RunContext) -> TunerState {
        while !self.state.is_terminal() {
            self.advance(oracle, ctx);
        }
        match self.state {
            TunerState::Locked => info!(
                iterations = self.iterations,
                window = self.window,
                step = self.step,
                oracle = oracle.name(),
                "tuner locked"
            ),
            _ => warn!(
                iterations = self.iterations,
                window = self.window,
                step = self.step,
                oracle = oracle.name(),
                "tuner failed to lock"
            ),
        }
        self.state
    }

    fn telemetry(&self, oracle_calls: u64, started: Instant) -> ScanTelemetry {
        let primes = self.last.as_ref().map(|o| o.primes.as_slice()).unwrap_or(&[]);
        let residue = self.last.as_ref().map(|o| o.residue).unwrap_or(1);
        telemetry(
            self.window,
            self.step,
            primes,
            self.iterations,
            oracle_calls,
            started,
            self.state == TunerState::Locked,
            self.config.wheel.label(residue),
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn telemetry(
    window: u64,
    step: u64,
    primes: &[Integer],
    iterations: u32,
    oracle_call_count: u64,
    started: Instant,
    locked: bool,
    wheel_residue_label: String,
) -> ScanTelemetry {
    let prime_found = match primes {
        [only] => Some(only.clone()),
        _ => None,
    };
    ScanTelemetry {
        window,
        step,
        ratio: window as f64 / step as f64,
        prime_count: primes.len() as u32,
        iterations,
        oracle_call_count,
        elapsed_ms: millis(started.elapsed()),
        locked,
        wheel_residue_label,
        prime_found,
    }
}

/// Run the adaptive tuner to completion.
pub fn tune<O: PrimalityOracle + ?Sized>(
    estimate: &Estimate,
    config: &ScanConfig,
    oracle: &O,
    ctx: &mut RunContext,
) -> Result<ScanTelemetry> {
    let started = Instant::now();
    let calls_before = ctx.oracle_calls();
    let mut tuner = Tuner::new(estimate.rounded(), config)?;
    tuner.run(oracle, ctx);
    Ok(tuner.telemetry(ctx.oracle_calls() - calls_before, started))
}

/// A single scan at the configured window and step, without tuning.
pub fn manual_scan<O: PrimalityOracle + ?Sized>(
    estimate: &Estimate,
    config: &ScanConfig,
    oracle: &O,
    ctx: &mut RunContext,
) -> Result<ScanTelemetry> {
    config.validate()?;
    let started = Instant::now();
    let calls_before = ctx.oracle_calls();
    let outcome = scan_once(
        estimate.rounded(),
        config.window,
        config.step,
        config,
        0,
        oracle,
        ctx,
    );
    let locked = outcome.primes.len() == config.target_count as usize;
    Ok(telemetry(
        config.window,
        config.step,
        &outcome.primes,
        1,
        ctx.oracle_calls() - calls_before,
        started,
        locked,
        config.wheel.label(outcome.residue),
    ))
}

/// Tune around `estimate` with GMP Miller–Rabin and a fresh run context.
///
/// The wheel modulus is checked before any candidate is tested.
pub fn scan(
    estimate: &Estimate,
    window: u64,
    step: u64,
    wheel_modulus: u64,
    round_count: u32,
    target_count: u32,
    max_iterations: u32,
) -> Result<ScanTelemetry> {
    let config = ScanConfig {
        window,
        step,
        wheel: Wheel::from_modulus(wheel_modulus)?,
        round_count,
        target_count,
        max_iterations,
        precision_bits: None,
    };
    let mut ctx = RunContext::new();
    tune(estimate, &config, &MillerRabin, &mut ctx)
}
