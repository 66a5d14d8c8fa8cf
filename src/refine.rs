//! # Refine — From Estimate to Probable Prime
//!
//! Walks outward from a rounded estimate until a candidate survives the full
//! presieve + screen + confirm pipeline ([`crate::oracle::check_candidate`]).
//!
//! ## Phases
//!
//! 1. **Direct**: the estimate, made odd and ≥ 3 and aligned up to the wheel,
//!    is tested on its own.
//! 2. **Window**: for `step = 1..=bound`, one wheel-aligned candidate forward
//!    (`align_up(c + step)`) and one backward (`align_down(c − step)`), with
//!    `bound = max(MIN_WINDOW, ⌈4·ln(estimate)⌉)`. Consecutive steps that align
//!    to the same candidate are tested once.
//! 3. **Fallback**: unbounded forward walk along the wheel. Cannot fail, since
//!    primes are unbounded, but has no iteration cap either.
//!
//! [`Strategy::Forward`] skips the backward half and walks forward only, which
//! yields the smallest probable prime ≥ the estimate.
//!
//! Estimates below the first wheel prime (7 for mod 30, 11 for mod 210) never
//! reach the wheel: the primes dividing the modulus are not on it. They are
//! resolved against the short ascending list `base_primes ∪ {first_prime}`;
//! if the oracle rejects all of those, the walk continues along the wheel.
//!
//! The gap after p is < ln²p for every p checked so far (Cramér), and the
//! average gap is ln p, so the window bound of 4·ln covers almost every
//! estimate; the fallback exists for the rare maximal gaps.

use rug::Integer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::estimate_digits;
use crate::estimator::Estimate;
use crate::oracle::{check_candidate, PrimalityOracle};
use crate::wheel::Wheel;

/// Floor for the symmetric window bound.
pub const MIN_WINDOW: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Direct,
    Window,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Alternate forward and backward around the estimate.
    #[default]
    Symmetric,
    /// Forward only: the smallest probable prime at or above the estimate.
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub wheel: Wheel,
    /// Overrides the bit-length round schedule.
    pub round_count: Option<u32>,
    pub strategy: Strategy,
    pub min_window: u64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        RefineConfig {
            wheel: Wheel::default(),
            round_count: None,
            strategy: Strategy::default(),
            min_window: MIN_WINDOW,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.round_count == Some(0) {
            return Err(Error::InvalidRounds);
        }
        if self.min_window == 0 {
            return Err(Error::InvalidWindow);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    pub prime: Integer,
    pub phase: Phase,
    /// Distinct candidates passed to the presieve by this refinement.
    pub candidates_tested: u64,
}

/// Symmetric window bound for an estimate: `max(min_window, ⌈4·ln x⌉)`.
pub fn window_bound(estimate: &Estimate, min_window: u64) -> u64 {
    let ln = estimate.ln().to_f64();
    if !ln.is_finite() || ln <= 0.0 {
        return min_window;
    }
    let scaled = (4.0 * ln).ceil();
    if scaled >= u64::MAX as f64 {
        return u64::MAX;
    }
    (scaled as u64).max(min_window)
}

/// Candidate tester scoped to one refinement.
struct Walker<'a, O: PrimalityOracle + ?Sized> {
    oracle: &'a O,
    rounds: Option<u32>,
    ctx: &'a mut RunContext,
    tested: u64,
}

impl<O: PrimalityOracle + ?Sized> Walker<'_, O> {
    fn accepts(&mut self, candidate: &Integer) -> bool {
        self.tested += 1;
        check_candidate(self.oracle, candidate, self.rounds, self.ctx).is_prime()
    }

    fn found(&self, prime: Integer, phase: Phase) -> Refinement {
        Refinement {
            prime,
            phase,
            candidates_tested: self.tested,
        }
    }
}

/// Refine `estimate` into a probable prime. `index` is used for logging only.
pub fn refine<O: PrimalityOracle + ?Sized>(
    estimate: &Estimate,
    index: &Integer,
    config: &RefineConfig,
    oracle: &O,
    ctx: &mut RunContext,
) -> Result<Refinement> {
    config.validate()?;
    let wheel = config.wheel;
    let mut walker = Walker {
        oracle,
        rounds: config.round_count,
        ctx,
        tested: 0,
    };

    let raw = estimate.rounded();
    if *raw < wheel.first_prime() {
        if let Some(prime) = small_prime_at_or_above(raw, wheel, &mut walker) {
            debug!(prime = %prime, "estimate below wheel, resolved directly");
            return Ok(walker.found(prime, Phase::Direct));
        }
        let mut candidate = wheel.next(&Integer::from(wheel.first_prime()));
        loop {
            if walker.accepts(&candidate) {
                return Ok(walker.found(candidate, Phase::Fallback));
            }
            candidate = wheel.next(&candidate);
        }
    }

    let mut center = raw.clone();
    if center.is_even() {
        center += 1u32;
    }
    let center = wheel.align_up(&center);

    if walker.accepts(&center) {
        return Ok(walker.found(center, Phase::Direct));
    }

    let bound = window_bound(estimate, config.min_window);
    debug!(
        index_digits = estimate_digits(index),
        bound,
        strategy = ?config.strategy,
        "direct candidate composite, searching window"
    );

    match config.strategy {
        Strategy::Symmetric => {
            if let Some(prime) = symmetric_window(&center, bound, wheel, &mut walker) {
                return Ok(walker.found(prime, Phase::Window));
            }
        }
        Strategy::Forward => {
            if let Some(prime) = forward_window(&center, bound, wheel, &mut walker) {
                return Ok(walker.found(prime, Phase::Window));
            }
        }
    }

    info!(
        index_digits = estimate_digits(index),
        bound,
        tested = walker.tested,
        "window exhausted, falling back to forward scan"
    );
    // Both window walks end on align_up(center + bound).
    let mut candidate = wheel.next(&wheel.align_up(&Integer::from(&center + bound)));
    loop {
        if walker.accepts(&candidate) {
            return Ok(walker.found(candidate, Phase::Fallback));
        }
        candidate = wheel.next(&candidate);
    }
}

fn symmetric_window<O: PrimalityOracle + ?Sized>(
    center: &Integer,
    bound: u64,
    wheel: Wheel,
    walker: &mut Walker<'_, O>,
) -> Option<Integer> {
    let mut last_forward = center.clone();
    let mut last_backward = center.clone();
    for step in 1..=bound {
        let forward = wheel.align_up(&Integer::from(center + step));
        if forward != last_forward {
            if walker.accepts(&forward) {
                return Some(forward);
            }
            last_forward = forward;
        }

        let below = Integer::from(center - step);
        if below < 3u32 {
            continue;
        }
        let backward = wheel.align_down(&below);
        if backward < 3u32 || backward == last_backward {
            continue;
        }
        if walker.accepts(&backward) {
            return Some(backward);
        }
        last_backward = backward;
    }
    None
}

/// Forward half only: every wheel position in `(center, center + bound]`
/// (plus the aligned value just past it).
fn forward_window<O: PrimalityOracle + ?Sized>(
    center: &Integer,
    bound: u64,
    wheel: Wheel,
    walker: &mut Walker<'_, O>,
) -> Option<Integer> {
    let limit = Integer::from(center + bound);
    let mut candidate = wheel.next(center);
    loop {
        if walker.accepts(&candidate) {
            return Some(candidate);
        }
        if candidate >= limit {
            return None;
        }
        candidate = wheel.next(&candidate);
    }
}

/// Smallest accepted prime ≥ `n` among the primes that precede the wheel,
/// plus the wheel's first prime.
fn small_prime_at_or_above<O: PrimalityOracle + ?Sized>(
    n: &Integer,
    wheel: Wheel,
    walker: &mut Walker<'_, O>,
) -> Option<Integer> {
    let first = wheel.first_prime();
    wheel
        .base_primes()
        .iter()
        .chain(std::iter::once(&first))
        .map(|&p| Integer::from(p))
        .find(|p| *p >= *n && walker.accepts(p))
}
