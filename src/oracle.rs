//! # Oracle — Probabilistic Primality Testing
//!
//! Every candidate that can end up in a result passes through
//! [`check_candidate`]:
//!
//! 1. **Presieve**: trial division by the 64 primes ≤ 311
//!    ([`crate::has_small_factor`]).
//! 2. **Screen**: a cheap [`SCREEN_ROUNDS`]-round oracle call. Most composites
//!    that survive trial division die here.
//! 3. **Confirm**: a full oracle call at the configured round count.
//!
//! Only a candidate that clears all three is reported as (probably) prime.
//!
//! ## Round Schedule
//!
//! Without an explicit override the round count follows the candidate's bit
//! length ([`rounds_for_bits`]), keeping the Miller–Rabin error below roughly
//! 2^-128 at every magnitude. The thresholds are tuned defaults, not a
//! derived bound.
//!
//! ## Oracles
//!
//! - [`MillerRabin`]: GMP's `mpz_probab_prime_p` (Baillie–PSW plus
//!   `rounds - 24` random-base Miller–Rabin rounds).
//! - [`DeterministicU64`]: `num_prime`'s deterministic Miller–Rabin for
//!   n < 2^64; larger values are handed to GMP. Used by tests that need
//!   bit-for-bit reproducible verdicts.

use num_prime::nt_funcs::is_prime64;
use rug::integer::IsPrime;
use rug::Integer;
use serde::Serialize;

use crate::context::RunContext;
use crate::has_small_factor;

/// Rounds for the cheap screening pass.
pub const SCREEN_ROUNDS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Composite,
    ProbablyPrime,
    /// Certified prime; only returned for values small enough to decide exactly.
    Prime,
}

impl Verdict {
    pub fn is_prime(self) -> bool {
        !matches!(self, Verdict::Composite)
    }
}

impl From<IsPrime> for Verdict {
    fn from(p: IsPrime) -> Self {
        match p {
            IsPrime::No => Verdict::Composite,
            IsPrime::Probably => Verdict::ProbablyPrime,
            IsPrime::Yes => Verdict::Prime,
        }
    }
}

/// Default Miller–Rabin rounds for a candidate of `bits` bits.
pub fn rounds_for_bits(bits: u32) -> u32 {
    match bits {
        0..=64 => 10,
        65..=512 => 25,
        513..=4096 => 40,
        _ => 64,
    }
}

/// Answers "is this integer probably prime?".
///
/// Implementations must be stateless; call counting is the caller's job
/// (see [`RunContext`]).
pub trait PrimalityOracle: Send + Sync {
    fn name(&self) -> &'static str;

    fn test(&self, candidate: &Integer, rounds: u32) -> Verdict;
}

/// GMP-backed probabilistic test.
#[derive(Debug, Clone, Copy, Default)]
pub struct MillerRabin;

impl PrimalityOracle for MillerRabin {
    fn name(&self) -> &'static str {
        "gmp-miller-rabin"
    }

    fn test(&self, candidate: &Integer, rounds: u32) -> Verdict {
        candidate.is_probably_prime(rounds).into()
    }
}

/// Deterministic for every n < 2^64; delegates to GMP above that.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicU64;

impl PrimalityOracle for DeterministicU64 {
    fn name(&self) -> &'static str {
        "deterministic-u64"
    }

    fn test(&self, candidate: &Integer, rounds: u32) -> Verdict {
        match candidate.to_u64() {
            Some(n) if is_prime64(n) => Verdict::Prime,
            Some(_) => Verdict::Composite,
            None => MillerRabin.test(candidate, rounds),
        }
    }
}

/// Two-pass oracle call: a [`SCREEN_ROUNDS`] screen, then the full
/// `rounds` confirmation. Composites are rejected ~7x faster since most fail
/// the screen. Both calls are counted on `ctx`.
pub fn screened_test<O: PrimalityOracle + ?Sized>(
    oracle: &O,
    candidate: &Integer,
    rounds: u32,
    ctx: &mut RunContext,
) -> Verdict {
    if rounds > SCREEN_ROUNDS {
        ctx.record_oracle_call();
        if oracle.test(candidate, SCREEN_ROUNDS) == Verdict::Composite {
            return Verdict::Composite;
        }
    }
    ctx.record_oracle_call();
    oracle.test(candidate, rounds)
}

/// Full candidate pipeline: presieve, screen, confirm.
///
/// `rounds` overrides the bit-length schedule when set.
pub fn check_candidate<O: PrimalityOracle + ?Sized>(
    oracle: &O,
    candidate: &Integer,
    rounds: Option<u32>,
    ctx: &mut RunContext,
) -> Verdict {
    ctx.record_candidate();
    if *candidate < 2u32 || has_small_factor(candidate) {
        ctx.record_presieve_rejection();
        return Verdict::Composite;
    }
    let rounds = rounds.unwrap_or_else(|| rounds_for_bits(candidate.significant_bits()));
    screened_test(oracle, candidate, rounds, ctx)
}
