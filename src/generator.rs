//! # Generator — Consecutive Probable Primes from a Starting Point
//!
//! Walks the mod-30 wheel upward from an arbitrary start, presieving each
//! candidate and confirming survivors with the oracle. Every prime produced
//! is also checked for Mersenne form: if `p + 1 = 2^k`, the Lucas–Lehmer test
//! decides whether `2^k − 1` is prime (which for such p it must be, so the
//! test acts as an independent cross-check of the oracle).
//!
//! ## Lucas–Lehmer
//!
//! For odd prime k, `M_k = 2^k − 1` is prime iff `s_{k−2} ≡ 0 (mod M_k)` where
//! `s_0 = 4`, `s_{i+1} = s_i² − 2`. A composite k always gives a composite
//! M_k, so it is rejected before the loop.

use std::time::{Duration, Instant};

use rug::Integer;
use rug::ops::RemRounding;
use serde::Serialize;
use tracing::{debug, info};

use crate::context::{serialize_millis, RunContext};
use crate::decimal;
use crate::estimate_digits;
use crate::oracle::{check_candidate, DeterministicU64, PrimalityOracle};
use crate::wheel::Wheel;

const GENERATOR_WHEEL: Wheel = Wheel::Mod30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPrime {
    /// 1-based position in the generated run.
    pub position: u64,
    #[serde(serialize_with = "decimal::serialize")]
    pub value: Integer,
    /// `k` when the value is `2^k − 1`.
    pub mersenne_exponent: Option<u32>,
    pub is_mersenne: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

/// Smallest probable prime `>= start`.
pub fn next_prime_from<O: PrimalityOracle + ?Sized>(
    start: &Integer,
    oracle: &O,
    ctx: &mut RunContext,
) -> Integer {
    let wheel = GENERATOR_WHEEL;
    if *start < wheel.first_prime() {
        for &p in wheel.base_primes() {
            let p = Integer::from(p);
            if p >= *start && check_candidate(oracle, &p, None, ctx).is_prime() {
                return p;
            }
        }
    }

    let mut candidate = wheel.align_up(start);
    loop {
        if check_candidate(oracle, &candidate, None, ctx).is_prime() {
            return candidate;
        }
        candidate = wheel.next(&candidate);
    }
}

/// `count` consecutive probable primes starting at `start`.
pub fn primes_from<O: PrimalityOracle + ?Sized>(
    start: &Integer,
    count: u64,
    oracle: &O,
    ctx: &mut RunContext,
) -> Vec<GeneratedPrime> {
    let mut out = Vec::with_capacity(count.min(1 << 16) as usize);
    let mut cursor = start.clone();
    for position in 1..=count {
        let t0 = Instant::now();
        let value = next_prime_from(&cursor, oracle, ctx);
        let mersenne_exponent = mersenne_exponent(&value);
        let is_mersenne = mersenne_exponent.is_some_and(lucas_lehmer);
        if is_mersenne {
            info!(prime = %value, "Mersenne prime");
        }
        debug!(position, digits = estimate_digits(&value), "generated");
        cursor = Integer::from(&value + 1u32);
        out.push(GeneratedPrime {
            position,
            value,
            mersenne_exponent,
            is_mersenne,
            elapsed: t0.elapsed(),
        });
    }
    out
}

/// `Some(k)` if `n = 2^k − 1` with `k >= 2`.
pub fn mersenne_exponent(n: &Integer) -> Option<u32> {
    if *n < 3u32 {
        return None;
    }
    let t = Integer::from(n + 1u32);
    if t.is_power_of_two() {
        Some(t.significant_bits() - 1)
    } else {
        None
    }
}

/// Lucas–Lehmer primality test for `2^p − 1`.
pub fn lucas_lehmer(p: u32) -> bool {
    if p == 2 {
        return true;
    }
    if p < 2 || !DeterministicU64.test(&Integer::from(p), 1).is_prime() {
        return false;
    }
    let mp = (Integer::from(1u32) << p) - 1u32;
    let mut s = Integer::from(4u32);
    for _ in 0..p - 2 {
        s.square_mut();
        s -= 2u32;
        s = s.rem_euc(&mp);
    }
    s == 0
}
