//! Property-based tests for nthprime's arithmetic and search primitives.
//!
//! These tests use the `proptest` framework to check invariants across
//! randomly generated inputs rather than a handful of known values.
//!
//! # How to run
//!
//! ```bash
//! # Run all property tests:
//! cargo test --test property_tests
//!
//! # Increase case count for thorough testing (default is 256):
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```
//!
//! # Testing strategy
//!
//! - **Presieve and oracles**: `has_small_factor`, agreement between the
//!   deterministic and GMP oracles.
//! - **Wheel**: alignment is idempotent, lands on coprime values and skips
//!   nothing coprime.
//! - **Estimator**: the closed form is monotone in n.
//! - **Refinement**: results are prime and found inside the window.
//! - **Tuner**: every run terminates and `locked` matches the prime count.
//! - **Index parsing**: decimal and power notation agree with `rug`.
//!
//! Each property is named `prop_<function>_<invariant>`.

use nthprime::estimator::{closed_form, Calibration, Estimate};
use nthprime::precision::working_precision;
use nthprime::refine::{window_bound, MIN_WINDOW};
use nthprime::tuner::tune;
use nthprime::{
    has_small_factor, parse_index, refine, DeterministicU64, MillerRabin, Phase,
    PrimalityOracle, RefineConfig, RunContext, ScanConfig, Wheel,
};
use proptest::prelude::*;
use rug::ops::Pow;
use rug::Integer;

fn naive_is_prime(n: u64) -> bool {
    n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn wheel_strategy() -> impl Strategy<Value = Wheel> {
    prop_oneof![Just(Wheel::Mod30), Just(Wheel::Mod210)]
}

// == Presieve and Oracles ======================================================

proptest! {
    /// has_small_factor(n) is exactly "divisible by a prime <= 311 other than n".
    #[test]
    fn prop_has_small_factor_matches_trial_division(n in 2u64..10_000_000) {
        let expected = (2u64..=311)
            .filter(|&p| naive_is_prime(p))
            .any(|p| n % p == 0 && n != p);
        prop_assert_eq!(has_small_factor(&Integer::from(n)), expected);
    }

    /// The deterministic oracle and GMP agree on every u64 input tried.
    #[test]
    fn prop_oracles_agree_below_2_64(n in 2u64..u64::MAX) {
        let n = Integer::from(n);
        let det = DeterministicU64.test(&n, 25).is_prime();
        let gmp = MillerRabin.test(&n, 25).is_prime();
        prop_assert_eq!(det, gmp, "disagreement at {}", n);
    }
}

// == Wheel =====================================================================

proptest! {
    /// align_up is idempotent, coprime to the modulus, and skips no coprime value.
    #[test]
    fn prop_align_up_is_least_coprime_at_or_above(
        wheel in wheel_strategy(),
        n in 0u64..1_000_000_000_000,
    ) {
        let m = wheel.modulus() as u64;
        let up = wheel.align_up(&Integer::from(n));
        let up_u = up.to_u64().unwrap();
        prop_assert!(up_u >= n);
        prop_assert_eq!(gcd(up_u, m), 1);
        prop_assert_eq!(wheel.align_up(&up), up.clone());
        for k in n..up_u {
            prop_assert!(gcd(k, m) != 1, "{} skipped coprime {}", wheel, k);
        }
    }

    /// align_down mirrors align_up; next/prev are strict.
    #[test]
    fn prop_align_down_and_steps(
        wheel in wheel_strategy(),
        n in 1u64..1_000_000_000_000,
    ) {
        let m = wheel.modulus() as u64;
        let n_big = Integer::from(n);
        let down = wheel.align_down(&n_big).to_u64().unwrap();
        prop_assert!(down <= n);
        prop_assert_eq!(gcd(down, m), 1);
        for k in down + 1..=n {
            prop_assert!(gcd(k, m) != 1);
        }
        prop_assert!(wheel.next(&n_big) > n_big);
        prop_assert!(wheel.prev(&n_big) < n_big);
        prop_assert_eq!(wheel.prev(&wheel.next(&n_big)), wheel.align_down(&n_big));
    }
}

// == Estimator and Refinement ==================================================

proptest! {
    /// The closed-form estimate never decreases as n grows.
    #[test]
    fn prop_closed_form_is_monotone(n in 100u64..1_000_000_000_000) {
        let cal = Calibration::default();
        let a = Integer::from(n);
        let b = Integer::from(n + 1);
        let ea = closed_form(&a, &cal, working_precision(&a)).unwrap();
        let eb = closed_form(&b, &cal, working_precision(&b)).unwrap();
        prop_assert!(eb.rounded() >= ea.rounded());
    }

    /// Refinement returns a genuine prime from inside the window, after at most
    /// one direct test plus two per window step.
    #[test]
    fn prop_refine_finds_prime_in_window(
        wheel in wheel_strategy(),
        e in 12u64..1_000_000_000,
    ) {
        let estimate = Estimate::from_integer(&Integer::from(e), 320);
        let config = RefineConfig { wheel, ..RefineConfig::default() };
        let mut ctx = RunContext::new();
        let r = refine(&estimate, &Integer::from(1u32), &config, &DeterministicU64, &mut ctx)
            .unwrap();
        let p = r.prime.to_u64().unwrap();
        let bound = window_bound(&estimate, MIN_WINDOW);
        prop_assert!(naive_is_prime(p), "{} -> {}", e, p);
        prop_assert_ne!(r.phase, Phase::Fallback);
        prop_assert!(p.abs_diff(e) <= bound + wheel.modulus() as u64);
        prop_assert!(r.candidates_tested <= 2 * bound + 1);
    }
}

// == Tuner =====================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every tuner run terminates within max_iterations, and `locked` holds
    /// exactly when the final scan saw target_count primes.
    #[test]
    fn prop_tuner_terminates_and_reports_consistently(
        wheel in wheel_strategy(),
        estimate in 100u64..1_000_000_000_000,
        window in 1u64..40,
        step in 1u64..5,
        target in 1u32..3,
        max_iterations in 1u32..8,
    ) {
        let config = ScanConfig {
            window,
            step,
            wheel,
            round_count: 10,
            target_count: target,
            max_iterations,
            precision_bits: None,
        };
        let est = Estimate::from_integer(&Integer::from(estimate), 320);
        let mut ctx = RunContext::new();
        let t = tune(&est, &config, &DeterministicU64, &mut ctx).unwrap();
        prop_assert!(t.iterations <= max_iterations);
        prop_assert_eq!(t.locked, t.prime_count == target);
        if t.prime_count == 1 {
            let p = t.prime_found.clone().unwrap().to_u64().unwrap();
            prop_assert!(naive_is_prime(p));
        } else {
            prop_assert!(t.prime_found.is_none());
        }
        prop_assert_eq!(t.oracle_call_count, ctx.oracle_calls());
    }
}

// == Index Parsing =============================================================

proptest! {
    /// Decimal strings parse back to the same value.
    #[test]
    fn prop_parse_index_decimal_roundtrip(n in any::<u128>()) {
        prop_assert_eq!(parse_index(&n.to_string()).unwrap(), Integer::from(n));
    }

    /// `a^b` and `me<b>` agree with rug's own arithmetic.
    #[test]
    fn prop_parse_index_power_forms(a in 0u32..1000, b in 0u32..200) {
        let pow = parse_index(&format!("{}^{}", a, b)).unwrap();
        prop_assert_eq!(pow, Integer::from(a).pow(b));
        let sci = parse_index(&format!("{}e{}", a, b)).unwrap();
        prop_assert_eq!(sci, Integer::from(a) * Integer::from(10u32).pow(b));
    }
}
