//! End-to-end checks against published nth-prime values.
//!
//! The grid path must reproduce every tabulated p_(10^k) exactly; the
//! estimation path must land within a small relative error of the same values
//! and always return a genuine probable prime.

use nthprime::estimator::closed_form;
use nthprime::known;
use nthprime::oracle::rounds_for_bits;
use nthprime::{
    predict_nth_prime, predict_nth_prime_with, scan, Calibration, Error, MillerRabin,
    PredictConfig, PrimalityOracle, RunContext, Source, Strategy,
};
use rug::ops::Pow;
use rug::Integer;

fn no_table() -> PredictConfig {
    PredictConfig {
        use_known_table: false,
        ..PredictConfig::default()
    }
}

#[test]
fn grid_is_reproduced_exactly() {
    for (n, p) in known::entries() {
        let prediction = predict_nth_prime(&n).unwrap();
        assert_eq!(prediction.prime, p, "p_{}", n);
        assert_eq!(prediction.source, Source::Exact);
    }
}

#[test]
fn small_anchors() {
    assert_eq!(predict_nth_prime(&Integer::from(100u32)).unwrap().prime, 541);
    assert_eq!(predict_nth_prime(&Integer::from(1000u32)).unwrap().prime, 7919);
    assert_eq!(
        predict_nth_prime(&Integer::from(10u32).pow(9)).unwrap().prime,
        22_801_763_489u64
    );
}

#[test]
fn estimation_path_stays_close_to_grid() {
    // Indices with enough headroom for the asymptotic to be accurate.
    for k in 5..=12u32 {
        let n = Integer::from(10u32).pow(k);
        let exact = known::lookup(&n).unwrap();
        let mut ctx = RunContext::new();
        let p = predict_nth_prime_with(&n, &no_table(), &MillerRabin, &mut ctx).unwrap();
        assert_eq!(p.source, Source::Estimated);
        assert!(MillerRabin.test(&p.prime, 25).is_prime());

        let rel = (Integer::from(&p.prime - &exact).to_f64() / exact.to_f64()).abs();
        assert!(rel < 1e-3, "10^{}: {} vs {} (rel {})", k, p.prime, exact, rel);
    }
}

#[test]
fn thousand_digit_indices_refine_to_probable_primes() {
    for k in [100u32, 1000] {
        let n = Integer::from(10u32).pow(k);
        let mut ctx = RunContext::new();
        let p = predict_nth_prime_with(&n, &PredictConfig::default(), &MillerRabin, &mut ctx)
            .unwrap();
        assert_eq!(p.source, Source::Estimated);
        assert_eq!(p.precision_bits, n.significant_bits() + 2048);

        let rounds = rounds_for_bits(p.prime.significant_bits());
        assert!(MillerRabin.test(&p.prime, rounds).is_prime(), "10^{}", k);

        let distance = Integer::from(&p.prime - &p.estimate).abs();
        let bound = 4 * p.prime.significant_bits() as u64;
        assert!(distance <= bound, "10^{}: {} from the estimate", k, distance);
        assert!(p.error_ppm() < 1_000.0);
    }
}

#[test]
fn forward_strategy_returns_prime_at_or_above_estimate() {
    let n = Integer::from(10u32).pow(7);
    let config = PredictConfig {
        strategy: Strategy::Forward,
        ..no_table()
    };
    let mut ctx = RunContext::new();
    let p = predict_nth_prime_with(&n, &config, &MillerRabin, &mut ctx).unwrap();
    assert!(p.prime >= p.estimate);
    assert!(MillerRabin.test(&p.prime, 25).is_prime());
}

#[test]
fn scan_near_ten_to_the_eighteen_terminates() {
    let n = Integer::from(10u32).pow(18);
    let est = closed_form(&n, &Calibration::default(), 2048 + 64).unwrap();
    assert_eq!(est.rounded().to_string(), "44137579087604059716");

    let t = scan(&est, 64, 2, 210, 25, 1, 100).unwrap();
    if t.locked {
        assert_eq!(t.prime_count, 1);
        let p = t.prime_found.unwrap();
        assert!(MillerRabin.test(&p, 25).is_prime());
    } else {
        assert_eq!(t.iterations, 100);
        assert!(t.prime_found.is_none() || t.prime_count == 1);
    }
    assert!(t.wheel_residue_label.starts_with("mod_210/r="));
}

#[test]
fn scan_rejects_wheel_seven() {
    let n = Integer::from(1000u32);
    let est = closed_form(&n, &Calibration::default(), 320).unwrap();
    let err = scan(&est, 64, 2, 7, 25, 1, 100).unwrap_err();
    assert_eq!(err, Error::UnsupportedWheel(7));
    assert!(err.to_string().contains("unsupported wheel modulus 7"));
}
