//! Exact p_n for n = 10^0 … 10^18, consulted before the estimator.
//!
//! Values past 10^9 come from published prime-counting tables (Oliveira e
//! Silva; Kim Walisch's `primecount`). The last entry exceeds `u64`.

use rug::Integer;

const GRID: [(u64, u128); 19] = [
    (1, 2),
    (10, 29),
    (100, 541),
    (1_000, 7_919),
    (10_000, 104_729),
    (100_000, 1_299_709),
    (1_000_000, 15_485_863),
    (10_000_000, 179_424_673),
    (100_000_000, 2_038_074_743),
    (1_000_000_000, 22_801_763_489),
    (10_000_000_000, 252_097_800_623),
    (100_000_000_000, 2_760_727_302_517),
    (1_000_000_000_000, 29_996_224_275_833),
    (10_000_000_000_000, 323_780_508_946_331),
    (100_000_000_000_000, 3_475_385_758_524_527),
    (1_000_000_000_000_000, 37_124_508_045_065_437),
    (10_000_000_000_000_000, 394_906_913_903_735_329),
    (100_000_000_000_000_000, 4_185_296_581_467_695_669),
    (1_000_000_000_000_000_000, 44_211_790_234_832_169_331),
];

/// Exact nth prime if `index` is on the grid.
pub fn lookup(index: &Integer) -> Option<Integer> {
    let n = index.to_u64()?;
    GRID.iter()
        .find(|&&(k, _)| k == n)
        .map(|&(_, p)| Integer::from(p))
}

/// Every `(index, prime)` pair on the grid.
pub fn entries() -> impl Iterator<Item = (Integer, Integer)> {
    GRID.iter().map(|&(n, p)| (Integer::from(n), Integer::from(p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_hits() {
        assert_eq!(lookup(&Integer::from(100u32)), Some(Integer::from(541u32)));
        assert_eq!(lookup(&Integer::from(1u32)), Some(Integer::from(2u32)));
        let p = lookup(&Integer::from(1_000_000_000_000_000_000u64)).unwrap();
        assert_eq!(p.to_string(), "44211790234832169331");
    }

    #[test]
    fn off_grid_misses() {
        for n in [0i64, 2, 99, 101, 12345, -100] {
            assert_eq!(lookup(&Integer::from(n)), None, "{}", n);
        }
        assert_eq!(lookup(&(Integer::from(u64::MAX) * 100u32)), None);
    }

    #[test]
    fn grid_is_powers_of_ten_with_prime_values() {
        for (i, (n, p)) in entries().enumerate() {
            assert_eq!(n, Integer::from(10u64.pow(i as u32)));
            assert!(p.is_probably_prime(30) != rug::integer::IsPrime::No, "{}", p);
        }
    }
}
