//! # Wheel — Coprime Residue Tables for Candidate Skipping
//!
//! A wheel of modulus M lists the residues r in [0, M) with gcd(r, M) = 1.
//! Every prime greater than the primes dividing M lies on one of those
//! residues, so stepping only through them skips most composites before any
//! primality test runs:
//!
//! | Wheel | Residues | Candidates skipped |
//! |-------|----------|--------------------|
//! | 30 = 2·3·5   | 8  | 73.3% |
//! | 210 = 2·3·5·7 | 48 | 77.1% |
//!
//! Only these two moduli exist, so the wheel is a closed enum over
//! compile-time tables. Any other modulus is rejected at configuration time.
//!
//! All operations take non-negative integers and are pure: a `mod_u` plus a
//! binary search over the table.

use std::fmt;

use rug::Integer;
use serde::{Deserialize, Serialize};

use crate::error::Error;

const WHEEL_30: [u32; 8] = [1, 7, 11, 13, 17, 19, 23, 29];

const WHEEL_210: [u32; 48] = [
    1, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97, 101,
    103, 107, 109, 113, 121, 127, 131, 137, 139, 143, 149, 151, 157, 163, 167, 169, 173, 179, 181,
    187, 191, 193, 197, 199, 209,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum Wheel {
    /// 2·3·5
    Mod30,
    /// 2·3·5·7
    #[default]
    Mod210,
}

impl Wheel {
    pub fn from_modulus(modulus: u64) -> Result<Self, Error> {
        match modulus {
            30 => Ok(Wheel::Mod30),
            210 => Ok(Wheel::Mod210),
            other => Err(Error::UnsupportedWheel(other)),
        }
    }

    pub fn modulus(self) -> u32 {
        match self {
            Wheel::Mod30 => 30,
            Wheel::Mod210 => 210,
        }
    }

    /// Ascending residues coprime to the modulus.
    pub fn residues(self) -> &'static [u32] {
        match self {
            Wheel::Mod30 => &WHEEL_30,
            Wheel::Mod210 => &WHEEL_210,
        }
    }

    /// Primes dividing the modulus. They are the only primes *not* on the wheel.
    pub fn base_primes(self) -> &'static [u32] {
        match self {
            Wheel::Mod30 => &[2, 3, 5],
            Wheel::Mod210 => &[2, 3, 5, 7],
        }
    }

    /// Smallest prime that lies on the wheel (7 or 11).
    pub fn first_prime(self) -> u32 {
        self.residues()[1]
    }

    /// Residue used by the `i`-th rotating scan.
    pub fn residue(self, i: usize) -> u32 {
        let r = self.residues();
        r[i % r.len()]
    }

    /// Smallest coprime value `>= n`. Idempotent on coprime input.
    pub fn align_up(self, n: &Integer) -> Integer {
        let m = self.modulus();
        let table = self.residues();
        let r = n.mod_u(m);
        let idx = table.partition_point(|&x| x < r);
        let delta = match table.get(idx) {
            Some(&res) => res - r,
            // Past the last residue: wrap to the next block's residue 1.
            None => m - r + 1,
        };
        Integer::from(n + delta)
    }

    /// Largest coprime value `<= n`. Idempotent on coprime input.
    pub fn align_down(self, n: &Integer) -> Integer {
        let m = self.modulus();
        let table = self.residues();
        let r = n.mod_u(m);
        let idx = table.partition_point(|&x| x <= r);
        let delta = if idx > 0 {
            r - table[idx - 1]
        } else {
            // r == 0: previous block's last residue is m - 1.
            r + (m - table[table.len() - 1])
        };
        Integer::from(n - delta)
    }

    /// Next coprime value strictly greater than `n`.
    pub fn next(self, n: &Integer) -> Integer {
        self.align_up(&Integer::from(n + 1u32))
    }

    /// Previous coprime value strictly smaller than `n`.
    pub fn prev(self, n: &Integer) -> Integer {
        self.align_down(&Integer::from(n - 1u32))
    }

    /// Telemetry label for a scan that used `residue`.
    pub fn label(self, residue: u32) -> String {
        format!("mod_{}/r={}", self.modulus(), residue)
    }
}

impl TryFrom<u64> for Wheel {
    type Error = Error;

    fn try_from(modulus: u64) -> Result<Self, Error> {
        Wheel::from_modulus(modulus)
    }
}

impl From<Wheel> for u64 {
    fn from(w: Wheel) -> u64 {
        w.modulus() as u64
    }
}

impl fmt::Display for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mod_{}", self.modulus())
    }
}
