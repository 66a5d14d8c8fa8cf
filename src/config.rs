//! # Config — TOML Settings and Index Parsing
//!
//! A config file holds two optional tables:
//!
//! ```toml
//! [predict]
//! precision_bits = 4096
//! round_count = 25
//! wheel = 210
//! method = "closed-form"      # or "riemann-inverse"
//! strategy = "symmetric"      # or "forward"
//! use_known_table = true
//!
//! [predict.calibration]
//! c = -0.00247
//! kappa_star = 0.04449
//!
//! [scan]
//! window = 64
//! step = 2
//! wheel = 210
//! round_count = 50
//! target_count = 1
//! max_iterations = 100
//! ```
//!
//! Missing keys take their defaults; unknown keys are rejected. The loaded
//! config is validated before it is returned, so a wheel of 7 or a zero step
//! fails at load time rather than mid-run. CLI flags are layered on top by
//! the binary.

use std::path::Path;

use rug::ops::Pow;
use rug::Integer;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::predictor::PredictConfig;
use crate::tuner::ScanConfig;

/// Largest exponent accepted in `a^b` and `me<b>` notation.
pub const MAX_EXPONENT: u32 = 100_000;

/// Largest index accepted, in bits (~315k decimal digits). Checked before
/// any power is expanded.
pub const MAX_INDEX_BITS: u64 = 1 << 20;

/// Longest digit string that can stay within [`MAX_INDEX_BITS`].
const MAX_INDEX_DIGITS: usize = 315_653;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub predict: PredictConfig,
    pub scan: ScanConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.predict.validate()?;
        self.scan.validate()
    }
}

/// Parse a non-negative integer written as `123456`, `10^1234` or `1e100`.
pub fn parse_index(input: &str) -> Result<Integer> {
    let s = input.trim();
    let fail = |reason: &str| Error::ParseIndex {
        input: input.to_string(),
        reason: reason.to_string(),
    };
    if s.is_empty() {
        return Err(fail("empty input"));
    }

    if s.len() > MAX_INDEX_DIGITS {
        return Err(fail("index is too large"));
    }

    if let Some((base, exp)) = s.split_once('^') {
        let base = parse_digits(base).ok_or_else(|| fail("base is not a decimal integer"))?;
        let exp = parse_exponent(exp).map_err(fail)?;
        // bits(b^e) <= bits(b)·e
        check_bits(u64::from(base.significant_bits()) * u64::from(exp)).map_err(fail)?;
        return Ok(base.pow(exp));
    }

    if let Some((mantissa, exp)) = s.split_once(|c| c == 'e' || c == 'E') {
        let mantissa =
            parse_digits(mantissa).ok_or_else(|| fail("mantissa is not a decimal integer"))?;
        let exp = parse_exponent(exp).map_err(fail)?;
        // bits(10^e) <= 4·e
        check_bits(u64::from(mantissa.significant_bits()) + 4 * u64::from(exp)).map_err(fail)?;
        return Ok(mantissa * Integer::from(10u32).pow(exp));
    }

    let n = parse_digits(s).ok_or_else(|| fail("not a decimal integer"))?;
    check_bits(u64::from(n.significant_bits())).map_err(fail)?;
    Ok(n)
}

fn parse_digits(s: &str) -> Option<Integer> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Integer::from_str_radix(s, 10).ok()
}

fn check_bits(bits: u64) -> std::result::Result<(), &'static str> {
    if bits > MAX_INDEX_BITS {
        Err("index exceeds 1048576 bits")
    } else {
        Ok(())
    }
}

fn parse_exponent(s: &str) -> std::result::Result<u32, &'static str> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err("exponent is not a decimal integer");
    }
    match s.parse::<u32>() {
        Ok(e) if e <= MAX_EXPONENT => Ok(e),
        _ => Err("exponent exceeds 100000"),
    }
}
