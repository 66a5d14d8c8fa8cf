//! # Estimator — Real-Valued Approximations of p_n
//!
//! Two independent paths produce an [`Estimate`] for the refinement engine.
//! Neither is exact; the only contract is "close enough that a bounded local
//! search finds a genuine prime nearby".
//!
//! ## Closed Form (default)
//!
//! ```text
//! pnt = n · (ln n + ln ln n − 1 + (ln ln n − 2) / ln n)
//! d   = c  · pnt · (ln pnt / e⁴)²          curvature correction
//! e   = κ* · pnt · pnt^(−1/3)              sub-linear correction
//! p̂  = round(pnt + d + e)                  clamped to pnt if ≤ 0
//! ```
//!
//! with least-squares calibrated `c = −0.00247`, `κ* = 0.04449`. Relative
//! error stays under 0.2% from n = 10^5 through 10^18.
//!
//! ## Riemann R Inversion
//!
//! Solves `R(x) = n` by Newton's method, where
//!
//! ```text
//! R(x)  = Σ_{k=1..K} μ(k)/k · li(x^{1/k})
//! R'(x) = (1/ln x) · Σ_{k=1..K} μ(k)/k · x^{1/k − 1}
//! ```
//!
//! starting from the three-term Cipolla expansion. Typically converges in 2–3
//! steps and is an order of magnitude more accurate than the closed form, at
//! a much higher cost for large n (the `li` power series needs ~e·ln x terms).
//!
//! All intermediate `Float`s are created at the caller's precision.
//!
//! ## References
//!
//! - M. Cipolla, "La determinazione assintotica dell'n-esimo numero primo",
//!   Rend. Accad. Sci. Fis-Mat. Napoli, 8(3):132–166, 1902.
//! - H. Riesel, *Prime Numbers and Computer Methods for Factorization*,
//!   2nd ed., Birkhäuser, 1994, ch. 2 (Riemann's R function).

use num_prime::nt_funcs::moebius as moebius_mu;
use rug::float::Constant;
use rug::ops::Pow;
use rug::{Float, Integer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::estimate_digits;

/// Curvature coefficient `c`.
pub const C_CAL: f64 = -0.00247;

/// Sub-linear scaling coefficient `κ*`.
pub const KAPPA_STAR: f64 = 0.04449;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub c: f64,
    pub kappa_star: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            c: C_CAL,
            kappa_star: KAPPA_STAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    #[default]
    ClosedForm,
    RiemannInverse,
}

/// Newton solver settings for [`Method::RiemannInverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    /// Number of terms K in the R(x) series.
    pub terms: u32,
    pub max_iterations: u32,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        NewtonConfig {
            terms: 10,
            max_iterations: 32,
        }
    }
}

/// A real approximation of p_n and its nearest integer.
#[derive(Debug, Clone)]
pub struct Estimate {
    value: Float,
    rounded: Integer,
    iterations: u32,
    converged: bool,
}

impl Estimate {
    /// Round a real estimate to the nearest integer (ties away from zero).
    pub fn from_real(value: Float) -> Result<Self> {
        let rounded = value
            .clone()
            .round()
            .to_integer()
            .ok_or(Error::NonFiniteEstimate {
                precision: value.prec(),
            })?;
        Ok(Estimate {
            value,
            rounded,
            iterations: 1,
            converged: true,
        })
    }

    /// Wrap an exact integer as an estimate at `precision` bits.
    pub fn from_integer(n: &Integer, precision: u32) -> Self {
        Estimate {
            value: Float::with_val(precision, n),
            rounded: n.clone(),
            iterations: 0,
            converged: true,
        }
    }

    fn with_convergence(mut self, iterations: u32, converged: bool) -> Self {
        self.iterations = iterations;
        self.converged = converged;
        self
    }

    pub fn value(&self) -> &Float {
        &self.value
    }

    pub fn rounded(&self) -> &Integer {
        &self.rounded
    }

    pub fn into_rounded(self) -> Integer {
        self.rounded
    }

    /// Precision (bits) the estimate was computed at.
    pub fn precision(&self) -> u32 {
        self.value.prec()
    }

    /// Solver iterations (1 for the closed form).
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// `ln(estimate)` at the estimate's own precision.
    pub fn ln(&self) -> Float {
        Float::with_val(self.precision(), self.value.ln_ref())
    }
}

/// Dispatch to the selected estimation method.
pub fn estimate(
    index: &Integer,
    method: Method,
    calibration: &Calibration,
    newton: &NewtonConfig,
    precision: u32,
) -> Result<Estimate> {
    match method {
        Method::ClosedForm => closed_form(index, calibration, precision),
        Method::RiemannInverse => riemann_inverse(index, newton, precision),
    }
}

fn check_index(index: &Integer) -> Result<()> {
    if *index < 1u32 {
        return Err(Error::InvalidIndex(index.to_string()));
    }
    Ok(())
}

/// Calibrated closed-form estimate of p_n.
pub fn closed_form(index: &Integer, cal: &Calibration, precision: u32) -> Result<Estimate> {
    check_index(index)?;
    if *index < 2u32 {
        return Ok(Estimate::from_integer(&Integer::from(2u32), precision));
    }

    let pnt = pnt_base(index, precision);
    let d_term = curvature_term(&pnt, cal.c);
    let e_term = scaling_term(&pnt, cal.kappa_star);

    let mut est = Float::with_val(precision, &pnt + &d_term) + &e_term;
    if !(est > 0) {
        est = pnt;
    }
    let est = Estimate::from_real(est)?;
    debug!(
        index_digits = estimate_digits(index),
        precision,
        estimate_digits = estimate_digits(est.rounded()),
        "closed-form estimate"
    );
    Ok(est)
}

/// `n·(ln n + ln ln n − 1 + (ln ln n − 2)/ln n)`, or `n` where that is not
/// positive (n < 10).
fn pnt_base(index: &Integer, precision: u32) -> Float {
    let n = Float::with_val(precision, index);
    let ln_n = Float::with_val(precision, n.ln_ref());
    let ln_ln_n = Float::with_val(precision, ln_n.ln_ref());
    let tail = Float::with_val(precision, &ln_ln_n - 2u32) / &ln_n;
    let pnt = (Float::with_val(precision, &ln_n + &ln_ln_n) - 1u32 + tail) * &n;
    if pnt > 0 {
        pnt
    } else {
        n
    }
}

fn curvature_term(pnt: &Float, c: f64) -> Float {
    let prec = pnt.prec();
    let ln_pnt = Float::with_val(prec, pnt.ln_ref());
    if !(ln_pnt > 0) {
        return Float::new(prec);
    }
    let e4 = Float::with_val(prec, 4u32).exp();
    (ln_pnt / &e4).square() * pnt * c
}

fn scaling_term(pnt: &Float, kappa_star: f64) -> Float {
    let prec = pnt.prec();
    let third = Float::with_val(prec, -1i32) / 3u32;
    Float::with_val(prec, pnt.pow(&third)) * pnt * kappa_star
}

/// Logarithmic integral via `γ + ln ln x + Σ (ln x)^k / (k·k!)`, for x > 1.
pub fn li(x: &Float) -> Float {
    let prec = x.prec();
    let ln_x = Float::with_val(prec, x.ln_ref());
    let mut sum = Float::with_val(prec, Constant::Euler) + Float::with_val(prec, ln_x.ln_ref());

    // Terms peak near k = ln x and then fall off factorially.
    let cap = (4.0 * ln_x.to_f64().max(1.0)) as u32 + prec + 16;
    let mut power = Float::with_val(prec, 1u32);
    for k in 1..=cap {
        power *= &ln_x;
        power /= k;
        let term = Float::with_val(prec, &power / k);
        sum += &term;
        if negligible(&term, &sum, prec) {
            break;
        }
    }
    sum
}

fn negligible(term: &Float, sum: &Float, prec: u32) -> bool {
    match (term.get_exp(), sum.get_exp()) {
        (Some(t), Some(s)) => (t as i64) < s as i64 - prec as i64,
        _ => term.is_zero(),
    }
}

/// Riemann's prime-counting approximation truncated to `terms` terms.
pub fn riemann_r(x: &Float, terms: u32) -> Float {
    let prec = x.prec();
    let mut sum = Float::new(prec);
    for k in 1..=terms {
        let mu = i32::from(moebius_mu(&k));
        if mu == 0 {
            continue;
        }
        let root = Float::with_val(prec, x.root_ref(k));
        sum += li(&root) * mu / k;
    }
    sum
}

/// Derivative of [`riemann_r`].
pub fn riemann_r_prime(x: &Float, terms: u32) -> Float {
    let prec = x.prec();
    let mut sum = Float::new(prec);
    for k in 1..=terms {
        let mu = i32::from(moebius_mu(&k));
        if mu == 0 {
            continue;
        }
        let root = Float::with_val(prec, x.root_ref(k));
        sum += root / x * mu / k;
    }
    sum / Float::with_val(prec, x.ln_ref())
}

/// Three-term Cipolla expansion:
/// `n·(L + L2 − 1 + (L2 − 2)/L − (L2² − 6·L2 + 11)/(2L²))`.
pub fn cipolla_initializer(n: &Float) -> Float {
    let prec = n.prec();
    let l = Float::with_val(prec, n.ln_ref());
    let l2 = Float::with_val(prec, l.ln_ref());
    let second = Float::with_val(prec, &l2 - 2u32) / &l;
    let third_num = Float::with_val(prec, l2.square_ref()) - Float::with_val(prec, &l2 * 6u32) + 11u32;
    let third = third_num / (Float::with_val(prec, l.square_ref()) * 2u32);
    (Float::with_val(prec, &l + &l2) - 1u32 + second - third) * n
}

/// Newton inversion of `R(x) = n`.
pub fn riemann_inverse(index: &Integer, newton: &NewtonConfig, precision: u32) -> Result<Estimate> {
    check_index(index)?;
    if *index < 2u32 {
        return Ok(Estimate::from_integer(&Integer::from(2u32), precision));
    }

    let n = Float::with_val(precision, index);
    let floor = Float::with_val(precision, 3u32);
    let mut x = cipolla_initializer(&n);
    if !(x >= 3) {
        x = floor.clone();
    }

    let mut iterations = 0;
    let mut converged = false;
    while iterations < newton.max_iterations {
        iterations += 1;
        let f = riemann_r(&x, newton.terms) - &n;
        let df = riemann_r_prime(&x, newton.terms);
        if df.is_zero() || !df.is_finite() {
            warn!(iterations, "R'(x) vanished, stopping Newton iteration");
            break;
        }
        let delta = f / &df;
        x -= &delta;
        if !(x >= 3) {
            x = floor.clone();
        }
        if delta.abs() < 0.5 {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            iterations,
            index_digits = estimate_digits(index),
            "Riemann inversion did not converge"
        );
    }
    debug!(iterations, converged, precision, "Riemann inverse estimate");
    Ok(Estimate::from_real(x)?.with_convergence(iterations, converged))
}
