//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Each runner merges
//! CLI flags over the loaded [`Config`], calls into the library and prints
//! either a human-readable report or JSON on stdout.

use std::path::Path;

use anyhow::{Context, Result};
use nthprime::estimator::{self, Method};
use nthprime::generator::primes_from;
use nthprime::precision::resolve_precision;
use nthprime::predictor::PredictConfig;
use nthprime::tuner::{manual_scan, tune, ScanConfig};
use nthprime::{
    estimate_digits, parse_index, predict_batch, predict_nth_prime_with, Config, MillerRabin,
    Prediction, RunContext, ScanTelemetry, Source, Strategy, Wheel,
};
use rug::Integer;
use serde::Serialize;
use tracing::{info, warn};

use super::{Cli, MethodArg, PredictFlags};

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::ClosedForm => Method::ClosedForm,
            MethodArg::Riemann => Method::RiemannInverse,
        }
    }
}

/// Scan flags that override the `[scan]` table.
#[derive(Debug, Default)]
pub struct ScanOverrides {
    pub window: Option<u64>,
    pub step: Option<u64>,
    pub wheel: Option<u64>,
    pub target: Option<u32>,
    pub max_iters: Option<u32>,
    pub mr_rounds: Option<u32>,
    pub prec: Option<u32>,
}

/// JSON shape for a prediction: the prediction plus its estimate error.
#[derive(Serialize)]
struct PredictionReport<'a> {
    #[serde(flatten)]
    prediction: &'a Prediction,
    error_ppm: f64,
}

impl<'a> From<&'a Prediction> for PredictionReport<'a> {
    fn from(prediction: &'a Prediction) -> Self {
        PredictionReport {
            prediction,
            error_ppm: prediction.error_ppm(),
        }
    }
}

// ── Setup ───────────────────────────────────────────────────────

pub fn configure_rayon(threads: Option<usize>) {
    let Some(n) = threads else {
        return;
    };
    match rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
        Ok(()) => info!(threads = n, "Rayon pool configured"),
        Err(e) => warn!(error = %e, "Could not configure rayon thread pool"),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn parse(input: &str) -> Result<Integer> {
    parse_index(input).with_context(|| format!("invalid index {:?}", input))
}

fn predict_config(base: &PredictConfig, flags: &PredictFlags) -> Result<PredictConfig> {
    let mut config = *base;
    if let Some(bits) = flags.prec {
        config.precision_bits = Some(bits);
    }
    if let Some(rounds) = flags.mr_rounds {
        config.round_count = Some(rounds);
    }
    if let Some(m) = flags.wheel {
        config.wheel = Wheel::from_modulus(m)?;
    }
    if let Some(method) = flags.method {
        config.method = method.into();
    }
    if flags.forward {
        config.strategy = Strategy::Forward;
    }
    if flags.no_table {
        config.use_known_table = false;
    }
    config.validate()?;
    Ok(config)
}

fn scan_config(base: &ScanConfig, o: &ScanOverrides) -> Result<ScanConfig> {
    let mut config = *base;
    if let Some(m) = o.wheel {
        config.wheel = Wheel::from_modulus(m)?;
    }
    config.window = o.window.unwrap_or(config.window);
    config.step = o.step.unwrap_or(config.step);
    config.target_count = o.target.unwrap_or(config.target_count);
    config.max_iterations = o.max_iters.unwrap_or(config.max_iterations);
    config.round_count = o.mr_rounds.unwrap_or(config.round_count);
    if o.prec.is_some() {
        config.precision_bits = o.prec;
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Predict ─────────────────────────────────────────────────────

fn print_prediction(p: &Prediction) {
    println!("index:      {}", p.index);
    println!("prime:      {}", p.prime);
    match p.source {
        Source::Exact => println!("source:     exact"),
        Source::Estimated => println!("source:     estimated"),
    }
    println!("estimate:   {}", p.estimate);
    println!("error:      {:.3} ppm", p.error_ppm());
    if let Some(phase) = p.phase {
        println!("phase:      {:?}", phase);
    }
    println!("digits:     {}", estimate_digits(&p.prime));
    println!("precision:  {} bits", p.precision_bits);
    println!(
        "oracle:     {} calls, {} candidates ({:.1}% presieved)",
        p.stats.oracle_calls,
        p.stats.candidates,
        p.stats.prefilter_reduction_pct()
    );
    println!("elapsed:    {:.3} ms", p.elapsed.as_secs_f64() * 1000.0);
}

pub fn run_predict(cli: &Cli, config: &Config, index: &str, flags: &PredictFlags) -> Result<()> {
    let n = parse(index)?;
    let predict = predict_config(&config.predict, flags)?;
    let mut ctx = RunContext::new();
    let prediction = predict_nth_prime_with(&n, &predict, &MillerRabin, &mut ctx)?;
    if cli.json {
        print_json(&PredictionReport::from(&prediction))
    } else {
        print_prediction(&prediction);
        Ok(())
    }
}

// ── Estimate ────────────────────────────────────────────────────

#[derive(Serialize)]
struct EstimateReport {
    index: String,
    method: Method,
    estimate: String,
    precision_bits: u32,
    iterations: u32,
    converged: bool,
}

pub fn run_estimate(
    cli: &Cli,
    config: &Config,
    index: &str,
    method: MethodArg,
    prec: Option<u32>,
) -> Result<()> {
    let n = parse(index)?;
    let method = Method::from(method);
    let precision = resolve_precision(prec.or(config.predict.precision_bits), &n)?;
    let est = estimator::estimate(
        &n,
        method,
        &config.predict.calibration,
        &config.predict.newton,
        precision,
    )?;
    let report = EstimateReport {
        index: n.to_string(),
        method,
        estimate: est.rounded().to_string(),
        precision_bits: est.precision(),
        iterations: est.iterations(),
        converged: est.converged(),
    };
    if cli.json {
        return print_json(&report);
    }
    println!("index:      {}", report.index);
    println!("estimate:   {}", report.estimate);
    println!("method:     {:?}", method);
    println!("precision:  {} bits", report.precision_bits);
    if method == Method::RiemannInverse {
        println!(
            "newton:     {} iterations{}",
            report.iterations,
            if report.converged { "" } else { " (not converged)" }
        );
    }
    Ok(())
}

// ── Scan ────────────────────────────────────────────────────────

fn print_telemetry(t: &ScanTelemetry) {
    println!("window:     {}", t.window);
    println!("step:       {}", t.step);
    println!("ratio:      {:.6}", t.ratio);
    println!("primes:     {}", t.prime_count);
    println!("iterations: {}", t.iterations);
    println!("oracle:     {} calls", t.oracle_call_count);
    println!("elapsed:    {:.3} ms", t.elapsed_ms);
    println!("residue:    {}", t.wheel_residue_label);
    println!("status:     {}", if t.locked { "LOCKED" } else { "FAILED" });
    if let Some(p) = &t.prime_found {
        println!("prime:      {}", p);
    }
}

pub fn run_scan(
    cli: &Cli,
    config: &Config,
    index: &str,
    overrides: &ScanOverrides,
    manual: bool,
) -> Result<()> {
    let n = parse(index)?;
    let scan = scan_config(&config.scan, overrides)?;
    let precision = resolve_precision(scan.precision_bits, &n)?;
    let est = estimator::closed_form(&n, &config.predict.calibration, precision)?;
    info!(
        index_digits = estimate_digits(&n),
        window = scan.window,
        step = scan.step,
        wheel = %scan.wheel,
        manual,
        "starting scan"
    );

    let mut ctx = RunContext::new();
    let telemetry = if manual {
        manual_scan(&est, &scan, &MillerRabin, &mut ctx)?
    } else {
        tune(&est, &scan, &MillerRabin, &mut ctx)?
    };

    if cli.json {
        print_json(&telemetry)
    } else {
        print_telemetry(&telemetry);
        Ok(())
    }
}

// ── Generate ────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateReport<'a> {
    primes: &'a [nthprime::generator::GeneratedPrime],
    stats: nthprime::RunStats,
}

pub fn run_generate(cli: &Cli, start: &str, count: u64, show_stats: bool) -> Result<()> {
    let start = parse(start)?;
    let mut ctx = RunContext::new();
    let primes = primes_from(&start, count, &MillerRabin, &mut ctx);
    let stats = ctx.stats();

    if cli.json {
        return print_json(&GenerateReport {
            primes: &primes,
            stats,
        });
    }
    for g in &primes {
        let tag = if g.is_mersenne { "  [Mersenne]" } else { "" };
        println!(
            "{:>4}  {}  ({:.3} ms){}",
            g.position,
            g.value,
            g.elapsed.as_secs_f64() * 1000.0,
            tag
        );
    }
    if show_stats {
        println!("candidates:  {}", stats.candidates);
        println!("presieved:   {}", stats.presieve_rejections);
        println!("oracle:      {} calls", stats.oracle_calls);
        println!("reduction:   {:.1}%", stats.prefilter_reduction_pct());
    }
    Ok(())
}

// ── Batch ───────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(untagged)]
enum BatchEntry<'a> {
    Ok(PredictionReport<'a>),
    Err { index: String, error: String },
}

pub fn run_batch(cli: &Cli, config: &Config, inputs: &[String], flags: &PredictFlags) -> Result<()> {
    let predict = predict_config(&config.predict, flags)?;
    let indices = inputs
        .iter()
        .map(|s| parse(s))
        .collect::<Result<Vec<_>>>()?;

    let results = predict_batch(&indices, &predict);
    let failures = results.iter().filter(|r| r.is_err()).count();

    if cli.json {
        let entries: Vec<BatchEntry> = indices
            .iter()
            .zip(&results)
            .map(|(n, r)| match r {
                Ok(p) => BatchEntry::Ok(p.into()),
                Err(e) => BatchEntry::Err {
                    index: n.to_string(),
                    error: e.to_string(),
                },
            })
            .collect();
        print_json(&entries)?;
    } else {
        for (n, r) in indices.iter().zip(&results) {
            match r {
                Ok(p) => println!("{}\t{}\t{:.3} ppm", p.index, p.prime, p.error_ppm()),
                Err(e) => eprintln!("{}\terror: {}", n, e),
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} predictions failed", failures, results.len());
    }
    Ok(())
}
