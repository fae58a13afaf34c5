//! Cross-check the aggregation methods on a reference model
//!
//! Usage: cargo run --release --bin compare_methods
//!
//! Poisson(2) claim counts with unit exponential claims in a 10 xs 0.5
//! layer. Panjer recursion is the benchmark; the other methods report their
//! largest cdf gap against it.

use aggregate_loss::distributions::{Exponential, Poisson, Thinning};
use aggregate_loss::{
    AggregateDistribution, AggregationMethod, LossModel, LossModelConfig, PolicyLayer,
    RecordingSink, Severity,
};
use anyhow::Result;
use rayon::prelude::*;
use std::time::Instant;

/// Points at which the cdfs are compared
const CHECK_POINTS: usize = 200;

fn methods() -> Vec<(&'static str, AggregationMethod)> {
    vec![
        ("recursion", AggregationMethod::Recursion { normalize: false }),
        (
            "fft (tilted)",
            AggregationMethod::Fft {
                tilt: true,
                tilt_value: None,
                normalize: false,
            },
        ),
        (
            "fft",
            AggregationMethod::Fft {
                tilt: false,
                tilt_value: None,
                normalize: false,
            },
        ),
        (
            "monte carlo",
            AggregationMethod::MonteCarlo {
                n_sim: 200_000,
                random_state: 42,
            },
        ),
    ]
}

/// Largest absolute cdf difference over an even grid of `[0, upper]`
fn max_cdf_gap(a: &AggregateDistribution, b: &AggregateDistribution, upper: f64) -> f64 {
    (0..=CHECK_POINTS)
        .map(|i| upper * i as f64 / CHECK_POINTS as f64)
        .map(|x| (a.cdf_at(x) - b.cdf_at(x)).abs())
        .fold(0.0, f64::max)
}

fn main() -> Result<()> {
    env_logger::init();

    let severity = Exponential::new(1.0)?;
    let layer = PolicyLayer::new(0.5, 10.0)?;
    let frequency = Poisson::new(2.0)?.thinned(severity.survival(layer.deductible))?;

    println!("Reference model: Poisson(2) x Exponential(1), layer 10 xs 0.5");
    println!("Layer claim count mean: {:.6}\n", 2.0 * (-0.5f64).exp());

    let start = Instant::now();
    let results: Vec<(&str, AggregateDistribution, f64, usize)> = methods()
        .into_par_iter()
        .map(|(name, aggr_method)| {
            let config = LossModelConfig {
                aggr_method,
                n_aggr_dist_nodes: 1 << 12,
                n_sev_discr_nodes: 1 << 10,
                ..LossModelConfig::default()
            };
            let model = LossModel::new(frequency.clone(), severity.clone(), layer, config);
            let sink = RecordingSink::new();
            let started = Instant::now();
            let dist = model.aggregate(&sink)?;
            let elapsed = started.elapsed().as_secs_f64();
            Ok((name, dist, elapsed, sink.events().len()))
        })
        .collect::<aggregate_loss::Result<_>>()?;
    println!("All methods finished in {:?}\n", start.elapsed());

    let expected = LossModel::new(frequency, severity, layer, LossModelConfig::default())
        .expected_loss();
    let benchmark = &results[0].1;
    let upper = benchmark.ppf(0.9999);

    println!(
        "{:<14} {:>10} {:>10} {:>10} {:>12} {:>10} {:>9}",
        "method", "mean", "std", "skewness", "max cdf gap", "seconds", "warnings"
    );
    println!("{}", "-".repeat(81));
    for (name, dist, elapsed, warnings) in &results {
        println!(
            "{:<14} {:>10.6} {:>10.6} {:>10.6} {:>12.2e} {:>10.3} {:>9}",
            name,
            dist.mean(),
            dist.std(),
            dist.skewness(),
            max_cdf_gap(dist, benchmark, upper),
            elapsed,
            warnings
        );
    }
    println!("\nAnalytic expected loss: {:.6}", expected);

    Ok(())
}
