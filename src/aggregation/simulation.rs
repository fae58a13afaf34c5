//! Aggregate distribution by Monte Carlo simulation
//!
//! Claim counts are drawn with `random_state`, claim sizes by inverse
//! transform with `random_state + 1`. Each simulated year takes the next
//! `count` claim sizes in draw order, so results are reproducible regardless
//! of how the rayon pool schedules the work.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use super::AggregateDistribution;
use crate::distributions::{Frequency, Severity};
use crate::error::{LossModelError, Result};

/// Deductibles at or below this are treated as zero when sampling
const DEDUCTIBLE_EPSILON: f64 = 1e-5;

/// Simulation size, seed and policy layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub n_sim: usize,
    pub random_state: u64,
    pub deductible: f64,
    /// Cover above the deductible. `f64::INFINITY` when unlimited
    pub cover: f64,
}

/// Empirical aggregate loss distribution from `n_sim` simulated years
pub fn mc_simulation<F, S>(
    frequency: &F,
    severity: &S,
    params: &SimulationParams,
) -> Result<AggregateDistribution>
where
    F: Frequency + ?Sized,
    S: Severity + Sync + ?Sized,
{
    if params.n_sim == 0 {
        return Err(LossModelError::EmptyGrid("n_sim"));
    }

    let counts = frequency.rvs(params.n_sim, params.random_state);
    let n_claims: u64 = counts.iter().sum();
    log::debug!(
        "Monte Carlo aggregation: {} years, {} claims, seed {}",
        params.n_sim,
        n_claims,
        params.random_state
    );

    let p0 = if params.deductible > DEDUCTIBLE_EPSILON {
        severity.cdf(params.deductible)
    } else {
        0.0
    };

    let mut rng = ChaCha20Rng::seed_from_u64(params.random_state.wrapping_add(1));
    let uniforms: Vec<f64> = (0..n_claims)
        .map(|_| p0 + (1.0 - p0) * rng.gen::<f64>())
        .collect();

    let claims: Vec<f64> = uniforms
        .par_iter()
        .map(|&u| (severity.ppf(u) - params.deductible).min(params.cover))
        .collect();

    Ok(empirical_cdf(year_totals(&counts, &claims)))
}

/// Sum consecutive runs of `claims`, one run of `counts[k]` claims per year
///
/// A year without claims is an empty run and totals 0.
fn year_totals(counts: &[u64], claims: &[f64]) -> Vec<f64> {
    let bounds: Vec<usize> = std::iter::once(0)
        .chain(counts.iter().scan(0usize, |end, &count| {
            *end += count as usize;
            Some(*end)
        }))
        .collect();

    bounds
        .par_windows(2)
        .map(|w| claims[w[0]..w[1]].iter().fold(0.0, |total, claim| total + claim))
        .collect()
}

/// Empirical cdf evaluated at the sorted unique totals
fn empirical_cdf(mut totals: Vec<f64>) -> AggregateDistribution {
    totals.sort_by(f64::total_cmp);
    let n = totals.len() as f64;

    let mut nodes = Vec::new();
    let mut cdf = Vec::new();
    for (i, &total) in totals.iter().enumerate() {
        let is_last_of_run = totals.get(i + 1).map_or(true, |&next| next != total);
        if is_last_of_run {
            nodes.push(total);
            cdf.push((i + 1) as f64 / n);
        }
    }
    AggregateDistribution::new(cdf, nodes)
}
