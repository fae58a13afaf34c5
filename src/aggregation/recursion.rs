//! Aggregate distribution by Panjer recursion
//!
//! For a frequency in the (a, b, 1) class the aggregate pmf satisfies
//!
//! ```text
//! g[j] = ((p1 - (a + b) p0) f[j] + Σ_{i=1..j} (a + b i / j) f[i] g[j - i]) / (1 - a f[0])
//! ```
//!
//! The correction term vanishes for the (a, b, 0) class. It enters every term
//! of the recursion rather than being applied to the finished vector afterwards,
//! which keeps the result exact for the whole (a, b, 1) class. The recursion is
//! strictly sequential, O(m²) in the number of nodes.

use super::{check_masses, check_shortfall, cumulative, normalize, AggregateDistribution};
use crate::config::CalculationConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::distributions::{Frequency, PanjerCoefficients};
use crate::error::{LossModelError, Result};

/// Grid and numerical options of the recursion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecursionParams {
    pub n_aggr_dist_nodes: usize,
    pub discr_step: f64,
    pub normalize: bool,
}

/// Aggregate loss distribution of a discretized severity `fj` by Panjer recursion
///
/// Severity masses beyond the aggregate grid never enter the recursion.
pub fn panjer_recursion<F: Frequency + ?Sized>(
    frequency: &F,
    fj: &[f64],
    params: &RecursionParams,
    config: &CalculationConfig,
    sink: &dyn DiagnosticsSink,
) -> Result<AggregateDistribution> {
    let m = params.n_aggr_dist_nodes;
    if m == 0 {
        return Err(LossModelError::EmptyGrid("n_aggr_dist_nodes"));
    }
    if fj.is_empty() {
        return Err(LossModelError::EmptyGrid("severity masses"));
    }

    let PanjerCoefficients { a, b, p0, g0 } = frequency.panjer_coefficients(fj);
    let correction = frequency.pmf(1) - (a + b) * p0;
    let denominator = 1.0 - a * fj[0];
    log::debug!(
        "Panjer recursion: m={}, a={}, b={}, p0={}, g0={}",
        m,
        a,
        b,
        p0,
        g0
    );

    let mut g = vec![0.0; m];
    g[0] = g0;
    for j in 1..m {
        let jf = j as f64;
        let upper = j.min(fj.len() - 1);
        let convolution: f64 = (1..=upper)
            .map(|i| (a + b * i as f64 / jf) * fj[i] * g[j - i])
            .sum();
        let own = fj.get(j).copied().unwrap_or(0.0);
        g[j] = (correction * own + convolution) / denominator;
    }

    if params.normalize {
        normalize(&mut g);
    }

    check_masses("recursion", &g, config, sink);
    let cdf = cumulative(&g);
    check_shortfall("recursion", &cdf, config, sink);

    let nodes = (0..m).map(|i| params.discr_step * i as f64).collect();
    Ok(AggregateDistribution::new(cdf, nodes))
}
