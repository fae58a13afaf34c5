//! Aggregate loss calculation
//!
//! Three interchangeable methods produce an [`AggregateDistribution`]:
//!
//! * [`fft`] convolves a discretized severity in the transform domain
//! * [`panjer_recursion`] runs the exact (a, b, 1) recursion
//! * [`mc_simulation`] samples the raw severity and frequency models
//!
//! The deterministic methods share the cumulative-sum, normalization, mass
//! and shortfall checks defined here.

mod distribution;
mod fft;
mod recursion;
mod simulation;

pub use distribution::AggregateDistribution;
pub use fft::{fft, FftParams};
pub use recursion::{panjer_recursion, RecursionParams};
pub use simulation::{mc_simulation, SimulationParams};

use serde::{Deserialize, Serialize};

use crate::config::CalculationConfig;
use crate::diagnostics::{Diagnostic, DiagnosticsSink};

/// Default number of simulated years
pub const DEFAULT_N_SIM: usize = 10_000;

fn default_tilt() -> bool {
    true
}

fn default_n_sim() -> usize {
    DEFAULT_N_SIM
}

/// Aggregation method with its method-specific settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Transform-domain convolution
    Fft {
        /// Apply exponential tilting before the forward transform
        #[serde(default = "default_tilt")]
        tilt: bool,

        /// Tilting parameter. `20 / m` when not given
        #[serde(default)]
        tilt_value: Option<f64>,

        #[serde(default)]
        normalize: bool,
    },

    /// Panjer recursion
    Recursion {
        #[serde(default)]
        normalize: bool,
    },

    /// Monte Carlo simulation of the raw models
    MonteCarlo {
        #[serde(default = "default_n_sim")]
        n_sim: usize,

        #[serde(default)]
        random_state: u64,
    },
}

impl Default for AggregationMethod {
    fn default() -> Self {
        AggregationMethod::Fft {
            tilt: true,
            tilt_value: None,
            normalize: false,
        }
    }
}

impl AggregationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationMethod::Fft { .. } => "fft",
            AggregationMethod::Recursion { .. } => "recursion",
            AggregationMethod::MonteCarlo { .. } => "mc",
        }
    }

    /// Whether the method consumes a discretized severity
    pub fn needs_discretization(&self) -> bool {
        !matches!(self, AggregationMethod::MonteCarlo { .. })
    }
}

/// Rescale a probability vector to unit total mass
pub(crate) fn normalize(pmf: &mut [f64]) {
    let total: f64 = pmf.iter().sum();
    if total > 0.0 {
        pmf.iter_mut().for_each(|p| *p /= total);
    }
}

/// Running sum of a probability vector, clipped at one
///
/// A NaN running total stays NaN.
pub(crate) fn cumulative(pmf: &[f64]) -> Vec<f64> {
    pmf.iter()
        .scan(0.0, |total, p| {
            *total += p;
            Some(if *total >= 1.0 { 1.0 } else { *total })
        })
        .collect()
}

/// Warn through the sink when a mass is non-finite or negative beyond the tolerance
pub(crate) fn check_masses(
    method: &'static str,
    pmf: &[f64],
    config: &CalculationConfig,
    sink: &dyn DiagnosticsSink,
) {
    let nonfinite = pmf.iter().filter(|p| !p.is_finite()).count();
    let negative = pmf
        .iter()
        .filter(|&&p| p < -config.prob_tolerance)
        .count();
    if nonfinite > 0 || negative > 0 {
        let min_mass = pmf
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .fold(f64::INFINITY, f64::min);
        sink.emit(Diagnostic::InvalidMass {
            method,
            nonfinite,
            negative,
            min_mass,
        });
    }
}

/// Warn through the sink when the last cumulative probability falls short of one
pub(crate) fn check_shortfall(
    method: &'static str,
    cdf: &[f64],
    config: &CalculationConfig,
    sink: &dyn DiagnosticsSink,
) {
    let last_cdf = cdf.last().copied().unwrap_or(0.0);
    let shortfall = 1.0 - last_cdf;
    if shortfall > config.prob_tolerance {
        sink.emit(Diagnostic::CdfShortfall {
            method,
            last_cdf,
            shortfall,
        });
    }
}
