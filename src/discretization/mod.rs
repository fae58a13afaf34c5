//! Severity discretization
//!
//! Converts a continuous severity into probability masses on an evenly spaced
//! grid, the input of the FFT and Panjer aggregators. All masses describe the
//! loss in excess of the deductible, i.e. they are conditioned on `X > d`.
//!
//! An infinite exit point means "no upper truncation". When the exit point is
//! finite every method appends exactly one terminal node carrying the mass
//! beyond the last regular bucket.

mod methods;

pub use methods::{
    local_moments, lower_discretization, mass_dispersal, upper_discr_point_prob_adjuster,
    upper_discretization,
};

use serde::{Deserialize, Serialize};

use crate::distributions::Severity;

/// Grid on which a severity is discretized
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscretizationParams {
    /// Deductible (retention, priority)
    pub deductible: f64,

    /// Deductible plus cover. `f64::INFINITY` when the cover is unlimited
    pub exit_point: f64,

    /// Distance between consecutive nodes
    pub discr_step: f64,

    /// Number of regular nodes, excluding the terminal truncation node
    pub n_discr_nodes: usize,
}

impl DiscretizationParams {
    pub fn new(deductible: f64, exit_point: f64, discr_step: f64, n_discr_nodes: usize) -> Self {
        Self {
            deductible,
            exit_point,
            discr_step,
            n_discr_nodes,
        }
    }

    /// Whether the severity is truncated at a finite exit point
    pub fn is_truncated(&self) -> bool {
        self.exit_point.is_finite()
    }
}

/// Discrete severity: `fj[i]` is the probability of a loss equal to `nodes[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscretizedSeverity {
    pub nodes: Vec<f64>,
    pub fj: Vec<f64>,
}

impl DiscretizedSeverity {
    pub fn len(&self) -> usize {
        self.fj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fj.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.fj.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.nodes.iter().zip(&self.fj).map(|(x, p)| x * p).sum()
    }
}

/// Available discretization schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscretizationMethod {
    /// Mass of each bucket centred on its node
    MassDispersal,

    /// Left-aligned buckets, empty first bucket
    Lower,

    /// Right-aligned buckets
    Upper,

    /// Buckets matching the local first moment
    #[default]
    LocalMoments,
}

impl DiscretizationMethod {
    pub fn discretize<S: Severity + ?Sized>(
        &self,
        severity: &S,
        params: &DiscretizationParams,
    ) -> DiscretizedSeverity {
        log::debug!(
            "Discretizing severity with {:?}: d={}, u={}, h={}, n={}",
            self,
            params.deductible,
            params.exit_point,
            params.discr_step,
            params.n_discr_nodes
        );
        match self {
            DiscretizationMethod::MassDispersal => mass_dispersal(severity, params),
            DiscretizationMethod::Lower => lower_discretization(severity, params),
            DiscretizationMethod::Upper => upper_discretization(severity, params),
            DiscretizationMethod::LocalMoments => local_moments(severity, params),
        }
    }
}
