//! Calculation and loss model configuration

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationMethod;
use crate::discretization::DiscretizationMethod;

/// Default tolerance for the "close enough to 1" cumulative probability check
pub const PROB_TOLERANCE: f64 = 1e-6;

/// Default number of nodes of the aggregate loss distribution
pub const DEFAULT_AGGR_DIST_NODES: usize = 1 << 14;

/// Default number of nodes of the discretized severity
pub const DEFAULT_SEV_DISCR_NODES: usize = 1 << 12;

/// Numerical settings shared by every calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculationConfig {
    /// Largest acceptable shortfall of the final cumulative probability
    #[serde(default = "default_prob_tolerance")]
    pub prob_tolerance: f64,
}

fn default_prob_tolerance() -> f64 {
    PROB_TOLERANCE
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            prob_tolerance: PROB_TOLERANCE,
        }
    }
}

impl CalculationConfig {
    pub fn with_tolerance(prob_tolerance: f64) -> Self {
        Self { prob_tolerance }
    }
}

/// Configuration for a [`crate::LossModel`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossModelConfig {
    /// Aggregation method and its parameters
    #[serde(default)]
    pub aggr_method: AggregationMethod,

    /// Severity discretization method (FFT and recursion only)
    #[serde(default)]
    pub sev_discr_method: DiscretizationMethod,

    /// Number of nodes of the aggregate loss distribution
    #[serde(default = "default_aggr_dist_nodes")]
    pub n_aggr_dist_nodes: usize,

    /// Number of nodes of the discretized severity
    #[serde(default = "default_sev_discr_nodes")]
    pub n_sev_discr_nodes: usize,

    /// Discretization step. Derived from the layer when not given
    #[serde(default)]
    pub sev_discr_step: Option<f64>,

    #[serde(default)]
    pub calculation: CalculationConfig,
}

fn default_aggr_dist_nodes() -> usize {
    DEFAULT_AGGR_DIST_NODES
}

fn default_sev_discr_nodes() -> usize {
    DEFAULT_SEV_DISCR_NODES
}

impl Default for LossModelConfig {
    fn default() -> Self {
        Self {
            aggr_method: AggregationMethod::default(),
            sev_discr_method: DiscretizationMethod::default(),
            n_aggr_dist_nodes: DEFAULT_AGGR_DIST_NODES,
            n_sev_discr_nodes: DEFAULT_SEV_DISCR_NODES,
            sev_discr_step: None,
            calculation: CalculationConfig::default(),
        }
    }
}
