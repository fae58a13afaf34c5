//! The aggregate loss distribution returned by every aggregation method

use serde::{Deserialize, Serialize};

/// Cumulative distribution of the aggregate loss sampled at `nodes`
///
/// The deterministic methods return a regular grid `h * i`. Monte Carlo
/// returns the sorted unique simulated totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDistribution {
    pub cdf: Vec<f64>,
    pub nodes: Vec<f64>,
}

impl AggregateDistribution {
    pub fn new(cdf: Vec<f64>, nodes: Vec<f64>) -> Self {
        Self { cdf, nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Probability mass at each node
    pub fn pmf(&self) -> Vec<f64> {
        let mut previous = 0.0;
        self.cdf
            .iter()
            .map(|&c| {
                let p = c - previous;
                previous = c;
                p
            })
            .collect()
    }

    /// Last cumulative probability
    pub fn total_mass(&self) -> f64 {
        self.cdf.last().copied().unwrap_or(0.0)
    }

    /// `P(S <= x)` as a right-continuous step function of the nodes
    pub fn cdf_at(&self, x: f64) -> f64 {
        let idx = self.nodes.partition_point(|&node| node <= x);
        if idx == 0 {
            0.0
        } else {
            self.cdf[idx - 1]
        }
    }

    /// Smallest node whose cumulative probability reaches `q`
    ///
    /// Falls back to the last node when the distribution never reaches `q`.
    pub fn ppf(&self, q: f64) -> f64 {
        let idx = self.cdf.partition_point(|&c| c < q);
        match self.nodes.get(idx) {
            Some(&node) => node,
            None => self.nodes.last().copied().unwrap_or(f64::NAN),
        }
    }

    pub fn mean(&self) -> f64 {
        self.moment_about(0.0, 1)
    }

    pub fn variance(&self) -> f64 {
        self.moment_about(self.mean(), 2)
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn skewness(&self) -> f64 {
        self.moment_about(self.mean(), 3) / self.std().powi(3)
    }

    /// Standard deviation over mean
    pub fn coeff_variation(&self) -> f64 {
        self.std() / self.mean()
    }

    fn moment_about(&self, center: f64, order: i32) -> f64 {
        self.nodes
            .iter()
            .zip(self.pmf())
            .map(|(x, p)| (x - center).powi(order) * p)
            .sum()
    }
}
