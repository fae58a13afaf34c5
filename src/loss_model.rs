//! Loss model: frequency, severity and policy layer under one configuration
//!
//! The frequency is the claim count of the layer, i.e. the number of losses
//! exceeding the deductible. [`crate::loader::LossModelRequest`] takes care of
//! adjusting a ground-up frequency before building a model.

use serde::{Deserialize, Serialize};

use crate::aggregation::{
    fft, mc_simulation, panjer_recursion, AggregateDistribution, AggregationMethod, FftParams,
    RecursionParams, SimulationParams,
};
use crate::config::LossModelConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::discretization::{DiscretizationParams, DiscretizedSeverity};
use crate::distributions::{Frequency, Severity};
use crate::error::{LossModelError, Result};

/// Excess of loss layer: losses above `deductible`, capped at `cover`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyLayer {
    pub deductible: f64,
    /// `f64::INFINITY` for an unlimited layer
    pub cover: f64,
}

impl PolicyLayer {
    pub fn new(deductible: f64, cover: f64) -> Result<Self> {
        if !(deductible.is_finite() && deductible >= 0.0) {
            return Err(LossModelError::InvalidLayer(format!(
                "deductible must be finite and non-negative, got {}",
                deductible
            )));
        }
        if cover.is_nan() || cover <= 0.0 {
            return Err(LossModelError::InvalidLayer(format!(
                "cover must be positive, got {}",
                cover
            )));
        }
        Ok(Self { deductible, cover })
    }

    /// Ground-up layer without deductible or limit
    pub fn unlimited() -> Self {
        Self {
            deductible: 0.0,
            cover: f64::INFINITY,
        }
    }

    /// Deductible plus cover
    pub fn exit_point(&self) -> f64 {
        self.deductible + self.cover
    }

    pub fn is_unlimited(&self) -> bool {
        self.cover.is_infinite()
    }
}

impl Default for PolicyLayer {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Collective risk model for one policy layer
#[derive(Debug, Clone)]
pub struct LossModel<F, S> {
    frequency: F,
    severity: S,
    layer: PolicyLayer,
    config: LossModelConfig,
}

impl<F, S> LossModel<F, S>
where
    F: Frequency,
    S: Severity + Sync,
{
    pub fn new(frequency: F, severity: S, layer: PolicyLayer, config: LossModelConfig) -> Self {
        Self {
            frequency,
            severity,
            layer,
            config,
        }
    }

    pub fn frequency(&self) -> &F {
        &self.frequency
    }

    pub fn severity(&self) -> &S {
        &self.severity
    }

    pub fn layer(&self) -> &PolicyLayer {
        &self.layer
    }

    pub fn config(&self) -> &LossModelConfig {
        &self.config
    }

    /// Grid of the severity discretization
    ///
    /// A limited layer is split into `n` steps of `cover / n`; a supplied
    /// step is rounded so that the exit point falls on the grid. An unlimited
    /// layer uses the supplied step, or spreads the nodes up to the
    /// `1 - prob_tolerance` quantile of the loss in excess of the deductible.
    pub fn discretization_params(&self) -> Result<DiscretizationParams> {
        let PolicyLayer { deductible, cover } = self.layer;
        let mut n = self.config.n_sev_discr_nodes;
        if n == 0 {
            return Err(LossModelError::EmptyGrid("n_sev_discr_nodes"));
        }

        let step = match self.config.sev_discr_step {
            Some(h) if !(h.is_finite() && h > 0.0) => return Err(LossModelError::InvalidStep(h)),
            Some(h) if cover.is_finite() => {
                n = ((cover / h).round() as usize).max(1);
                cover / n as f64
            }
            Some(h) => h,
            None if cover.is_finite() => cover / n as f64,
            None => {
                let tolerance = self.config.calculation.prob_tolerance;
                let level = self.severity.cdf(deductible)
                    + (1.0 - tolerance) * self.severity.survival(deductible);
                (self.severity.ppf(level) - deductible) / n as f64
            }
        };
        if !(step.is_finite() && step > 0.0) {
            return Err(LossModelError::InvalidStep(step));
        }

        Ok(DiscretizationParams::new(
            deductible,
            self.layer.exit_point(),
            step,
            n,
        ))
    }

    pub fn discretize_severity(&self) -> Result<DiscretizedSeverity> {
        let params = self.discretization_params()?;
        Ok(self.config.sev_discr_method.discretize(&self.severity, &params))
    }

    /// Aggregate loss distribution with the configured method
    pub fn aggregate(&self, sink: &dyn DiagnosticsSink) -> Result<AggregateDistribution> {
        log::info!(
            "Aggregating layer {} xs {} with {}",
            self.layer.cover,
            self.layer.deductible,
            self.config.aggr_method.name()
        );
        let calculation = &self.config.calculation;

        match self.config.aggr_method {
            AggregationMethod::Fft {
                tilt,
                tilt_value,
                normalize,
            } => {
                let params = self.discretization_params()?;
                let severity = self.config.sev_discr_method.discretize(&self.severity, &params);
                let fft_params = FftParams {
                    n_aggr_dist_nodes: self.config.n_aggr_dist_nodes,
                    discr_step: params.discr_step,
                    tilt,
                    tilt_value,
                    normalize,
                };
                fft(&self.frequency, &severity.fj, &fft_params, calculation, sink)
            }
            AggregationMethod::Recursion { normalize } => {
                let params = self.discretization_params()?;
                let severity = self.config.sev_discr_method.discretize(&self.severity, &params);
                let recursion_params = RecursionParams {
                    n_aggr_dist_nodes: self.config.n_aggr_dist_nodes,
                    discr_step: params.discr_step,
                    normalize,
                };
                panjer_recursion(&self.frequency, &severity.fj, &recursion_params, calculation, sink)
            }
            AggregationMethod::MonteCarlo {
                n_sim,
                random_state,
            } => {
                let simulation_params = SimulationParams {
                    n_sim,
                    random_state,
                    deductible: self.layer.deductible,
                    cover: self.layer.cover,
                };
                mc_simulation(&self.frequency, &self.severity, &simulation_params)
            }
        }
    }

    /// Analytic expected aggregate loss of the layer
    ///
    /// `E[N] (L(u - loc) - L(d - loc)) / den(d, loc)`.
    pub fn expected_loss(&self) -> f64 {
        let loc = self.severity.loc();
        let PolicyLayer { deductible, .. } = self.layer;
        let layer_mean = (self.severity.lev(self.layer.exit_point() - loc)
            - self.severity.lev(deductible - loc))
            / self.severity.den(deductible, loc);
        self.frequency.mean() * layer_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalculationConfig;
    use crate::diagnostics::RecordingSink;
    use crate::discretization::DiscretizationMethod;
    use crate::distributions::{Exponential, Poisson};
    use approx::assert_relative_eq;

    fn model(layer: PolicyLayer, config: LossModelConfig) -> LossModel<Poisson, Exponential> {
        LossModel::new(
            Poisson::new(2.0).unwrap(),
            Exponential::new(1.0).unwrap(),
            layer,
            config,
        )
    }

    fn small_config(aggr_method: AggregationMethod) -> LossModelConfig {
        LossModelConfig {
            aggr_method,
            n_aggr_dist_nodes: 4096,
            n_sev_discr_nodes: 500,
            ..LossModelConfig::default()
        }
    }

    #[test]
    fn test_layer_validation() {
        assert!(PolicyLayer::new(0.0, f64::INFINITY).unwrap().is_unlimited());
        assert_eq!(PolicyLayer::new(1.0, 4.0).unwrap().exit_point(), 5.0);
        assert!(matches!(
            PolicyLayer::new(-1.0, 4.0),
            Err(LossModelError::InvalidLayer(_))
        ));
        assert!(matches!(
            PolicyLayer::new(1.0, 0.0),
            Err(LossModelError::InvalidLayer(_))
        ));
    }

    #[test]
    fn test_limited_layer_grid() {
        let layer = PolicyLayer::new(1.0, 10.0).unwrap();
        let params = model(layer, small_config(AggregationMethod::default()))
            .discretization_params()
            .unwrap();

        assert_eq!(params.n_discr_nodes, 500);
        assert_relative_eq!(params.discr_step, 0.02);
        assert_eq!(params.exit_point, 11.0);
    }

    #[test]
    fn test_supplied_step_is_aligned_to_cover() {
        let layer = PolicyLayer::new(0.0, 10.0).unwrap();
        let config = LossModelConfig {
            sev_discr_step: Some(0.3),
            ..small_config(AggregationMethod::default())
        };
        let params = model(layer, config).discretization_params().unwrap();

        assert_eq!(params.n_discr_nodes, 33);
        assert_relative_eq!(params.discr_step, 10.0 / 33.0);
    }

    #[test]
    fn test_unlimited_layer_grid() {
        let config = LossModelConfig {
            sev_discr_step: Some(0.05),
            ..small_config(AggregationMethod::default())
        };
        let params = model(PolicyLayer::unlimited(), config)
            .discretization_params()
            .unwrap();
        assert_eq!(params.discr_step, 0.05);
        assert_eq!(params.n_discr_nodes, 500);
        assert!(!params.is_truncated());

        // 1 - 1e-6 quantile of a unit exponential, memoryless above d
        let layer = PolicyLayer::new(2.0, f64::INFINITY).unwrap();
        let params = model(layer, small_config(AggregationMethod::default()))
            .discretization_params()
            .unwrap();
        assert_relative_eq!(params.discr_step, 1e6f64.ln() / 500.0, max_relative = 1e-6);
    }

    #[test]
    fn test_invalid_step() {
        let config = LossModelConfig {
            sev_discr_step: Some(-0.5),
            ..small_config(AggregationMethod::default())
        };
        let err = model(PolicyLayer::unlimited(), config)
            .discretization_params()
            .unwrap_err();
        assert!(matches!(err, LossModelError::InvalidStep(_)));
    }

    #[test]
    fn test_discretize_severity() {
        let layer = PolicyLayer::new(0.5, 3.0).unwrap();
        let config = LossModelConfig {
            sev_discr_method: DiscretizationMethod::Lower,
            ..small_config(AggregationMethod::default())
        };
        let severity = model(layer, config).discretize_severity().unwrap();

        assert_eq!(severity.len(), 501);
        assert_eq!(severity.fj[0], 0.0);
        assert_relative_eq!(severity.total_mass(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_expected_loss() {
        let layer = PolicyLayer::new(0.0, 5.0).unwrap();
        let loss_model = model(layer, small_config(AggregationMethod::default()));
        assert_relative_eq!(
            loss_model.expected_loss(),
            2.0 * (1.0 - (-5.0f64).exp()),
            max_relative = 1e-12
        );

        let unlimited = model(PolicyLayer::unlimited(), small_config(AggregationMethod::default()));
        assert_relative_eq!(unlimited.expected_loss(), 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_deterministic_methods_agree_with_expected_loss() {
        let layer = PolicyLayer::new(0.0, 5.0).unwrap();
        let methods = [
            AggregationMethod::Recursion { normalize: false },
            AggregationMethod::Fft {
                tilt: true,
                tilt_value: None,
                normalize: false,
            },
            AggregationMethod::Fft {
                tilt: false,
                tilt_value: None,
                normalize: false,
            },
        ];

        for method in methods {
            let loss_model = model(layer, small_config(method));
            let sink = RecordingSink::new();
            let dist = loss_model.aggregate(&sink).unwrap();

            assert!(sink.is_empty(), "{:?}: {:?}", method, sink.events());
            assert_relative_eq!(dist.mean(), loss_model.expected_loss(), max_relative = 1e-5);
        }
    }

    #[test]
    fn test_monte_carlo_through_model() {
        let layer = PolicyLayer::new(0.0, 5.0).unwrap();
        let method = AggregationMethod::MonteCarlo {
            n_sim: 20_000,
            random_state: 1,
        };
        let loss_model = model(layer, small_config(method));
        let dist = loss_model.aggregate(&RecordingSink::new()).unwrap();

        assert!((dist.mean() - loss_model.expected_loss()).abs() < 0.1);
        assert_eq!(dist.total_mass(), 1.0);
    }

    #[test]
    fn test_shortfall_reaches_sink() {
        let config = LossModelConfig {
            aggr_method: AggregationMethod::Recursion { normalize: false },
            n_aggr_dist_nodes: 8,
            n_sev_discr_nodes: 4,
            sev_discr_step: Some(0.5),
            calculation: CalculationConfig::with_tolerance(1e-9),
            ..LossModelConfig::default()
        };
        let sink = RecordingSink::new();
        model(PolicyLayer::unlimited(), config).aggregate(&sink).unwrap();
        assert_eq!(sink.events().len(), 1);
    }
}
