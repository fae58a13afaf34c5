//! Aggregate distribution by fast Fourier transform
//!
//! The aggregate pmf on `m` nodes is `IDFT(P(DFT(f)))`, where `P` is the
//! probability generating function of the claim count. Mass beyond the grid
//! wraps around to its start; exponential tilting damps that aliasing.

use num_complex::Complex64;
use rustfft::FftPlanner;

use super::{check_masses, check_shortfall, cumulative, normalize, AggregateDistribution};
use crate::config::CalculationConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::distributions::Frequency;
use crate::error::{LossModelError, Result};

/// Numerator of the default tilting parameter `20 / m`
const DEFAULT_TILT_NUMERATOR: f64 = 20.0;

/// Grid and numerical options of the FFT method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FftParams {
    pub n_aggr_dist_nodes: usize,
    pub discr_step: f64,
    pub tilt: bool,
    pub tilt_value: Option<f64>,
    pub normalize: bool,
}

impl FftParams {
    /// Tilting parameter applied to node `i` as `exp(-theta i)`, zero without tilting
    pub fn theta(&self) -> f64 {
        if !self.tilt {
            return 0.0;
        }
        self.tilt_value
            .unwrap_or(DEFAULT_TILT_NUMERATOR / self.n_aggr_dist_nodes as f64)
    }
}

/// Aggregate loss distribution of a discretized severity `fj` by FFT
pub fn fft<F: Frequency + ?Sized>(
    frequency: &F,
    fj: &[f64],
    params: &FftParams,
    config: &CalculationConfig,
    sink: &dyn DiagnosticsSink,
) -> Result<AggregateDistribution> {
    let m = params.n_aggr_dist_nodes;
    if m == 0 {
        return Err(LossModelError::EmptyGrid("n_aggr_dist_nodes"));
    }
    if fj.len() > m {
        return Err(LossModelError::GridTooSmall {
            severity_nodes: fj.len(),
            aggregate_nodes: m,
        });
    }

    let theta = params.theta();
    log::debug!("FFT aggregation: m={}, h={}, theta={}", m, params.discr_step, theta);

    let mut buffer: Vec<Complex64> = (0..m)
        .map(|i| {
            let p = fj.get(i).copied().unwrap_or(0.0);
            Complex64::new(p * (-theta * i as f64).exp(), 0.0)
        })
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(m).process(&mut buffer);
    buffer.iter_mut().for_each(|z| *z = frequency.pgf(*z));
    planner.plan_fft_inverse(m).process(&mut buffer);

    let scale = 1.0 / m as f64;
    let mut pmf: Vec<f64> = buffer
        .iter()
        .enumerate()
        .map(|(i, z)| z.re * scale * (theta * i as f64).exp())
        .collect();

    if params.normalize {
        normalize(&mut pmf);
    }

    check_masses("fft", &pmf, config, sink);
    let cdf = cumulative(&pmf);
    check_shortfall("fft", &cdf, config, sink);

    let nodes = (0..m).map(|i| params.discr_step * i as f64).collect();
    Ok(AggregateDistribution::new(cdf, nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{panjer_recursion, RecursionParams};
    use crate::diagnostics::{Diagnostic, RecordingSink};
    use crate::discretization::{DiscretizationMethod, DiscretizationParams};
    use crate::distributions::{Exponential, Poisson};
    use approx::assert_relative_eq;

    fn exponential_fj(h: f64, n: usize) -> Vec<f64> {
        let severity = Exponential::new(1.0).unwrap();
        let params = DiscretizationParams::new(0.0, f64::INFINITY, h, n);
        DiscretizationMethod::LocalMoments
            .discretize(&severity, &params)
            .fj
    }

    fn params(m: usize, tilt: bool) -> FftParams {
        FftParams {
            n_aggr_dist_nodes: m,
            discr_step: 0.5,
            tilt,
            tilt_value: None,
            normalize: false,
        }
    }

    #[test]
    fn test_default_theta() {
        assert_eq!(params(1024, true).theta(), 20.0 / 1024.0);
        assert_eq!(params(1024, false).theta(), 0.0);

        let explicit = FftParams {
            tilt_value: Some(0.1),
            ..params(1024, true)
        };
        assert_eq!(explicit.theta(), 0.1);
    }

    #[test]
    fn test_fft_matches_panjer() {
        let frequency = Poisson::new(2.0).unwrap();
        let fj = exponential_fj(0.5, 1024);
        let config = CalculationConfig::default();
        let sink = RecordingSink::new();

        let by_fft = fft(&frequency, &fj, &params(1024, true), &config, &sink).unwrap();
        let recursion = RecursionParams {
            n_aggr_dist_nodes: 1024,
            discr_step: 0.5,
            normalize: false,
        };
        let by_recursion = panjer_recursion(&frequency, &fj, &recursion, &config, &sink).unwrap();

        assert_eq!(by_fft.nodes, by_recursion.nodes);
        for (a, b) in by_fft.cdf.iter().zip(&by_recursion.cdf) {
            assert!((a - b).abs() < 1e-4, "fft {} vs recursion {}", a, b);
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tilting_on_and_off_reach_one() {
        let frequency = Poisson::new(2.0).unwrap();
        let fj = exponential_fj(0.5, 1024);
        let config = CalculationConfig::default();

        for tilt in [true, false] {
            let sink = RecordingSink::new();
            let dist = fft(&frequency, &fj, &params(1024, tilt), &config, &sink).unwrap();

            assert!(sink.is_empty(), "tilt={}: {:?}", tilt, sink.events());
            assert!(dist.total_mass() >= 1.0 - config.prob_tolerance);
            assert!(dist.cdf.iter().all(|&c| (-1e-9..=1.0).contains(&c)));
            for pair in dist.cdf.windows(2) {
                assert!(pair[1] >= pair[0] - 1e-6);
            }
        }
    }

    #[test]
    fn test_excessive_tilting_is_reported() {
        // exp(theta i) overflows long before the end of the grid
        let frequency = Poisson::new(2.0).unwrap();
        let fj = exponential_fj(0.5, 1024);
        let params = FftParams {
            tilt_value: Some(1.0),
            ..params(1024, true)
        };
        let sink = RecordingSink::new();

        fft(&frequency, &fj, &params, &CalculationConfig::default(), &sink).unwrap();

        let events = sink.events();
        assert!(
            events.iter().any(|event| matches!(
                event,
                Diagnostic::InvalidMass { method: "fft", .. }
            )),
            "events: {:?}",
            events
        );
    }

    #[test]
    fn test_aggregate_mean() {
        // E[S] = E[N] E[X] = 2 for Poisson(2) and a unit exponential
        let frequency = Poisson::new(2.0).unwrap();
        let fj = exponential_fj(0.5, 1024);
        let sink = RecordingSink::new();
        let dist = fft(
            &frequency,
            &fj,
            &params(1024, true),
            &CalculationConfig::default(),
            &sink,
        )
        .unwrap();

        assert_relative_eq!(dist.mean(), 2.0, max_relative = 1e-4);
    }

    #[test]
    fn test_short_grid_warns_once() {
        // 16 nodes of width 0.5 cover far less than the aggregate support
        let frequency = Poisson::new(2.0).unwrap();
        let fj = exponential_fj(0.5, 16);
        let sink = RecordingSink::new();

        let dist = fft(
            &frequency,
            &fj,
            &params(16, false),
            &CalculationConfig::default(),
            &sink,
        )
        .unwrap();
        assert_eq!(dist.len(), 16);
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_normalize() {
        let frequency = Poisson::new(2.0).unwrap();
        let fj = exponential_fj(0.5, 32);
        let params = FftParams {
            normalize: true,
            ..params(32, true)
        };

        let dist = fft(
            &frequency,
            &fj,
            &params,
            &CalculationConfig::default(),
            &RecordingSink::new(),
        )
        .unwrap();
        assert_relative_eq!(dist.pmf().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_errors() {
        let frequency = Poisson::new(2.0).unwrap();
        let config = CalculationConfig::default();
        let sink = RecordingSink::new();

        let err = fft(&frequency, &[0.5, 0.5, 0.0], &params(2, true), &config, &sink).unwrap_err();
        assert!(matches!(
            err,
            LossModelError::GridTooSmall {
                severity_nodes: 3,
                aggregate_nodes: 2
            }
        ));

        let err = fft(&frequency, &[], &params(0, true), &config, &sink).unwrap_err();
        assert!(matches!(err, LossModelError::EmptyGrid(_)));
    }
}
