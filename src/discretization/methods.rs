//! The discretization schemes
//!
//! The three bucket methods differ only in where the bucket boundaries sit
//! relative to the nodes:
//!
//! | method         | boundaries          | terminal boundary |
//! |----------------|---------------------|-------------------|
//! | mass dispersal | `d + (j + 1/2) h`   | `u - h/2`         |
//! | lower          | `d + j h`           | `u - h`           |
//! | upper          | `d + j h`, `j <= n` | `u`               |
//!
//! Local moments instead matches the first moment of each bucket through the
//! limited expected value.

use super::{DiscretizationParams, DiscretizedSeverity};
use crate::distributions::Severity;

/// Regular nodes `loc + j h`, plus one terminal node when truncated
fn node_grid(loc: f64, params: &DiscretizationParams) -> Vec<f64> {
    let h = params.discr_step;
    let n = params.n_discr_nodes;
    let extra = usize::from(params.is_truncated());
    (0..n + extra).map(|j| loc + j as f64 * h).collect()
}

/// Masses between consecutive boundaries, conditioned on exceeding the deductible
fn bucket_masses<S: Severity + ?Sized>(severity: &S, boundaries: &[f64], survival: f64) -> Vec<f64> {
    let cdf: Vec<f64> = boundaries.iter().map(|&x| severity.cdf(x)).collect();
    cdf.windows(2).map(|w| (w[1] - w[0]) / survival).collect()
}

/// Mass dispersal: each node collects the probability within half a step of it
pub fn mass_dispersal<S: Severity + ?Sized>(
    severity: &S,
    params: &DiscretizationParams,
) -> DiscretizedSeverity {
    let d = params.deductible;
    let h = params.discr_step;
    let survival = severity.survival(d);

    let f0 = (severity.cdf(d + h / 2.0) - severity.cdf(d)) / survival;
    let boundaries: Vec<f64> = (0..params.n_discr_nodes)
        .map(|j| d + (j as f64 + 0.5) * h)
        .collect();

    let mut fj = Vec::with_capacity(params.n_discr_nodes + 1);
    fj.push(f0);
    fj.extend(bucket_masses(severity, &boundaries, survival));

    if params.is_truncated() {
        fj.push(severity.survival(params.exit_point - h / 2.0) / survival);
    }

    DiscretizedSeverity {
        nodes: node_grid(severity.loc(), params),
        fj,
    }
}

/// Lower discretization: each node collects the bucket to its right
///
/// The first bucket is `[d, d)`, so the first mass is always zero.
pub fn lower_discretization<S: Severity + ?Sized>(
    severity: &S,
    params: &DiscretizationParams,
) -> DiscretizedSeverity {
    let d = params.deductible;
    let h = params.discr_step;
    let survival = severity.survival(d);

    let f0 = (severity.cdf(d) - severity.cdf(d)) / survival;
    let boundaries: Vec<f64> = (0..params.n_discr_nodes)
        .map(|j| d + j as f64 * h)
        .collect();

    let mut fj = Vec::with_capacity(params.n_discr_nodes + 1);
    fj.push(f0);
    fj.extend(bucket_masses(severity, &boundaries, survival));

    if params.is_truncated() {
        fj.push(severity.survival(params.exit_point - h) / survival);
    }

    DiscretizedSeverity {
        nodes: node_grid(severity.loc(), params),
        fj,
    }
}

/// Upper discretization: each node collects the bucket to its left
pub fn upper_discretization<S: Severity + ?Sized>(
    severity: &S,
    params: &DiscretizationParams,
) -> DiscretizedSeverity {
    let d = params.deductible;
    let h = params.discr_step;
    let survival = severity.survival(d);

    let boundaries: Vec<f64> = (0..=params.n_discr_nodes)
        .map(|j| d + j as f64 * h)
        .collect();

    let mut fj = bucket_masses(severity, &boundaries, survival);

    if params.is_truncated() {
        fj.push(severity.survival(params.exit_point) / survival);
    }

    DiscretizedSeverity {
        nodes: node_grid(severity.loc(), params),
        fj,
    }
}

/// Mass of the terminal node under local moments
///
/// `None` without upper truncation. Otherwise the node at the exit point
/// receives `(L(u - loc) - L(u - loc - h)) / (h den(d, loc))`.
pub fn upper_discr_point_prob_adjuster<S: Severity + ?Sized>(
    severity: &S,
    params: &DiscretizationParams,
) -> Option<f64> {
    if !params.is_truncated() {
        return None;
    }
    let loc = severity.loc();
    let h = params.discr_step;
    let top = params.exit_point - loc;
    Some(
        (severity.lev(top) - severity.lev(top - h))
            / (h * severity.den(params.deductible, loc)),
    )
}

/// Local moments: masses preserve the mean of the severity within each bucket
pub fn local_moments<S: Severity + ?Sized>(
    severity: &S,
    params: &DiscretizationParams,
) -> DiscretizedSeverity {
    let n = params.n_discr_nodes;
    let h = params.discr_step;
    let loc = severity.loc();
    let start = params.deductible - loc;
    let den = h * severity.den(params.deductible, loc);

    // L(d - loc + j h) for j = 0..=n
    let lev: Vec<f64> = (0..=n).map(|j| severity.lev(start + j as f64 * h)).collect();

    let mut fj = Vec::with_capacity(n + 1);
    fj.push(1.0 - (severity.lev(start + h) - lev[0]) / den);
    fj.extend((1..n).map(|j| (2.0 * lev[j] - lev[j - 1] - lev[j + 1]) / den));
    fj.extend(upper_discr_point_prob_adjuster(severity, params));

    DiscretizedSeverity {
        nodes: node_grid(loc, params),
        fj,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Exponential, Gamma, Located, LogNormal, Lomax};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const TOLERANCE: f64 = 1e-6;

    type Method = fn(&Exponential, &DiscretizationParams) -> DiscretizedSeverity;

    fn methods() -> [(&'static str, Method); 4] {
        [
            ("mass_dispersal", mass_dispersal::<Exponential>),
            ("lower", lower_discretization::<Exponential>),
            ("upper", upper_discretization::<Exponential>),
            ("local_moments", local_moments::<Exponential>),
        ]
    }

    fn assert_grid(discrete: &DiscretizedSeverity, params: &DiscretizationParams) {
        assert_eq!(discrete.nodes.len(), discrete.fj.len());
        for pair in discrete.nodes.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], params.discr_step, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_mass_dispersal_tail_node() {
        let severity = Exponential::new(2.0).unwrap();

        let open = DiscretizationParams::new(1.0, f64::INFINITY, 0.5, 40);
        let discrete = mass_dispersal(&severity, &open);
        assert_eq!(discrete.nodes.len(), 40);
        assert_eq!(discrete.fj.len(), 40);
        assert_eq!(discrete.nodes[39], 19.5);

        let truncated = DiscretizationParams::new(1.0, 11.0, 0.5, 20);
        let discrete = mass_dispersal(&severity, &truncated);
        assert_eq!(discrete.nodes.len(), 21);
        assert_eq!(discrete.fj.len(), 21);
        assert_eq!(discrete.nodes[20], 10.0);

        // complementary tail beyond u - h/2, conditioned on exceeding d
        let tail = severity.survival(10.75) / severity.survival(1.0);
        assert_relative_eq!(discrete.fj[20], tail, max_relative = 1e-12);
        assert_relative_eq!(discrete.total_mass(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lower_first_mass_is_zero() {
        let params = DiscretizationParams::new(0.7, 5.7, 0.25, 20);
        assert_eq!(lower_discretization(&Exponential::new(1.0).unwrap(), &params).fj[0], 0.0);
        assert_eq!(lower_discretization(&Gamma::new(3.0, 0.5).unwrap(), &params).fj[0], 0.0);
        assert_eq!(lower_discretization(&LogNormal::new(0.0, 1.0).unwrap(), &params).fj[0], 0.0);
        assert_eq!(lower_discretization(&Lomax::new(2.0, 3.0).unwrap(), &params).fj[0], 0.0);
    }

    #[test]
    fn test_upper_first_mass() {
        let severity = Exponential::new(1.0).unwrap();
        let params = DiscretizationParams::new(0.0, f64::INFINITY, 0.5, 10);
        let discrete = upper_discretization(&severity, &params);

        assert_eq!(discrete.fj.len(), 10);
        assert_relative_eq!(discrete.fj[0], severity.cdf(0.5), max_relative = 1e-12);
    }

    #[test]
    fn test_adjuster_without_truncation() {
        let severity = Exponential::new(1.0).unwrap();
        let params = DiscretizationParams::new(0.0, f64::INFINITY, 0.5, 10);
        assert_eq!(upper_discr_point_prob_adjuster(&severity, &params), None);
    }

    #[test]
    fn test_adjuster_with_truncation() {
        // memoryless: the excess over d is again exponential
        let severity = Exponential::new(1.0).unwrap();
        let params = DiscretizationParams::new(1.0, 4.0, 0.5, 6);
        let expected = ((-2.5f64).exp() - (-3.0f64).exp()) / 0.5;

        let mass = upper_discr_point_prob_adjuster(&severity, &params).unwrap();
        assert_relative_eq!(mass, expected, max_relative = 1e-10);
        assert_eq!(*local_moments(&severity, &params).fj.last().unwrap(), mass);
    }

    #[test]
    fn test_local_moments_with_location() {
        let located = Located::new(Gamma::new(2.0, 1.5).unwrap(), 2.0);
        let params = DiscretizationParams::new(3.0, 9.0, 0.1, 60);
        let discrete = local_moments(&located, &params);

        assert_eq!(discrete.nodes[0], 2.0);
        assert_eq!(discrete.nodes.len(), 61);
        assert_relative_eq!(discrete.total_mass(), 1.0, epsilon = 1e-9);
        assert!(discrete.fj.iter().all(|&p| p >= -1e-12));
    }

    #[test]
    fn test_grids_are_evenly_spaced() {
        let severity = Exponential::new(1.0).unwrap();
        for params in [
            DiscretizationParams::new(0.0, f64::INFINITY, 0.3, 50),
            DiscretizationParams::new(0.4, 6.4, 0.2, 30),
        ] {
            for (_, method) in methods() {
                assert_grid(&method(&severity, &params), &params);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_truncated_masses_sum_to_one(
            deductible in 0.0f64..5.0,
            discr_step in 0.01f64..1.0,
            n_discr_nodes in 1usize..400,
            scale in 1.0f64..5.0,
        ) {
            let severity = Exponential::new(scale).unwrap();
            let exit_point = deductible + n_discr_nodes as f64 * discr_step;
            let params = DiscretizationParams::new(deductible, exit_point, discr_step, n_discr_nodes);

            for (name, method) in methods() {
                let discrete = method(&severity, &params);
                prop_assert_eq!(discrete.fj.len(), n_discr_nodes + 1);
                prop_assert!(
                    (discrete.total_mass() - 1.0).abs() < TOLERANCE,
                    "{}: total mass {}", name, discrete.total_mass()
                );
            }
        }

        #[test]
        fn prop_unbounded_masses_sum_to_one(
            deductible in 0.0f64..5.0,
            discr_step in 0.05f64..0.5,
            n_discr_nodes in 500usize..1500,
        ) {
            let severity = Exponential::new(1.0).unwrap();
            let params = DiscretizationParams::new(deductible, f64::INFINITY, discr_step, n_discr_nodes);

            for (name, method) in methods() {
                let discrete = method(&severity, &params);
                prop_assert_eq!(discrete.fj.len(), n_discr_nodes);
                prop_assert!(
                    (discrete.total_mass() - 1.0).abs() < TOLERANCE,
                    "{}: total mass {}", name, discrete.total_mass()
                );
            }
        }

        #[test]
        fn prop_gamma_truncated_masses_sum_to_one(
            deductible in 0.0f64..3.0,
            cover in 0.5f64..20.0,
            n_discr_nodes in 10usize..300,
        ) {
            let severity = Gamma::new(2.0, 1.0).unwrap();
            let discr_step = cover / n_discr_nodes as f64;
            let params = DiscretizationParams::new(
                deductible, deductible + cover, discr_step, n_discr_nodes,
            );

            for discrete in [
                mass_dispersal(&severity, &params),
                lower_discretization(&severity, &params),
                upper_discretization(&severity, &params),
                local_moments(&severity, &params),
            ] {
                prop_assert!((discrete.total_mass() - 1.0).abs() < TOLERANCE);
            }
        }
    }
}
