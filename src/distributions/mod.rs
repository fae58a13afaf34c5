//! Frequency and severity models
//!
//! The aggregation engine only talks to the [`Severity`] and [`Frequency`]
//! traits. Concrete families live in [`severity`] and [`frequency`]; boxed
//! trait objects implement both traits as well so models built at runtime
//! (see [`crate::loader`]) flow through the same code paths.

mod frequency;
mod severity;

pub use frequency::{Binomial, Logarithmic, NegativeBinomial, Poisson, Thinning, ZeroModified};
pub use severity::{Exponential, Gamma, Located, LogNormal, Lomax, Weibull};

use num_complex::Complex64;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Claim size model
///
/// `cdf`, `survival` and `ppf` describe the located variable `X`.
/// `lev` and `den` describe the unshifted variable `Y = X - loc`, which is
/// how the local moments discretization consumes them.
pub trait Severity {
    /// Cumulative distribution function of `X`
    fn cdf(&self, x: f64) -> f64;

    /// Quantile function of `X`
    fn ppf(&self, q: f64) -> f64;

    /// Limited expected value `E[min(Y, v)]`
    fn lev(&self, v: f64) -> f64;

    /// Location offset
    fn loc(&self) -> f64 {
        0.0
    }

    fn survival(&self, x: f64) -> f64 {
        1.0 - self.cdf(x)
    }

    /// Survival of `Y` at `low - loc`, the normalizer of a layer starting at `low`
    fn den(&self, low: f64, loc: f64) -> f64 {
        self.survival(low - loc + self.loc())
    }
}

/// Recursion coefficients of a frequency in the (a, b, 0) or (a, b, 1) class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanjerParams {
    pub a: f64,
    pub b: f64,
}

/// Everything the Panjer recursion needs from a frequency model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanjerCoefficients {
    pub a: f64,
    pub b: f64,
    /// Probability of zero claims
    pub p0: f64,
    /// Probability of a zero aggregate loss
    pub g0: f64,
}

/// Claim count model
pub trait Frequency {
    /// Probability mass at `k`
    fn pmf(&self, k: u64) -> f64;

    /// Probability generating function at a complex transform value
    fn pgf(&self, z: Complex64) -> Complex64;

    /// The `(a, b)` pair of the Panjer class
    fn ab(&self) -> PanjerParams;

    fn mean(&self) -> f64;

    /// Draw a single claim count
    fn sample(&self, rng: &mut dyn RngCore) -> u64;

    /// Panjer recursion inputs `(a, b, p0, g0)` for a discretized severity
    ///
    /// `g0` is the probability of a zero aggregate loss, `P(f0)` where `f0`
    /// is the mass of the first severity node.
    fn panjer_coefficients(&self, fj: &[f64]) -> PanjerCoefficients {
        let PanjerParams { a, b } = self.ab();
        let f0 = fj.first().copied().unwrap_or(0.0);
        PanjerCoefficients {
            a,
            b,
            p0: self.pmf(0),
            g0: self.pgf(Complex64::new(f0, 0.0)).re,
        }
    }

    /// Draw `n` claim counts from a generator seeded with `seed`
    fn rvs(&self, n: usize, seed: u64) -> Vec<u64> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        (0..n).map(|_| self.sample(&mut rng)).collect()
    }
}

impl<T: Severity + ?Sized> Severity for Box<T> {
    fn cdf(&self, x: f64) -> f64 {
        (**self).cdf(x)
    }

    fn ppf(&self, q: f64) -> f64 {
        (**self).ppf(q)
    }

    fn lev(&self, v: f64) -> f64 {
        (**self).lev(v)
    }

    fn loc(&self) -> f64 {
        (**self).loc()
    }

    fn survival(&self, x: f64) -> f64 {
        (**self).survival(x)
    }

    fn den(&self, low: f64, loc: f64) -> f64 {
        (**self).den(low, loc)
    }
}

impl<T: Frequency + ?Sized> Frequency for Box<T> {
    fn pmf(&self, k: u64) -> f64 {
        (**self).pmf(k)
    }

    fn pgf(&self, z: Complex64) -> Complex64 {
        (**self).pgf(z)
    }

    fn ab(&self) -> PanjerParams {
        (**self).ab()
    }

    fn mean(&self) -> f64 {
        (**self).mean()
    }

    fn sample(&self, rng: &mut dyn RngCore) -> u64 {
        (**self).sample(rng)
    }

    fn panjer_coefficients(&self, fj: &[f64]) -> PanjerCoefficients {
        (**self).panjer_coefficients(fj)
    }

    fn rvs(&self, n: usize, seed: u64) -> Vec<u64> {
        (**self).rvs(n, seed)
    }
}

/// Frequency trait object usable across threads
pub type DynFrequency = Box<dyn Frequency + Send + Sync>;

/// Severity trait object usable across threads
pub type DynSeverity = Box<dyn Severity + Send + Sync>;
