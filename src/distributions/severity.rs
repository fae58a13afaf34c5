//! Claim size distributions
//!
//! Every family carries a closed-form limited expected value, which the local
//! moments discretization depends on. `statrs` provides the cdfs and the
//! special functions; quantiles are closed form wherever one exists.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use statrs::function::gamma::{gamma, gamma_lr};

use super::Severity;
use crate::error::{LossModelError, Result};

fn ensure_positive(value: f64, distribution: &'static str, name: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LossModelError::invalid(
            distribution,
            format!("{} must be positive and finite, got {}", name, value),
        ))
    }
}

/// Solve `cdf(x) = q` on `(0, inf)` with Newton steps, falling back to
/// bisection whenever a step leaves the bracket or the density vanishes
fn solve_quantile(q: f64, guess: f64, cdf: impl Fn(f64) -> f64, pdf: impl Fn(f64) -> f64) -> f64 {
    let tolerance = 1e-14;
    let max_iterations = 200;

    let mut low = 0.0;
    let mut high = guess.max(1e-8);
    while cdf(high) < q {
        low = high;
        high *= 2.0;
    }

    let mut x = 0.5 * (low + high);
    for _ in 0..max_iterations {
        let error = cdf(x) - q;
        if error.abs() < tolerance || high - low <= tolerance * x {
            break;
        }
        if error < 0.0 {
            low = x;
        } else {
            high = x;
        }

        let density = pdf(x);
        let newton = x - error / density;
        x = if density > 0.0 && newton > low && newton < high {
            newton
        } else {
            0.5 * (low + high)
        };
    }
    x
}

/// Exponential severity with mean `scale`
#[derive(Debug, Clone)]
pub struct Exponential {
    scale: f64,
    dist: statrs::distribution::Exp,
}

impl Exponential {
    pub fn new(scale: f64) -> Result<Self> {
        ensure_positive(scale, "exponential", "scale")?;
        Ok(Self {
            scale,
            dist: statrs::distribution::Exp::new(1.0 / scale)
                .map_err(|e| LossModelError::invalid("exponential", e))?,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl Severity for Exponential {
    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            self.dist.cdf(x)
        }
    }

    fn ppf(&self, q: f64) -> f64 {
        -self.scale * (-q).ln_1p()
    }

    fn lev(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return v;
        }
        -self.scale * (-v / self.scale).exp_m1()
    }
}

/// Gamma severity with shape `shape` and scale `scale`
#[derive(Debug, Clone)]
pub struct Gamma {
    shape: f64,
    scale: f64,
    dist: statrs::distribution::Gamma,
}

impl Gamma {
    pub fn new(shape: f64, scale: f64) -> Result<Self> {
        ensure_positive(shape, "gamma", "shape")?;
        ensure_positive(scale, "gamma", "scale")?;
        Ok(Self {
            shape,
            scale,
            dist: statrs::distribution::Gamma::new(shape, 1.0 / scale)
                .map_err(|e| LossModelError::invalid("gamma", e))?,
        })
    }
}

impl Severity for Gamma {
    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            self.dist.cdf(x)
        }
    }

    fn ppf(&self, q: f64) -> f64 {
        if q <= 0.0 {
            0.0
        } else if q >= 1.0 {
            f64::INFINITY
        } else {
            solve_quantile(q, self.shape * self.scale, |x| self.cdf(x), |x| self.dist.pdf(x))
        }
    }

    fn lev(&self, v: f64) -> f64 {
        let mean = self.shape * self.scale;
        if v <= 0.0 {
            return v;
        }
        if v.is_infinite() {
            return mean;
        }
        let x = v / self.scale;
        mean * gamma_lr(self.shape + 1.0, x) + v * (1.0 - gamma_lr(self.shape, x))
    }
}

/// Lognormal severity: `ln X ~ N(mu, sigma^2)`
#[derive(Debug, Clone)]
pub struct LogNormal {
    mu: f64,
    sigma: f64,
    dist: statrs::distribution::LogNormal,
    standard: Normal,
}

impl LogNormal {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() {
            return Err(LossModelError::invalid("lognormal", "mu must be finite"));
        }
        ensure_positive(sigma, "lognormal", "sigma")?;
        Ok(Self {
            mu,
            sigma,
            dist: statrs::distribution::LogNormal::new(mu, sigma)
                .map_err(|e| LossModelError::invalid("lognormal", e))?,
            standard: Normal::standard(),
        })
    }
}

impl Severity for LogNormal {
    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            self.dist.cdf(x)
        }
    }

    fn ppf(&self, q: f64) -> f64 {
        if q <= 0.0 {
            0.0
        } else if q >= 1.0 {
            f64::INFINITY
        } else {
            (self.mu + self.sigma * self.standard.inverse_cdf(q)).exp()
        }
    }

    fn lev(&self, v: f64) -> f64 {
        let mean = (self.mu + 0.5 * self.sigma * self.sigma).exp();
        if v <= 0.0 {
            return v;
        }
        if v.is_infinite() {
            return mean;
        }
        let z = (v.ln() - self.mu) / self.sigma;
        mean * self.standard.cdf(z - self.sigma) + v * self.standard.sf(z)
    }
}

/// Weibull severity with shape `shape` and scale `scale`
#[derive(Debug, Clone)]
pub struct Weibull {
    shape: f64,
    scale: f64,
    dist: statrs::distribution::Weibull,
}

impl Weibull {
    pub fn new(shape: f64, scale: f64) -> Result<Self> {
        ensure_positive(shape, "weibull", "shape")?;
        ensure_positive(scale, "weibull", "scale")?;
        Ok(Self {
            shape,
            scale,
            dist: statrs::distribution::Weibull::new(shape, scale)
                .map_err(|e| LossModelError::invalid("weibull", e))?,
        })
    }
}

impl Severity for Weibull {
    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            self.dist.cdf(x)
        }
    }

    fn ppf(&self, q: f64) -> f64 {
        self.scale * (-(-q).ln_1p()).powf(1.0 / self.shape)
    }

    fn lev(&self, v: f64) -> f64 {
        let a = 1.0 + 1.0 / self.shape;
        let mean = self.scale * gamma(a);
        if v <= 0.0 {
            return v;
        }
        if v.is_infinite() {
            return mean;
        }
        let x = (v / self.scale).powf(self.shape);
        mean * gamma_lr(a, x) + v * (-x).exp()
    }
}

/// Lomax (Pareto type II) severity: `S(x) = (scale / (x + scale))^shape`
#[derive(Debug, Clone)]
pub struct Lomax {
    shape: f64,
    scale: f64,
}

impl Lomax {
    pub fn new(shape: f64, scale: f64) -> Result<Self> {
        ensure_positive(shape, "lomax", "shape")?;
        ensure_positive(scale, "lomax", "scale")?;
        Ok(Self { shape, scale })
    }
}

impl Severity for Lomax {
    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            1.0 - (self.scale / (x + self.scale)).powf(self.shape)
        }
    }

    fn ppf(&self, q: f64) -> f64 {
        self.scale * ((1.0 - q).powf(-1.0 / self.shape) - 1.0)
    }

    /// Infinite for `v = inf` when `shape <= 1`
    fn lev(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return v;
        }
        if self.shape == 1.0 {
            return self.scale * (v / self.scale).ln_1p();
        }
        let ratio = self.scale / (v + self.scale);
        self.scale / (self.shape - 1.0) * (1.0 - ratio.powf(self.shape - 1.0))
    }
}

/// Severity shifted right by `loc`
#[derive(Debug, Clone)]
pub struct Located<S> {
    inner: S,
    loc: f64,
}

impl<S: Severity> Located<S> {
    pub fn new(inner: S, loc: f64) -> Self {
        Self { inner, loc }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Severity> Severity for Located<S> {
    fn cdf(&self, x: f64) -> f64 {
        self.inner.cdf(x - self.loc)
    }

    fn ppf(&self, q: f64) -> f64 {
        self.inner.ppf(q) + self.loc
    }

    fn lev(&self, v: f64) -> f64 {
        self.inner.lev(v)
    }

    fn loc(&self) -> f64 {
        self.inner.loc() + self.loc
    }
}
