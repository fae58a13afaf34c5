//! Claim count distributions
//!
//! Poisson, binomial and negative binomial belong to the (a, b, 0) class:
//! `p_k / p_{k-1} = a + b / k` for `k >= 1`. The logarithmic distribution and
//! any [`ZeroModified`] family belong to the (a, b, 1) class, where the
//! relation only holds from `k >= 2`.
//!
//! Probability masses come from `statrs`, variates from `rand_distr`.

use num_complex::Complex64;
use rand::{Rng, RngCore};
use rand_distr::Distribution;
use statrs::distribution::Discrete;

use super::{Frequency, PanjerParams};
use crate::error::{LossModelError, Result};

/// Adjustment of a ground-up claim count for a retention
///
/// If each loss independently exceeds the retention with probability `s`, the
/// number of losses in the layer is the ground-up count thinned by `s`.
pub trait Thinning {
    type Output: Frequency;

    fn thinned(&self, s: f64) -> Result<Self::Output>;
}

fn ensure(valid: bool, distribution: &'static str, reason: &str) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(LossModelError::invalid(distribution, reason))
    }
}

/// Poisson claim count with mean `mu`
#[derive(Debug, Clone)]
pub struct Poisson {
    mu: f64,
    counts: statrs::distribution::Poisson,
    sampler: rand_distr::Poisson<f64>,
}

impl Poisson {
    pub fn new(mu: f64) -> Result<Self> {
        ensure(mu.is_finite() && mu > 0.0, "poisson", "mu must be positive and finite")?;
        Ok(Self {
            mu,
            counts: statrs::distribution::Poisson::new(mu)
                .map_err(|e| LossModelError::invalid("poisson", e))?,
            sampler: rand_distr::Poisson::new(mu)
                .map_err(|e| LossModelError::invalid("poisson", e))?,
        })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }
}

impl Frequency for Poisson {
    fn pmf(&self, k: u64) -> f64 {
        self.counts.pmf(k)
    }

    fn pgf(&self, z: Complex64) -> Complex64 {
        ((z - 1.0) * self.mu).exp()
    }

    fn ab(&self) -> PanjerParams {
        PanjerParams { a: 0.0, b: self.mu }
    }

    fn mean(&self) -> f64 {
        self.mu
    }

    fn sample(&self, rng: &mut dyn RngCore) -> u64 {
        self.sampler.sample(rng) as u64
    }
}

impl Thinning for Poisson {
    type Output = Poisson;

    fn thinned(&self, s: f64) -> Result<Poisson> {
        Poisson::new(self.mu * s)
    }
}

/// Binomial claim count: `n` trials with claim probability `p`
#[derive(Debug, Clone)]
pub struct Binomial {
    n: u64,
    p: f64,
    counts: statrs::distribution::Binomial,
    sampler: rand_distr::Binomial,
}

impl Binomial {
    pub fn new(n: u64, p: f64) -> Result<Self> {
        ensure(n > 0, "binomial", "n must be at least 1")?;
        ensure((0.0..1.0).contains(&p), "binomial", "p must lie in [0, 1)")?;
        Ok(Self {
            n,
            p,
            counts: statrs::distribution::Binomial::new(p, n)
                .map_err(|e| LossModelError::invalid("binomial", e))?,
            sampler: rand_distr::Binomial::new(n, p)
                .map_err(|e| LossModelError::invalid("binomial", e))?,
        })
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Frequency for Binomial {
    fn pmf(&self, k: u64) -> f64 {
        self.counts.pmf(k)
    }

    fn pgf(&self, z: Complex64) -> Complex64 {
        let base = (z - 1.0) * self.p + 1.0;
        match u32::try_from(self.n) {
            Ok(n) => base.powu(n),
            Err(_) => base.powf(self.n as f64),
        }
    }

    fn ab(&self) -> PanjerParams {
        let odds = self.p / (1.0 - self.p);
        PanjerParams {
            a: -odds,
            b: (self.n as f64 + 1.0) * odds,
        }
    }

    fn mean(&self) -> f64 {
        self.n as f64 * self.p
    }

    fn sample(&self, rng: &mut dyn RngCore) -> u64 {
        self.sampler.sample(rng)
    }
}

impl Thinning for Binomial {
    type Output = Binomial;

    fn thinned(&self, s: f64) -> Result<Binomial> {
        Binomial::new(self.n, self.p * s)
    }
}

/// Negative binomial claim count
///
/// Number of failures before `n` successes with success probability `p`, so
/// the mean is `n (1 - p) / p`. `n` need not be an integer.
#[derive(Debug, Clone)]
pub struct NegativeBinomial {
    n: f64,
    p: f64,
    counts: statrs::distribution::NegativeBinomial,
    mixing: rand_distr::Gamma<f64>,
}

impl NegativeBinomial {
    pub fn new(n: f64, p: f64) -> Result<Self> {
        ensure(n.is_finite() && n > 0.0, "negative binomial", "n must be positive and finite")?;
        ensure(p > 0.0 && p < 1.0, "negative binomial", "p must lie in (0, 1)")?;
        Ok(Self {
            n,
            p,
            counts: statrs::distribution::NegativeBinomial::new(n, p)
                .map_err(|e| LossModelError::invalid("negative binomial", e))?,
            mixing: rand_distr::Gamma::new(n, (1.0 - p) / p)
                .map_err(|e| LossModelError::invalid("negative binomial", e))?,
        })
    }

    pub fn n(&self) -> f64 {
        self.n
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Frequency for NegativeBinomial {
    fn pmf(&self, k: u64) -> f64 {
        self.counts.pmf(k)
    }

    fn pgf(&self, z: Complex64) -> Complex64 {
        let base = Complex64::new(self.p, 0.0) / (1.0 - z * (1.0 - self.p));
        base.powf(self.n)
    }

    fn ab(&self) -> PanjerParams {
        let q = 1.0 - self.p;
        PanjerParams {
            a: q,
            b: (self.n - 1.0) * q,
        }
    }

    fn mean(&self) -> f64 {
        self.n * (1.0 - self.p) / self.p
    }

    /// Poisson draw with a gamma distributed mean
    fn sample(&self, rng: &mut dyn RngCore) -> u64 {
        let lambda = self.mixing.sample(rng);
        match rand_distr::Poisson::new(lambda) {
            Ok(poisson) => poisson.sample(rng) as u64,
            // gamma draws can underflow to zero
            Err(_) => 0,
        }
    }
}

impl Thinning for NegativeBinomial {
    type Output = NegativeBinomial;

    fn thinned(&self, s: f64) -> Result<NegativeBinomial> {
        let beta = (1.0 - self.p) / self.p * s;
        NegativeBinomial::new(self.n, 1.0 / (1.0 + beta))
    }
}

/// Logarithmic (log-series) claim count on `k >= 1`
#[derive(Debug, Clone)]
pub struct Logarithmic {
    p: f64,
    log_q: f64,
}

impl Logarithmic {
    pub fn new(p: f64) -> Result<Self> {
        ensure(p > 0.0 && p < 1.0, "logarithmic", "p must lie in (0, 1)")?;
        Ok(Self {
            p,
            log_q: (1.0 - p).ln(),
        })
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Frequency for Logarithmic {
    fn pmf(&self, k: u64) -> f64 {
        if k == 0 {
            return 0.0;
        }
        let k = k as f64;
        (k * self.p.ln() - k.ln() - (-self.log_q).ln()).exp()
    }

    fn pgf(&self, z: Complex64) -> Complex64 {
        (1.0 - z * self.p).ln() / self.log_q
    }

    fn ab(&self) -> PanjerParams {
        PanjerParams {
            a: self.p,
            b: -self.p,
        }
    }

    fn mean(&self) -> f64 {
        -self.p / ((1.0 - self.p) * self.log_q)
    }

    /// Sequential inversion of the cdf
    fn sample(&self, rng: &mut dyn RngCore) -> u64 {
        let u: f64 = rng.gen();
        let mut k = 1u64;
        let mut prob = self.pmf(1);
        let mut cum = prob;
        while cum < u && prob > 0.0 {
            prob *= self.p * k as f64 / (k as f64 + 1.0);
            k += 1;
            cum += prob;
        }
        k
    }
}

impl Thinning for Logarithmic {
    type Output = ZeroModified<Logarithmic>;

    fn thinned(&self, s: f64) -> Result<ZeroModified<Logarithmic>> {
        let kept = 1.0 - self.p * (1.0 - s);
        let base = Logarithmic::new(self.p * s / kept)?;
        ZeroModified::new(base, (kept.ln() / self.log_q).max(0.0))
    }
}

/// A frequency whose probability of zero claims is replaced by `p0m`
///
/// The remaining masses are rescaled so that the distribution still sums to
/// one. `p0m = 0` gives the zero-truncated family.
#[derive(Debug, Clone)]
pub struct ZeroModified<F> {
    base: F,
    p0m: f64,
    base_p0: f64,
}

impl<F: Frequency> ZeroModified<F> {
    pub fn new(base: F, p0m: f64) -> Result<Self> {
        ensure((0.0..1.0).contains(&p0m), "zero-modified", "p0m must lie in [0, 1)")?;
        let base_p0 = base.pmf(0);
        ensure(base_p0 < 1.0, "zero-modified", "base distribution is degenerate at zero")?;
        Ok(Self { base, p0m, base_p0 })
    }

    pub fn zero_truncated(base: F) -> Result<Self> {
        Self::new(base, 0.0)
    }

    pub fn base(&self) -> &F {
        &self.base
    }

    pub fn p0m(&self) -> f64 {
        self.p0m
    }

    /// Factor applied to the base masses for `k >= 1`
    fn scale(&self) -> f64 {
        (1.0 - self.p0m) / (1.0 - self.base_p0)
    }
}

impl<F: Frequency> Frequency for ZeroModified<F> {
    fn pmf(&self, k: u64) -> f64 {
        if k == 0 {
            self.p0m
        } else {
            self.scale() * self.base.pmf(k)
        }
    }

    fn pgf(&self, z: Complex64) -> Complex64 {
        (self.base.pgf(z) - self.base_p0) * self.scale() + self.p0m
    }

    fn ab(&self) -> PanjerParams {
        self.base.ab()
    }

    fn mean(&self) -> f64 {
        self.scale() * self.base.mean()
    }

    fn sample(&self, rng: &mut dyn RngCore) -> u64 {
        if rng.gen::<f64>() < self.p0m {
            return 0;
        }
        loop {
            let k = self.base.sample(rng);
            if k > 0 {
                return k;
            }
        }
    }
}

impl<F> Thinning for ZeroModified<F>
where
    F: Frequency + Thinning,
{
    type Output = ZeroModified<F::Output>;

    fn thinned(&self, s: f64) -> Result<Self::Output> {
        let base = self.base.thinned(s)?;
        let thinned_p0 = base.pmf(0);
        let p0m = 1.0 - (1.0 - self.p0m) * (1.0 - thinned_p0) / (1.0 - self.base_p0);
        ZeroModified::new(base, p0m.max(0.0))
    }
}
