//! Load loss model requests from JSON and policy layers from CSV
//!
//! A request describes the ground-up frequency and severity. When the layer
//! has a deductible, the frequency is thinned by the probability that a loss
//! exceeds it, so the built [`LossModel`] counts only losses in the layer.

use std::fs;
use std::io::Read;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregation::AggregateDistribution;
use crate::config::LossModelConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::distributions::{
    Binomial, DynFrequency, DynSeverity, Exponential, Frequency, Gamma, Located, LogNormal,
    Logarithmic, Lomax, NegativeBinomial, Poisson, Severity, Thinning, Weibull, ZeroModified,
};
use crate::error::Result;
use crate::loss_model::{LossModel, PolicyLayer};

/// Loss model built from a request
pub type DynLossModel = LossModel<DynFrequency, DynSeverity>;

/// Claim count family and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dist", rename_all = "snake_case")]
pub enum FrequencyConfig {
    Poisson { mu: f64 },
    Binomial { n: u64, p: f64 },
    NegativeBinomial { n: f64, p: f64 },
    Logarithmic { p: f64 },
    ZeroTruncatedPoisson { mu: f64 },
    ZeroTruncatedBinomial { n: u64, p: f64 },
    ZeroTruncatedNegativeBinomial { n: f64, p: f64 },
    ZeroModifiedPoisson { mu: f64, p0m: f64 },
    ZeroModifiedBinomial { n: u64, p: f64, p0m: f64 },
    ZeroModifiedNegativeBinomial { n: f64, p: f64, p0m: f64 },
    ZeroModifiedLogarithmic { p: f64, p0m: f64 },
}

/// Thin when `s < 1`, box either way
fn adjusted<T>(frequency: T, s: f64) -> Result<DynFrequency>
where
    T: Frequency + Thinning + Send + Sync + 'static,
    T::Output: Send + Sync + 'static,
{
    if s < 1.0 {
        Ok(Box::new(frequency.thinned(s)?))
    } else {
        Ok(Box::new(frequency))
    }
}

impl FrequencyConfig {
    pub fn build(&self) -> Result<DynFrequency> {
        self.build_thinned(1.0)
    }

    /// Claim count of losses that survive a retention with probability `s`
    pub fn build_thinned(&self, s: f64) -> Result<DynFrequency> {
        match *self {
            FrequencyConfig::Poisson { mu } => adjusted(Poisson::new(mu)?, s),
            FrequencyConfig::Binomial { n, p } => adjusted(Binomial::new(n, p)?, s),
            FrequencyConfig::NegativeBinomial { n, p } => adjusted(NegativeBinomial::new(n, p)?, s),
            FrequencyConfig::Logarithmic { p } => adjusted(Logarithmic::new(p)?, s),
            FrequencyConfig::ZeroTruncatedPoisson { mu } => {
                adjusted(ZeroModified::zero_truncated(Poisson::new(mu)?)?, s)
            }
            FrequencyConfig::ZeroTruncatedBinomial { n, p } => {
                adjusted(ZeroModified::zero_truncated(Binomial::new(n, p)?)?, s)
            }
            FrequencyConfig::ZeroTruncatedNegativeBinomial { n, p } => {
                adjusted(ZeroModified::zero_truncated(NegativeBinomial::new(n, p)?)?, s)
            }
            FrequencyConfig::ZeroModifiedPoisson { mu, p0m } => {
                adjusted(ZeroModified::new(Poisson::new(mu)?, p0m)?, s)
            }
            FrequencyConfig::ZeroModifiedBinomial { n, p, p0m } => {
                adjusted(ZeroModified::new(Binomial::new(n, p)?, p0m)?, s)
            }
            FrequencyConfig::ZeroModifiedNegativeBinomial { n, p, p0m } => {
                adjusted(ZeroModified::new(NegativeBinomial::new(n, p)?, p0m)?, s)
            }
            FrequencyConfig::ZeroModifiedLogarithmic { p, p0m } => {
                adjusted(ZeroModified::new(Logarithmic::new(p)?, p0m)?, s)
            }
        }
    }
}

/// Claim size family and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dist", rename_all = "snake_case")]
pub enum SeverityKind {
    Exponential { scale: f64 },
    Gamma { shape: f64, scale: f64 },
    #[serde(rename = "lognormal")]
    LogNormal { mu: f64, sigma: f64 },
    Weibull { shape: f64, scale: f64 },
    Lomax { shape: f64, scale: f64 },
}

/// Claim size family with an optional location shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityConfig {
    #[serde(flatten)]
    pub kind: SeverityKind,

    #[serde(default)]
    pub loc: f64,
}

fn located<S>(severity: S, loc: f64) -> DynSeverity
where
    S: Severity + Send + Sync + 'static,
{
    if loc == 0.0 {
        Box::new(severity)
    } else {
        Box::new(Located::new(severity, loc))
    }
}

impl SeverityConfig {
    pub fn build(&self) -> Result<DynSeverity> {
        let loc = self.loc;
        Ok(match self.kind {
            SeverityKind::Exponential { scale } => located(Exponential::new(scale)?, loc),
            SeverityKind::Gamma { shape, scale } => located(Gamma::new(shape, scale)?, loc),
            SeverityKind::LogNormal { mu, sigma } => located(LogNormal::new(mu, sigma)?, loc),
            SeverityKind::Weibull { shape, scale } => located(Weibull::new(shape, scale)?, loc),
            SeverityKind::Lomax { shape, scale } => located(Lomax::new(shape, scale)?, loc),
        })
    }
}

/// Deductible and optional cover; no cover means an unlimited layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub deductible: f64,

    #[serde(default)]
    pub cover: Option<f64>,
}

impl LayerConfig {
    pub fn build(&self) -> Result<PolicyLayer> {
        PolicyLayer::new(self.deductible, self.cover.unwrap_or(f64::INFINITY))
    }
}

/// Everything needed to build a [`LossModel`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossModelRequest {
    pub frequency: FrequencyConfig,
    pub severity: SeverityConfig,

    #[serde(default)]
    pub layer: LayerConfig,

    #[serde(default)]
    pub model: LossModelConfig,
}

impl LossModelRequest {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Model of the request's own layer
    pub fn build(&self) -> Result<DynLossModel> {
        self.build_for_layer(self.layer.build()?)
    }

    /// Model of `layer`, with the frequency thinned by `S(deductible)`
    pub fn build_for_layer(&self, layer: PolicyLayer) -> Result<DynLossModel> {
        let severity = self.severity.build()?;
        let frequency = if layer.deductible > 0.0 {
            self.frequency
                .build_thinned(severity.survival(layer.deductible))?
        } else {
            self.frequency.build()?
        };
        Ok(LossModel::new(frequency, severity, layer, self.model.clone()))
    }

    /// Aggregate several layers of the same ground-up model in parallel
    pub fn aggregate_layers(
        &self,
        layers: &[PolicyLayer],
        sink: &dyn DiagnosticsSink,
    ) -> Result<Vec<AggregateDistribution>> {
        layers
            .par_iter()
            .map(|layer| self.build_for_layer(*layer)?.aggregate(sink))
            .collect()
    }
}

/// Raw CSV row: `deductible,cover`, an empty cover meaning unlimited
#[derive(Debug, Deserialize)]
struct LayerRow {
    deductible: f64,
    cover: Option<f64>,
}

/// Read policy layers from CSV
pub fn layers_from_reader<R: Read>(reader: R) -> Result<Vec<PolicyLayer>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut layers = Vec::new();
    for result in rdr.deserialize() {
        let row: LayerRow = result?;
        layers.push(PolicyLayer::new(row.deductible, row.cover.unwrap_or(f64::INFINITY))?);
    }
    Ok(layers)
}

pub fn load_layers<P: AsRef<Path>>(path: P) -> Result<Vec<PolicyLayer>> {
    layers_from_reader(fs::File::open(path)?)
}
