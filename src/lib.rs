//! Aggregate Loss - collective risk model engine
//!
//! This library provides:
//! - Frequency and severity distribution families
//! - Severity discretization (mass dispersal, lower, upper, local moments)
//! - Aggregate loss distributions by FFT, Panjer recursion and Monte Carlo
//! - Excess of loss layers with deductible and cover
//! - JSON model requests and CSV layer files

pub mod aggregation;
pub mod config;
pub mod diagnostics;
pub mod discretization;
pub mod distributions;
pub mod error;
pub mod loader;
pub mod loss_model;

// Re-export commonly used types
pub use aggregation::{AggregateDistribution, AggregationMethod};
pub use config::{CalculationConfig, LossModelConfig, PROB_TOLERANCE};
pub use diagnostics::{Diagnostic, DiagnosticsSink, LogSink, RecordingSink};
pub use discretization::{DiscretizationMethod, DiscretizationParams, DiscretizedSeverity};
pub use distributions::{Frequency, Severity};
pub use error::{LossModelError, Result};
pub use loader::LossModelRequest;
pub use loss_model::{LossModel, PolicyLayer};
