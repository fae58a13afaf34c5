//! Diagnostics emitted during a calculation
//!
//! Approximation shortfalls are reported here instead of failing the
//! calculation. Callers choose where diagnostics go by passing a
//! [`DiagnosticsSink`]: [`LogSink`] forwards them to the `log` facade,
//! [`RecordingSink`] keeps them in memory, and any closure taking a
//! `&Diagnostic` works as a sink too.

use std::fmt;
use std::sync::Mutex;

/// A warning-level event raised by an aggregation method
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The last cumulative probability fell short of 1 by more than the tolerance
    CdfShortfall {
        /// Aggregation method that produced the distribution
        method: &'static str,
        /// Last calculated cumulative probability
        last_cdf: f64,
        /// `1 - last_cdf`
        shortfall: f64,
    },

    /// Some probability masses are non-finite or negative beyond the tolerance,
    /// typically after excessive tilting
    InvalidMass {
        method: &'static str,
        /// Number of NaN or infinite masses
        nonfinite: usize,
        /// Number of masses below `-prob_tolerance`
        negative: usize,
        /// Smallest finite mass
        min_mass: f64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CdfShortfall { method, last_cdf, .. } => write!(
                f,
                "Failure to obtain a cumulative distribution function close to 1 ({}). \
                 Last calculated cumulative probability is {:.4}.",
                method, last_cdf
            ),
            Diagnostic::InvalidMass {
                method,
                nonfinite,
                negative,
                min_mass,
            } => write!(
                f,
                "Aggregate probability masses are not a valid distribution ({}): \
                 {} non-finite and {} negative masses, smallest {:.4e}.",
                method, nonfinite, negative, min_mass
            ),
        }
    }
}

/// Destination for calculation diagnostics
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Sink that logs every diagnostic at warn level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn emit(&self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

/// Sink that stores diagnostics so they can be inspected afterwards
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the diagnostics recorded so far
    pub fn events(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

impl<F> DiagnosticsSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn emit(&self, diagnostic: Diagnostic) {
        self(&diagnostic)
    }
}
