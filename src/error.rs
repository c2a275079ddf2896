//! Error types for the dunking analysis.
//!
//! Failures are grouped so callers (and tests) can match on the kind:
//! schema problems in input tables, domain violations in the physics or
//! statistics, and sampler non-convergence.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A value outside the domain of a formula or estimator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// The Washburn radicand `gamma·r·t·cos(phi) / (2·eta)` is negative.
    #[error("negative radicand in Washburn relation: {0:e}")]
    NegativeRadicand(f64),

    /// A standard deviation used as a divisor is zero, negative or non-finite.
    #[error("standard deviation must be positive and finite, got {0}")]
    ZeroStd(f64),

    /// No observations were assigned to a label that is used downstream.
    #[error("no observations assigned to label '{0}'")]
    EmptyBucket(String),

    /// Any other invalid numeric input (non-finite values, bad lengths, bad bounds).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Dunking analysis error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A required column is absent from an input table.
    #[error("missing required column '{column}' in table '{table}'")]
    Schema {
        /// Name of the missing column.
        column: String,
        /// Name of the table that was inspected.
        table: String,
    },

    /// A cell could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the source file.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A label outside the closed label set.
    #[error("unknown label '{label}', expected one of {known:?}")]
    UnknownLabel {
        /// The offending label.
        label: String,
        /// The labels known to the analysis.
        known: Vec<String>,
    },

    /// Domain violation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Sampler diagnostics indicate the posterior was not adequately explored.
    #[error("sampler did not converge: r_hat = {r_hat:.4} (max {max_r_hat}), ess = {ess:.1}")]
    NonConvergence {
        /// Split potential scale reduction factor.
        r_hat: f64,
        /// Threshold that was exceeded.
        max_r_hat: f64,
        /// Effective sample size summed over chains.
        ess: f64,
    },

    /// Inconsistent configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`DomainError::InvalidInput`].
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::Domain(DomainError::InvalidInput(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_convert() {
        let err: Error = DomainError::ZeroStd(0.0).into();
        assert!(matches!(err, Error::Domain(DomainError::ZeroStd(_))));
    }

    #[test]
    fn schema_message_names_column() {
        let err = Error::Schema {
            column: "biscuit".to_string(),
            table: "measurements".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("biscuit"), "{msg}");
        assert!(msg.contains("measurements"), "{msg}");
    }

    #[test]
    fn invalid_helper_is_domain_error() {
        let err = Error::invalid("bad");
        assert!(matches!(
            err,
            Error::Domain(DomainError::InvalidInput(ref m)) if m == "bad"
        ));
    }
}
