// Error types for loading and running Church-encoded programs

use std::fmt;
use thiserror::Error;

/// Which evaluation budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Total machine transitions.
    Steps,
    /// Pending continuation frames.
    Depth,
    /// Machine runs re-entered from native calls.
    Nesting,
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::Steps => write!(f, "step"),
            Budget::Depth => write!(f, "depth"),
            Budget::Nesting => write!(f, "nesting"),
        }
    }
}

/// Failures raised while evaluating terms, decoding numerals or showing them.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The computation did not finish inside the configured budget.
    #[error("evaluation diverged: {budget} limit of {limit} exceeded")]
    Divergence { budget: Budget, limit: u64 },

    /// Something that is not a function ended up in function position.
    #[error("shape mismatch: cannot apply {found} as a function")]
    ShapeMismatch { found: String },

    #[error("counter overflow: decoded value exceeds {}", u64::MAX)]
    CounterOverflow,

    #[error("unbound variable `{0}`")]
    UnboundVariable(String),

    /// A program ran to completion without ever calling `show`.
    #[error("program finished without calling `show`")]
    MissingShow,

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn is_divergence(&self) -> bool {
        matches!(self, RuntimeError::Divergence { .. })
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, RuntimeError::ShapeMismatch { .. })
    }
}

/// Program file errors.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed program: {0}")]
    Malformed(String),

    #[error("unknown term tag `{0}`")]
    UnknownTag(String),

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got `{value}`")]
    InvalidValue { key: &'static str, value: String },
}
