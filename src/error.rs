//! Error types for the SIGMA scanner crate.
//!
//! None of these ever escape [`Scanner::scan`](crate::Scanner::scan): that
//! boundary logs the error and reports "no match". They are returned from the
//! lower-level building blocks (rule loading, lowering, expression compilation)
//! so those can be used and tested on their own.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SigmaError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SigmaError {
    /// The lowered condition expression is malformed.
    #[error("Compilation error: {0}")]
    CompilationError(String),

    /// The compiled predicate failed at runtime (type mismatch, callback failure).
    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    /// A condition reference has no matching selection in the detection.
    #[error("Unresolved condition: {0}")]
    UnresolvedCondition(String),

    /// The condition uses a construct this engine does not evaluate.
    #[error("Unsupported condition: {0}")]
    UnsupportedCondition(String),

    /// A selection definition cannot be turned into an identifier tree.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for SigmaError {
    fn from(err: std::io::Error) -> Self {
        SigmaError::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for SigmaError {
    fn from(err: serde_yaml::Error) -> Self {
        SigmaError::YamlError(err.to_string())
    }
}
