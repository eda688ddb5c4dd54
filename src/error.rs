//! Error types for the transform pipeline.

use thiserror::Error;

/// Coarse classification of a [`TransformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration or an unsatisfiable chain, raised before any pass runs.
    Construction,
    /// A pass rejected the schema state; aborts the remaining passes.
    Pass,
    /// A versioned output payload failed its shape check.
    Validation,
    /// The resource-synthesis backend refused an operation.
    Backend,
}

/// Errors raised while building or running a transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Pipeline configuration is malformed.
    #[error("invalid transform configuration: {0}")]
    InvalidConfig(String),

    /// A pass declares a dependency that does not run before it.
    #[error("pass '{pass}' depends on '{dependency}', which does not run before it")]
    UnsatisfiedDependency { pass: String, dependency: String },

    /// Two passes in one chain share a name.
    #[error("duplicate pass name in chain: {0}")]
    DuplicatePass(String),

    /// The schema text could not be parsed.
    #[error("schema parse error: {0}")]
    SchemaParse(String),

    /// A directive is used in an unsupported way.
    #[error("[{pass}] invalid directive usage: {message}")]
    InvalidDirective { pass: String, message: String },

    /// A model's datasource could not be resolved.
    #[error("[{pass}] unresolved datasource for model '{model}': {reason}")]
    UnresolvedDatasource {
        pass: String,
        model: String,
        reason: String,
    },

    /// Required relationships form a cycle.
    #[error("[{pass}] cyclic relationship: {}", cycle.join(" -> "))]
    CyclicRelation { pass: String, cycle: Vec<String> },

    /// A shared pass instance was already mutably borrowed.
    #[error("pass '{0}' is already in use")]
    PassBusy(String),

    /// A versioned output payload failed validation.
    #[error("output validation failed: {0}")]
    Validation(String),

    /// The synthesis backend rejected an operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransformError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) | Self::UnsatisfiedDependency { .. } | Self::DuplicatePass(_) => {
                ErrorKind::Construction
            }
            Self::SchemaParse(_)
            | Self::InvalidDirective { .. }
            | Self::UnresolvedDatasource { .. }
            | Self::CyclicRelation { .. }
            | Self::PassBusy(_) => ErrorKind::Pass,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Backend(_) | Self::Serialization(_) => ErrorKind::Backend,
        }
    }

    pub(crate) fn directive(pass: &str, message: impl Into<String>) -> Self {
        Self::InvalidDirective {
            pass: pass.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;
