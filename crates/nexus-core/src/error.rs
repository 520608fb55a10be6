//! Crate-wide error type.
//!
//! Module-local error enums (`StorageError`, `GraphError`, `BayesError`) are
//! converted into `NexusError` at the `NexusEngine` boundary via `#[from]`,
//! matching the propagation policy: validation errors surface to the
//! caller, tier/backend transient failures are swallowed at their own
//! boundary and never reach here as hard failures.

use thiserror::Error;

use crate::bayes::BayesError;
use crate::graph::GraphError;
use crate::storage::StorageError;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NexusError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Bayes(#[from] BayesError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NexusError>;
