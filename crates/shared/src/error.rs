use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error payload shape of the simulation backend: a single human-readable
/// detail string accompanying any non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{detail}")]
pub struct ApiError {
    pub detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
