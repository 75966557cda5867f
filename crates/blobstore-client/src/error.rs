//! Error types for the BlobStore client

use thiserror::Error;

/// Errors that can occur in the BlobStore client
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported access level: {0}. Only \"public\" access is supported")]
    UnsupportedAccess(String),

    #[error("Invalid token")]
    Unauthorized,

    #[error("Invalid blob URL: {0}")]
    InvalidUrl(String),

    #[error("Remote storage error: {0}")]
    Remote(String),
}
