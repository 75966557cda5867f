//! BlobStore client configuration types

use serde::{Deserialize, Serialize};

use crate::error::BlobError;

/// Storage domain the endpoint is derived from
pub const STORAGE_DOMAIN: &str = "r2.cloudflarestorage.com";

/// Environment variable for the account identifier
pub const ENV_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
/// Environment variable for the access key id
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable for the secret access key
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable for the bucket name
pub const ENV_BUCKET_NAME: &str = "AWS_S3_BUCKET_NAME";
/// Environment variable for the default read/write token
pub const ENV_READ_WRITE_TOKEN: &str = "BLOB_READ_WRITE_TOKEN";

/// Configuration for the BlobStore client
///
/// Validated once when the client is constructed, not on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    /// Account identifier the storage endpoint is derived from
    pub account_id: String,

    /// Access key id
    pub access_key_id: String,

    /// Secret access key
    pub secret_access_key: String,

    /// Bucket all operations target
    pub bucket_name: String,

    /// Default read/write token attached to uploads and presented on
    /// delete/head when the caller supplies none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_write_token: Option<String>,
}

impl BlobStoreConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, BlobError> {
        let config = Self {
            account_id: std::env::var(ENV_ACCOUNT_ID).unwrap_or_default(),
            access_key_id: std::env::var(ENV_ACCESS_KEY_ID).unwrap_or_default(),
            secret_access_key: std::env::var(ENV_SECRET_ACCESS_KEY).unwrap_or_default(),
            bucket_name: std::env::var(ENV_BUCKET_NAME).unwrap_or_default(),
            read_write_token: std::env::var(ENV_READ_WRITE_TOKEN).ok(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that required fields are present and non-empty
    pub fn validate(&self) -> Result<(), BlobError> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(BlobError::Configuration(format!(
                "{} and {} must be set",
                ENV_ACCESS_KEY_ID, ENV_SECRET_ACCESS_KEY
            )));
        }
        if self.account_id.is_empty() {
            return Err(BlobError::Configuration(format!(
                "{} must be set",
                ENV_ACCOUNT_ID
            )));
        }
        if self.bucket_name.is_empty() {
            return Err(BlobError::Configuration(format!(
                "{} must be set",
                ENV_BUCKET_NAME
            )));
        }
        Ok(())
    }

    /// Storage endpoint derived from the account identifier
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.{}", self.account_id, STORAGE_DOMAIN)
    }

    /// Public URL for an uploaded object key
    pub fn blob_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint_url(), key)
    }

    /// URL for a listed object key; listing URLs embed the bucket segment
    pub fn bucket_blob_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint_url(), self.bucket_name, key)
    }
}
