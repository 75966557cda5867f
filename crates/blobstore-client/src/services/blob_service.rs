//! BlobStore client implementation against an S3-compatible backend

use std::sync::Arc;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error};
use url::Url;
use uuid::Uuid;

use crate::auth::{AuthorizationStrategy, Operation, TokenMetadataStrategy};
use crate::error::BlobError;
use crate::services::config::BlobStoreConfig;

/// Metadata field carrying the read/write token on stored objects
pub const TOKEN_METADATA_KEY: &str = "x-read-write-token";

/// Default page size for LIST operations
pub const DEFAULT_LIST_LIMIT: i32 = 1000;

/// Upper bound on concurrent remote calls in batch deletes and the LIST
/// metadata fan-out
const MAX_CONCURRENT_REQUESTS: usize = 8;

/// Requested visibility of an uploaded blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// Publicly readable
    #[default]
    Public,
    /// Not supported yet; PUT rejects this
    Private,
}

/// Options for PUT operations
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Requested access level; only [`Access::Public`] is supported
    pub access: Access,
    /// Content type override; inferred from the pathname when absent
    pub content_type: Option<String>,
    /// Token stored on the object; falls back to the configured default
    pub token: Option<String>,
}

/// Result of a PUT operation
#[derive(Debug, Clone)]
pub struct PutResult {
    /// Public URL of the newly created blob
    pub url: String,
}

/// Options for DELETE operations
#[derive(Debug, Clone, Default)]
pub struct DelOptions {
    /// Token presented for authorization; falls back to the configured default
    pub token: Option<String>,
}

/// Options for HEAD operations
#[derive(Debug, Clone, Default)]
pub struct HeadOptions {
    /// Token presented for authorization; falls back to the configured default
    pub token: Option<String>,
}

/// Options for LIST operations
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Key prefix to filter by; empty matches every key
    pub prefix: Option<String>,
    /// Maximum number of items to return (default 1000)
    pub limit: Option<i32>,
    /// Continuation token from a previous page
    pub cursor: Option<String>,
}

/// Normalized metadata for a stored blob
#[derive(Debug, Clone)]
pub struct BlobMeta {
    /// Size in bytes
    pub size: i64,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
    /// Storage key of the blob
    pub pathname: String,
    /// Content type
    pub content_type: String,
    /// Content disposition, if set
    pub content_disposition: Option<String>,
    /// Content encoding, if set
    pub content_encoding: Option<String>,
    /// Cache control, if set
    pub cache_control: Option<String>,
    /// URL the blob is reachable at
    pub url: String,
}

/// Result of a LIST operation
#[derive(Debug, Clone)]
pub struct ListResult {
    /// Blobs on this page
    pub blobs: Vec<BlobMeta>,
    /// Continuation token for the next page
    pub cursor: Option<String>,
    /// Whether more results exist beyond this page
    pub has_more: bool,
}

/// Client for put/del/head/list against a single remote bucket
///
/// Holds no state beyond the configured connection; every operation maps to
/// one remote call, or a small bounded fan-out of calls.
pub struct BlobStoreClient {
    client: Client,
    config: BlobStoreConfig,
    auth: Arc<dyn AuthorizationStrategy>,
}

impl BlobStoreClient {
    /// Create a client from validated configuration
    pub fn new(config: BlobStoreConfig) -> Result<Self, BlobError> {
        Self::with_authorization(config, Arc::new(TokenMetadataStrategy))
    }

    /// Create a client with a custom authorization strategy
    pub fn with_authorization(
        config: BlobStoreConfig,
        auth: Arc<dyn AuthorizationStrategy>,
    ) -> Result<Self, BlobError> {
        config.validate()?;

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "blobstore-client",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            config,
            auth,
        })
    }

    /// Upload a blob under a freshly generated unique key
    pub async fn put(
        &self,
        pathname: &str,
        body: Bytes,
        options: PutOptions,
    ) -> Result<PutResult, BlobError> {
        if options.access != Access::Public {
            return Err(BlobError::UnsupportedAccess(format!(
                "{:?}",
                options.access
            )));
        }

        let content_type = resolve_content_type(pathname, options.content_type.as_deref());
        let key = unique_key(pathname);
        let token = options
            .token
            .or_else(|| self.config.read_write_token.clone());

        debug!("PUT {} ({} bytes, {})", key, body.len(), content_type);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(&content_type)
            .acl(ObjectCannedAcl::PublicRead);

        if let Some(token) = token {
            request = request.metadata(TOKEN_METADATA_KEY, token);
        }

        request.send().await.map_err(|e| {
            error!("Failed to upload {}: {}", key, e);
            BlobError::Remote(e.to_string())
        })?;

        Ok(PutResult {
            url: self.config.blob_url(&key),
        })
    }

    /// Delete the blob at a URL, returning its prior metadata
    ///
    /// Returns `None` when the blob does not exist.
    pub async fn del(
        &self,
        blob_url: &str,
        options: &DelOptions,
    ) -> Result<Option<BlobMeta>, BlobError> {
        let token = options
            .token
            .clone()
            .or_else(|| self.config.read_write_token.clone());
        self.delete_blob(blob_url, token.as_deref()).await
    }

    /// Delete several blobs concurrently
    ///
    /// Deletions run independently with bounded concurrency; the first
    /// failure aborts the batch. Not-found entries are dropped from the
    /// result, which otherwise preserves input order.
    pub async fn del_many(
        &self,
        blob_urls: &[String],
        options: &DelOptions,
    ) -> Result<Vec<BlobMeta>, BlobError> {
        let token = options
            .token
            .clone()
            .or_else(|| self.config.read_write_token.clone());

        let results: Vec<Option<BlobMeta>> = stream::iter(blob_urls)
            .map(|url| self.delete_blob(url, token.as_deref()))
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        Ok(results.into_iter().flatten().collect())
    }

    async fn delete_blob(
        &self,
        blob_url: &str,
        token: Option<&str>,
    ) -> Result<Option<BlobMeta>, BlobError> {
        let key = key_from_url(blob_url)?;

        debug!("DELETE {}", key);

        let head = match self
            .client
            .head_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                return Ok(None);
            }
            Err(err) => {
                error!("Failed to delete {}: {}", key, err);
                return Err(BlobError::Remote(err.to_string()));
            }
        };

        let stored = head
            .metadata()
            .and_then(|m| m.get(TOKEN_METADATA_KEY))
            .map(String::as_str);

        if !self.auth.authorize(stored, token, Operation::Delete) {
            error!("Token mismatch deleting {}", key);
            return Err(BlobError::Unauthorized);
        }

        self.client
            .delete_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to delete {}: {}", key, e);
                BlobError::Remote(e.to_string())
            })?;

        Ok(Some(blob_meta(&key, blob_url.to_string(), &head)))
    }

    /// Fetch normalized metadata for the blob at a URL
    ///
    /// Returns `None` when the blob does not exist. The stored token must
    /// equal the caller's exactly; both being absent counts as equal.
    pub async fn head(
        &self,
        blob_url: &str,
        options: &HeadOptions,
    ) -> Result<Option<BlobMeta>, BlobError> {
        let token = options
            .token
            .clone()
            .or_else(|| self.config.read_write_token.clone());
        let key = key_from_url(blob_url)?;

        debug!("HEAD {}", key);

        let response = match self
            .client
            .head_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                return Ok(None);
            }
            Err(err) => {
                error!("Failed to read metadata for {}: {}", key, err);
                return Err(BlobError::Remote(err.to_string()));
            }
        };

        let stored = response
            .metadata()
            .and_then(|m| m.get(TOKEN_METADATA_KEY))
            .map(String::as_str);

        if !self.auth.authorize(stored, token.as_deref(), Operation::Head) {
            error!("Token mismatch reading metadata for {}", key);
            return Err(BlobError::Unauthorized);
        }

        Ok(Some(blob_meta(&key, blob_url.to_string(), &response)))
    }

    /// List blobs with pagination
    ///
    /// The listing call carries no per-object content metadata, so every
    /// returned key is enriched with a follow-up head call, bounded to
    /// [`MAX_CONCURRENT_REQUESTS`] in flight. Listing N keys costs 1 + N
    /// remote calls.
    pub async fn list(&self, options: ListOptions) -> Result<ListResult, BlobError> {
        let prefix = options.prefix.unwrap_or_default();
        let limit = options.limit.unwrap_or(DEFAULT_LIST_LIMIT);

        debug!("LIST prefix={} limit={}", prefix, limit);

        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket_name)
            .prefix(&prefix)
            .max_keys(limit);

        if let Some(cursor) = options.cursor {
            request = request.continuation_token(cursor);
        }

        let response = request.send().await.map_err(|e| {
            error!("Failed to list blobs: {}", e);
            BlobError::Remote(e.to_string())
        })?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        let blobs: Vec<BlobMeta> = stream::iter(keys)
            .map(|key| async move {
                let head = self
                    .client
                    .head_object()
                    .bucket(&self.config.bucket_name)
                    .key(&key)
                    .send()
                    .await
                    .map_err(|e| {
                        error!("Failed to read metadata for {}: {}", key, e);
                        BlobError::Remote(e.to_string())
                    })?;
                Ok(blob_meta(&key, self.config.bucket_blob_url(&key), &head))
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        let cursor = response.next_continuation_token().map(str::to_string);
        let has_more = response.is_truncated().unwrap_or(false);

        Ok(ListResult {
            blobs,
            cursor,
            has_more,
        })
    }
}

/// Build normalized metadata from a head response
fn blob_meta(key: &str, url: String, head: &HeadObjectOutput) -> BlobMeta {
    BlobMeta {
        size: head.content_length().unwrap_or(0),
        uploaded_at: head
            .last_modified()
            .and_then(|dt| {
                DateTime::parse_from_rfc3339(&dt.to_string())
                    .ok()
                    .map(|d| d.with_timezone(&Utc))
            })
            .unwrap_or_else(Utc::now),
        pathname: key.to_string(),
        content_type: head
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string(),
        content_disposition: head.content_disposition().map(str::to_string),
        content_encoding: head.content_encoding().map(str::to_string),
        cache_control: head.cache_control().map(str::to_string),
        url,
    }
}

/// Generate a unique storage key from a pathname
///
/// A fresh UUID goes between the basename and the extension, so repeated
/// puts of the same pathname never collide. Pathnames without an extension
/// get the UUID appended.
fn unique_key(pathname: &str) -> String {
    let id = Uuid::new_v4();

    match pathname.rfind('.') {
        Some(dot_pos) => format!("{}-{}{}", &pathname[..dot_pos], id, &pathname[dot_pos..]),
        None => format!("{}-{}", pathname, id),
    }
}

/// Recover the storage key from a blob URL by stripping the origin and the
/// leading slash
fn key_from_url(blob_url: &str) -> Result<String, BlobError> {
    let parsed = Url::parse(blob_url)
        .map_err(|e| BlobError::InvalidUrl(format!("{}: {}", blob_url, e)))?;

    let key = parsed.path().trim_start_matches('/');
    if key.is_empty() {
        return Err(BlobError::InvalidUrl(format!(
            "{}: no key in path",
            blob_url
        )));
    }

    Ok(key.to_string())
}

/// Resolve the content type for an upload
fn resolve_content_type(pathname: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(content_type) => content_type.to_string(),
        None => mime_guess::from_path(pathname)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_key_inserts_uuid_before_extension() {
        let key = unique_key("notes.txt");
        assert!(key.starts_with("notes-"));
        assert!(key.ends_with(".txt"));
        // basename + '-' + uuid + extension
        assert_eq!(key.len(), "notes".len() + 1 + 36 + ".txt".len());
    }

    #[test]
    fn test_unique_key_splits_at_final_dot() {
        let key = unique_key("archive.tar.gz");
        assert!(key.starts_with("archive.tar-"));
        assert!(key.ends_with(".gz"));
    }

    #[test]
    fn test_unique_key_without_extension_appends_uuid() {
        let key = unique_key("README");
        assert!(key.starts_with("README-"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn test_unique_key_never_repeats() {
        let first = unique_key("image.png");
        let second = unique_key("image.png");
        assert_ne!(first, second);
        assert_ne!(first, "image.png");
    }

    #[test]
    fn test_key_from_url_strips_origin_and_slash() {
        let key =
            key_from_url("https://acct.r2.cloudflarestorage.com/notes-abc.txt").unwrap();
        assert_eq!(key, "notes-abc.txt");
    }

    #[test]
    fn test_key_from_url_keeps_nested_path() {
        let key =
            key_from_url("https://acct.r2.cloudflarestorage.com/a/b/notes-abc.txt").unwrap();
        assert_eq!(key, "a/b/notes-abc.txt");
    }

    #[test]
    fn test_key_from_url_rejects_garbage() {
        assert!(matches!(
            key_from_url("not a url"),
            Err(BlobError::InvalidUrl(_))
        ));
        assert!(matches!(
            key_from_url("https://acct.r2.cloudflarestorage.com/"),
            Err(BlobError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_resolve_content_type() {
        assert_eq!(resolve_content_type("notes.txt", None), "text/plain");
        assert_eq!(resolve_content_type("image.png", None), "image/png");
        assert_eq!(
            resolve_content_type("unknown.blob", None),
            "application/octet-stream"
        );
        assert_eq!(
            resolve_content_type("notes.txt", Some("application/json")),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_put_rejects_private_access() {
        let config = BlobStoreConfig {
            account_id: "acct123".to_string(),
            access_key_id: "AKID".to_string(),
            secret_access_key: "SECRET".to_string(),
            bucket_name: "my-bucket".to_string(),
            read_write_token: None,
        };
        let client = BlobStoreClient::new(config).unwrap();

        // Rejected before any remote call is issued
        let result = client
            .put(
                "notes.txt",
                Bytes::from_static(b"hi"),
                PutOptions {
                    access: Access::Private,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(BlobError::UnsupportedAccess(_))));
    }

    #[test]
    fn test_new_rejects_missing_credentials() {
        let config = BlobStoreConfig {
            account_id: "acct123".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket_name: "my-bucket".to_string(),
            read_write_token: None,
        };
        assert!(matches!(
            BlobStoreClient::new(config),
            Err(BlobError::Configuration(_))
        ));
    }
}
