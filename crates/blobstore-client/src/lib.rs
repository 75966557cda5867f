//! blobstore-client: minimal object-storage client for S3-compatible stores
//!
//! Provides put/del/head/list against a single remote bucket, with
//! token-gated delete/head authorization carried in object metadata and
//! collision-free storage keys derived from caller pathnames.

pub mod auth;
pub mod error;
pub mod services;

pub use auth::{AuthorizationStrategy, Operation, TokenMetadataStrategy};
pub use error::BlobError;
pub use services::{
    Access, BlobMeta, BlobStoreClient, BlobStoreConfig, DelOptions, HeadOptions, ListOptions,
    ListResult, PutOptions, PutResult,
};
