//! BlobStore client implementation

mod blob_service;
mod config;

pub use blob_service::{
    Access, BlobMeta, BlobStoreClient, DelOptions, HeadOptions, ListOptions, ListResult,
    PutOptions, PutResult, DEFAULT_LIST_LIMIT, TOKEN_METADATA_KEY,
};
pub use config::{BlobStoreConfig, STORAGE_DOMAIN};
