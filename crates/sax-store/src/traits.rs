use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;

/// Attributes of a stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectAttrs {
    pub bucket: String,
    pub key: String,
    pub size: u64,
}

/// Result of a listing call.
///
/// With a delimiter, keys that continue past the delimiter are folded into
/// `prefixes` (each ending with the delimiter) and only keys directly under
/// the listed prefix show up in `objects`. Both lists hold full keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    pub objects: Vec<String>,
    pub prefixes: Vec<String>,
}

/// Bucket-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - `put` replaces the whole object in one step; a concurrent `get` sees
///   either the previous object or the new one, never a mix.
/// - `head` and `get` on a missing key fail with `StoreError::NotFound`.
/// - Listing is one level deep when a delimiter is given.
/// - Implementations are shared across tasks and must be `Send + Sync`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the full content of an object.
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Bytes>;

    /// Create or replace an object. The write is finalized when this returns.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<()>;

    /// Fetch the attributes of an object without reading it.
    async fn head(&self, bucket: &str, key: &str) -> StoreResult<ObjectAttrs>;

    /// List objects whose keys start with `prefix`.
    ///
    /// Pass `Some("/")` to stop at one path component below `prefix`.
    async fn list(&self, bucket: &str, prefix: &str, delimiter: Option<&str>)
        -> StoreResult<Listing>;

    /// Check whether an object exists.
    ///
    /// Default implementation calls `head()` and maps "not found" to `false`.
    /// Any other failure is propagated unclassified.
    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        match self.head(bucket, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
