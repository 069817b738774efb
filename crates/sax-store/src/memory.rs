use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::traits::{Listing, ObjectAttrs, RemoteStore};

/// In-memory object store keyed by `(bucket, key)`.
///
/// Intended for tests and embedding. Objects live in a `BTreeMap` behind a
/// `RwLock`, so prefix listings come out sorted. Buckets spring into
/// existence on first write.
pub struct InMemoryRemoteStore {
    objects: RwLock<BTreeMap<(String, String), Bytes>>,
}

impl InMemoryRemoteStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of objects across all buckets.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no object is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// All keys stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Remove all objects.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_bucket(bucket: &str) -> StoreResult<()> {
    if bucket.is_empty() || bucket.contains('/') {
        return Err(StoreError::InvalidBucket(bucket.to_string()));
    }
    Ok(())
}

fn not_found(bucket: &str, key: &str) -> StoreError {
    StoreError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        check_bucket(bucket)?;
        let map = self.objects.read().expect("lock poisoned");
        map.get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<()> {
        check_bucket(bucket)?;
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> StoreResult<ObjectAttrs> {
        check_bucket(bucket)?;
        let map = self.objects.read().expect("lock poisoned");
        let data = map
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| not_found(bucket, key))?;
        Ok(ObjectAttrs {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: data.len() as u64,
        })
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> StoreResult<Listing> {
        check_bucket(bucket)?;
        let delimiter = delimiter.filter(|d| !d.is_empty());
        let map = self.objects.read().expect("lock poisoned");

        let mut listing = Listing::default();
        let mut prefixes = BTreeSet::new();
        // Keys sharing a prefix are contiguous in (bucket, key) order.
        for (b, key) in map.range((bucket.to_string(), prefix.to_string())..).map(|(k, _)| k) {
            if b != bucket || !key.starts_with(prefix) {
                break;
            }
            let rest = &key[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d).map(|i| i + d.len())) {
                Some(end) => {
                    prefixes.insert(format!("{prefix}{}", &rest[..end]));
                }
                None => listing.objects.push(key.clone()),
            }
        }
        listing.prefixes = prefixes.into_iter().collect();
        Ok(listing)
    }
}

impl std::fmt::Debug for InMemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRemoteStore")
            .field("object_count", &self.len())
            .finish()
    }
}
