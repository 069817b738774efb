use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{CredentialProvider, ObjectStore, PutPayload};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{Listing, ObjectAttrs, RemoteStore};

/// Bucket name used to validate the ambient credentials configuration.
const PROBE_BUCKET: &str = "sax-credentials-probe";

/// Google Cloud Storage backend.
///
/// `object_store` clients are bound to a single bucket, so one client is
/// built per bucket on first use and cached. Credentials come from the
/// environment (`GOOGLE_SERVICE_ACCOUNT`, `GOOGLE_APPLICATION_CREDENTIALS`,
/// or the metadata server).
///
/// Keys are passed through verbatim. Keys that are empty, start or end with
/// `/`, or contain empty segments are rejected with
/// [`StoreError::InvalidKey`].
pub struct GcsRemoteStore {
    buckets: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl GcsRemoteStore {
    /// Create the store after obtaining a credential from the environment.
    ///
    /// Fails if no credential source is configured or the configured one
    /// cannot produce a token. Without credentials this may wait on the
    /// metadata server, so callers should bound it with a timeout.
    pub async fn from_env() -> StoreResult<Self> {
        let probe = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(PROBE_BUCKET)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        probe
            .credentials()
            .get_credential()
            .await
            .map_err(|e| StoreError::Config(format!("no usable credentials: {e}")))?;
        Ok(Self::from_clients(Vec::new()))
    }

    /// Create the store over already-built per-bucket clients.
    ///
    /// Buckets without a client get one built from the environment on first
    /// use.
    pub fn from_clients<I>(clients: I) -> Self
    where
        I: IntoIterator<Item = (String, Arc<dyn ObjectStore>)>,
    {
        Self {
            buckets: RwLock::new(clients.into_iter().collect()),
        }
    }

    fn bucket(&self, name: &str) -> StoreResult<Arc<dyn ObjectStore>> {
        if let Some(client) = self.buckets.read().expect("lock poisoned").get(name) {
            return Ok(Arc::clone(client));
        }
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::InvalidBucket(name.to_string()));
        }

        let client: Arc<dyn ObjectStore> = Arc::new(
            GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(name)
                .build()
                .map_err(|e| StoreError::Config(e.to_string()))?,
        );
        debug!(bucket = name, "created GCS client");
        let mut buckets = self.buckets.write().expect("lock poisoned");
        Ok(Arc::clone(buckets.entry(name.to_string()).or_insert(client)))
    }
}

fn invalid_key(bucket: &str, key: &str, reason: impl Into<String>) -> StoreError {
    StoreError::InvalidKey {
        bucket: bucket.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Build an object location that renders back to exactly `key`.
fn object_path(bucket: &str, key: &str) -> StoreResult<ObjectPath> {
    let path = ObjectPath::parse(key).map_err(|e| invalid_key(bucket, key, e.to_string()))?;
    if key.is_empty() || path.as_ref() != key {
        return Err(invalid_key(
            bucket,
            key,
            "keys must be non-empty and must not start or end with '/'",
        ));
    }
    Ok(path)
}

fn map_err(bucket: &str, key: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        other => StoreError::Backend {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl RemoteStore for GcsRemoteStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let client = self.bucket(bucket)?;
        let location = object_path(bucket, key)?;
        let result = client
            .get(&location)
            .await
            .map_err(|e| map_err(bucket, key, e))?;
        result.bytes().await.map_err(|e| map_err(bucket, key, e))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<()> {
        let client = self.bucket(bucket)?;
        let location = object_path(bucket, key)?;
        client
            .put(&location, PutPayload::from(data))
            .await
            .map_err(|e| map_err(bucket, key, e))?;
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> StoreResult<ObjectAttrs> {
        let client = self.bucket(bucket)?;
        let location = object_path(bucket, key)?;
        let meta = client
            .head(&location)
            .await
            .map_err(|e| map_err(bucket, key, e))?;
        Ok(ObjectAttrs {
            bucket: bucket.to_string(),
            key: meta.location.to_string(),
            size: meta.size as u64,
        })
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> StoreResult<Listing> {
        let client = self.bucket(bucket)?;
        let delimited = match delimiter {
            None => false,
            Some("/") => true,
            // object_store only understands "/" as a hierarchy delimiter.
            Some(d) => {
                return Err(StoreError::Backend {
                    bucket: bucket.to_string(),
                    key: prefix.to_string(),
                    reason: format!("unsupported delimiter {d:?}"),
                })
            }
        };

        // object_store lists whole path segments: list the enclosing
        // directory and keep what matches the raw prefix.
        let dir = &prefix[..prefix.rfind('/').unwrap_or(0)];
        let location = if dir.is_empty() {
            None
        } else {
            Some(object_path(bucket, dir)?)
        };

        if delimited {
            let result = client
                .list_with_delimiter(location.as_ref())
                .await
                .map_err(|e| map_err(bucket, prefix, e))?;
            Ok(Listing {
                objects: result
                    .objects
                    .into_iter()
                    .map(|m| m.location.to_string())
                    .filter(|k| k.starts_with(prefix))
                    .collect(),
                prefixes: result
                    .common_prefixes
                    .into_iter()
                    .map(|p| format!("{p}/"))
                    .filter(|p| p.starts_with(prefix))
                    .collect(),
            })
        } else {
            let objects: Vec<String> = client
                .list(location.as_ref())
                .map_ok(|m| m.location.to_string())
                .try_collect()
                .await
                .map_err(|e| map_err(bucket, prefix, e))?;
            Ok(Listing {
                objects: objects.into_iter().filter(|k| k.starts_with(prefix)).collect(),
                prefixes: Vec::new(),
            })
        }
    }
}

impl std::fmt::Debug for GcsRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets: Vec<String> = self
            .buckets
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        f.debug_struct("GcsRemoteStore").field("buckets", &buckets).finish()
    }
}
