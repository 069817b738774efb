use std::sync::Arc;
use std::time::Duration;

use sax_store::{GcsRemoteStore, RemoteStore};
use tracing::{info, warn};

use crate::error::{EnvError, EnvResult};
use crate::path::RemotePath;

/// The process's connection to cloud storage, established once at startup.
///
/// Either connected, or unavailable with the reason recorded. An unavailable
/// handle never reconnects: every remote operation fails with
/// `FailedPrecondition` for the rest of the process.
#[derive(Clone)]
pub struct RemoteHandle {
    inner: Result<Arc<dyn RemoteStore>, Arc<str>>,
}

impl RemoteHandle {
    pub fn connected(store: Arc<dyn RemoteStore>) -> Self {
        Self { inner: Ok(store) }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self {
            inner: Err(Arc::from(reason)),
        }
    }

    /// Build a Google Cloud Storage client from ambient credentials.
    ///
    /// A credential is fetched up front, so a process without credentials
    /// learns it here rather than on its first remote operation. Never
    /// fails: on error (or if `timeout` elapses first) a warning is logged
    /// and an unavailable handle is returned, so local paths keep working.
    pub async fn from_env(timeout: Duration) -> Self {
        let reason = match tokio::time::timeout(timeout, GcsRemoteStore::from_env()).await {
            Ok(Ok(store)) => {
                info!("Google Cloud Storage client ready");
                return Self::connected(Arc::new(store));
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no credentials obtained within {timeout:?}"),
        };
        warn!(
            %reason,
            "Error creating a Google Cloud Storage client, can only access local files from now on"
        );
        Self::unavailable(reason)
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_ok()
    }

    /// The underlying store, or `FailedPrecondition` if there is none.
    pub fn store(&self) -> EnvResult<&dyn RemoteStore> {
        match &self.inner {
            Ok(store) => Ok(store.as_ref()),
            Err(reason) => Err(EnvError::FailedPrecondition(format!(
                "no Google Cloud Storage connection: {reason}"
            ))),
        }
    }

    /// Resolve a remote path to the store plus its bucket and object key.
    pub(crate) fn resolve<'a>(
        &'a self,
        path: &'a RemotePath,
    ) -> EnvResult<(&'a dyn RemoteStore, &'a str, &'a str)> {
        let store = self.store()?;
        let (bucket, key) = path.bucket_and_object()?;
        Ok((store, bucket, key))
    }
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Ok(_) => f.debug_struct("RemoteHandle").field("available", &true).finish(),
            Err(reason) => f
                .debug_struct("RemoteHandle")
                .field("available", &false)
                .field("reason", reason)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::CellPath;
    use sax_store::InMemoryRemoteStore;

    fn remote(path: &str) -> RemotePath {
        match CellPath::parse(path) {
            CellPath::Remote(r) => r,
            CellPath::Local(_) => panic!("expected remote path"),
        }
    }

    #[test]
    fn unavailable_is_failed_precondition() {
        let handle = RemoteHandle::unavailable("no credentials");
        assert!(!handle.is_available());
        let path = remote("/gcs/bucket/key");
        let err = handle.resolve(&path).err().unwrap();
        assert!(matches!(err, EnvError::FailedPrecondition(_)));
        assert!(err.to_string().contains("no credentials"));
    }

    #[test]
    fn missing_store_checked_before_path_shape() {
        let handle = RemoteHandle::unavailable("offline");
        let path = remote("/gcs/bucket");
        let err = handle.resolve(&path).err().unwrap();
        assert!(matches!(err, EnvError::FailedPrecondition(_)));
    }

    #[test]
    fn connected_resolves_bucket_and_key() {
        let handle = RemoteHandle::connected(Arc::new(InMemoryRemoteStore::new()));
        assert!(handle.is_available());
        let path = remote("/gcs/bucket/cells/a");
        let (_, bucket, key) = handle.resolve(&path).unwrap();
        assert_eq!((bucket, key), ("bucket", "cells/a"));
    }

    #[test]
    fn connected_rejects_bare_bucket() {
        let handle = RemoteHandle::connected(Arc::new(InMemoryRemoteStore::new()));
        let path = remote("/gcs/bucket");
        let err = handle.resolve(&path).err().unwrap();
        assert!(matches!(err, EnvError::InvalidArgument(_)));
    }

    const CREDENTIAL_VARS: &[&str] = &[
        "GOOGLE_SERVICE_ACCOUNT",
        "GOOGLE_SERVICE_ACCOUNT_PATH",
        "GOOGLE_SERVICE_ACCOUNT_KEY",
        "GOOGLE_APPLICATION_CREDENTIALS",
    ];

    #[tokio::test]
    async fn missing_credentials_leave_handle_unavailable() {
        for var in CREDENTIAL_VARS {
            std::env::remove_var(var);
        }

        std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", "/nonexistent/sax/credentials.json");
        let handle = RemoteHandle::from_env(Duration::from_secs(5)).await;
        std::env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");
        assert!(!handle.is_available());
        let err = handle.resolve(&remote("/gcs/bucket/key")).err().unwrap();
        assert_eq!(err.code(), crate::error::ErrorCode::FailedPrecondition);

        // Nothing configured at all: falls back to the metadata server, which
        // is unreachable here.
        let handle = RemoteHandle::from_env(Duration::from_secs(3)).await;
        assert!(!handle.is_available());
        let err = handle.resolve(&remote("/gcs/bucket/key")).err().unwrap();
        assert_eq!(err.code(), crate::error::ErrorCode::FailedPrecondition);
    }

    #[test]
    fn debug_hides_store() {
        let handle = RemoteHandle::unavailable("offline");
        let s = format!("{handle:?}");
        assert!(s.contains("available: false"));
        assert!(s.contains("offline"));
    }
}
