//! Directory operations over local and cloud paths.
//!
//! Cloud storage has no directories. A cloud "directory" exists iff a
//! zero-byte [`METADATA_FILE`] object sits directly under its key prefix;
//! other objects sharing the prefix do not make it exist. Creating and
//! checking the marker are independent object operations, so concurrent
//! creation and deletion of the same directory from several processes is not
//! made consistent here.

use std::io;

use bytes::Bytes;
use tokio::fs::{self, DirBuilder};
use tracing::debug;

use crate::error::{EnvError, EnvResult};
use crate::path::{CellPath, METADATA_FILE};
use crate::remote::RemoteHandle;

/// Permission bits for directories created locally.
#[cfg_attr(not(unix), allow(dead_code))]
pub(crate) const DIR_MODE: u32 = 0o777;

pub(crate) async fn create_dir(
    remote: &RemoteHandle,
    path: &CellPath,
    acl: &str,
) -> EnvResult<()> {
    if !acl.is_empty() {
        return Err(EnvError::Unimplemented(format!(
            "CreateDir with ACL {acl:?} is not supported"
        )));
    }
    match path {
        CellPath::Remote(r) => {
            let marker = r.join(METADATA_FILE);
            let (store, bucket, key) = remote.resolve(&marker)?;
            debug!(%path, "creating cloud directory marker");
            store
                .put(bucket, key, Bytes::new())
                .await
                .map_err(|e| EnvError::remote("mkdir", path, e))
        }
        CellPath::Local(p) => {
            let mut builder = DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(DIR_MODE);
            builder
                .create(p)
                .await
                .map_err(|e| EnvError::io("mkdir", path, e))
        }
    }
}

/// Names of the entries one level below `path`, sorted.
pub(crate) async fn list_subdirs(
    remote: &RemoteHandle,
    path: &CellPath,
) -> EnvResult<Vec<String>> {
    let mut names = match path {
        CellPath::Remote(r) => {
            let (store, bucket, key) = remote.resolve(r)?;
            let prefix = if key.is_empty() || key.ends_with('/') {
                key.to_string()
            } else {
                format!("{key}/")
            };
            let listing = store
                .list(bucket, &prefix, Some("/"))
                .await
                .map_err(|e| EnvError::remote("list", path, e))?;
            listing
                .prefixes
                .iter()
                .filter_map(|p| p.strip_prefix(prefix.as_str()))
                .map(|name| name.trim_end_matches('/'))
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        }
        CellPath::Local(p) => {
            let mut entries = fs::read_dir(p)
                .await
                .map_err(|e| EnvError::io("list", path, e))?;
            let mut names = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| EnvError::io("list", path, e))?
            {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names
        }
    };
    names.sort();
    Ok(names)
}

pub(crate) async fn dir_exists(remote: &RemoteHandle, path: &CellPath) -> EnvResult<bool> {
    match path {
        CellPath::Remote(r) => {
            let marker = r.join(METADATA_FILE);
            let (store, bucket, key) = remote.resolve(&marker)?;
            store
                .exists(bucket, key)
                .await
                .map_err(|e| EnvError::remote("stat", path, e))
        }
        CellPath::Local(p) => match fs::metadata(p).await {
            Ok(meta) if meta.is_dir() => Ok(true),
            Ok(_) => Err(EnvError::FailedPrecondition(format!(
                "{path} is a file, not a directory"
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EnvError::io("stat", path, e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use object_store::memory::InMemory;
    use object_store::ObjectStore;
    use sax_store::{GcsRemoteStore, InMemoryRemoteStore};

    use crate::file;

    fn memory_remote() -> (RemoteHandle, Arc<InMemoryRemoteStore>) {
        let store = Arc::new(InMemoryRemoteStore::new());
        (RemoteHandle::connected(store.clone()), store)
    }

    /// The production adapter over an in-process object store.
    fn object_store_remote() -> RemoteHandle {
        let client: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let store = GcsRemoteStore::from_clients([("bucket".to_string(), client)]);
        RemoteHandle::connected(Arc::new(store))
    }

    // -----------------------------------------------------------------------
    // Local
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn local_create_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteHandle::unavailable("local only");
        let path = CellPath::local(dir.path().join("a").join("b").join("c"));

        create_dir(&remote, &path, "").await.unwrap();
        assert!(dir_exists(&remote, &path).await.unwrap());
        // Creating again is fine.
        create_dir(&remote, &path, "").await.unwrap();
    }

    #[tokio::test]
    async fn local_dir_exists_missing_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteHandle::unavailable("local only");
        let path = CellPath::local(dir.path().join("nope"));
        assert!(!dir_exists(&remote, &path).await.unwrap());
    }

    #[tokio::test]
    async fn local_dir_exists_on_file_is_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteHandle::unavailable("local only");
        let path = CellPath::local(dir.path().join("f"));
        file::write(&remote, &path, b"x").await.unwrap();

        let err = dir_exists(&remote, &path).await.unwrap_err();
        assert!(matches!(err, EnvError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn local_list_is_one_level() {
        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteHandle::unavailable("local only");
        let root = CellPath::local(dir.path());
        create_dir(&remote, &root.join("b"), "").await.unwrap();
        create_dir(&remote, &root.join("a").join("nested"), "").await.unwrap();

        assert_eq!(list_subdirs(&remote, &root).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn local_list_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteHandle::unavailable("local only");
        let err = list_subdirs(&remote, &CellPath::local(dir.path().join("nope")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn local_create_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteHandle::unavailable("local only");
        let path = dir.path().join("cell");
        create_dir(&remote, &CellPath::local(&path), "").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !DIR_MODE, 0);
        assert_ne!(mode & 0o700, 0);
    }

    // -----------------------------------------------------------------------
    // Remote
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn remote_create_writes_single_marker() {
        let (remote, store) = memory_remote();
        let path = CellPath::parse("gs://bucket/root/cell");

        create_dir(&remote, &path, "").await.unwrap();
        assert_eq!(store.keys("bucket"), vec!["root/cell/METADATA"]);
        assert!(dir_exists(&remote, &path).await.unwrap());
    }

    #[tokio::test]
    async fn remote_dir_needs_marker() {
        let (remote, _store) = memory_remote();
        let path = CellPath::parse("/gcs/bucket/root/cell");
        // An object under the prefix is not enough.
        file::write(&remote, &path.join("location.proto"), b"x").await.unwrap();
        assert!(!dir_exists(&remote, &path).await.unwrap());
    }

    #[tokio::test]
    async fn remote_dir_exists_on_file_is_false() {
        let (remote, _store) = memory_remote();
        let path = CellPath::parse("/gcs/bucket/root/f");
        file::write(&remote, &path, b"x").await.unwrap();
        assert!(!dir_exists(&remote, &path).await.unwrap());
    }

    #[tokio::test]
    async fn remote_list_is_one_level() {
        let (remote, _store) = memory_remote();
        let root = CellPath::parse("/gcs/bucket/root");
        create_dir(&remote, &root, "").await.unwrap();
        create_dir(&remote, &root.join("b"), "").await.unwrap();
        create_dir(&remote, &root.join("a"), "").await.unwrap();
        create_dir(&remote, &root.join("a").join("nested"), "").await.unwrap();

        assert_eq!(list_subdirs(&remote, &root).await.unwrap(), vec!["a", "b"]);

        let with_slash = CellPath::parse("/gcs/bucket/root/");
        assert_eq!(list_subdirs(&remote, &with_slash).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn remote_list_bucket_root() {
        let (remote, _store) = memory_remote();
        create_dir(&remote, &CellPath::parse("/gcs/bucket/x"), "").await.unwrap();
        let names = list_subdirs(&remote, &CellPath::parse("/gcs/bucket/")).await.unwrap();
        assert_eq!(names, vec!["x"]);
    }

    #[tokio::test]
    async fn object_store_listed_names_round_trip() {
        let remote = object_store_remote();
        let root = CellPath::parse("gs://bucket/root/");
        create_dir(&remote, &root.join("x~y"), "").await.unwrap();
        create_dir(&remote, &root.join("plain"), "").await.unwrap();
        create_dir(&remote, &root.join("plain").join("nested"), "").await.unwrap();
        file::write(&remote, &root.join("loose"), b"x").await.unwrap();

        let names = list_subdirs(&remote, &root).await.unwrap();
        assert_eq!(names, vec!["plain", "x~y"]);
        for name in &names {
            assert!(dir_exists(&remote, &root.join(name)).await.unwrap(), "{name}");
        }
        assert!(!dir_exists(&remote, &root.join("x%7Ey")).await.unwrap());
    }

    #[tokio::test]
    async fn remote_without_connection_fails_precondition() {
        let remote = RemoteHandle::unavailable("no credentials");
        let path = CellPath::parse("/gcs/bucket/root");
        for err in [
            create_dir(&remote, &path, "").await.unwrap_err(),
            list_subdirs(&remote, &path).await.unwrap_err(),
            dir_exists(&remote, &path).await.unwrap_err(),
        ] {
            assert!(matches!(err, EnvError::FailedPrecondition(_)));
        }
    }

    // -----------------------------------------------------------------------
    // ACLs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn acl_is_unimplemented_on_every_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (remote, store) = memory_remote();
        for path in [
            CellPath::local(dir.path().join("cell")),
            CellPath::parse("/gcs/bucket/root/cell"),
            CellPath::parse("/gcs/bucket"),
        ] {
            let err = create_dir(&remote, &path, "admins").await.unwrap_err();
            assert!(matches!(err, EnvError::Unimplemented(_)), "{path}");
        }
        assert!(store.is_empty());
        assert!(!dir.path().join("cell").exists());
    }
}
