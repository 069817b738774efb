//! File operations over local and cloud paths.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{EnvError, EnvResult};
use crate::path::CellPath;
use crate::remote::RemoteHandle;

/// Permission bits for regular files created locally.
#[cfg_attr(not(unix), allow(dead_code))]
pub(crate) const FILE_MODE: u32 = 0o644;

pub(crate) async fn read(remote: &RemoteHandle, path: &CellPath) -> EnvResult<Vec<u8>> {
    match path {
        CellPath::Remote(r) => {
            let (store, bucket, key) = remote.resolve(r)?;
            debug!(%path, "reading cloud file");
            let data = store
                .get(bucket, key)
                .await
                .map_err(|e| EnvError::remote("read", path, e))?;
            Ok(data.to_vec())
        }
        CellPath::Local(p) => fs::read(p).await.map_err(|e| EnvError::io("read", path, e)),
    }
}

pub(crate) async fn write(remote: &RemoteHandle, path: &CellPath, data: &[u8]) -> EnvResult<()> {
    match path {
        CellPath::Remote(r) => {
            let (store, bucket, key) = remote.resolve(r)?;
            debug!(%path, len = data.len(), "writing cloud file");
            store
                .put(bucket, key, Bytes::copy_from_slice(data))
                .await
                .map_err(|e| EnvError::remote("write", path, e))
        }
        CellPath::Local(p) => write_local(p, data, false)
            .await
            .map_err(|e| EnvError::io("write", path, e)),
    }
}

/// Write so that no reader ever sees a partially written file.
///
/// Cloud object writes are already all-or-nothing. Locally the data goes to
/// a uniquely named sibling first and is then renamed over the target; of
/// several concurrent writers the last rename wins.
pub(crate) async fn write_atomically(
    remote: &RemoteHandle,
    path: &CellPath,
    data: &[u8],
) -> EnvResult<()> {
    let target = match path {
        CellPath::Remote(_) => return write(remote, path, data).await,
        CellPath::Local(p) => p,
    };

    let temp = temp_sibling(target);
    debug!(%path, temp = %temp.display(), "writing file atomically");
    if let Err(e) = write_local(&temp, data, true).await {
        let _ = fs::remove_file(&temp).await;
        return Err(EnvError::io("write", temp.display(), e));
    }
    if let Err(e) = fs::rename(&temp, target).await {
        let _ = fs::remove_file(&temp).await;
        return Err(EnvError::io("rename", path, e));
    }
    Ok(())
}

pub(crate) async fn exists(remote: &RemoteHandle, path: &CellPath) -> EnvResult<bool> {
    match path {
        CellPath::Remote(r) => {
            let (store, bucket, key) = remote.resolve(r)?;
            store
                .exists(bucket, key)
                .await
                .map_err(|e| EnvError::remote("stat", path, e))
        }
        CellPath::Local(p) => match fs::metadata(p).await {
            Ok(meta) if meta.is_dir() => Err(EnvError::FailedPrecondition(format!(
                "{path} is a directory, not a file"
            ))),
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EnvError::io("stat", path, e)),
        },
    }
}

/// `<path>.<unix nanos>.<random u64 as 16 hex digits>`, in the same directory
/// as `path` so the final rename never crosses filesystems.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{nanos}.{:016x}", rand::random::<u64>()));
    PathBuf::from(name)
}

async fn write_local(path: &Path, data: &[u8], sync: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    if sync {
        file.sync_all().await?;
    }
    file.flush().await
}
