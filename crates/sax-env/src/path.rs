//! Path classification.
//!
//! Users name cloud locations with `gs://bucket/key` URLs. Internally those
//! become `/gcs/bucket/key`, so cloud and local locations can be handled
//! uniformly as path strings. [`CellPath`] tags each path with its backend
//! once, at the boundary, so operations never sniff prefixes again.

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{EnvError, EnvResult};

/// Scheme of user-facing Google Cloud Storage URLs.
pub const GCS_URL_PREFIX: &str = "gs://";

/// Prefix of internal Google Cloud Storage paths.
pub const GCS_PATH_PREFIX: &str = "/gcs/";

/// Name of the zero-byte marker object that makes a cloud "directory" exist.
pub const METADATA_FILE: &str = "METADATA";

/// Returns `true` if `path` is an internal cloud storage path.
pub fn is_remote(path: &str) -> bool {
    path.starts_with(GCS_PATH_PREFIX)
}

/// Convert a `gs://` URL to its internal `/gcs/` form. Anything else is
/// returned unchanged.
pub fn to_internal(url: &str) -> String {
    match url.strip_prefix(GCS_URL_PREFIX) {
        Some(rest) => format!("{GCS_PATH_PREFIX}{rest}"),
        None => url.to_string(),
    }
}

/// A cloud storage location: everything after the internal prefix,
/// i.e. `bucket/key`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemotePath(String);

impl RemotePath {
    /// The `bucket/key` remainder.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into bucket and object key at the first `/`.
    ///
    /// Fails with `InvalidArgument` if there is no separator: a bare bucket
    /// does not name an object or a directory.
    pub fn bucket_and_object(&self) -> EnvResult<(&str, &str)> {
        self.0.split_once('/').ok_or_else(|| {
            EnvError::InvalidArgument(format!("invalid GCS file path {self}: no object name"))
        })
    }

    /// Append one path component.
    pub fn join(&self, name: &str) -> RemotePath {
        let name = name.trim_start_matches('/');
        if self.0.ends_with('/') {
            RemotePath(format!("{}{}", self.0, name))
        } else {
            RemotePath(format!("{}/{}", self.0, name))
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GCS_PATH_PREFIX}{}", self.0)
    }
}

/// A path tagged with the backend that serves it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellPath {
    Local(PathBuf),
    Remote(RemotePath),
}

impl CellPath {
    /// Classify a path string. `gs://` URLs are normalized first.
    pub fn parse(path: &str) -> Self {
        let path = to_internal(path);
        match path.strip_prefix(GCS_PATH_PREFIX) {
            Some(rest) => CellPath::Remote(RemotePath(rest.to_string())),
            None => CellPath::Local(PathBuf::from(path)),
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        CellPath::Local(path.into())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, CellPath::Remote(_))
    }

    /// The local filesystem path, if this is a local path.
    pub fn as_local(&self) -> Option<&Path> {
        match self {
            CellPath::Local(p) => Some(p),
            CellPath::Remote(_) => None,
        }
    }

    /// Append one path component, keeping the backend.
    pub fn join(&self, name: &str) -> Self {
        match self {
            CellPath::Local(p) => CellPath::Local(p.join(name)),
            CellPath::Remote(r) => CellPath::Remote(r.join(name)),
        }
    }
}

impl fmt::Display for CellPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellPath::Local(p) => write!(f, "{}", p.display()),
            CellPath::Remote(r) => r.fmt(f),
        }
    }
}

impl FromStr for CellPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CellPath::parse(s))
    }
}

impl From<&str> for CellPath {
    fn from(s: &str) -> Self {
        CellPath::parse(s)
    }
}
