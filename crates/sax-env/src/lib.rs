//! Platform environment for Sax cells.
//!
//! Cell coordination (membership, address publication, leader discovery)
//! needs a handful of platform services: files, directories, a leader lock,
//! and RPC plumbing. This crate provides them behind one path-addressed
//! interface, whether the cell root lives on a local disk or in Google Cloud
//! Storage.
//!
//! # Architecture
//!
//! - **Paths** are classified once into a [`CellPath`]: `Local` for
//!   filesystem paths, `Remote` for `/gcs/bucket/key` (or `gs://bucket/key`)
//!   locations.
//! - **Remote access** goes through a [`RemoteHandle`], established once at
//!   startup and injected. If it could not be established, remote
//!   operations fail with [`ErrorCode::FailedPrecondition`].
//! - **Directories** on cloud storage are emulated with a zero-byte
//!   `METADATA` marker object.
//! - **Leader election** is an in-process gate ([`ElectionGate`]), not a
//!   distributed lock.
//!
//! # Modules
//!
//! - [`path`] -- path classification and `gs://` normalization
//! - [`remote`] -- the cloud storage handle
//! - [`root`] -- resolution of the cell metadata root
//! - [`election`] -- the in-process leader election gate
//! - [`env`] -- the [`Env`] trait and [`CloudEnv`]
//! - [`config`] -- TOML configuration
//! - [`error`] -- error types

pub mod config;
mod dir;
pub mod election;
pub mod env;
pub mod error;
mod file;
pub mod path;
pub mod remote;
pub mod root;

pub use config::EnvConfig;
pub use election::{ElectionGate, ReleaseSignal};
pub use env::{CloudEnv, Env};
pub use error::{EnvError, EnvResult, ErrorCode};
pub use path::{is_remote, to_internal, CellPath, RemotePath, METADATA_FILE};
pub use remote::RemoteHandle;
pub use root::{resolve_or_exit, resolve_root, RootSources};
