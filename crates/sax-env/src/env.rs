//! The [`Env`] trait and its cloud implementation, [`CloudEnv`].

use async_trait::async_trait;
use sax_transport::{CellServer, Connection};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::EnvConfig;
use crate::dir;
use crate::election::{ElectionGate, ReleaseSignal};
use crate::error::{EnvError, EnvResult};
use crate::file;
use crate::path::CellPath;
use crate::remote::RemoteHandle;
use crate::root::{resolve_or_exit, RootSources};

/// Platform services Sax cell coordination depends on.
///
/// Implementations must be thread-safe (`Send + Sync`); every operation may
/// be called concurrently from many tasks. Operations do not honor deadlines:
/// dropping the returned future is the only way to abandon one.
#[async_trait]
pub trait Env: Send + Sync {
    /// Read the content of a file.
    async fn read_file(&self, path: &CellPath) -> EnvResult<Vec<u8>>;

    /// Read the content of a file, caching the result on repeated reads if
    /// the implementation can.
    async fn read_cached_file(&self, path: &CellPath) -> EnvResult<Vec<u8>>;

    /// Write the content of a file.
    async fn write_file(&self, path: &CellPath, data: &[u8]) -> EnvResult<()>;

    /// Write the content of a file so that readers never see a partial write.
    async fn write_file_atomically(&self, path: &CellPath, data: &[u8]) -> EnvResult<()>;

    /// Check whether a file exists. A directory at `path` is an error.
    async fn file_exists(&self, path: &CellPath) -> EnvResult<bool>;

    /// The directory where all Sax cells store their metadata.
    fn root_dir(&self) -> &CellPath;

    /// Create a directory and any missing parents. `acl` must be empty.
    async fn create_dir(&self, path: &CellPath, acl: &str) -> EnvResult<()>;

    /// List the entries one level below a directory.
    async fn list_subdirs(&self, path: &CellPath) -> EnvResult<Vec<String>>;

    /// Check whether a directory exists.
    async fn dir_exists(&self, path: &CellPath) -> EnvResult<bool>;

    /// Stream new content of a file whenever it changes.
    async fn watch(&self, path: &CellPath) -> EnvResult<mpsc::Receiver<Vec<u8>>>;

    /// Block until this caller holds leadership for `path`.
    async fn lead(&self, path: &CellPath) -> EnvResult<ReleaseSignal>;

    /// Pick a TCP port that is currently free.
    fn pick_unused_port(&self) -> EnvResult<u16>;

    /// Open an RPC channel to `target`.
    async fn dial(&self, target: &str) -> EnvResult<Connection>;

    /// The string all ACL names must start with.
    fn required_acl_name_prefix(&self) -> &str;

    /// Create an RPC server.
    fn new_server(&self) -> EnvResult<CellServer>;
}

/// [`Env`] over the local filesystem and Google Cloud Storage.
#[derive(Clone, Debug)]
pub struct CloudEnv {
    root: CellPath,
    remote: RemoteHandle,
    election: ElectionGate,
}

impl CloudEnv {
    pub fn new(root: CellPath, remote: RemoteHandle) -> Self {
        Self {
            root,
            remote,
            election: ElectionGate::new(),
        }
    }

    /// Share an existing election gate instead of the environment's own.
    pub fn with_election_gate(mut self, election: ElectionGate) -> Self {
        self.election = election;
        self
    }

    /// Resolve the root and connect to cloud storage. Exits the process if
    /// no root is configured.
    ///
    /// `root_flag` is the command-line root; the config file's `sax_root`
    /// stands in for it when absent.
    pub async fn init(config: &EnvConfig, root_flag: Option<String>) -> Self {
        let flag = root_flag.or_else(|| config.sax_root.clone());
        let root = resolve_or_exit(&RootSources::from_process(flag));
        let remote = RemoteHandle::from_env(config.remote_init_timeout()).await;
        info!(root = %root, remote = remote.is_available(), "platform environment ready");
        Self::new(root, remote)
    }

    pub fn remote(&self) -> &RemoteHandle {
        &self.remote
    }

    pub fn election(&self) -> &ElectionGate {
        &self.election
    }
}

#[async_trait]
impl Env for CloudEnv {
    async fn read_file(&self, path: &CellPath) -> EnvResult<Vec<u8>> {
        file::read(&self.remote, path).await
    }

    async fn read_cached_file(&self, path: &CellPath) -> EnvResult<Vec<u8>> {
        // No cache yet.
        self.read_file(path).await
    }

    async fn write_file(&self, path: &CellPath, data: &[u8]) -> EnvResult<()> {
        file::write(&self.remote, path, data).await
    }

    async fn write_file_atomically(&self, path: &CellPath, data: &[u8]) -> EnvResult<()> {
        file::write_atomically(&self.remote, path, data).await
    }

    async fn file_exists(&self, path: &CellPath) -> EnvResult<bool> {
        file::exists(&self.remote, path).await
    }

    fn root_dir(&self) -> &CellPath {
        &self.root
    }

    async fn create_dir(&self, path: &CellPath, acl: &str) -> EnvResult<()> {
        dir::create_dir(&self.remote, path, acl).await
    }

    async fn list_subdirs(&self, path: &CellPath) -> EnvResult<Vec<String>> {
        dir::list_subdirs(&self.remote, path).await
    }

    async fn dir_exists(&self, path: &CellPath) -> EnvResult<bool> {
        dir::dir_exists(&self.remote, path).await
    }

    async fn watch(&self, path: &CellPath) -> EnvResult<mpsc::Receiver<Vec<u8>>> {
        Err(EnvError::Unimplemented(format!(
            "watching {path} for changes is not supported"
        )))
    }

    async fn lead(&self, path: &CellPath) -> EnvResult<ReleaseSignal> {
        Ok(self.election.lead(path).await)
    }

    fn pick_unused_port(&self) -> EnvResult<u16> {
        Ok(sax_transport::pick_unused_port()?)
    }

    async fn dial(&self, target: &str) -> EnvResult<Connection> {
        Ok(sax_transport::connect(target).await?)
    }

    fn required_acl_name_prefix(&self) -> &str {
        sax_transport::REQUIRED_ACL_NAME_PREFIX
    }

    fn new_server(&self) -> EnvResult<CellServer> {
        Ok(CellServer::new())
    }
}
