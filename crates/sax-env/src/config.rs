use std::path::Path;
use std::time::Duration;

use sax_transport::ServerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EnvError, EnvResult};

/// Platform environment configuration, usually read from a TOML file.
///
/// ```toml
/// sax_root = "gs://bucket/sax-root/"
/// remote_init_timeout_secs = 10
///
/// [server]
/// bind_addr = "0.0.0.0:10000"
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Root used when no `--sax-root` flag is given.
    pub sax_root: Option<String>,
    /// Upper bound on building the cloud storage client at startup.
    pub remote_init_timeout_secs: u64,
    pub server: ServerConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            sax_root: None,
            remote_init_timeout_secs: 10,
            server: ServerConfig::default(),
        }
    }
}

impl EnvConfig {
    pub fn from_toml_str(s: &str) -> EnvResult<Self> {
        toml::from_str(s).map_err(|e| EnvError::Config(e.to_string()))
    }

    pub async fn load(path: &Path) -> EnvResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EnvError::io("load config", path.display(), e))?;
        Self::from_toml_str(&text)
    }

    pub fn remote_init_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_init_timeout_secs)
    }
}
