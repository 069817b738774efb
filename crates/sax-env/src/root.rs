//! Resolution of the directory where all Sax cells keep their metadata.
//!
//! The root is either a local path (`/home/user/sax-root/`) or a cloud URL
//! (`gs://bucket/sax-root/`). Sources in order of precedence:
//!
//! 1. test mode, which uses a fixed directory under the system temp dir;
//! 2. the `--sax-root` command-line value;
//! 3. the `SAX_ROOT` environment variable, for when the location wrapper is
//!    embedded in a model server.
//!
//! With none of them set there is no safe default and the process exits.

use std::path::PathBuf;

use tracing::error;

use crate::path::{to_internal, CellPath};

/// Environment variable naming the root.
pub const SAX_ROOT_ENV: &str = "SAX_ROOT";

/// Environment variable that forces test mode when set.
pub const TEST_MODE_ENV: &str = "SAX_TEST_ROOT_MODE";

/// Name of the root directory used in test mode.
pub const TEST_ROOT_DIR: &str = "sax-test-root";

/// Every input the root can be resolved from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootSources {
    pub test_mode: bool,
    pub flag: Option<String>,
    pub env: Option<String>,
}

impl RootSources {
    /// Gather sources from the running process. `flag` is the command-line
    /// value, if any.
    pub fn from_process(flag: Option<String>) -> Self {
        Self {
            test_mode: cfg!(test) || std::env::var_os(TEST_MODE_ENV).is_some(),
            flag,
            env: std::env::var(SAX_ROOT_ENV).ok(),
        }
    }
}

/// The fixed root used in test mode.
pub fn test_root() -> PathBuf {
    std::env::temp_dir().join(TEST_ROOT_DIR)
}

/// Resolve the root, or `None` if no source is set. Empty values count as
/// unset.
pub fn resolve_root(sources: &RootSources) -> Option<CellPath> {
    if sources.test_mode {
        return Some(CellPath::Local(test_root()));
    }
    let set = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    set(&sources.flag)
        .or_else(|| set(&sources.env))
        .map(|root| CellPath::parse(&to_internal(&root)))
}

/// Resolve the root or terminate the process.
pub fn resolve_or_exit(sources: &RootSources) -> CellPath {
    match resolve_root(sources) {
        Some(root) => root,
        None => {
            error!(
                "Neither the --sax-root flag nor the {SAX_ROOT_ENV} environment variable is set"
            );
            std::process::exit(1);
        }
    }
}
