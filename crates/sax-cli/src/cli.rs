use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sax-env",
    about = "Sax platform environment: inspect and edit cell metadata on local disk or GCS",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Sax cell root, e.g. /local/dir or gs://bucket/dir
    #[arg(long = "sax-root", global = true)]
    pub sax_root: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved cell root
    Root,
    /// Print the content of a file
    Cat(PathArgs),
    /// Write a file from an argument or stdin
    Put(PutArgs),
    /// Check whether a file exists
    Exists(PathArgs),
    /// Create a directory
    Mkdir(MkdirArgs),
    /// List entries one level below a directory
    Ls(PathArgs),
    /// Check whether a directory exists
    DirExists(PathArgs),
    /// Print a free TCP port
    Port,
    /// Start an RPC server with introspection enabled
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct PathArgs {
    /// Path relative to the cell root, or absolute (/..., /gcs/..., gs://...)
    pub path: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub path: String,
    /// Content to write; read from stdin when absent
    pub data: Option<String>,
    /// Write to a temporary file and rename it into place
    #[arg(long)]
    pub atomic: bool,
}

#[derive(Args)]
pub struct MkdirArgs {
    pub path: String,
    #[arg(long, default_value = "")]
    pub acl: String,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind; overrides the config file
    #[arg(long)]
    pub bind: Option<String>,
}
