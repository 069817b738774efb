use std::net::SocketAddr;

use anyhow::Context;
use colored::Colorize;
use sax_env::{to_internal, CellPath, CloudEnv, Env, EnvConfig};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => EnvConfig::load(path).await?,
        None => EnvConfig::default(),
    };
    if let Command::Serve(args) = &cli.command {
        if let Some(bind) = &args.bind {
            config.server.bind_addr = bind
                .parse::<SocketAddr>()
                .with_context(|| format!("invalid bind address {bind}"))?;
        }
    }
    let env = CloudEnv::init(&config, cli.sax_root).await;

    match cli.command {
        Command::Root => {
            println!("{}", env.root_dir());
            Ok(())
        }
        Command::Cat(args) => cmd_cat(&env, args).await,
        Command::Put(args) => cmd_put(&env, args).await,
        Command::Exists(args) => cmd_exists(&env, args).await,
        Command::Mkdir(args) => cmd_mkdir(&env, args).await,
        Command::Ls(args) => cmd_ls(&env, args).await,
        Command::DirExists(args) => cmd_dir_exists(&env, args).await,
        Command::Port => {
            println!("{}", env.pick_unused_port()?);
            Ok(())
        }
        Command::Serve(_) => cmd_serve(&env, &config).await,
    }
}

/// Absolute paths (`/...`, `/gcs/...`, `gs://...`) are taken as given;
/// anything else is relative to the root.
fn resolve_path(root: &CellPath, path: &str) -> CellPath {
    let internal = to_internal(path);
    if internal.starts_with('/') {
        CellPath::parse(&internal)
    } else {
        root.join(path)
    }
}

async fn cmd_cat(env: &CloudEnv, args: PathArgs) -> anyhow::Result<()> {
    let path = resolve_path(env.root_dir(), &args.path);
    let data = env.read_file(&path).await?;
    println!("{}", String::from_utf8_lossy(&data));
    Ok(())
}

async fn cmd_put(env: &CloudEnv, args: PutArgs) -> anyhow::Result<()> {
    let path = resolve_path(env.root_dir(), &args.path);
    let data = match args.data {
        Some(data) => data.into_bytes(),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            buf
        }
    };
    if args.atomic {
        env.write_file_atomically(&path, &data).await?;
    } else {
        env.write_file(&path, &data).await?;
    }
    println!("{} Wrote {} bytes to {}", "✓".green().bold(), data.len(), path.to_string().bold());
    Ok(())
}

async fn cmd_exists(env: &CloudEnv, args: PathArgs) -> anyhow::Result<()> {
    let path = resolve_path(env.root_dir(), &args.path);
    print_presence(&path, env.file_exists(&path).await?);
    Ok(())
}

async fn cmd_mkdir(env: &CloudEnv, args: MkdirArgs) -> anyhow::Result<()> {
    let path = resolve_path(env.root_dir(), &args.path);
    env.create_dir(&path, &args.acl).await?;
    println!("{} Created {}", "✓".green().bold(), path.to_string().bold());
    Ok(())
}

async fn cmd_ls(env: &CloudEnv, args: PathArgs) -> anyhow::Result<()> {
    let path = resolve_path(env.root_dir(), &args.path);
    for name in env.list_subdirs(&path).await? {
        println!("{}", name.cyan());
    }
    Ok(())
}

async fn cmd_dir_exists(env: &CloudEnv, args: PathArgs) -> anyhow::Result<()> {
    let path = resolve_path(env.root_dir(), &args.path);
    print_presence(&path, env.dir_exists(&path).await?);
    Ok(())
}

async fn cmd_serve(env: &CloudEnv, config: &EnvConfig) -> anyhow::Result<()> {
    let server = env.new_server()?;
    println!(
        "Sax RPC server on {} (root: {})",
        config.server.bind_addr.to_string().bold(),
        env.root_dir()
    );
    for service in server.services() {
        println!("  {} {}", "service:".green(), service);
    }
    info!(addr = %config.server.bind_addr, "serving");
    server.bind(&config.server).await?;
    Ok(())
}

fn print_presence(path: &CellPath, present: bool) {
    if present {
        println!("{} {}", "✓".green().bold(), path);
    } else {
        println!("{} {}", "✗".red().bold(), path);
    }
}
