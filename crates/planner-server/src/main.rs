//! `planner-server`: serve the catalog API from a SQLite file.
//!
//! ```text
//! planner-server [--config config.toml]
//! echo -n 'password' | planner-server --hash-password
//! ```

use std::{io, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use planner_server::{ServerConfig, hash_password, router};
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Planner catalog server")]
struct Cli {
  /// TOML configuration file; `PLANNER_*` variables override its keys.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Hash the password read from stdin for `admin_password_hash` and exit.
  #[arg(long)]
  hash_password: bool,
}

fn init_tracing() {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();
  tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  if cli.hash_password {
    let input = io::read_to_string(io::stdin()).context("failed to read stdin")?;
    let password = input.lines().next().unwrap_or_default();
    anyhow::ensure!(!password.is_empty(), "no password on stdin");
    println!("{}", hash_password(password)?);
    return Ok(());
  }

  init_tracing();

  let cfg = ServerConfig::load(&cli.config)?;
  let state = cfg.open_state().await?;

  let address = cfg.bind_address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  info!(%address, public_base_url = %cfg.public_base_url, "serving planner catalog");

  axum::serve(listener, router(state))
    .await
    .context("server error")
}
