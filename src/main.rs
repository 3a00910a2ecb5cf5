mod api;
mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod context;
mod credentials;
mod error;
mod event;
mod logging;
mod query;
mod stats;
mod tracker;
mod ui;
mod validation;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "punch")]
#[command(about = "A terminal client for the punch time tracker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/punch/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Server URL, overrides the config file
  #[arg(short, long)]
  server: Option<String>,

  /// Run one command instead of the TUI
  #[command(subcommand)]
  command: Option<cli::Command>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override server if specified on command line
  if let Some(server) = args.server {
    config.server.url = server;
  }

  let _log_guard = logging::init(&config::Config::data_dir()?.join("logs"))?;
  tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting punch");

  let ctx = context::AppContext::new(&config, credentials::CredentialStore::default_location())?;

  match args.command {
    Some(command) => cli::run(&ctx, command).await?,
    None => {
      let mut app = app::App::new(ctx, &config);
      app.run().await?;
    }
  }

  Ok(())
}
