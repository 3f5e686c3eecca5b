use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use cubby::config::{format_config, Config};
use cubby::logging::{init_logging, LogConfig, Verbosity};
use cubby::plugin::{NasPlugin, Plugin};
use cubby::samba::ShareDefinition;
use tokio::signal;

#[derive(Parser)]
#[command(name = "cubby")]
#[command(version)]
#[command(about = "Turn a spare Linux box into a tiny NAS")]
#[command(
    long_about = "Exports one shared folder over Samba for the local network and over a small HTTP page for uploads, downloads and deletes. Runs standalone or embedded as a plugin."
)]
struct Cli {
    /// Path to the config file (default: ~/.config/cubby/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the NAS until interrupted
    Run,
    /// Print the smb.conf that would be written
    SmbConfig,
    /// Show the effective configuration
    Config,
}

/// Load the configuration, honoring an explicit --config path.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => {
            let log_config = LogConfig {
                verbosity: Verbosity::from_occurrences(cli.verbose),
                log_file: cli.log_file.clone(),
            };
            let _guard = init_logging(&log_config);

            if !config.enabled {
                println!("cubby is disabled in the config (set enabled = true)");
                return Ok(());
            }

            let mut plugin = NasPlugin::new(config);
            plugin.on_load();

            if !plugin.is_running() {
                plugin.on_unload();
                anyhow::bail!("Startup failed, check the logs (-v for more detail)");
            }

            if let Some(addr) = plugin.server_addr() {
                println!("Serving at: http://{}", addr);
            }
            println!("Press Ctrl+C to stop");

            shutdown_signal().await;

            plugin.on_unload();
            println!("\nStopped");
        }
        Commands::SmbConfig => {
            let definition = ShareDefinition::from_config(&config);
            print!("{}", definition.render()?);
        }
        Commands::Config => {
            println!("{}", format_config(&config));
        }
    }

    Ok(())
}

/// Wait for the shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
