// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staydesk - guest messaging and rental contracts for short-stay hosts.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use staydesk_config::StaydeskConfig;

/// Staydesk - guest messaging and rental contracts for short-stay hosts.
#[derive(Parser, Debug)]
#[command(name = "staydesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sweeper and the HTTP API until interrupted.
    Serve,
    /// Dispatch every due message once, print the report, and exit.
    Sweep,
    /// Validate the configuration and print the effective values.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> StaydeskConfig {
    let loaded = match path {
        Some(path) => staydesk_config::load_and_validate_path(path),
        None => staydesk_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            staydesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.service.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Sweep) => {
            init_tracing(&config.service.log_level);
            serve::run_sweep_once(config).await
        }
        Some(Commands::CheckConfig) => {
            eprintln!(
                "staydesk: config ok (service.name={}, storage.database_path={})",
                config.service.name, config.storage.database_path
            );
            Ok(())
        }
        None => {
            println!("staydesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("staydesk: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("staydesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
