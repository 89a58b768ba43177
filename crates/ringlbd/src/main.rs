//! `ringlbd` — command-script driver for the ringlb load balancer.
//!
//! Feeds a script of server membership changes and key/value traffic through
//! a single in-process ring and prints one report line per data command.
//!
//! # Usage
//!
//! ```text
//! ringlbd run commands.txt              # run a script file
//! ringlbd run < commands.txt            # run from stdin
//! ringlbd -c ringlb.toml run script.txt # custom ring shape
//! ringlbd check-config                  # print the effective config
//! ```

mod command;
mod config;
mod telemetry;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ringlb_placement::Ring;
use tracing::info;

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "ringlbd",
    version,
    about = "Consistent-hashing load balancer driver"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true, env = "RINGLB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a command script against a fresh ring.
    Run {
        /// Script to execute. Reads stdin when omitted.
        script: Option<PathBuf>,
    },

    /// Print the effective configuration.
    CheckConfig,
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    telemetry::init(&config.log.level);

    match cli.command {
        Commands::Run { script } => cmd_run(&config, script),
        Commands::CheckConfig => cmd_check_config(&config),
    }
}

fn cmd_run(config: &CliConfig, script: Option<PathBuf>) -> Result<()> {
    let mut ring = Ring::with_config(config.ring).context("failed to build ring")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let executed = match script {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            command::run_script(BufReader::new(file), &mut ring, &mut out)?
        }
        None => command::run_script(io::stdin().lock(), &mut ring, &mut out)?,
    };
    out.flush()?;

    info!(
        executed,
        servers = ring.server_count(),
        keys = ring.key_count(),
        "script finished"
    );
    ring.destroy();
    Ok(())
}

fn cmd_check_config(config: &CliConfig) -> Result<()> {
    let ring = &config.ring;
    println!("[ring]");
    println!("replicas_per_server = {}", ring.replicas_per_server);
    println!("replica_stride = {}", ring.replica_stride);
    println!("bucket_count = {}", ring.bucket_count);
    println!();
    println!("[log]");
    println!("level = {:?}", config.log.level);
    Ok(())
}
