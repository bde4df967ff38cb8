//! camelpad: gesture bridge for the camel-pad macropad
//!
//! Loads the pad config and runs button input through the gesture engine.

mod cli;
mod config;
mod replay;
mod script;

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use cli::{Cli, Commands};
use config::PadConfig;
use script::Script;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(PadConfig::default_path);

    match cli.command {
        Commands::Replay { script, json } => {
            info!("Loading config from {:?}", config_path);
            let config = PadConfig::load(&config_path)?;
            let script = read_script(&script)?;

            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                r.store(false, Ordering::SeqCst);
            })
            .context("Failed to install Ctrl+C handler")?;

            replay::run(&config, &script, json, running).await
        }
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            PadConfig::default().save(&config_path)?;
            println!("Wrote {}", config_path.display());
            Ok(())
        }
        Commands::ShowConfig => {
            if !config_path.exists() {
                warn!("{} not found, showing defaults", config_path.display());
            }
            let config = PadConfig::load(&config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Read and parse a script file, `-` meaning stdin.
fn read_script(path: &Path) -> Result<Script> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read script from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?
    };
    Ok(text.parse::<Script>()?)
}
