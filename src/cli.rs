// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "camelpad")]
#[command(author, version, about = "Gesture bridge for the camel-pad macropad")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/camelpad/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Feed a button script through the gesture engine in real time
    #[command(visible_alias = "r")]
    Replay {
        /// Script file, or "-" for stdin
        script: PathBuf,

        /// Print gestures as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    ShowConfig,
}
