//! Configuration management for the `gcode-sim` command.
//!
//! Handles:
//! - Command-line argument parsing
//! - Dialect directory configuration

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for `gcode-sim`
#[derive(Debug, Parser)]
#[command(name = "gcode-sim")]
#[command(about = "Parse G-code and simulate its effect on a machine")]
#[command(version)]
pub struct Args {
    /// G-code file to read
    pub input: PathBuf,

    /// Explicitly specify the G-code dialect to use
    #[arg(long, help = "G-code dialect to use (e.g., 'linuxcnc', 'marlin2', 'prusa')")]
    pub dialect: Option<String>,

    /// Custom dialect directory to search for dialect files
    #[arg(long, help = "Directory containing dialect TOML files")]
    pub dialect_dir: Option<PathBuf>,

    /// Only report diagnostics
    #[arg(long)]
    pub validate: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    #[arg(
        long,
        default_value = "warn",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// Dialect name explicitly set via command line
    pub cli_dialect: Option<String>,
    /// Dialect directories, loaded in order; later ones override earlier ones
    pub dialect_dirs: Vec<PathBuf>,
    pub log_level: String,
    pub input: PathBuf,
    pub validate_only: bool,
    pub json: bool,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let mut dialect_dirs = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            dialect_dirs.push(config_dir.join("gcode-sim").join("dialects"));
        }

        if let Some(custom_dir) = args.dialect_dir {
            dialect_dirs.push(custom_dir);
        }

        Ok(Config {
            cli_dialect: args.dialect,
            dialect_dirs,
            log_level: args.log_level,
            input: args.input,
            validate_only: args.validate,
            json: args.json,
        })
    }

    /// Dialect name, by priority: command line, then a modeline found in
    /// the document, then `None` for the registry's default.
    pub fn effective_dialect(&self, modeline: Option<String>) -> Option<String> {
        self.cli_dialect.clone().or(modeline)
    }
}
