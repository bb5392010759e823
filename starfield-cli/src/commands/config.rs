//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use clap::Subcommand;
use starfield::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    Show,

    /// Write a default configuration file if none exists
    Init {
        /// Overwrite an existing file with defaults
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init { force } => run_init(force),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    let path = config_file_path();
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist; run 'starfield config init' to create it)");
    }
    Ok(())
}

/// Print the configuration as loaded, defaults included.
fn run_show() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    print!("{}", config.to_ini_string());
    Ok(())
}

/// Create the config file.
fn run_init(force: bool) -> Result<(), CliError> {
    let path = if force {
        let path = config_file_path();
        ConfigFile::default().save_to(&path)?;
        path
    } else {
        if config_file_path().exists() {
            println!("Configuration already exists (use --force to overwrite)");
        }
        ConfigFile::ensure_exists()?
    };
    println!("Configuration: {}", path.display());
    Ok(())
}
