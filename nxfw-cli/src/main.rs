//! nxfw CLI - download system update firmware from the CDN.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nxfw::config::ConfigFile;

use crate::commands::{config::ConfigCommands, decode, download, version};
use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "nxfw", version, about = "System update firmware downloader")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a firmware version (latest when omitted)
    Download(download::DownloadArgs),

    /// Print the entries of an extracted .cnmt file
    Decode(decode::DecodeArgs),

    /// Convert between packed and dotted version numbers
    Version(version::VersionArgs),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let _logging = nxfw::logging::init_logging(cli.verbose, config.logging.file.as_deref())
        .map_err(nxfw::FirmwareError::from)?;

    match cli.command {
        Commands::Download(args) => download::run(args, config),
        Commands::Decode(args) => decode::run(args),
        Commands::Version(args) => version::run(args),
        Commands::Config(command) => commands::config::run(command, cli.config.as_deref()),
    }
}
