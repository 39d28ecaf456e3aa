//! `nxfw config` - inspect and edit the INI settings file.

use std::fmt::Write;
use std::path::Path;

use clap::Subcommand;
use nxfw::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one setting
    Get {
        /// Setting name as section.key, e.g. download.parallel
        key: String,
    },

    /// Change one setting and save the file
    Set {
        /// Setting name as section.key, e.g. download.parallel
        key: String,

        /// Value to set (empty clears optional keys)
        value: String,
    },

    /// Print every setting grouped by section
    List,

    /// Print where the settings file lives
    Path,
}

/// Run a config subcommand against `file` (default location when `None`).
pub fn run(command: ConfigCommands, file: Option<&Path>) -> Result<(), CliError> {
    let path = file.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Get { key } => run_get(&path, &key),
        ConfigCommands::Set { key, value } => run_set(&path, &key, &value),
        ConfigCommands::List => run_list(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'nxfw config list' to see available keys.",
            key
        ))
    })
}

fn run_get(path: &Path, key: &str) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    println!("{}", display_value(parse_key(key)?.get(&config)));
    Ok(())
}

fn run_set(path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let setting = parse_key(key)?;
    let mut config = ConfigFile::load_from(path)?;
    setting
        .set(&mut config, value)
        .map_err(|e| CliError::Config(e.to_string()))?;
    config.save_to(path)?;

    println!("{} = {}", setting.name(), display_value(value.to_string()));
    Ok(())
}

fn display_value(value: String) -> String {
    if value.is_empty() {
        "(not set)".to_string()
    } else {
        value
    }
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    print!("{}", render_list(&config));
    Ok(())
}

fn render_list(config: &ConfigFile) -> String {
    let mut out = String::new();
    let mut previous: Option<&str> = None;

    for key in ConfigKey::all() {
        let section = key.section();
        if previous != Some(section) {
            if previous.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", section);
            previous = Some(section);
        }
        let _ = writeln!(out, "  {} = {}", key.key_name(), display_value(key.get(config)));
    }
    out
}
