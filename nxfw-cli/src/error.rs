//! CLI error type.

use std::fmt;

use nxfw::config::ConfigError;
use nxfw::FirmwareError;

/// Errors reported by CLI commands. Every variant exits with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem (bad key, bad value, unreadable file).
    Config(String),

    /// Invalid command-line input.
    Usage(String),

    /// A firmware run or library call failed.
    Firmware(FirmwareError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Firmware(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Firmware(e) => Some(e),
            CliError::Config(_) | CliError::Usage(_) => None,
        }
    }
}

impl From<FirmwareError> for CliError {
    fn from(e: FirmwareError) -> Self {
        CliError::Firmware(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
