//! Configuration file.
//!
//! Settings live in an INI file at `~/.config/nxfw/config.ini` (platform
//! config dir). A missing file means defaults; a missing key means that
//! key's default. CLI flags override whatever is loaded here.
//!
//! ```ini
//! [network]
//! environment = lp1
//! certificate = certificat.pem
//! timeout = 300
//! firmware_agent = 11.0.0-0
//!
//! [device]
//! prodinfo = PRODINFO.bin
//! ; device_id = 0123456789abcdef
//!
//! [keys]
//! prod_keys = prod.keys
//! hactool = ./hactool
//!
//! [download]
//! output_dir = .
//! parallel = 16
//! fetcher = auto
//!
//! [resolver]
//! max_depth = 8
//! max_titles = 4096
//!
//! [logging]
//! ; file = nxfw.log
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use crate::device::DEFAULT_FIRMWARE_AGENT;
use crate::download::{FetcherKind, DEFAULT_PARALLEL};
use crate::resolver::{ResolveLimits, DEFAULT_MAX_DEPTH, DEFAULT_MAX_TITLES};
use crate::source::{default_hactool, DEFAULT_ENVIRONMENT, DEFAULT_TIMEOUT_SECS};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Parse { path: PathBuf, source: ini::Error },

    #[error("failed to write config {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    /// CDN environment (`lp1` for production).
    pub environment: String,
    /// PEM bundle holding the client certificate and private key.
    pub certificate: PathBuf,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// SDK version advertised in the user agent.
    pub firmware_agent: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            certificate: PathBuf::from("certificat.pem"),
            timeout: DEFAULT_TIMEOUT_SECS,
            firmware_agent: DEFAULT_FIRMWARE_AGENT.to_string(),
        }
    }
}

/// `[device]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub prodinfo: PathBuf,
    /// Explicit device id; skips reading PRODINFO.
    pub device_id: Option<String>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            prodinfo: PathBuf::from("PRODINFO.bin"),
            device_id: None,
        }
    }
}

/// `[keys]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySettings {
    pub prod_keys: PathBuf,
    pub hactool: PathBuf,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            prod_keys: PathBuf::from("prod.keys"),
            hactool: default_hactool(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Parent of the `Firmware x.y.z` directory.
    pub output_dir: PathBuf,
    pub parallel: usize,
    pub fetcher: FetcherKind,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            parallel: DEFAULT_PARALLEL,
            fetcher: FetcherKind::default(),
        }
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub max_depth: usize,
    pub max_titles: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_titles: DEFAULT_MAX_TITLES,
        }
    }
}

impl ResolverSettings {
    pub fn limits(&self) -> ResolveLimits {
        ResolveLimits {
            max_depth: self.max_depth,
            max_titles: self.max_titles,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub network: NetworkSettings,
    pub device: DeviceSettings,
    pub keys: KeySettings,
    pub download: DownloadSettings,
    pub resolver: ResolverSettings,
    pub logging: LoggingSettings,
}

/// Default configuration file location.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nxfw")
        .join("config.ini")
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|s| s.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories. Unset optional keys are
    /// omitted.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Every settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    NetworkEnvironment,
    NetworkCertificate,
    NetworkTimeout,
    NetworkFirmwareAgent,
    DeviceProdinfo,
    DeviceId,
    KeysProdKeys,
    KeysHactool,
    DownloadOutputDir,
    DownloadParallel,
    DownloadFetcher,
    ResolverMaxDepth,
    ResolverMaxTitles,
    LoggingFile,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            Self::NetworkEnvironment,
            Self::NetworkCertificate,
            Self::NetworkTimeout,
            Self::NetworkFirmwareAgent,
            Self::DeviceProdinfo,
            Self::DeviceId,
            Self::KeysProdKeys,
            Self::KeysHactool,
            Self::DownloadOutputDir,
            Self::DownloadParallel,
            Self::DownloadFetcher,
            Self::ResolverMaxDepth,
            Self::ResolverMaxTitles,
            Self::LoggingFile,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            Self::NetworkEnvironment
            | Self::NetworkCertificate
            | Self::NetworkTimeout
            | Self::NetworkFirmwareAgent => "network",
            Self::DeviceProdinfo | Self::DeviceId => "device",
            Self::KeysProdKeys | Self::KeysHactool => "keys",
            Self::DownloadOutputDir | Self::DownloadParallel | Self::DownloadFetcher => "download",
            Self::ResolverMaxDepth | Self::ResolverMaxTitles => "resolver",
            Self::LoggingFile => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            Self::NetworkEnvironment => "environment",
            Self::NetworkCertificate => "certificate",
            Self::NetworkTimeout => "timeout",
            Self::NetworkFirmwareAgent => "firmware_agent",
            Self::DeviceProdinfo => "prodinfo",
            Self::DeviceId => "device_id",
            Self::KeysProdKeys => "prod_keys",
            Self::KeysHactool => "hactool",
            Self::DownloadOutputDir => "output_dir",
            Self::DownloadParallel => "parallel",
            Self::DownloadFetcher => "fetcher",
            Self::ResolverMaxDepth => "max_depth",
            Self::ResolverMaxTitles => "max_titles",
            Self::LoggingFile => "file",
        }
    }

    /// Full name in `section.key` form.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::NetworkEnvironment => config.network.environment.clone(),
            Self::NetworkCertificate => config.network.certificate.display().to_string(),
            Self::NetworkTimeout => config.network.timeout.to_string(),
            Self::NetworkFirmwareAgent => config.network.firmware_agent.clone(),
            Self::DeviceProdinfo => config.device.prodinfo.display().to_string(),
            Self::DeviceId => config.device.device_id.clone().unwrap_or_default(),
            Self::KeysProdKeys => config.keys.prod_keys.display().to_string(),
            Self::KeysHactool => config.keys.hactool.display().to_string(),
            Self::DownloadOutputDir => config.download.output_dir.display().to_string(),
            Self::DownloadParallel => config.download.parallel.to_string(),
            Self::DownloadFetcher => config.download.fetcher.to_string(),
            Self::ResolverMaxDepth => config.resolver.max_depth.to_string(),
            Self::ResolverMaxTitles => config.resolver.max_titles.to_string(),
            Self::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse and store `value`. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::NetworkEnvironment => {
                config.network.environment = self.non_empty(value)?.to_string()
            }
            Self::NetworkCertificate => config.network.certificate = self.path(value)?,
            Self::NetworkTimeout => config.network.timeout = self.positive(value)? as u64,
            Self::NetworkFirmwareAgent => {
                config.network.firmware_agent = self.non_empty(value)?.to_string()
            }
            Self::DeviceProdinfo => config.device.prodinfo = self.path(value)?,
            Self::DeviceId => {
                config.device.device_id = (!value.is_empty()).then(|| value.to_string())
            }
            Self::KeysProdKeys => config.keys.prod_keys = self.path(value)?,
            Self::KeysHactool => config.keys.hactool = self.path(value)?,
            Self::DownloadOutputDir => config.download.output_dir = self.path(value)?,
            Self::DownloadParallel => config.download.parallel = self.positive(value)?,
            Self::DownloadFetcher => {
                config.download.fetcher =
                    FetcherKind::from_str(value).map_err(|reason| self.invalid(value, reason))?
            }
            Self::ResolverMaxDepth => config.resolver.max_depth = self.positive(value)?,
            Self::ResolverMaxTitles => config.resolver.max_titles = self.positive(value)?,
            Self::LoggingFile => {
                config.logging.file = (!value.is_empty()).then(|| PathBuf::from(value))
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn non_empty<'v>(&self, value: &'v str) -> Result<&'v str, ConfigError> {
        if value.is_empty() {
            Err(self.invalid(value, "must not be empty"))
        } else {
            Ok(value)
        }
    }

    fn path(&self, value: &str) -> Result<PathBuf, ConfigError> {
        self.non_empty(value).map(PathBuf::from)
    }

    fn positive(&self, value: &str) -> Result<usize, ConfigError> {
        match value.parse::<usize>() {
            Ok(0) => Err(self.invalid(value, "must be greater than zero")),
            Ok(n) => Ok(n),
            Err(e) => Err(self.invalid(value, e.to_string())),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
