//! Download command - fetch a complete firmware set.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use nxfw::config::ConfigFile;
use nxfw::download::FetcherKind;
use nxfw::{FirmwareDownloader, RunReport};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Firmware version, e.g. 17.0.1 (latest when omitted)
    pub version: Option<String>,

    /// Directory that receives the "Firmware x.y.z" folder
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Concurrent downloads
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Bulk fetcher: auto, aria2 or builtin
    #[arg(long)]
    pub fetcher: Option<FetcherKind>,

    /// PEM bundle with the client certificate and key
    #[arg(long)]
    pub certificate: Option<PathBuf>,

    /// prod.keys file passed to hactool
    #[arg(long)]
    pub keys: Option<PathBuf>,

    /// hactool executable
    #[arg(long)]
    pub hactool: Option<PathBuf>,

    /// PRODINFO dump to read the device id from
    #[arg(long)]
    pub prodinfo: Option<PathBuf>,

    /// Device id (skips PRODINFO)
    #[arg(long)]
    pub device_id: Option<String>,

    /// CDN environment
    #[arg(long = "env")]
    pub environment: Option<String>,
}

impl DownloadArgs {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(self, mut config: ConfigFile) -> Result<(ConfigFile, Option<String>), CliError> {
        if let Some(output) = self.output {
            config.download.output_dir = output;
        }
        if let Some(parallel) = self.parallel {
            if parallel == 0 {
                return Err(CliError::Usage("--parallel must be at least 1".to_string()));
            }
            config.download.parallel = parallel;
        }
        if let Some(fetcher) = self.fetcher {
            config.download.fetcher = fetcher;
        }
        if let Some(certificate) = self.certificate {
            config.network.certificate = certificate;
        }
        if let Some(keys) = self.keys {
            config.keys.prod_keys = keys;
        }
        if let Some(hactool) = self.hactool {
            config.keys.hactool = hactool;
        }
        if let Some(prodinfo) = self.prodinfo {
            config.device.prodinfo = prodinfo;
        }
        if self.device_id.is_some() {
            config.device.device_id = self.device_id;
        }
        if let Some(environment) = self.environment {
            config.network.environment = environment;
        }
        Ok((config, self.version))
    }
}

/// Run the download command.
pub fn run(args: DownloadArgs, config: ConfigFile) -> Result<(), CliError> {
    let (config, version) = args.apply(config)?;
    tracing::debug!(?config, "effective configuration");

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} files ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    let progress_bar = bar.clone();

    let downloader = FirmwareDownloader::from_config(&config)?.with_progress(Arc::new(
        move |done: usize, total: usize| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
        },
    ));

    let result = downloader.run(version.as_deref());
    bar.finish_and_clear();

    print_report(&result?);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("DOWNLOAD COMPLETE!");
    println!(
        "Firmware: {} (internal {})",
        report.version.simple(),
        report.version.full()
    );
    println!("Folder: {}", report.destination.display());
    println!(
        "Files: {} content, {} meta",
        report.contents, report.manifests
    );
    println!("SystemVersion NCA FAT: {}", report.fat);
    println!("SystemVersion NCA exFAT: {}", report.exfat);
    println!("Verify hashes before installation!");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DownloadArgs {
        DownloadArgs {
            version: None,
            output: None,
            parallel: None,
            fetcher: None,
            certificate: None,
            keys: None,
            hactool: None,
            prodinfo: None,
            device_id: None,
            environment: None,
        }
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let (config, version) = args().apply(ConfigFile::default()).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert!(version.is_none());
    }

    #[test]
    fn test_overrides_win() {
        let mut a = args();
        a.version = Some("17.0.1".to_string());
        a.parallel = Some(4);
        a.fetcher = Some(FetcherKind::Builtin);
        a.device_id = Some("0123456789abcdef".to_string());
        a.environment = Some("dd1".to_string());

        let (config, version) = a.apply(ConfigFile::default()).unwrap();
        assert_eq!(version.as_deref(), Some("17.0.1"));
        assert_eq!(config.download.parallel, 4);
        assert_eq!(config.download.fetcher, FetcherKind::Builtin);
        assert_eq!(config.device.device_id.as_deref(), Some("0123456789abcdef"));
        assert_eq!(config.network.environment, "dd1");
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let mut a = args();
        a.parallel = Some(0);
        assert!(matches!(
            a.apply(ConfigFile::default()),
            Err(CliError::Usage(_))
        ));
    }
}
