//! End-to-end firmware download.
//!
//! Coordinates one run: resolve the system update title into a plan,
//! bulk-fetch its content, look for a separately published exFAT
//! SystemVersion, and verify that everything landed on disk.
//!
//! # Flow
//!
//! ```text
//! version ──► resolve(0100000000000816, update)
//!                 │
//!                 ▼
//!          fetch content jobs
//!                 │
//!        exFAT marker found? ──no──► resolve(010000000000081B, regular)
//!                 │                         │
//!                 │                  found now? ──yes──► fetch new jobs
//!                 ▼                         │
//!              verify ◄─────────────────────┘
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ConfigFile;
use crate::device::{read_device_id, user_agent};
use crate::download::{
    Aria2Fetcher, AutoFetcher, BulkFetcher, FetchProgressCallback, FetcherKind, HttpDownloader,
    HttpFetcher,
};
use crate::error::{FirmwareError, FirmwareResult};
use crate::plan::{DownloadJob, MarkerState};
use crate::resolver::{ResolveLimits, TitleGraphResolver};
use crate::source::{
    latest_system_version, CdnEndpoints, CdnSource, ClientSettings, HactoolExtractor,
    ManifestSource, ReqwestClient,
};
use crate::title::TitleId;
use crate::verify::verify;
use crate::version::PackedVersion;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub version: PackedVersion,
    pub destination: PathBuf,
    /// Manifest containers downloaded during resolution.
    pub manifests: usize,
    /// Content blobs downloaded by the bulk fetcher.
    pub contents: usize,
    pub fat: MarkerState,
    pub exfat: MarkerState,
}

/// Run resolution, fetch and verification against `source`.
///
/// Fetch failures and missing files end the run with an error; files that
/// did arrive are left in place.
pub fn execute<S: ManifestSource>(
    source: S,
    fetcher: &dyn BulkFetcher,
    version: PackedVersion,
    destination: &Path,
    limits: ResolveLimits,
    progress: Option<FetchProgressCallback>,
) -> FirmwareResult<RunReport> {
    let mut resolver = TitleGraphResolver::new(source, destination).with_limits(limits);

    resolver.resolve(TitleId::SYSTEM_UPDATE, version, true)?;
    let jobs = resolver.plan().content_jobs();
    tracing::info!(
        titles = resolver.state().visited_count(),
        files = jobs.len(),
        "system update resolved"
    );
    fetcher.fetch(&jobs, progress.clone())?;

    if !resolver.plan().exfat.is_found() {
        tracing::info!(
            title = %TitleId::SYSTEM_VERSION_EXFAT,
            "exFAT SystemVersion not listed, trying the title directly"
        );
        let mark = resolver.plan().watermark();
        resolver.resolve(TitleId::SYSTEM_VERSION_EXFAT, version, false)?;

        if resolver.plan().exfat.is_found() {
            let added: Vec<DownloadJob> = resolver
                .plan()
                .jobs_since(mark)
                .iter()
                .filter(|job| job.is_content())
                .cloned()
                .collect();
            fetcher.fetch(&added, progress)?;
        } else {
            tracing::info!("no separate exFAT SystemVersion for this firmware version");
        }
    }

    let plan = resolver.finish();
    verify(&plan).map_err(FirmwareError::MissingFiles)?;

    let contents = plan.jobs().iter().filter(|job| job.is_content()).count();
    Ok(RunReport {
        version,
        destination: destination.to_path_buf(),
        manifests: plan.len() - contents,
        contents,
        fat: plan.fat.clone(),
        exfat: plan.exfat.clone(),
    })
}

/// Directory name for a firmware version.
pub fn firmware_dir_name(version: PackedVersion) -> String {
    format!("Firmware {}", version.simple())
}

/// CDN-backed downloader assembled from configuration.
pub struct FirmwareDownloader {
    client: ReqwestClient,
    endpoints: CdnEndpoints,
    extractor: HactoolExtractor,
    fetcher: Box<dyn BulkFetcher>,
    output_dir: PathBuf,
    limits: ResolveLimits,
    progress: Option<FetchProgressCallback>,
}

impl FirmwareDownloader {
    /// Build a downloader, reading the device id and client identity.
    ///
    /// Fails early when the certificate bundle or key file is missing.
    pub fn from_config(config: &ConfigFile) -> FirmwareResult<Self> {
        let certificate = &config.network.certificate;
        require_file("client certificate", certificate)?;
        require_file("key file", &config.keys.prod_keys)?;

        let device_id = match &config.device.device_id {
            Some(id) => id.clone(),
            None => read_device_id(&config.device.prodinfo)?,
        };
        tracing::info!(%device_id, environment = %config.network.environment, "device identity loaded");

        let pem = fs::read(certificate).map_err(|e| FirmwareError::ReadFailed {
            path: certificate.clone(),
            source: e,
        })?;
        let agent = user_agent(
            &device_id,
            &config.network.environment,
            &config.network.firmware_agent,
        );
        let settings = ClientSettings::default()
            .with_identity_pem(pem)
            .with_user_agent(agent.clone())
            .with_timeout(Duration::from_secs(config.network.timeout));
        let http = settings.build_client()?;

        let builtin = HttpFetcher::new(
            HttpDownloader::from_client(http.clone(), settings.timeout),
            config.download.parallel,
        );
        let aria2 = Aria2Fetcher::new(certificate.clone(), agent)
            .with_connections(config.download.parallel);
        let fetcher: Box<dyn BulkFetcher> = match config.download.fetcher {
            FetcherKind::Auto => Box::new(AutoFetcher::new(aria2, builtin)),
            FetcherKind::Aria2 => Box::new(aria2),
            FetcherKind::Builtin => Box::new(builtin),
        };

        Ok(Self {
            client: ReqwestClient::from_client(http),
            endpoints: CdnEndpoints::new(config.network.environment.clone(), device_id),
            extractor: HactoolExtractor::new(config.keys.hactool.clone(), config.keys.prod_keys.clone()),
            fetcher,
            output_dir: config.download.output_dir.clone(),
            limits: config.resolver.limits(),
            progress: None,
        })
    }

    /// Report bulk-fetch progress to `callback`.
    pub fn with_progress(mut self, callback: FetchProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn endpoints(&self) -> &CdnEndpoints {
        &self.endpoints
    }

    /// Parse `version`, or ask the CDN for the latest one.
    pub fn resolve_version(&self, version: Option<&str>) -> FirmwareResult<PackedVersion> {
        match version {
            Some(text) => Ok(text.parse()?),
            None => {
                tracing::info!("no version specified, querying the latest");
                Ok(latest_system_version(&self.client, &self.endpoints)?)
            }
        }
    }

    /// Download one firmware version (latest when `None`).
    pub fn run(&self, version: Option<&str>) -> FirmwareResult<RunReport> {
        let version = self.resolve_version(version)?;
        let destination = self.output_dir.join(firmware_dir_name(version));
        tracing::info!(
            version = %version.full(),
            destination = %destination.display(),
            "downloading firmware"
        );

        let source = CdnSource::new(&self.client, &self.endpoints, &self.extractor, &destination);
        execute(
            source,
            self.fetcher.as_ref(),
            version,
            &destination,
            self.limits,
            self.progress.clone(),
        )
    }
}

fn require_file(what: &'static str, path: &Path) -> FirmwareResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(FirmwareError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_firmware_dir_name() {
        let v = PackedVersion::parse("17.0.1").unwrap();
        assert_eq!(firmware_dir_name(v), "Firmware 17.0.1");
    }

    #[test]
    fn test_missing_certificate_fails_early() {
        let temp = TempDir::new().unwrap();
        let mut config = ConfigFile::default();
        config.network.certificate = temp.path().join("certificat.pem");

        match FirmwareDownloader::from_config(&config) {
            Err(FirmwareError::MissingInput { what, .. }) => {
                assert_eq!(what, "client certificate")
            }
            Err(other) => panic!("expected MissingInput, got {:?}", other),
            Ok(_) => panic!("expected MissingInput"),
        }
    }

    #[test]
    fn test_missing_prodinfo_is_a_device_error() {
        let temp = TempDir::new().unwrap();
        let pem = temp.path().join("certificat.pem");
        let keys = temp.path().join("prod.keys");
        std::fs::write(&pem, "").unwrap();
        std::fs::write(&keys, "").unwrap();

        let mut config = ConfigFile::default();
        config.network.certificate = pem;
        config.keys.prod_keys = keys;
        config.device.prodinfo = temp.path().join("PRODINFO.bin");

        assert!(matches!(
            FirmwareDownloader::from_config(&config),
            Err(FirmwareError::Device(_))
        ));
    }
}
