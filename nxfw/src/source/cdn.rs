//! CDN-backed manifest source.

use std::fs;
use std::path::{Path, PathBuf};

use super::endpoints::CdnEndpoints;
use super::error::SourceError;
use super::extractor::ManifestExtractor;
use super::http::{HttpClient, HttpError};
use super::{ManifestLookup, ManifestSource};
use crate::plan::DownloadJob;
use crate::title::TitleVersion;

/// Response header carrying the manifest container's content id.
pub const CONTENT_ID_HEADER: &str = "X-Nintendo-Content-ID";

/// Hex digits in a content id (16 bytes).
const CONTENT_ID_LEN: usize = 32;

/// Resolves manifests against the CDN.
///
/// Each lookup probes the title with a HEAD request, downloads the manifest
/// container into `destination`, and extracts the raw manifest from it.
pub struct CdnSource<'a, C: HttpClient, E: ManifestExtractor> {
    client: &'a C,
    endpoints: &'a CdnEndpoints,
    extractor: &'a E,
    destination: PathBuf,
}

impl<'a, C: HttpClient, E: ManifestExtractor> CdnSource<'a, C, E> {
    pub fn new(
        client: &'a C,
        endpoints: &'a CdnEndpoints,
        extractor: &'a E,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            endpoints,
            extractor,
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    fn probe(&self, key: &TitleVersion) -> Result<String, SourceError> {
        let url = self.endpoints.title_probe(key);
        let response = self.client.head(&url).map_err(|e| transport(&url, e))?;

        if response.status == 404 {
            return Err(SourceError::NotFound { title: *key });
        }
        if !response.is_success() {
            return Err(SourceError::Transport {
                url,
                reason: format!("HEAD request failed with status {}", response.status),
            });
        }

        let Some(raw) = response.header(CONTENT_ID_HEADER) else {
            return Err(SourceError::InvalidResponse {
                url,
                reason: format!("missing {} header", CONTENT_ID_HEADER),
            });
        };
        parse_content_id(raw).ok_or_else(|| SourceError::InvalidResponse {
            url,
            reason: format!("malformed {} header {:?}", CONTENT_ID_HEADER, raw),
        })
    }

    fn fetch_container(&self, job: &DownloadJob) -> Result<(), SourceError> {
        let response = self
            .client
            .get(&job.url)
            .map_err(|e| transport(&job.url, e))?;

        if !response.is_success() {
            return Err(SourceError::Transport {
                url: job.url.clone(),
                reason: format!("GET request failed with status {}", response.status),
            });
        }

        fs::create_dir_all(&job.directory).map_err(|e| SourceError::WriteFailed {
            path: job.directory.clone(),
            source: e,
        })?;
        let path = job.path();
        fs::write(&path, &response.body).map_err(|e| SourceError::WriteFailed { path, source: e })
    }
}

impl<C: HttpClient, E: ManifestExtractor> ManifestSource for CdnSource<'_, C, E> {
    fn lookup(&self, key: &TitleVersion) -> Result<ManifestLookup, SourceError> {
        let content_id = self.probe(key)?;
        tracing::debug!(title = %key, content_id = %content_id, "manifest located");

        let container = DownloadJob::manifest(
            self.endpoints.manifest_container(&content_id, key.is_update),
            &self.destination,
            &content_id,
        );
        self.fetch_container(&container)?;

        let bytes = self.extractor.extract(&container.path())?;

        Ok(ManifestLookup {
            content_id,
            container,
            bytes,
        })
    }

    fn content_url(&self, content_id: &str) -> String {
        self.endpoints.content(content_id)
    }
}

/// Content ids name files on disk and are spliced into URLs, so anything
/// other than 32 hex digits is rejected. Returns the lower-case form.
fn parse_content_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    if id.len() == CONTENT_ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(id.to_ascii_lowercase())
    } else {
        None
    }
}

fn transport(url: &str, e: HttpError) -> SourceError {
    SourceError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::http::tests::MockHttpClient;
    use crate::source::http::HttpResponse;
    use crate::title::TitleId;
    use crate::version::PackedVersion;
    use tempfile::TempDir;

    /// Returns the container bytes reversed so tests can tell them apart.
    struct ReverseExtractor;

    impl ManifestExtractor for ReverseExtractor {
        fn extract(&self, container: &Path) -> Result<Vec<u8>, SourceError> {
            let mut bytes = fs::read(container).map_err(|e| SourceError::Extraction {
                path: container.to_path_buf(),
                reason: e.to_string(),
            })?;
            bytes.reverse();
            Ok(bytes)
        }
    }

    const CONTENT_ID: &str = "0123456789abcdef0123456789abcdef";

    fn key() -> TitleVersion {
        TitleVersion::new(TitleId::SYSTEM_UPDATE, PackedVersion::from_raw(42), true)
    }

    #[test]
    fn test_lookup_downloads_and_extracts() {
        let temp = TempDir::new().unwrap();
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let client = MockHttpClient::default()
            .with(
                &endpoints.title_probe(&key()),
                Ok(HttpResponse::new(200).with_header("x-nintendo-content-id", CONTENT_ID)),
            )
            .with(
                &endpoints.manifest_container(CONTENT_ID, true),
                Ok(HttpResponse::new(200).with_body(b"abc".to_vec())),
            );

        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, temp.path());
        let lookup = source.lookup(&key()).unwrap();

        assert_eq!(lookup.content_id, CONTENT_ID);
        assert_eq!(lookup.bytes, b"cba".to_vec());
        assert_eq!(
            lookup.container.path(),
            temp.path().join(format!("{}.cnmt.nca", CONTENT_ID))
        );
        assert!(lookup.container.path().is_file());
        assert_eq!(
            client.requested(),
            vec![
                ("HEAD".to_string(), endpoints.title_probe(&key())),
                ("GET".to_string(), endpoints.manifest_container(CONTENT_ID, true)),
            ]
        );
    }

    #[test]
    fn test_upper_case_content_id_is_lowered() {
        let temp = TempDir::new().unwrap();
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let client = MockHttpClient::default()
            .with(
                &endpoints.title_probe(&key()),
                Ok(HttpResponse::new(200)
                    .with_header("x-nintendo-content-id", &CONTENT_ID.to_uppercase())),
            )
            .with(
                &endpoints.manifest_container(CONTENT_ID, true),
                Ok(HttpResponse::new(200).with_body(b"abc".to_vec())),
            );

        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, temp.path());
        assert_eq!(source.lookup(&key()).unwrap().content_id, CONTENT_ID);
    }

    #[test]
    fn test_path_like_content_id_is_rejected() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("Firmware 1.0.0");
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let client = MockHttpClient::default().with(
            &endpoints.title_probe(&key()),
            Ok(HttpResponse::new(200).with_header("x-nintendo-content-id", "../escaped")),
        );

        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, &destination);
        assert!(matches!(
            source.lookup(&key()),
            Err(SourceError::InvalidResponse { .. })
        ));
        assert!(!temp.path().join("escaped.cnmt.nca").exists());
        assert!(!destination.exists());
        assert_eq!(client.requested().len(), 1);
    }

    #[test]
    fn test_parse_content_id() {
        assert_eq!(parse_content_id(&format!(" {} ", CONTENT_ID)).as_deref(), Some(CONTENT_ID));
        assert!(parse_content_id("cafe").is_none());
        assert!(parse_content_id("0123456789abcdef0123456789abcdeg").is_none());
        assert!(parse_content_id("").is_none());
    }

    #[test]
    fn test_probe_404_is_not_found() {
        let temp = TempDir::new().unwrap();
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let client = MockHttpClient::default();

        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, temp.path());
        let err = source.lookup(&key()).unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_probe_server_error_is_transport() {
        let temp = TempDir::new().unwrap();
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let client = MockHttpClient::default()
            .with(&endpoints.title_probe(&key()), Ok(HttpResponse::new(503)));

        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, temp.path());
        let err = source.lookup(&key()).unwrap_err();

        assert!(matches!(err, SourceError::Transport { .. }));
    }

    #[test]
    fn test_connection_failure_is_transport() {
        let temp = TempDir::new().unwrap();
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let url = endpoints.title_probe(&key());
        let client = MockHttpClient::default().with(
            &url,
            Err(HttpError::Request {
                url: url.clone(),
                reason: "connection reset".to_string(),
            }),
        );

        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, temp.path());
        match source.lookup(&key()).unwrap_err() {
            SourceError::Transport { reason, .. } => assert!(reason.contains("connection reset")),
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_content_id_header() {
        let temp = TempDir::new().unwrap();
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let client = MockHttpClient::default()
            .with(&endpoints.title_probe(&key()), Ok(HttpResponse::new(200)));

        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, temp.path());
        assert!(matches!(
            source.lookup(&key()),
            Err(SourceError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_content_url() {
        let endpoints = CdnEndpoints::new("lp1", "dev");
        let client = MockHttpClient::default();
        let source = CdnSource::new(&client, &endpoints, &ReverseExtractor, "out");
        assert_eq!(source.content_url("ab"), endpoints.content("ab"));
    }
}
