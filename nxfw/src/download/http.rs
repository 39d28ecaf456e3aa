//! Single-file HTTP downloader.
//!
//! A partial file left by an interrupted run is continued with a `Range`
//! request when the CDN advertises byte ranges; a file that already has the
//! right size and hash is left alone.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};

use super::checksum::{calculate_file_checksum, verify_checksum};
use super::error::FetchError;
use crate::source::ClientSettings;

/// What a HEAD request told us about the remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RemoteFile {
    len: u64,
    ranges: bool,
}

/// How to treat whatever is already at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    /// Complete and verified; nothing to transfer.
    Complete(u64),
    /// Append from this offset.
    From(u64),
    /// Truncate and transfer everything.
    Restart,
}

/// Downloads one URL to one path.
///
/// Shares its reqwest client (client identity, user agent) with the
/// manifest lookups.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    timeout: Duration,
}

impl HttpDownloader {
    pub fn new(settings: &ClientSettings) -> Result<Self, FetchError> {
        let client = settings
            .build_client()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self::from_client(client, settings.timeout))
    }

    pub fn from_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Download `url` to `dest` and check it against `checksum`.
    ///
    /// Returns the size of the file on disk.
    pub fn download(&self, url: &str, dest: &Path, checksum: Option<&str>) -> Result<u64, FetchError> {
        let remote = self.probe(url)?;
        let local_len = fs::metadata(dest).map(|m| m.len()).unwrap_or(0);

        let offset = match decide_resume(dest, local_len, remote, checksum)? {
            Resume::Complete(len) => {
                tracing::debug!(path = %dest.display(), "already downloaded");
                return Ok(len);
            }
            Resume::From(offset) => {
                tracing::debug!(path = %dest.display(), offset, "resuming download");
                offset
            }
            Resume::Restart => 0,
        };

        let file = open_destination(dest, offset)?;
        let written = self.transfer(url, dest, file, offset)?;

        if let Some(expected) = checksum {
            verify_checksum(dest, expected)?;
        }
        Ok(offset + written)
    }

    fn probe(&self, url: &str) -> Result<RemoteFile, FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| self.request_error(url, e))?;
        require_success(url, "HEAD", &response)?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        Ok(RemoteFile {
            len: header("content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            ranges: header("accept-ranges").as_deref() == Some("bytes"),
        })
    }

    /// Stream the body into `file`; returns the bytes written.
    fn transfer(&self, url: &str, dest: &Path, file: File, offset: u64) -> Result<u64, FetchError> {
        let mut request = self.client.get(url);
        if offset > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={}-", offset));
        }
        let mut response = request.send().map_err(|e| self.request_error(url, e))?;
        require_success(url, "GET", &response)?;

        let mut writer = BufWriter::new(file);
        let written = io::copy(&mut response, &mut writer).map_err(|e| FetchError::DownloadFailed {
            url: url.to_string(),
            reason: format!("transfer interrupted: {}", e),
        })?;
        writer.flush().map_err(|e| FetchError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;
        Ok(written)
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            };
        }
        FetchError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

fn require_success(url: &str, method: &str, response: &Response) -> Result<(), FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::DownloadFailed {
            url: url.to_string(),
            reason: format!("{} returned {}", method, status),
        })
    }
}

/// Decide between skipping, appending and starting over.
///
/// A full-size file with the wrong hash is deleted so the restart does not
/// append to garbage.
fn decide_resume(
    dest: &Path,
    local_len: u64,
    remote: RemoteFile,
    checksum: Option<&str>,
) -> Result<Resume, FetchError> {
    if local_len == 0 || remote.len == 0 {
        return Ok(Resume::Restart);
    }
    if local_len < remote.len {
        return Ok(if remote.ranges {
            Resume::From(local_len)
        } else {
            Resume::Restart
        });
    }
    if local_len == remote.len {
        let intact = match checksum {
            Some(expected) => calculate_file_checksum(dest)?.eq_ignore_ascii_case(expected),
            None => true,
        };
        if intact {
            return Ok(Resume::Complete(local_len));
        }
        let _ = fs::remove_file(dest);
    }
    Ok(Resume::Restart)
}

/// Open `dest` for appending at `offset`, or create it empty.
fn open_destination(dest: &Path, offset: u64) -> Result<File, FetchError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| FetchError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let result = if offset > 0 {
        OpenOptions::new().append(true).open(dest)
    } else {
        File::create(dest)
    };
    result.map_err(|e| FetchError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn remote(len: u64, ranges: bool) -> RemoteFile {
        RemoteFile { len, ranges }
    }

    #[test]
    fn test_timeout_from_settings() {
        let settings = ClientSettings::default().with_timeout(Duration::from_secs(60));
        assert_eq!(HttpDownloader::new(&settings).unwrap().timeout().as_secs(), 60);
    }

    #[test]
    fn test_complete_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.nca");
        fs::write(&dest, b"hello world").unwrap();

        let decision = decide_resume(&dest, 11, remote(11, true), Some(HELLO_WORLD)).unwrap();
        assert_eq!(decision, Resume::Complete(11));
    }

    #[test]
    fn test_corrupt_full_file_restarts() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.nca");
        fs::write(&dest, b"hello world").unwrap();

        let decision = decide_resume(&dest, 11, remote(11, true), Some("00")).unwrap();
        assert_eq!(decision, Resume::Restart);
        assert!(!dest.exists());
    }

    #[test]
    fn test_partial_file_resumes_only_with_ranges() {
        let dest = Path::new("unused.nca");
        assert_eq!(
            decide_resume(dest, 5, remote(11, true), None).unwrap(),
            Resume::From(5)
        );
        assert_eq!(
            decide_resume(dest, 5, remote(11, false), None).unwrap(),
            Resume::Restart
        );
    }

    #[test]
    fn test_unknown_remote_length_restarts() {
        let dest = Path::new("unused.nca");
        assert_eq!(
            decide_resume(dest, 5, remote(0, true), None).unwrap(),
            Resume::Restart
        );
    }

    #[test]
    fn test_open_destination_appends() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.nca");
        fs::write(&dest, b"hello").unwrap();

        let mut file = open_destination(&dest, 5).unwrap();
        file.write_all(b" world").unwrap();
        drop(file);
        assert_eq!(fs::read(&dest).unwrap(), b"hello world");
    }

    #[test]
    fn test_open_destination_creates_parent() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("Firmware 17.0.0").join("a.nca");

        open_destination(&dest, 0).unwrap();
        assert!(dest.is_file());
    }
}
