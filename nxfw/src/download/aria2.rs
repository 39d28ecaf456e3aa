//! External `aria2c` bulk fetcher.
//!
//! All jobs go into a single aria2 input file so the tool can schedule the
//! whole batch itself (16 connections, SHA-256 checked per file). aria2c
//! wants the client certificate and key as separate files, so the PEM bundle
//! is split into a private scratch directory that is removed once the tool
//! exits.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::error::FetchError;
use super::{BulkFetcher, FetchProgressCallback};
use crate::plan::DownloadJob;

const DEFAULT_TOOL: &str = "aria2c";

/// Connections per server and splits per file.
const DEFAULT_CONNECTIONS: usize = 16;

/// Fetcher that drives `aria2c` with an input file.
#[derive(Debug, Clone)]
pub struct Aria2Fetcher {
    tool: PathBuf,
    identity_pem: PathBuf,
    user_agent: String,
    connections: usize,
    work_dir: PathBuf,
}

impl Aria2Fetcher {
    /// Create a fetcher using the PEM bundle at `identity_pem`.
    pub fn new(identity_pem: impl Into<PathBuf>, user_agent: impl Into<String>) -> Self {
        Self {
            tool: PathBuf::from(DEFAULT_TOOL),
            identity_pem: identity_pem.into(),
            user_agent: user_agent.into(),
            connections: DEFAULT_CONNECTIONS,
            work_dir: std::env::temp_dir(),
        }
    }

    pub fn with_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_connections(mut self, connections: usize) -> Self {
        self.connections = connections.max(1);
        self
    }

    /// Directory under which the input file and key material are written.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    fn run(&self, scratch: &Path, jobs: &[DownloadJob]) -> Result<(), FetchError> {
        let pem = fs::read_to_string(&self.identity_pem).map_err(|e| FetchError::ReadFailed {
            path: self.identity_pem.clone(),
            source: e,
        })?;
        let identity = split_pem(&pem).map_err(|reason| FetchError::InvalidIdentity {
            path: self.identity_pem.clone(),
            reason,
        })?;

        let cert_path = scratch.join("client.crt");
        let key_path = scratch.join("client.key");
        let input_path = scratch.join("dl.txt");
        write_private(&cert_path, &identity.certificates)?;
        write_private(&key_path, &identity.private_key)?;
        write_private(&input_path, &input_file(jobs))?;

        let connections = self.connections.to_string();
        let output = Command::new(&self.tool)
            .arg("--no-conf")
            .arg("--console-log-level=error")
            .arg("--file-allocation=none")
            .arg("--summary-interval=0")
            .arg("--download-result=hide")
            .arg(format!("--certificate={}", cert_path.display()))
            .arg(format!("--private-key={}", key_path.display()))
            .arg(format!("--header=User-Agent: {}", self.user_agent))
            .arg("--check-certificate=false")
            .args(["-x", &connections, "-s", &connections])
            .arg("-i")
            .arg(&input_path)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::ToolFailed {
                tool: self.tool.display().to_string(),
                reason: format!("{} ({})", output.status, stderr.trim()),
            });
        }

        Ok(())
    }

    fn spawn_error(&self, e: io::Error) -> FetchError {
        let tool = self.tool.display().to_string();
        if e.kind() == io::ErrorKind::NotFound {
            FetchError::ToolMissing { tool }
        } else {
            FetchError::ToolFailed {
                tool,
                reason: e.to_string(),
            }
        }
    }
}

impl BulkFetcher for Aria2Fetcher {
    fn fetch(
        &self,
        jobs: &[DownloadJob],
        on_progress: Option<FetchProgressCallback>,
    ) -> Result<(), FetchError> {
        if jobs.is_empty() {
            return Ok(());
        }

        // Created with mode 0700 under a random name.
        let scratch = tempfile::Builder::new()
            .prefix("nxfw-aria2-")
            .tempdir_in(&self.work_dir)
            .map_err(|e| FetchError::CreateDirFailed {
                path: self.work_dir.clone(),
                source: e,
            })?;
        tracing::debug!(jobs = jobs.len(), tool = %self.tool.display(), "starting external downloader");

        let result = self.run(scratch.path(), jobs);

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(path = %scratch_path.display(), error = %e, "failed to remove scratch directory");
        }

        if result.is_ok() {
            if let Some(cb) = on_progress {
                cb(jobs.len(), jobs.len());
            }
        }
        result
    }
}

/// Create `path` readable by the owner only; it must not exist yet.
fn write_private(path: &Path, contents: &str) -> Result<(), FetchError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(path)
        .and_then(|mut file| file.write_all(contents.as_bytes()))
        .map_err(|e| FetchError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Render jobs in aria2 input-file syntax.
pub(crate) fn input_file(jobs: &[DownloadJob]) -> String {
    let mut out = String::new();
    for job in jobs {
        let _ = writeln!(out, "{}", job.url);
        let _ = writeln!(out, "\tout={}", job.filename);
        let _ = writeln!(out, "\tdir={}", job.directory.display());
        if let Some(ref checksum) = job.checksum {
            let _ = writeln!(out, "\tchecksum=sha-256={}", checksum);
        }
    }
    out
}

/// Client certificate chain and private key, as separate PEM documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientIdentity {
    pub certificates: String,
    pub private_key: String,
}

/// Split a PEM bundle by block label.
///
/// `CERTIFICATE` blocks form the chain and the single `... PRIVATE KEY`
/// block is the key. Other labels are skipped. Text outside blocks (bag
/// attributes from PKCS#12 exports) is not part of either document.
pub(crate) fn split_pem(pem: &str) -> Result<ClientIdentity, String> {
    let mut certificates = String::new();
    let mut keys = Vec::new();
    let mut open: Option<(String, String)> = None;

    for line in pem.lines().map(str::trim_end) {
        if let Some(label) = pem_label(line, "-----BEGIN ") {
            if let Some((previous, _)) = &open {
                return Err(format!("unterminated {} block", previous));
            }
            open = Some((label.to_string(), String::new()));
        }

        let Some((label, text)) = open.as_mut() else {
            continue;
        };
        text.push_str(line);
        text.push('\n');

        if let Some(end) = pem_label(line, "-----END ") {
            if end != label.as_str() {
                return Err(format!("{} block closed as {}", label, end));
            }
            let (label, text) = open.take().unwrap_or_default();
            if label == "CERTIFICATE" {
                certificates.push_str(&text);
            } else if label.ends_with("PRIVATE KEY") {
                keys.push(text);
            } else {
                tracing::debug!(label = %label, "skipping PEM block");
            }
        }
    }

    if let Some((label, _)) = open {
        return Err(format!("unterminated {} block", label));
    }
    if certificates.is_empty() {
        return Err("no CERTIFICATE block".to_string());
    }
    match keys.len() {
        1 => Ok(ClientIdentity {
            certificates,
            private_key: keys.remove(0),
        }),
        0 => Err("no PRIVATE KEY block".to_string()),
        n => Err(format!("{} private keys, expected one", n)),
    }
}

/// Label of a `-----BEGIN x-----` or `-----END x-----` line.
fn pem_label<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.strip_prefix(marker)?.strip_suffix("-----")
}
