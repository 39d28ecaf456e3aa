//! Latest system update lookup.

use serde::Deserialize;

use super::endpoints::CdnEndpoints;
use super::error::SourceError;
use super::http::HttpClient;
use crate::version::PackedVersion;

#[derive(Debug, Deserialize)]
struct SystemUpdateMetaResponse {
    system_update_metas: Vec<SystemUpdateMeta>,
}

#[derive(Debug, Deserialize)]
struct SystemUpdateMeta {
    title_version: u32,
}

/// Query the newest published system update version.
pub fn latest_system_version<C: HttpClient + ?Sized>(
    client: &C,
    endpoints: &CdnEndpoints,
) -> Result<PackedVersion, SourceError> {
    let url = endpoints.system_update_meta();
    let response = client.get(&url).map_err(|e| SourceError::Transport {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    if !response.is_success() {
        return Err(SourceError::Transport {
            url,
            reason: format!("GET request failed with status {}", response.status),
        });
    }

    parse_latest(&response.body).map_err(|reason| SourceError::InvalidResponse { url, reason })
}

fn parse_latest(body: &[u8]) -> Result<PackedVersion, String> {
    let meta: SystemUpdateMetaResponse =
        serde_json::from_slice(body).map_err(|e| e.to_string())?;
    meta.system_update_metas
        .first()
        .map(|m| PackedVersion::from_raw(m.title_version))
        .ok_or_else(|| "no system update metas listed".to_string())
}
