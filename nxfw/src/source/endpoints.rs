//! CDN URL scheme.

use crate::title::TitleVersion;

/// Default CDN environment.
pub const DEFAULT_ENVIRONMENT: &str = "lp1";

/// Builds CDN URLs for one environment and device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnEndpoints {
    environment: String,
    device_id: String,
}

impl CdnEndpoints {
    pub fn new(environment: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            device_id: device_id.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// HEAD target answering with the manifest's content id.
    pub fn title_probe(&self, key: &TitleVersion) -> String {
        format!(
            "https://atumn.hac.{}.d4c.nintendo.net/t/{}/{}/{}?device_id={}",
            self.environment,
            kind_segment(key.is_update),
            key.title_id,
            key.version.raw(),
            self.device_id
        )
    }

    /// Manifest container download.
    pub fn manifest_container(&self, content_id: &str, is_update: bool) -> String {
        format!(
            "https://atumn.hac.{}.d4c.nintendo.net/c/{}/{}?device_id={}",
            self.environment,
            kind_segment(is_update),
            content_id,
            self.device_id
        )
    }

    /// Content blob download.
    pub fn content(&self, content_id: &str) -> String {
        format!(
            "https://atumn.hac.{}.d4c.nintendo.net/c/c/{}?device_id={}",
            self.environment, content_id, self.device_id
        )
    }

    /// Latest system update metadata (JSON).
    pub fn system_update_meta(&self) -> String {
        format!(
            "https://sun.hac.{}.d4c.nintendo.net/v1/system_update_meta?device_id={}",
            self.environment, self.device_id
        )
    }
}

fn kind_segment(is_update: bool) -> &'static str {
    if is_update {
        "s"
    } else {
        "a"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::TitleId;
    use crate::version::PackedVersion;

    fn endpoints() -> CdnEndpoints {
        CdnEndpoints::new("lp1", "0123456789abcdef")
    }

    #[test]
    fn test_title_probe_update() {
        let key = TitleVersion::new(TitleId::SYSTEM_UPDATE, PackedVersion::from_raw(1234), true);
        assert_eq!(
            endpoints().title_probe(&key),
            "https://atumn.hac.lp1.d4c.nintendo.net/t/s/0100000000000816/1234?device_id=0123456789abcdef"
        );
    }

    #[test]
    fn test_title_probe_regular() {
        let key = TitleVersion::new(
            TitleId::SYSTEM_VERSION_EXFAT,
            PackedVersion::from_raw(5),
            false,
        );
        assert!(endpoints()
            .title_probe(&key)
            .contains("/t/a/010000000000081B/5?"));
    }

    #[test]
    fn test_container_and_content_urls() {
        let e = endpoints();
        assert!(e.manifest_container("abc", true).ends_with("/c/s/abc?device_id=0123456789abcdef"));
        assert!(e.manifest_container("abc", false).contains("/c/a/abc?"));
        assert_eq!(
            e.content("abc"),
            "https://atumn.hac.lp1.d4c.nintendo.net/c/c/abc?device_id=0123456789abcdef"
        );
    }

    #[test]
    fn test_system_update_meta_url() {
        assert_eq!(
            endpoints().system_update_meta(),
            "https://sun.hac.lp1.d4c.nintendo.net/v1/system_update_meta?device_id=0123456789abcdef"
        );
    }
}
