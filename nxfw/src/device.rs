//! Device identity.
//!
//! The CDN wants a device id on every request, both as a query parameter and
//! inside the user agent. It is read from a PRODINFO calibration dump.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Magic at the start of a PRODINFO (CAL0) blob.
pub const CAL0_MAGIC: &[u8; 4] = b"CAL0";

/// Offset of the device id inside PRODINFO.
pub const DEVICE_ID_OFFSET: usize = 0x2B56;

/// Length of the device id in bytes.
pub const DEVICE_ID_LEN: usize = 0x10;

/// Default SDK version advertised in the user agent.
pub const DEFAULT_FIRMWARE_AGENT: &str = "11.0.0-0";

/// Errors reading the device identity.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("not a PRODINFO file (missing CAL0 magic)")]
    BadMagic,

    #[error("PRODINFO too short: {len} bytes")]
    Truncated { len: usize },

    #[error("device id is not valid text")]
    InvalidDeviceId,
}

/// Read the device id from a PRODINFO file.
pub fn read_device_id(path: &Path) -> Result<String, DeviceError> {
    let data = fs::read(path).map_err(|e| DeviceError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_prodinfo(&data)
}

/// Extract the device id from PRODINFO bytes.
pub fn parse_prodinfo(data: &[u8]) -> Result<String, DeviceError> {
    if data.len() < CAL0_MAGIC.len() || &data[..4] != CAL0_MAGIC {
        return Err(DeviceError::BadMagic);
    }
    let raw = data
        .get(DEVICE_ID_OFFSET..DEVICE_ID_OFFSET + DEVICE_ID_LEN)
        .ok_or(DeviceError::Truncated { len: data.len() })?;

    let id = std::str::from_utf8(raw).map_err(|_| DeviceError::InvalidDeviceId)?;
    Ok(id.trim_end_matches('\0').to_string())
}

/// User agent the CDN expects from a console.
pub fn user_agent(device_id: &str, environment: &str, firmware_agent: &str) -> String {
    format!(
        "NintendoSDK Firmware/{} (platform:NX; did:{}; eid:{})",
        firmware_agent, device_id, environment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prodinfo(id: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; DEVICE_ID_OFFSET + DEVICE_ID_LEN];
        data[..4].copy_from_slice(CAL0_MAGIC);
        data[DEVICE_ID_OFFSET..DEVICE_ID_OFFSET + id.len()].copy_from_slice(id);
        data
    }

    #[test]
    fn test_parse_prodinfo() {
        let data = prodinfo(b"0123456789abcdef");
        assert_eq!(parse_prodinfo(&data).unwrap(), "0123456789abcdef");
    }

    #[test]
    fn test_bad_magic() {
        let mut data = prodinfo(b"0123456789abcdef");
        data[0] = b'X';
        assert!(matches!(parse_prodinfo(&data), Err(DeviceError::BadMagic)));
        assert!(matches!(parse_prodinfo(b"CA"), Err(DeviceError::BadMagic)));
    }

    #[test]
    fn test_truncated() {
        let data = b"CAL0 short".to_vec();
        assert!(matches!(
            parse_prodinfo(&data),
            Err(DeviceError::Truncated { len: 10 })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let data = prodinfo(&[0xFF; 16]);
        assert!(matches!(
            parse_prodinfo(&data),
            Err(DeviceError::InvalidDeviceId)
        ));
    }

    #[test]
    fn test_read_device_id_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("PRODINFO.bin");
        fs::write(&path, prodinfo(b"6265ca8e1c4f1d2a")).unwrap();

        assert_eq!(read_device_id(&path).unwrap(), "6265ca8e1c4f1d2a");
        assert!(matches!(
            read_device_id(&temp.path().join("missing.bin")),
            Err(DeviceError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_user_agent() {
        assert_eq!(
            user_agent("0123456789abcdef", "lp1", DEFAULT_FIRMWARE_AGENT),
            "NintendoSDK Firmware/11.0.0-0 (platform:NX; did:0123456789abcdef; eid:lp1)"
        );
    }
}
