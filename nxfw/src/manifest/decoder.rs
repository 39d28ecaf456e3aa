//! Binary CNMT decoder.

use std::fs;
use std::path::Path;

use super::error::ManifestError;
use super::{
    ContentRef, Manifest, ManifestEntries, ManifestHeader, TitleRef, META_TYPE_SYSTEM_UPDATE,
};
use crate::title::TitleId;
use crate::version::PackedVersion;

/// Size of the fixed header; entry tables start after it.
const HEADER_SIZE: usize = 0x20;

const OFFSET_TITLE_ID: usize = 0x00;
const OFFSET_VERSION: usize = 0x08;
const OFFSET_META_TYPE: usize = 0x0C;
const OFFSET_TABLE: usize = 0x0E;
const OFFSET_CONTENT_COUNT: usize = 0x10;
const OFFSET_META_COUNT: usize = 0x12;

/// System update records: u64 title id, u32 version, 4 bytes padding.
const TITLE_RECORD_SIZE: usize = 0x10;

/// Content records: 32-byte hash, 16-byte content id, 8 bytes of size/type.
const CONTENT_RECORD_SIZE: usize = 0x38;
const HASH_LEN: usize = 0x20;
const CONTENT_ID_LEN: usize = 0x10;

/// Decode a raw manifest buffer.
///
/// Meta type `0x03` selects the title table; any other value is decoded as a
/// content table.
pub fn decode(buf: &[u8]) -> Result<Manifest, ManifestError> {
    ensure_len(buf, HEADER_SIZE)?;

    let meta_type = buf[OFFSET_META_TYPE];
    let table_offset = read_u16(buf, OFFSET_TABLE);
    let base = HEADER_SIZE + table_offset as usize;

    let (entry_count, entries) = if meta_type == META_TYPE_SYSTEM_UPDATE {
        let count = read_u16(buf, OFFSET_META_COUNT);
        ensure_len(buf, base + count as usize * TITLE_RECORD_SIZE)?;
        (count, ManifestEntries::Titles(title_table(buf, base, count)))
    } else {
        let count = read_u16(buf, OFFSET_CONTENT_COUNT);
        ensure_len(buf, base + count as usize * CONTENT_RECORD_SIZE)?;
        (count, ManifestEntries::Contents(content_table(buf, base, count)))
    };

    Ok(Manifest {
        header: ManifestHeader {
            title_id: TitleId::new(read_u64(buf, OFFSET_TITLE_ID)),
            version: PackedVersion::from_raw(read_u32(buf, OFFSET_VERSION)),
            meta_type,
            table_offset,
            entry_count,
        },
        entries,
    })
}

/// Read and decode a manifest file produced by the extractor.
pub fn decode_file(path: &Path) -> Result<Manifest, ManifestError> {
    let buf = fs::read(path).map_err(|e| ManifestError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode(&buf)
}

fn title_table(buf: &[u8], base: usize, count: u16) -> Vec<TitleRef> {
    (0..count as usize)
        .map(|i| {
            let at = base + i * TITLE_RECORD_SIZE;
            TitleRef {
                title_id: TitleId::new(read_u64(buf, at)),
                version: PackedVersion::from_raw(read_u32(buf, at + 8)),
            }
        })
        .collect()
}

fn content_table(buf: &[u8], base: usize, count: u16) -> Vec<ContentRef> {
    (0..count as usize)
        .map(|i| {
            let at = base + i * CONTENT_RECORD_SIZE;
            let hash = &buf[at..at + HASH_LEN];
            let content_id = &buf[at + HASH_LEN..at + HASH_LEN + CONTENT_ID_LEN];
            ContentRef {
                content_id: hex::encode(content_id),
                hash: hex::encode(hash),
            }
        })
        .collect()
}

fn ensure_len(buf: &[u8], needed: usize) -> Result<(), ManifestError> {
    if buf.len() < needed {
        return Err(ManifestError::Truncated {
            needed,
            len: buf.len(),
        });
    }
    Ok(())
}

// Callers check bounds with `ensure_len` first.
fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(b)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;

    fn header(meta_type: u8, table_offset: u16, content_count: u16, meta_count: u16) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&0x0100_0000_0000_0816u64.to_le_bytes());
        buf[8..12].copy_from_slice(&0x4400_0000u32.to_le_bytes());
        buf[OFFSET_META_TYPE] = meta_type;
        buf[0x0E..0x10].copy_from_slice(&table_offset.to_le_bytes());
        buf[0x10..0x12].copy_from_slice(&content_count.to_le_bytes());
        buf[0x12..0x14].copy_from_slice(&meta_count.to_le_bytes());
        buf
    }

    fn title_record(title_id: u64, version: u32) -> Vec<u8> {
        let mut rec = Vec::with_capacity(TITLE_RECORD_SIZE);
        rec.extend_from_slice(&title_id.to_le_bytes());
        rec.extend_from_slice(&version.to_le_bytes());
        rec.extend_from_slice(&[0xEE; 4]);
        rec
    }

    fn content_record(hash: [u8; 32], content_id: [u8; 16]) -> Vec<u8> {
        let mut rec = Vec::with_capacity(CONTENT_RECORD_SIZE);
        rec.extend_from_slice(&hash);
        rec.extend_from_slice(&content_id);
        rec.extend_from_slice(&[0x11; 8]);
        rec
    }

    #[test]
    fn test_decode_system_update_titles() {
        let mut buf = header(0x03, 0, 0, 2);
        buf.extend(title_record(0x0100_0000_0000_0809, 100));
        buf.extend(title_record(0x0100_0000_0000_081B, 200));

        let manifest = decode(&buf).unwrap();

        assert!(manifest.header.is_system_update());
        assert_eq!(manifest.header.title_id, TitleId::SYSTEM_UPDATE);
        assert_eq!(
            manifest.entries.to_vec(),
            vec![
                ManifestEntry::Title(TitleRef {
                    title_id: "0100000000000809".parse().unwrap(),
                    version: PackedVersion::from_raw(100),
                }),
                ManifestEntry::Title(TitleRef {
                    title_id: "010000000000081B".parse().unwrap(),
                    version: PackedVersion::from_raw(200),
                }),
            ]
        );
        match &manifest.entries {
            ManifestEntries::Titles(titles) => {
                assert_eq!(titles[0].title_id.to_string(), "0100000000000809");
                assert_eq!(titles[1].title_id.to_string(), "010000000000081B");
            }
            other => panic!("expected title table, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_content_table_exact_hex() {
        let hash: [u8; 32] = std::array::from_fn(|i| i as u8);
        let content_id: [u8; 16] = std::array::from_fn(|i| 0xA0 + i as u8);

        let mut buf = header(0x01, 0, 1, 0);
        buf.extend(content_record(hash, content_id));

        let manifest = decode(&buf).unwrap();

        assert_eq!(
            manifest.entries.to_vec(),
            vec![ManifestEntry::Content(ContentRef {
                content_id: "a0a1a2a3a4a5a6a7a8a9aaabacadaeaf".to_string(),
                hash: "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
                    .to_string(),
            })]
        );
    }

    #[test]
    fn test_decode_honours_table_offset() {
        let mut buf = header(0x03, 0x10, 0, 1);
        buf.extend([0xFF; 0x10]);
        buf.extend(title_record(0x0100_0000_0000_0809, 7));

        let manifest = decode(&buf).unwrap();
        assert_eq!(
            manifest.entries,
            ManifestEntries::Titles(vec![TitleRef {
                title_id: TitleId::SYSTEM_VERSION_FAT,
                version: PackedVersion::from_raw(7),
            }])
        );
    }

    #[test]
    fn test_unknown_meta_type_uses_content_layout() {
        // 0x80 (application) and anything else share the content branch
        let mut buf = header(0x80, 0, 1, 5);
        buf.extend(content_record([0x22; 32], [0x33; 16]));

        let manifest = decode(&buf).unwrap();
        assert!(matches!(manifest.entries, ManifestEntries::Contents(ref c) if c.len() == 1));
    }

    #[test]
    fn test_empty_table() {
        let buf = header(0x03, 0, 0, 0);
        let manifest = decode(&buf).unwrap();
        assert!(manifest.entries.is_empty());
    }

    #[test]
    fn test_truncated_header() {
        let err = decode(&[0u8; 0x10]).unwrap_err();
        assert!(matches!(err, ManifestError::Truncated { needed: 0x20, len: 0x10 }));
    }

    #[test]
    fn test_truncated_table_is_an_error_not_empty() {
        let mut buf = header(0x01, 0, 2, 0);
        buf.extend(content_record([0; 32], [1; 16]));

        let err = decode(&buf).unwrap_err();
        match err {
            ManifestError::Truncated { needed, len } => {
                assert_eq!(needed, HEADER_SIZE + 2 * CONTENT_RECORD_SIZE);
                assert_eq!(len, HEADER_SIZE + CONTENT_RECORD_SIZE);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let mut buf = header(0x01, 0, 3, 0);
        for i in 0..3u8 {
            buf.extend(content_record([i; 32], [i + 10; 16]));
        }

        let first = decode(&buf).unwrap();
        let second = decode(&buf).unwrap();
        assert_eq!(first, second);

        let ids: Vec<_> = match first.entries {
            ManifestEntries::Contents(c) => c.into_iter().map(|c| c.content_id).collect(),
            _ => unreachable!(),
        };
        assert_eq!(
            ids,
            vec!["0a".repeat(16), "0b".repeat(16), "0c".repeat(16)]
        );
    }

    #[test]
    fn test_decode_file_missing() {
        let err = decode_file(Path::new("/nonexistent/meta.cnmt")).unwrap_err();
        assert!(matches!(err, ManifestError::ReadFailed { .. }));
    }
}
