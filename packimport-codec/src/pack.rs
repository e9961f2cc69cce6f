//! The `.pack` container format
//!
//! A pack file is a flat list of named, individually deflate-compressed
//! records behind a small versioned header:
//!
//! ```text
//! "PACK" | version u16 | record count u32
//! per record: name_len u16 | name | flags u8 | raw_size u32 | stored_size u32 | payload
//! ```
//!
//! All integers are little-endian. A name ending in `/` marks a
//! directory record (empty payload). Flag bit 0 means the payload is
//! deflate-compressed; the writer stores whichever of raw/compressed
//! is smaller.

use crate::error::{CodecError, CodecResult};
use crate::extractor::{ArchiveExtractor, ArchiveHandle, RecordInfo};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::Path;

/// Pack file magic
pub const PACK_MAGIC: [u8; 4] = *b"PACK";
/// Current pack format version
pub const PACK_VERSION: u16 = 1;

const FLAG_COMPRESSED: u8 = 0x01;

/// Builder for pack files, used by packaging tools and tests.
#[derive(Debug, Default)]
pub struct PackWriter {
    records: Vec<(String, u8, u32, Vec<u8>)>,
}

impl PackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file record.
    ///
    /// # Arguments
    /// * `name` - Record path, `/`-separated
    /// * `data` - Decompressed payload
    pub fn add_file(&mut self, name: impl Into<String>, data: &[u8]) {
        let compressed = deflate(data);
        let (flags, stored) = if compressed.len() < data.len() {
            (FLAG_COMPRESSED, compressed)
        } else {
            (0, data.to_vec())
        };
        self.records
            .push((name.into(), flags, data.len() as u32, stored));
    }

    /// Append a directory marker record.
    ///
    /// A trailing `/` is added if missing.
    pub fn add_dir(&mut self, name: impl Into<String>) {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        self.records.push((name, 0, 0, Vec::new()));
    }

    /// Serialize the pack file.
    pub fn finish(self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&PACK_MAGIC);
        buf.extend_from_slice(&PACK_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        for (name, flags, raw_size, stored) in &self.records {
            buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
            buf.extend_from_slice(name.as_bytes());
            buf.push(*flags);
            buf.extend_from_slice(&raw_size.to_le_bytes());
            buf.extend_from_slice(&(stored.len() as u32).to_le_bytes());
            buf.extend_from_slice(stored);
        }
        buf
    }

    /// Serialize and write the pack file to disk.
    pub fn write_to(self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.finish())
    }
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    // writing into a Vec cannot fail
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

struct RawEntry {
    offset: usize,
    stored_size: usize,
    raw_size: usize,
    compressed: bool,
}

/// A parsed pack file.
///
/// Owns the raw bytes; records are decompressed on demand.
pub struct PackArchive {
    label: String,
    records: Vec<RecordInfo>,
    entries: Vec<RawEntry>,
    data: Vec<u8>,
}

impl PackArchive {
    /// Parse a pack file from bytes.
    ///
    /// # Arguments
    /// * `data` - Full file contents
    /// * `label` - Path used in error messages
    pub fn from_bytes(data: Vec<u8>, label: impl Into<String>) -> CodecResult<Self> {
        let label = label.into();
        let corrupt = |message: &str| CodecError::Corrupt {
            path: label.clone(),
            message: message.to_string(),
        };

        if data.len() < 10 {
            return Err(corrupt("file shorter than pack header"));
        }
        if data[..4] != PACK_MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != PACK_VERSION {
            return Err(corrupt(&format!("unsupported pack version {}", version)));
        }
        let count = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;

        let mut records = Vec::with_capacity(count);
        let mut entries = Vec::with_capacity(count);
        let mut pos = 10;
        for _ in 0..count {
            if pos + 2 > data.len() {
                return Err(corrupt("truncated record header"));
            }
            let name_len = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
            pos += 2;
            if pos + name_len + 9 > data.len() {
                return Err(corrupt("truncated record header"));
            }
            let name = std::str::from_utf8(&data[pos..pos + name_len])
                .map_err(|_| corrupt("record name is not valid UTF-8"))?
                .to_string();
            pos += name_len;
            let flags = data[pos];
            pos += 1;
            let raw_size =
                u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
                    as usize;
            pos += 4;
            let stored_size =
                u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
                    as usize;
            pos += 4;
            if pos + stored_size > data.len() {
                return Err(corrupt("record payload extends past end of file"));
            }
            records.push(RecordInfo::new(name, raw_size as u64));
            entries.push(RawEntry {
                offset: pos,
                stored_size,
                raw_size,
                compressed: flags & FLAG_COMPRESSED != 0,
            });
            pos += stored_size;
        }

        Ok(Self {
            label,
            records,
            entries,
            data,
        })
    }

    /// Read and parse a pack file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> CodecResult<Self> {
        let path = path.as_ref();
        let label = path.to_string_lossy().to_string();
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CodecError::NotFound {
                    path: label.clone(),
                }
            } else {
                CodecError::Open {
                    path: label.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        Self::from_bytes(data, label)
    }
}

impl ArchiveHandle for PackArchive {
    fn records(&self) -> &[RecordInfo] {
        &self.records
    }

    fn extract(&self, index: usize) -> CodecResult<Vec<u8>> {
        let entry = self.entries.get(index).ok_or_else(|| CodecError::Extract {
            path: self.label.clone(),
            index,
            message: "record index out of bounds".to_string(),
        })?;
        let stored = &self.data[entry.offset..entry.offset + entry.stored_size];
        let payload = if entry.compressed {
            let mut decoder = DeflateDecoder::new(stored);
            let mut out = Vec::with_capacity(entry.raw_size);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| CodecError::Extract {
                    path: self.label.clone(),
                    index,
                    message: e.to_string(),
                })?;
            out
        } else {
            stored.to_vec()
        };
        if payload.len() != entry.raw_size {
            return Err(CodecError::Extract {
                path: self.label.clone(),
                index,
                message: format!(
                    "decompressed to {} bytes, expected {}",
                    payload.len(),
                    entry.raw_size
                ),
            });
        }
        Ok(payload)
    }
}

/// Extractor backed by on-disk `.pack` files.
///
/// Every `open` re-reads and re-parses the file; no decompression
/// session is shared between requests.
#[derive(Debug, Clone, Default)]
pub struct PackExtractor;

impl PackExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for PackExtractor {
    fn open(&self, path: &Path) -> CodecResult<Box<dyn ArchiveHandle>> {
        Ok(Box::new(PackArchive::from_file(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pack() -> Vec<u8> {
        let mut writer = PackWriter::new();
        writer.add_file("a.mod", b"x = 1\n");
        writer.add_dir("pkg");
        writer.add_file("pkg/__init__.mod", b"y = 2\n");
        writer.finish()
    }

    #[test]
    fn test_round_trip() {
        let archive = PackArchive::from_bytes(sample_pack(), "test.pack").unwrap();
        let records = archive.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "a.mod");
        assert_eq!(records[0].size, 6);
        assert_eq!(archive.extract(0).unwrap(), b"x = 1\n");
        assert_eq!(archive.extract(2).unwrap(), b"y = 2\n");
    }

    #[test]
    fn test_dir_marker() {
        let archive = PackArchive::from_bytes(sample_pack(), "test.pack").unwrap();
        let dir = &archive.records()[1];
        assert_eq!(dir.name, "pkg/");
        assert!(dir.is_dir());
        assert_eq!(dir.size, 0);
        assert!(archive.extract(1).unwrap().is_empty());
    }

    #[test]
    fn test_large_record_compresses() {
        let mut writer = PackWriter::new();
        let data = vec![b'k'; 64 * 1024];
        writer.add_file("big.bin", &data);
        let bytes = writer.finish();
        assert!(bytes.len() < data.len());

        let archive = PackArchive::from_bytes(bytes, "big.pack").unwrap();
        assert_eq!(archive.extract(0).unwrap(), data);
    }

    #[test]
    fn test_incompressible_record_stored_raw() {
        let mut writer = PackWriter::new();
        writer.add_file("tiny.mod", b"z");
        let bytes = writer.finish();

        let archive = PackArchive::from_bytes(bytes, "tiny.pack").unwrap();
        assert_eq!(archive.extract(0).unwrap(), b"z");
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_pack();
        bytes[0] = b'X';
        let result = PackArchive::from_bytes(bytes, "test.pack");
        assert!(matches!(result, Err(CodecError::Corrupt { .. })));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = sample_pack();
        bytes[4] = 0xFF;
        let result = PackArchive::from_bytes(bytes, "test.pack");
        assert!(matches!(result, Err(CodecError::Corrupt { .. })));
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = sample_pack();
        bytes.truncate(bytes.len() - 1);
        let result = PackArchive::from_bytes(bytes, "test.pack");
        assert!(matches!(result, Err(CodecError::Corrupt { .. })));
    }

    #[test]
    fn test_extract_out_of_bounds() {
        let archive = PackArchive::from_bytes(sample_pack(), "test.pack").unwrap();
        let result = archive.extract(99);
        assert!(matches!(result, Err(CodecError::Extract { .. })));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.pack");
        let mut writer = PackWriter::new();
        writer.add_file("m.mod", b"v = 7\n");
        writer.write_to(&path).unwrap();

        let archive = PackArchive::from_file(&path).unwrap();
        assert_eq!(archive.records()[0].name, "m.mod");
        assert_eq!(archive.extract(0).unwrap(), b"v = 7\n");
    }

    #[test]
    fn test_from_file_not_found() {
        let result = PackArchive::from_file("/nonexistent/lib.pack");
        assert!(matches!(result, Err(CodecError::NotFound { .. })));
    }

    #[test]
    fn test_extractor_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.pack");
        let mut writer = PackWriter::new();
        writer.add_file("m.mod", b"v = 7\n");
        writer.write_to(&path).unwrap();

        let extractor = PackExtractor::new();
        let handle = extractor.open(&path).unwrap();
        assert_eq!(handle.records().len(), 1);
        assert_eq!(handle.extract(0).unwrap(), b"v = 7\n");
    }
}
