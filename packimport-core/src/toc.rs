//! TOC loader
//!
//! Builds the in-memory directory index of one archive. The index is
//! built once per archive and shared read-only afterward (see
//! `crate::cache`); record payloads are never stored here, only
//! metadata.

use crate::error::ImportError;
use crate::{ALTSEP, SEP};
use packimport_codec::{ArchiveExtractor, CodecError};
use std::collections::HashMap;
use std::path::Path;

/// Immutable metadata for one archive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// `archive path + / + record path`, used for diagnostics and as
    /// a module's origin label
    pub diagnostic_path: String,
    /// Record index in archive order
    pub index: usize,
    /// Declared size of the decompressed payload
    pub size: u64,
}

/// Directory index of one archive: normalized relative path → entry.
///
/// Keys use `/` as the separator; directory markers keep their
/// trailing `/`.
#[derive(Debug, Default)]
pub struct Toc {
    entries: HashMap<String, TocEntry>,
}

impl Toc {
    /// Read the record list of `archive` into a fresh index.
    ///
    /// Duplicate record names overwrite: the last record wins, which
    /// matches how the archive producer shadows earlier entries.
    ///
    /// # Errors
    /// `ArchiveOpen` when the archive cannot be opened,
    /// `ArchiveCorrupt` when its record stream is malformed.
    pub fn read(extractor: &dyn ArchiveExtractor, archive: &str) -> Result<Self, ImportError> {
        let handle = extractor
            .open(Path::new(archive))
            .map_err(|e| match e {
                CodecError::Corrupt { .. } => ImportError::ArchiveCorrupt {
                    path: archive.to_string(),
                    source: e,
                },
                _ => ImportError::ArchiveOpen {
                    path: archive.to_string(),
                    source: e,
                },
            })?;

        let mut entries = HashMap::new();
        for (index, record) in handle.records().iter().enumerate() {
            let name = record.name.replace(ALTSEP, "/");
            let diagnostic_path = format!("{}{}{}", archive, SEP, name);
            entries.insert(
                name,
                TocEntry {
                    diagnostic_path,
                    index,
                    size: record.size,
                },
            );
        }

        tracing::debug!(
            target: "packimport::toc",
            archive,
            records = entries.len(),
            "directory read"
        );
        Ok(Self { entries })
    }

    /// Look up an entry by normalized relative path.
    pub fn get(&self, key: &str) -> Option<&TocEntry> {
        self.entries.get(key)
    }

    /// Whether the index holds `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(path, entry)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TocEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
