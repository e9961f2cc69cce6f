//! In-memory extractor implementation

use crate::error::{CodecError, CodecResult};
use crate::extractor::{ArchiveExtractor, ArchiveHandle, RecordInfo};
use crate::probe::{FileKind, FsProbe};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// An in-memory archive extractor.
///
/// Archives are plain `(record name, payload)` lists held in a
/// `BTreeMap` keyed by archive path, making it suitable for tests and
/// scenarios where disk access is not desired. It doubles as an
/// `FsProbe`: registered archive paths stat as regular files, strict
/// prefixes of them as directories.
///
/// # Example
/// ```
/// use packimport_codec::{ArchiveExtractor, MemoryExtractor};
/// use std::path::Path;
///
/// let codec = MemoryExtractor::with_archive(
///     "/mem/lib.pack",
///     [("a.mod", b"x = 1\n".to_vec())],
/// );
/// let handle = codec.open(Path::new("/mem/lib.pack")).unwrap();
/// assert_eq!(handle.extract(0).unwrap(), b"x = 1\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryExtractor {
    archives: Arc<RwLock<BTreeMap<String, Arc<Vec<(String, Vec<u8>)>>>>>,
}

impl MemoryExtractor {
    /// Create a new empty extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor holding a single archive.
    ///
    /// # Arguments
    /// * `path` - Archive path the importer will address
    /// * `records` - Iterator of (record name, payload) tuples
    pub fn with_archive<I, S>(path: impl AsRef<str>, records: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let codec = Self::new();
        codec.insert_archive(path, records);
        codec
    }

    /// Register (or replace) an archive.
    pub fn insert_archive<I, S>(&self, path: impl AsRef<str>, records: I)
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let records: Vec<(String, Vec<u8>)> = records
            .into_iter()
            .map(|(name, data)| (name.as_ref().to_string(), data))
            .collect();
        let mut map = match self.archives.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.insert(normalize_path(path.as_ref()), Arc::new(records));
    }

    fn lookup(&self, path: &str) -> Option<Arc<Vec<(String, Vec<u8>)>>> {
        let map = match self.archives.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(path).cloned()
    }

    fn has_prefix(&self, path: &str) -> bool {
        let map = match self.archives.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let prefix = format!("{}/", path);
        map.keys().any(|k| k.starts_with(&prefix))
    }
}

/// Uses forward slashes consistently for cross-platform compatibility.
fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

struct MemoryHandle {
    path: String,
    records: Vec<RecordInfo>,
    payloads: Arc<Vec<(String, Vec<u8>)>>,
}

impl ArchiveHandle for MemoryHandle {
    fn records(&self) -> &[RecordInfo] {
        &self.records
    }

    fn extract(&self, index: usize) -> CodecResult<Vec<u8>> {
        self.payloads
            .get(index)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| CodecError::Extract {
                path: self.path.clone(),
                index,
                message: "record index out of bounds".to_string(),
            })
    }
}

impl ArchiveExtractor for MemoryExtractor {
    fn open(&self, path: &Path) -> CodecResult<Box<dyn ArchiveHandle>> {
        let normalized = normalize_path(&path.to_string_lossy());
        let payloads = self
            .lookup(&normalized)
            .ok_or(CodecError::NotFound {
                path: normalized.clone(),
            })?;
        let records = payloads
            .iter()
            .map(|(name, data)| RecordInfo::new(name.clone(), data.len() as u64))
            .collect();
        Ok(Box::new(MemoryHandle {
            path: normalized,
            records,
            payloads,
        }))
    }
}

impl FsProbe for MemoryExtractor {
    fn stat(&self, path: &Path) -> FileKind {
        let normalized = normalize_path(&path.to_string_lossy());
        if self.lookup(&normalized).is_some() {
            FileKind::File
        } else if self.has_prefix(&normalized) {
            FileKind::Directory
        } else {
            FileKind::Missing
        }
    }
}
