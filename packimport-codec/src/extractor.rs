//! ArchiveExtractor trait definition

use crate::error::CodecResult;
use std::path::Path;

/// Metadata for one record inside an archive.
///
/// `name` is the path stored by the archive producer (using `/` as the
/// separator); a trailing `/` marks a directory record. `size` is the
/// declared size of the decompressed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    pub name: String,
    pub size: u64,
}

impl RecordInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Whether this record is a directory marker.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// An opened archive.
///
/// Handles are one-shot: callers open, list or extract, and drop the
/// handle. No decompression state persists between requests.
pub trait ArchiveHandle {
    /// Records in archive order.
    fn records(&self) -> &[RecordInfo];

    /// Decompress the record at `index`.
    ///
    /// # Returns
    /// The full decompressed payload, or CodecError
    fn extract(&self, index: usize) -> CodecResult<Vec<u8>>;
}

/// Archive codec seam
///
/// Provides a unified interface for opening archives and extracting
/// records, decoupling the importer from any concrete container
/// format.
///
/// # Implementations
/// - `PackExtractor`: on-disk `.pack` container files
/// - `MemoryExtractor`: in-memory archives for tests
pub trait ArchiveExtractor: Send + Sync {
    /// Open the archive at `path`.
    ///
    /// # Arguments
    /// * `path` - Archive file path
    ///
    /// # Returns
    /// An owned handle over the archive's record list, or CodecError
    fn open(&self, path: &Path) -> CodecResult<Box<dyn ArchiveHandle>>;
}
