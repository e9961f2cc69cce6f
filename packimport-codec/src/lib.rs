//! Packimport Archive Codec
//!
//! The codec seam between the module importer and concrete archive
//! containers, with multiple backend implementations.
//!
//! # Usage
//! ```rust,ignore
//! use packimport_codec::{ArchiveExtractor, PackExtractor};
//! use std::path::Path;
//!
//! let codec = PackExtractor::new();
//! let handle = codec.open(Path::new("/srv/lib.pack"))?;
//! for record in handle.records() {
//!     println!("{} ({} bytes)", record.name, record.size);
//! }
//! ```

mod error;
mod extractor;
mod memory;
mod pack;
mod probe;

pub use error::{CodecError, CodecResult};
pub use extractor::{ArchiveExtractor, ArchiveHandle, RecordInfo};
pub use memory::MemoryExtractor;
pub use pack::{PackArchive, PackExtractor, PackWriter, PACK_MAGIC, PACK_VERSION};
pub use probe::{FileKind, FsProbe, NativeProbe};

/// Create a new in-memory extractor.
pub fn memory_extractor() -> MemoryExtractor {
    MemoryExtractor::new()
}

/// Create a new pack-file extractor.
pub fn pack_extractor() -> PackExtractor {
    PackExtractor::new()
}
