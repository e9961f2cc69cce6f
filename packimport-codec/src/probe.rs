//! Filesystem probe seam
//!
//! The importer walks a candidate path upward until it hits a regular
//! file; this trait is the only filesystem access it performs.

use std::path::Path;

/// Classification of a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A regular file
    File,
    /// A directory
    Directory,
    /// Nothing at this path
    Missing,
}

/// Filesystem stat seam
pub trait FsProbe: Send + Sync {
    /// Classify `path` without following the archive format.
    fn stat(&self, path: &Path) -> FileKind;
}

/// Probe backed by the native OS filesystem.
#[derive(Debug, Clone, Default)]
pub struct NativeProbe;

impl NativeProbe {
    pub fn new() -> Self {
        Self
    }
}

impl FsProbe for NativeProbe {
    fn stat(&self, path: &Path) -> FileKind {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => FileKind::File,
            Ok(meta) if meta.is_dir() => FileKind::Directory,
            // symlinks to nothing, devices etc. are not archives
            Ok(_) => FileKind::Missing,
            Err(_) => FileKind::Missing,
        }
    }
}
