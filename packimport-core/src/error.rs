//! Import error taxonomy
//!
//! Every error carries the archive path and the module/resource name
//! it was raised for, wrapping the originating collaborator error
//! rather than replacing it. The single recoverable condition —
//! compiled-unit magic mismatch — is not an error at all (see
//! `acquire::Fetched`).

use packimport_codec::CodecError;
use thiserror::Error;

/// Diagnostic produced by a host collaborator (compiler, deserializer
/// or module registry). The message is preserved verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Importer error type
#[derive(Error, Debug)]
pub enum ImportError {
    /// The archive could not be opened
    #[error("can't open archive '{path}'")]
    ArchiveOpen {
        path: String,
        #[source]
        source: CodecError,
    },

    /// The archive's record stream is malformed
    #[error("can't read archive '{path}'")]
    ArchiveCorrupt {
        path: String,
        #[source]
        source: CodecError,
    },

    /// No ancestor of the given path is a regular file
    #[error("not an archive: '{path}'")]
    NotAnArchive { path: String },

    /// The dotted name resolves to nothing loadable
    #[error("can't find module '{name}' in '{archive}'")]
    ModuleNotFound { name: String, archive: String },

    /// get_data was asked for a path absent from the TOC
    #[error("resource '{path}' not found in '{archive}'")]
    ResourceNotFound { path: String, archive: String },

    /// A record failed to decompress
    #[error("can't extract '{path}' from '{archive}'")]
    Extract {
        path: String,
        archive: String,
        #[source]
        source: CodecError,
    },

    /// Source text failed to compile
    #[error("can't compile '{path}'")]
    Compile {
        path: String,
        #[source]
        source: HostError,
    },

    /// A compiled unit with a valid magic failed to deserialize
    #[error("bad compiled unit '{path}'")]
    ExecutableDeserialize {
        path: String,
        #[source]
        source: HostError,
    },

    /// Executing a unit against a module namespace failed
    #[error("error executing module '{name}' from '{path}'")]
    Execute {
        name: String,
        path: String,
        #[source]
        source: HostError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_carries_context() {
        let err = ImportError::ModuleNotFound {
            name: "pkg.sub".to_string(),
            archive: "/srv/lib.pack".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("pkg.sub"));
        assert!(text.contains("/srv/lib.pack"));
    }

    #[test]
    fn test_source_preserved_verbatim() {
        let err = ImportError::Compile {
            path: "/srv/lib.pack/a.mod".to_string(),
            source: HostError::new("line 3: unexpected ')'"),
        };
        let source = err.source().expect("compile errors wrap a host error");
        assert_eq!(source.to_string(), "line 3: unexpected ')'");
    }

    #[test]
    fn test_codec_error_wrapped() {
        let err = ImportError::ArchiveCorrupt {
            path: "/srv/lib.pack".to_string(),
            source: CodecError::Corrupt {
                path: "/srv/lib.pack".to_string(),
                message: "bad magic".to_string(),
            },
        };
        assert!(err.source().is_some());
    }
}
