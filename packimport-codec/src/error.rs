//! Codec Error Types

use std::fmt;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Error type for codec operations
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Archive file not found
    NotFound { path: String },

    /// Archive could not be opened
    Open { path: String, message: String },

    /// Archive record stream is malformed
    Corrupt { path: String, message: String },

    /// A record could not be decompressed
    Extract {
        path: String,
        index: usize,
        message: String,
    },

    /// IO error
    Io { message: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::NotFound { path } => write!(f, "Archive not found: {}", path),
            CodecError::Open { path, message } => {
                write!(f, "Can't open archive '{}': {}", path, message)
            }
            CodecError::Corrupt { path, message } => {
                write!(f, "Malformed archive '{}': {}", path, message)
            }
            CodecError::Extract {
                path,
                index,
                message,
            } => {
                write!(
                    f,
                    "Can't extract record {} from '{}': {}",
                    index, path, message
                )
            }
            CodecError::Io { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io {
            message: err.to_string(),
        }
    }
}
