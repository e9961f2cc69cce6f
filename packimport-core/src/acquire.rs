//! Code acquisition and fallback
//!
//! Turns a resolved record's bytes into a runnable unit. A compiled
//! candidate whose magic number does not match the host's current
//! format is a soft miss (`Fetched::MagicMismatch`) so resolution can
//! fall through to the next search rule; every other failure is a
//! hard error.

use crate::error::{HostError, ImportError};
use crate::host::UnitCompiler;

/// Fixed size of a compiled unit's header. The first 4 bytes hold the
/// little-endian magic number; the rest is producer metadata the
/// importer ignores.
pub const COMPILED_HEADER_SIZE: usize = 16;

/// Outcome of fetching a compiled candidate.
///
/// Success and the fallback signal are distinct variants so a stale
/// unit can never masquerade as a loaded one.
#[derive(Debug)]
pub enum Fetched<U> {
    /// The unit deserialized cleanly
    Unit(U),
    /// Stale magic number; the caller should try the next rule
    MagicMismatch,
}

/// Replace every `\r\n` or lone `\r` with `\n` and guarantee a
/// trailing `\n` (empty input normalizes to `"\n"`).
pub fn normalize_line_endings(source: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(source.len() + 1);
    let mut i = 0;
    while i < source.len() {
        if source[i] == b'\r' {
            out.push(b'\n');
            if source.get(i + 1) == Some(&b'\n') {
                i += 1;
            }
        } else {
            out.push(source[i]);
        }
        i += 1;
    }
    if out.last() != Some(&b'\n') {
        out.push(b'\n');
    }
    out
}

/// Validate and deserialize a compiled unit.
///
/// # Arguments
/// * `origin` - Diagnostic path of the record
/// * `data` - Full record payload including the header
///
/// # Errors
/// A payload shorter than the header, or a deserializer failure after
/// a magic match, is a hard `ExecutableDeserialize` error — only the
/// magic mismatch itself is recoverable.
pub fn compiled_unit<C: UnitCompiler>(
    compiler: &C,
    origin: &str,
    data: &[u8],
) -> Result<Fetched<C::Unit>, ImportError> {
    if data.len() < COMPILED_HEADER_SIZE {
        return Err(ImportError::ExecutableDeserialize {
            path: origin.to_string(),
            source: HostError::new("compiled unit shorter than its header"),
        });
    }
    let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if magic != compiler.magic() {
        tracing::debug!(
            target: "packimport::load",
            path = origin,
            found = magic,
            expected = compiler.magic(),
            "bad magic, trying next candidate"
        );
        return Ok(Fetched::MagicMismatch);
    }
    compiler
        .deserialize(&data[COMPILED_HEADER_SIZE..])
        .map(Fetched::Unit)
        .map_err(|e| ImportError::ExecutableDeserialize {
            path: origin.to_string(),
            source: e,
        })
}

/// Normalize and compile a source record.
pub fn source_unit<C: UnitCompiler>(
    compiler: &C,
    origin: &str,
    data: &[u8],
) -> Result<C::Unit, ImportError> {
    let normalized = normalize_line_endings(data);
    let text = String::from_utf8(normalized).map_err(|_| ImportError::Compile {
        path: origin.to_string(),
        source: HostError::new("source is not valid UTF-8"),
    })?;
    compiler
        .compile(&text, origin)
        .map_err(|e| ImportError::Compile {
            path: origin.to_string(),
            source: e,
        })
}
