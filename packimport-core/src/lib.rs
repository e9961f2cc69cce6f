//! Archive-backed module importing.
//!
//! `packimport-core` resolves dotted module names against compressed
//! archives: a path such as `/srv/app/lib.pack/helpers` binds an
//! [`Importer`] to the archive `/srv/app/lib.pack` with prefix
//! `helpers/`, after which `find`, `load`, `get_source` and friends
//! answer queries for names like `tools.net` by consulting the
//! archive's cached table of contents.
//!
//! The crate is host-agnostic: what a "runnable unit" or a "module"
//! is belongs to the embedding runtime, plugged in through the
//! [`UnitCompiler`] and [`ModuleRegistry`] traits. Archive access
//! goes through `packimport-codec`'s extractor traits, so archives
//! can live on disk or in memory.
//!
//! # Example
//! ```
//! use packimport_core::testing::{TestCompiler, TestRegistry};
//! use packimport_core::{DirectoryCache, ImportEnv, Importer};
//! use packimport_codec::MemoryExtractor;
//! use std::sync::Arc;
//!
//! let codec = Arc::new(MemoryExtractor::with_archive(
//!     "/mem/lib.pack",
//!     [("greeting.mod", b"answer = 42\n".to_vec())],
//! ));
//! let env = ImportEnv::new(
//!     codec.clone(),
//!     codec,
//!     Arc::new(TestCompiler::new(0x1)),
//!     Arc::new(TestRegistry::new()),
//! )
//! .with_cache(Arc::new(DirectoryCache::new()));
//!
//! let importer = Importer::new(env, "/mem/lib.pack").unwrap();
//! let module = importer.load("greeting").unwrap();
//! assert_eq!(module.get("answer"), Some(42));
//! ```

mod acquire;
mod cache;
mod error;
mod host;
mod importer;
mod search;
pub mod testing;
mod toc;

/// Path separator used in archive record names and prefixes.
pub const SEP: char = '/';
/// Alternate separator normalized to [`SEP`] on input.
pub const ALTSEP: char = '\\';

pub use acquire::{
    compiled_unit, normalize_line_endings, source_unit, Fetched, COMPILED_HEADER_SIZE,
};
pub use cache::{global_cache, DirectoryCache};
pub use error::{HostError, ImportError};
pub use host::{LoaderInfo, ModuleRegistry, UnitCompiler};
pub use importer::{ImportEnv, Importer};
pub use search::{
    init_search_order, search_order, search_rules, FindResult, ModuleInfo, SearchOrder,
    SearchRule, COMPILED_SUFFIX, INIT_STEM, SOURCE_SUFFIX,
};
pub use toc::{Toc, TocEntry};
