//! The importer: one archive (plus optional prefix) answering
//! existence and load queries for dotted module names.

use crate::acquire::{self, Fetched};
use crate::cache::DirectoryCache;
use crate::error::ImportError;
use crate::host::{LoaderInfo, ModuleRegistry, UnitCompiler};
use crate::search::{
    search_order, search_rules, FindResult, ModuleInfo, SearchOrder, INIT_STEM, SOURCE_SUFFIX,
};
use crate::toc::{Toc, TocEntry};
use crate::{ALTSEP, SEP};
use packimport_codec::{ArchiveExtractor, CodecError, FileKind, FsProbe};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Shared collaborators an importer is constructed against.
///
/// Everything is `Arc`-held so one environment can serve any number
/// of importers (and threads).
pub struct ImportEnv<C, R> {
    pub extractor: Arc<dyn ArchiveExtractor>,
    pub probe: Arc<dyn FsProbe>,
    pub cache: Arc<DirectoryCache>,
    pub compiler: Arc<C>,
    pub registry: Arc<R>,
}

impl<C, R> ImportEnv<C, R> {
    /// Build an environment over the process-global directory cache.
    pub fn new(
        extractor: Arc<dyn ArchiveExtractor>,
        probe: Arc<dyn FsProbe>,
        compiler: Arc<C>,
        registry: Arc<R>,
    ) -> Self {
        Self {
            extractor,
            probe,
            cache: crate::cache::global_cache(),
            compiler,
            registry,
        }
    }

    /// Replace the directory cache (test isolation).
    pub fn with_cache(mut self, cache: Arc<DirectoryCache>) -> Self {
        self.cache = cache;
        self
    }
}

impl<C, R> Clone for ImportEnv<C, R> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            probe: Arc::clone(&self.probe),
            cache: Arc::clone(&self.cache),
            compiler: Arc::clone(&self.compiler),
            registry: Arc::clone(&self.registry),
        }
    }
}

/// `fullname.rsplit('.')` — the last dotted component.
fn subname(fullname: &str) -> &str {
    match fullname.rfind('.') {
        Some(dot) => &fullname[dot + 1..],
        None => fullname,
    }
}

struct Acquired<U> {
    unit: U,
    is_package: bool,
    modpath: String,
}

/// Resolver bound to one archive and optional prefix.
///
/// Immutable after construction; the TOC reference is shared with
/// the directory cache and any sibling importers.
pub struct Importer<C: UnitCompiler, R: ModuleRegistry<Unit = C::Unit>> {
    archive: String,
    prefix: String,
    toc: Arc<Toc>,
    env: ImportEnv<C, R>,
    order: SearchOrder,
}

impl<C: UnitCompiler, R: ModuleRegistry<Unit = C::Unit>> Importer<C, R> {
    /// Bind an importer to `path`, which may point at an archive file
    /// or at a directory *inside* one (`/srv/lib.pack/helpers`).
    ///
    /// The path is walked upward until a regular file is found; the
    /// remainder becomes the separator-terminated prefix. Uses the
    /// process-wide search order.
    pub fn new(env: ImportEnv<C, R>, path: &str) -> Result<Self, ImportError> {
        Self::with_order(env, path, search_order())
    }

    /// Like [`Importer::new`] with an explicit search order.
    pub fn with_order(
        env: ImportEnv<C, R>,
        path: &str,
        order: SearchOrder,
    ) -> Result<Self, ImportError> {
        let normalized = path.replace(ALTSEP, "/");
        if normalized.is_empty() {
            return Err(ImportError::NotAnArchive { path: normalized });
        }

        let mut archive = None;
        for ancestor in Path::new(&normalized).ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            match env.probe.stat(ancestor) {
                FileKind::File => {
                    archive = Some(ancestor.to_string_lossy().to_string());
                    break;
                }
                // something exists here but it is not an archive file,
                // so no shorter ancestor can be one either
                FileKind::Directory => break,
                FileKind::Missing => continue,
            }
        }
        let archive = archive.ok_or(ImportError::NotAnArchive {
            path: normalized.clone(),
        })?;

        let toc = env.cache.get_or_build(&archive, env.extractor.as_ref())?;

        let mut prefix = normalized[archive.len()..]
            .trim_start_matches('/')
            .to_string();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push(SEP);
        }

        Ok(Self {
            archive,
            prefix,
            toc,
            env,
            order,
        })
    }

    /// Canonical path of the archive this importer reads from.
    pub fn archive(&self) -> &str {
        &self.archive
    }

    /// Separator-terminated prefix inside the archive, possibly empty.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The shared directory index (debug/introspection surface).
    pub fn toc(&self) -> &Toc {
        &self.toc
    }

    /// `prefix + subname` with dots mapped to separators.
    fn base_path(&self, sub: &str) -> String {
        format!("{}{}", self.prefix, sub.replace('.', "/"))
    }

    /// Synthetic directory path for a package or namespace portion.
    fn synthetic_dir_path(&self, sub: &str) -> String {
        format!("{}{}{}{}", self.archive, SEP, self.prefix, sub)
    }

    fn module_info(&self, fullname: &str) -> ModuleInfo {
        let base = self.base_path(subname(fullname));
        for rule in search_rules(self.order) {
            let candidate = format!("{}{}", base, rule.suffix);
            if self.toc.contains(&candidate) {
                return if rule.is_package {
                    ModuleInfo::Package
                } else {
                    ModuleInfo::Module
                };
            }
        }
        ModuleInfo::NotFound
    }

    /// Narrow existence check: can this importer load `fullname`?
    ///
    /// Namespace portions collapse to `false`; callers that care use
    /// [`Importer::find_with_namespace`].
    pub fn find(&self, fullname: &str) -> bool {
        matches!(self.find_with_namespace(fullname), FindResult::Found)
    }

    /// Full discriminated lookup, exposing the namespace-portion
    /// outcome.
    pub fn find_with_namespace(&self, fullname: &str) -> FindResult {
        match self.module_info(fullname) {
            ModuleInfo::Module | ModuleInfo::Package => FindResult::Found,
            ModuleInfo::NotFound => {
                // no loadable unit; a bare directory marker still makes
                // this name a possible namespace-package portion
                let sub = subname(fullname);
                let dir_key = format!("{}{}{}", self.prefix, sub, SEP);
                if self.toc.contains(&dir_key) {
                    FindResult::NamespacePortion(self.synthetic_dir_path(sub))
                } else {
                    FindResult::NotFound
                }
            }
        }
    }

    fn extract(&self, entry: &TocEntry) -> Result<Vec<u8>, ImportError> {
        let handle = self
            .env
            .extractor
            .open(Path::new(&self.archive))
            .map_err(|e| match e {
                CodecError::Corrupt { .. } => ImportError::ArchiveCorrupt {
                    path: self.archive.clone(),
                    source: e,
                },
                _ => ImportError::ArchiveOpen {
                    path: self.archive.clone(),
                    source: e,
                },
            })?;
        handle.extract(entry.index).map_err(|e| ImportError::Extract {
            path: entry.diagnostic_path.clone(),
            archive: self.archive.clone(),
            source: e,
        })
    }

    /// Walk the search rules and produce the runnable unit for
    /// `fullname`, falling through stale compiled candidates.
    fn acquire(&self, fullname: &str) -> Result<Acquired<C::Unit>, ImportError> {
        let base = self.base_path(subname(fullname));
        for rule in search_rules(self.order) {
            let candidate = format!("{}{}", base, rule.suffix);
            tracing::trace!(
                target: "packimport::resolve",
                archive = %self.archive,
                candidate = %candidate,
                "trying"
            );
            let Some(entry) = self.toc.get(&candidate) else {
                continue;
            };
            let data = self.extract(entry)?;
            let unit = if rule.is_compiled {
                match acquire::compiled_unit(
                    self.env.compiler.as_ref(),
                    &entry.diagnostic_path,
                    &data,
                )? {
                    Fetched::Unit(unit) => unit,
                    Fetched::MagicMismatch => continue,
                }
            } else {
                acquire::source_unit(self.env.compiler.as_ref(), &entry.diagnostic_path, &data)?
            };
            return Ok(Acquired {
                unit,
                is_package: rule.is_package,
                modpath: entry.diagnostic_path.clone(),
            });
        }
        Err(ImportError::ModuleNotFound {
            name: fullname.to_string(),
            archive: self.archive.clone(),
        })
    }

    /// Load and execute the module named `fullname`.
    ///
    /// The loader back-reference and, for packages, the synthetic
    /// package path are attached before the unit runs, so the
    /// executing code can observe them.
    pub fn load(&self, fullname: &str) -> Result<R::Module, ImportError> {
        let acquired = self.acquire(fullname)?;
        let module = self.env.registry.get_or_create(fullname);

        let loader = LoaderInfo {
            archive: self.archive.clone(),
            prefix: self.prefix.clone(),
        };
        self.env.registry.set_loader(&module, &loader);
        if acquired.is_package {
            let pkg_path = self.synthetic_dir_path(subname(fullname));
            self.env.registry.set_package_paths(&module, vec![pkg_path]);
        }

        self.env
            .registry
            .execute(acquired.unit, &module)
            .map_err(|e| ImportError::Execute {
                name: fullname.to_string(),
                path: acquired.modpath.clone(),
                source: e,
            })?;

        tracing::debug!(
            target: "packimport::load",
            module = fullname,
            path = %acquired.modpath,
            "module loaded"
        );
        Ok(module)
    }

    /// Raw bytes of an arbitrary archive resource.
    ///
    /// `path` may be fully qualified (`archive path + / + key`) or
    /// archive-relative; no compile or deserialize step is involved.
    pub fn get_data(&self, path: &str) -> Result<Vec<u8>, ImportError> {
        let normalized = path.replace(ALTSEP, "/");
        let key = match normalized.strip_prefix(&self.archive) {
            Some(rest) if rest.starts_with(SEP) => &rest[1..],
            _ => normalized.as_str(),
        };
        let entry = self
            .toc
            .get(key)
            .ok_or_else(|| ImportError::ResourceNotFound {
                path: key.to_string(),
                archive: self.archive.clone(),
            })?;
        self.extract(entry)
    }

    /// The runnable unit `load` would execute, without executing it.
    pub fn get_code(&self, fullname: &str) -> Result<C::Unit, ImportError> {
        Ok(self.acquire(fullname)?.unit)
    }

    /// Diagnostic path of the record `load` would execute.
    pub fn get_filename(&self, fullname: &str) -> Result<String, ImportError> {
        Ok(self.acquire(fullname)?.modpath)
    }

    /// Source text for `fullname`, or `None` when the module exists
    /// but the archive carries no source record for it.
    pub fn get_source(&self, fullname: &str) -> Result<Option<String>, ImportError> {
        let info = self.module_info(fullname);
        if info == ModuleInfo::NotFound {
            return Err(ImportError::ModuleNotFound {
                name: fullname.to_string(),
                archive: self.archive.clone(),
            });
        }

        let base = self.base_path(subname(fullname));
        let key = if info == ModuleInfo::Package {
            format!("{}{}{}{}", base, SEP, INIT_STEM, SOURCE_SUFFIX)
        } else {
            format!("{}{}", base, SOURCE_SUFFIX)
        };
        match self.toc.get(&key) {
            Some(entry) => {
                let data = self.extract(entry)?;
                let text = String::from_utf8(data).map_err(|_| ImportError::Compile {
                    path: entry.diagnostic_path.clone(),
                    source: crate::error::HostError::new("source is not valid UTF-8"),
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// Whether `fullname` names a package.
    ///
    /// # Errors
    /// `ModuleNotFound` when the name resolves to nothing loadable.
    pub fn is_package(&self, fullname: &str) -> Result<bool, ImportError> {
        match self.module_info(fullname) {
            ModuleInfo::Package => Ok(true),
            ModuleInfo::Module => Ok(false),
            ModuleInfo::NotFound => Err(ImportError::ModuleNotFound {
                name: fullname.to_string(),
                archive: self.archive.clone(),
            }),
        }
    }
}

impl<C: UnitCompiler, R: ModuleRegistry<Unit = C::Unit>> fmt::Display for Importer<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "<packimport importer \"{}\">", self.archive)
        } else {
            write!(
                f,
                "<packimport importer \"{}{}{}\">",
                self.archive, SEP, self.prefix
            )
        }
    }
}

impl<C: UnitCompiler, R: ModuleRegistry<Unit = C::Unit>> fmt::Debug for Importer<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("archive", &self.archive)
            .field("prefix", &self.prefix)
            .field("records", &self.toc.len())
            .field("order", &self.order)
            .finish()
    }
}
