//! Host runtime collaborator traits
//!
//! The importer never interprets what a runnable unit *is*; it hands
//! bytes and text to a `UnitCompiler` and finished units to a
//! `ModuleRegistry`. Both seams are implemented by the embedding
//! runtime (a reference pair for tests lives in `crate::testing`).

use crate::error::HostError;

/// Turns source text or compiled bytes into runnable units.
pub trait UnitCompiler: Send + Sync {
    /// Host-runtime representation of a runnable unit.
    type Unit;

    /// The magic number the current runtime stamps into compiled
    /// units it produces.
    fn magic(&self) -> u32;

    /// Compile normalized source text.
    ///
    /// # Arguments
    /// * `source` - Normalized source text (always `\n`-terminated)
    /// * `origin` - Diagnostic path recorded as the unit's origin
    fn compile(&self, source: &str, origin: &str) -> Result<Self::Unit, HostError>;

    /// Deserialize a compiled unit body (header already stripped,
    /// magic already verified).
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Unit, HostError>;
}

/// Loader linkage attached to a module before its unit executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderInfo {
    /// Canonical archive path
    pub archive: String,
    /// `/`-terminated prefix inside the archive, possibly empty
    pub prefix: String,
}

/// The host's module table.
pub trait ModuleRegistry: Send + Sync {
    /// Must match the paired `UnitCompiler::Unit`.
    type Unit;
    /// Host-runtime module handle.
    type Module;

    /// Fetch the module named `name`, creating it if absent.
    fn get_or_create(&self, name: &str) -> Self::Module;

    /// Record which importer loaded this module.
    fn set_loader(&self, module: &Self::Module, loader: &LoaderInfo);

    /// Set the package search path list (single synthetic directory
    /// path for archive-backed packages). Called before execution.
    fn set_package_paths(&self, module: &Self::Module, paths: Vec<String>);

    /// Execute a unit against the module's namespace.
    fn execute(&self, unit: Self::Unit, module: &Self::Module) -> Result<(), HostError>;
}
