//! Reference host runtime
//!
//! A deliberately tiny host language for exercising the importer:
//! units are lists of `name = integer` assignments, modules are maps.
//! Used by this crate's own tests and usable by downstream crates as
//! a fixture host.

use crate::error::HostError;
use crate::host::{LoaderInfo, ModuleRegistry, UnitCompiler};
use crate::COMPILED_HEADER_SIZE;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A runnable unit of the reference host: ordered integer
/// assignments plus the diagnostic origin they were compiled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
    pub origin: String,
    pub assignments: Vec<(String, i64)>,
}

fn parse_assignments(text: &str, origin: &str) -> Result<Vec<(String, i64)>, HostError> {
    let mut assignments = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, value) = line.split_once('=').ok_or_else(|| {
            HostError::new(format!(
                "{}: line {}: expected `name = value`",
                origin,
                lineno + 1
            ))
        })?;
        let value: i64 = value.trim().parse().map_err(|_| {
            HostError::new(format!(
                "{}: line {}: `{}` is not an integer",
                origin,
                lineno + 1,
                value.trim()
            ))
        })?;
        assignments.push((name.trim().to_string(), value));
    }
    Ok(assignments)
}

/// Compiler/deserializer for the reference host.
///
/// Compiled unit bodies are simply the UTF-8 source of the same
/// assignment grammar, so fixtures can be written by hand.
#[derive(Debug, Clone)]
pub struct TestCompiler {
    magic: u32,
}

impl TestCompiler {
    pub fn new(magic: u32) -> Self {
        Self { magic }
    }
}

impl UnitCompiler for TestCompiler {
    type Unit = TestUnit;

    fn magic(&self) -> u32 {
        self.magic
    }

    fn compile(&self, source: &str, origin: &str) -> Result<TestUnit, HostError> {
        Ok(TestUnit {
            origin: origin.to_string(),
            assignments: parse_assignments(source, origin)?,
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<TestUnit, HostError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| HostError::new("unit body is not valid UTF-8"))?;
        Ok(TestUnit {
            origin: "<compiled>".to_string(),
            assignments: parse_assignments(text, "<compiled>")?,
        })
    }
}

/// Build a compiled unit payload: header (magic + zero padding)
/// followed by `body` in the reference grammar.
pub fn encode_unit(magic: u32, body: &str) -> Vec<u8> {
    let mut data = vec![0u8; COMPILED_HEADER_SIZE];
    data[..4].copy_from_slice(&magic.to_le_bytes());
    data.extend_from_slice(body.as_bytes());
    data
}

/// A module of the reference host.
#[derive(Debug, Default)]
pub struct TestModule {
    pub name: String,
    namespace: Mutex<HashMap<String, i64>>,
    loader: Mutex<Option<LoaderInfo>>,
    package_paths: Mutex<Vec<String>>,
}

impl TestModule {
    /// Read one namespace binding.
    pub fn get(&self, name: &str) -> Option<i64> {
        lock(&self.namespace).get(name).copied()
    }

    /// The loader linkage recorded before execution, if any.
    pub fn loader(&self) -> Option<LoaderInfo> {
        lock(&self.loader).clone()
    }

    pub fn package_paths(&self) -> Vec<String> {
        lock(&self.package_paths).clone()
    }
}

/// Module table of the reference host.
#[derive(Debug, Default)]
pub struct TestRegistry {
    modules: Mutex<HashMap<String, Arc<TestModule>>>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an already-registered module without creating it.
    pub fn module(&self, name: &str) -> Option<Arc<TestModule>> {
        lock(&self.modules).get(name).cloned()
    }
}

impl ModuleRegistry for TestRegistry {
    type Unit = TestUnit;
    type Module = Arc<TestModule>;

    fn get_or_create(&self, name: &str) -> Arc<TestModule> {
        lock(&self.modules)
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(TestModule {
                    name: name.to_string(),
                    ..TestModule::default()
                })
            })
            .clone()
    }

    fn set_loader(&self, module: &Arc<TestModule>, loader: &LoaderInfo) {
        *lock(&module.loader) = Some(loader.clone());
    }

    fn set_package_paths(&self, module: &Arc<TestModule>, paths: Vec<String>) {
        *lock(&module.package_paths) = paths;
    }

    fn execute(&self, unit: TestUnit, module: &Arc<TestModule>) -> Result<(), HostError> {
        let mut namespace = lock(&module.namespace);
        for (name, value) in unit.assignments {
            if name == "boom" {
                // escape hatch for tests that need execution to fail
                return Err(HostError::new("boom"));
            }
            namespace.insert(name, value);
        }
        Ok(())
    }
}
