//! End-to-end importing from an on-disk pack file.

use packimport_codec::{NativeProbe, PackExtractor, PackWriter};
use packimport_core::testing::{encode_unit, TestCompiler, TestRegistry};
use packimport_core::{
    DirectoryCache, FindResult, ImportEnv, ImportError, Importer, SearchOrder,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const MAGIC: u32 = 0x504B_0001;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write the fixture archive into `dir` and return its path.
fn write_archive(dir: &TempDir) -> String {
    let mut writer = PackWriter::new();
    writer.add_file("a.mod", b"x = 1\n");
    writer.add_file("a.modc", &encode_unit(MAGIC, "x = 2\n"));
    writer.add_file("stale.mod", b"v = 10\n");
    writer.add_file("stale.modc", &encode_unit(MAGIC ^ 0xFF, "v = 99\n"));
    writer.add_dir("pkg");
    writer.add_file("pkg/__init__.mod", b"y = 3\r\n");
    writer.add_file("pkg/tools.modc", &encode_unit(MAGIC, "z = 4\n"));
    writer.add_dir("ns");
    writer.add_file("data/blob.bin", &[0u8, 159, 146, 150, 13, 10]);

    let path = dir.path().join("lib.pack");
    writer.write_to(&path).unwrap();
    path.to_string_lossy().to_string()
}

fn env() -> ImportEnv<TestCompiler, TestRegistry> {
    ImportEnv::new(
        Arc::new(PackExtractor::new()),
        Arc::new(NativeProbe::new()),
        Arc::new(TestCompiler::new(MAGIC)),
        Arc::new(TestRegistry::new()),
    )
    .with_cache(Arc::new(DirectoryCache::new()))
}

#[test]
fn test_load_module_from_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);
    let env = env();

    let importer = Importer::with_order(env.clone(), &archive, SearchOrder::CompiledFirst)
        .unwrap();
    assert_eq!(importer.archive(), archive);
    assert_eq!(importer.prefix(), "");

    // compiled candidate carries x = 2, source x = 1
    let module = importer.load("a").unwrap();
    assert_eq!(module.get("x"), Some(2));
    assert!(env.registry.module("a").is_some());
}

#[test]
fn test_stale_compiled_unit_falls_back_to_source() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);

    let importer =
        Importer::with_order(env(), &archive, SearchOrder::CompiledFirst).unwrap();
    let module = importer.load("stale").unwrap();
    assert_eq!(module.get("v"), Some(10));
    assert_eq!(
        importer.get_filename("stale").unwrap(),
        format!("{}/stale.mod", archive)
    );
}

#[test]
fn test_package_load_records_linkage() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);

    let importer = Importer::new(env(), &archive).unwrap();
    assert!(importer.is_package("pkg").unwrap());

    let module = importer.load("pkg").unwrap();
    assert_eq!(module.get("y"), Some(3));
    let loader = module.loader().unwrap();
    assert_eq!(loader.archive, archive);
    assert_eq!(loader.prefix, "");
    assert_eq!(module.package_paths(), vec![format!("{}/pkg", archive)]);
}

#[test]
fn test_prefixed_importer_resolves_submodule() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);
    let env = env();

    let inside = format!("{}/pkg", archive);
    let importer = Importer::new(env.clone(), &inside).unwrap();
    assert_eq!(importer.archive(), archive);
    assert_eq!(importer.prefix(), "pkg/");

    let module = importer.load("pkg.tools").unwrap();
    assert_eq!(module.get("z"), Some(4));

    // the directory index was built once and shared
    let root = Importer::new(env.clone(), &archive).unwrap();
    assert!(root.find("a"));
    assert_eq!(env.cache.len(), 1);
}

#[test]
fn test_namespace_portion_from_directory_marker() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);

    let importer = Importer::new(env(), &archive).unwrap();
    assert_eq!(
        importer.find_with_namespace("ns"),
        FindResult::NamespacePortion(format!("{}/ns", archive))
    );
    assert!(!importer.find("ns"));
}

#[test]
fn test_get_data_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);

    let importer = Importer::new(env(), &archive).unwrap();
    let expected = vec![0u8, 159, 146, 150, 13, 10];
    assert_eq!(importer.get_data("data/blob.bin").unwrap(), expected);
    assert_eq!(
        importer
            .get_data(&format!("{}/data/blob.bin", archive))
            .unwrap(),
        expected
    );
    assert!(matches!(
        importer.get_data("data/absent.bin"),
        Err(ImportError::ResourceNotFound { .. })
    ));
}

#[test]
fn test_get_source_returns_raw_text() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);

    let importer = Importer::new(env(), &archive).unwrap();
    // line endings are normalized for compilation only
    assert_eq!(
        importer.get_source("pkg").unwrap(),
        Some("y = 3\r\n".to_string())
    );
    // compiled-only submodule has no source record
    let inside = Importer::new(env(), &format!("{}/pkg", archive)).unwrap();
    assert_eq!(inside.get_source("pkg.tools").unwrap(), None);
}

#[test]
fn test_non_archive_paths_rejected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let _ = write_archive(&dir);

    // an existing directory is not an archive, and the walk stops there
    let result = Importer::new(env(), &dir.path().to_string_lossy());
    assert!(matches!(result, Err(ImportError::NotAnArchive { .. })));

    let missing = dir.path().join("absent").join("lib.pack");
    let result = Importer::new(env(), &missing.to_string_lossy());
    assert!(matches!(result, Err(ImportError::NotAnArchive { .. })));
}

#[test]
fn test_corrupt_archive_reported_on_construction() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pack");
    std::fs::write(&path, b"PACKxxxx-not-a-valid-archive").unwrap();

    let result = Importer::new(env(), &path.to_string_lossy());
    assert!(matches!(result, Err(ImportError::ArchiveCorrupt { .. })));
}

#[test]
fn test_get_code_does_not_register_module() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(&dir);
    let env = env();

    let importer = Importer::new(env.clone(), &archive).unwrap();
    let unit = importer.get_code("a").unwrap();
    assert_eq!(unit.assignments, vec![("x".to_string(), 2)]);
    assert!(env.registry.module("a").is_none());
    assert!(Path::new(&archive).is_file());
}
