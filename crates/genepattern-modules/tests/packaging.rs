// crates/genepattern-modules/tests/packaging.rs
// ============================================================================
// Module: Module Packaging Tests
// Description: Manifest rendering, zip bundles, and LSID registration.
// Purpose: Pin manifest layout and the authority's refusal rules.
// Dependencies: genepattern-modules, tempfile, time, zip
// ============================================================================

//! ## Overview
//! Builds descriptors in temporary directories and inspects the manifest,
//! the zip bundle, and the persisted authority record.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use genepattern_modules::IdentifierAuthority;
use genepattern_modules::MANIFEST_FILE_NAME;
use genepattern_modules::ModuleDescriptor;
use genepattern_modules::ModuleError;
use genepattern_modules::ParamSpec;
use genepattern_modules::ParamType;
use genepattern_modules::ZipOptions;
use genepattern_modules::render_manifest;
use tempfile::tempdir;
use time::macros::datetime;
use zip::ZipArchive;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const BASE: &str = "urn:lsid:example.org:genepatternmodules";

fn descriptor(lsid: &str) -> ModuleDescriptor {
    let mut input = ParamSpec::new("input");
    input.param_type = ParamType::File;
    input.description = "Input file".to_string();
    input.file_format = vec!["gct".to_string()];
    input.min_values = 1;
    ModuleDescriptor {
        name: Some("ExampleModule".to_string()),
        description: "Demo: a=b".to_string(),
        version_comment: "first".to_string(),
        author: "Ada".to_string(),
        institution: "Broad".to_string(),
        categories: vec!["Preprocess".to_string(), "Utility".to_string()],
        file_format: vec!["gct".to_string()],
        user: Some("test".to_string()),
        documentation: "doc.html".to_string(),
        lsid: Some(lsid.to_string()),
        command_line: Some("python <libdir>run.py <input>".to_string()),
        parameters: vec![input],
        ..ModuleDescriptor::default()
    }
}

fn zip_entries(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).expect("open zip")).expect("read zip");
    archive.file_names().map(str::to_string).collect()
}

fn zip_manifest(path: &Path) -> String {
    let mut archive = ZipArchive::new(File::open(path).expect("open zip")).expect("read zip");
    let mut text = String::new();
    archive.by_name(MANIFEST_FILE_NAME).expect("manifest entry").read_to_string(&mut text).expect("utf-8");
    text
}

// ============================================================================
// SECTION: Validation and Rendering
// ============================================================================

/// Tests a module name with a space is refused before packaging.
#[test]
fn name_with_space_blocks_packaging() {
    let dir = tempdir().expect("tempdir");
    let mut module = descriptor(&format!("{BASE}:00001"));
    module.name = Some("My Module".to_string());
    let err = module.create_zip(dir.path(), ZipOptions::default(), None).expect_err("space in name");
    assert!(matches!(err, ModuleError::Validation(ref reason) if reason.contains("My Module")));
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

/// Tests the full manifest layout for a fixed timestamp.
#[test]
fn manifest_layout_is_fixed() {
    let module = descriptor(&format!("{BASE}:00001"));
    let text = render_manifest(&module, datetime!(2026-03-04 05:06:07 UTC)).expect("render");
    let expected = format!(
        "# ExampleModule\n# 2026-03-04 05:06:07\n# Generated by genepattern-modules v{}\n\
         JVMLevel=\nLSID=urn\\:lsid\\:example.org\\:genepatternmodules\\:00001\nauthor=Ada;Broad\n\
         categories=Preprocess;Utility\ncommandLine=python <libdir>run.py <input>\ncpuType=any\n\
         description=Demo: a=b\nfileFormat=gct\nlanguage=Python\nlicense=\nname=ExampleModule\nos=any\n\
         p1_MODE=IN\np1_TYPE=FILE\np1_default_value=\np1_description=Input file\np1_fileFormat=gct\n\
         p1_flag=\np1_name=input\np1_numValues=1..1\np1_optional=\np1_prefix=\n\
         p1_prefix_when_specified=\np1_type=java.io.File\np1_value=\n\
         privacy=private\npublicationDate=03/04/2026 05\\:06\nquality=development\ntaskDoc=doc.html\n\
         taskType=Preprocess\nuserid=test\nversion=first\n",
        env!("CARGO_PKG_VERSION")
    );
    assert_eq!(text, expected);
}

/// Tests a malformed LSID is rejected before anything is written.
#[test]
fn malformed_lsid_blocks_manifest() {
    let dir = tempdir().expect("tempdir");
    let module = descriptor("urn:lsid:example.org:00001");
    assert!(module.write_manifest(dir.path()).is_err());
    assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
}

// ============================================================================
// SECTION: Zip Bundles
// ============================================================================

/// Tests the bundle holds the manifest and support files and cleans up.
#[test]
fn create_zip_bundles_manifest_and_support_files() {
    let dir = tempdir().expect("tempdir");
    let script = dir.path().join("run.py");
    fs::write(&script, "print('hi')\n").expect("write script");
    let mut module = descriptor(&format!("{BASE}:00001"));
    module.support_files = vec![script];

    let zip_path = module.create_zip(dir.path(), ZipOptions::default(), None).expect("zip");
    assert_eq!(zip_path, dir.path().join("ExampleModule.zip"));
    assert_eq!(zip_entries(&zip_path), vec!["manifest".to_string(), "run.py".to_string()]);
    assert!(zip_manifest(&zip_path).contains("name=ExampleModule\n"));
    assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
}

/// Tests an existing manifest blocks packaging.
#[test]
fn create_zip_refuses_existing_manifest() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join(MANIFEST_FILE_NAME), "keep me").expect("write manifest");
    let mut module = descriptor(&format!("{BASE}:00001"));
    let err = module.create_zip(dir.path(), ZipOptions::default(), None).expect_err("collision");
    assert!(matches!(err, ModuleError::ManifestCollision(_)));
    assert_eq!(fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).expect("read"), "keep me");
    assert!(!dir.path().join("ExampleModule.zip").exists());
}

/// Tests a missing support file leaves no archive and registers nothing.
#[test]
fn create_zip_failure_removes_partial_archive() {
    let dir = tempdir().expect("tempdir");
    let mut authority = IdentifierAuthority::with_base(&dir.path().join("authority.json"), BASE);
    let mut module = descriptor(&authority.lsid());
    module.support_files = vec![dir.path().join("missing.py")];

    let err = module.create_zip(dir.path(), ZipOptions::default(), Some(&mut authority)).expect_err("missing file");
    assert!(matches!(err, ModuleError::Io(_)));
    assert!(!dir.path().join("ExampleModule.zip").exists());
    assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
    assert_eq!(authority.module_count(), 0);
    assert_eq!(module.version, 0);
}

/// Tests packaging with a version bump registers the versioned LSID.
#[test]
fn create_zip_increments_version_and_registers() {
    let dir = tempdir().expect("tempdir");
    let record = dir.path().join("authority.json");
    let mut authority = IdentifierAuthority::with_base(&record, BASE);
    let mut module = descriptor(&authority.lsid());
    let options = ZipOptions {
        clean: false,
        increment_version: true,
    };

    let zip_path = module.create_zip(dir.path(), options, Some(&mut authority)).expect("zip");
    assert_eq!(module.version, 1);
    assert!(dir.path().join(MANIFEST_FILE_NAME).exists());
    assert!(zip_manifest(&zip_path).contains("LSID=urn\\:lsid\\:example.org\\:genepatternmodules\\:00001\\:1\n"));
    assert_eq!(authority.module_count(), 1);
    assert_eq!(authority.registered().get(&format!("{BASE}:00001:1")).map(String::as_str), Some("ExampleModule"));

    let reloaded = IdentifierAuthority::load(&record).expect("reload");
    assert_eq!(reloaded, authority);
}

/// Tests a refused LSID leaves the directory and descriptor untouched.
#[test]
fn create_zip_with_foreign_lsid_writes_nothing() {
    let dir = tempdir().expect("tempdir");
    let mut authority = IdentifierAuthority::with_base(&dir.path().join("authority.json"), BASE);
    let mut module = descriptor("urn:lsid:other.org:genepatternmodules:00001");
    let err = module.create_zip(dir.path(), ZipOptions::default(), Some(&mut authority)).expect_err("foreign");
    assert!(matches!(err, ModuleError::InvalidIdentifier(_)));
    assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
    assert!(!dir.path().join("ExampleModule.zip").exists());
    assert_eq!(module.version, 0);
}

// ============================================================================
// SECTION: Authority
// ============================================================================

/// Tests issued identifiers validate and registration refuses misuse.
#[test]
fn authority_issues_and_refuses() {
    let dir = tempdir().expect("tempdir");
    let mut authority = IdentifierAuthority::with_base(&dir.path().join("authority.json"), BASE);
    let first = authority.lsid();
    assert_eq!(first, format!("{BASE}:00001"));
    assert!(authority.validate(&first));

    authority.register(&first, "First").expect("register");
    let second = authority.lsid();
    assert_eq!(second, format!("{BASE}:00002"));
    assert!(authority.validate(&second));

    assert!(matches!(authority.register(&first, "Again"), Err(ModuleError::InvalidIdentifier(_))));
    assert!(matches!(
        authority.register("urn:lsid:other.org:genepatternmodules:00002", "Foreign"),
        Err(ModuleError::InvalidIdentifier(_))
    ));
    assert_eq!(authority.module_count(), 1);
}

/// Tests a namespace that merely extends the base is refused.
#[test]
fn authority_requires_colon_after_base() {
    let dir = tempdir().expect("tempdir");
    let authority = IdentifierAuthority::with_base(&dir.path().join("authority.json"), BASE);
    assert!(!authority.validate(&format!("{BASE}2:00001")));
    assert!(!authority.validate(BASE));
    assert!(authority.validate(&format!("{BASE}:00001")));
    let err = authority.check_registrable(&format!("{BASE}2:00001")).expect_err("sibling namespace");
    assert!(matches!(err, ModuleError::InvalidIdentifier(_)));
}

/// Tests opening creates the record once and reloads it afterwards.
#[test]
fn authority_open_creates_then_reloads() {
    let dir = tempdir().expect("tempdir");
    let record = dir.path().join("nested").join("authority.json");
    let mut authority = IdentifierAuthority::open(&record, "example.org", "genepatternmodules").expect("open");
    assert_eq!(authority.base_lsid(), BASE);
    assert!(record.exists());
    authority.register(&authority.lsid(), "First").expect("register");

    let reopened = IdentifierAuthority::open(&record, "ignored.org", "ignored").expect("reopen");
    assert_eq!(reopened.base_lsid(), BASE);
    assert_eq!(reopened.module_count(), 1);
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&record).expect("read")).expect("json");
    assert_eq!(json["module_count"], 1);
    assert_eq!(json["registered_modules"][format!("{BASE}:00001")], "First");
}

/// Tests a corrupt record is reported as a record error.
#[test]
fn corrupt_record_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let record = dir.path().join("authority.json");
    fs::write(&record, "{not json").expect("write");
    assert!(matches!(IdentifierAuthority::load(&record), Err(ModuleError::Record(_))));
}
