// crates/genepattern-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, table inspection, and file output.
// Purpose: Pin offline behaviour of the CLI without a server.
// Dependencies: clap, genepattern-client, tempfile
// ============================================================================

//! ## Overview
//! Exercises the helpers behind `inspect` and `download` plus argument
//! parsing for the subcommands.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use genepattern_client::JobPhase;
use tempfile::tempdir;

use super::Cli;
use super::Commands;
use super::TableFormat;
use super::download_target;
use super::infer_format;
use super::inspect_source;
use super::phase_label;
use super::write_file_atomic;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const GCT: &str = "#1.2\n2\t3\nName\tDescription\tS1\tS2\tS3\ng1\tfirst\t1\t2\t3\ng2\tsecond\t4\t5\t6\n";

const ODF: &str = "ODF 1.0\nHeaderLines=2\nCOLUMN_NAMES:Name\tScore\nModel=Dataset\ng1\t0.5\ng2\t0.7\ng3\t0.9\n";

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

#[test]
fn recent_defaults_to_ten_jobs() {
    let cli = Cli::try_parse_from(["genepattern", "recent"]).expect("parse");
    let Commands::Recent(command) = cli.command else {
        panic!("expected recent");
    };
    assert_eq!(command.count, 10);
}

#[test]
fn global_config_flag_follows_subcommand() {
    let cli = Cli::try_parse_from(["genepattern", "recent", "-n", "3", "--config", "gp.toml"]).expect("parse");
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("gp.toml")));
    let Commands::Recent(command) = cli.command else {
        panic!("expected recent");
    };
    assert_eq!(command.count, 3);
}

#[test]
fn wait_requires_job_ids() {
    assert!(Cli::try_parse_from(["genepattern", "wait"]).is_err());
    let cli = Cli::try_parse_from(["genepattern", "wait", "7", "9"]).expect("parse");
    let Commands::Wait(command) = cli.command else {
        panic!("expected wait");
    };
    assert_eq!(command.ids, vec![7, 9]);
}

#[test]
fn job_ids_must_be_numeric() {
    assert!(Cli::try_parse_from(["genepattern", "job", "abc"]).is_err());
}

// ============================================================================
// SECTION: Inspection
// ============================================================================

#[test]
fn format_is_inferred_from_extension() {
    assert_eq!(infer_format("data/all_aml.GCT").expect("gct"), TableFormat::Gct);
    assert_eq!(infer_format("https://example.org/x/result.odf?download=1").expect("odf"), TableFormat::Odf);
    assert!(infer_format("data/table.txt").is_err());
}

#[test]
fn inspect_reports_gct_shape_from_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("small.gct");
    fs::write(&path, GCT).expect("write gct");
    let summary = inspect_source(path.to_str().expect("utf-8 path"), None).expect("inspect");
    assert_eq!(summary, "GCT 1.2: 2 rows x 3 samples (keys: Name, Description)");
}

#[test]
fn inspect_reads_inline_odf_with_explicit_format() {
    let summary = inspect_source(ODF, Some(TableFormat::Odf)).expect("inspect");
    assert_eq!(summary, "ODF 1.0: 3 rows x 2 columns (model: Dataset)\ncolumns: Name, Score");
}

#[test]
fn inspect_surfaces_codec_errors() {
    let err = inspect_source("not a table\nat all\n", Some(TableFormat::Gct)).expect_err("malformed");
    assert!(err.to_string().starts_with("malformed GCT file"));
}

#[test]
fn phases_have_stable_labels() {
    assert_eq!(phase_label(JobPhase::FinishedOk), "finished");
    assert_eq!(phase_label(JobPhase::FinishedError), "error");
    assert_eq!(phase_label(JobPhase::Unloaded), "unloaded");
}

// ============================================================================
// SECTION: File Output
// ============================================================================

#[test]
fn download_into_directory_uses_remote_name() {
    let dir = tempdir().expect("tempdir");
    assert_eq!(download_target(dir.path(), "out.gct"), dir.path().join("out.gct"));
    let file = dir.path().join("renamed.gct");
    assert_eq!(download_target(&file, "out.gct"), file);
}

#[test]
fn atomic_write_creates_parents_and_replaces() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("out.txt");
    write_file_atomic(&path, b"first").expect("first write");
    write_file_atomic(&path, b"second").expect("second write");
    assert_eq!(fs::read(&path).expect("read"), b"second");
    assert!(!path.with_extension("part").exists());
}
