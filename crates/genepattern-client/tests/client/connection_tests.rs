// crates/genepattern-client/tests/client/connection_tests.rs
// ============================================================================
// Module: Connection Tests
// Description: Authentication, upload, and submission against a local server.
// Purpose: Pin request shapes and the reported-not-raised failure paths.
// Dependencies: genepattern-client, proptest, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Covers token login, header switching, uploads, job submission, listings,
//! and the batch wait.

use std::fs;

use genepattern_client::ClientError;
use genepattern_client::Connection;
use genepattern_client::JobSpec;
use genepattern_client::WireEncode;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use tempfile::tempdir;

use crate::common::Reply;
use crate::common::ScriptedServer;
use crate::common::fast_connection;
use crate::common::job_status;

// ============================================================================
// SECTION: Authentication
// ============================================================================

/// Tests requests switch from Basic to Bearer after login and back after invalidation.
#[test]
fn login_switches_authorization_until_invalidated() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::json(&job_status(5, true, false)),
        Reply::json(&json!({"access_token": "tok-123"})),
        Reply::json(&job_status(5, true, false)),
        Reply::json(&job_status(5, true, false)),
    ]);

    connection.get_job(5).get_info().expect("basic fetch");
    assert_eq!(connection.get_token().expect("token"), "tok-123");
    assert_eq!(connection.get_token().expect("cached token"), "tok-123");
    connection.get_job(5).get_info().expect("bearer fetch");
    connection.invalidate_token().expect("invalidate");
    connection.get_job(5).get_info().expect("basic again");

    let seen = handle.join().expect("server thread");
    let basic = connection.authorization_header();
    assert_eq!(seen[0].authorization.as_deref(), Some(basic.as_str()));
    assert_eq!(seen[1].method, "POST");
    assert_eq!(
        seen[1].url,
        "/gp/rest/v1/oauth2/token?grant_type=password&username=test&password=p%40ss&client_id=GenePatternNotebook-test"
    );
    assert_eq!(seen[2].authorization.as_deref(), Some("Bearer tok-123"));
    assert_eq!(seen[3].authorization.as_deref(), Some(basic.as_str()));
    assert!(seen.iter().all(|request| request.user_agent.as_deref() == Some("GenePatternRest")));
}

/// Tests a rejected login surfaces an authentication error.
#[test]
fn login_rejects_non_200() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(400, "{\"error\":\"invalid_grant\"}")]);
    let err = connection.login().expect_err("bad credentials");
    assert!(matches!(err, ClientError::Authentication(_)));
    assert!(!connection.has_token().expect("token state"));
    handle.join().expect("server thread");
}

/// Tests the system message is fetched without credentials.
#[test]
fn system_message_is_unauthenticated() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(200, "Maintenance at noon")]);
    assert_eq!(connection.system_message().expect("message"), "Maintenance at noon");
    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].url, "/gp/rest/v1/config/system-message");
    assert!(seen[0].authorization.is_none());
}

// ============================================================================
// SECTION: Upload
// ============================================================================

/// Tests a 201 upload returns the file named by the Location header.
#[test]
fn upload_returns_location_on_created() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("input.txt");
    fs::write(&path, "line one\nline two\n").expect("write input");

    let server = ScriptedServer::bind();
    let location = format!("{}/users/test/tmp/my%20file.txt", server.base);
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(201, "").header("Location", &location)]);

    let file = connection.upload_file("my file.txt", &path).expect("uploaded");
    assert_eq!(file.url(), location);
    assert_eq!(file.get_name(), "my file.txt");

    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].url, "/gp/rest/v1/data/upload/job_input?name=my%20file.txt");
    assert_eq!(seen[0].body, "line one\nline two\n");
}

/// Tests a non-201 upload is reported as no result.
#[test]
fn upload_failure_status_returns_none() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("input.txt");
    fs::write(&path, "data").expect("write input");

    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(500, "boom")]);
    assert!(connection.upload_file("input.txt", &path).is_none());
    handle.join().expect("server thread");
}

/// Tests a missing local file is reported as no result without a request.
#[test]
fn upload_missing_file_returns_none() {
    let dir = tempdir().expect("tempdir");
    let connection = Connection::new("http://127.0.0.1:9/gp", "test", "pw").expect("connection");
    assert!(connection.upload_file("absent.txt", &dir.path().join("absent.txt")).is_none());
}

// ============================================================================
// SECTION: Submission
// ============================================================================

/// Tests a 201 submission posts the tagged spec and loads the new job.
#[test]
fn run_job_submits_spec_and_fetches_status() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::status(201, "{\"jobId\":\"7\"}"),
        Reply::json(&job_status(7, false, false)),
    ]);

    let mut spec = JobSpec::new("urn:lsid:example.org:module:00003:2");
    spec.set_parameter("input.filename", ["a.txt"], None);
    spec.set_parameter("numbers", ["1", "2"], Some("grp"));

    let mut job = connection.run_job(&spec, false).expect("submit").expect("job");
    assert_eq!(job.id(), 7);
    assert!(job.is_loaded());
    assert!(!job.is_finished().expect("status"));
    assert_eq!(connection.last_job().expect("last job").map(|job| job.id()), Some(7));
    assert!(spec.tags().is_empty());

    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].url, "/gp/rest/v1/jobs");
    let body: Value = serde_json::from_str(&seen[0].body).expect("json body");
    assert_eq!(
        body,
        json!({
            "lsid": "urn:lsid:example.org:module:00003:2",
            "params": [
                {"name": "input.filename", "values": ["a.txt"]},
                {"name": "numbers", "groupId": "grp", "values": ["1", "2"]}
            ],
            "tags": ["GenePattern Python Client"]
        })
    );
    assert_eq!(seen[1].url, "/gp/rest/v1/jobs/7?includeInputParams=true");
}

/// Tests a refused submission returns no job and leaves the last job unset.
#[test]
fn run_job_refusal_returns_none() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(403, "over quota"), Reply::status(500, "error")]);
    let spec = JobSpec::new("urn:lsid:example.org:module:00003:2");
    assert!(connection.run_job(&spec, false).expect("submit").is_none());
    assert!(connection.run_job(&spec, false).expect("submit").is_none());
    assert!(connection.last_job().expect("last job").is_none());
    handle.join().expect("server thread");
}

/// Tests a synchronous submission polls until the job finishes.
#[test]
fn run_job_waits_when_requested() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::status(201, "{\"jobId\":8}"),
        Reply::json(&job_status(8, false, false)),
        Reply::json(&job_status(8, true, false)),
    ]);
    let spec = JobSpec::new("urn:lsid:example.org:module:00003:2");
    let mut job = connection.run_job(&spec, true).expect("submit").expect("job");
    assert!(job.is_finished().expect("status"));
    assert_eq!(handle.join().expect("server thread").len(), 3);
}

// ============================================================================
// SECTION: Listings
// ============================================================================

/// Tests the task catalog yields one descriptor per entry.
#[test]
fn task_list_reads_catalog_entries() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::json(&json!({
        "all_modules": [
            {"lsid": "urn:lsid:example.org:module:00001:1", "name": "PreprocessDataset", "version": 5},
            {"lsid": "urn:lsid:example.org:module:00002:2", "name": "ConvertLineEndings", "description": "d"}
        ]
    }))]);
    let tasks = connection.get_task_list().expect("tasks");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].name(), Some("PreprocessDataset"));
    assert_eq!(tasks[0].version().as_deref(), Some("5"));
    assert_eq!(tasks[1].lsid(), Some("urn:lsid:example.org:module:00002:2"));
    assert!(!tasks[1].is_loaded());
    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].url, "/gp/rest/v1/tasks/all.json");
}

/// Tests recent jobs are requested newest first and scoped to the user.
#[test]
fn recent_jobs_are_loaded_from_listing() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::json(&json!({
        "items": [job_status(12, true, false), job_status(11, true, true)]
    }))]);
    let jobs = connection.get_recent_jobs(2).expect("jobs");
    assert_eq!(jobs.iter().map(|job| job.id()).collect::<Vec<_>>(), vec![12, 11]);
    assert!(jobs.iter().all(|job| job.is_loaded()));
    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].url, "/gp/rest/v1/jobs/?pageSize=2&userId=test&orderBy=-dateSubmitted");
}

// ============================================================================
// SECTION: Batch Wait
// ============================================================================

/// Tests each round stops at the first unfinished job.
#[test]
fn wait_until_complete_stops_at_first_unfinished() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::json(&job_status(1, true, false)),
        Reply::json(&job_status(2, false, false)),
        Reply::json(&job_status(2, true, true)),
    ]);
    let mut jobs = vec![connection.get_job(1), connection.get_job(2)];
    connection.wait_until_complete(&mut jobs).expect("wait");
    let seen = handle.join().expect("server thread");
    let urls: Vec<_> = seen.iter().map(|request| request.url.as_str()).collect();
    assert_eq!(urls, vec![
        "/gp/rest/v1/jobs/1?includeInputParams=true",
        "/gp/rest/v1/jobs/2?includeInputParams=true",
        "/gp/rest/v1/jobs/2?includeInputParams=true",
    ]);
}

/// Tests an empty batch returns without any request.
#[test]
fn wait_until_complete_empty_batch_returns() {
    let connection = Connection::new("http://127.0.0.1:9/gp", "test", "pw").expect("connection");
    connection.wait_until_complete(&mut []).expect("empty wait");
}

// ============================================================================
// SECTION: Property Tests
// ============================================================================

proptest! {
    /// Tests parameter entries keep submission order on the wire.
    #[test]
    fn job_spec_wire_keeps_parameter_order(names in proptest::collection::vec("[a-z]{1,8}", 0 .. 8)) {
        let mut spec = JobSpec::new("urn:lsid:example.org:module:00001:1");
        for name in &names {
            spec.set_parameter(name, [name.as_str()], None);
        }
        let wire = spec.to_wire();
        let encoded: Vec<String> = wire["params"]
            .as_array()
            .expect("params")
            .iter()
            .map(|entry| entry["name"].as_str().expect("name").to_string())
            .collect();
        prop_assert_eq!(encoded, names);
    }
}
