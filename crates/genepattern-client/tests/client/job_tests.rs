// crates/genepattern-client/tests/client/job_tests.rs
// ============================================================================
// Module: Job Tests
// Description: Lazy loading, polling, and control requests for jobs.
// Purpose: Pin fetch counts and wait termination.
// Dependencies: genepattern-client, serde_json
// ============================================================================

//! ## Overview
//! A scripted server answers a fixed number of requests, so any extra fetch
//! fails the test with a transport error.

use genepattern_client::JobPhase;
use genepattern_client::Resource;
use serde_json::json;

use crate::common::Reply;
use crate::common::ScriptedServer;
use crate::common::fast_connection;
use crate::common::job_status;

/// Tests the first accessor fetches once and later accessors reuse the snapshot.
#[test]
fn status_accessors_fetch_once() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::json(&job_status(21, false, false))]);
    let mut job = connection.get_job(21);
    assert_eq!(job.phase(), JobPhase::Unloaded);
    assert_eq!(job.status_message().expect("message").as_deref(), Some("status"));
    assert_eq!(job.status_message().expect("message again").as_deref(), Some("status"));
    assert_eq!(job.task_name().expect("task").as_deref(), Some("ConvertLineEndings"));
    assert!(!job.is_finished().expect("finished"));
    assert_eq!(job.phase(), JobPhase::Running);
    assert_eq!(handle.join().expect("server thread").len(), 1);
}

/// Tests the wait ends on the first finished fetch even with an error.
#[test]
fn wait_until_done_stops_on_finished_error() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::json(&job_status(22, false, false)),
        Reply::json(&job_status(22, false, false)),
        Reply::json(&job_status(22, true, true)),
    ]);
    let mut job = connection.get_job(22);
    job.wait_until_done().expect("wait");
    assert_eq!(job.phase(), JobPhase::FinishedError);
    assert!(job.has_error().expect("error flag"));
    assert_eq!(handle.join().expect("server thread").len(), 3);
}

/// Tests termination issues a DELETE and reports success.
#[test]
fn terminate_reports_server_answer() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(200, ""), Reply::status(404, "")]);
    let job = connection.get_job(23);
    assert!(job.terminate().expect("terminate"));
    assert!(!job.terminate().expect("terminate again"));
    assert!(!job.is_loaded());
    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].method, "DELETE");
    assert_eq!(seen[0].url, "/gp/rest/v1/jobs/23/terminate");
}

/// Tests permissions are read and replaced as JSON.
#[test]
fn permissions_round_trip_as_json() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let permissions = json!({"groups": [{"id": "*", "read": true, "write": false}]});
    let handle = server.play(vec![Reply::json(&permissions), Reply::status(200, "")]);
    let job = connection.get_job(24);
    assert_eq!(job.get_permissions().expect("get"), permissions);
    job.set_permissions(&permissions).expect("set");
    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].url, "/gp/rest/v1/jobs/24/permissions");
    assert_eq!(seen[1].method, "PUT");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&seen[1].body).expect("body"), permissions);
}

/// Tests output files resolve by name after a single fetch.
#[test]
fn output_files_resolve_by_name() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let info = json!({
        "jobId": 25,
        "status": {"isFinished": true},
        "outputFiles": [
            {"link": {"href": format!("{}/jobResults/25/all_aml.cls", server.base), "name": "all_aml.cls"}}
        ],
        "logFiles": [
            {"link": {"href": format!("{}/jobResults/25/gp_execution_log.txt", server.base)}}
        ]
    });
    let handle = server.play(vec![Reply::json(&info)]);
    let mut job = connection.get_job(25);
    let file = job.get_file("all_aml.cls").expect("files").expect("present");
    assert!(file.uri().ends_with("/jobResults/25/all_aml.cls"));
    assert!(job.get_file("other.cls").expect("files").is_none());
    assert_eq!(job.log_files().expect("logs").len(), 1);
    assert_eq!(handle.join().expect("server thread").len(), 1);
}
