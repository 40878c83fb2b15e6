// crates/genepattern-client/tests/client/task_tests.rs
// ============================================================================
// Module: Task Tests
// Description: Parameter loading and choice refresh for task descriptors.
// Purpose: Pin the implicit load and the single choice refetch.
// Dependencies: genepattern-client, serde_json
// ============================================================================

//! ## Overview
//! Serves task detail payloads shaped like the server's parameter DTOs.

use genepattern_client::ParamKind;
use serde_json::Value;
use serde_json::json;

use crate::common::Reply;
use crate::common::ScriptedServer;
use crate::common::fast_connection;

fn task_detail(choice_href: &str) -> Value {
    json!({
        "name": "ConvertLineEndings",
        "lsid": "urn:lsid:broad.mit.edu:cancer.software.genepattern.module.analysis:00002:2",
        "description": "Converts line endings",
        "version": "2",
        "params": [
            {"input.filename": {
                "description": "The input file",
                "attributes": {"TYPE": "FILE", "MODE": "IN", "optional": "", "minValue": 1, "maxValue": 1}
            }},
            {"output.file": {
                "attributes": {"TYPE": "TEXT", "optional": "on", "numValues": "0+", "default_value": "<input.filename_basename>.cvt.txt"}
            }},
            {"method": {
                "attributes": {"TYPE": "TEXT"},
                "choiceInfo": {"href": choice_href, "status": {"flag": "NOT_INITIALIZED", "message": "dynamic"}}
            }}
        ]
    })
}

/// Tests the job spec builder loads parameters exactly once.
#[test]
fn make_job_spec_loads_task_once() {
    let server = ScriptedServer::bind();
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::json(&task_detail("http://127.0.0.1:9/unused"))]);
    let mut task = connection.get_task("ConvertLineEndings");
    let spec = task.make_job_spec().expect("spec");
    assert_eq!(spec.lsid(), "urn:lsid:broad.mit.edu:cancer.software.genepattern.module.analysis:00002:2");
    assert!(spec.params().is_empty());
    task.make_job_spec().expect("second spec");
    assert!(task.is_loaded());
    assert_eq!(task.description(), Some("Converts line endings"));
    assert_eq!(task.documentation(), Some(""));

    let params = task.parameters();
    assert_eq!(params.len(), 3);
    assert_eq!(params[0].kind(), ParamKind::File);
    assert!(!params[0].is_optional());
    assert!(!params[0].allow_multiple());
    assert_eq!(params[1].kind(), ParamKind::String);
    assert!(params[1].is_optional());
    assert!(params[1].allow_multiple());
    assert_eq!(params[1].default_value(), Some("<input.filename_basename>.cvt.txt"));
    assert!(params[2].is_choice_param());

    let seen = handle.join().expect("server thread");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].url, "/gp/rest/v1/tasks/ConvertLineEndings");
}

/// Tests an uninitialized choice list is fetched once from its href.
#[test]
fn uninitialized_choices_are_refetched() {
    let server = ScriptedServer::bind();
    let href = format!("{}/rest/v1/tasks/ConvertLineEndings/method/choiceInfo.json", server.base);
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::json(&task_detail(&href)),
        Reply::json(&json!({
            "href": href,
            "status": {"flag": "OK", "message": "loaded"},
            "choices": [{"value": "unix", "label": "Unix"}, {"value": "dos", "label": "DOS"}]
        })),
    ]);
    let mut task = connection.get_task("ConvertLineEndings");
    task.param_load().expect("load");
    let param = task.parameter_mut("method").expect("method param");
    let choices = param.choices().expect("choices");
    assert_eq!(choices.iter().map(|choice| choice.value.as_str()).collect::<Vec<_>>(), vec!["unix", "dos"]);
    assert_eq!(param.choice_status().expect("status").flag.as_deref(), Some("OK"));
    assert_eq!(param.choices().expect("cached choices").len(), 2);

    let seen = handle.join().expect("server thread");
    assert_eq!(seen[1].url, "/gp/rest/v1/tasks/ConvertLineEndings/method/choiceInfo.json");
}
