// crates/genepattern-client/src/resource/job.rs
// ============================================================================
// Module: Job Handle
// Description: Lazily loaded view of a submitted GenePattern job.
// Purpose: Poll job status, expose outputs, and manage termination.
// Dependencies: reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! A [`Job`] starts [`JobState::Unloaded`]. The first status-derived
//! accessor fetches the job once; later accessors read the cached snapshot
//! until [`Job::get_info`] is called again. Child jobs are built from the
//! parent's embedded snapshot without extra requests.
//! Invariants:
//! - Accessors on a loaded job never issue requests.
//! - [`Job::wait_until_done`] returns only after a fetch reports `isFinished`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::thread;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::info;

use crate::backoff::next_wait_units;
use crate::connection::Connection;
use crate::connection::expect_success;
use crate::error::ClientError;
use crate::resource::RemoteFile;
use crate::resource::Resource;

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Observable lifecycle tag of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// No status has been fetched yet.
    Unloaded,
    /// Queued on the server.
    Pending,
    /// Accepted and not yet finished.
    Running,
    /// Finished without error.
    FinishedOk,
    /// Finished with an error.
    FinishedError,
}

/// Cached server snapshot of a job.
#[derive(Debug, Clone)]
struct JobSnapshot {
    /// Raw status JSON.
    raw: Value,
    /// Child jobs built from `children.items`.
    children: Vec<Job>,
}

/// Load state of a job handle.
#[derive(Debug, Clone)]
enum JobState {
    /// Nothing fetched.
    Unloaded,
    /// Snapshot from the last fetch.
    Loaded(Box<JobSnapshot>),
}

// ============================================================================
// SECTION: Job
// ============================================================================

/// Handle to a job on the server.
#[derive(Debug, Clone)]
pub struct Job {
    /// Owning connection.
    connection: Connection,
    /// Server-assigned job id.
    id: u64,
    /// Load state.
    state: JobState,
}

impl Job {
    /// Creates an unloaded handle.
    #[must_use]
    pub const fn new(connection: Connection, id: u64) -> Self {
        Self {
            connection,
            id,
            state: JobState::Unloaded,
        }
    }

    /// Creates a loaded handle from an already fetched status object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the object or a child lacks a job id.
    pub fn from_info(connection: Connection, info: Value) -> Result<Self, ClientError> {
        let id = parse_job_id(&info).ok_or_else(|| ClientError::missing("jobId"))?;
        let mut job = Self::new(connection, id);
        job.load(info)?;
        Ok(job)
    }

    /// Server-assigned job id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns true once a snapshot has been fetched.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.state, JobState::Loaded(_))
    }

    /// Raw snapshot JSON, if loaded.
    #[must_use]
    pub fn raw_info(&self) -> Option<&Value> {
        match &self.state {
            JobState::Loaded(snapshot) => Some(&snapshot.raw),
            JobState::Unloaded => None,
        }
    }

    /// Lifecycle tag derived from the cached snapshot without fetching.
    #[must_use]
    pub fn phase(&self) -> JobPhase {
        let Some(raw) = self.raw_info() else {
            return JobPhase::Unloaded;
        };
        let flag = |key: &str| status_flag(raw, key);
        if flag("isFinished") {
            if flag("hasError") { JobPhase::FinishedError } else { JobPhase::FinishedOk }
        } else if flag("isPending") {
            JobPhase::Pending
        } else {
            JobPhase::Running
        }
    }

    /// Browser URL of the job's status page.
    #[must_use]
    pub fn status_url(&self) -> String {
        self.connection.endpoint(&format!("/pages/index.jsf?jobid={}", self.id))
    }

    // ------------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------------

    /// Fetches the job status and replaces the cached snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or an unexpected payload.
    pub fn get_info(&mut self) -> Result<(), ClientError> {
        let url = self.connection.endpoint(&format!("/rest/v1/jobs/{}?includeInputParams=true", self.id));
        let info = self.connection.get_json(&url)?;
        self.load(info)
    }

    /// Installs a snapshot, rebuilding children recursively.
    fn load(&mut self, info: Value) -> Result<(), ClientError> {
        if let Some(id) = parse_job_id(&info) {
            self.id = id;
        }
        let children = match info.pointer("/children/items").and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .map(|child| Self::from_info(self.connection.clone(), child.clone()))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        self.state = JobState::Loaded(Box::new(JobSnapshot {
            raw: info,
            children,
        }));
        Ok(())
    }

    /// Returns the snapshot, fetching it first if unloaded.
    fn snapshot(&mut self) -> Result<&JobSnapshot, ClientError> {
        if !self.is_loaded() {
            self.get_info()?;
        }
        match &self.state {
            JobState::Loaded(snapshot) => Ok(snapshot),
            JobState::Unloaded => Err(ClientError::State(format!("job {} has no snapshot", self.id))),
        }
    }

    /// Returns a string field of the snapshot.
    fn text_field(&mut self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.snapshot()?.raw.get(key).and_then(value_text))
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    /// Returns the `isFinished` status flag.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn is_finished(&mut self) -> Result<bool, ClientError> {
        Ok(status_flag(&self.snapshot()?.raw, "isFinished"))
    }

    /// Returns the `hasError` status flag.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn has_error(&mut self) -> Result<bool, ClientError> {
        Ok(status_flag(&self.snapshot()?.raw, "hasError"))
    }

    /// Returns the `isPending` status flag.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn is_pending(&mut self) -> Result<bool, ClientError> {
        Ok(status_flag(&self.snapshot()?.raw, "isPending"))
    }

    /// Server status message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn status_message(&mut self) -> Result<Option<String>, ClientError> {
        Ok(self.snapshot()?.raw.pointer("/status/statusMessage").and_then(value_text))
    }

    /// Name of the task the job ran.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn task_name(&mut self) -> Result<Option<String>, ClientError> {
        self.text_field("taskName")
    }

    /// LSID of the task the job ran.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn task_lsid(&mut self) -> Result<Option<String>, ClientError> {
        self.text_field("taskLsid")
    }

    /// Owner of the job.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn user_id(&mut self) -> Result<Option<String>, ClientError> {
        self.text_field("userId")
    }

    /// Submission timestamp as reported by the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn date_submitted(&mut self) -> Result<Option<String>, ClientError> {
        self.text_field("dateSubmitted")
    }

    /// Declared number of output files.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn num_output_files(&mut self) -> Result<Option<u64>, ClientError> {
        Ok(self.snapshot()?.raw.get("numOutputFiles").and_then(Value::as_u64))
    }

    /// Input parameters flattened into a name to value map.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn input_params(&mut self) -> Result<BTreeMap<String, Value>, ClientError> {
        let snapshot = self.snapshot()?;
        let mut params = BTreeMap::new();
        if let Some(entries) = snapshot.raw.get("inputParams").and_then(Value::as_array) {
            for entry in entries.iter().filter_map(Value::as_object) {
                if let Some((name, value)) = entry.iter().next() {
                    params.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(params)
    }

    /// Tags attached to the job.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn tags(&mut self) -> Result<Vec<String>, ClientError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .raw
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(|tag| tag.pointer("/tag/tag").and_then(value_text)).collect())
            .unwrap_or_default())
    }

    /// Comment texts attached to the job.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn comments(&mut self) -> Result<Vec<String>, ClientError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .raw
            .pointer("/comments/comments")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| item.get("text").and_then(value_text)).collect())
            .unwrap_or_default())
    }

    // ------------------------------------------------------------------------
    // Files and Children
    // ------------------------------------------------------------------------

    /// Output files declared by the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn get_output_files(&mut self) -> Result<Vec<RemoteFile>, ClientError> {
        let connection = self.connection.clone();
        Ok(file_refs(&connection, &self.snapshot()?.raw, "outputFiles"))
    }

    /// Log files declared by the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn log_files(&mut self) -> Result<Vec<RemoteFile>, ClientError> {
        let connection = self.connection.clone();
        Ok(file_refs(&connection, &self.snapshot()?.raw, "logFiles"))
    }

    /// Output file whose decoded name equals `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn get_file(&mut self, name: &str) -> Result<Option<RemoteFile>, ClientError> {
        Ok(self.get_output_files()?.into_iter().find(|file| file.get_name() == name))
    }

    /// Child jobs embedded in the snapshot; empty when none are declared.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the first fetch fails.
    pub fn children(&mut self) -> Result<&[Self], ClientError> {
        Ok(&self.snapshot()?.children)
    }

    // ------------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------------

    /// Blocks until a fetch reports the job finished.
    ///
    /// Sleeps before every fetch; the wait starts at one unit and doubles up
    /// to the single-job cap. There is no overall timeout.
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError`] raised by a fetch.
    pub fn wait_until_done(&mut self) -> Result<(), ClientError> {
        let poll = self.connection.poll_policy();
        let mut wait = 1;
        loop {
            thread::sleep(poll.delay(wait));
            self.get_info()?;
            if self.raw_info().is_some_and(|raw| status_flag(raw, "isFinished")) {
                break;
            }
            wait = next_wait_units(wait, poll.job_cap());
        }
        info!(job_id = self.id, "job finished");
        Ok(())
    }

    /// Requests termination; returns true when the server answered 200.
    ///
    /// The cached snapshot is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub fn terminate(&self) -> Result<bool, ClientError> {
        let url = self.connection.endpoint(&format!("/rest/v1/jobs/{}/terminate", self.id));
        let response = self.connection.request(Method::DELETE, &url)?.send()?;
        let terminated = response.status().as_u16() == 200;
        info!(job_id = self.id, terminated, "job termination requested");
        Ok(terminated)
    }

    /// Fetches the job's permissions object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a non-success status.
    pub fn get_permissions(&self) -> Result<Value, ClientError> {
        self.connection.get_json(&self.permissions_url())
    }

    /// Replaces the job's permissions object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a non-success status.
    pub fn set_permissions(&self, permissions: &Value) -> Result<(), ClientError> {
        let body = serde_json::to_vec(permissions).map_err(|err| ClientError::Decode(err.to_string()))?;
        let response = self
            .connection
            .request(Method::PUT, &self.permissions_url())?
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;
        expect_success(response).map(drop)
    }

    /// Permissions endpoint of the job.
    fn permissions_url(&self) -> String {
        self.connection.endpoint(&format!("/rest/v1/jobs/{}/permissions", self.id))
    }
}

impl Resource for Job {
    fn uri(&self) -> String {
        self.connection.endpoint(&format!("/rest/v1/jobs/{}", self.id))
    }

    fn connection(&self) -> &Connection {
        &self.connection
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads `jobId`, which servers send as a number or a numeric string.
pub(crate) fn parse_job_id(value: &Value) -> Option<u64> {
    let raw = value.get("jobId")?;
    raw.as_u64().or_else(|| raw.as_str().and_then(|text| text.trim().parse().ok()))
}

/// Reads a boolean under `status`, treating absence as false.
fn status_flag(raw: &Value, key: &str) -> bool {
    raw.get("status").and_then(|status| status.get(key)).and_then(Value::as_bool).unwrap_or(false)
}

/// Renders a scalar JSON value as text.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Builds file handles from a list of `{link: {href}}` objects.
fn file_refs(connection: &Connection, raw: &Value, key: &str) -> Vec<RemoteFile> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer("/link/href").and_then(Value::as_str))
                .map(|href| RemoteFile::new(connection.clone(), href))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
