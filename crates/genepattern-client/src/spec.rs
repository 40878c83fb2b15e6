// crates/genepattern-client/src/spec.rs
// ============================================================================
// Module: Job Spec
// Description: Submission request for a GenePattern task.
// Purpose: Collect ordered parameter values before a job is submitted.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`JobSpec`] names a task by LSID and carries an ordered list of
//! parameter entries. It is serialized once, at submit time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::resource::RemoteFile;
use crate::wire::WireEncode;

// ============================================================================
// SECTION: Parameter Values
// ============================================================================

/// A single parameter value.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Literal text.
    Text(String),
    /// A file already on the server, sent as its URL.
    File(RemoteFile),
}

impl WireEncode for ParamValue {
    fn to_wire(&self) -> Value {
        match self {
            Self::Text(text) => text.to_wire(),
            Self::File(file) => file.to_wire(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<RemoteFile> for ParamValue {
    fn from(value: RemoteFile) -> Self {
        Self::File(value)
    }
}

/// One `{name, values, groupId?}` entry of a submission.
#[derive(Debug, Clone)]
pub struct ParamEntry {
    /// Parameter name.
    pub name: String,
    /// Parameter values, in order.
    pub values: Vec<ParamValue>,
    /// Optional parameter group.
    pub group_id: Option<String>,
}

impl WireEncode for ParamEntry {
    fn to_wire(&self) -> Value {
        let mut object = Map::new();
        object.insert("name".to_string(), self.name.to_wire());
        if let Some(group_id) = &self.group_id {
            object.insert("groupId".to_string(), group_id.to_wire());
        }
        object.insert("values".to_string(), self.values.to_wire());
        Value::Object(object)
    }
}

// ============================================================================
// SECTION: Job Spec
// ============================================================================

/// Submission request for one job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Task LSID.
    lsid: String,
    /// Parameter entries in submission order.
    params: Vec<ParamEntry>,
    /// Tags attached to the job.
    tags: Vec<String>,
}

impl JobSpec {
    /// Creates an empty spec for the given task LSID.
    #[must_use]
    pub fn new(lsid: impl Into<String>) -> Self {
        Self {
            lsid: lsid.into(),
            params: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Appends a parameter entry.
    pub fn set_parameter<I, V>(&mut self, name: &str, values: I, group_id: Option<&str>)
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.params.push(ParamEntry {
            name: name.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            group_id: group_id.map(str::to_string),
        });
    }

    /// Adds a tag unless it is already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|existing| existing == tag) {
            self.tags.push(tag.to_string());
        }
    }

    /// Task LSID.
    #[must_use]
    pub fn lsid(&self) -> &str {
        &self.lsid
    }

    /// Parameter entries.
    #[must_use]
    pub fn params(&self) -> &[ParamEntry] {
        &self.params
    }

    /// Tags attached to the job.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl WireEncode for JobSpec {
    fn to_wire(&self) -> Value {
        let mut object = Map::new();
        object.insert("lsid".to_string(), self.lsid.to_wire());
        object.insert("params".to_string(), self.params.to_wire());
        object.insert("tags".to_string(), self.tags.to_wire());
        Value::Object(object)
    }
}
