// crates/genepattern-client/src/resource/task.rs
// ============================================================================
// Module: Task Descriptors
// Description: Task metadata and parameter descriptors fetched from the server.
// Purpose: Expose parameter predicates and build job specs for a task.
// Dependencies: serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! A [`TaskDescriptor`] names a task by name or LSID. Its parameters are
//! fetched by [`TaskDescriptor::param_load`], which [`TaskDescriptor::make_job_spec`]
//! triggers when nothing was loaded yet. Each [`ParamDescriptor`] derives its
//! predicates from a typed [`ParamAttributes`] view of the server attributes.
//! Invariants:
//! - `optional` holds when the `optional` attribute is non-blank or `minValue` is 0.
//! - Multiple values are allowed when `maxValue > 1` or `numValues` contains `+`.
//! - Type is [`ParamKind::File`] only for `TYPE=FILE` with `MODE=IN`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::connection::Connection;
use crate::connection::quote;
use crate::error::ClientError;
use crate::resource::Resource;
use crate::spec::JobSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Choice flag reported while a dynamic choice list is still being built.
pub const CHOICES_NOT_INITIALIZED: &str = "NOT_INITIALIZED";

// ============================================================================
// SECTION: Parameter Attributes
// ============================================================================

/// Parameter value type as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Input file.
    File,
    /// Any other value.
    String,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "File",
            Self::String => "String",
        })
    }
}

/// Typed view of a parameter's server attributes.
///
/// Known keys are lifted into fields; everything else stays in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamAttributes {
    /// `optional` attribute, typically `on` or empty.
    pub optional: Option<String>,
    /// `minValue`: minimum number of values.
    pub min_value: Option<i64>,
    /// `maxValue`: maximum number of values.
    pub max_value: Option<i64>,
    /// `numValues` range string such as `0+` or `1..3`.
    pub num_values: Option<String>,
    /// `TYPE` attribute (`FILE`, `TEXT`, ...).
    pub kind: Option<String>,
    /// `MODE` attribute (`IN`, ...).
    pub mode: Option<String>,
    /// Lower-case `type` attribute (Java type or `PASSWORD`).
    pub value_type: Option<String>,
    /// `default_value` attribute.
    pub default_value: Option<String>,
    /// `altName` attribute of prompt-when-run pipeline parameters.
    pub alt_name: Option<String>,
    /// `altDescription` attribute of prompt-when-run pipeline parameters.
    pub alt_description: Option<String>,
    /// Attributes without a dedicated field.
    pub extra: BTreeMap<String, Value>,
}

impl ParamAttributes {
    /// Builds the typed view from a JSON attribute object.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut attributes = Self::default();
        let Some(map) = value.as_object() else {
            return attributes;
        };
        for (key, raw) in map {
            match key.as_str() {
                "optional" => attributes.optional = text(raw),
                "minValue" => attributes.min_value = integer(raw),
                "maxValue" => attributes.max_value = integer(raw),
                "numValues" => attributes.num_values = text(raw),
                "TYPE" => attributes.kind = text(raw),
                "MODE" => attributes.mode = text(raw),
                "type" => attributes.value_type = text(raw),
                "default_value" => attributes.default_value = text(raw),
                "altName" => attributes.alt_name = text(raw),
                "altDescription" => attributes.alt_description = text(raw),
                _ => {
                    attributes.extra.insert(key.clone(), raw.clone());
                }
            }
        }
        attributes
    }
}

// ============================================================================
// SECTION: Choices
// ============================================================================

/// One entry of a choice list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Choice {
    /// Value written into a job spec.
    #[serde(default)]
    pub value: String,
    /// Label shown to users.
    #[serde(default)]
    pub label: String,
}

/// Choice list status reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceStatus {
    /// Whether choices are static or dynamic.
    pub message: Option<String>,
    /// Load flag, e.g. `OK` or `NOT_INITIALIZED`.
    pub flag: Option<String>,
}

// ============================================================================
// SECTION: Parameter Descriptor
// ============================================================================

/// Declared parameter of a task.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// Connection used for choice refreshes.
    connection: Connection,
    /// Parameter name.
    name: String,
    /// Parameter description.
    description: String,
    /// Typed attributes.
    attributes: ParamAttributes,
    /// Choice metadata, when the parameter has any.
    choice_info: Option<Value>,
    /// Raw `{name: {...}}` object from the server.
    dto: Value,
}

impl ParamDescriptor {
    /// Builds a descriptor from a single-entry `{name: {...}}` object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the object is not a single named entry.
    pub fn from_dto(connection: Connection, dto: Value) -> Result<Self, ClientError> {
        let (name, body) = dto
            .as_object()
            .and_then(|map| map.iter().next())
            .map(|(name, body)| (name.clone(), body.clone()))
            .ok_or_else(|| ClientError::missing("params[] entry"))?;
        Ok(Self {
            connection,
            description: body.get("description").and_then(text).unwrap_or_default(),
            attributes: body.get("attributes").map(ParamAttributes::from_json).unwrap_or_default(),
            choice_info: body.get("choiceInfo").cloned(),
            name,
            dto,
        })
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Typed attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ParamAttributes {
        &self.attributes
    }

    /// Raw parameter JSON.
    #[must_use]
    pub const fn dto(&self) -> &Value {
        &self.dto
    }

    /// Returns true when the parameter may be left empty.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        non_blank(self.attributes.optional.as_deref()).is_some() || self.attributes.min_value == Some(0)
    }

    /// Returns true when the parameter accepts more than one value.
    #[must_use]
    pub fn allow_multiple(&self) -> bool {
        self.attributes.max_value.is_some_and(|max| max > 1)
            || self.attributes.num_values.as_deref().is_some_and(|range| range.contains('+'))
    }

    /// Caller-facing type of the parameter.
    #[must_use]
    pub fn kind(&self) -> ParamKind {
        let is_file = self.attributes.kind.as_deref() == Some("FILE") && self.attributes.mode.as_deref() == Some("IN");
        if is_file { ParamKind::File } else { ParamKind::String }
    }

    /// Returns true when the value should be masked in user interfaces.
    #[must_use]
    pub fn is_password(&self) -> bool {
        self.attributes.value_type.as_deref() == Some("PASSWORD")
    }

    /// Default value, when non-blank.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        non_blank(self.attributes.default_value.as_deref())
    }

    /// Alternate name, when non-blank.
    #[must_use]
    pub fn alt_name(&self) -> Option<&str> {
        non_blank(self.attributes.alt_name.as_deref())
    }

    /// Alternate description, when non-blank.
    #[must_use]
    pub fn alt_description(&self) -> Option<&str> {
        non_blank(self.attributes.alt_description.as_deref())
    }

    /// Returns true when the server supplied choice metadata.
    #[must_use]
    pub const fn is_choice_param(&self) -> bool {
        self.choice_info.is_some()
    }

    /// Choice metadata or [`ClientError::NotAChoiceParam`].
    fn choice_info(&self) -> Result<&Value, ClientError> {
        self.choice_info.as_ref().ok_or_else(|| ClientError::NotAChoiceParam(self.name.clone()))
    }

    /// Status message and flag of the choice list.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAChoiceParam`] without choice metadata.
    pub fn choice_status(&self) -> Result<ChoiceStatus, ClientError> {
        let status = self.choice_info()?.get("status");
        Ok(ChoiceStatus {
            message: status.and_then(|status| status.get("message")).and_then(text),
            flag: status.and_then(|status| status.get("flag")).and_then(text),
        })
    }

    /// Server URL of a dynamic choice list.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAChoiceParam`] without choice metadata.
    pub fn choice_href(&self) -> Result<Option<String>, ClientError> {
        Ok(self.choice_info()?.get("href").and_then(text))
    }

    /// Default selection of the choice menu.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAChoiceParam`] without choice metadata.
    pub fn choice_selected_value(&self) -> Result<Option<String>, ClientError> {
        Ok(self.choice_info()?.get("selectedValue").and_then(text))
    }

    /// Returns true when values outside the choice list are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAChoiceParam`] without choice metadata.
    pub fn allow_choice_custom_value(&self) -> Result<bool, ClientError> {
        Ok(match self.choice_info()?.get("choiceAllowCustom") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => matches!(flag.to_lowercase().as_str(), "on" | "yes" | "true"),
            _ => false,
        })
    }

    /// Returns the choice list, fetching it once if the server has not built it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAChoiceParam`] without choice metadata, or a
    /// transport or decode error from the refresh.
    pub fn choices(&mut self) -> Result<Vec<Choice>, ClientError> {
        let status = self.choice_status()?;
        if status.flag.as_deref() == Some(CHOICES_NOT_INITIALIZED) {
            let href = self.choice_href()?.ok_or_else(|| ClientError::missing("choiceInfo.href"))?;
            warn!(param = %self.name, message = status.message.as_deref().unwrap_or_default(), "choice list not initialized, refetching");
            let refreshed = self.connection.get_json(&href)?;
            if let Some(body) = self.dto.get_mut(&self.name).and_then(Value::as_object_mut) {
                body.insert("choiceInfo".to_string(), refreshed.clone());
            }
            self.choice_info = Some(refreshed);
        }
        let choices = self.choice_info()?.get("choices").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(choices).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

// ============================================================================
// SECTION: Task Descriptor
// ============================================================================

/// Task fields returned by the detail and catalog endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
struct TaskSummary {
    /// Task name.
    #[serde(default)]
    name: Option<String>,
    /// Task LSID.
    #[serde(default)]
    lsid: Option<String>,
    /// Short description.
    #[serde(default)]
    description: Option<String>,
    /// Documentation URL.
    #[serde(default)]
    documentation: Option<String>,
    /// Version, sent as text or a number.
    #[serde(default)]
    version: Option<Value>,
}

/// Parameter load state of a task.
#[derive(Debug, Clone)]
enum TaskParams {
    /// Nothing fetched.
    Unloaded,
    /// Parameters from the last load, in declaration order.
    Loaded(Vec<ParamDescriptor>),
}

/// Task (module or pipeline) installed on the server.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    /// Owning connection.
    connection: Connection,
    /// Name or LSID the task is addressed by.
    id: String,
    /// Descriptive fields known so far.
    summary: TaskSummary,
    /// Parameter load state.
    params: TaskParams,
    /// Raw detail JSON from the last load.
    dto: Option<Value>,
}

impl TaskDescriptor {
    /// Creates an unloaded descriptor for a task name or LSID.
    #[must_use]
    pub fn new(connection: Connection, name_or_lsid: &str) -> Self {
        Self {
            connection,
            id: name_or_lsid.to_string(),
            summary: TaskSummary::default(),
            params: TaskParams::Unloaded,
            dto: None,
        }
    }

    /// Creates an unloaded descriptor from a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the entry lacks an LSID.
    pub fn from_catalog_entry(connection: Connection, entry: &Value) -> Result<Self, ClientError> {
        let summary: TaskSummary =
            serde_json::from_value(entry.clone()).map_err(|err| ClientError::Decode(err.to_string()))?;
        let lsid = summary.lsid.clone().ok_or_else(|| ClientError::missing("all_modules[].lsid"))?;
        let mut task = Self::new(connection, &lsid);
        task.summary = summary;
        Ok(task)
    }

    /// Fetches the full task metadata and replaces the parameter list.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or an unexpected payload.
    pub fn param_load(&mut self) -> Result<(), ClientError> {
        let dto = self.connection.get_json(&self.uri())?;
        let summary: TaskSummary =
            serde_json::from_value(dto.clone()).map_err(|err| ClientError::Decode(err.to_string()))?;
        let entries = dto.get("params").and_then(Value::as_array).ok_or_else(|| ClientError::missing("params"))?;
        let params = entries
            .iter()
            .map(|entry| ParamDescriptor::from_dto(self.connection.clone(), entry.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(task = %self.id, params = params.len(), "loaded task parameters");
        self.summary = TaskSummary {
            description: Some(summary.description.unwrap_or_default()),
            documentation: Some(summary.documentation.unwrap_or_default()),
            version: Some(summary.version.unwrap_or_else(|| Value::String(String::new()))),
            ..summary
        };
        self.params = TaskParams::Loaded(params);
        self.dto = Some(dto);
        Ok(())
    }

    /// Returns true once parameters have been loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.params, TaskParams::Loaded(_))
    }

    /// Name or LSID the task is addressed by.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Task LSID, when known.
    #[must_use]
    pub fn lsid(&self) -> Option<&str> {
        self.summary.lsid.as_deref()
    }

    /// Task name, when known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.summary.name.as_deref()
    }

    /// Task description, when known.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.summary.description.as_deref()
    }

    /// Documentation URL, when known.
    #[must_use]
    pub fn documentation(&self) -> Option<&str> {
        self.summary.documentation.as_deref()
    }

    /// Task version rendered as text, when known.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.summary.version.as_ref().and_then(text)
    }

    /// Raw detail JSON, when loaded.
    #[must_use]
    pub const fn dto(&self) -> Option<&Value> {
        self.dto.as_ref()
    }

    /// Declared parameters in order; empty until loaded.
    #[must_use]
    pub fn parameters(&self) -> &[ParamDescriptor] {
        match &self.params {
            TaskParams::Loaded(params) => params,
            TaskParams::Unloaded => &[],
        }
    }

    /// Mutable access to a parameter by name.
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut ParamDescriptor> {
        match &mut self.params {
            TaskParams::Loaded(params) => params.iter_mut().find(|param| param.name == name),
            TaskParams::Unloaded => None,
        }
    }

    /// Returns an empty job spec bound to this task, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the implicit load fails.
    pub fn make_job_spec(&mut self) -> Result<JobSpec, ClientError> {
        if !self.is_loaded() {
            self.param_load()?;
        }
        Ok(JobSpec::new(self.lsid().unwrap_or(&self.id)))
    }
}

impl Resource for TaskDescriptor {
    fn uri(&self) -> String {
        self.connection.endpoint(&format!("/rest/v1/tasks/{}", quote(&self.id)))
    }

    fn connection(&self) -> &Connection {
        &self.connection
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a scalar JSON value as text.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Reads an integer sent as a number or a numeric string.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(float_to_i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Truncates a float count toward zero.
#[allow(clippy::cast_possible_truncation, reason = "Counts sent as floats are small whole numbers.")]
fn float_to_i64(value: f64) -> i64 {
    value as i64
}

/// Returns the value when it has non-whitespace content.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
