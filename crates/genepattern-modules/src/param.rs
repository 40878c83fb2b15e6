// crates/genepattern-modules/src/param.rs
// ============================================================================
// Module: Parameter Specs
// Description: Declared parameters of a module manifest.
// Purpose: Validate parameter fields and render their `pN_` manifest block.
// Dependencies: crate::manifest
// ============================================================================

//! ## Overview
//! A [`ParamSpec`] renders one block of `pN_<key>=<value>` lines, keys in a
//! fixed order. Names share the character rules of module names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::ModuleError;
use crate::manifest::has_invalid_name_chars;
use crate::manifest::manifest_escape;
use crate::manifest::push_property;

// ============================================================================
// SECTION: Parameter Types
// ============================================================================

/// Manifest parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamType {
    /// Input file.
    File,
    /// Free text.
    #[default]
    Text,
    /// Whole number.
    Integer,
    /// Decimal number.
    FloatingPoint,
    /// Server directory.
    Directory,
    /// Masked text.
    Password,
}

impl ParamType {
    /// Value written to `pN_TYPE`.
    #[must_use]
    pub const fn manifest_value(self) -> &'static str {
        match self {
            Self::File => "FILE",
            Self::Text => "TEXT",
            Self::Integer => "Integer",
            Self::FloatingPoint => "Floating Point",
            Self::Directory => "DIRECTORY",
            Self::Password => "PASSWORD",
        }
    }

    /// Java type name written to `pN_type`.
    #[must_use]
    pub const fn java_type(self) -> &'static str {
        match self {
            Self::File => "java.io.File",
            Self::Text => "java.lang.String",
            Self::Integer => "java.lang.Integer",
            Self::FloatingPoint => "java.lang.Float",
            Self::Directory => "DIRECTORY",
            Self::Password => "PASSWORD",
        }
    }
}

/// One entry of a parameter's choice menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamChoice {
    /// Value passed on the command line.
    pub value: String,
    /// Label shown to users.
    pub label: String,
}

impl ParamChoice {
    /// Creates a choice.
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Parameter Spec
// ============================================================================

/// Declared parameter of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Parameter description.
    pub description: String,
    /// Whether the parameter may be left empty.
    pub optional: bool,
    /// Parameter type.
    pub param_type: ParamType,
    /// Choice menu, in display order.
    pub choices: Vec<ParamChoice>,
    /// Default value.
    pub default_value: String,
    /// Accepted file formats.
    pub file_format: Vec<String>,
    /// Minimum number of values.
    pub min_values: u32,
    /// Maximum number of values; `None` means unbounded.
    pub max_values: Option<u32>,
    /// Command-line flag.
    pub flag: String,
    /// Emit the flag only when a value is given.
    pub prefix_when_specified: bool,
}

impl ParamSpec {
    /// Creates a required single-valued text parameter.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            optional: false,
            param_type: ParamType::Text,
            choices: Vec::new(),
            default_value: String::new(),
            file_format: Vec::new(),
            min_values: 0,
            max_values: Some(1),
            flag: String::new(),
            prefix_when_specified: false,
        }
    }

    /// Checks the name is set and free of invalid characters.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Validation`] for an empty or invalid name.
    pub fn validate(&self) -> Result<(), ModuleError> {
        if self.name.is_empty() {
            return Err(ModuleError::Validation("parameter name is not set".to_string()));
        }
        if has_invalid_name_chars(&self.name) {
            return Err(ModuleError::Validation(format!(
                "parameter name includes invalid characters: {}",
                self.name
            )));
        }
        Ok(())
    }

    /// `numValues` range: `min..max`, or `min+` when unbounded.
    #[must_use]
    pub fn num_values(&self) -> String {
        match self.max_values {
            Some(max) => format!("{}..{max}", self.min_values),
            None => format!("{}+", self.min_values),
        }
    }

    /// Escaped `value=label` pairs joined by `;`.
    fn choices_line(&self) -> String {
        let pairs: Vec<String> =
            self.choices.iter().map(|choice| format!("{}={}", choice.value, choice.label)).collect();
        manifest_escape(&pairs.join(";"))
    }

    /// Renders the `pN_` block for 1-based position `index`.
    #[must_use]
    pub fn manifest_block(&self, index: usize) -> String {
        let is_file = self.param_type == ParamType::File;
        let has_choices = !self.choices.is_empty();
        let prefix_flag = if self.prefix_when_specified { self.flag.as_str() } else { "" };
        let mut lines: Vec<(&str, String)> = vec![
            ("MODE", if is_file { "IN" } else { "" }.to_string()),
            ("TYPE", self.param_type.manifest_value().to_string()),
        ];
        if is_file && has_choices {
            lines.push(("choices", self.choices_line()));
        }
        lines.extend([
            ("default_value", self.default_value.clone()),
            ("description", manifest_escape(&self.description)),
            ("fileFormat", self.file_format.join(";")),
            ("flag", self.flag.clone()),
            ("name", self.name.clone()),
            ("numValues", self.num_values()),
            ("optional", if self.optional { "on" } else { "" }.to_string()),
            ("prefix", prefix_flag.to_string()),
            ("prefix_when_specified", prefix_flag.to_string()),
            ("type", self.param_type.java_type().to_string()),
            ("value", if !is_file && has_choices { self.choices_line() } else { String::new() }),
        ]);
        let mut block = String::new();
        for (key, value) in lines {
            push_property(&mut block, &format!("p{index}_{key}"), &value);
        }
        block
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
