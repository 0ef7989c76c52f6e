// SPDX-License-Identifier: MIT

//! State field declarations
//!
//! Node kinds declare which state fields they read and write; the code
//! generator folds those declarations into one state type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
    /// Keep maximum value
    Max,
    /// Keep minimum value
    Min,
    /// Deep merge objects
    Merge,
}

/// Whether a node reads or writes a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// One state field touched by a node
#[derive(Debug, Clone, PartialEq)]
pub struct StateAccess {
    pub name: String,
    pub access: Access,
    pub field: StateFieldDef,
}

impl StateFieldDef {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            reducer: ReducerType::Overwrite,
            default: None,
        }
    }

    pub fn with_reducer(mut self, reducer: ReducerType) -> Self {
        self.reducer = reducer;
        self
    }
}

impl StateAccess {
    pub fn read(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            access: Access::Read,
            field: StateFieldDef::new(field_type),
        }
    }

    pub fn write(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            access: Access::Write,
            field: StateFieldDef::new(field_type),
        }
    }

    pub fn reducer(mut self, reducer: ReducerType) -> Self {
        self.field.reducer = reducer;
        self
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        };
        f.write_str(name)
    }
}
