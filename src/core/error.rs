// SPDX-License-Identifier: MIT

//! Typed error handling for flowsmith-rs
//!
//! Structural problems with an input graph are raised as [`CompileError`]s and
//! stop the pipeline. Semantic problems are never raised: they are collected
//! as diagnostics by the validator instead.

use thiserror::Error;

/// Top-level error type for flowsmith-rs
#[derive(Debug, Error)]
pub enum FlowsmithError {
    /// Compiler pipeline errors
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Node type registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration errors (invalid env vars, invalid config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by the normalize/generate passes
#[derive(Debug, Error)]
pub enum CompileError {
    /// The input document cannot be analyzed at all
    #[error("Malformed graph: {0}")]
    MalformedGraph(String),

    /// Node or edge ceiling exceeded
    #[error("Graph too large: {count} {kind} exceeds the limit of {limit}")]
    GraphTooLarge {
        kind: &'static str,
        count: usize,
        limit: usize,
    },

    /// Node type present in the IR but missing from the live registry
    #[error("Unsupported node type '{type_name}' on node '{node_id}'")]
    UnsupportedNodeType { node_id: String, type_name: String },

    /// Identifier disambiguation ran out of attempts
    #[error("Could not resolve an identifier for node '{node_id}' (base '{base}') after {attempts} attempts")]
    IdentifierResolution {
        node_id: String,
        base: String,
        attempts: usize,
    },

    /// Code generation requested for a graph with error diagnostics
    #[error("Graph has {errors} error diagnostic(s); code generation is disabled")]
    InvalidGraph { errors: usize },

    /// A node template could not render its unit
    #[error("Failed to emit node '{node_id}': {message}")]
    Emit { node_id: String, message: String },
}

/// Errors raised while building a node type registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two node kinds share a type name
    #[error("Node type '{0}' is already registered")]
    DuplicateType(String),

    /// A node kind declares a config schema that is not valid JSON Schema
    #[error("Node type '{type_name}' has an invalid config schema: {message}")]
    InvalidSchema { type_name: String, message: String },
}

impl CompileError {
    /// Create a malformed graph error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedGraph(message.into())
    }

    /// Create an emit error
    pub fn emit(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Emit {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by the input document rather than by a bug
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedGraph(_) | Self::GraphTooLarge { .. } | Self::InvalidGraph { .. }
        )
    }
}

impl FlowsmithError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
