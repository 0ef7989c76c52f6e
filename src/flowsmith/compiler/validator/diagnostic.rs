// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Stable diagnostic codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    NoEntryPoint,
    MultipleEntryPoints,
    UnreachableNode,
    UnboundedCycle,
    FeedbackLoopDetected,
    DeadEnd,
    InvalidNodeConfig,
    UnrecognizedConfigKey,
    MissingDefaultRoute,
    AmbiguousDefaultRoute,
    InvalidCondition,
    ShadowedCondition,
    StateTypeConflict,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoEntryPoint => "NO_ENTRY_POINT",
            Self::MultipleEntryPoints => "MULTIPLE_ENTRY_POINTS",
            Self::UnreachableNode => "UNREACHABLE_NODE",
            Self::UnboundedCycle => "UNBOUNDED_CYCLE",
            Self::FeedbackLoopDetected => "FEEDBACK_LOOP_DETECTED",
            Self::DeadEnd => "DEAD_END",
            Self::InvalidNodeConfig => "INVALID_NODE_CONFIG",
            Self::UnrecognizedConfigKey => "UNRECOGNIZED_CONFIG_KEY",
            Self::MissingDefaultRoute => "MISSING_DEFAULT_ROUTE",
            Self::AmbiguousDefaultRoute => "AMBIGUOUS_DEFAULT_ROUTE",
            Self::InvalidCondition => "INVALID_CONDITION",
            Self::ShadowedCondition => "SHADOWED_CONDITION",
            Self::StateTypeConflict => "STATE_TYPE_CONFLICT",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    /// Every node involved, e.g. all members of a cycle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_node_ids: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            node_id: None,
            edge_id: None,
            related_node_ids: Vec::new(),
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn on_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn on_edge(mut self, edge_id: impl Into<String>) -> Self {
        self.edge_id = Some(edge_id.into());
        self
    }

    pub fn related(mut self, node_ids: Vec<String>) -> Self {
        self.related_node_ids = node_ids;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Report order: node id, then edge id; missing ids sort first
    fn sort_key_cmp(&self, other: &Self) -> Ordering {
        self.node_id
            .cmp(&other.node_id)
            .then_with(|| self.edge_id.cmp(&other.edge_id))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}]", severity, self.code)?;
        if let Some(node_id) = &self.node_id {
            write!(f, " node '{}'", node_id)?;
        }
        if let Some(edge_id) = &self.edge_id {
            write!(f, " edge '{}'", edge_id)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of validating one graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
    pub is_valid: bool,
    /// The single resolved entry node, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_node_id: Option<String>,
}

impl ValidationReport {
    /// Sort diagnostics into report order and compute the verdict
    pub fn new(mut diagnostics: Vec<Diagnostic>, entry_node_id: Option<String>) -> Self {
        // sort_by is stable, so ties keep analysis order
        diagnostics.sort_by(Diagnostic::sort_key_cmp);
        let is_valid = !diagnostics.iter().any(Diagnostic::is_error);
        Self {
            diagnostics,
            is_valid,
            entry_node_id,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn has_code(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }
}
