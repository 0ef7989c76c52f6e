// SPDX-License-Identifier: MIT

//! Graph IR compiler
//!
//! Pipeline: raw document → [`Normalizer`] → [`GraphIr`] → [`Validator`] →
//! diagnostics → (if valid) [`CodeGenerator`] → Python source.
//!
//! [`Compiler`] runs the pipeline statelessly; a [`CompilerSession`] also keeps
//! the identifier map between compiles so identifiers stay stable while a
//! user edits unrelated parts of the graph.

pub mod codegen;
pub mod condition;
pub mod document;
pub mod ident;
pub mod loader;
pub mod normalizer;
pub mod registry;
pub mod validator;

pub use codegen::{CodeGenerator, CompiledArtifact};
pub use document::{document_schema, EdgeSpec, GraphDocument, NodeSpec};
pub use ident::{slugify, IdentifierResolver};
pub use loader::DocumentLoader;
pub use normalizer::Normalizer;
pub use registry::{NodeTypeDescriptor, NodeTypeRegistry};
pub use validator::{Diagnostic, DiagnosticCode, Severity, ValidationReport, Validator};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::core::error::{CompileError, FlowsmithError};
use crate::core::ir::GraphIr;
use crate::flowsmith::config::FlowsmithConfig;

/// Result handed to preview, download and deploy consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Present only when the graph is valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_identifier: Option<String>,
}

/// Stateless compiler over a shared registry
#[derive(Clone)]
pub struct Compiler {
    registry: Arc<NodeTypeRegistry>,
    config: FlowsmithConfig,
}

impl Compiler {
    pub fn new(registry: Arc<NodeTypeRegistry>, config: FlowsmithConfig) -> Self {
        Self { registry, config }
    }

    /// Compiler over the built-in node types
    pub fn with_builtins(config: FlowsmithConfig) -> Result<Self, FlowsmithError> {
        let registry = NodeTypeRegistry::with_builtins()?;
        Ok(Self::new(Arc::new(registry), config))
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FlowsmithConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &Value) -> Result<GraphIr, CompileError> {
        Normalizer::new(&self.registry, self.config.limits).normalize(raw)
    }

    pub fn validate(&self, ir: &GraphIr) -> ValidationReport {
        Validator::new(&self.registry).validate(ir)
    }

    pub fn generate(
        &self,
        ir: &GraphIr,
        report: &ValidationReport,
    ) -> Result<CompiledArtifact, CompileError> {
        self.generator().generate(ir, report)
    }

    /// Normalize and validate without generating code
    pub fn check(&self, raw: &Value) -> Result<ValidationReport, CompileError> {
        let ir = self.normalize(raw)?;
        Ok(self.validate(&ir))
    }

    /// Run the whole pipeline with a fresh identifier resolver
    pub fn compile(&self, raw: &Value) -> Result<CompileOutcome, CompileError> {
        self.compile_with(raw, &mut IdentifierResolver::new())
    }

    /// Start an editing session that keeps identifiers stable across compiles
    pub fn session(&self) -> CompilerSession {
        CompilerSession {
            compiler: self.clone(),
            resolver: IdentifierResolver::new(),
        }
    }

    fn compile_with(
        &self,
        raw: &Value,
        resolver: &mut IdentifierResolver,
    ) -> Result<CompileOutcome, CompileError> {
        let ir = self.normalize(raw)?;
        let report = self.validate(&ir);

        if !report.is_valid {
            log::info!(
                "Graph '{}' has {} error(s); skipping code generation",
                ir.name,
                report.errors().count()
            );
            return Ok(CompileOutcome {
                diagnostics: report.diagnostics,
                code: None,
                is_valid: false,
                entry_identifier: None,
            });
        }

        let artifact = self.generator().generate_with(&ir, &report, resolver)?;
        log::info!(
            "Compiled graph '{}': {} nodes, {} warning(s)",
            ir.name,
            ir.nodes.len(),
            artifact.diagnostics.len()
        );
        Ok(CompileOutcome {
            diagnostics: artifact.diagnostics,
            code: Some(artifact.source_text),
            is_valid: true,
            entry_identifier: Some(artifact.entry_identifier),
        })
    }

    fn generator(&self) -> CodeGenerator<'_> {
        CodeGenerator::new(&self.registry, self.config.codegen.clone())
    }
}

/// A compiler bound to one editing session
pub struct CompilerSession {
    compiler: Compiler,
    resolver: IdentifierResolver,
}

impl CompilerSession {
    pub fn compile(&mut self, raw: &Value) -> Result<CompileOutcome, CompileError> {
        self.compiler.compile_with(raw, &mut self.resolver)
    }

    pub fn check(&self, raw: &Value) -> Result<ValidationReport, CompileError> {
        self.compiler.check(raw)
    }

    /// Forget every remembered identifier
    pub fn reset(&mut self) {
        self.resolver = IdentifierResolver::new();
    }
}
