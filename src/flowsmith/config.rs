// SPDX-License-Identifier: MIT

//! Runtime configuration
//!
//! Loaded from an optional YAML file, then overridden by `FLOWSMITH_*`
//! environment variables (a `.env` file is honoured by the binary).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::FlowsmithError;

pub const ENV_MAX_NODES: &str = "FLOWSMITH_MAX_NODES";
pub const ENV_MAX_EDGES: &str = "FLOWSMITH_MAX_EDGES";
pub const ENV_RUNTIME_MODULE: &str = "FLOWSMITH_RUNTIME_MODULE";
pub const ENV_PORT: &str = "FLOWSMITH_PORT";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FlowsmithConfig {
    pub limits: Limits,
    pub codegen: CodegenOptions,
    pub server: ServerConfig,
}

/// Node/edge ceilings enforced before any traversal
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub max_nodes: usize,
    pub max_edges: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            max_edges: 50_000,
        }
    }
}

/// Names used in generated modules
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodegenOptions {
    /// Module the generated code imports runtime helpers from
    pub runtime_module: String,
    pub state_class: String,
    pub builder_function: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_module: "workflow_runtime".to_string(),
            state_class: "WorkflowState".to_string(),
            builder_function: "build_graph".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl FlowsmithConfig {
    /// Load from a YAML file and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, FlowsmithError> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                Self::parse_yaml(&content)?
            }
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse_yaml(content: &str) -> Result<Self, FlowsmithError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a closure in tests)
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), FlowsmithError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_NODES) {
            self.limits.max_nodes = parse_var(ENV_MAX_NODES, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_EDGES) {
            self.limits.max_edges = parse_var(ENV_MAX_EDGES, &value)?;
        }
        if let Some(value) = lookup(ENV_RUNTIME_MODULE).filter(|v| !v.trim().is_empty()) {
            self.codegen.runtime_module = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_PORT) {
            self.server.port = parse_var(ENV_PORT, &value)?;
        }
        self.check()
    }

    fn check(&self) -> Result<(), FlowsmithError> {
        if self.limits.max_nodes == 0 || self.limits.max_edges == 0 {
            return Err(FlowsmithError::config("limits must be greater than zero"));
        }
        let names = [
            ("codegen.runtime_module", &self.codegen.runtime_module),
            ("codegen.state_class", &self.codegen.state_class),
            ("codegen.builder_function", &self.codegen.builder_function),
        ];
        for (field, value) in names {
            if !is_dotted_name(value) {
                return Err(FlowsmithError::config(format!(
                    "{} '{}' is not a valid Python name",
                    field, value
                )));
            }
        }
        if self.codegen.state_class.contains('.') || self.codegen.builder_function.contains('.') {
            return Err(FlowsmithError::config(
                "state_class and builder_function must not be dotted",
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, FlowsmithError> {
    value
        .trim()
        .parse()
        .map_err(|_| FlowsmithError::config(format!("{} has an invalid value '{}'", key, value)))
}

fn is_dotted_name(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FlowsmithConfig::default();
        assert_eq!(config.limits.max_nodes, 10_000);
        assert_eq!(config.limits.max_edges, 50_000);
        assert_eq!(config.codegen.runtime_module, "workflow_runtime");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = FlowsmithConfig::parse_yaml(
            r#"
limits:
  max_nodes: 200
codegen:
  runtime_module: acme.runtime
"#,
        )
        .unwrap();
        assert_eq!(config.limits.max_nodes, 200);
        assert_eq!(config.limits.max_edges, 50_000);
        assert_eq!(config.codegen.runtime_module, "acme.runtime");
        assert_eq!(config.codegen.state_class, "WorkflowState");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = FlowsmithConfig::default();
        config
            .apply_env_from(env(&[
                (ENV_MAX_NODES, "50"),
                (ENV_PORT, "8081"),
                (ENV_RUNTIME_MODULE, "  my_runtime "),
            ]))
            .unwrap();
        assert_eq!(config.limits.max_nodes, 50);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.codegen.runtime_module, "my_runtime");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = FlowsmithConfig::default();
        let err = config
            .apply_env_from(env(&[(ENV_MAX_EDGES, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_EDGES));
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(FlowsmithConfig::parse_yaml("codegen:\n  runtime_module: 'my-runtime'\n").is_err());
        assert!(FlowsmithConfig::parse_yaml("codegen:\n  state_class: a.b\n").is_err());
        assert!(FlowsmithConfig::parse_yaml("limits:\n  max_nodes: 0\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 9000").unwrap();
        let config = FlowsmithConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.codegen.builder_function, "build_graph");
        if std::env::var(ENV_PORT).is_err() {
            assert_eq!(config.server.port, 9000);
        }
    }
}
