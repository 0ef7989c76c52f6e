// SPDX-License-Identifier: MIT

//! Document loader - reads graph documents from disk
//!
//! JSON is the editor's native format; YAML is accepted for hand-written
//! graphs. Both are turned into a `serde_json::Value` for the normalizer.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::core::error::FlowsmithError;

/// Loads raw graph documents
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a document, picking the format from the file extension
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Value, FlowsmithError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        log::debug!("Loading graph document from {}", path.display());
        if is_yaml {
            Self::parse_yaml(&content)
        } else {
            Self::parse_json(&content)
        }
    }

    pub fn parse_json(content: &str) -> Result<Value, FlowsmithError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn parse_yaml(content: &str) -> Result<Value, FlowsmithError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_yaml_document() {
        let yaml = r#"
id: triage
nodes:
  - id: start
    type: entry
  - id: done
    type: terminal
edges:
  - { id: e1, source: start, target: done }
"#;
        let value = DocumentLoader::parse_yaml(yaml).unwrap();
        assert_eq!(value["nodes"][1]["type"], "terminal");
        assert_eq!(value["edges"][0]["source"], "start");
    }

    #[test]
    fn test_load_by_extension() {
        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json_file, r#"{{"nodes": [], "edges": []}}"#).unwrap();
        let value = DocumentLoader::new().load(json_file.path()).unwrap();
        assert!(value["nodes"].as_array().unwrap().is_empty());

        let mut yaml_file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(yaml_file, "nodes: []\nedges: []").unwrap();
        let value = DocumentLoader::new().load(yaml_file.path()).unwrap();
        assert!(value["edges"].is_array());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = DocumentLoader::parse_json("{ nodes: ").unwrap_err();
        assert!(matches!(err, FlowsmithError::Json(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DocumentLoader::new()
            .load("/definitely/not/here.json")
            .unwrap_err();
        assert!(matches!(err, FlowsmithError::Io(_)));
    }
}
