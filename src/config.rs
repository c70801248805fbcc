//! Compiler options
//!
//! Options are plain data with serde defaults so that a JSON options file
//! only needs to name the fields it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CfmlError, CfmlResult};

/// Environment variable naming an options file for the CLI
pub const CONFIG_ENV: &str = "CFMLC_CONFIG";

/// Options controlling detection, resolution and generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Package used when a source unit has no file identity
    #[serde(default = "default_package")]
    pub default_package: String,
    /// Class name used when a source unit has no file identity
    #[serde(default = "default_class_name")]
    pub default_class_name: String,
    /// Names that may prefix an identifier as a storage scope
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Functions provided by the runtime, resolvable without a declaration
    #[serde(default = "default_builtin_functions")]
    pub builtin_functions: Vec<String>,
    /// Run the reference resolution pass before generation
    #[serde(default)]
    pub resolve_references: bool,
}

fn default_package() -> String {
    "cfml.templates".to_string()
}

fn default_class_name() -> String {
    "TestClass".to_string()
}

fn default_scopes() -> Vec<String> {
    [
        "variables",
        "local",
        "arguments",
        "this",
        "request",
        "application",
        "session",
        "server",
        "url",
        "form",
        "cgi",
        "cookie",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_builtin_functions() -> Vec<String> {
    [
        "writeOutput",
        "writeDump",
        "createObject",
        "isNull",
        "isDefined",
        "len",
        "arrayLen",
        "structKeyExists",
        "now",
        "dump",
        "echo",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            default_package: default_package(),
            default_class_name: default_class_name(),
            scopes: default_scopes(),
            builtin_functions: default_builtin_functions(),
            resolve_references: false,
        }
    }
}

impl CompilerOptions {
    /// Parse options from a JSON document
    pub fn from_json(text: &str) -> CfmlResult<Self> {
        serde_json::from_str(text).map_err(|e| CfmlError::config(e.to_string()))
    }

    /// Load options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> CfmlResult<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| CfmlError::io(path.display().to_string(), e))?;
        Self::from_json(&contents)
    }

    /// Whether `name` is a declared scope (case-insensitive)
    pub fn is_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CompilerOptions::default();
        assert_eq!(options.default_class_name, "TestClass");
        assert!(options.is_scope("variables"));
        assert!(options.is_scope("ARGUMENTS"));
        assert!(!options.is_scope("foo"));
        assert!(!options.resolve_references);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options =
            CompilerOptions::from_json(r#"{ "default_package": "app.views", "resolve_references": true }"#)
                .unwrap();

        assert_eq!(options.default_package, "app.views");
        assert!(options.resolve_references);
        assert_eq!(options.scopes, default_scopes());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = CompilerOptions::from_json("{ scopes: ").unwrap_err();
        assert_eq!(err.kind(), "Configuration Error");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CompilerOptions::from_file("/nonexistent/cfmlc.json").unwrap_err();
        assert_eq!(err.kind(), "I/O Error");
    }
}
