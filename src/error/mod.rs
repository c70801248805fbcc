//! Error handling and diagnostics for the CFML compiler
//!
//! This module provides the error taxonomy shared by every pipeline stage
//! (detection, parsing, building, resolution, generation) and the
//! diagnostic formatting used by the command-line driver.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub mod diagnostic;

pub use diagnostic::Diagnostic;

/// Result type alias for compiler operations
pub type CfmlResult<T> = Result<T, CfmlError>;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Optional filename
    pub filename: Option<String>,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize, filename: Option<String>) -> Self {
        Self {
            line,
            column,
            filename,
        }
    }

    /// Create a source location without a filename
    pub fn at(line: usize, column: usize) -> Self {
        Self::new(line, column, None)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref filename) = self.filename {
            write!(f, "{}:{}:{}", filename, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// A single problem reported by a grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub message: String,
    pub location: SourceLocation,
}

impl Issue {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

/// Main error type for the compiler
#[derive(Debug, Clone, Error)]
pub enum CfmlError {
    /// Neither dialect produced a tree with real content
    #[error("could not classify source unit '{unit}'")]
    ClassificationFailure { unit: String },

    /// The chosen grammar reported one or more issues
    #[error("{} parse issue(s), first: {}", issues.len(), first_issue(issues))]
    ParseFailure { issues: Vec<Issue> },

    /// A parse-tree shape with no conversion rule
    #[error("no AST conversion for '{kind}' (children: [{}])", children.join(", "))]
    ConstructionGap {
        kind: String,
        children: Vec<String>,
        location: Option<SourceLocation>,
    },

    /// An AST node with no translation rule
    #[error("unsupported construct '{kind}' (children: [{}])", children.join(", "))]
    UnsupportedConstruct {
        kind: String,
        children: Vec<String>,
        location: Option<SourceLocation>,
    },

    /// A reference-by-name that matched no declaration
    #[error("unresolved reference '{handle}' in {searched_scope}")]
    UnresolvedReference {
        handle: String,
        searched_scope: String,
        location: Option<SourceLocation>,
    },

    /// Reading a source unit or an options file failed
    #[error("failed to read '{path}': {message}")]
    Io { path: String, message: String },

    /// Options file could not be decoded
    #[error("invalid options: {message}")]
    Config { message: String },
}

fn first_issue(issues: &[Issue]) -> String {
    issues
        .first()
        .map(|issue| issue.to_string())
        .unwrap_or_default()
}

impl CfmlError {
    /// Create a new classification failure
    pub fn classification_failure(unit: impl Into<String>) -> Self {
        Self::ClassificationFailure { unit: unit.into() }
    }

    /// Create a new parse failure
    pub fn parse_failure(issues: Vec<Issue>) -> Self {
        Self::ParseFailure { issues }
    }

    /// Create a new construction gap
    pub fn construction_gap(
        kind: impl Into<String>,
        children: Vec<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self::ConstructionGap {
            kind: kind.into(),
            children,
            location,
        }
    }

    /// Create a new unsupported-construct error
    pub fn unsupported(kind: impl Into<String>, children: Vec<String>) -> Self {
        Self::UnsupportedConstruct {
            kind: kind.into(),
            children,
            location: None,
        }
    }

    /// Create a new unresolved-reference error
    pub fn unresolved(handle: impl Into<String>, searched_scope: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            handle: handle.into(),
            searched_scope: searched_scope.into(),
            location: None,
        }
    }

    /// Attach a source location to a gap or reference error that has none
    pub fn located_at(mut self, source: Option<&SourceLocation>) -> Self {
        if let (
            Self::ConstructionGap { location, .. }
            | Self::UnsupportedConstruct { location, .. }
            | Self::UnresolvedReference { location, .. },
            Some(source),
        ) = (&mut self, source)
        {
            if location.is_none() {
                *location = Some(source.clone());
            }
        }
        self
    }

    pub fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the error kind as a string
    pub fn kind(&self) -> &str {
        match self {
            Self::ClassificationFailure { .. } => "Classification Error",
            Self::ParseFailure { .. } => "Parse Error",
            Self::ConstructionGap { .. } => "Construction Gap",
            Self::UnsupportedConstruct { .. } => "Generation Gap",
            Self::UnresolvedReference { .. } => "Unresolved Reference",
            Self::Io { .. } => "I/O Error",
            Self::Config { .. } => "Configuration Error",
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Get the source location if available
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::ParseFailure { issues } => issues.first().map(|issue| &issue.location),
            Self::ConstructionGap { location, .. }
            | Self::UnsupportedConstruct { location, .. }
            | Self::UnresolvedReference { location, .. } => location.as_ref(),
            _ => None,
        }
    }
}
