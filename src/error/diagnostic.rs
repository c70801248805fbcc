//! Diagnostic formatting for compiler errors
//!
//! Renders a `CfmlError` with a colored header, the source location and,
//! when the source text is available, the surrounding lines with a caret
//! under the offending column. Parse failures list every issue.

use super::{CfmlError, SourceLocation};
use colored::Colorize;

/// Lines of source shown on each side of the offending line
const CONTEXT_LINES: usize = 1;

/// Diagnostic information for displaying errors with context
pub struct Diagnostic {
    error: CfmlError,
    source: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic from an error
    pub fn new(error: CfmlError) -> Self {
        Self {
            error,
            source: None,
        }
    }

    /// Create a diagnostic with source code context
    pub fn with_source(error: CfmlError, source: &str) -> Self {
        Self {
            error,
            source: Some(source.to_string()),
        }
    }

    /// Format the diagnostic with color and context
    pub fn format(&self) -> String {
        let mut output = String::new();

        let kind = self.error.kind().red().bold();
        output.push_str(&format!("{}: ", kind));
        output.push_str(&self.error.message());
        output.push('\n');

        if let CfmlError::ParseFailure { issues } = &self.error {
            for issue in issues {
                output.push_str(&format!(
                    "  {} {}: {}\n",
                    "-->".blue().bold(),
                    issue.location,
                    issue.message
                ));
                if let Some(ref source) = self.source {
                    output.push_str(&self.format_source_context(source, &issue.location));
                }
            }
            return output;
        }

        if let Some(location) = self.error.location() {
            output.push_str(&format!("  {} {}\n", "-->".blue().bold(), location));

            if let Some(ref source) = self.source {
                output.push_str(&self.format_source_context(source, location));
            }
        }

        output
    }

    /// Source lines around `location`, with a caret under the column
    fn format_source_context(&self, source: &str, location: &SourceLocation) -> String {
        let lines: Vec<&str> = source.lines().collect();
        if location.line == 0 || location.line > lines.len() {
            return String::new();
        }

        let first = location.line.saturating_sub(CONTEXT_LINES).max(1);
        let last = (location.line + CONTEXT_LINES).min(lines.len());
        let width = last.to_string().len();

        let mut output = String::new();
        for number in first..=last {
            let gutter = format!("{:width$}", number, width = width);
            let text = lines[number - 1];
            if number == location.line {
                output.push_str(&format!("  {} {}\n", gutter.blue().bold(), text));
                let padding = " ".repeat(width + 2 + location.column.saturating_sub(1));
                output.push_str(&format!("{}{}\n", padding, "^".red().bold()));
            } else {
                output.push_str(&format!("  {} {}\n", gutter.blue(), text));
            }
        }

        output
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Issue;

    #[test]
    fn test_diagnostic_without_source() {
        let err = CfmlError::classification_failure("<memory>");
        let formatted = Diagnostic::new(err).format();

        assert!(formatted.contains("Classification Error"));
        assert!(formatted.contains("<memory>"));
    }

    #[test]
    fn test_diagnostic_with_source() {
        let source = "x = 1;\ny = @;\nz = 3;";
        let err = CfmlError::construction_gap(
            "recovery",
            Vec::new(),
            Some(SourceLocation::at(2, 5)),
        );
        let formatted = Diagnostic::with_source(err, source).format();

        assert!(formatted.contains("Construction Gap"));
        assert!(formatted.contains("y = @;"));
        assert!(formatted.contains('^'));
    }

    #[test]
    fn test_parse_failure_lists_every_issue() {
        let source = "<cfset x = >\n<p>ok</p>\n</cfif>";
        let err = CfmlError::parse_failure(vec![
            Issue::new("malformed tag", SourceLocation::at(1, 1)),
            Issue::new("closing tag without opener", SourceLocation::at(3, 1)),
        ]);
        let formatted = Diagnostic::with_source(err, source).format();

        assert!(formatted.contains("malformed tag"));
        assert!(formatted.contains("closing tag without opener"));
        assert!(formatted.contains("</cfif>"));
    }
}
