//! Parse results shared by both grammars
//!
//! A `ParsingResult` carries the concrete tree (absent only when the
//! grammar could not even recover), the ordered issues, and whether the
//! tree holds any real content. Placeholder nodes count as issues, never
//! as content.

use pest::error::{Error as PestError, LineColLocation};
use pest::iterators::{Pair, Pairs};
use pest::RuleType;

use crate::error::{Issue, SourceLocation};

/// Where a parsed fragment starts inside its file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub filename: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl Origin {
    pub fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(str::to_string),
            line: 1,
            column: 1,
        }
    }

    /// Origin of a fragment starting at `(line, column)` of this one
    pub fn nested(&self, line: usize, column: usize) -> Self {
        let (line, column) = self.translate(line, column);
        Self {
            filename: self.filename.clone(),
            line,
            column,
        }
    }

    fn translate(&self, line: usize, column: usize) -> (usize, usize) {
        if line <= 1 {
            (self.line, self.column + column.saturating_sub(1))
        } else {
            (self.line + line - 1, column)
        }
    }

    /// Absolute location of a fragment-relative position
    pub fn locate(&self, line: usize, column: usize) -> SourceLocation {
        let (line, column) = self.translate(line, column);
        SourceLocation::new(line, column, self.filename.clone())
    }

    /// Absolute location of a pair's start
    pub fn locate_pair<R: RuleType>(&self, pair: &Pair<'_, R>) -> SourceLocation {
        let (line, column) = pair.as_span().start_pos().line_col();
        self.locate(line, column)
    }
}

/// Grammar-specific knowledge needed to judge a tree
pub trait Grammar {
    type Rule: RuleType;

    /// Rule parsing a whole source unit
    const ROOT: Self::Rule;

    /// Run the generated parser from `rule`
    fn run(rule: Self::Rule, input: &str) -> Result<Pairs<'_, Self::Rule>, PestError<Self::Rule>>;

    /// Error-placeholder rules
    fn is_placeholder(rule: Self::Rule) -> bool;

    /// Whether a non-placeholder top-level child is real content
    fn is_content(pair: &Pair<'_, Self::Rule>) -> bool;

    /// Issue text for a placeholder node
    fn describe(pair: &Pair<'_, Self::Rule>) -> String;
}

/// Outcome of running one grammar over one input
#[derive(Debug)]
pub struct ParsingResult<'i, R: RuleType> {
    tree: Option<Pair<'i, R>>,
    issues: Vec<Issue>,
    content: bool,
}

impl<'i, R: RuleType> ParsingResult<'i, R> {
    pub fn tree(&self) -> Option<&Pair<'i, R>> {
        self.tree.as_ref()
    }

    pub fn into_parts(self) -> (Option<Pair<'i, R>>, Vec<Issue>) {
        (self.tree, self.issues)
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Correct means no issues were reported
    pub fn is_correct(&self) -> bool {
        self.issues.is_empty()
    }

    /// At least one top-level child that is not an error placeholder
    pub fn has_content(&self) -> bool {
        self.content
    }
}

/// Parse a whole unit with grammar `G`
pub fn parse_unit<'i, G: Grammar>(input: &'i str, origin: &Origin) -> ParsingResult<'i, G::Rule> {
    parse_rule::<G>(G::ROOT, input, origin)
}

/// Parse `input` starting from `rule` with grammar `G`
pub fn parse_rule<'i, G: Grammar>(
    rule: G::Rule,
    input: &'i str,
    origin: &Origin,
) -> ParsingResult<'i, G::Rule> {
    let root = match G::run(rule, input) {
        Ok(mut pairs) => pairs.next(),
        Err(err) => {
            return ParsingResult {
                tree: None,
                issues: vec![issue_from_pest(&err, origin)],
                content: false,
            }
        }
    };

    let Some(root) = root else {
        return ParsingResult {
            tree: None,
            issues: Vec::new(),
            content: false,
        };
    };

    let issues = root
        .clone()
        .into_inner()
        .flatten()
        .filter(|pair| G::is_placeholder(pair.as_rule()))
        .map(|pair| Issue::new(G::describe(&pair), origin.locate_pair(&pair)))
        .collect();

    let content = root
        .clone()
        .into_inner()
        .any(|pair| !G::is_placeholder(pair.as_rule()) && G::is_content(&pair));

    ParsingResult {
        tree: Some(root),
        issues,
        content,
    }
}

fn issue_from_pest<R: RuleType>(err: &PestError<R>, origin: &Origin) -> Issue {
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    Issue::new(err.variant.message().into_owned(), origin.locate(line, column))
}

/// Shorten a source excerpt for an issue message
pub(crate) fn excerpt(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > 40 {
        let cut: String = line.chars().take(40).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_translates_first_line_by_column() {
        let origin = Origin::new(Some("page.cfm")).nested(4, 11);
        assert_eq!(origin.locate(1, 3), SourceLocation::new(4, 13, Some("page.cfm".to_string())));
        assert_eq!(origin.locate(2, 3), SourceLocation::new(5, 3, Some("page.cfm".to_string())));
    }

    #[test]
    fn test_excerpt_truncates_long_lines() {
        assert_eq!(excerpt("  short  \nnext"), "short");
        let long = "x".repeat(60);
        assert_eq!(excerpt(&long), format!("{}...", "x".repeat(40)));
    }
}
