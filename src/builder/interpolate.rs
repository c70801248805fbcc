//! `#expression#` interpolation
//!
//! Output text and string literals may embed expressions between `#`
//! marks; `##` stands for a literal `#`. The literal runs and the parsed
//! expressions are folded left to right into a concatenation.

use super::script::ScriptBuilder;
use crate::ast::{BinaryOperator, Expression};
use crate::config::CompilerOptions;
use crate::error::{CfmlError, CfmlResult, Issue};
use crate::grammar::{parse_rule, Origin, ScriptParser, ScriptRule};

const MARK: char = '#';

/// Expression for `text`, whose first character sits at `origin`
pub(crate) fn interpolate(
    text: &str,
    options: &CompilerOptions,
    origin: &Origin,
) -> CfmlResult<Expression> {
    if !text.contains(MARK) {
        return Ok(Expression::string(text));
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = 0;

    while let Some(found) = text[rest..].find(MARK) {
        let open = rest + found;
        literal.push_str(&text[rest..open]);

        let body_start = open + MARK.len_utf8();
        if text[body_start..].starts_with(MARK) {
            literal.push(MARK);
            rest = body_start + MARK.len_utf8();
            continue;
        }

        let Some(length) = text[body_start..].find(MARK) else {
            let (line, column) = line_col(text, open);
            return Err(CfmlError::parse_failure(vec![Issue::new(
                "unterminated '#' expression".to_string(),
                origin.locate(line, column),
            )]));
        };

        if !literal.is_empty() {
            parts.push(Expression::string(std::mem::take(&mut literal)));
        }
        let (line, column) = line_col(text, body_start);
        let body = &text[body_start..body_start + length];
        parts.push(embedded(body, options, &origin.nested(line, column))?);

        rest = body_start + length + MARK.len_utf8();
    }

    literal.push_str(&text[rest..]);
    if !literal.is_empty() {
        parts.push(Expression::string(literal));
    }

    let mut parts = parts.into_iter();
    let first = parts.next().unwrap_or_else(|| Expression::string(""));
    Ok(parts.fold(first, |left, right| Expression::Binary {
        left: Box::new(left),
        op: BinaryOperator::Concat,
        right: Box::new(right),
    }))
}

fn embedded(body: &str, options: &CompilerOptions, origin: &Origin) -> CfmlResult<Expression> {
    let (tree, issues) =
        parse_rule::<ScriptParser>(ScriptRule::condition_entry, body, origin).into_parts();
    if !issues.is_empty() {
        return Err(CfmlError::parse_failure(issues));
    }
    let tree = tree.ok_or_else(|| {
        CfmlError::construction_gap("interpolation", Vec::new(), Some(origin.locate(1, 1)))
    })?;

    ScriptBuilder::new(options, origin.clone()).build_condition(tree)
}

/// 1-based line and column of byte `offset` in `text`
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
