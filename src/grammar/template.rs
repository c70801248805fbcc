//! Tag dialect parser
//!
//! Generated from `template.pest`. Whitespace-only text does not count as
//! content when judging a tree.

use pest::error::Error as PestError;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use super::tree::{excerpt, Grammar};

#[derive(Parser)]
#[grammar = "grammar/template.pest"]
pub struct TemplateParser;

impl Grammar for TemplateParser {
    type Rule = Rule;

    const ROOT: Rule = Rule::template;

    fn run(rule: Rule, input: &str) -> Result<Pairs<'_, Rule>, PestError<Rule>> {
        <TemplateParser as pest::Parser<Rule>>::parse(rule, input)
    }

    fn is_placeholder(rule: Rule) -> bool {
        matches!(rule, Rule::broken_tag | Rule::stray_close)
    }

    fn is_content(pair: &Pair<'_, Rule>) -> bool {
        match pair.as_rule() {
            Rule::EOI => false,
            Rule::text => !pair.as_str().trim().is_empty(),
            _ => true,
        }
    }

    fn describe(pair: &Pair<'_, Rule>) -> String {
        match pair.as_rule() {
            Rule::stray_close => format!("closing tag without opener '{}'", excerpt(pair.as_str())),
            _ => format!("malformed or unclosed tag '{}'", excerpt(pair.as_str())),
        }
    }
}
