//! Script dialect parser
//!
//! Generated from `script.pest`. Besides the whole-unit `program` rule the
//! grammar exposes `statement_entry` and `condition_entry`, which the tag
//! builder uses for `<cfset>` bodies and `<cfif>` conditions.

use pest::error::Error as PestError;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use super::tree::{excerpt, Grammar};

#[derive(Parser)]
#[grammar = "grammar/script.pest"]
pub struct ScriptParser;

impl Grammar for ScriptParser {
    type Rule = Rule;

    const ROOT: Rule = Rule::program;

    fn run(rule: Rule, input: &str) -> Result<Pairs<'_, Rule>, PestError<Rule>> {
        <ScriptParser as pest::Parser<Rule>>::parse(rule, input)
    }

    fn is_placeholder(rule: Rule) -> bool {
        matches!(rule, Rule::recovery | Rule::stray_close)
    }

    fn is_content(pair: &Pair<'_, Rule>) -> bool {
        pair.as_rule() != Rule::EOI
    }

    fn describe(pair: &Pair<'_, Rule>) -> String {
        match pair.as_rule() {
            Rule::stray_close => "unmatched '}'".to_string(),
            _ => format!("unparseable script '{}'", excerpt(pair.as_str())),
        }
    }
}
