//! Dialect detection
//!
//! Precedence, first match wins:
//! 1. an extension used by exactly one dialect;
//! 2. a line scan for a container declaration (`<cfcomponent`,
//!    `<cfinterface`, `<cfscript` select tag-based; a leading `component`
//!    or `interface` declaration selects script-based);
//! 3. a parse under each grammar, script first, picking the first that
//!    parses cleanly with real content, else the first with real content.
//!
//! Results are cached per source unit, so classifying a unit again never
//! reaches the grammars.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use tracing::debug;

use super::source::{Dialect, SourceUnit};
use crate::error::{CfmlError, CfmlResult};
use crate::grammar::{parse_unit, Origin, ScriptParser, TemplateParser};

/// How a text fared under one grammar
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// At least one top-level node that is not an error placeholder
    pub content: bool,
    /// Parsed without issues
    pub correct: bool,
}

/// Parses a text under one dialect's grammar
pub trait GrammarCheck {
    fn check(&self, dialect: Dialect, text: &str) -> Verdict;
}

/// Check backed by the pest grammars
#[derive(Debug, Default, Clone, Copy)]
pub struct PestCheck;

impl GrammarCheck for PestCheck {
    fn check(&self, dialect: Dialect, text: &str) -> Verdict {
        let origin = Origin::new(None);
        match dialect {
            Dialect::ScriptBased => {
                let result = parse_unit::<ScriptParser>(text, &origin);
                Verdict {
                    content: result.has_content(),
                    correct: result.is_correct(),
                }
            }
            Dialect::TagBased => {
                let result = parse_unit::<TemplateParser>(text, &origin);
                Verdict {
                    content: result.has_content(),
                    correct: result.is_correct(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Path(PathBuf),
    Content(u64),
}

impl CacheKey {
    fn of(unit: &SourceUnit) -> Self {
        match unit.identity() {
            Some(identity) => Self::Path(identity.path.clone()),
            None => {
                let mut hasher = DefaultHasher::new();
                unit.text().hash(&mut hasher);
                Self::Content(hasher.finish())
            }
        }
    }
}

/// Classifies source units, remembering earlier answers
#[derive(Debug, Default)]
pub struct DialectDetector<C = PestCheck> {
    checker: C,
    cache: HashMap<CacheKey, Dialect>,
}

impl DialectDetector<PestCheck> {
    pub fn new() -> Self {
        Self::with_checker(PestCheck)
    }
}

impl<C: GrammarCheck> DialectDetector<C> {
    pub fn with_checker(checker: C) -> Self {
        Self {
            checker,
            cache: HashMap::new(),
        }
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    /// Decide which dialect a unit is written in
    pub fn classify(&mut self, unit: &SourceUnit) -> CfmlResult<Dialect> {
        let key = CacheKey::of(unit);
        if let Some(dialect) = self.cache.get(&key) {
            debug!(unit = %unit.display_name(), %dialect, "dialect cache hit");
            return Ok(*dialect);
        }

        let dialect = self.detect(unit)?;
        self.cache.insert(key, dialect);
        Ok(dialect)
    }

    fn detect(&self, unit: &SourceUnit) -> CfmlResult<Dialect> {
        if let Some(dialect) = unit.extension().and_then(Dialect::from_extension) {
            debug!(unit = %unit.display_name(), %dialect, "dialect from extension");
            return Ok(dialect);
        }

        if let Some(dialect) = scan_declarations(unit.text()) {
            debug!(unit = %unit.display_name(), %dialect, "dialect from declaration scan");
            return Ok(dialect);
        }

        let mut fallback = None;
        for dialect in [Dialect::ScriptBased, Dialect::TagBased] {
            let verdict = self.checker.check(dialect, unit.text());
            if verdict.content && verdict.correct {
                debug!(unit = %unit.display_name(), %dialect, "dialect from clean parse");
                return Ok(dialect);
            }
            if verdict.content && fallback.is_none() {
                fallback = Some(dialect);
            }
        }

        match fallback {
            Some(dialect) => {
                debug!(unit = %unit.display_name(), %dialect, "dialect from partial parse");
                Ok(dialect)
            }
            None => Err(CfmlError::classification_failure(unit.display_name())),
        }
    }
}

/// Line scan for a container declaration, skipping comments
pub fn scan_declarations(text: &str) -> Option<Dialect> {
    let mut in_comment = false;

    for line in text.lines() {
        let line = line.trim_start_matches('\u{feff}').trim().to_lowercase();
        if line.starts_with("//") {
            continue;
        }
        if line.contains("<!---") || line.contains("/*") {
            in_comment = true;
        }
        if line.contains("--->") || line.contains("*/") {
            in_comment = false;
        }
        if in_comment {
            continue;
        }

        if line.starts_with("<cfcomponent")
            || line.starts_with("<cfinterface")
            || line.starts_with("<cfscript")
        {
            return Some(Dialect::TagBased);
        }
        if starts_with_word(&line, "component") || starts_with_word(&line, "interface") {
            return Some(Dialect::ScriptBased);
        }
        if (starts_with_word(&line, "abstract") || starts_with_word(&line, "final"))
            && line.contains("component")
        {
            return Some(Dialect::ScriptBased);
        }
    }

    None
}

fn starts_with_word(line: &str, word: &str) -> bool {
    line.strip_prefix(word)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_'))
}
