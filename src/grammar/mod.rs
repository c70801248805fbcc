//! Concrete parse trees for both dialects
//!
//! Two pest grammars turn raw text into concrete trees. The rest of the
//! compiler sees them only through `ParsingResult` (correctness, issues,
//! content) and the typed rule enums.

pub mod script;
pub mod template;
pub mod tree;

pub use script::{Rule as ScriptRule, ScriptParser};
pub use template::{Rule as TemplateRule, TemplateParser};
pub use tree::{parse_rule, parse_unit, Grammar, Origin, ParsingResult};
