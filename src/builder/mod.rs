//! Parse-tree builders
//!
//! One builder per dialect; both produce the unified `Script`.

mod interpolate;
pub mod script;
pub mod template;

pub use script::ScriptBuilder;
pub use template::TemplateBuilder;
