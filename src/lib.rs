//! # cfmlc
//!
//! A front-end compiler for CFML in both of its dialects:
//! - tag-based templates (`<cfset>`, `<cfif>`, `<cffunction>`, ...)
//! - CFScript (`component { function f() { ... } }`)
//!
//! Both dialects build the same unified AST, which is then translated into
//! an in-memory Java-like target AST.
//!
//! ## Architecture
//!
//! - `detect`: source units and dialect detection
//! - `grammar`: pest grammars producing concrete parse trees
//! - `builder`: parse tree to unified AST, one builder per dialect
//! - `ast`: the unified AST, typed traversal and reference resolution
//! - `codegen`: the target AST, wrapper scaffold and translation rules
//! - `compiler`: the pipeline tying the stages together
//! - `config`: compiler options
//! - `error`: error handling and diagnostics

pub mod ast;
pub mod builder;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod detect;
pub mod error;
pub mod grammar;

// Re-export commonly used types
pub use ast::Script;
pub use codegen::{CompilationUnit, Generator};
pub use compiler::Compiler;
pub use config::CompilerOptions;
pub use detect::{Dialect, DialectDetector, SourceUnit};
pub use error::{CfmlError, CfmlResult, Diagnostic, SourceLocation};

/// Version of the compiler
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compile CFML source text with default options
///
/// `filename`, when given, drives dialect detection by extension and the
/// generated class and package names.
pub fn compile(source: &str, filename: Option<&str>) -> CfmlResult<CompilationUnit> {
    let mut unit = SourceUnit::from_string(source);
    if let Some(filename) = filename {
        unit = unit.with_identity(filename);
    }
    Compiler::default().compile(&unit)
}
