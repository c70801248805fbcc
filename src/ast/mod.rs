//! Unified AST module
//!
//! The node model shared by both dialects, its typed traversal, and the
//! reference resolution pass.

pub mod node;
pub mod reference;
pub mod walk;

pub use node::{
    BinaryOperator, Component, ComparisonOperator, Expression, FunctionDefinition, Parameter,
    Script, Statement,
};
pub use reference::{resolve, Environment, Reference, Resolution, Target};
pub use walk::{find_in, NodeFilter, NodeRef};
