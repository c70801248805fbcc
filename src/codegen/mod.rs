//! Code generation module
//!
//! Produces the in-memory target AST for one source unit: the fixed
//! wrapper scaffold, then the translated statements appended to its entry
//! point. Rendering the target AST to text is left to downstream tooling.

pub mod java;
pub mod scaffold;
pub mod translate;

pub use java::{
    BinaryOp, Block, ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, Member,
    MethodDecl, Modifier, Param, Stmt,
};
pub use scaffold::{class_name, package_name, Naming, ENTRY_METHOD, RESERVED_MEMBERS};

use chrono::{Local, NaiveDateTime};
use tracing::debug;

use crate::ast::{Component, NodeRef, Script, Statement};
use crate::config::CompilerOptions;
use crate::detect::SourceUnit;
use crate::error::{CfmlError, CfmlResult};

/// Turns a unified AST into a target compilation unit
pub struct Generator<'a> {
    options: &'a CompilerOptions,
    compiled_on: NaiveDateTime,
}

impl<'a> Generator<'a> {
    pub fn new(options: &'a CompilerOptions) -> Self {
        Self {
            options,
            compiled_on: Local::now().naive_local(),
        }
    }

    /// Pin the compile timestamp written into the constructor
    pub fn with_timestamp(mut self, compiled_on: NaiveDateTime) -> Self {
        self.compiled_on = compiled_on;
        self
    }

    /// The wrapper for `unit` with an entry point holding only the preamble
    pub fn scaffold(&self, unit: &SourceUnit) -> CompilationUnit {
        scaffold::scaffold(unit, self.options, self.compiled_on)
    }

    /// Translate `script` into `target`.
    ///
    /// Everything is translated before anything is attached, so on error the
    /// target is left exactly as it was.
    pub fn populate(&self, target: &mut CompilationUnit, script: &Script) -> CfmlResult<()> {
        let wrapper_name = target
            .types
            .iter()
            .find(|class| class.method(ENTRY_METHOD).is_some())
            .map(|class| class.name.clone())
            .ok_or_else(|| CfmlError::unsupported("CompilationUnit", Vec::new()))?;

        let mut body = Vec::new();
        let mut methods: Vec<MethodDecl> = Vec::new();
        let mut classes: Vec<ClassDecl> = Vec::new();

        for (index, stmt) in script.statements.iter().enumerate() {
            let span = script.span(index);
            match stmt {
                Statement::Component(component) => {
                    let name = component_name(component, &wrapper_name);
                    let taken = name.eq_ignore_ascii_case(&wrapper_name)
                        || classes.iter().any(|class| class.name.eq_ignore_ascii_case(&name));
                    if taken {
                        return Err(rejected(stmt).located_at(span));
                    }
                    let class = translate::component(component, name)
                        .map_err(|e| e.located_at(span))?;
                    classes.push(class);
                }
                Statement::FunctionDefinition(function) => {
                    let reserved = RESERVED_MEMBERS
                        .iter()
                        .any(|member| member.eq_ignore_ascii_case(&function.name));
                    let declared = methods
                        .iter()
                        .any(|method| method.name.eq_ignore_ascii_case(&function.name));
                    if reserved || declared {
                        return Err(rejected(stmt).located_at(span));
                    }
                    methods.push(translate::function(function).map_err(|e| e.located_at(span))?);
                }
                other => body.push(translate::statement(other).map_err(|e| e.located_at(span))?),
            }
        }

        debug!(
            class = %wrapper_name,
            statements = body.len(),
            functions = methods.len(),
            components = classes.len(),
            "translated script"
        );

        let wrapper = target
            .class_mut(&wrapper_name)
            .ok_or_else(|| CfmlError::unsupported("CompilationUnit", Vec::new()))?;
        if let Some(entry) = wrapper.method_mut(ENTRY_METHOD) {
            entry.body.statements.extend(body);
        }
        wrapper.members.extend(methods.into_iter().map(Member::Method));
        target.types.extend(classes);

        Ok(())
    }

    /// Scaffold and populate in one step
    pub fn generate(&self, unit: &SourceUnit, script: &Script) -> CfmlResult<CompilationUnit> {
        let mut target = self.scaffold(unit);
        self.populate(&mut target, script)?;
        Ok(target)
    }
}

/// Components without a name borrow the wrapper's base name
fn component_name(component: &Component, wrapper_name: &str) -> String {
    match &component.identifier {
        Some(identifier) => scaffold::java_identifier(identifier),
        None => wrapper_name
            .split('$')
            .next()
            .unwrap_or(wrapper_name)
            .to_string(),
    }
}

/// A declaration whose generated name is already taken
fn rejected(stmt: &Statement) -> CfmlError {
    CfmlError::unsupported(stmt.kind(), NodeRef::Statement(stmt).child_kinds())
}
