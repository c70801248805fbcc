//! Reference-by-name handles and the resolution pass
//!
//! Builders store names as unresolved `Reference` handles. Resolution is a
//! separate, explicit pass that never touches the tree: it returns a
//! `Resolution` side table binding each handle (by node identity) to the
//! declaration it names.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::node::{Expression, FunctionDefinition, Script};
use super::walk::find_in;
use crate::config::CompilerOptions;
use crate::error::{CfmlError, CfmlResult};

/// A symbolic handle naming a declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Reference {
    pub name: String,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Case-insensitive name comparison, as the source language is
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Names visible to every unit: declared scopes and runtime functions
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<String>,
    builtins: Vec<String>,
}

impl Environment {
    pub fn new(scopes: Vec<String>, builtins: Vec<String>) -> Self {
        Self { scopes, builtins }
    }

    pub fn from_options(options: &CompilerOptions) -> Self {
        Self::new(options.scopes.clone(), options.builtin_functions.clone())
    }

    fn scope(&self, name: &str) -> Option<&str> {
        self.scopes
            .iter()
            .find(|s| s.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    fn builtin(&self, name: &str) -> Option<&str> {
        self.builtins
            .iter()
            .find(|s| s.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_options(&CompilerOptions::default())
    }
}

/// What a reference was bound to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Function(&'a FunctionDefinition),
    Scope(&'a str),
    Builtin(&'a str),
    /// A method on a receiver whose type is only known at runtime
    Dynamic,
}

/// Side table of resolved references
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    bindings: Vec<(&'a Reference, Target<'a>)>,
}

impl<'a> Resolution<'a> {
    /// Look up the binding for a handle taken from the resolved script
    pub fn target(&self, reference: &Reference) -> Option<Target<'a>> {
        self.bindings
            .iter()
            .find(|(bound, _)| std::ptr::eq(*bound, reference))
            .map(|(_, target)| *target)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Bind every reference in `script` to its declaration
pub fn resolve<'a>(script: &'a Script, env: &'a Environment) -> CfmlResult<Resolution<'a>> {
    let functions: Vec<&FunctionDefinition> = script.find();
    let mut resolution = Resolution::default();

    let find_function = |name: &Reference| functions.iter().copied().find(|f| name.matches(&f.name));

    for (index, stmt) in script.statements.iter().enumerate() {
        let span = script.span(index);
        for expr in find_in::<&Expression>(std::slice::from_ref(stmt)) {
            match expr {
                Expression::FunctionInvocation { name, .. } => {
                    let target = match find_function(name) {
                        Some(function) => Target::Function(function),
                        None => match env.builtin(&name.name) {
                            Some(builtin) => Target::Builtin(builtin),
                            None => {
                                return Err(CfmlError::unresolved(
                                    &name.name,
                                    "declared functions and built-ins",
                                )
                                .located_at(span))
                            }
                        },
                    };
                    resolution.bindings.push((name, target));
                }
                Expression::MethodInvocation { method_name, .. } => {
                    let target = find_function(method_name)
                        .map(Target::Function)
                        .unwrap_or(Target::Dynamic);
                    resolution.bindings.push((method_name, target));
                }
                Expression::Identifier {
                    scope: Some(scope), ..
                } => {
                    let declared = env.scope(&scope.name).ok_or_else(|| {
                        CfmlError::unresolved(&scope.name, "declared scopes").located_at(span)
                    })?;
                    resolution.bindings.push((scope, Target::Scope(declared)));
                }
                _ => {}
            }
        }
    }

    debug!(bindings = resolution.len(), "resolved references");
    Ok(resolution)
}
