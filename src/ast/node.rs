//! Unified AST node definitions
//!
//! Both dialects build into these types. The taxonomy is closed: every
//! consumer matches exhaustively, so a new variant fails the build at each
//! site that does not handle it yet.

use serde::Serialize;

use super::reference::Reference;
use crate::error::SourceLocation;

/// Root AST node: the ordered statements of one source unit
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Script {
    pub statements: Vec<Statement>,
    /// Start of each top-level statement, parallel to `statements`; empty
    /// for hand-built scripts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SourceLocation>,
}

impl Script {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            spans: Vec::new(),
        }
    }

    /// A script whose top-level statements carry their source positions
    pub fn located(located: Vec<(SourceLocation, Statement)>) -> Self {
        let (spans, statements) = located.into_iter().unzip();
        Self { statements, spans }
    }

    /// Source position of the `index`-th top-level statement
    pub fn span(&self, index: usize) -> Option<&SourceLocation> {
        self.spans.get(index)
    }
}

/// Statement node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node")]
pub enum Statement {
    /// `left = right`
    Assignment { left: Expression, right: Expression },

    /// If statement; `else if` arms nest inside `else_body`
    If {
        condition: Expression,
        body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
    },

    /// Expression evaluated for its effect (calls, method calls)
    ExpressionStatement { expression: Expression },

    /// Component declaration
    Component(Component),

    /// Named function declaration
    FunctionDefinition(FunctionDefinition),
}

/// A component and the functions it declares, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub identifier: Option<String>,
    pub functions: Vec<FunctionDefinition>,
}

/// A named function declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub access: Option<String>,
    pub return_type: Option<String>,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
}

/// A declared function parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
    pub required: bool,
    pub default: Option<Expression>,
}

/// Concatenation is the only binary operator with an AST counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqualsThan,
    LessThan,
    LessEqualThan,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node")]
pub enum Expression {
    IntegerLiteral { value: i64 },
    FloatLiteral { value: f64 },
    StringLiteral { value: String },
    BooleanLiteral { value: bool },

    /// A bare name, optionally qualified by a scope handle (`local.x`)
    Identifier {
        name: String,
        scope: Option<Reference>,
    },

    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    Comparison {
        left: Box<Expression>,
        op: ComparisonOperator,
        right: Box<Expression>,
    },

    /// A named runtime storage bucket, e.g. `variables`
    Scope { name: String },

    /// Member access; `context` is absent only for a free-standing member
    ObjectAccess {
        context: Option<Box<Expression>>,
        access: Box<Expression>,
    },

    /// Dynamic index access
    ArrayAccess {
        context: Box<Expression>,
        index: Box<Expression>,
    },

    FunctionInvocation {
        name: Reference,
        arguments: Vec<Expression>,
    },

    MethodInvocation {
        method_name: Reference,
        object: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

impl Statement {
    /// Node kind name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Assignment { .. } => "Assignment",
            Self::If { .. } => "If",
            Self::ExpressionStatement { .. } => "ExpressionStatement",
            Self::Component(_) => "Component",
            Self::FunctionDefinition(_) => "FunctionDefinition",
        }
    }
}

impl Expression {
    /// Node kind name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IntegerLiteral { .. } => "IntegerLiteral",
            Self::FloatLiteral { .. } => "FloatLiteral",
            Self::StringLiteral { .. } => "StringLiteral",
            Self::BooleanLiteral { .. } => "BooleanLiteral",
            Self::Identifier { .. } => "Identifier",
            Self::Binary { .. } => "Binary",
            Self::Comparison { .. } => "Comparison",
            Self::Scope { .. } => "Scope",
            Self::ObjectAccess { .. } => "ObjectAccess",
            Self::ArrayAccess { .. } => "ArrayAccess",
            Self::FunctionInvocation { .. } => "FunctionInvocation",
            Self::MethodInvocation { .. } => "MethodInvocation",
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::StringLiteral {
            value: value.into(),
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier {
            name: name.into(),
            scope: None,
        }
    }

    pub fn scope(name: impl Into<String>) -> Self {
        Self::Scope { name: name.into() }
    }

    pub fn object_access(context: Expression, access: Expression) -> Self {
        Self::ObjectAccess {
            context: Some(Box::new(context)),
            access: Box::new(access),
        }
    }

    pub fn array_access(context: Expression, index: Expression) -> Self {
        Self::ArrayAccess {
            context: Box::new(context),
            index: Box::new(index),
        }
    }

    /// The innermost expression of an access chain
    pub fn chain_root(&self) -> &Expression {
        match self {
            Self::ObjectAccess {
                context: Some(context),
                ..
            }
            | Self::ArrayAccess { context, .. } => context.chain_root(),
            other => other,
        }
    }

    /// Whether this access chain bottoms out at a Scope or an identifier
    pub fn is_well_rooted(&self) -> bool {
        matches!(
            self.chain_root(),
            Self::Scope { .. } | Self::Identifier { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_root_follows_contexts() {
        let chain = Expression::object_access(
            Expression::object_access(Expression::identifier("a"), Expression::identifier("b")),
            Expression::identifier("c"),
        );

        assert_eq!(chain.chain_root(), &Expression::identifier("a"));
        assert!(chain.is_well_rooted());
    }

    #[test]
    fn test_chain_rooted_at_call_is_not_well_rooted() {
        let scoped = Expression::array_access(Expression::scope("variables"), Expression::identifier("foo"));
        assert!(scoped.is_well_rooted());

        let call = Expression::FunctionInvocation {
            name: Reference::new("getUser"),
            arguments: Vec::new(),
        };
        let access = Expression::object_access(call, Expression::identifier("name"));
        assert!(!access.is_well_rooted());
    }

    #[test]
    fn test_located_script_keeps_spans_parallel() {
        let script = Script::located(vec![
            (
                SourceLocation::at(1, 1),
                Statement::ExpressionStatement {
                    expression: Expression::identifier("a"),
                },
            ),
            (
                SourceLocation::at(3, 5),
                Statement::ExpressionStatement {
                    expression: Expression::identifier("b"),
                },
            ),
        ]);

        assert_eq!(script.statements.len(), 2);
        assert_eq!(script.span(1), Some(&SourceLocation::at(3, 5)));
        assert_eq!(Script::new(Vec::new()).span(0), None);
    }

    #[test]
    fn test_serialized_shape_is_tagged() {
        let stmt = Statement::Assignment {
            left: Expression::identifier("x"),
            right: Expression::IntegerLiteral { value: 1 },
        };
        let json = serde_json::to_value(&stmt).unwrap();

        assert_eq!(json["node"], "Assignment");
        assert_eq!(json["left"]["node"], "Identifier");
        assert_eq!(json["right"]["value"], 1);
    }
}
