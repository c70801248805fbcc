//! Type-filtered traversal over the unified AST
//!
//! `NodeRef` is a borrowed view of any node. `Script::descendants` yields
//! every node in pre-order, and `Script::find` narrows that stream to one
//! node type through the `NodeFilter` trait.

use super::node::{Component, Expression, FunctionDefinition, Parameter, Script, Statement};

/// Borrowed view of one AST node
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Statement(&'a Statement),
    Expression(&'a Expression),
    Function(&'a FunctionDefinition),
    Parameter(&'a Parameter),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Statement(stmt) => stmt.kind(),
            Self::Expression(expr) => expr.kind(),
            Self::Function(_) => "FunctionDefinition",
            Self::Parameter(_) => "Parameter",
        }
    }

    /// Immediate children, in source order
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match *self {
            Self::Statement(stmt) => statement_children(stmt),
            Self::Expression(expr) => expression_children(expr),
            Self::Function(function) => function_children(function),
            Self::Parameter(param) => param
                .default
                .as_ref()
                .map(NodeRef::Expression)
                .into_iter()
                .collect(),
        }
    }

    /// Kind names of the immediate children, for diagnostics
    pub fn child_kinds(&self) -> Vec<String> {
        self.children()
            .iter()
            .map(|child| child.kind().to_string())
            .collect()
    }
}

fn statement_children(stmt: &Statement) -> Vec<NodeRef<'_>> {
    match stmt {
        Statement::Assignment { left, right } => {
            vec![NodeRef::Expression(left), NodeRef::Expression(right)]
        }
        Statement::If {
            condition,
            body,
            else_body,
        } => {
            let mut children = vec![NodeRef::Expression(condition)];
            children.extend(body.iter().map(NodeRef::Statement));
            if let Some(else_body) = else_body {
                children.extend(else_body.iter().map(NodeRef::Statement));
            }
            children
        }
        Statement::ExpressionStatement { expression } => vec![NodeRef::Expression(expression)],
        Statement::Component(Component { functions, .. }) => {
            functions.iter().map(NodeRef::Function).collect()
        }
        Statement::FunctionDefinition(function) => function_children(function),
    }
}

fn function_children(function: &FunctionDefinition) -> Vec<NodeRef<'_>> {
    function
        .parameters
        .iter()
        .map(NodeRef::Parameter)
        .chain(function.body.iter().map(NodeRef::Statement))
        .collect()
}

fn expression_children(expr: &Expression) -> Vec<NodeRef<'_>> {
    match expr {
        Expression::IntegerLiteral { .. }
        | Expression::FloatLiteral { .. }
        | Expression::StringLiteral { .. }
        | Expression::BooleanLiteral { .. }
        | Expression::Identifier { .. }
        | Expression::Scope { .. } => Vec::new(),
        Expression::Binary { left, right, .. } | Expression::Comparison { left, right, .. } => {
            vec![NodeRef::Expression(left), NodeRef::Expression(right)]
        }
        Expression::ObjectAccess { context, access } => context
            .iter()
            .map(|c| NodeRef::Expression(c))
            .chain(std::iter::once(NodeRef::Expression(access)))
            .collect(),
        Expression::ArrayAccess { context, index } => {
            vec![NodeRef::Expression(context), NodeRef::Expression(index)]
        }
        Expression::FunctionInvocation { arguments, .. } => {
            arguments.iter().map(NodeRef::Expression).collect()
        }
        Expression::MethodInvocation {
            object, arguments, ..
        } => std::iter::once(NodeRef::Expression(object.as_ref()))
            .chain(arguments.iter().map(NodeRef::Expression))
            .collect(),
    }
}

/// Picks nodes of one type out of a traversal
pub trait NodeFilter<'a>: Sized {
    fn pick(node: NodeRef<'a>) -> Option<Self>;
}

impl<'a> NodeFilter<'a> for &'a Statement {
    fn pick(node: NodeRef<'a>) -> Option<Self> {
        match node {
            NodeRef::Statement(stmt) => Some(stmt),
            _ => None,
        }
    }
}

impl<'a> NodeFilter<'a> for &'a Expression {
    fn pick(node: NodeRef<'a>) -> Option<Self> {
        match node {
            NodeRef::Expression(expr) => Some(expr),
            _ => None,
        }
    }
}

impl<'a> NodeFilter<'a> for &'a FunctionDefinition {
    fn pick(node: NodeRef<'a>) -> Option<Self> {
        match node {
            NodeRef::Function(function) => Some(function),
            NodeRef::Statement(Statement::FunctionDefinition(function)) => Some(function),
            _ => None,
        }
    }
}

impl<'a> NodeFilter<'a> for &'a Component {
    fn pick(node: NodeRef<'a>) -> Option<Self> {
        match node {
            NodeRef::Statement(Statement::Component(component)) => Some(component),
            _ => None,
        }
    }
}

impl Script {
    /// Every node in pre-order
    pub fn descendants(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeRef<'_>> = self.statements.iter().rev().map(NodeRef::Statement).collect();

        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().into_iter().rev());
        }

        out
    }

    /// Every node of type `T`, in pre-order
    pub fn find<'a, T: NodeFilter<'a>>(&'a self) -> Vec<T> {
        self.descendants().into_iter().filter_map(T::pick).collect()
    }
}

/// Every node of type `T` beneath a list of statements, in pre-order
pub fn find_in<'a, T: NodeFilter<'a>>(statements: &'a [Statement]) -> Vec<T> {
    let mut out = Vec::new();
    for stmt in statements {
        let mut stack = vec![NodeRef::Statement(stmt)];
        while let Some(node) = stack.pop() {
            if let Some(found) = T::pick(node) {
                out.push(found);
            }
            stack.extend(node.children().into_iter().rev());
        }
    }
    out
}
