//! Translation rules from the unified AST to the target AST
//!
//! Every node kind either has a rule here or fails with an unsupported
//! construct error. Source operators never become Java operators: each one
//! is routed through its runtime primitive so CFML coercion applies.

use super::java::{Block, ClassDecl, Expr, Member, MethodDecl, Stmt};
use super::scaffold::{context_method, method_preamble, CONTEXT, LOADER_LOCAL, VARIABLES_LOCAL};
use crate::ast::{
    BinaryOperator, Component, ComparisonOperator, Expression, FunctionDefinition, NodeRef,
    Statement,
};
use crate::error::{CfmlError, CfmlResult};

/// Built-in that constructs host objects
const CREATE_OBJECT: &str = "createObject";

/// Method name that invokes a constructor instead of a method
const CONSTRUCTOR_METHOD: &str = "init";

const VARIABLES_SCOPE: &str = "variables";

/// Translate a statement list that lives inside a method body
pub fn statements(statements: &[Statement]) -> CfmlResult<Vec<Stmt>> {
    statements.iter().map(statement).collect()
}

pub fn statement(stmt: &Statement) -> CfmlResult<Stmt> {
    match stmt {
        Statement::Assignment { left, right } => assignment(left, right),
        Statement::If {
            condition,
            body,
            else_body,
        } => Ok(Stmt::If {
            condition: Expr::static_call("BooleanCaster", "cast", vec![expression(condition)?]),
            then_block: Block::new(statements(body)?),
            else_block: Block::new(match else_body {
                Some(else_body) => statements(else_body)?,
                None => Vec::new(),
            }),
        }),
        Statement::ExpressionStatement { expression: expr } => Ok(expression(expr)?.into_stmt()),
        Statement::Component(_) | Statement::FunctionDefinition(_) => {
            Err(unsupported(NodeRef::Statement(stmt)))
        }
    }
}

/// Method on the wrapper or component class for a declared function
pub fn function(function: &FunctionDefinition) -> CfmlResult<MethodDecl> {
    let mut body = method_preamble();
    body.extend(statements(&function.body)?);
    Ok(context_method(&function.name, body))
}

/// Sibling class for a component declaration
pub fn component(component: &Component, name: String) -> CfmlResult<ClassDecl> {
    let members = component
        .functions
        .iter()
        .map(|f| function(f).map(Member::Method))
        .collect::<CfmlResult<Vec<_>>>()?;

    Ok(ClassDecl {
        name,
        modifiers: Vec::new(),
        extends: None,
        members,
    })
}

pub fn expression(expr: &Expression) -> CfmlResult<Expr> {
    match expr {
        Expression::IntegerLiteral { value } => Ok(Expr::IntLit { value: *value }),
        Expression::FloatLiteral { value } => Ok(Expr::DoubleLit { value: *value }),
        Expression::StringLiteral { value } => Ok(Expr::string(value)),
        Expression::BooleanLiteral { value } => Ok(Expr::BoolLit { value: *value }),

        Expression::Identifier { name, scope: None } => {
            Ok(Expr::call(find_nearby(name), "value", Vec::new()))
        }
        Expression::Identifier {
            name,
            scope: Some(scope),
        } => Ok(Expr::call(scope_target(&scope.name), "get", vec![key(name)])),

        Expression::Scope { name } => Ok(scope_target(name)),

        Expression::Binary {
            left,
            op: BinaryOperator::Concat,
            right,
        } => operator("Concat", left, right),
        Expression::Comparison { left, op, right } => operator(comparison_primitive(*op), left, right),

        Expression::ObjectAccess { context: None, .. } => Err(unsupported(NodeRef::Expression(expr))),
        Expression::ObjectAccess {
            context: Some(context),
            access,
        } => match context.as_ref() {
            Expression::Scope { name } => Ok(Expr::call(
                scope_target(name),
                "get",
                vec![member_key(access)?],
            )),
            _ => chain(expr),
        },

        Expression::ArrayAccess { context, index } => match (context.as_ref(), index.as_ref()) {
            (Expression::Scope { name }, Expression::StringLiteral { value }) => {
                Ok(Expr::call(scope_target(name), "get", vec![key(value)]))
            }
            (_, Expression::StringLiteral { .. }) => chain(expr),
            (_, index) => Ok(Expr::static_call(
                "Referencer",
                "get",
                vec![expression(context)?, dynamic_key(index)?, Expr::BoolLit { value: false }],
            )),
        },

        Expression::FunctionInvocation { name, arguments } => {
            if name.matches(CREATE_OBJECT) {
                create_object(expr, arguments)
            } else {
                Ok(Expr::call(
                    Expr::name(CONTEXT),
                    "invokeFunction",
                    vec![key(&name.name), argument_array(arguments)?],
                ))
            }
        }

        Expression::MethodInvocation {
            method_name,
            object,
            arguments,
        } => {
            let target = expression(object)?;
            let args = argument_array(arguments)?;
            if method_name.matches(CONSTRUCTOR_METHOD) {
                Ok(Expr::call(target, "invokeConstructor", vec![args]))
            } else {
                Ok(Expr::static_call(
                    "Referencer",
                    "getAndInvoke",
                    vec![target, key(&method_name.name), args, Expr::BoolLit { value: false }],
                ))
            }
        }
    }
}

fn assignment(left: &Expression, right: &Expression) -> CfmlResult<Stmt> {
    let value = expression(right)?;

    let assigned = match left {
        Expression::Identifier { name, scope: None } => Expr::call(
            Expr::call(find_nearby(name), "scope", Vec::new()),
            "assign",
            vec![key(name), value],
        ),
        Expression::Identifier {
            name,
            scope: Some(scope),
        } => put(scope_target(&scope.name), key(name), value),
        Expression::ObjectAccess {
            context: Some(context),
            access,
        } => match context.as_ref() {
            Expression::Scope { name } => put(scope_target(name), member_key(access)?, value),
            _ => set(expression(context)?, member_key(access)?, value),
        },
        Expression::ArrayAccess { context, index } => {
            let index_key = match index.as_ref() {
                Expression::StringLiteral { value: member } => key(member),
                other => dynamic_key(other)?,
            };
            match context.as_ref() {
                Expression::Scope { name } => put(scope_target(name), index_key, value),
                _ => set(expression(context)?, index_key, value),
            }
        }
        other => {
            return Err(CfmlError::unsupported(
                "Assignment",
                vec![other.kind().to_string(), right.kind().to_string()],
            ))
        }
    };

    Ok(assigned.into_stmt())
}

/// `a.b["c"].d` becomes one `Referencer.get(a, Key.of("b"), Key.of("c"), Key.of("d"), false)`
fn chain(expr: &Expression) -> CfmlResult<Expr> {
    let mut segments = Vec::new();
    let mut current = expr;

    let root = loop {
        match current {
            Expression::ObjectAccess {
                context: Some(context),
                access,
            } if !matches!(context.as_ref(), Expression::Scope { .. }) => {
                segments.push(member_key(access)?);
                current = context.as_ref();
            }
            Expression::ArrayAccess { context, index } if !matches!(context.as_ref(), Expression::Scope { .. }) => {
                match index.as_ref() {
                    Expression::StringLiteral { value } => {
                        segments.push(key(value));
                        current = context.as_ref();
                    }
                    _ => break current,
                }
            }
            _ => break current,
        }
    };

    let mut args = vec![expression(root)?];
    args.extend(segments.into_iter().rev());
    args.push(Expr::BoolLit { value: false });
    Ok(Expr::static_call("Referencer", "get", args))
}

/// Only `createObject("java", className)` has a loader primitive
fn create_object(expr: &Expression, arguments: &[Expression]) -> CfmlResult<Expr> {
    match arguments {
        [Expression::StringLiteral { value: kind }, class_name] if kind.eq_ignore_ascii_case("java") => {
            Ok(Expr::call(
                Expr::name(LOADER_LOCAL),
                "load",
                vec![Expr::name(CONTEXT), expression(class_name)?],
            ))
        }
        _ => Err(unsupported(NodeRef::Expression(expr))),
    }
}

fn operator(primitive: &str, left: &Expression, right: &Expression) -> CfmlResult<Expr> {
    Ok(Expr::static_call(
        primitive,
        "invoke",
        vec![expression(left)?, expression(right)?],
    ))
}

fn comparison_primitive(op: ComparisonOperator) -> &'static str {
    match op {
        ComparisonOperator::Equal => "EqualsEquals",
        ComparisonOperator::NotEqual => "NotEquals",
        ComparisonOperator::GreaterThan => "GreaterThan",
        ComparisonOperator::GreaterEqualsThan => "GreaterThanEqual",
        ComparisonOperator::LessThan => "LessThan",
        ComparisonOperator::LessEqualThan => "LessThanEqual",
    }
}

/// The `variables` scope is cached in a local; every other scope is looked up
fn scope_target(name: &str) -> Expr {
    if name.eq_ignore_ascii_case(VARIABLES_SCOPE) {
        Expr::name(VARIABLES_LOCAL)
    } else {
        Expr::call(Expr::name(CONTEXT), "getScopeNearby", vec![key(name)])
    }
}

fn find_nearby(name: &str) -> Expr {
    Expr::call(
        Expr::name(CONTEXT),
        "scopeFindNearby",
        vec![key(name), Expr::name(VARIABLES_LOCAL)],
    )
}

fn put(scope: Expr, key: Expr, value: Expr) -> Expr {
    Expr::call(scope, "put", vec![key, value])
}

fn set(target: Expr, key: Expr, value: Expr) -> Expr {
    Expr::static_call("Referencer", "set", vec![target, key, value])
}

fn key(name: &str) -> Expr {
    Expr::static_call("Key", "of", vec![Expr::string(name)])
}

fn dynamic_key(index: &Expression) -> CfmlResult<Expr> {
    Ok(Expr::static_call("Key", "of", vec![expression(index)?]))
}

/// Key for the accessed side of an `ObjectAccess`
fn member_key(access: &Expression) -> CfmlResult<Expr> {
    match access {
        Expression::Identifier { name, scope: None } => Ok(key(name)),
        Expression::StringLiteral { value } => Ok(key(value)),
        other => Err(unsupported(NodeRef::Expression(other))),
    }
}

fn argument_array(arguments: &[Expression]) -> CfmlResult<Expr> {
    Ok(Expr::object_array(
        arguments.iter().map(expression).collect::<CfmlResult<Vec<_>>>()?,
    ))
}

fn unsupported(node: NodeRef<'_>) -> CfmlError {
    CfmlError::unsupported(node.kind(), node.child_kinds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Reference;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Expression {
        Expression::identifier(name)
    }

    fn referencer_get(args: Vec<Expr>) -> Expr {
        let mut args = args;
        args.push(Expr::BoolLit { value: false });
        Expr::static_call("Referencer", "get", args)
    }

    fn nearby(name: &str) -> Expr {
        Expr::call(find_nearby(name), "value", Vec::new())
    }

    fn primitive(expr: &Expression) -> String {
        match expression(expr).unwrap() {
            Expr::MethodCall {
                target: Some(target),
                name,
                ..
            } if name == "invoke" => match *target {
                Expr::Name { name } => name,
                other => panic!("expected a primitive class, got {other:?}"),
            },
            other => panic!("expected a primitive invocation, got {other:?}"),
        }
    }

    #[test]
    fn test_each_operator_has_its_own_primitive() {
        let ops = [
            ComparisonOperator::Equal,
            ComparisonOperator::NotEqual,
            ComparisonOperator::GreaterThan,
            ComparisonOperator::GreaterEqualsThan,
            ComparisonOperator::LessThan,
            ComparisonOperator::LessEqualThan,
        ];

        let mut primitives: Vec<String> = ops
            .iter()
            .map(|op| {
                primitive(&Expression::Comparison {
                    left: Box::new(ident("a")),
                    op: *op,
                    right: Box::new(ident("b")),
                })
            })
            .collect();
        primitives.push(primitive(&Expression::Binary {
            left: Box::new(ident("a")),
            op: BinaryOperator::Concat,
            right: Box::new(ident("b")),
        }));

        primitives.sort_unstable();
        primitives.dedup();
        assert_eq!(
            primitives,
            vec![
                "Concat",
                "EqualsEquals",
                "GreaterThan",
                "GreaterThanEqual",
                "LessThan",
                "LessThanEqual",
                "NotEquals"
            ]
        );
    }

    #[test]
    fn test_concat_invokes_runtime_primitive() {
        let expr = Expression::Binary {
            left: Box::new(Expression::string("Hello, ")),
            op: BinaryOperator::Concat,
            right: Box::new(ident("name")),
        };

        assert_eq!(
            expression(&expr).unwrap(),
            Expr::static_call("Concat", "invoke", vec![Expr::string("Hello, "), nearby("name")])
        );
    }

    #[test]
    fn test_comparison_passes_operands_in_order() {
        let expr = Expression::Comparison {
            left: Box::new(ident("a")),
            op: ComparisonOperator::NotEqual,
            right: Box::new(Expression::IntegerLiteral { value: 3 }),
        };

        assert_eq!(
            expression(&expr).unwrap(),
            Expr::static_call("NotEquals", "invoke", vec![nearby("a"), Expr::IntLit { value: 3 }])
        );
    }

    #[test]
    fn test_variables_scope_uses_cached_local() {
        let expr = Expression::object_access(Expression::scope("variables"), ident("greeting"));
        assert_eq!(
            expression(&expr).unwrap(),
            Expr::call(Expr::name("variablesScope"), "get", vec![key("greeting")])
        );
    }

    #[test]
    fn test_scope_qualified_identifier_reads_that_scope() {
        let expr = Expression::Identifier {
            name: "user".to_string(),
            scope: Some(Reference::new("session")),
        };
        assert_eq!(
            expression(&expr).unwrap(),
            Expr::call(
                Expr::call(Expr::name("context"), "getScopeNearby", vec![key("session")]),
                "get",
                vec![key("user")]
            )
        );
    }

    #[test]
    fn test_chain_flattens_left_to_right() {
        let expr = Expression::object_access(
            Expression::object_access(
                Expression::array_access(ident("a"), Expression::string("b")),
                ident("c"),
            ),
            ident("d"),
        );
        assert_eq!(
            expression(&expr).unwrap(),
            referencer_get(vec![nearby("a"), key("b"), key("c"), key("d")])
        );
    }

    #[test]
    fn test_dynamic_index_uses_referencer() {
        let expr = Expression::array_access(ident("items"), ident("i"));
        assert_eq!(
            expression(&expr).unwrap(),
            referencer_get(vec![
                nearby("items"),
                Expr::static_call("Key", "of", vec![nearby("i")])
            ])
        );
    }

    #[test]
    fn test_dynamic_index_on_scope_reads_through_referencer() {
        let expr = Expression::array_access(Expression::scope("variables"), ident("foo"));
        assert_eq!(
            expression(&expr).unwrap(),
            referencer_get(vec![
                Expr::name("variablesScope"),
                Expr::static_call("Key", "of", vec![nearby("foo")])
            ])
        );
    }

    #[test]
    fn test_dynamic_index_on_scope_assignment_is_a_put() {
        let stmt = Statement::Assignment {
            left: Expression::array_access(Expression::scope("variables"), ident("foo")),
            right: Expression::IntegerLiteral { value: 1 },
        };
        assert_eq!(
            statement(&stmt).unwrap(),
            put(
                Expr::name("variablesScope"),
                Expr::static_call("Key", "of", vec![nearby("foo")]),
                Expr::IntLit { value: 1 }
            )
            .into_stmt()
        );
    }

    #[test]
    fn test_scope_assignment_is_a_put() {
        let stmt = Statement::Assignment {
            left: Expression::object_access(Expression::scope("variables"), ident("greeting")),
            right: Expression::string("foo"),
        };
        assert_eq!(
            statement(&stmt).unwrap(),
            put(Expr::name("variablesScope"), key("greeting"), Expr::string("foo")).into_stmt()
        );
    }

    #[test]
    fn test_local_assignment_puts_into_local_scope() {
        let stmt = Statement::Assignment {
            left: Expression::Identifier {
                name: "x".to_string(),
                scope: Some(Reference::new("local")),
            },
            right: Expression::IntegerLiteral { value: 1 },
        };
        let Stmt::Expr { expr: Expr::MethodCall { name, args, .. } } = statement(&stmt).unwrap() else {
            panic!("expected a call statement");
        };
        assert_eq!(name, "put");
        assert_eq!(args[0], key("x"));
    }

    #[test]
    fn test_unassignable_left_is_unsupported() {
        let stmt = Statement::Assignment {
            left: Expression::IntegerLiteral { value: 1 },
            right: Expression::IntegerLiteral { value: 2 },
        };
        let err = statement(&stmt).unwrap_err();
        assert!(matches!(err, CfmlError::UnsupportedConstruct { ref kind, .. } if kind == "Assignment"));
    }

    #[test]
    fn test_if_without_else_gets_empty_block() {
        let stmt = Statement::If {
            condition: Expression::BooleanLiteral { value: true },
            body: vec![Statement::ExpressionStatement {
                expression: ident("x"),
            }],
            else_body: None,
        };
        let Stmt::If {
            condition,
            then_block,
            else_block,
        } = statement(&stmt).unwrap()
        else {
            panic!("expected if");
        };

        assert_eq!(
            condition,
            Expr::static_call("BooleanCaster", "cast", vec![Expr::BoolLit { value: true }])
        );
        assert_eq!(then_block.statements.len(), 1);
        assert!(else_block.statements.is_empty());
    }

    #[test]
    fn test_create_object_java_uses_loader() {
        let expr = Expression::FunctionInvocation {
            name: Reference::new("createObject"),
            arguments: vec![Expression::string("java"), Expression::string("java.lang.System")],
        };
        assert_eq!(
            expression(&expr).unwrap(),
            Expr::call(
                Expr::name("JavaLoader"),
                "load",
                vec![Expr::name("context"), Expr::string("java.lang.System")]
            )
        );
    }

    #[test]
    fn test_create_object_component_is_unsupported() {
        let expr = Expression::FunctionInvocation {
            name: Reference::new("CreateObject"),
            arguments: vec![Expression::string("component"), Expression::string("models.User")],
        };
        let err = expression(&expr).unwrap_err();
        assert_eq!(err.kind(), "Generation Gap");
        assert!(err.message().contains("FunctionInvocation"));
    }

    #[test]
    fn test_init_invokes_constructor() {
        let expr = Expression::MethodInvocation {
            method_name: Reference::new("init"),
            object: Box::new(ident("system")),
            arguments: vec![Expression::IntegerLiteral { value: 1 }],
        };
        assert_eq!(
            expression(&expr).unwrap(),
            Expr::call(
                nearby("system"),
                "invokeConstructor",
                vec![Expr::object_array(vec![Expr::IntLit { value: 1 }])]
            )
        );
    }

    #[test]
    fn test_other_methods_resolve_and_invoke() {
        let expr = Expression::MethodInvocation {
            method_name: Reference::new("trim"),
            object: Box::new(ident("name")),
            arguments: Vec::new(),
        };
        assert_eq!(
            expression(&expr).unwrap(),
            Expr::static_call(
                "Referencer",
                "getAndInvoke",
                vec![
                    nearby("name"),
                    key("trim"),
                    Expr::object_array(Vec::new()),
                    Expr::BoolLit { value: false }
                ]
            )
        );
    }

    #[test]
    fn test_nested_function_is_unsupported() {
        let stmt = Statement::FunctionDefinition(FunctionDefinition {
            name: "inner".to_string(),
            access: None,
            return_type: None,
            parameters: Vec::new(),
            body: vec![Statement::ExpressionStatement {
                expression: ident("x"),
            }],
        });

        match statement(&stmt).unwrap_err() {
            CfmlError::UnsupportedConstruct { kind, children, .. } => {
                assert_eq!(kind, "FunctionDefinition");
                assert_eq!(children, vec!["ExpressionStatement".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_function_body_starts_with_preamble() {
        let method = function(&FunctionDefinition {
            name: "greet".to_string(),
            access: Some("public".to_string()),
            return_type: None,
            parameters: Vec::new(),
            body: Vec::new(),
        })
        .unwrap();

        assert_eq!(method.name, "greet");
        assert_eq!(method.body.statements, method_preamble());
    }
}
