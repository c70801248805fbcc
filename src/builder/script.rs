//! Script dialect builder
//!
//! Converts `script.pest` trees into the unified AST. Every rule either has
//! a conversion here or raises a construction gap naming the rule and its
//! children; nothing is skipped.

use pest::iterators::{Pair, Pairs};

use crate::ast::{
    BinaryOperator, Component, ComparisonOperator, Expression, FunctionDefinition, Parameter,
    Reference, Script, Statement,
};
use super::interpolate::interpolate;
use crate::config::CompilerOptions;
use crate::error::{CfmlError, CfmlResult, SourceLocation};
use crate::grammar::{Origin, ScriptRule as Rule};

/// Scope that local `var` declarations land in
const LOCAL_SCOPE: &str = "local";

/// Scope rendered as a `Scope` node rather than a scope-qualified identifier
const VARIABLES_SCOPE: &str = "variables";

/// Builds AST nodes from script parse trees
pub struct ScriptBuilder<'a> {
    options: &'a CompilerOptions,
    origin: Origin,
}

impl<'a> ScriptBuilder<'a> {
    pub fn new(options: &'a CompilerOptions, origin: Origin) -> Self {
        Self { options, origin }
    }

    /// Build a whole `program` tree
    pub fn build(&self, tree: Pair<'_, Rule>) -> CfmlResult<Script> {
        Ok(Script::located(self.build_located(tree)?))
    }

    /// Build the statements under a `program` or `statement_entry` tree,
    /// each paired with where it starts
    pub fn build_located(&self, tree: Pair<'_, Rule>) -> CfmlResult<Vec<(SourceLocation, Statement)>> {
        let mut statements = Vec::new();
        for pair in tree.into_inner() {
            let location = self.origin.locate_pair(&pair);
            let statement = match pair.as_rule() {
                Rule::EOI => continue,
                Rule::component => Statement::Component(self.component(pair)?),
                Rule::function => Statement::FunctionDefinition(self.function(pair)?),
                _ => self.statement(pair)?,
            };
            statements.push((location, statement));
        }
        Ok(statements)
    }

    /// Build the single expression under a `condition_entry` tree
    pub fn build_condition(&self, tree: Pair<'_, Rule>) -> CfmlResult<Expression> {
        let gap = self.gap(&tree);
        let expr = significant(tree.into_inner())
            .find(|p| p.as_rule() != Rule::EOI)
            .ok_or(gap)?;
        self.expression(expr)
    }

    // ===== Declarations =====

    fn component(&self, pair: Pair<'_, Rule>) -> CfmlResult<Component> {
        let mut identifier = None;
        let mut display_name = None;
        let mut functions = Vec::new();

        for child in significant(pair.into_inner()) {
            match child.as_rule() {
                Rule::component_modifier => {}
                Rule::attribute => {
                    let (name, value) = self.attribute(child)?;
                    if name.eq_ignore_ascii_case("name") {
                        identifier = Some(value);
                    } else if name.eq_ignore_ascii_case("displayname") {
                        display_name = Some(value);
                    }
                }
                Rule::function => functions.push(self.function(child)?),
                _ => return Err(self.gap(&child)),
            }
        }

        Ok(Component {
            identifier: identifier.or(display_name),
            functions,
        })
    }

    fn function(&self, pair: Pair<'_, Rule>) -> CfmlResult<FunctionDefinition> {
        let gap = self.gap(&pair);
        let mut access = None;
        let mut return_type = None;
        let mut name = None;
        let mut parameters = Vec::new();
        let mut body = None;

        for child in significant(pair.into_inner()) {
            match child.as_rule() {
                Rule::access_modifier => access = Some(child.as_str().to_lowercase()),
                Rule::return_type => return_type = Some(child.as_str().to_string()),
                Rule::identifier_name => name = Some(child.as_str().to_string()),
                Rule::parameter => parameters.push(self.parameter(child)?),
                Rule::attribute => {}
                Rule::block => body = Some(self.block(child)?),
                _ => return Err(self.gap(&child)),
            }
        }

        Ok(FunctionDefinition {
            name: name.ok_or_else(|| gap.clone())?,
            access,
            return_type,
            parameters,
            body: body.ok_or(gap)?,
        })
    }

    fn parameter(&self, pair: Pair<'_, Rule>) -> CfmlResult<Parameter> {
        let gap = self.gap(&pair);
        let mut required = false;
        let mut type_name = None;
        let mut name = None;
        let mut default = None;

        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::kw_required => required = true,
                Rule::parameter_type => type_name = Some(child.as_str().to_string()),
                Rule::identifier => name = Some(child.as_str().to_string()),
                Rule::expression => default = Some(self.expression(child)?),
                _ => return Err(self.gap(&child)),
            }
        }

        Ok(Parameter {
            name: name.ok_or(gap)?,
            type_name,
            required,
            default,
        })
    }

    fn attribute(&self, pair: Pair<'_, Rule>) -> CfmlResult<(String, String)> {
        let gap = self.gap(&pair);
        let mut inner = pair.into_inner();
        let (Some(name), Some(value)) = (inner.next(), inner.next()) else {
            return Err(gap);
        };
        let value = match value.as_rule() {
            Rule::string => string_value(value),
            _ => value.as_str().to_string(),
        };
        Ok((name.as_str().to_string(), value))
    }

    fn block(&self, pair: Pair<'_, Rule>) -> CfmlResult<Vec<Statement>> {
        let mut statements = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::function => {
                    statements.push(Statement::FunctionDefinition(self.function(child)?))
                }
                _ => statements.push(self.statement(child)?),
            }
        }
        Ok(statements)
    }

    // ===== Statements =====

    fn statement(&self, pair: Pair<'_, Rule>) -> CfmlResult<Statement> {
        match pair.as_rule() {
            Rule::if_statement => self.if_statement(pair),
            Rule::var_declaration => self.var_declaration(pair),
            Rule::assignment => {
                let gap = self.gap(&pair);
                let mut inner = pair.into_inner();
                let (Some(left), Some(right)) = (inner.next(), inner.next()) else {
                    return Err(gap);
                };
                Ok(Statement::Assignment {
                    left: self.expression(left)?,
                    right: self.expression(right)?,
                })
            }
            Rule::expression_statement => {
                let gap = self.gap(&pair);
                let expr = pair.into_inner().next().ok_or(gap)?;
                Ok(Statement::ExpressionStatement {
                    expression: self.expression(expr)?,
                })
            }
            _ => Err(self.gap(&pair)),
        }
    }

    fn if_statement(&self, pair: Pair<'_, Rule>) -> CfmlResult<Statement> {
        let gap = self.gap(&pair);
        let mut inner = significant(pair.into_inner());
        let (Some(condition), Some(branch)) = (inner.next(), inner.next()) else {
            return Err(gap);
        };

        let else_body = match inner.next() {
            Some(clause) if clause.as_rule() == Rule::else_clause => {
                let gap = self.gap(&clause);
                let branch = significant(clause.into_inner()).next().ok_or(gap)?;
                Some(self.branch(branch)?)
            }
            Some(other) => return Err(self.gap(&other)),
            None => None,
        };

        Ok(Statement::If {
            condition: self.expression(condition)?,
            body: self.branch(branch)?,
            else_body,
        })
    }

    fn branch(&self, pair: Pair<'_, Rule>) -> CfmlResult<Vec<Statement>> {
        match pair.as_rule() {
            Rule::block => self.block(pair),
            _ => Ok(vec![self.statement(pair)?]),
        }
    }

    fn var_declaration(&self, pair: Pair<'_, Rule>) -> CfmlResult<Statement> {
        let gap = self.gap(&pair);
        let mut inner = significant(pair.into_inner());
        let (Some(name), Some(value)) = (inner.next(), inner.next()) else {
            return Err(gap);
        };

        Ok(Statement::Assignment {
            left: Expression::Identifier {
                name: name.as_str().to_string(),
                scope: Some(Reference::new(LOCAL_SCOPE)),
            },
            right: self.expression(value)?,
        })
    }

    // ===== Expressions =====

    fn expression(&self, pair: Pair<'_, Rule>) -> CfmlResult<Expression> {
        match pair.as_rule() {
            Rule::expression | Rule::parenthesized => {
                let gap = self.gap(&pair);
                self.expression(pair.into_inner().next().ok_or(gap)?)
            }
            Rule::comparison => self.comparison(pair),
            Rule::concatenation => self.concatenation(pair),
            Rule::additive | Rule::multiplicative => {
                let gap = self.gap(&pair);
                let mut inner = pair.into_inner();
                match (inner.next(), inner.next()) {
                    (Some(only), None) => self.expression(only),
                    _ => Err(gap),
                }
            }
            Rule::postfix => self.postfix(pair),
            Rule::integer => pair
                .as_str()
                .parse()
                .map(|value| Expression::IntegerLiteral { value })
                .map_err(|_| self.gap(&pair)),
            Rule::float => pair
                .as_str()
                .parse()
                .map(|value| Expression::FloatLiteral { value })
                .map_err(|_| self.gap(&pair)),
            Rule::string => self.string(pair),
            Rule::boolean => Ok(Expression::BooleanLiteral {
                value: pair.as_str().eq_ignore_ascii_case("true"),
            }),
            Rule::identifier => Ok(Expression::identifier(pair.as_str())),
            _ => Err(self.gap(&pair)),
        }
    }

    fn string(&self, pair: Pair<'_, Rule>) -> CfmlResult<Expression> {
        let origin = match pair.clone().into_inner().next() {
            Some(body) => {
                let (line, column) = body.as_span().start_pos().line_col();
                self.origin.nested(line, column)
            }
            None => self.origin.clone(),
        };
        interpolate(&string_value(pair), self.options, &origin)
    }

    fn comparison(&self, pair: Pair<'_, Rule>) -> CfmlResult<Expression> {
        let gap = self.gap(&pair);
        let mut inner = pair.into_inner();
        let left = inner.next().ok_or_else(|| gap.clone())?;
        let Some(op) = inner.next() else {
            return self.expression(left);
        };
        let right = inner.next().ok_or_else(|| gap.clone())?;

        let op = match op.as_rule() {
            Rule::equal => ComparisonOperator::Equal,
            Rule::not_equal => ComparisonOperator::NotEqual,
            Rule::greater => ComparisonOperator::GreaterThan,
            Rule::greater_equal => ComparisonOperator::GreaterEqualsThan,
            Rule::less => ComparisonOperator::LessThan,
            Rule::less_equal => ComparisonOperator::LessEqualThan,
            _ => return Err(gap),
        };

        Ok(Expression::Comparison {
            left: Box::new(self.expression(left)?),
            op,
            right: Box::new(self.expression(right)?),
        })
    }

    fn concatenation(&self, pair: Pair<'_, Rule>) -> CfmlResult<Expression> {
        let gap = self.gap(&pair);
        let mut inner = pair.into_inner().filter(|p| p.as_rule() != Rule::concat);
        let mut result = self.expression(inner.next().ok_or(gap)?)?;

        for operand in inner {
            result = Expression::Binary {
                left: Box::new(result),
                op: BinaryOperator::Concat,
                right: Box::new(self.expression(operand)?),
            };
        }

        Ok(result)
    }

    /// Access chains nest left to right: `a.b.c` is `(a.b).c`
    fn postfix(&self, pair: Pair<'_, Rule>) -> CfmlResult<Expression> {
        let gap = self.gap(&pair);
        let mut parts = pair.into_inner().peekable();
        let primary = parts.next().ok_or_else(|| gap.clone())?;

        let mut current = if primary.as_rule() == Rule::identifier
            && self.options.is_scope(primary.as_str())
            && !matches!(parts.peek().map(|p| p.as_rule()), Some(Rule::call_arguments))
        {
            let scope = primary.as_str();
            let qualified_member = match parts.peek() {
                Some(next) if !scope.eq_ignore_ascii_case(VARIABLES_SCOPE) => {
                    next.as_rule() == Rule::member_access
                }
                _ => false,
            };

            if qualified_member {
                let member = parts.next().ok_or_else(|| gap.clone())?;
                if matches!(parts.peek().map(|p| p.as_rule()), Some(Rule::call_arguments)) {
                    let arguments = self.arguments(parts.next().ok_or_else(|| gap.clone())?)?;
                    Expression::MethodInvocation {
                        method_name: Reference::new(member_name(&member)),
                        object: Box::new(Expression::scope(scope.to_lowercase())),
                        arguments,
                    }
                } else {
                    Expression::Identifier {
                        name: member_name(&member),
                        scope: Some(Reference::new(scope.to_lowercase())),
                    }
                }
            } else {
                Expression::scope(scope.to_lowercase())
            }
        } else {
            self.expression(primary)?
        };

        while let Some(op) = parts.next() {
            current = match op.as_rule() {
                Rule::member_access => {
                    let name = member_name(&op);
                    if matches!(parts.peek().map(|p| p.as_rule()), Some(Rule::call_arguments)) {
                        let arguments = self.arguments(parts.next().ok_or_else(|| gap.clone())?)?;
                        Expression::MethodInvocation {
                            method_name: Reference::new(name),
                            object: Box::new(current),
                            arguments,
                        }
                    } else if current.is_well_rooted() {
                        Expression::object_access(current, Expression::identifier(name))
                    } else {
                        return Err(self.gap(&op));
                    }
                }
                Rule::index_access => {
                    if !current.is_well_rooted() {
                        return Err(self.gap(&op));
                    }
                    let index_gap = self.gap(&op);
                    let index = self.expression(op.into_inner().next().ok_or(index_gap)?)?;
                    match index {
                        Expression::StringLiteral { .. } => Expression::object_access(current, index),
                        _ => Expression::array_access(current, index),
                    }
                }
                Rule::call_arguments => match current {
                    Expression::Identifier { name, scope: None } => Expression::FunctionInvocation {
                        name: Reference::new(name),
                        arguments: self.arguments(op)?,
                    },
                    _ => return Err(self.gap(&op)),
                },
                _ => return Err(self.gap(&op)),
            };
        }

        Ok(current)
    }

    fn arguments(&self, pair: Pair<'_, Rule>) -> CfmlResult<Vec<Expression>> {
        pair.into_inner().map(|arg| self.expression(arg)).collect()
    }

    fn gap(&self, pair: &Pair<'_, Rule>) -> CfmlError {
        CfmlError::construction_gap(
            format!("{:?}", pair.as_rule()),
            pair.clone()
                .into_inner()
                .map(|child| format!("{:?}", child.as_rule()))
                .collect(),
            Some(self.origin.locate_pair(pair)),
        )
    }
}

/// Children without keyword tokens
fn significant<'i>(pairs: Pairs<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pairs.filter(|p| {
        !matches!(
            p.as_rule(),
            Rule::kw_component
                | Rule::kw_function
                | Rule::kw_if
                | Rule::kw_else
                | Rule::kw_var
                | Rule::kw_while
                | Rule::kw_return
        )
    })
}

fn member_name(pair: &Pair<'_, Rule>) -> String {
    pair.clone()
        .into_inner()
        .next()
        .map(|name| name.as_str().to_string())
        .unwrap_or_default()
}

/// Literal value of a `string` pair with doubled quotes collapsed
fn string_value(pair: Pair<'_, Rule>) -> String {
    let quote = if pair.as_str().starts_with('\'') { "'" } else { "\"" };
    let raw = pair
        .into_inner()
        .next()
        .map(|inner| inner.as_str())
        .unwrap_or_default();
    raw.replace(&quote.repeat(2), quote)
}
