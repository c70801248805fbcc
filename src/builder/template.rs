//! Tag dialect builder
//!
//! Walks `template.pest` element trees. Script islands (`<cfscript>`
//! bodies, `<cfset>` statements, `<cfif>` conditions) are parsed with the
//! script grammar and handed to `ScriptBuilder`, and their statements are
//! spliced in place. Text inside `<cfoutput>` is interpolated.

use std::cell::Cell;

use pest::iterators::{Pair, Pairs};
use tracing::trace;

use super::interpolate::interpolate;
use super::script::ScriptBuilder;
use crate::ast::{
    Component, Expression, FunctionDefinition, Parameter, Reference, Script, Statement,
};
use crate::config::CompilerOptions;
use crate::error::{CfmlError, CfmlResult, SourceLocation};
use crate::grammar::{parse_rule, Origin, ScriptParser, ScriptRule, TemplateRule as Rule};

/// Function that receives literal template text
const OUTPUT_FUNCTION: &str = "writeOutput";

/// A statement and where it starts
type Located = (SourceLocation, Statement);

/// Builds AST nodes from template parse trees
pub struct TemplateBuilder<'a> {
    options: &'a CompilerOptions,
    origin: Origin,
    /// Number of enclosing `<cfoutput>` elements
    output_depth: Cell<usize>,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(options: &'a CompilerOptions, origin: Origin) -> Self {
        Self {
            options,
            origin,
            output_depth: Cell::new(0),
        }
    }

    /// Build a whole `template` tree
    pub fn build(&self, tree: Pair<'_, Rule>) -> CfmlResult<Script> {
        let mut statements = Vec::new();
        for pair in tree.into_inner() {
            self.node(pair, &mut statements)?;
        }
        Ok(Script::located(statements))
    }

    fn nodes(&self, pairs: Pairs<'_, Rule>) -> CfmlResult<Vec<Statement>> {
        let mut statements = Vec::new();
        for pair in pairs {
            self.node(pair, &mut statements)?;
        }
        Ok(statements.into_iter().map(|(_, statement)| statement).collect())
    }

    fn node(&self, pair: Pair<'_, Rule>, out: &mut Vec<Located>) -> CfmlResult<()> {
        let location = self.origin.locate_pair(&pair);
        match pair.as_rule() {
            Rule::EOI | Rule::comment => {}
            Rule::text => {
                if !pair.as_str().trim().is_empty() {
                    out.push((location, output(self.text(&pair)?)));
                }
            }
            Rule::script_block => {
                let gap = self.gap(&pair);
                let body = pair.into_inner().next().ok_or(gap)?;
                out.extend(self.script_island(&body, ScriptRule::program)?);
            }
            Rule::set_tag => {
                let gap = self.gap(&pair);
                let expr = pair.into_inner().next().ok_or(gap)?;
                out.extend(self.script_island(&expr, ScriptRule::statement_entry)?);
            }
            Rule::if_tag => out.push((location, self.if_tag(pair)?)),
            Rule::element => self.element(pair, out)?,
            _ => return Err(self.gap(&pair)),
        }
        Ok(())
    }

    /// Literal text, or its interpolation inside `<cfoutput>`
    fn text(&self, pair: &Pair<'_, Rule>) -> CfmlResult<Expression> {
        if self.output_depth.get() == 0 {
            return Ok(Expression::string(pair.as_str()));
        }
        let (line, column) = pair.as_span().start_pos().line_col();
        interpolate(pair.as_str(), self.options, &self.origin.nested(line, column))
    }

    // ===== Script islands =====

    fn script_island(&self, pair: &Pair<'_, Rule>, rule: ScriptRule) -> CfmlResult<Vec<Located>> {
        let (line, column) = pair.as_span().start_pos().line_col();
        let origin = self.origin.nested(line, column);
        trace!(line, column, ?rule, "parsing script island");

        let result = parse_rule::<ScriptParser>(rule, pair.as_str(), &origin);
        let (tree, issues) = result.into_parts();
        if !issues.is_empty() {
            return Err(CfmlError::parse_failure(issues));
        }
        let tree = tree.ok_or_else(|| self.gap(pair))?;

        ScriptBuilder::new(self.options, origin).build_located(tree)
    }

    fn condition(&self, pair: &Pair<'_, Rule>) -> CfmlResult<Expression> {
        let (line, column) = pair.as_span().start_pos().line_col();
        let origin = self.origin.nested(line, column);

        let result = parse_rule::<ScriptParser>(ScriptRule::condition_entry, pair.as_str(), &origin);
        let (tree, issues) = result.into_parts();
        if !issues.is_empty() {
            return Err(CfmlError::parse_failure(issues));
        }
        let tree = tree.ok_or_else(|| self.gap(pair))?;

        ScriptBuilder::new(self.options, origin).build_condition(tree)
    }

    // ===== Conditionals =====

    /// `<cfelseif>` arms nest inside the else body of the preceding arm
    fn if_tag(&self, pair: Pair<'_, Rule>) -> CfmlResult<Statement> {
        let gap = self.gap(&pair);
        let mut arms = Vec::new();
        let mut else_body = None;
        let mut inner = pair.into_inner();

        let condition = inner.next().ok_or_else(|| gap.clone())?;
        let body = inner.next().ok_or_else(|| gap.clone())?;
        arms.push((self.condition(&condition)?, self.nodes(body.into_inner())?));

        for clause in inner {
            match clause.as_rule() {
                Rule::elseif_clause => {
                    let mut parts = clause.into_inner();
                    let (Some(condition), Some(body)) = (parts.next(), parts.next()) else {
                        return Err(gap);
                    };
                    arms.push((self.condition(&condition)?, self.nodes(body.into_inner())?));
                }
                Rule::else_clause => {
                    let body = clause.into_inner().next().ok_or_else(|| gap.clone())?;
                    else_body = Some(self.nodes(body.into_inner())?);
                }
                _ => return Err(self.gap(&clause)),
            }
        }

        let mut tail = else_body;
        let mut statement = None;
        for (condition, body) in arms.into_iter().rev() {
            let current = Statement::If {
                condition,
                body,
                else_body: tail.take(),
            };
            tail = Some(vec![current.clone()]);
            statement = Some(current);
        }

        statement.ok_or(gap)
    }

    // ===== Elements =====

    fn element(&self, pair: Pair<'_, Rule>, out: &mut Vec<Located>) -> CfmlResult<()> {
        let gap = self.gap(&pair);
        let location = self.origin.locate_pair(&pair);
        let mut inner = pair.clone().into_inner();
        let (Some(name), Some(attributes), Some(children)) = (inner.next(), inner.next(), inner.next())
        else {
            return Err(gap);
        };
        let attributes = attribute_list(attributes);

        match name.as_str().to_lowercase().as_str() {
            "cfcomponent" => {
                let component = self.component(&attributes, children)?;
                out.push((location, Statement::Component(component)));
            }
            "cffunction" => {
                let function = self.function(&pair, &attributes, children)?;
                out.push((location, Statement::FunctionDefinition(function)));
            }
            "cfoutput" => {
                self.output_depth.set(self.output_depth.get() + 1);
                let built = children
                    .into_inner()
                    .try_for_each(|child| self.node(child, out));
                self.output_depth.set(self.output_depth.get() - 1);
                built?;
            }
            _ => return Err(gap),
        }
        Ok(())
    }

    fn component(&self, attributes: &[(String, String)], children: Pair<'_, Rule>) -> CfmlResult<Component> {
        let mut functions = Vec::new();

        for statement in self.nodes(children.into_inner())? {
            match statement {
                Statement::FunctionDefinition(function) => functions.push(function),
                other => {
                    return Err(CfmlError::construction_gap(
                        "cfcomponent",
                        vec![other.kind().to_string()],
                        None,
                    ))
                }
            }
        }

        Ok(Component {
            identifier: attribute(attributes, "name")
                .or_else(|| attribute(attributes, "displayname"))
                .map(str::to_string),
            functions,
        })
    }

    fn function(
        &self,
        element: &Pair<'_, Rule>,
        attributes: &[(String, String)],
        children: Pair<'_, Rule>,
    ) -> CfmlResult<FunctionDefinition> {
        let name = attribute(attributes, "name").ok_or_else(|| self.gap(element))?;
        let mut parameters = Vec::new();
        let mut body = Vec::new();

        for child in children.into_inner() {
            if child.as_rule() == Rule::void_tag && tag_name(&child).eq_ignore_ascii_case("cfargument") {
                parameters.push(self.argument(&child)?);
            } else {
                self.node(child, &mut body)?;
            }
        }

        Ok(FunctionDefinition {
            name: name.to_string(),
            access: attribute(attributes, "access").map(str::to_lowercase),
            return_type: attribute(attributes, "returntype").map(str::to_string),
            parameters,
            body: body.into_iter().map(|(_, statement)| statement).collect(),
        })
    }

    fn argument(&self, pair: &Pair<'_, Rule>) -> CfmlResult<Parameter> {
        let attributes = pair
            .clone()
            .into_inner()
            .find(|p| p.as_rule() == Rule::attributes)
            .map(attribute_list)
            .unwrap_or_default();
        let name = attribute(&attributes, "name").ok_or_else(|| self.gap(pair))?;

        Ok(Parameter {
            name: name.to_string(),
            type_name: attribute(&attributes, "type").map(str::to_string),
            required: attribute(&attributes, "required").is_some_and(is_truthy),
            default: attribute(&attributes, "default").map(Expression::string),
        })
    }

    fn gap(&self, pair: &Pair<'_, Rule>) -> CfmlError {
        let kind = match pair.as_rule() {
            Rule::element | Rule::void_tag => format!("<{}>", tag_name(pair).to_lowercase()),
            rule => format!("{:?}", rule),
        };
        CfmlError::construction_gap(
            kind,
            pair.clone()
                .into_inner()
                .map(|child| format!("{:?}", child.as_rule()))
                .collect(),
            Some(self.origin.locate_pair(pair)),
        )
    }
}

/// Template text becomes a call to the output function
fn output(text: Expression) -> Statement {
    Statement::ExpressionStatement {
        expression: Expression::FunctionInvocation {
            name: Reference::new(OUTPUT_FUNCTION),
            arguments: vec![text],
        },
    }
}

fn tag_name<'i>(pair: &Pair<'i, Rule>) -> &'i str {
    pair.clone()
        .into_inner()
        .find(|p| matches!(p.as_rule(), Rule::tag_name | Rule::void_name))
        .map(|p| p.as_str())
        .unwrap_or_default()
}

/// Attribute names lower-cased, values with doubled quotes collapsed
fn attribute_list(pair: Pair<'_, Rule>) -> Vec<(String, String)> {
    pair.into_inner()
        .filter_map(|attribute| {
            let mut inner = attribute.into_inner();
            let name = inner.next()?.as_str().to_lowercase();
            let value = inner.next()?;
            let quote = if value.as_str().starts_with('\'') { "'" } else { "\"" };
            let raw = value.into_inner().next().map(|v| v.as_str()).unwrap_or_default();
            Some((name, raw.replace(&quote.repeat(2), quote)))
        })
        .collect()
}

fn attribute<'v>(attributes: &'v [(String, String)], name: &str) -> Option<&'v str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "yes" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, ComparisonOperator};
    use crate::grammar::{parse_unit, TemplateParser};
    use pretty_assertions::assert_eq;

    fn written(text: &str) -> Statement {
        output(Expression::string(text))
    }

    fn build(source: &str) -> CfmlResult<Script> {
        let options = CompilerOptions::default();
        let origin = Origin::new(Some("page.cfm"));
        let result = parse_unit::<TemplateParser>(source, &origin);
        assert!(result.is_correct(), "issues: {:?}", result.issues());
        let tree = result.tree().cloned().unwrap();
        TemplateBuilder::new(&options, origin).build(tree)
    }

    #[test]
    fn test_text_and_set() {
        let script = build("<p>Hello</p>\n<cfset variables.greeting = \"foo\">").unwrap();
        assert_eq!(
            script.statements,
            vec![
                written("<p>Hello</p>\n"),
                Statement::Assignment {
                    left: Expression::object_access(
                        Expression::scope("variables"),
                        Expression::identifier("greeting")
                    ),
                    right: Expression::string("foo"),
                },
            ]
        );
    }

    #[test]
    fn test_component_with_tag_and_script_functions() {
        let source = r#"<cfcomponent name="Capture">
    <cffunction name="configure" returntype="void" access="public">
        <cfargument name="path" type="string" required="true">
        <cfset variables.path = path>
    </cffunction>
    <cfscript>
        function beginCapture() {}
        function endCapture() {}
    </cfscript>
</cfcomponent>"#;
        let script = build(source).unwrap();

        let Statement::Component(component) = &script.statements[0] else {
            panic!("expected component");
        };
        assert_eq!(component.identifier.as_deref(), Some("Capture"));
        let names: Vec<&str> = component.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["configure", "beginCapture", "endCapture"]);

        let configure = &component.functions[0];
        assert_eq!(configure.return_type.as_deref(), Some("void"));
        assert_eq!(configure.access.as_deref(), Some("public"));
        assert_eq!(configure.parameters.len(), 1);
        assert!(configure.parameters[0].required);
        assert_eq!(configure.body.len(), 1);
    }

    #[test]
    fn test_component_identifier_falls_back_to_displayname() {
        let script = build("<CFCOMPONENT displayname=\"Widget\"></CFCOMPONENT>").unwrap();
        assert_eq!(
            script.statements,
            vec![Statement::Component(Component {
                identifier: Some("Widget".to_string()),
                functions: Vec::new(),
            })]
        );
    }

    #[test]
    fn test_script_block_statements_are_spliced_in_place() {
        let script = build("a<cfscript>x = 1; y = 2;</cfscript>b").unwrap();
        let kinds: Vec<&str> = script.statements.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec!["ExpressionStatement", "Assignment", "Assignment", "ExpressionStatement"]
        );
    }

    #[test]
    fn test_if_elseif_else_chain() {
        let script = build("<cfif a gt 1>big<cfelseif a eq 1>one<cfelse>small</cfif>").unwrap();

        let Statement::If { condition, body, else_body } = &script.statements[0] else {
            panic!("expected if");
        };
        assert!(matches!(
            condition,
            Expression::Comparison { op: ComparisonOperator::GreaterThan, .. }
        ));
        assert_eq!(body, &vec![written("big")]);

        let nested = else_body.as_ref().unwrap();
        let Statement::If { body, else_body, .. } = &nested[0] else {
            panic!("expected nested if");
        };
        assert_eq!(body, &vec![written("one")]);
        assert_eq!(else_body, &Some(vec![written("small")]));
    }

    #[test]
    fn test_output_interpolates_expressions() {
        let script = build("<cfoutput>Hi #name#!</cfoutput>").unwrap();
        assert_eq!(
            script.statements,
            vec![output(Expression::Binary {
                left: Box::new(Expression::Binary {
                    left: Box::new(Expression::string("Hi ")),
                    op: BinaryOperator::Concat,
                    right: Box::new(Expression::identifier("name")),
                }),
                op: BinaryOperator::Concat,
                right: Box::new(Expression::string("!")),
            })]
        );
    }

    #[test]
    fn test_output_is_transparent_to_nested_tags() {
        let script = build("<cfoutput><cfif ok>#variables.count#</cfif></cfoutput>").unwrap();
        let Statement::If { body, .. } = &script.statements[0] else {
            panic!("expected if");
        };
        assert_eq!(
            body,
            &vec![output(Expression::object_access(
                Expression::scope("variables"),
                Expression::identifier("count")
            ))]
        );
    }

    #[test]
    fn test_text_outside_output_is_not_interpolated() {
        let script = build("<p>#name#</p>").unwrap();
        assert_eq!(script.statements, vec![written("<p>#name#</p>")]);
    }

    #[test]
    fn test_unterminated_mark_in_output_is_located() {
        let err = build("<cfoutput>\n  #oops</cfoutput>").unwrap_err();
        let location = err.location().unwrap();
        assert_eq!((location.line, location.column), (2, 3));
        assert_eq!(location.filename.as_deref(), Some("page.cfm"));
    }

    #[test]
    fn test_top_level_statements_record_positions() {
        let script = build("<p>Hi</p>\n<cfscript>\n  x = 1;\n</cfscript>\n<cfset y = 2>").unwrap();
        let positions: Vec<(usize, usize)> = script
            .spans
            .iter()
            .map(|span| (span.line, span.column))
            .collect();
        assert_eq!(positions, vec![(1, 1), (3, 3), (5, 8)]);
    }

    #[test]
    fn test_unknown_tag_is_construction_gap() {
        let err = build("<cfloop from=\"1\" to=\"3\" index=\"i\">x</cfloop>").unwrap_err();
        match err {
            CfmlError::ConstructionGap { kind, children, .. } => {
                assert_eq!(kind, "<cfloop>");
                assert_eq!(
                    children,
                    vec!["tag_name".to_string(), "attributes".to_string(), "children".to_string()]
                );
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_script_island_issue_is_located_in_file() {
        let err = build("line one\n<cfscript>\nx = 1;\n@@@\n</cfscript>").unwrap_err();
        match err {
            CfmlError::ParseFailure { issues } => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].location.line, 4);
                assert_eq!(issues[0].location.filename.as_deref(), Some("page.cfm"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
