//! Compilation pipeline
//!
//! Drives one source unit through detection, parsing, AST construction,
//! optional reference resolution and code generation. Any failure aborts
//! that unit; nothing is carried over between units except the dialect
//! cache.

use tracing::{debug, info, warn};

use crate::ast::{resolve, Environment, Script};
use crate::builder::{ScriptBuilder, TemplateBuilder};
use crate::codegen::{CompilationUnit, Generator};
use crate::config::CompilerOptions;
use crate::detect::{Dialect, DialectDetector, SourceUnit};
use crate::error::{CfmlError, CfmlResult, Issue};
use crate::grammar::{parse_unit, Origin, ScriptParser, TemplateParser};

/// Front end for one or more source units
pub struct Compiler {
    options: CompilerOptions,
    detector: DialectDetector,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            detector: DialectDetector::new(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Dialect of `unit`, cached across calls
    pub fn classify(&mut self, unit: &SourceUnit) -> CfmlResult<Dialect> {
        self.detector.classify(unit)
    }

    /// Classify, parse and build the unified AST
    pub fn parse(&mut self, unit: &SourceUnit) -> CfmlResult<Script> {
        let dialect = self.classify(unit)?;
        let script = self.build_ast(unit, dialect)?;

        if self.options.resolve_references {
            let env = Environment::from_options(&self.options);
            let resolution = resolve(&script, &env)?;
            debug!(unit = %unit.display_name(), references = resolution.len(), "references resolved");
        }

        Ok(script)
    }

    /// Parse `unit` as `dialect` and build its AST
    pub fn build_ast(&self, unit: &SourceUnit, dialect: Dialect) -> CfmlResult<Script> {
        let filename = unit.identity().map(|_| unit.display_name());
        let origin = Origin::new(filename.as_deref());

        match dialect {
            Dialect::ScriptBased => {
                let (tree, issues) = parse_unit::<ScriptParser>(unit.text(), &origin).into_parts();
                check_issues(unit, issues)?;
                match tree {
                    Some(tree) => ScriptBuilder::new(&self.options, origin).build(tree),
                    None => Ok(Script::default()),
                }
            }
            Dialect::TagBased => {
                let (tree, issues) = parse_unit::<TemplateParser>(unit.text(), &origin).into_parts();
                check_issues(unit, issues)?;
                match tree {
                    Some(tree) => TemplateBuilder::new(&self.options, origin).build(tree),
                    None => Ok(Script::default()),
                }
            }
        }
    }

    /// Run the whole pipeline on one unit
    pub fn compile(&mut self, unit: &SourceUnit) -> CfmlResult<CompilationUnit> {
        let script = self.parse(unit)?;
        let target = Generator::new(&self.options).generate(unit, &script)?;

        info!(
            unit = %unit.display_name(),
            class = %target.types.first().map(|c| c.name.as_str()).unwrap_or_default(),
            "compiled"
        );
        Ok(target)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}

fn check_issues(unit: &SourceUnit, issues: Vec<Issue>) -> CfmlResult<()> {
    if issues.is_empty() {
        return Ok(());
    }
    for issue in &issues {
        warn!(unit = %unit.display_name(), "{}", issue);
    }
    Err(CfmlError::parse_failure(issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, Statement};
    use crate::codegen::{Expr, Stmt, ENTRY_METHOD};
    use pretty_assertions::assert_eq;

    fn entry_body(target: &CompilationUnit) -> &[Stmt] {
        &target.types[0].method(ENTRY_METHOD).unwrap().body.statements
    }

    #[test]
    fn test_compile_tag_template() {
        let unit = SourceUnit::from_string(
            "<cfset variables.greeting = \"foo\">\n<cfif greeting eq \"foo\">Hello</cfif>\n",
        )
        .with_identity("/site/HelloWorld.cfm");

        let target = Compiler::default().compile(&unit).unwrap();

        assert_eq!(target.types[0].name, "HelloWorld$cfm");
        assert_eq!(target.package, "site");

        let body = entry_body(&target);
        assert_eq!(
            body[2],
            Expr::call(
                Expr::name("variablesScope"),
                "put",
                vec![
                    Expr::static_call("Key", "of", vec![Expr::string("greeting")]),
                    Expr::string("foo")
                ]
            )
            .into_stmt()
        );
        assert!(matches!(body[3], Stmt::If { .. }));
    }

    #[test]
    fn test_compile_script_component() {
        let source = r#"
            component name="Greeter" {
                function hello() {
                    writeOutput("hi");
                }
                function bye() {
                    writeOutput("bye");
                }
            }
        "#;
        let unit = SourceUnit::from_string(source).with_identity("/app/Greeter.cfc");

        let mut compiler = Compiler::default();
        assert_eq!(compiler.classify(&unit).unwrap(), Dialect::ScriptBased);

        let target = compiler.compile(&unit).unwrap();
        let names: Vec<&str> = target.types.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Greeter$cfc", "Greeter"]);
        assert_eq!(target.types[1].methods().count(), 2);
    }

    #[test]
    fn test_parse_returns_unified_ast() {
        let unit = SourceUnit::from_string("x = 1;").with_identity("snippet.cfs");
        let script = Compiler::default().parse(&unit).unwrap();

        assert_eq!(
            script.statements,
            vec![Statement::Assignment {
                left: Expression::identifier("x"),
                right: Expression::IntegerLiteral { value: 1 },
            }]
        );
    }

    #[test]
    fn test_parse_issues_fail_the_unit() {
        let unit = SourceUnit::from_string("x = 1;\n@@ nonsense\n").with_identity("broken.cfs");
        let err = Compiler::default().compile(&unit).unwrap_err();

        match err {
            CfmlError::ParseFailure { issues } => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].location.line, 2);
                assert_eq!(issues[0].location.filename.as_deref(), Some("broken.cfs"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_unit_cannot_be_classified() {
        let err = Compiler::default()
            .compile(&SourceUnit::from_string("   \n"))
            .unwrap_err();
        assert!(matches!(err, CfmlError::ClassificationFailure { .. }));
    }

    #[test]
    fn test_resolution_rejects_unknown_functions() {
        let options = CompilerOptions {
            resolve_references: true,
            ..CompilerOptions::default()
        };
        let unit = SourceUnit::from_string("x = 1;\nmissing();").with_identity("calls.cfs");

        let err = Compiler::new(options).compile(&unit).unwrap_err();
        assert!(matches!(
            err,
            CfmlError::UnresolvedReference { ref handle, .. } if handle == "missing"
        ));
        assert_eq!(err.location().map(|l| l.line), Some(2));
    }

    #[test]
    fn test_resolution_off_by_default() {
        let unit = SourceUnit::from_string("missing();").with_identity("calls.cfs");
        let target = Compiler::default().compile(&unit).unwrap();
        assert_eq!(entry_body(&target).len(), 3);
    }

    #[test]
    fn test_construction_gap_aborts_unit() {
        let unit = SourceUnit::from_string("<cfloop from=\"1\" to=\"3\" index=\"i\">x</cfloop>")
            .with_identity("loop.cfm");
        let err = Compiler::default().compile(&unit).unwrap_err();
        assert_eq!(err.kind(), "Construction Gap");
    }
}
