//! Wrapper-class scaffold
//!
//! Every generated unit has the same shape: a package derived from the
//! source file's directory, a class named `<Base>$<ext>` extending the
//! runtime's template base class, a lazily created singleton guarded by a
//! double-checked lock, a constructor recording file metadata, the
//! `invoke` entry point and a `main` runner.

use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};

use super::java::{
    Block, ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, Member, MethodDecl,
    Modifier, Param, Stmt,
};
use crate::config::CompilerOptions;
use crate::detect::SourceUnit;

/// Name of the generated entry-point method
pub const ENTRY_METHOD: &str = "invoke";

/// Name of the execution-context parameter
pub const CONTEXT: &str = "context";

/// Local holding the `variables` scope inside generated methods
pub const VARIABLES_LOCAL: &str = "variablesScope";

/// Local holding the class loader helper inside generated methods
pub const LOADER_LOCAL: &str = "JavaLoader";

const INSTANCE_ACCESSOR: &str = "getInstance";
const RUNNER: &str = "main";

/// Wrapper members that user functions must not shadow
pub const RESERVED_MEMBERS: &[&str] = &[ENTRY_METHOD, INSTANCE_ACCESSOR, RUNNER];

const BASE_CLASS: &str = "BaseTemplate";
const INSTANCE_FIELD: &str = "instance";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const UNKNOWN: &str = "unknown";

const IMPORTS: &[&str] = &[
    "ortus.boxlang.runtime.BoxRuntime",
    "ortus.boxlang.runtime.context.*",
    "ortus.boxlang.runtime.dynamic.BaseTemplate",
    "ortus.boxlang.runtime.dynamic.Referencer",
    "ortus.boxlang.runtime.dynamic.casters.*",
    "ortus.boxlang.runtime.interop.DynamicObject",
    "ortus.boxlang.runtime.loader.ClassLocator",
    "ortus.boxlang.runtime.operators.*",
    "ortus.boxlang.runtime.scopes.IScope",
    "ortus.boxlang.runtime.scopes.Key",
    "java.time.LocalDateTime",
];

/// Names derived from a source unit's identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub package: String,
    pub class_name: String,
    pub file_name: String,
    pub extension: String,
    pub directory: String,
}

impl Naming {
    pub fn of(unit: &SourceUnit, options: &CompilerOptions) -> Self {
        let Some(identity) = unit.identity() else {
            return Self {
                package: options.default_package.clone(),
                class_name: options.default_class_name.clone(),
                file_name: UNKNOWN.to_string(),
                extension: UNKNOWN.to_string(),
                directory: UNKNOWN.to_string(),
            };
        };

        let path = identity.path.to_string_lossy().replace('\\', "/");
        let (directory, file_name) = match path.rsplit_once('/') {
            Some((directory, file_name)) => (directory.to_string(), file_name.to_string()),
            None => (String::new(), path.clone()),
        };

        let package = package_name(&directory).unwrap_or_else(|| options.default_package.clone());
        let class_name = class_name(&file_name).unwrap_or_else(|| options.default_class_name.clone());

        Self {
            package,
            class_name,
            extension: identity.extension.clone().unwrap_or_default(),
            file_name,
            directory,
        }
    }
}

/// Dotted package from a directory path; drive prefixes become `x_drive`
pub fn package_name(directory: &str) -> Option<String> {
    let segments: Vec<String> = directory
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(|segment| match segment.strip_suffix(':') {
            Some(drive) if drive.len() == 1 => format!("{}_drive", drive.to_lowercase()),
            _ => java_identifier(segment),
        })
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("."))
    }
}

/// `HelloWorld.cfm` becomes `HelloWorld$cfm`
pub fn class_name(file_name: &str) -> Option<String> {
    if file_name.is_empty() {
        return None;
    }
    let name = java_identifier(&file_name.replace('.', "$"));
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Replace characters Java does not allow in an identifier with `_`
pub(crate) fn java_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `LocalDateTime.parse("...")`
fn timestamp(time: NaiveDateTime) -> Expr {
    Expr::static_call(
        "LocalDateTime",
        "parse",
        vec![Expr::string(time.format(TIMESTAMP_FORMAT).to_string())],
    )
}

fn key(name: &str) -> Expr {
    Expr::static_call("Key", "of", vec![Expr::string(name)])
}

/// Locals every generated method body starts with
pub fn method_preamble() -> Vec<Stmt> {
    vec![
        Stmt::LocalVar {
            type_name: "IScope".to_string(),
            name: VARIABLES_LOCAL.to_string(),
            init: Expr::call(Expr::name(CONTEXT), "getScopeNearby", vec![key("variables")]),
        },
        Stmt::LocalVar {
            type_name: "ClassLocator".to_string(),
            name: LOADER_LOCAL.to_string(),
            init: Expr::static_call("ClassLocator", "getInstance", Vec::new()),
        },
    ]
}

/// Signature shared by the entry point and translated functions
pub fn context_method(name: &str, body: Vec<Stmt>) -> MethodDecl {
    MethodDecl {
        modifiers: vec![Modifier::Public],
        return_type: "void".to_string(),
        name: name.to_string(),
        parameters: vec![Param::new("IBoxContext", CONTEXT)],
        throws: vec!["Throwable".to_string()],
        body: Block::new(body),
    }
}

/// Build the fixed wrapper shape for a unit, with an entry point holding
/// only the preamble
pub fn scaffold(
    unit: &SourceUnit,
    options: &CompilerOptions,
    compiled_on: NaiveDateTime,
) -> CompilationUnit {
    let naming = Naming::of(unit, options);
    let last_modified = unit
        .last_modified()
        .map(local_time)
        .unwrap_or(compiled_on);

    let class = ClassDecl {
        name: naming.class_name.clone(),
        modifiers: vec![Modifier::Public],
        extends: Some(BASE_CLASS.to_string()),
        members: vec![
            Member::Field(FieldDecl {
                modifiers: vec![Modifier::Private, Modifier::Static, Modifier::Volatile],
                type_name: naming.class_name.clone(),
                name: INSTANCE_FIELD.to_string(),
                initializer: None,
            }),
            Member::Constructor(constructor(&naming, last_modified, compiled_on)),
            Member::Method(instance_accessor(&naming.class_name)),
            Member::Method(context_method(ENTRY_METHOD, method_preamble())),
            Member::Method(runner(&naming.class_name)),
        ],
    };

    CompilationUnit {
        package: naming.package,
        imports: IMPORTS.iter().map(|import| import.to_string()).collect(),
        types: vec![class],
    }
}

fn local_time(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

fn constructor(naming: &Naming, last_modified: NaiveDateTime, compiled_on: NaiveDateTime) -> ConstructorDecl {
    let set = |field: &str, value: Expr| Expr::assign(Expr::field(Expr::This, field), value).into_stmt();

    ConstructorDecl {
        modifiers: vec![Modifier::Public],
        parameters: Vec::new(),
        body: Block::new(vec![
            set("name", Expr::string(&naming.file_name)),
            set("extension", Expr::string(&naming.extension)),
            set("path", Expr::string(&naming.directory)),
            set("lastModified", timestamp(last_modified)),
            set("compiledOn", timestamp(compiled_on)),
        ]),
    }
}

/// Double-checked lazy initialisation over a volatile field
fn instance_accessor(class_name: &str) -> MethodDecl {
    let instance = || Expr::name(INSTANCE_FIELD);
    let is_unset = || Expr::equals(instance(), Expr::Null);

    let create = Expr::assign(
        instance(),
        Expr::ObjectCreation {
            type_name: class_name.to_string(),
            args: Vec::new(),
        },
    );

    let guarded = Stmt::Synchronized {
        lock: Expr::ClassLiteral {
            type_name: class_name.to_string(),
        },
        body: Block::new(vec![Stmt::If {
            condition: is_unset(),
            then_block: Block::new(vec![create.into_stmt()]),
            else_block: Block::default(),
        }]),
    };

    MethodDecl {
        modifiers: vec![Modifier::Public, Modifier::Static],
        return_type: class_name.to_string(),
        name: INSTANCE_ACCESSOR.to_string(),
        parameters: Vec::new(),
        throws: Vec::new(),
        body: Block::new(vec![
            Stmt::If {
                condition: is_unset(),
                then_block: Block::new(vec![guarded]),
                else_block: Block::default(),
            },
            Stmt::Return {
                value: Some(instance()),
            },
        ]),
    }
}

/// `main` runs the template through the runtime and shuts it down
fn runner(class_name: &str) -> MethodDecl {
    let runtime = || Expr::name("rt");

    MethodDecl {
        modifiers: vec![Modifier::Public, Modifier::Static],
        return_type: "void".to_string(),
        name: RUNNER.to_string(),
        parameters: vec![Param::new("String[]", "args")],
        throws: Vec::new(),
        body: Block::new(vec![
            Stmt::LocalVar {
                type_name: "BoxRuntime".to_string(),
                name: "rt".to_string(),
                init: Expr::static_call("BoxRuntime", "getInstance", Vec::new()),
            },
            Stmt::Try {
                body: Block::new(vec![Expr::call(
                    runtime(),
                    "executeTemplate",
                    vec![Expr::static_call(class_name, "getInstance", Vec::new())],
                )
                .into_stmt()]),
                catch_type: "Throwable".to_string(),
                catch_name: "e".to_string(),
                handler: Block::new(vec![
                    Expr::call(Expr::name("e"), "printStackTrace", Vec::new()).into_stmt(),
                    Expr::static_call("System", "exit", vec![Expr::IntLit { value: 1 }]).into_stmt(),
                ]),
            },
            Expr::call(runtime(), "shutdown", Vec::new()).into_stmt(),
        ]),
    }
}
