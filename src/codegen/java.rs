//! Target AST
//!
//! An in-memory model of the Java-like source the generator emits. Only
//! the shapes the generator produces are modelled; turning this tree into
//! text is left to a renderer.

use serde::Serialize;

/// One emitted source file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilationUnit {
    pub package: String,
    pub imports: Vec<String>,
    pub types: Vec<ClassDecl>,
}

impl CompilationUnit {
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.types.iter().find(|class| class.name == name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassDecl> {
        self.types.iter_mut().find(|class| class.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modifier {
    Public,
    Private,
    Static,
    Volatile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDecl {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub extends: Option<String>,
    pub members: Vec<Member>,
}

impl ClassDecl {
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.members.iter().find_map(|member| match member {
            Member::Method(method) if method.name == name => Some(method),
            _ => None,
        })
    }

    pub fn method_mut(&mut self, name: &str) -> Option<&mut MethodDecl> {
        self.members.iter_mut().find_map(|member| match member {
            Member::Method(method) if method.name == name => Some(method),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "member")]
pub enum Member {
    Field(FieldDecl),
    Constructor(ConstructorDecl),
    Method(MethodDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub modifiers: Vec<Modifier>,
    pub type_name: String,
    pub name: String,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructorDecl {
    pub modifiers: Vec<Modifier>,
    pub parameters: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDecl {
    pub modifiers: Vec<Modifier>,
    pub return_type: String,
    pub name: String,
    pub parameters: Vec<Param>,
    pub throws: Vec<String>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub type_name: String,
    pub name: String,
}

impl Param {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stmt")]
pub enum Stmt {
    Expr { expr: Expr },
    LocalVar {
        type_name: String,
        name: String,
        init: Expr,
    },
    /// Both branches are always present; an empty else is an empty block
    If {
        condition: Expr,
        then_block: Block,
        else_block: Block,
    },
    Synchronized { lock: Expr, body: Block },
    Try {
        body: Block,
        catch_type: String,
        catch_name: String,
        handler: Block,
    },
    Return { value: Option<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Equals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "expr")]
pub enum Expr {
    Name { name: String },
    FieldAccess { target: Box<Expr>, field: String },
    MethodCall {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    StringLit { value: String },
    IntLit { value: i64 },
    DoubleLit { value: f64 },
    BoolLit { value: bool },
    Null,
    This,
    Assign { target: Box<Expr>, value: Box<Expr> },
    ObjectCreation { type_name: String, args: Vec<Expr> },
    ArrayCreation { element_type: String, elements: Vec<Expr> },
    ClassLiteral { type_name: String },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name { name: name.into() }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::StringLit {
            value: value.into(),
        }
    }

    /// `target.name(args)`
    pub fn call(target: Expr, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::MethodCall {
            target: Some(Box::new(target)),
            name: name.into(),
            args,
        }
    }

    /// `Type.name(args)`
    pub fn static_call(type_name: &str, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call(Self::name(type_name), name, args)
    }

    pub fn field(target: Expr, field: impl Into<String>) -> Self {
        Self::FieldAccess {
            target: Box::new(target),
            field: field.into(),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// `new Object[]{ elements }`
    pub fn object_array(elements: Vec<Expr>) -> Self {
        Self::ArrayCreation {
            element_type: "Object".to_string(),
            elements,
        }
    }

    pub fn equals(left: Expr, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op: BinaryOp::Equals,
            right: Box::new(right),
        }
    }

    pub fn into_stmt(self) -> Stmt {
        Stmt::Expr { expr: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_lookup_on_class() {
        let class = ClassDecl {
            name: "Index$cfm".to_string(),
            modifiers: vec![Modifier::Public],
            extends: None,
            members: vec![
                Member::Field(FieldDecl {
                    modifiers: vec![Modifier::Private],
                    type_name: "int".to_string(),
                    name: "invoke".to_string(),
                    initializer: None,
                }),
                Member::Method(MethodDecl {
                    modifiers: vec![Modifier::Public],
                    return_type: "void".to_string(),
                    name: "invoke".to_string(),
                    parameters: Vec::new(),
                    throws: Vec::new(),
                    body: Block::default(),
                }),
            ],
        };

        assert!(class.method("invoke").is_some());
        assert!(class.method("main").is_none());
        assert_eq!(class.methods().count(), 1);
    }

    #[test]
    fn test_serialized_expression_is_tagged() {
        let expr = Expr::static_call("Key", "of", vec![Expr::string("x")]);
        let json = serde_json::to_value(&expr).unwrap();

        assert_eq!(json["expr"], "MethodCall");
        assert_eq!(json["name"], "of");
        assert_eq!(json["target"]["name"], "Key");
        assert_eq!(json["args"][0]["value"], "x");
    }
}
