//! Typed intermediate representation produced by the analyzer.

use crate::domain::ast::{BinaryOperator, Literal};
use crate::domain::types::Type;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(Let),
    Def(Def),
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    For {
        name: String,
        ty: Type,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Return {
        value: Option<Expr>,
    },
    Expression(Expr),
    Assignment(Assignment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub name: String,
    pub ty: Type,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub returns: Type,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Variable { name: String, ty: Type, value: Expr },
    Property { receiver: Expr, name: String, ty: Type, value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        ty: Type,
    },
    Group(Box<Expr>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: Type,
    },
    Variable {
        name: String,
        ty: Type,
    },
    Property {
        receiver: Box<Expr>,
        name: String,
        ty: Type,
    },
    Function {
        name: String,
        arguments: Vec<Expr>,
        ty: Type,
    },
    Method {
        receiver: Box<Expr>,
        name: String,
        arguments: Vec<Expr>,
        ty: Type,
    },
    Object {
        name: Option<String>,
        fields: Vec<Let>,
        methods: Vec<Def>,
        ty: Type,
    },
}

impl Expr {
    pub fn ty(&self) -> &Type {
        match self {
            Expr::Group(inner) => inner.ty(),
            Expr::Literal { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Variable { ty, .. }
            | Expr::Property { ty, .. }
            | Expr::Function { ty, .. }
            | Expr::Method { ty, .. }
            | Expr::Object { ty, .. } => ty,
        }
    }
}
