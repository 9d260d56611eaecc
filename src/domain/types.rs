use crate::domain::scope::Scope;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Type {
    Any,
    Nil,
    Dynamic,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
    Equatable,
    Comparable,
    Iterable,
    Function(Rc<FunctionType>),
    Object(ObjectType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub parameters: Vec<Type>,
    /// When set, the last parameter type may repeat zero or more times.
    pub variadic: bool,
    pub returns: Type,
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: Option<String>,
    pub members: Scope<Type>,
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.members.ptr_eq(&other.members)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Function(a), Type::Function(b)) => a == b,
            (Type::Object(a), Type::Object(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Type {
    pub fn function(parameters: Vec<Type>, returns: Type) -> Self {
        Type::Function(Rc::new(FunctionType {
            parameters,
            variadic: false,
            returns,
        }))
    }

    pub fn variadic(parameters: Vec<Type>, returns: Type) -> Self {
        Type::Function(Rc::new(FunctionType {
            parameters,
            variadic: true,
            returns,
        }))
    }

    /// Resolves a type annotation.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "Any" => Type::Any,
            "Nil" => Type::Nil,
            "Dynamic" => Type::Dynamic,
            "Boolean" => Type::Boolean,
            "Integer" => Type::Integer,
            "Decimal" => Type::Decimal,
            "Character" => Type::Character,
            "String" => Type::String,
            "Equatable" => Type::Equatable,
            "Comparable" => Type::Comparable,
            "Iterable" => Type::Iterable,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_subtype_of(&self, other: &Type) -> bool {
        match (self, other) {
            (_, Type::Any) => true,
            (Type::Dynamic, _) | (_, Type::Dynamic) => true,
            (a, b) if a == b => true,
            (
                Type::Nil
                | Type::Boolean
                | Type::Integer
                | Type::Decimal
                | Type::Character
                | Type::String
                | Type::Comparable
                | Type::Iterable,
                Type::Equatable,
            ) => true,
            (Type::Integer | Type::Decimal | Type::Character | Type::String, Type::Comparable) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("Any"),
            Type::Nil => f.write_str("Nil"),
            Type::Dynamic => f.write_str("Dynamic"),
            Type::Boolean => f.write_str("Boolean"),
            Type::Integer => f.write_str("Integer"),
            Type::Decimal => f.write_str("Decimal"),
            Type::Character => f.write_str("Character"),
            Type::String => f.write_str("String"),
            Type::Equatable => f.write_str("Equatable"),
            Type::Comparable => f.write_str("Comparable"),
            Type::Iterable => f.write_str("Iterable"),
            Type::Function(function) => {
                let parameters: Vec<String> =
                    function.parameters.iter().map(|p| p.to_string()).collect();
                let ellipsis = if function.variadic { "..." } else { "" };
                write!(f, "({}{}) -> {}", parameters.join(", "), ellipsis, function.returns)
            }
            Type::Object(object) => match &object.name {
                Some(name) => f.write_str(name),
                None => f.write_str("Object"),
            },
        }
    }
}
