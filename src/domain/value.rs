use crate::domain::ast::Stmt;
use crate::domain::scope::Scope;
use crate::utils::error::EvaluateError;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

/// Native function. Receives the program output and the evaluated arguments.
pub type Builtin = fn(&mut dyn Write, Vec<RuntimeValue>) -> Result<RuntimeValue, EvaluateError>;

#[derive(Debug, Clone)]
pub enum RuntimeValue {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
    List(Vec<RuntimeValue>),
    Function(FunctionValue),
    Object(ObjectValue),
}

#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub name: String,
    pub callable: Callable,
    /// Object a method was read from. Bound to `this` when the method runs.
    pub receiver: Option<ObjectValue>,
}

impl FunctionValue {
    /// Attaches `object` as the receiver of an unbound method. Other
    /// functions, and methods that already have a receiver, are unchanged.
    pub fn bind(mut self, object: &ObjectValue) -> Self {
        let method = matches!(&self.callable, Callable::User(user) if user.method);
        if method && self.receiver.is_none() {
            self.receiver = Some(object.clone());
        }
        self
    }
}

#[derive(Clone)]
pub enum Callable {
    Builtin(Builtin),
    User(Rc<UserFunction>),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Builtin(_) => f.write_str("Builtin"),
            Callable::User(function) => f
                .debug_struct("User")
                .field("parameters", &function.parameters)
                .field("method", &function.method)
                .finish(),
        }
    }
}

#[derive(Debug)]
pub struct UserFunction {
    pub parameters: Vec<String>,
    pub body: Vec<Stmt>,
    /// Scope the function was defined in.
    pub closure: Scope<RuntimeValue>,
    /// Methods run with their receiver bound to `this`.
    pub method: bool,
}

#[derive(Debug, Clone)]
pub struct ObjectValue {
    pub name: Option<String>,
    pub fields: Scope<RuntimeValue>,
}

impl RuntimeValue {
    pub fn builtin(name: &str, builtin: Builtin) -> Self {
        RuntimeValue::Function(FunctionValue {
            name: name.to_string(),
            callable: Callable::Builtin(builtin),
            receiver: None,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Nil => "Nil",
            RuntimeValue::Boolean(_) => "Boolean",
            RuntimeValue::Integer(_) => "Integer",
            RuntimeValue::Decimal(_) => "Decimal",
            RuntimeValue::Character(_) => "Character",
            RuntimeValue::String(_) => "String",
            RuntimeValue::List(_) => "List",
            RuntimeValue::Function(_) => "Function",
            RuntimeValue::Object(_) => "Object",
        }
    }

    /// Printed form used by `print`, `log` and string concatenation.
    pub fn print(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Nil => f.write_str("NIL"),
            RuntimeValue::Boolean(true) => f.write_str("TRUE"),
            RuntimeValue::Boolean(false) => f.write_str("FALSE"),
            RuntimeValue::Integer(value) => write!(f, "{}", value),
            RuntimeValue::Decimal(value) => f.write_str(&value.to_plain_string()),
            RuntimeValue::Character(value) => write!(f, "{}", value),
            RuntimeValue::String(value) => f.write_str(value),
            RuntimeValue::List(values) => {
                let printed: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", printed.join(", "))
            }
            RuntimeValue::Function(function) => match &function.callable {
                Callable::Builtin(_) => write!(f, "DEF {}(...)", function.name),
                Callable::User(user) => {
                    write!(f, "DEF {}({})", function.name, user.parameters.join(", "))
                }
            },
            RuntimeValue::Object(object) => {
                let fields: Vec<String> = object
                    .fields
                    .entries()
                    .into_iter()
                    .filter(|(_, value)| !matches!(value, RuntimeValue::Function(_)))
                    .map(|(name, value)| format!("{} = {}", name, value))
                    .collect();
                let name = object.name.as_deref().unwrap_or("Object");
                if fields.is_empty() {
                    write!(f, "{} {{}}", name)
                } else {
                    write!(f, "{} {{ {} }}", name, fields.join(", "))
                }
            }
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::Nil, RuntimeValue::Nil) => true,
            (RuntimeValue::Boolean(a), RuntimeValue::Boolean(b)) => a == b,
            (RuntimeValue::Integer(a), RuntimeValue::Integer(b)) => a == b,
            (RuntimeValue::Decimal(a), RuntimeValue::Decimal(b)) => a == b,
            (RuntimeValue::Character(a), RuntimeValue::Character(b)) => a == b,
            (RuntimeValue::String(a), RuntimeValue::String(b)) => a == b,
            (RuntimeValue::List(a), RuntimeValue::List(b)) => a == b,
            (RuntimeValue::Function(a), RuntimeValue::Function(b)) => {
                match (&a.callable, &b.callable) {
                    (Callable::Builtin(_), Callable::Builtin(_)) => a.name == b.name,
                    (Callable::User(x), Callable::User(y)) => {
                        Rc::ptr_eq(x, y)
                            && match (&a.receiver, &b.receiver) {
                                (Some(r), Some(s)) => r.fields.ptr_eq(&s.fields),
                                (None, None) => true,
                                _ => false,
                            }
                    }
                    _ => false,
                }
            }
            (RuntimeValue::Object(a), RuntimeValue::Object(b)) => a.fields.ptr_eq(&b.fields),
            _ => false,
        }
    }
}

impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        RuntimeValue::Boolean(value)
    }
}

impl From<i64> for RuntimeValue {
    fn from(value: i64) -> Self {
        RuntimeValue::Integer(BigInt::from(value))
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        RuntimeValue::String(value.to_string())
    }
}
