//! Root scopes: the builtins every program starts with, as runtime values
//! for the evaluator and as function types for the analyzer.

use crate::domain::scope::Scope;
use crate::domain::types::Type;
use crate::domain::value::RuntimeValue;
use crate::utils::error::EvaluateError;
use num_bigint::BigInt;
use num_traits::One;
use std::io::Write;

pub fn runtime_scope() -> Scope<RuntimeValue> {
    let scope = Scope::root();
    scope.define("print", RuntimeValue::builtin("print", print));
    scope.define("log", RuntimeValue::builtin("log", log));
    scope.define("list", RuntimeValue::builtin("list", list));
    scope.define("range", RuntimeValue::builtin("range", range));
    scope
}

pub fn type_scope() -> Scope<Type> {
    let scope = Scope::root();
    scope.define("print", Type::function(vec![Type::Any], Type::Nil));
    scope.define("log", Type::function(vec![Type::Any], Type::Dynamic));
    scope.define("list", Type::variadic(vec![Type::Any], Type::Iterable));
    scope.define(
        "range",
        Type::function(vec![Type::Integer, Type::Integer], Type::Iterable),
    );
    scope
}

fn require_arity(name: &str, arguments: &[RuntimeValue], expected: usize) -> Result<(), EvaluateError> {
    if arguments.len() != expected {
        return Err(EvaluateError::new(format!(
            "Expected {} to be called with {} argument(s), received {}.",
            name,
            expected,
            arguments.len()
        )));
    }
    Ok(())
}

fn write_line(out: &mut dyn Write, line: &str) -> Result<(), EvaluateError> {
    writeln!(out, "{}", line).map_err(|e| EvaluateError::new(format!("Failed to write output: {}", e)))
}

fn print(out: &mut dyn Write, arguments: Vec<RuntimeValue>) -> Result<RuntimeValue, EvaluateError> {
    require_arity("print", &arguments, 1)?;
    write_line(out, &arguments[0].print())?;
    Ok(RuntimeValue::Nil)
}

fn log(out: &mut dyn Write, mut arguments: Vec<RuntimeValue>) -> Result<RuntimeValue, EvaluateError> {
    require_arity("log", &arguments, 1)?;
    let value = arguments.remove(0);
    write_line(out, &format!("log: {}", value.print()))?;
    Ok(value)
}

fn list(_out: &mut dyn Write, arguments: Vec<RuntimeValue>) -> Result<RuntimeValue, EvaluateError> {
    Ok(RuntimeValue::List(arguments))
}

fn range(_out: &mut dyn Write, arguments: Vec<RuntimeValue>) -> Result<RuntimeValue, EvaluateError> {
    require_arity("range", &arguments, 2)?;
    let (start, end) = match (&arguments[0], &arguments[1]) {
        (RuntimeValue::Integer(start), RuntimeValue::Integer(end)) => (start, end),
        (start, end) => {
            return Err(EvaluateError::new(format!(
                "Expected range to be called with Integer bounds, received {} and {}.",
                start.type_name(),
                end.type_name()
            )))
        }
    };
    if start > end {
        return Err(EvaluateError::new(format!(
            "Range start {} is greater than its end {}.",
            start, end
        )));
    }

    let mut values = Vec::new();
    let mut current: BigInt = start.clone();
    while &current < end {
        values.push(RuntimeValue::Integer(current.clone()));
        current += BigInt::one();
    }
    Ok(RuntimeValue::List(values))
}
