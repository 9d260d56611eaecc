//! Tree-walking evaluator over the AST.

use crate::domain::ast::{self, BinaryOperator, Literal};
use crate::domain::scope::Scope;
use crate::domain::value::{Callable, FunctionValue, ObjectValue, RuntimeValue, UserFunction};
use crate::utils::error::EvaluateError;
use bigdecimal::RoundingMode;
use num_traits::Zero;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;

/// Deepest chain of nested function calls before evaluation gives up.
pub const MAX_CALL_DEPTH: usize = 512;

/// How a statement finished: normally with a value, or by `RETURN`.
#[derive(Debug)]
enum Flow {
    Normal(RuntimeValue),
    Return(RuntimeValue),
}

pub struct Evaluator<W: Write> {
    scope: Scope<RuntimeValue>,
    out: W,
    depth: usize,
}

impl<W: Write> Evaluator<W> {
    /// `out` receives everything the program prints.
    pub fn new(scope: Scope<RuntimeValue>, out: W) -> Self {
        Self {
            scope,
            out,
            depth: 0,
        }
    }

    /// Runs every statement and returns the value of the last one.
    pub fn evaluate_source(&mut self, ast: &ast::Source) -> Result<RuntimeValue, EvaluateError> {
        match self.execute_body(&ast.statements)? {
            Flow::Normal(value) => Ok(value),
            Flow::Return(_) => Err(EvaluateError::new(
                "RETURN is only allowed inside a function.",
            )),
        }
    }

    fn execute(&mut self, ast: &ast::Stmt) -> Result<Flow, EvaluateError> {
        match ast {
            ast::Stmt::Let(stmt) => self.execute_let(stmt),
            ast::Stmt::Def(stmt) => self.execute_def(stmt),
            ast::Stmt::If(stmt) => self.execute_if(stmt),
            ast::Stmt::For(stmt) => self.execute_for(stmt),
            ast::Stmt::Return(stmt) => {
                let value = match &stmt.value {
                    Some(value) => self.evaluate_expr(value)?,
                    None => RuntimeValue::Nil,
                };
                Ok(Flow::Return(value))
            }
            ast::Stmt::Expression(expr) => self.evaluate_expr(expr).map(Flow::Normal),
            ast::Stmt::Assignment(stmt) => self.execute_assignment(stmt).map(Flow::Normal),
        }
    }

    fn execute_let(&mut self, ast: &ast::Let) -> Result<Flow, EvaluateError> {
        if self.scope.contains_local(&ast.name) {
            return Err(EvaluateError::new(format!(
                "'{}' is already defined in this scope.",
                ast.name
            )));
        }
        let value = match &ast.value {
            Some(value) => self.evaluate_expr(value)?,
            None => RuntimeValue::Nil,
        };
        self.scope.define(ast.name.clone(), value.clone());
        Ok(Flow::Normal(value))
    }

    fn execute_def(&mut self, ast: &ast::Def) -> Result<Flow, EvaluateError> {
        if self.scope.contains_local(&ast.name) {
            return Err(EvaluateError::new(format!(
                "'{}' is already defined in this scope.",
                ast.name
            )));
        }
        let function = self.make_function(ast, false)?;
        self.scope.define(ast.name.clone(), function.clone());
        Ok(Flow::Normal(function))
    }

    /// Closes over the current scope.
    fn make_function(&self, ast: &ast::Def, method: bool) -> Result<RuntimeValue, EvaluateError> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = ast.parameters.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(EvaluateError::new(format!(
                "Parameter '{}' of '{}' is declared twice.",
                duplicate, ast.name
            )));
        }
        Ok(RuntimeValue::Function(FunctionValue {
            name: ast.name.clone(),
            callable: Callable::User(Rc::new(UserFunction {
                parameters: ast.parameters.clone(),
                body: ast.body.clone(),
                closure: self.scope.clone(),
                method,
            })),
            receiver: None,
        }))
    }

    fn execute_if(&mut self, ast: &ast::If) -> Result<Flow, EvaluateError> {
        let condition = match self.evaluate_expr(&ast.condition)? {
            RuntimeValue::Boolean(condition) => condition,
            other => {
                return Err(EvaluateError::new(format!(
                    "IF condition must be a Boolean, received {}.",
                    other.type_name()
                )))
            }
        };
        let body = if condition {
            &ast.then_body
        } else {
            &ast.else_body
        };
        match self.execute_block(body)? {
            Flow::Normal(_) => Ok(Flow::Normal(RuntimeValue::Nil)),
            flow => Ok(flow),
        }
    }

    fn execute_for(&mut self, ast: &ast::For) -> Result<Flow, EvaluateError> {
        let elements = match self.evaluate_expr(&ast.expression)? {
            RuntimeValue::List(elements) => elements,
            other => {
                return Err(EvaluateError::new(format!(
                    "FOR expects an iterable value, received {}.",
                    other.type_name()
                )))
            }
        };
        for element in elements {
            let scope = self.scope.child();
            scope.define(ast.name.clone(), element);
            if let Flow::Return(value) =
                self.with_scope(scope, |evaluator| evaluator.execute_body(&ast.body))?
            {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal(RuntimeValue::Nil))
    }

    fn execute_assignment(&mut self, ast: &ast::Assignment) -> Result<RuntimeValue, EvaluateError> {
        match &ast.target {
            ast::Expr::Variable(name) => {
                if self.scope.get(name, false).is_none() {
                    return Err(EvaluateError::new(format!("'{}' is not defined.", name)));
                }
                let value = self.evaluate_expr(&ast.value)?;
                self.scope.set(name, value.clone());
                Ok(value)
            }
            ast::Expr::Property(property) => {
                let object = self.evaluate_object(&property.receiver)?;
                if !object.fields.contains_local(&property.name) {
                    return Err(EvaluateError::new(format!(
                        "Object has no property '{}'.",
                        property.name
                    )));
                }
                let value = self.evaluate_expr(&ast.value)?;
                object.fields.set(&property.name, value.clone());
                Ok(value)
            }
            _ => Err(EvaluateError::new(
                "Only variables and properties can be assigned to.",
            )),
        }
    }

    pub fn evaluate_expr(&mut self, ast: &ast::Expr) -> Result<RuntimeValue, EvaluateError> {
        match ast {
            ast::Expr::Literal(literal) => Ok(literal_value(literal)),
            ast::Expr::Group(inner) => self.evaluate_expr(inner),
            ast::Expr::Binary(binary) => self.evaluate_binary(binary),
            ast::Expr::Variable(name) => self
                .scope
                .get(name, false)
                .ok_or_else(|| EvaluateError::new(format!("'{}' is not defined.", name))),
            ast::Expr::Property(property) => {
                let object = self.evaluate_object(&property.receiver)?;
                match object.fields.get(&property.name, true) {
                    Some(RuntimeValue::Function(function)) => {
                        Ok(RuntimeValue::Function(function.bind(&object)))
                    }
                    Some(value) => Ok(value),
                    None => Err(EvaluateError::new(format!(
                        "Object has no property '{}'.",
                        property.name
                    ))),
                }
            }
            ast::Expr::Function(call) => {
                let function = match self.scope.get(&call.name, false) {
                    Some(RuntimeValue::Function(function)) => function,
                    Some(other) => {
                        return Err(EvaluateError::new(format!(
                            "'{}' is not a function, it is a {}.",
                            call.name,
                            other.type_name()
                        )))
                    }
                    None => {
                        return Err(EvaluateError::new(format!(
                            "'{}' is not defined.",
                            call.name
                        )))
                    }
                };
                let arguments = self.evaluate_arguments(&call.arguments)?;
                self.invoke(&function, arguments)
            }
            ast::Expr::Method(call) => {
                let object = self.evaluate_object(&call.receiver)?;
                let method = match object.fields.get(&call.name, true) {
                    Some(RuntimeValue::Function(method)) => method.bind(&object),
                    _ => {
                        return Err(EvaluateError::new(format!(
                            "Object has no method '{}'.",
                            call.name
                        )))
                    }
                };
                let arguments = self.evaluate_arguments(&call.arguments)?;
                self.invoke(&method, arguments)
            }
            ast::Expr::Object(object) => self.evaluate_object_expr(object),
        }
    }

    fn evaluate_arguments(&mut self, arguments: &[ast::Expr]) -> Result<Vec<RuntimeValue>, EvaluateError> {
        arguments.iter().map(|arg| self.evaluate_expr(arg)).collect()
    }

    fn evaluate_object(&mut self, receiver: &ast::Expr) -> Result<ObjectValue, EvaluateError> {
        match self.evaluate_expr(receiver)? {
            RuntimeValue::Object(object) => Ok(object),
            other => Err(EvaluateError::new(format!(
                "Members can only be accessed on objects, received {}.",
                other.type_name()
            ))),
        }
    }

    fn evaluate_object_expr(&mut self, ast: &ast::ObjectExpr) -> Result<RuntimeValue, EvaluateError> {
        let fields = Scope::root();
        for field in &ast.fields {
            if fields.contains_local(&field.name) {
                return Err(EvaluateError::new(format!(
                    "Field '{}' is already defined.",
                    field.name
                )));
            }
            let value = match &field.value {
                Some(value) => self.evaluate_expr(value)?,
                None => RuntimeValue::Nil,
            };
            fields.define(field.name.clone(), value);
        }
        for method in &ast.methods {
            if fields.contains_local(&method.name) {
                return Err(EvaluateError::new(format!(
                    "Member '{}' is already defined.",
                    method.name
                )));
            }
            fields.define(method.name.clone(), self.make_function(method, true)?);
        }
        Ok(RuntimeValue::Object(ObjectValue {
            name: ast.name.clone(),
            fields,
        }))
    }

    fn invoke(
        &mut self,
        function: &FunctionValue,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, EvaluateError> {
        tracing::trace!(function = %function.name, arguments = arguments.len(), "invoke");
        let user = match &function.callable {
            Callable::Builtin(builtin) => return builtin(&mut self.out, arguments),
            Callable::User(user) => Rc::clone(user),
        };
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvaluateError::new(format!(
                "Call depth limit of {} exceeded in '{}'.",
                MAX_CALL_DEPTH, function.name
            )));
        }

        let scope = user.closure.child();
        if user.method {
            let receiver = function.receiver.clone().ok_or_else(|| {
                EvaluateError::new(format!(
                    "Method '{}' must be called on an object.",
                    function.name
                ))
            })?;
            scope.define("this", RuntimeValue::Object(receiver));
        }
        if arguments.len() != user.parameters.len() {
            return Err(EvaluateError::new(format!(
                "'{}' expects {} argument(s), received {}.",
                function.name,
                user.parameters.len(),
                arguments.len()
            )));
        }
        for (name, value) in user.parameters.iter().zip(arguments) {
            scope.define(name.clone(), value);
        }

        self.depth += 1;
        let result = self.with_scope(scope, |evaluator| evaluator.execute_body(&user.body));
        self.depth -= 1;
        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) => Ok(RuntimeValue::Nil),
        }
    }

    fn evaluate_binary(&mut self, ast: &ast::Binary) -> Result<RuntimeValue, EvaluateError> {
        let operator = ast.operator;
        let left = self.evaluate_expr(&ast.left)?;

        use RuntimeValue::{Decimal, Integer};
        let value = match operator {
            BinaryOperator::And | BinaryOperator::Or => {
                let left = require_boolean(operator, left)?;
                if (operator == BinaryOperator::Or) == left {
                    return Ok(RuntimeValue::Boolean(left));
                }
                let right = require_boolean(operator, self.evaluate_expr(&ast.right)?)?;
                RuntimeValue::Boolean(right)
            }
            BinaryOperator::Add => {
                let right = self.evaluate_expr(&ast.right)?;
                match (&left, &right) {
                    (RuntimeValue::String(_), _) | (_, RuntimeValue::String(_)) => {
                        RuntimeValue::String(format!("{}{}", left.print(), right.print()))
                    }
                    (Integer(a), Integer(b)) => Integer(a + b),
                    (Decimal(a), Decimal(b)) => Decimal(a + b),
                    _ => return Err(mismatch(operator, &left, &right)),
                }
            }
            BinaryOperator::Subtract => {
                let right = self.evaluate_expr(&ast.right)?;
                match (&left, &right) {
                    (Integer(a), Integer(b)) => Integer(a - b),
                    (Decimal(a), Decimal(b)) => Decimal(a - b),
                    _ => return Err(mismatch(operator, &left, &right)),
                }
            }
            BinaryOperator::Multiply => {
                let right = self.evaluate_expr(&ast.right)?;
                match (&left, &right) {
                    (Integer(a), Integer(b)) => Integer(a * b),
                    (Decimal(a), Decimal(b)) => Decimal(a * b),
                    _ => return Err(mismatch(operator, &left, &right)),
                }
            }
            BinaryOperator::Divide => {
                let right = self.evaluate_expr(&ast.right)?;
                match (&left, &right) {
                    (Integer(a), Integer(b)) => {
                        if b.is_zero() {
                            return Err(EvaluateError::new("Division by zero."));
                        }
                        Integer(a / b)
                    }
                    (Decimal(a), Decimal(b)) => {
                        if b.is_zero() {
                            return Err(EvaluateError::new("Division by zero."));
                        }
                        let (_, scale) = a.as_bigint_and_exponent();
                        Decimal((a / b).with_scale_round(scale, RoundingMode::HalfEven))
                    }
                    _ => return Err(mismatch(operator, &left, &right)),
                }
            }
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => {
                let right = self.evaluate_expr(&ast.right)?;
                let ordering = compare(operator, &left, &right)?;
                RuntimeValue::Boolean(match operator {
                    BinaryOperator::Less => ordering == Ordering::Less,
                    BinaryOperator::LessEqual => ordering != Ordering::Greater,
                    BinaryOperator::Greater => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                })
            }
            BinaryOperator::Equal => RuntimeValue::Boolean(left == self.evaluate_expr(&ast.right)?),
            BinaryOperator::NotEqual => {
                RuntimeValue::Boolean(left != self.evaluate_expr(&ast.right)?)
            }
        };
        Ok(value)
    }

    fn execute_block(&mut self, statements: &[ast::Stmt]) -> Result<Flow, EvaluateError> {
        let scope = self.scope.child();
        self.with_scope(scope, |evaluator| evaluator.execute_body(statements))
    }

    /// Runs statements in the current scope, stopping at the first `RETURN`.
    fn execute_body(&mut self, statements: &[ast::Stmt]) -> Result<Flow, EvaluateError> {
        let mut last = RuntimeValue::Nil;
        for statement in statements {
            match self.execute(statement)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn with_scope<R>(
        &mut self,
        scope: Scope<RuntimeValue>,
        f: impl FnOnce(&mut Self) -> Result<R, EvaluateError>,
    ) -> Result<R, EvaluateError> {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }
}

fn literal_value(literal: &Literal) -> RuntimeValue {
    match literal {
        Literal::Nil => RuntimeValue::Nil,
        Literal::Boolean(value) => RuntimeValue::Boolean(*value),
        Literal::Integer(value) => RuntimeValue::Integer(value.clone()),
        Literal::Decimal(value) => RuntimeValue::Decimal(value.clone()),
        Literal::Character(value) => RuntimeValue::Character(*value),
        Literal::String(value) => RuntimeValue::String(value.clone()),
    }
}

fn require_boolean(operator: BinaryOperator, value: RuntimeValue) -> Result<bool, EvaluateError> {
    match value {
        RuntimeValue::Boolean(value) => Ok(value),
        other => Err(EvaluateError::new(format!(
            "Operator '{}' requires Boolean operands, received {}.",
            operator,
            other.type_name()
        ))),
    }
}

fn compare(
    operator: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<Ordering, EvaluateError> {
    match (left, right) {
        (RuntimeValue::Integer(a), RuntimeValue::Integer(b)) => Ok(a.cmp(b)),
        (RuntimeValue::Decimal(a), RuntimeValue::Decimal(b)) => Ok(a.cmp(b)),
        (RuntimeValue::Character(a), RuntimeValue::Character(b)) => Ok(a.cmp(b)),
        (RuntimeValue::String(a), RuntimeValue::String(b)) => Ok(a.cmp(b)),
        _ => Err(mismatch(operator, left, right)),
    }
}

fn mismatch(operator: BinaryOperator, left: &RuntimeValue, right: &RuntimeValue) -> EvaluateError {
    EvaluateError::new(format!(
        "Operator '{}' is not defined for {} and {}.",
        operator,
        left.type_name(),
        right.type_name()
    ))
}
