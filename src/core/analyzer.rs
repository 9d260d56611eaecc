//! Static analysis: resolves names, checks types and lowers the AST into the
//! typed IR.

use crate::domain::ast::{self, BinaryOperator, Literal};
use crate::domain::ir;
use crate::domain::scope::Scope;
use crate::domain::types::{FunctionType, ObjectType, Type};
use crate::utils::error::AnalyzeError;
use std::collections::HashSet;

/// Scope slot holding the return type of the enclosing function.
const RETURNS: &str = "$RETURNS";

pub struct Analyzer {
    scope: Scope<Type>,
}

impl Analyzer {
    pub fn new(scope: Scope<Type>) -> Self {
        Self { scope }
    }

    pub fn analyze_source(&mut self, ast: &ast::Source) -> Result<ir::Source, AnalyzeError> {
        let statements = ast
            .statements
            .iter()
            .map(|stmt| self.analyze_stmt(stmt))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ir::Source { statements })
    }

    pub fn analyze_stmt(&mut self, ast: &ast::Stmt) -> Result<ir::Stmt, AnalyzeError> {
        match ast {
            ast::Stmt::Let(stmt) => {
                let target = self.scope.clone();
                self.analyze_let(stmt, &target).map(ir::Stmt::Let)
            }
            ast::Stmt::Def(stmt) => {
                let target = self.scope.clone();
                let (parameters, returns) = self.declare_function(stmt, &target)?;
                self.analyze_function(stmt, parameters, returns, None)
                    .map(ir::Stmt::Def)
            }
            ast::Stmt::If(stmt) => self.analyze_if(stmt),
            ast::Stmt::For(stmt) => self.analyze_for(stmt),
            ast::Stmt::Return(stmt) => self.analyze_return(stmt),
            ast::Stmt::Expression(expr) => self.analyze_expr(expr).map(ir::Stmt::Expression),
            ast::Stmt::Assignment(stmt) => self.analyze_assignment(stmt),
        }
    }

    /// Checks a `LET` and binds the name in `target`. Values are analyzed in
    /// the current scope, which differs from `target` for object fields.
    fn analyze_let(&mut self, ast: &ast::Let, target: &Scope<Type>) -> Result<ir::Let, AnalyzeError> {
        if target.contains_local(&ast.name) {
            return Err(AnalyzeError::new(format!(
                "'{}' is already defined in this scope.",
                ast.name
            )));
        }
        let declared = ast.type_name.as_deref().map(resolve_type).transpose()?;
        let value = ast
            .value
            .as_ref()
            .map(|value| self.analyze_expr(value))
            .transpose()?;

        let ty = declared
            .or_else(|| value.as_ref().map(|v| v.ty().clone()))
            .unwrap_or(Type::Any);
        if let Some(value) = &value {
            require_subtype(value.ty(), &ty)?;
        }

        target.define(ast.name.clone(), ty.clone());
        Ok(ir::Let {
            name: ast.name.clone(),
            ty,
            value,
        })
    }

    /// Resolves a function signature and binds it in `target`, so the body
    /// (and sibling methods) can refer to it.
    fn declare_function(
        &self,
        ast: &ast::Def,
        target: &Scope<Type>,
    ) -> Result<(Vec<Type>, Type), AnalyzeError> {
        if target.contains_local(&ast.name) {
            return Err(AnalyzeError::new(format!(
                "'{}' is already defined in this scope.",
                ast.name
            )));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = ast.parameters.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(AnalyzeError::new(format!(
                "Parameter '{}' of '{}' is declared twice.",
                duplicate, ast.name
            )));
        }

        let parameters = ast
            .parameter_types
            .iter()
            .map(|name| name.as_deref().map(resolve_type).unwrap_or(Ok(Type::Any)))
            .collect::<Result<Vec<_>, _>>()?;
        let returns = ast
            .return_type
            .as_deref()
            .map(resolve_type)
            .transpose()?
            .unwrap_or(Type::Any);

        target.define(ast.name.clone(), Type::function(parameters.clone(), returns.clone()));
        Ok((parameters, returns))
    }

    fn analyze_function(
        &mut self,
        ast: &ast::Def,
        parameters: Vec<Type>,
        returns: Type,
        this: Option<Type>,
    ) -> Result<ir::Def, AnalyzeError> {
        let body_scope = self.scope.child();
        if let Some(this) = this {
            body_scope.define("this", this);
        }
        body_scope.define(RETURNS, returns.clone());
        for (name, ty) in ast.parameters.iter().zip(&parameters) {
            body_scope.define(name.clone(), ty.clone());
        }

        let body = self.with_scope(body_scope, |analyzer| analyzer.analyze_body(&ast.body))?;
        let parameters = ast
            .parameters
            .iter()
            .zip(parameters)
            .map(|(name, ty)| ir::Parameter {
                name: name.clone(),
                ty,
            })
            .collect();
        Ok(ir::Def {
            name: ast.name.clone(),
            parameters,
            returns,
            body,
        })
    }

    fn analyze_if(&mut self, ast: &ast::If) -> Result<ir::Stmt, AnalyzeError> {
        let condition = self.analyze_expr(&ast.condition)?;
        require_subtype(condition.ty(), &Type::Boolean)?;
        let then_body = self.analyze_block(&ast.then_body)?;
        let else_body = self.analyze_block(&ast.else_body)?;
        Ok(ir::Stmt::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn analyze_for(&mut self, ast: &ast::For) -> Result<ir::Stmt, AnalyzeError> {
        let iterable = self.analyze_expr(&ast.expression)?;
        require_subtype(iterable.ty(), &Type::Iterable)?;

        let body_scope = self.scope.child();
        body_scope.define(ast.name.clone(), Type::Dynamic);
        let body = self.with_scope(body_scope, |analyzer| analyzer.analyze_body(&ast.body))?;
        Ok(ir::Stmt::For {
            name: ast.name.clone(),
            ty: Type::Dynamic,
            iterable,
            body,
        })
    }

    fn analyze_return(&mut self, ast: &ast::Return) -> Result<ir::Stmt, AnalyzeError> {
        let expected = self
            .scope
            .get(RETURNS, false)
            .ok_or_else(|| AnalyzeError::new("RETURN is only allowed inside a function."))?;
        let value = ast
            .value
            .as_ref()
            .map(|value| self.analyze_expr(value))
            .transpose()?;
        match &value {
            Some(value) => require_subtype(value.ty(), &expected)?,
            None => require_subtype(&Type::Nil, &expected)?,
        }
        Ok(ir::Stmt::Return { value })
    }

    fn analyze_assignment(&mut self, ast: &ast::Assignment) -> Result<ir::Stmt, AnalyzeError> {
        match &ast.target {
            ast::Expr::Variable(name) => {
                let ty = self.lookup(name)?;
                let value = self.analyze_expr(&ast.value)?;
                require_subtype(value.ty(), &ty)?;
                Ok(ir::Stmt::Assignment(ir::Assignment::Variable {
                    name: name.clone(),
                    ty,
                    value,
                }))
            }
            ast::Expr::Property(property) => {
                let receiver = self.analyze_expr(&property.receiver)?;
                let ty = member_type(receiver.ty(), &property.name)?;
                let value = self.analyze_expr(&ast.value)?;
                require_subtype(value.ty(), &ty)?;
                Ok(ir::Stmt::Assignment(ir::Assignment::Property {
                    receiver,
                    name: property.name.clone(),
                    ty,
                    value,
                }))
            }
            _ => Err(AnalyzeError::new(
                "Only variables and properties can be assigned to.",
            )),
        }
    }

    pub fn analyze_expr(&mut self, ast: &ast::Expr) -> Result<ir::Expr, AnalyzeError> {
        match ast {
            ast::Expr::Literal(literal) => Ok(ir::Expr::Literal {
                value: literal.clone(),
                ty: literal_type(literal),
            }),
            ast::Expr::Group(inner) => Ok(ir::Expr::Group(Box::new(self.analyze_expr(inner)?))),
            ast::Expr::Binary(binary) => self.analyze_binary(binary),
            ast::Expr::Variable(name) => Ok(ir::Expr::Variable {
                name: name.clone(),
                ty: self.lookup(name)?,
            }),
            ast::Expr::Property(property) => {
                let receiver = self.analyze_expr(&property.receiver)?;
                let ty = member_type(receiver.ty(), &property.name)?;
                Ok(ir::Expr::Property {
                    receiver: Box::new(receiver),
                    name: property.name.clone(),
                    ty,
                })
            }
            ast::Expr::Function(function) => {
                let ty = self.lookup(&function.name)?;
                let (arguments, returns) = self.analyze_call(&function.name, &ty, &function.arguments)?;
                Ok(ir::Expr::Function {
                    name: function.name.clone(),
                    arguments,
                    ty: returns,
                })
            }
            ast::Expr::Method(method) => {
                let receiver = self.analyze_expr(&method.receiver)?;
                let ty = member_type(receiver.ty(), &method.name)?;
                let (arguments, returns) = self.analyze_call(&method.name, &ty, &method.arguments)?;
                Ok(ir::Expr::Method {
                    receiver: Box::new(receiver),
                    name: method.name.clone(),
                    arguments,
                    ty: returns,
                })
            }
            ast::Expr::Object(object) => self.analyze_object(object),
        }
    }

    fn analyze_binary(&mut self, ast: &ast::Binary) -> Result<ir::Expr, AnalyzeError> {
        let left = self.analyze_expr(&ast.left)?;
        let right = self.analyze_expr(&ast.right)?;
        let operator = ast.operator;

        let ty = match operator {
            BinaryOperator::Add
                if *left.ty() == Type::String || *right.ty() == Type::String =>
            {
                Type::String
            }
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide => match left.ty() {
                Type::Integer | Type::Decimal => {
                    require_subtype(right.ty(), left.ty())?;
                    left.ty().clone()
                }
                Type::Dynamic => Type::Dynamic,
                other => {
                    return Err(AnalyzeError::new(format!(
                        "Operator '{}' requires Integer or Decimal operands, received {}.",
                        operator, other
                    )))
                }
            },
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => {
                require_subtype(left.ty(), &Type::Comparable)?;
                require_subtype(right.ty(), left.ty())?;
                Type::Boolean
            }
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                require_subtype(left.ty(), &Type::Equatable)?;
                require_subtype(right.ty(), left.ty())?;
                Type::Boolean
            }
            BinaryOperator::And | BinaryOperator::Or => {
                require_subtype(left.ty(), &Type::Boolean)?;
                require_subtype(right.ty(), &Type::Boolean)?;
                Type::Boolean
            }
        };

        Ok(ir::Expr::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    fn analyze_call(
        &mut self,
        name: &str,
        ty: &Type,
        arguments: &[ast::Expr],
    ) -> Result<(Vec<ir::Expr>, Type), AnalyzeError> {
        let function: &FunctionType = match ty {
            Type::Function(function) => function.as_ref(),
            Type::Dynamic => {
                let arguments = arguments
                    .iter()
                    .map(|arg| self.analyze_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok((arguments, Type::Dynamic));
            }
            other => {
                return Err(AnalyzeError::new(format!(
                    "'{}' is not a function, it has type {}.",
                    name, other
                )))
            }
        };

        let fixed = if function.variadic {
            function.parameters.len().saturating_sub(1)
        } else {
            function.parameters.len()
        };
        let arity_ok = if function.variadic {
            arguments.len() >= fixed
        } else {
            arguments.len() == fixed
        };
        if !arity_ok {
            return Err(AnalyzeError::new(format!(
                "'{}' expects {} argument(s), received {}.",
                name,
                function.parameters.len(),
                arguments.len()
            )));
        }

        let mut analyzed = Vec::with_capacity(arguments.len());
        for (i, argument) in arguments.iter().enumerate() {
            let argument = self.analyze_expr(argument)?;
            let expected = if i < fixed {
                function.parameters[i].clone()
            } else {
                function.parameters.last().cloned().unwrap_or(Type::Any)
            };
            require_subtype(argument.ty(), &expected)?;
            analyzed.push(argument);
        }
        Ok((analyzed, function.returns.clone()))
    }

    fn analyze_object(&mut self, ast: &ast::ObjectExpr) -> Result<ir::Expr, AnalyzeError> {
        if let Some(name) = &ast.name {
            if Type::from_name(name).is_some() {
                return Err(AnalyzeError::new(format!(
                    "Object name '{}' collides with a builtin type.",
                    name
                )));
            }
        }

        let members = Scope::root();
        let ty = Type::Object(ObjectType {
            name: ast.name.clone(),
            members: members.clone(),
        });

        let fields = ast
            .fields
            .iter()
            .map(|field| self.analyze_let(field, &members))
            .collect::<Result<Vec<_>, _>>()?;

        let mut signatures = Vec::with_capacity(ast.methods.len());
        for method in &ast.methods {
            signatures.push(self.declare_function(method, &members)?);
        }
        let mut methods = Vec::with_capacity(ast.methods.len());
        for (method, (parameters, returns)) in ast.methods.iter().zip(signatures) {
            methods.push(self.analyze_function(method, parameters, returns, Some(ty.clone()))?);
        }

        Ok(ir::Expr::Object {
            name: ast.name.clone(),
            fields,
            methods,
            ty,
        })
    }

    fn analyze_block(&mut self, statements: &[ast::Stmt]) -> Result<Vec<ir::Stmt>, AnalyzeError> {
        let scope = self.scope.child();
        self.with_scope(scope, |analyzer| analyzer.analyze_body(statements))
    }

    /// Analyzes statements in the current scope.
    fn analyze_body(&mut self, statements: &[ast::Stmt]) -> Result<Vec<ir::Stmt>, AnalyzeError> {
        statements.iter().map(|stmt| self.analyze_stmt(stmt)).collect()
    }

    fn with_scope<R>(
        &mut self,
        scope: Scope<Type>,
        f: impl FnOnce(&mut Self) -> Result<R, AnalyzeError>,
    ) -> Result<R, AnalyzeError> {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }

    fn lookup(&self, name: &str) -> Result<Type, AnalyzeError> {
        self.scope
            .get(name, false)
            .ok_or_else(|| AnalyzeError::new(format!("'{}' is not defined.", name)))
    }
}

pub fn require_subtype(actual: &Type, expected: &Type) -> Result<(), AnalyzeError> {
    if actual.is_subtype_of(expected) {
        Ok(())
    } else {
        Err(AnalyzeError::new(format!(
            "Expected a subtype of {}, received {}.",
            expected, actual
        )))
    }
}

fn resolve_type(name: &str) -> Result<Type, AnalyzeError> {
    Type::from_name(name).ok_or_else(|| AnalyzeError::new(format!("Unknown type '{}'.", name)))
}

fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Nil => Type::Nil,
        Literal::Boolean(_) => Type::Boolean,
        Literal::Integer(_) => Type::Integer,
        Literal::Decimal(_) => Type::Decimal,
        Literal::Character(_) => Type::Character,
        Literal::String(_) => Type::String,
    }
}

/// Type of `name` on a receiver of type `receiver`. Only the object's own
/// members are visible.
fn member_type(receiver: &Type, name: &str) -> Result<Type, AnalyzeError> {
    match receiver {
        Type::Object(object) => object.members.get(name, true).ok_or_else(|| {
            AnalyzeError::new(format!("'{}' has no member '{}'.", receiver, name))
        }),
        Type::Dynamic => Ok(Type::Dynamic),
        other => Err(AnalyzeError::new(format!(
            "Members can only be accessed on objects, received {}.",
            other
        ))),
    }
}
