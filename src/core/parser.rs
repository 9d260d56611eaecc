//! Recursive descent parser.
//!
//! Each grammar rule has a dedicated method and operator precedence is
//! encoded by which rule calls which. [`TokenStream`] plays the role the
//! character stream plays in the lexer: `peek` and `accept` match tokens
//! either by kind or by exact literal.

use crate::domain::ast::{
    Assignment, Binary, BinaryOperator, Def, Expr, For, Function, If, Let, Literal, Method,
    ObjectExpr, Property, Return, Source, Stmt,
};
use crate::domain::model::{is_keyword, Token, TokenKind};
use crate::utils::error::ParseError;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::str::FromStr;

/// Largest exponent accepted on an integer literal such as `1e3`.
pub const MAX_INTEGER_EXPONENT: u32 = 4096;

/// Deepest nesting of blocks and expressions the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 128;

type Rule = fn(&mut Parser) -> Result<Expr, ParseError>;

pub struct Parser {
    tokens: TokenStream,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: TokenStream::new(tokens),
            depth: 0,
        }
    }

    pub fn parse_source(&mut self) -> Result<Source, ParseError> {
        let mut statements = Vec::new();
        while self.tokens.has(0) {
            statements.push(self.parse_stmt()?);
        }
        Ok(Source { statements })
    }

    pub fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.nested(Self::parse_any_stmt)
    }

    fn parse_any_stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.tokens.accept_literal("LET") {
            self.parse_let_stmt().map(Stmt::Let)
        } else if self.tokens.accept_literal("DEF") {
            self.parse_def_stmt().map(Stmt::Def)
        } else if self.tokens.accept_literal("IF") {
            self.parse_if_stmt()
        } else if self.tokens.accept_literal("FOR") {
            self.parse_for_stmt()
        } else if self.tokens.accept_literal("RETURN") {
            self.parse_return_stmt()
        } else {
            self.parse_expression_or_assignment_stmt()
        }
    }

    fn parse_let_stmt(&mut self) -> Result<Let, ParseError> {
        let name = self.expect_name("a variable name after LET")?;
        let type_name = self.parse_type_annotation()?;
        let value = if self.tokens.accept_literal("=") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_literal(";", "to end the LET statement")?;
        Ok(Let {
            name,
            type_name,
            value,
        })
    }

    fn parse_def_stmt(&mut self) -> Result<Def, ParseError> {
        let name = self.expect_name("a function name after DEF")?;
        self.expect_literal("(", "to open the parameter list")?;

        let mut parameters = Vec::new();
        let mut parameter_types = Vec::new();
        if !self.tokens.accept_literal(")") {
            loop {
                parameters.push(self.expect_name("a parameter name")?);
                parameter_types.push(self.parse_type_annotation()?);
                if self.tokens.accept_literal(")") {
                    break;
                }
                self.expect_literal(",", "between parameters")?;
            }
        }

        let return_type = self.parse_type_annotation()?;
        self.expect_literal("DO", "to open the function body")?;
        let body = self.parse_block(&["END"])?;
        self.expect_literal("END", "to close the function body")?;
        Ok(Def {
            name,
            parameters,
            parameter_types,
            return_type,
            body,
        })
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let condition = self.parse_expr()?;
        self.expect_literal("DO", "after the IF condition")?;
        let then_body = self.parse_block(&["ELSE", "END"])?;
        let else_body = if self.tokens.accept_literal("ELSE") {
            self.parse_block(&["END"])?
        } else {
            Vec::new()
        };
        self.expect_literal("END", "to close the IF statement")?;
        Ok(Stmt::If(If {
            condition,
            then_body,
            else_body,
        }))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect_name("a loop variable after FOR")?;
        self.expect_literal("IN", "after the loop variable")?;
        let expression = self.parse_expr()?;
        self.expect_literal("DO", "to open the loop body")?;
        let body = self.parse_block(&["END"])?;
        self.expect_literal("END", "to close the FOR statement")?;
        Ok(Stmt::For(For {
            name,
            expression,
            body,
        }))
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let value = if self.tokens.peek_literal(";") {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_literal(";", "to end the RETURN statement")?;
        Ok(Stmt::Return(Return { value }))
    }

    fn parse_expression_or_assignment_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expression = self.parse_expr()?;
        if self.tokens.accept_literal("=") {
            let value = self.parse_expr()?;
            self.expect_literal(";", "to end the assignment")?;
            return Ok(Stmt::Assignment(Assignment {
                target: expression,
                value,
            }));
        }
        self.expect_literal(";", "to end the expression statement")?;
        Ok(Stmt::Expression(expression))
    }

    /// Statements up to (not including) one of `terminators`.
    fn parse_block(&mut self, terminators: &[&str]) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !terminators.iter().any(|t| self.tokens.peek_literal(t)) {
            if !self.tokens.has(0) {
                return Err(self.error(format!("Expected '{}' before end of input.", terminators.join("' or '"))));
            }
            statements.push(self.parse_stmt()?);
        }
        Ok(statements)
    }

    fn parse_type_annotation(&mut self) -> Result<Option<String>, ParseError> {
        if self.tokens.accept_literal(":") {
            Ok(Some(self.expect_name("a type name after ':'")?))
        } else {
            Ok(None)
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_logical_expr)
    }

    fn parse_logical_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&["AND", "OR"], Self::parse_comparison_expr)
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&["<", "<=", ">", ">=", "==", "!="], Self::parse_additive_expr)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&["+", "-"], Self::parse_multiplicative_expr)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&["*", "/"], Self::parse_secondary_expr)
    }

    /// Left associative chain of `operand (operator operand)*`.
    fn parse_binary(&mut self, operators: &[&str], operand: Rule) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;
        while let Some(operator) = self.accept_operator(operators) {
            let right = operand(self)?;
            left = Expr::Binary(Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn accept_operator(&mut self, operators: &[&str]) -> Option<BinaryOperator> {
        let literal = operators.iter().find(|op| self.tokens.peek_literal(op))?;
        self.tokens.index += 1;
        BinaryOperator::from_literal(literal)
    }

    fn parse_secondary_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expression = self.parse_primary_expr()?;
        while self.tokens.accept_literal(".") {
            let name = self.expect_name("a member name after '.'")?;
            expression = if self.tokens.accept_literal("(") {
                let arguments = self.parse_arguments()?;
                Expr::Method(Method {
                    receiver: Box::new(expression),
                    name,
                    arguments,
                })
            } else {
                Expr::Property(Property {
                    receiver: Box::new(expression),
                    name,
                })
            };
        }
        Ok(expression)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        if self.tokens.peek_literal("NIL")
            || self.tokens.peek_literal("TRUE")
            || self.tokens.peek_literal("FALSE")
            || self.tokens.peek(&[Pattern::Kind(TokenKind::Integer)])
            || self.tokens.peek(&[Pattern::Kind(TokenKind::Decimal)])
            || self.tokens.peek(&[Pattern::Kind(TokenKind::Character)])
            || self.tokens.peek(&[Pattern::Kind(TokenKind::String)])
        {
            self.parse_literal_expr()
        } else if self.tokens.accept_literal("(") {
            self.parse_group_expr()
        } else if self.tokens.accept_literal("OBJECT") {
            self.parse_object_expr()
        } else if self.peek_name() {
            self.parse_variable_or_function_expr()
        } else {
            Err(self.error("Expected an expression."))
        }
    }

    fn parse_literal_expr(&mut self) -> Result<Expr, ParseError> {
        let index = self.tokens.index;
        let token = self.tokens.next().ok_or_else(|| self.error("Expected a literal."))?;
        let literal = match (token.kind, token.literal.as_str()) {
            (TokenKind::Identifier, "NIL") => Literal::Nil,
            (TokenKind::Identifier, "TRUE") => Literal::Boolean(true),
            (TokenKind::Identifier, "FALSE") => Literal::Boolean(false),
            (TokenKind::Integer, text) => {
                Literal::Integer(parse_integer(text).map_err(|message| ParseError::new(message, index))?)
            }
            (TokenKind::Decimal, text) => {
                let text = text.strip_prefix('+').unwrap_or(text);
                let value = BigDecimal::from_str(text)
                    .map_err(|_| ParseError::new("Invalid decimal literal.", index))?;
                Literal::Decimal(value)
            }
            (TokenKind::Character, text) => {
                let value = unescape(&text[1..text.len() - 1]);
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Literal::Character(c),
                    _ => return Err(ParseError::new("Invalid character literal.", index)),
                }
            }
            (TokenKind::String, text) => Literal::String(unescape(&text[1..text.len() - 1])),
            _ => return Err(ParseError::new("Expected a literal.", index)),
        };
        Ok(Expr::Literal(literal))
    }

    fn parse_group_expr(&mut self) -> Result<Expr, ParseError> {
        let expression = self.parse_expr()?;
        self.expect_literal(")", "to close the group")?;
        Ok(Expr::Group(Box::new(expression)))
    }

    fn parse_object_expr(&mut self) -> Result<Expr, ParseError> {
        let name = if self.peek_name() && self.tokens.peek(&[Pattern::Kind(TokenKind::Identifier), Pattern::Literal("DO")]) {
            Some(self.expect_name("an object name")?)
        } else {
            None
        };
        self.expect_literal("DO", "to open the object body")?;

        let mut fields = Vec::new();
        while self.tokens.accept_literal("LET") {
            fields.push(self.parse_let_stmt()?);
        }
        let mut methods = Vec::new();
        while self.tokens.accept_literal("DEF") {
            methods.push(self.parse_def_stmt()?);
        }

        if self.tokens.peek_literal("LET") {
            return Err(self.error("Object fields must be declared before methods."));
        }
        self.expect_literal("END", "to close the object")?;
        Ok(Expr::Object(ObjectExpr {
            name,
            fields,
            methods,
        }))
    }

    fn parse_variable_or_function_expr(&mut self) -> Result<Expr, ParseError> {
        let name = self.expect_name("a name")?;
        if self.tokens.accept_literal("(") {
            let arguments = self.parse_arguments()?;
            return Ok(Expr::Function(Function { name, arguments }));
        }
        Ok(Expr::Variable(name))
    }

    /// Arguments after an already consumed `(`, through the closing `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut arguments = Vec::new();
        if self.tokens.accept_literal(")") {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expr()?);
            if self.tokens.accept_literal(")") {
                return Ok(arguments);
            }
            self.expect_literal(",", "or ')' after an argument")?;
        }
    }

    fn peek_name(&self) -> bool {
        self.tokens
            .get(0)
            .is_some_and(|t| t.kind == TokenKind::Identifier && !is_keyword(&t.literal))
    }

    fn expect_name(&mut self, description: &str) -> Result<String, ParseError> {
        if !self.peek_name() {
            return Err(self.error(format!("Expected {}.", description)));
        }
        match self.tokens.next() {
            Some(token) => Ok(token.literal),
            None => Err(self.error(format!("Expected {}.", description))),
        }
    }

    fn expect_literal(&mut self, literal: &str, context: &str) -> Result<(), ParseError> {
        if self.tokens.accept_literal(literal) {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}' {}.", literal, context)))
        }
    }

    /// Runs `rule` one level deeper, failing past [`MAX_NESTING_DEPTH`].
    fn nested<T>(&mut self, rule: fn(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("Program is nested too deeply."));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.tokens.index)
    }
}

/// Integer literals may carry a non-negative exponent, as in `1e3`.
fn parse_integer(text: &str) -> Result<BigInt, &'static str> {
    let (mantissa, exponent) = match text.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (text, None),
    };
    let mantissa = mantissa.strip_prefix('+').unwrap_or(mantissa);
    let value = BigInt::from_str(mantissa).map_err(|_| "Invalid integer literal.")?;

    match exponent {
        None => Ok(value),
        Some(exponent) => {
            let exponent = exponent.strip_prefix('+').unwrap_or(exponent);
            if exponent.starts_with('-') {
                return Err("Integer literals cannot have a negative exponent.");
            }
            let exponent = exponent
                .parse::<u32>()
                .ok()
                .filter(|exponent| *exponent <= MAX_INTEGER_EXPONENT)
                .ok_or("Integer literal exponent is too large.")?;
            Ok(value * BigInt::from(10u32).pow(exponent))
        }
    }
}

fn unescape(body: &str) -> String {
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => result.push('\u{8}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

#[derive(Debug, Clone, Copy)]
enum Pattern<'a> {
    Kind(TokenKind),
    Literal(&'a str),
}

struct TokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl TokenStream {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    fn has(&self, offset: usize) -> bool {
        self.index + offset < self.tokens.len()
    }

    fn get(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }

    /// True if the next tokens match the patterns one for one. A kind
    /// pattern matches any token of that kind; a literal pattern matches
    /// the token text exactly.
    fn peek(&self, patterns: &[Pattern<'_>]) -> bool {
        patterns.iter().enumerate().all(|(offset, pattern)| {
            self.get(offset).is_some_and(|token| match pattern {
                Pattern::Kind(kind) => token.kind == *kind,
                Pattern::Literal(literal) => token.literal == *literal,
            })
        })
    }

    fn peek_literal(&self, literal: &str) -> bool {
        self.peek(&[Pattern::Literal(literal)])
    }

    fn accept_literal(&mut self, literal: &str) -> bool {
        let matched = self.peek_literal(literal);
        if matched {
            self.index += 1;
        }
        matched
    }
}
