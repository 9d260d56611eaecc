use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use plc_project::core::lexer::Lexer;
use plc_project::core::parser::{Parser, MAX_NESTING_DEPTH};
use plc_project::domain::ast::*;
use plc_project::utils::error::ParseError;
use std::str::FromStr;

fn parser(input: &str) -> Parser {
    Parser::new(Lexer::new(input).lex().expect("input should lex"))
}

fn stmt(input: &str) -> Result<Stmt, ParseError> {
    parser(input).parse_stmt()
}

fn expr(input: &str) -> Result<Expr, ParseError> {
    parser(input).parse_expr()
}

fn var(name: &str) -> Expr {
    Expr::Variable(name.to_string())
}

fn int(value: i64) -> Expr {
    Expr::Literal(Literal::Integer(BigInt::from(value)))
}

fn binary(operator: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::Binary(Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[test]
fn test_let_statement() {
    assert_eq!(
        stmt("LET name;").unwrap(),
        Stmt::Let(Let {
            name: "name".to_string(),
            type_name: None,
            value: None,
        })
    );
    assert_eq!(
        stmt("LET count: Integer = 1;").unwrap(),
        Stmt::Let(Let {
            name: "count".to_string(),
            type_name: Some("Integer".to_string()),
            value: Some(int(1)),
        })
    );
    assert!(stmt("LET name = expr").is_err());
    assert!(stmt("LET = 1;").is_err());
    assert!(stmt("LET IF = 1;").is_err());
}

#[test]
fn test_def_statement() {
    assert_eq!(
        stmt("DEF add(a: Integer, b): Integer DO RETURN a + b; END").unwrap(),
        Stmt::Def(Def {
            name: "add".to_string(),
            parameters: vec!["a".to_string(), "b".to_string()],
            parameter_types: vec![Some("Integer".to_string()), None],
            return_type: Some("Integer".to_string()),
            body: vec![Stmt::Return(Return {
                value: Some(binary(BinaryOperator::Add, var("a"), var("b"))),
            })],
        })
    );
    assert!(stmt("DEF name() DO stmt;").is_err());
    assert!(stmt("DEF name(a,) DO END").is_err());
    assert!(stmt("DEF name() stmt; END").is_err());
}

#[test]
fn test_if_statement() {
    assert_eq!(
        stmt("IF cond DO then; ELSE other; END").unwrap(),
        Stmt::If(If {
            condition: var("cond"),
            then_body: vec![Stmt::Expression(var("then"))],
            else_body: vec![Stmt::Expression(var("other"))],
        })
    );
    assert_eq!(
        stmt("IF cond DO END").unwrap(),
        Stmt::If(If {
            condition: var("cond"),
            then_body: vec![],
            else_body: vec![],
        })
    );
    assert!(stmt("IF cond then; END").is_err());
    assert!(stmt("IF cond DO then;").is_err());
}

#[test]
fn test_for_statement() {
    assert_eq!(
        stmt("FOR i IN list DO print(i); END").unwrap(),
        Stmt::For(For {
            name: "i".to_string(),
            expression: var("list"),
            body: vec![Stmt::Expression(Expr::Function(Function {
                name: "print".to_string(),
                arguments: vec![var("i")],
            }))],
        })
    );
    assert!(stmt("FOR i list DO END").is_err());
}

#[test]
fn test_return_and_assignment() {
    assert_eq!(stmt("RETURN;").unwrap(), Stmt::Return(Return { value: None }));
    assert_eq!(
        stmt("object.field = value;").unwrap(),
        Stmt::Assignment(Assignment {
            target: Expr::Property(Property {
                receiver: Box::new(var("object")),
                name: "field".to_string(),
            }),
            value: var("value"),
        })
    );
    assert!(stmt("RETURN value").is_err());
    assert!(stmt("variable = value").is_err());
}

#[test]
fn test_literals() {
    assert_eq!(expr("NIL").unwrap(), Expr::Literal(Literal::Nil));
    assert_eq!(expr("TRUE").unwrap(), Expr::Literal(Literal::Boolean(true)));
    assert_eq!(expr("1e3").unwrap(), int(1000));
    assert_eq!(expr("-12").unwrap(), int(-12));
    assert_eq!(
        expr("1.5e2").unwrap(),
        Expr::Literal(Literal::Decimal(BigDecimal::from_str("150").unwrap()))
    );
    assert_eq!(expr("'\\n'").unwrap(), Expr::Literal(Literal::Character('\n')));
    assert_eq!(expr("'\\'").unwrap(), Expr::Literal(Literal::Character('\\')));
    assert_eq!(
        expr("\"Hello,\\nWorld\"").unwrap(),
        Expr::Literal(Literal::String("Hello,\nWorld".to_string()))
    );
    assert!(expr("1e-2").is_err());
    assert!(expr("1e999999999").is_err());
}

#[test]
fn test_nesting_depth_is_limited() {
    let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert!(expr(&nested(MAX_NESTING_DEPTH - 1)).is_ok());

    let err = expr(&nested(MAX_NESTING_DEPTH + 10)).unwrap_err();
    assert_eq!(err.message, "Program is nested too deeply.");

    let blocks = format!("{}print(1);{}", "IF TRUE DO ".repeat(MAX_NESTING_DEPTH), " END".repeat(MAX_NESTING_DEPTH));
    assert!(parser(&blocks).parse_source().is_err());
}

#[test]
fn test_precedence_and_associativity() {
    assert_eq!(
        expr("a OR b AND c").unwrap(),
        binary(
            BinaryOperator::And,
            binary(BinaryOperator::Or, var("a"), var("b")),
            var("c")
        )
    );
    assert_eq!(
        expr("a + b * c < d").unwrap(),
        binary(
            BinaryOperator::Less,
            binary(
                BinaryOperator::Add,
                var("a"),
                binary(BinaryOperator::Multiply, var("b"), var("c"))
            ),
            var("d")
        )
    );
    assert_eq!(
        expr("a - b - c").unwrap(),
        binary(
            BinaryOperator::Subtract,
            binary(BinaryOperator::Subtract, var("a"), var("b")),
            var("c")
        )
    );
    assert_eq!(
        expr("(a - 1)").unwrap(),
        Expr::Group(Box::new(binary(BinaryOperator::Subtract, var("a"), int(1))))
    );
}

#[test]
fn test_calls_and_members() {
    assert_eq!(
        expr("object.method(1, x).field").unwrap(),
        Expr::Property(Property {
            receiver: Box::new(Expr::Method(Method {
                receiver: Box::new(var("object")),
                name: "method".to_string(),
                arguments: vec![int(1), var("x")],
            })),
            name: "field".to_string(),
        })
    );
    assert!(expr("function(a,)").is_err());
    assert!(expr("function(a").is_err());
    assert!(expr("object.").is_err());
}

#[test]
fn test_object_expression() {
    assert_eq!(
        expr("OBJECT Point DO LET x = 1; DEF get() DO RETURN this.x; END END").unwrap(),
        Expr::Object(ObjectExpr {
            name: Some("Point".to_string()),
            fields: vec![Let {
                name: "x".to_string(),
                type_name: None,
                value: Some(int(1)),
            }],
            methods: vec![Def {
                name: "get".to_string(),
                parameters: vec![],
                parameter_types: vec![],
                return_type: None,
                body: vec![Stmt::Return(Return {
                    value: Some(Expr::Property(Property {
                        receiver: Box::new(var("this")),
                        name: "x".to_string(),
                    })),
                })],
            }],
        })
    );
    assert!(matches!(expr("OBJECT DO END").unwrap(), Expr::Object(ObjectExpr { name: None, .. })));
    assert!(expr("OBJECT DO DEF f() DO END LET x; END").is_err());
}

#[test]
fn test_error_index_points_at_offending_token() {
    // LET x = 1 <end>
    let err = stmt("LET x = 1").unwrap_err();
    assert_eq!(err.index, 4);

    // print ( 1 , )
    let err = expr("print(1,)").unwrap_err();
    assert_eq!(err.index, 4);
}

#[test]
fn test_source() {
    let source = parser("LET x = 1; print(x);").parse_source().unwrap();
    assert_eq!(source.statements.len(), 2);
    assert!(parser("").parse_source().unwrap().statements.is_empty());
}
