use plc_project::check_source;
use plc_project::domain::ir;
use plc_project::domain::types::Type;
use plc_project::utils::error::PlcError;

fn analyze(input: &str) -> Result<ir::Source, PlcError> {
    check_source(input)
}

/// Type of the final expression statement in `input`.
fn type_of(input: &str) -> Type {
    let source = analyze(input).unwrap_or_else(|e| panic!("{:?} failed: {}", input, e));
    match source.statements.last() {
        Some(ir::Stmt::Expression(expr)) => expr.ty().clone(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

fn assert_rejected(input: &str) {
    match analyze(input) {
        Err(PlcError::AnalyzeError(_)) => {}
        other => panic!("{:?} should fail analysis, got {:?}", input, other),
    }
}

#[test]
fn test_let_types() {
    let source = analyze("LET a; LET b = 1; LET c: Decimal = 1.0; LET d: Any = \"s\";").unwrap();
    let types: Vec<Type> = source
        .statements
        .iter()
        .map(|stmt| match stmt {
            ir::Stmt::Let(let_stmt) => let_stmt.ty.clone(),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(types, vec![Type::Any, Type::Integer, Type::Decimal, Type::Any]);

    assert_rejected("LET x: String = 1;");
    assert_rejected("LET x: Unknown;");
    assert_rejected("LET x = 1; LET x = 2;");
}

#[test]
fn test_literal_and_binary_types() {
    assert_eq!(type_of("NIL;"), Type::Nil);
    assert_eq!(type_of("'c';"), Type::Character);
    assert_eq!(type_of("1 + 2;"), Type::Integer);
    assert_eq!(type_of("1.5 * 2.0;"), Type::Decimal);
    assert_eq!(type_of("\"a\" + 1;"), Type::String);
    assert_eq!(type_of("1 + \"a\";"), Type::String);
    assert_eq!(type_of("1 < 2;"), Type::Boolean);
    assert_eq!(type_of("\"a\" == \"b\";"), Type::Boolean);
    assert_eq!(type_of("TRUE AND FALSE;"), Type::Boolean);

    assert_rejected("1 + 1.0;");
    assert_rejected("TRUE + 1;");
    assert_rejected("1 < \"a\";");
    assert_rejected("TRUE < FALSE;");
    assert_rejected("1 AND TRUE;");
}

#[test]
fn test_dynamic_flows_through() {
    assert_eq!(type_of("log(1);"), Type::Dynamic);
    assert_eq!(type_of("log(1) + 1;"), Type::Dynamic);
    assert_eq!(type_of("log(1).anything(2);"), Type::Dynamic);
    assert!(analyze("LET x: Integer = log(1);").is_ok());
}

#[test]
fn test_functions() {
    assert!(analyze("DEF f(a: Integer): Integer DO RETURN a + 1; END f(1);").is_ok());
    assert_eq!(type_of("DEF f(a: Integer): Integer DO RETURN a; END f(1);"), Type::Integer);
    assert_eq!(type_of("DEF f(a) DO RETURN a; END f(\"x\");"), Type::Any);
    // Recursion sees its own signature.
    assert!(analyze("DEF f(n: Integer): Integer DO RETURN f(n - 1); END").is_ok());

    assert_rejected("DEF f(a: Integer) DO END f(\"x\");");
    assert_rejected("DEF f(a) DO END f();");
    assert_rejected("DEF f(a, a) DO END");
    assert_rejected("DEF f(): Integer DO RETURN \"s\"; END");
    assert_rejected("DEF f(): Integer DO RETURN; END");
    assert_rejected("LET f = 1; f();");
    assert_rejected("undefined(1);");
}

#[test]
fn test_builtins() {
    assert_eq!(type_of("print(1);"), Type::Nil);
    assert_eq!(type_of("list();"), Type::Iterable);
    assert_eq!(type_of("list(1, 'a', NIL);"), Type::Iterable);
    assert_eq!(type_of("range(1, 3);"), Type::Iterable);
    assert_rejected("range(1.0, 3);");
    assert_rejected("print();");
}

#[test]
fn test_control_flow() {
    assert!(analyze("IF TRUE DO LET x = 1; ELSE LET x = 2; END").is_ok());
    assert!(analyze("FOR i IN range(0, 3) DO print(i + 1); END").is_ok());

    assert_rejected("IF 1 DO END");
    assert_rejected("FOR i IN 5 DO END");
    assert_rejected("RETURN 1;");
    assert_rejected("IF TRUE DO LET x = 1; END x;");
}

#[test]
fn test_assignment() {
    assert!(analyze("LET x = 1; x = 2;").is_ok());
    assert!(analyze("LET o = OBJECT DO LET f = 1; END; o.f = 2;").is_ok());

    assert_rejected("x = 1;");
    assert_rejected("LET x = 1; x = \"s\";");
    assert_rejected("LET o = OBJECT DO LET f = 1; END; o.g = 2;");
    assert_rejected("1 = 2;");
}

#[test]
fn test_objects() {
    let program = "
        LET counter = OBJECT Counter DO
            LET count: Integer = 0;
            DEF next(): Integer DO
                this.count = this.count + 1;
                RETURN this.count;
            END
        END;
        counter.next();
    ";
    assert_eq!(type_of(program), Type::Integer);
    assert!(matches!(type_of("OBJECT DO END;"), Type::Object(_)));

    assert_rejected("OBJECT Integer DO END;");
    assert_rejected("OBJECT DO LET x; LET x; END;");
    assert_rejected("OBJECT DO LET f; DEF f() DO END END;");
    assert_rejected("LET o = OBJECT DO END; o.missing;");
    assert_rejected("LET o = OBJECT DO DEF m(a: Integer) DO END END; o.m(\"s\");");
    assert_rejected("1.field;");
    // Members are only reachable through `this`.
    assert_rejected("OBJECT DO LET x = 1; DEF m() DO RETURN x; END END;");
}

#[test]
fn test_methods_see_enclosing_scope() {
    assert!(analyze("LET y = 1; LET o = OBJECT DO DEF m() DO RETURN y; END END;").is_ok());
}

#[test]
fn test_object_types_compare_by_identity() {
    let program = "
        LET a = OBJECT DO END;
        LET b = OBJECT DO END;
        a = b;
    ";
    assert_rejected(program);
    assert!(analyze("LET a = OBJECT DO END; a = a;").is_ok());
}
