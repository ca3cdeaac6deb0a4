use super::parse;
use crate::language::ast::{BinaryOp, Expr, Statement};
use crate::language::parser::parse_program;

fn assign_value(source: &str) -> Expr {
    let program = parse(source);
    match program.statements.into_iter().next() {
        Some(Statement::Assign(stmt)) => stmt.value,
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let value = assign_value("x = 1 + 2 * 3;");
    match value {
        Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        )),
        other => panic!("expected addition at the root, got {other:?}"),
    }
}

#[test]
fn comparison_binds_tighter_than_logical_and() {
    let value = assign_value("x = a < b && c < d;");
    match value {
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
            ..
        } => {
            assert!(matches!(*left, Expr::Binary { op: BinaryOp::Lt, .. }));
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Lt, .. }));
        }
        other => panic!("expected `&&` at the root, got {other:?}"),
    }
}

#[test]
fn ternary_chains_are_right_associative() {
    let value = assign_value("x = a ? 1 : b ? 2 : 3;");
    match value {
        Expr::Ternary { else_value, .. } => {
            assert!(matches!(*else_value, Expr::Ternary { .. }));
        }
        other => panic!("expected a ternary, got {other:?}"),
    }
}

#[test]
fn postfix_chains_nest_left_to_right() {
    let value = assign_value("x = a.b[0](1).c;");
    match value {
        Expr::FieldAccess { base, field, .. } => {
            assert_eq!(field, "c");
            assert!(matches!(*base, Expr::Call { .. }));
        }
        other => panic!("expected a property access at the root, got {other:?}"),
    }
}

#[test]
fn anonymous_function_is_an_expression() {
    let value = assign_value("callback = fn (x) { return x; };");
    match value {
        Expr::Function(func) => {
            assert!(func.decl.name.is_none());
            assert_eq!(func.decl.params.len(), 1);
        }
        other => panic!("expected a function literal, got {other:?}"),
    }
}

#[test]
fn trailing_commas_are_accepted_in_literals() {
    let program = parse(
        r#"
        items = [1, 2, 3,];
        config = { debug: true, level: 2, };
        "#,
    );
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn object_keys_may_be_string_literals() {
    let value = assign_value(r#"x = { "first name": "Ada" };"#);
    match value {
        Expr::ObjectLiteral { entries, .. } => {
            assert_eq!(entries[0].key, "first name");
        }
        other => panic!("expected an object literal, got {other:?}"),
    }
}

#[test]
fn comments_are_ignored() {
    let program = parse(
        r#"
        // leading comment
        x = 1; // trailing comment
        /* block
           comment */
        y = 2;
        "#,
    );
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn recovery_collects_one_error_per_bad_statement() {
    let result = parse_program("let = 5; x = ;");
    let errors = result.expect_err("expected syntax errors").errors;
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].message, "Expected binding name after 'let'");
    assert_eq!(errors[1].message, "Unexpected token in expression");
}

#[test]
fn error_spans_point_at_the_offending_token() {
    let source = "x = ;";
    let errors = parse_program(source)
        .expect_err("expected a syntax error")
        .errors;
    assert_eq!(errors[0].span.start, source.find(';').unwrap());
}

#[test]
fn literals_cannot_be_assigned_to() {
    let errors = parse_program("1 = 2;")
        .expect_err("expected a syntax error")
        .errors;
    assert_eq!(errors[0].message, "Invalid assignment target");
    assert!(errors[0].help.is_some());
}

#[test]
fn call_results_cannot_be_assigned_to() {
    let errors = parse_program("f() = 2;")
        .expect_err("expected a syntax error")
        .errors;
    assert_eq!(errors[0].message, "Invalid assignment target");
}

#[test]
fn unterminated_string_is_a_lex_error() {
    let errors = parse_program(r#"x = "abc"#)
        .expect_err("expected a lex error")
        .errors;
    assert_eq!(errors[0].message, "Unterminated string literal");
}

#[test]
fn unknown_escape_is_a_lex_error() {
    let errors = parse_program(r#"x = "a\qb";"#)
        .expect_err("expected a lex error")
        .errors;
    assert!(errors[0].message.starts_with("Unknown escape"));
}

#[test]
fn unknown_type_name_is_rejected_with_help() {
    let errors = parse_program("let x: widget = 1;")
        .expect_err("expected a syntax error")
        .errors;
    assert_eq!(errors[0].message, "Unknown type name `widget`");
    assert!(errors[0]
        .help
        .as_deref()
        .unwrap_or_default()
        .contains("number"));
}

#[test]
fn condition_parentheses_are_required() {
    let errors = parse_program("if x { print(x); }")
        .expect_err("expected a syntax error")
        .errors;
    assert_eq!(errors[0].message, "Expected '('");
}

#[test]
fn error_inside_a_block_does_not_lose_the_rest() {
    let errors = parse_program(
        r#"
        fn broken() {
            x = ;
            y = 1;
        }
        z = ;
        "#,
    )
    .expect_err("expected syntax errors")
    .errors;
    assert_eq!(errors.len(), 2);
}

#[test]
fn stray_semicolons_are_skipped() {
    let program = parse(";; x = 1; ;");
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn keywords_do_not_parse_as_identifiers() {
    assert!(parse_program("return = 1;").is_err());
}

#[test]
fn fn_followed_by_paren_starts_an_expression_statement() {
    // A named `fn` is a declaration; an anonymous one at statement position
    // is an ordinary expression and needs its semicolon.
    let program = parse("fn named() { return 1; } (fn () { return 2; })();");
    assert_eq!(program.statements.len(), 2);
    assert!(matches!(program.statements[0], Statement::Function(_)));
    assert!(matches!(program.statements[1], Statement::Expr(_)));
}
