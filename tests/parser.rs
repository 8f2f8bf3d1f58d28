use lark::ast_printer::AstPrinter;
use lark::error::LarkError;
use lark::parser::Parser;
use lark::scanner::Scanner;
use lark::stmt::Stmt;
use lark::token::Token;

fn parse_source(source: &str) -> (Vec<Stmt>, Vec<LarkError>) {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("test source should lex cleanly");

    Parser::new(tokens).parse()
}

/// Parse a single statement and return its printed tree.
fn printed(source: &str) -> String {
    let (statements, errors) = parse_source(source);

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
    assert_eq!(statements.len(), 1, "expected exactly one statement");

    AstPrinter::print_stmt(&statements[0])
}

#[test]
fn subtraction_left_associates() {
    assert_eq!(printed("1 - 2 - 3;"), "(- (- 1.0 2.0) 3.0)");
}

#[test]
fn division_left_associates() {
    assert_eq!(printed("8 / 4 / 2;"), "(/ (/ 8.0 4.0) 2.0)");
}

#[test]
fn factor_binds_tighter_than_term() {
    assert_eq!(printed("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
}

#[test]
fn comparison_binds_tighter_than_equality() {
    assert_eq!(printed("1 < 2 == true;"), "(== (< 1.0 2.0) true)");
}

#[test]
fn unary_right_associates() {
    assert_eq!(printed("!!true;"), "(! (! true))");
    assert_eq!(printed("--1;"), "(- (- 1.0))");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(printed("(1 + 2) * 3;"), "(* (group (+ 1.0 2.0)) 3.0)");
}

#[test]
fn assignment_right_associates() {
    assert_eq!(printed("a = b = 1;"), "(= a (= b 1.0))");
}

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(printed("a or b and c;"), "(or a (and b c))");
}

#[test]
fn calls_chain_left_to_right() {
    assert_eq!(printed("f(1)(2);"), "(call (call f 1.0) 2.0)");
    assert_eq!(printed("f(a, b + 1);"), "(call f a (+ b 1.0))");
}

#[test]
fn var_declaration_forms() {
    assert_eq!(printed("var x = 1;"), "(var x 1.0)");
    assert_eq!(printed("var x;"), "(var x)");
}

#[test]
fn if_statement_forms() {
    assert_eq!(
        printed("if (a) print 1; else print 2;"),
        "(if a (print 1.0) (print 2.0))"
    );
    assert_eq!(printed("if (a) print 1;"), "(if a (print 1.0))");
}

#[test]
fn while_statement() {
    assert_eq!(
        printed("while (a < 3) a = a + 1;"),
        "(while (< a 3.0) (= a (+ a 1.0)))"
    );
}

#[test]
fn block_statement() {
    assert_eq!(printed("{ var a = 1; print a; }"), "(block (var a 1.0) (print a))");
}

#[test]
fn function_declaration() {
    assert_eq!(
        printed("fun add(a, b) { return a + b; }"),
        "(fun add (a b) (return (+ a b)))"
    );
    assert_eq!(printed("fun noop() {}"), "(fun noop ())");
}

#[test]
fn bare_return() {
    assert_eq!(printed("fun f() { return; }"), "(fun f () (return))");
}

#[test]
fn for_desugars_to_while() {
    assert_eq!(
        printed("for (var i = 0; i < 3; i = i + 1) print i;"),
        "(block (var i 0.0) (while (< i 3.0) (block (print i) (= i (+ i 1.0)))))"
    );
}

#[test]
fn for_with_empty_clauses_desugars_to_bare_while() {
    assert_eq!(printed("for (;;) print 1;"), "(while true (print 1.0))");
}

#[test]
fn missing_close_paren_is_an_error() {
    let (_, errors) = parse_source("(1 + 2;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Expect ')' after expression."));
}

#[test]
fn unexpected_token_at_primary_is_an_error() {
    let (_, errors) = parse_source("+ 1;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Expect expression."));
}

#[test]
fn invalid_assignment_target_is_reported() {
    let (statements, errors) = parse_source("1 = 2;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target."));
    // the statement still parses so later diagnostics aren't lost
    assert_eq!(statements.len(), 1);
}

#[test]
fn parser_recovers_at_statement_boundaries() {
    let (statements, errors) = parse_source("var = 1; var = 2; print 3;");

    assert_eq!(errors.len(), 2, "one error per bad declaration");
    assert_eq!(statements.len(), 1, "the good statement survives");
    assert_eq!(AstPrinter::print_stmt(&statements[0]), "(print 3.0)");
}

#[test]
fn class_tokens_are_rejected() {
    let (_, errors) = parse_source("class Foo {}");

    assert!(!errors.is_empty());
}
