use lark::interpreter::Interpreter;
use lark::parser::Parser;
use lark::resolver::Resolver;
use lark::scanner::Scanner;
use lark::token::Token;

/// Run `source` through the whole pipeline with a fresh interpreter and
/// return the program output, or the first diagnostic as a string.
fn run(source: &str) -> Result<String, String> {
    let mut tokens: Vec<Token> = Vec::new();

    for token in Scanner::new(source.as_bytes()) {
        tokens.push(token.map_err(|e| e.to_string())?);
    }

    let (statements, parse_errors) = Parser::new(tokens).parse();

    if !parse_errors.is_empty() {
        return Err(parse_errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"));
    }

    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut interpreter = Interpreter::new(&mut buffer);

        let resolve_errors = Resolver::new(&mut interpreter).resolve(&statements);

        if !resolve_errors.is_empty() {
            return Err(resolve_errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"));
        }

        interpreter.interpret(&statements).map_err(|e| e.to_string())?;
    }

    String::from_utf8(buffer).map_err(|e| e.to_string())
}

fn run_ok(source: &str) -> String {
    run(source).expect("program should run cleanly")
}

fn run_err(source: &str) -> String {
    run(source).expect_err("program should fail")
}

// ─────────────────────────────────────────────────────────────────────────
// Values and operators
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic_and_stringification() {
    assert_eq!(run_ok("print 1 + 2;"), "3\n");
    assert_eq!(run_ok("print 3.14 * 2;"), "6.28\n");
    assert_eq!(run_ok("print 10 / 4;"), "2.5\n");
    assert_eq!(run_ok("print 1 - 2 - 3;"), "-4\n");
}

#[test]
fn integral_numbers_print_without_fractional_tail() {
    assert_eq!(run_ok("print 3.0;"), "3\n");
    assert_eq!(run_ok("print 0.5;"), "0.5\n");
    assert_eq!(run_ok("print 2.5 + 2.5;"), "5\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn mixed_plus_operands_fail() {
    let err = run_err("print 1 + \"x\";");

    assert!(err.contains("Operands must be two numbers or two strings."));
}

#[test]
fn arithmetic_on_non_numbers_fails() {
    assert!(run_err("print 1 < \"a\";").contains("Operands must be numbers."));
    assert!(run_err("print \"a\" * 2;").contains("Operands must be numbers."));
    assert!(run_err("print -\"a\";").contains("Operand must be a number."));
}

#[test]
fn division_by_zero_follows_ieee754() {
    assert_eq!(run_ok("print 1 / 0;"), "inf\n");
    assert_eq!(run_ok("print -1 / 0;"), "-inf\n");
    assert_eq!(run_ok("print 0 / 0;"), "NaN\n");
}

#[test]
fn equality_never_errors() {
    assert_eq!(run_ok("print 1 == 1;"), "true\n");
    assert_eq!(run_ok("print 1 != 2;"), "true\n");
    assert_eq!(run_ok("print nil == nil;"), "true\n");
    assert_eq!(run_ok("print nil == false;"), "false\n");
    assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
    assert_eq!(run_ok("print true == 1;"), "false\n");
}

#[test]
fn comparisons_return_booleans() {
    assert_eq!(run_ok("print 1 < 2;"), "true\n");
    assert_eq!(run_ok("print 2 <= 2;"), "true\n");
    assert_eq!(run_ok("print 1 > 2;"), "false\n");
    assert_eq!(run_ok("print 3 >= 4;"), "false\n");
}

#[test]
fn truthiness_of_control_flow() {
    // only nil and false are falsy; 0 and "" are truthy
    assert_eq!(run_ok("if (0) print \"t\"; else print \"f\";"), "t\n");
    assert_eq!(run_ok("if (\"\") print \"t\"; else print \"f\";"), "t\n");
    assert_eq!(run_ok("if (nil) print \"t\"; else print \"f\";"), "f\n");
    assert_eq!(run_ok("if (false) print \"t\"; else print \"f\";"), "f\n");
}

#[test]
fn unary_bang_coerces_to_boolean() {
    assert_eq!(run_ok("print !nil;"), "true\n");
    assert_eq!(run_ok("print !0;"), "false\n");
    assert_eq!(run_ok("print !!\"\";"), "true\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Short-circuit evaluation
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn logical_operators_return_operands_unchanged() {
    assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
    assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
    assert_eq!(run_ok("print 1 and 2;"), "2\n");
    assert_eq!(run_ok("print nil and 2;"), "nil\n");
}

#[test]
fn and_short_circuits_side_effects() {
    let output = run_ok(
        "fun sideEffect() { print \"evaluated\"; return true; }\n\
         print false and sideEffect();",
    );

    assert_eq!(output, "false\n");
}

#[test]
fn or_short_circuits_side_effects() {
    let output = run_ok(
        "fun sideEffect() { print \"evaluated\"; return true; }\n\
         print true or sideEffect();",
    );

    assert_eq!(output, "true\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Variables and scope
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn var_without_initializer_is_nil() {
    assert_eq!(run_ok("var x; print x;"), "nil\n");
}

#[test]
fn assignment_is_an_expression_returning_the_value() {
    assert_eq!(run_ok("var x = 1; print x = 2;"), "2\n");
}

#[test]
fn scope_shadowing() {
    assert_eq!(run_ok("var x = 1; { var x = 2; print x; } print x;"), "2\n1\n");
}

#[test]
fn block_scope_is_discarded_on_exit() {
    assert_eq!(run_ok("var x = 1; { var x = 2; } print x;"), "1\n");
}

#[test]
fn assignment_in_block_reaches_outer_binding() {
    assert_eq!(run_ok("var x = 1; { x = 2; } print x;"), "2\n");
}

#[test]
fn undefined_variable_read_fails() {
    assert!(run_err("print missing;").contains("Undefined variable 'missing'."));
}

#[test]
fn undefined_variable_assignment_fails() {
    // assignment never implicitly defines
    assert!(run_err("missing = 1;").contains("Undefined variable 'missing'."));
}

#[test]
fn self_initializer_in_local_scope_is_rejected_statically() {
    let err = run_err("{ var a = a; }");

    assert!(err.contains("Can't read local variable in its own initializer."));
}

// ─────────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn while_loop_runs_to_completion() {
    let output = run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }");

    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn for_loop_desugars_and_runs() {
    let output = run_ok("for (var i = 0; i < 3; i = i + 1) print i;");

    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn while_with_falsy_condition_never_runs() {
    assert_eq!(run_ok("while (false) print \"never\"; print \"done\";"), "done\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Functions, returns, closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn fib_recursion() {
    let output = run_ok(
        "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
         print fib(10);",
    );

    assert_eq!(output, "55\n");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
}

#[test]
fn bare_return_yields_nil() {
    assert_eq!(run_ok("fun f() { return; print \"after\"; } print f();"), "nil\n");
}

#[test]
fn return_unwinds_nested_blocks() {
    let output = run_ok(
        "fun f() { { { return \"deep\"; } } }\n\
         print f();",
    );

    assert_eq!(output, "deep\n");
}

#[test]
fn function_values_print_by_name() {
    assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
}

#[test]
fn parameters_bind_left_to_right() {
    let output = run_ok(
        "fun pair(a, b) { print a; print b; }\n\
         pair(\"first\", \"second\");",
    );

    assert_eq!(output, "first\nsecond\n");
}

#[test]
fn arity_mismatch_fails() {
    let err = run_err("fun f(a) { return a; } f(1, 2);");

    assert!(err.contains("Expected 1 arguments but got 2."));
}

#[test]
fn calling_a_non_callable_fails() {
    assert!(run_err("\"not a function\"();").contains("Can only call functions and classes."));
    assert!(run_err("var x = 1; x();").contains("Can only call functions and classes."));
}

#[test]
fn closure_captures_definition_scope_not_call_scope() {
    let output = run_ok(
        "var a = \"global\";\n\
         {\n\
           fun showA() { print a; }\n\
           showA();\n\
           var a = \"block\";\n\
           showA();\n\
         }",
    );

    assert_eq!(output, "global\nglobal\n");
}

#[test]
fn closures_share_their_captured_environment() {
    let output = run_ok(
        "fun makeCounter() {\n\
           var count = 0;\n\
           fun increment() { count = count + 1; return count; }\n\
           return increment;\n\
         }\n\
         var counter = makeCounter();\n\
         print counter();\n\
         print counter();",
    );

    assert_eq!(output, "1\n2\n");
}

#[test]
fn sibling_closures_see_each_others_mutations() {
    let output = run_ok(
        "fun make() {\n\
           var x = 0;\n\
           fun get() { return x; }\n\
           fun set() { x = 2; }\n\
           set();\n\
           return get();\n\
         }\n\
         print make();",
    );

    assert_eq!(output, "2\n");
}

#[test]
fn each_call_gets_a_fresh_environment() {
    let output = run_ok(
        "fun makeCounter() {\n\
           var count = 0;\n\
           fun increment() { count = count + 1; return count; }\n\
           return increment;\n\
         }\n\
         var a = makeCounter();\n\
         var b = makeCounter();\n\
         print a();\n\
         print a();\n\
         print b();",
    );

    assert_eq!(output, "1\n2\n1\n");
}

#[test]
fn recursion_through_the_function_name_in_a_block() {
    let output = run_ok(
        "{\n\
           fun countdown(n) { if (n > 0) { print n; countdown(n - 1); } }\n\
           countdown(2);\n\
         }",
    );

    assert_eq!(output, "2\n1\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Built-ins
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn clock_returns_a_number() {
    assert_eq!(run_ok("print clock() >= 0;"), "true\n");
}

#[test]
fn clock_rejects_arguments() {
    assert!(run_err("clock(1);").contains("Expected 0 arguments but got 1."));
}

// ─────────────────────────────────────────────────────────────────────────
// Error propagation
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn runtime_error_carries_line_information() {
    let err = run_err("var x = 1;\nprint x + \"s\";");

    assert!(err.contains("[line 2]"), "got: {}", err);
}

#[test]
fn runtime_error_stops_interpretation() {
    // nothing after the failing statement runs, and output before it is kept
    let err = run_err("print 1 + nil;");

    assert!(err.contains("Operands must be two numbers or two strings."));
}

#[test]
fn output_is_deterministic() {
    let program = "fun twice(f, x) { return f(f(x)); }\n\
                   fun inc(n) { return n + 1; }\n\
                   print twice(inc, 40);";

    assert_eq!(run_ok(program), run_ok(program));
}
