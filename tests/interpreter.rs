#[cfg(test)]
mod interpreter_tests {
    use brio::diagnostics::Diagnostics;
    use brio::error::{BrioError, Result};
    use brio::interpreter::Interpreter;
    use brio::parser::Parser;
    use brio::resolver::Resolver;
    use brio::runner::Runner;
    use brio::scanner::Scanner;
    use brio::stmt::Stmt;
    use brio::token::{Token, TokenType};
    use brio::value::Value;

    /// Scan + parse + resolve, asserting no static errors, then interpret.
    fn run_source(source: &str) -> (Interpreter, Result<()>) {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .map(|r| r.expect("scan error"))
            .collect();

        let mut diagnostics = Diagnostics::new();
        let statements = Parser::new(&tokens, &mut diagnostics).parse();
        assert!(!diagnostics.had_error(), "unexpected parse error");

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);
        assert!(!diagnostics.had_error(), "unexpected resolve error");

        let result = interpreter.interpret(&statements);
        (interpreter, result)
    }

    /// Run a program that is expected to succeed and read one global back.
    fn eval_global(source: &str, name: &str) -> Value {
        let (interpreter, result) = run_source(source);
        result.expect("unexpected runtime error");
        global(&interpreter, name)
    }

    fn global(interpreter: &Interpreter, name: &str) -> Value {
        let token = Token::new(TokenType::IDENTIFIER, name, 0);
        interpreter
            .globals()
            .borrow()
            .get(&token)
            .expect("undefined global")
    }

    /// Scan + parse + resolve only; true if a static error was reported.
    fn has_static_error(source: &str) -> bool {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .map(|r| r.expect("scan error"))
            .collect();

        let mut diagnostics = Diagnostics::new();
        let statements = Parser::new(&tokens, &mut diagnostics).parse();

        if !diagnostics.had_error() {
            let mut interpreter = Interpreter::new();
            Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);
        }

        diagnostics.had_error()
    }

    // ───────────────────────── numeric tower ─────────────────────────

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(eval_global("var r = 1 + 1;", "r"), Value::Integer(2));
        assert_eq!(eval_global("var r = 7 - 2;", "r"), Value::Integer(5));
        assert_eq!(eval_global("var r = 6 * 7;", "r"), Value::Integer(42));
        // integer division truncates
        assert_eq!(eval_global("var r = 7 / 2;", "r"), Value::Integer(3));
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_real() {
        assert_eq!(eval_global("var r = 1 + 1.0;", "r"), Value::Real(2.0));
        assert_eq!(eval_global("var r = 1.0 + 1;", "r"), Value::Real(2.0));
        assert_eq!(eval_global("var r = 7.0 / 2;", "r"), Value::Real(3.5));
    }

    #[test]
    fn test_string_concatenation_with_either_operand() {
        assert_eq!(
            eval_global(r#"var r = "a" + 1;"#, "r"),
            Value::Str("a1".to_string())
        );
        assert_eq!(
            eval_global(r#"var r = 1.0 + "b";"#, "r"),
            Value::Str("1.0b".to_string())
        );
        assert_eq!(
            eval_global(r#"var r = "x" + "y";"#, "r"),
            Value::Str("xy".to_string())
        );
    }

    #[test]
    fn test_comparisons_promote_to_real() {
        assert_eq!(eval_global("var r = 1 < 2.5;", "r"), Value::Bool(true));
        assert_eq!(eval_global("var r = 2 >= 2.0;", "r"), Value::Bool(true));
    }

    #[test]
    fn test_comparison_requires_numbers() {
        let (_, result) = run_source(r#"var r = "a" < "b";"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Operands must be numbers."));
    }

    #[test]
    fn test_integer_division_by_zero_is_an_error() {
        let (_, result) = run_source("var r = 1 / 0;");
        assert!(result.unwrap_err().to_string().contains("Division by zero."));
    }

    #[test]
    fn test_real_division_by_zero_is_infinity() {
        match eval_global("var r = 1.0 / 0.0;", "r") {
            Value::Real(n) => assert!(n.is_infinite()),
            other => panic!("expected real, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_keeps_the_domain() {
        assert_eq!(eval_global("var r = -3;", "r"), Value::Integer(-3));
        assert_eq!(eval_global("var r = -3.5;", "r"), Value::Real(-3.5));
    }

    // ─────────────────── equality and truthiness ─────────────────────

    #[test]
    fn test_equality_does_not_bridge_numeric_domains() {
        assert_eq!(eval_global("var r = 1 == 1.0;", "r"), Value::Bool(false));
        assert_eq!(eval_global("var r = 1 == 1;", "r"), Value::Bool(true));
        assert_eq!(eval_global("var r = 1.5 == 1.5;", "r"), Value::Bool(true));
    }

    #[test]
    fn test_nil_is_equal_only_to_itself() {
        assert_eq!(eval_global("var r = nil == nil;", "r"), Value::Bool(true));
        assert_eq!(eval_global("var r = nil == false;", "r"), Value::Bool(false));
        assert_eq!(eval_global("var r = nil != 0;", "r"), Value::Bool(true));
    }

    #[test]
    fn test_instances_compare_by_identity() {
        let source = "\
            class C {}\n\
            var a = C();\n\
            var b = C();\n\
            var same = a == a;\n\
            var different = a == b;";
        let (interpreter, result) = run_source(source);
        result.expect("runtime error");
        assert_eq!(global(&interpreter, "same"), Value::Bool(true));
        assert_eq!(global(&interpreter, "different"), Value::Bool(false));
    }

    #[test]
    fn test_truthiness() {
        // zero and the empty string are truthy; only nil and false are not
        assert_eq!(
            eval_global(r#"var r = "no"; if (0) r = "yes";"#, "r"),
            Value::Str("yes".to_string())
        );
        assert_eq!(
            eval_global(r#"var r = "no"; if ("") r = "yes";"#, "r"),
            Value::Str("yes".to_string())
        );
        assert_eq!(
            eval_global(r#"var r = "no"; if (nil) r = "yes";"#, "r"),
            Value::Str("no".to_string())
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            eval_global(r#"var r = nil or "fallback";"#, "r"),
            Value::Str("fallback".to_string())
        );
        assert_eq!(eval_global("var r = 1 and 2;", "r"), Value::Integer(2));
        assert_eq!(eval_global("var r = false and 2;", "r"), Value::Bool(false));
    }

    #[test]
    fn test_logical_and_short_circuits() {
        // the right side would be a runtime error if evaluated
        let source = "var r = false and missing;";
        assert_eq!(eval_global(source, "r"), Value::Bool(false));
    }

    // ───────────────────── control flow and loops ────────────────────

    #[test]
    fn test_for_loop_runs_in_native_order() {
        // init once; test before body; increment after body, before re-test
        let source = "\
            var out = \"\";\n\
            for (var i = 0; i < 3; i = i + 1) out = out + i;";
        assert_eq!(eval_global(source, "out"), Value::Str("012".to_string()));
    }

    #[test]
    fn test_for_loop_condition_checked_before_first_iteration() {
        let source = "\
            var ran = false;\n\
            for (var i = 9; i < 3; i = i + 1) ran = true;";
        assert_eq!(eval_global(source, "ran"), Value::Bool(false));
    }

    #[test]
    fn test_while_loop() {
        let source = "\
            var n = 0;\n\
            while (n < 5) n = n + 1;";
        assert_eq!(eval_global(source, "n"), Value::Integer(5));
    }

    #[test]
    fn test_return_unwinds_through_nested_blocks_and_loops() {
        let source = "\
            fun find() {\n\
                for (var i = 0; i < 10; i = i + 1) {\n\
                    if (i == 3) { return i; }\n\
                }\n\
                return -1;\n\
            }\n\
            var r = find();";
        assert_eq!(eval_global(source, "r"), Value::Integer(3));
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(eval_global("fun f() {} var r = f();", "r"), Value::Nil);
    }

    // ─────────────────── functions and closures ──────────────────────

    #[test]
    fn test_closure_captures_environment_by_reference() {
        let source = "\
            fun makeCounter() {\n\
                var count = 0;\n\
                fun bump() {\n\
                    count = count + 1;\n\
                    return count;\n\
                }\n\
                return bump;\n\
            }\n\
            var counter = makeCounter();\n\
            counter();\n\
            counter();\n\
            var r = counter();";
        assert_eq!(eval_global(source, "r"), Value::Integer(3));
    }

    #[test]
    fn test_two_counters_do_not_share_state() {
        let source = "\
            fun makeCounter() {\n\
                var count = 0;\n\
                fun bump() {\n\
                    count = count + 1;\n\
                    return count;\n\
                }\n\
                return bump;\n\
            }\n\
            var a = makeCounter();\n\
            var b = makeCounter();\n\
            a(); a();\n\
            var r = b();";
        assert_eq!(eval_global(source, "r"), Value::Integer(1));
    }

    #[test]
    fn test_binding_is_static_not_dynamic() {
        let source = "\
            var a = \"global\";\n\
            var first;\n\
            var second;\n\
            {\n\
                fun f() { return a; }\n\
                first = f();\n\
                var a = \"block\";\n\
                second = f();\n\
            }";
        let (interpreter, result) = run_source(source);
        result.expect("runtime error");
        assert_eq!(
            global(&interpreter, "first"),
            Value::Str("global".to_string())
        );
        assert_eq!(
            global(&interpreter, "second"),
            Value::Str("global".to_string())
        );
    }

    #[test]
    fn test_recursion_and_global_forward_reference() {
        let source = "\
            fun even(n) { if (n == 0) return true; return odd(n - 1); }\n\
            fun odd(n) { if (n == 0) return false; return even(n - 1); }\n\
            var r = even(10);";
        assert_eq!(eval_global(source, "r"), Value::Bool(true));
    }

    #[test]
    fn test_arity_mismatch_reports_both_counts_and_halts() {
        let source = "\
            var touched = false;\n\
            fun f(a, b) {}\n\
            f(1);\n\
            touched = true;";
        let (interpreter, result) = run_source(source);

        let err = result.unwrap_err();
        assert!(err
            .to_string()
            .contains("Expected 2 arguments but got 1."));

        // the statement after the failure never ran
        assert_eq!(global(&interpreter, "touched"), Value::Bool(false));
    }

    #[test]
    fn test_calling_a_non_callable_is_an_error() {
        let (_, result) = run_source("var x = 1; x();");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Can only call functions and classes."));
    }

    #[test]
    fn test_undefined_variable_is_a_runtime_error() {
        let (_, result) = run_source("var r = missing;");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Undefined variable 'missing'."));
    }

    // ───────────────────── classes and inheritance ───────────────────

    #[test]
    fn test_init_runs_through_superclass_chain() {
        let source = "\
            class A {\n\
                init(v) { this.v = v; }\n\
                get() { return this.v; }\n\
            }\n\
            class B < A {}\n\
            var r = B(5).get();";
        assert_eq!(eval_global(source, "r"), Value::Integer(5));
    }

    #[test]
    fn test_initializer_returns_the_instance() {
        let source = "\
            class P {\n\
                init() { this.ready = true; }\n\
            }\n\
            var p = P();\n\
            var r = p.ready;";
        assert_eq!(eval_global(source, "r"), Value::Bool(true));
    }

    #[test]
    fn test_fields_are_created_lazily_on_assignment() {
        let source = "\
            class D {}\n\
            var d = D();\n\
            d.answer = 41;\n\
            var r = d.answer + 1;";
        assert_eq!(eval_global(source, "r"), Value::Integer(42));
    }

    #[test]
    fn test_field_shadows_method() {
        let source = "\
            class C {\n\
                label() { return \"method\"; }\n\
            }\n\
            var c = C();\n\
            c.label = \"field\";\n\
            var r = c.label;";
        assert_eq!(eval_global(source, "r"), Value::Str("field".to_string()));
    }

    #[test]
    fn test_extracted_method_stays_bound_to_its_instance() {
        let source = "\
            class P {\n\
                init(n) { this.n = n; }\n\
                get() { return this.n; }\n\
            }\n\
            var m = P(9).get;\n\
            var r = m();";
        assert_eq!(eval_global(source, "r"), Value::Integer(9));
    }

    #[test]
    fn test_super_dispatches_one_level_up() {
        let source = "\
            class A {\n\
                greet() { return \"A\"; }\n\
            }\n\
            class B < A {\n\
                greet() { return \"B\" + super.greet(); }\n\
            }\n\
            var r = B().greet();";
        assert_eq!(eval_global(source, "r"), Value::Str("BA".to_string()));
    }

    #[test]
    fn test_super_skips_own_override_through_grandparent() {
        let source = "\
            class A {\n\
                who() { return \"A\"; }\n\
            }\n\
            class B < A {}\n\
            class C < B {\n\
                who() { return super.who(); }\n\
            }\n\
            var r = C().who();";
        assert_eq!(eval_global(source, "r"), Value::Str("A".to_string()));
    }

    #[test]
    fn test_property_access_on_non_instance_is_an_error() {
        let (_, result) = run_source("var x = 1; var r = x.y;");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Only instances have properties."));

        let (_, result) = run_source("var x = 1; x.y = 2;");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Only instances have fields."));
    }

    #[test]
    fn test_undefined_property_is_an_error() {
        let (_, result) = run_source("class C {} var r = C().missing;");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Undefined property 'missing'."));
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, result) = run_source("var NotAClass = 1; class E < NotAClass {}");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Superclass must be a class."));
    }

    #[test]
    fn test_constructor_arity_is_checked() {
        let source = "\
            class P { init(a, b) {} }\n\
            P(1);";
        let (_, result) = run_source(source);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Expected 2 arguments but got 1."));
    }

    // ───────────────────────── static errors ─────────────────────────

    #[test]
    fn test_self_reference_in_initializer_is_static() {
        assert!(has_static_error("var a = a;"));
    }

    #[test]
    fn test_self_reference_error_skips_interpretation() {
        let mut runner = Runner::new();
        runner.run(b"var a = a;");

        assert!(runner.had_error());
        assert!(!runner.had_runtime_error());
    }

    #[test]
    fn test_duplicate_declaration_in_same_scope_is_static() {
        assert!(has_static_error("fun f() { var x = 1; var x = 2; }"));
        assert!(has_static_error("var x = 1; var x = 2;"));
    }

    #[test]
    fn test_shadowing_in_nested_scope_is_fine() {
        assert!(!has_static_error("var x = 1; { var x = 2; }"));
    }

    #[test]
    fn test_this_outside_a_class_is_static() {
        assert!(has_static_error("var r = this;"));
        assert!(has_static_error("fun f() { return this; }"));
    }

    #[test]
    fn test_super_outside_a_subclass_is_static() {
        assert!(has_static_error("class C { m() { return super.m(); } }"));
        assert!(has_static_error("fun f() { return super.m(); }"));
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        assert!(has_static_error("class A < A {}"));
    }

    #[test]
    fn test_returning_a_value_from_an_initializer_is_static() {
        assert!(has_static_error("class C { init() { return 1; } }"));
        // a bare return is allowed
        assert!(!has_static_error("class C { init() { return; } }"));
    }

    #[test]
    fn test_top_level_return_of_non_number_is_static() {
        assert!(has_static_error("return \"not a status\";"));
    }

    #[test]
    fn test_resolver_is_idempotent() {
        let tokens: Vec<Token> = Scanner::new(
            b"var a = 1;\n\
              fun outer() {\n\
                  var b = a;\n\
                  fun inner() { return a + b; }\n\
                  return inner;\n\
              }\n\
              class C < Object {}\n",
        )
        .map(|r| r.expect("scan error"))
        .collect();

        let mut diagnostics = Diagnostics::new();
        let statements: Vec<Stmt> = Parser::new(&tokens, &mut diagnostics).parse();
        assert!(!diagnostics.had_error());

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);
        let first = interpreter.bindings().clone();
        assert!(!first.is_empty());

        Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);
        assert_eq!(*interpreter.bindings(), first);
    }

    // ─────────────────────── value formatting ────────────────────────

    #[test]
    fn test_canonical_formatting_through_concatenation() {
        assert_eq!(
            eval_global(r#"var r = "" + 2;"#, "r"),
            Value::Str("2".to_string())
        );
        assert_eq!(
            eval_global(r#"var r = "" + 2.0;"#, "r"),
            Value::Str("2.0".to_string())
        );
        assert_eq!(
            eval_global(r#"var r = "" + true;"#, "r"),
            Value::Str("true".to_string())
        );
        assert_eq!(
            eval_global(r#"var r = "" + nil;"#, "r"),
            Value::Str("nil".to_string())
        );
    }

    #[test]
    fn test_functions_classes_and_instances_format() {
        let source = "\
            class C {}\n\
            fun f() {}\n\
            var fn_text = \"\" + f;\n\
            var class_text = \"\" + C;\n\
            var inst_text = \"\" + C();\n\
            var native_text = \"\" + clock;";
        let (interpreter, result) = run_source(source);
        result.expect("runtime error");
        assert_eq!(
            global(&interpreter, "fn_text"),
            Value::Str("<fn f>".to_string())
        );
        assert_eq!(
            global(&interpreter, "class_text"),
            Value::Str("C".to_string())
        );
        assert_eq!(
            global(&interpreter, "inst_text"),
            Value::Str("C instance".to_string())
        );
        assert_eq!(
            global(&interpreter, "native_text"),
            Value::Str("<native fn clock>".to_string())
        );
    }

    // ─────────────────────── native functions ────────────────────────

    #[test]
    fn test_clock_returns_a_real() {
        match eval_global("var r = clock();", "r") {
            Value::Real(n) => assert!(n > 0.0),
            other => panic!("expected real timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_print_returns_nil_and_takes_one_argument() {
        assert_eq!(eval_global("var r = print(1);", "r"), Value::Nil);

        let (_, result) = run_source("print();");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Expected 1 arguments but got 0."));
    }

    #[test]
    fn test_runtime_error_carries_the_offending_line() {
        let (_, result) = run_source("var ok = 1;\nvar r = 1 / 0;");
        match result.unwrap_err() {
            BrioError::Runtime { line, .. } => assert_eq!(line, 2),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }
}
