//! Integration tests for the Glint pipeline
//!
//! Tests the full pipeline from source text:
//! - Binding and binder diagnostics
//! - Lowering of structured control flow
//! - Evaluation of the lowered program
//! - Runtime diagnostics and error policy

use glint::binder::bind;
use glint::config::RuntimeConfig;
use glint::error::{BindErrorKind, CompileError, Diagnostics};
use glint::interp::{ErrorKind, Evaluator, Value};
use glint::lexer::tokenize;
use glint::lower::lower;
use glint::parser::parse;
use glint::symbols::{SymbolIds, SymbolTable};
use glint::{Config, Session};

/// Helper to run a program from `main::main`, capturing its output
fn run_with(config: Config, source: &str) -> (glint::Result<Value>, String, Session) {
    let mut session = Session::new(config);
    let mut out = Vec::new();
    let result = session
        .run_source_with_output(source, &mut out)
        .map(|execution| execution.value);
    (result, String::from_utf8(out).unwrap(), session)
}

/// Helper to run a program that must succeed; returns value and output
fn run(source: &str) -> (Value, String) {
    let (result, out, session) = run_with(Config::default(), source);
    let value = result.unwrap_or_else(|e| panic!("run failed: {e}\n{:?}", session.diagnostics()));
    (value, out)
}

/// Helper to collect binder diagnostic kinds of a program
fn bind_errors(source: &str) -> Vec<BindErrorKind> {
    let mut session = Session::new(Config::default());
    let _ = session.run_source_with_output(source, &mut Vec::new());
    session
        .diagnostics()
        .errors()
        .filter_map(CompileError::bind_kind)
        .collect()
}

/// Helper to bind and lower a program and return its listing
fn listing(source: &str) -> String {
    let tokens = tokenize(source).unwrap();
    let program = parse("test.gl", source, tokens).unwrap();
    let mut session = Session::new(Config::default());
    session.bind(&[program]).unwrap();
    session.lower().unwrap();
    session.listing()
}

/// Helper to bind and lower several files, in the given order
fn lowered_session(config: Config, files: &[&str]) -> Session {
    let programs: Vec<_> = files
        .iter()
        .map(|source| parse("test.gl", source, tokenize(source).unwrap()).unwrap())
        .collect();
    let mut session = Session::new(config);
    session.bind(&programs).unwrap();
    session.lower().unwrap();
    session
}

// ============================================
// Scenarios
// ============================================

#[test]
fn test_sum_of_locals() {
    let (value, _) = run("function main() int { var x int <- 2; var y int <- 3; return x + y; }");
    assert_eq!(value, Value::Int(5));
}

#[test]
fn test_loop_prints_three_times() {
    let source = r#"load sys; function main() { loop(3) { sys::Print("hi") } }"#;
    let (_, out) = run(source);
    assert_eq!(out, "hi\nhi\nhi\n");

    let listing = listing(source);
    assert!(listing.contains("var __bound int <- 3"), "{listing}");
    assert!(listing.contains("approach __iterator -> __bound"), "{listing}");
    assert!(!listing.contains("loop"), "{listing}");
}

#[test]
fn test_index_out_of_bounds_recovers() {
    let source = "function main() int { var arr <- make array[int] { 1, 2, 3 }; return arr[5] }";
    let (result, _, session) = run_with(Config::default(), source);
    assert_eq!(result.unwrap(), Value::Int(0));

    let errors: Vec<_> = session.diagnostics().errors().collect();
    assert_eq!(errors.len(), 1);
    let CompileError::Runtime(err) = errors[0] else {
        panic!("expected a runtime diagnostic, got {:?}", errors[0]);
    };
    assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
    assert!(err.span.is_some());
}

#[test]
fn test_explicit_narrowing_wraps() {
    let (value, _) = run("function main() byte { var x byte <- byte(300); return x }");
    assert_eq!(value, Value::Byte(44));
}

// An initializer only takes implicit conversions, so the narrowing from the
// `int(300)` result to `byte` is rejected rather than wrapped.
#[test]
fn test_int_initializer_for_byte_needs_explicit_cast() {
    assert_eq!(
        bind_errors("function main() { var x byte <- int(300) }"),
        vec![BindErrorKind::MissingExplicitCast]
    );
}

#[test]
fn test_duplicate_function_keeps_first() {
    let source = "function calc() int { return 1 } function calc() int { return 2 }";
    let tokens = tokenize(source).unwrap();
    let program = parse("test.gl", source, tokens).unwrap();
    let mut table = SymbolTable::new();
    let mut ids = SymbolIds::new();
    let mut diagnostics = Diagnostics::new();
    let mut bound = bind(&[program], &mut table, &mut ids, &mut diagnostics);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics.count_kind(BindErrorKind::DuplicateSymbol), 1);
    assert_eq!(bound.len(), 1);

    lower(&mut bound, &mut ids);
    let calc = table.package("main").unwrap().function("calc").unwrap().clone();
    let config = RuntimeConfig::default();
    let mut out = Vec::new();
    let execution = Evaluator::new(&bound, &table, &config, &mut out)
        .run(&calc)
        .unwrap();
    assert_eq!(execution.value, Value::Int(1));
}

// ============================================
// Lowering Preserves Semantics
// ============================================

#[test]
fn test_while_with_break_and_continue() {
    let source = r#"
        load sys;
        function main() int {
            var i <- 0
            var sum <- 0
            while (true) {
                i <- i + 1
                if (i > 10) break
                if (i % 2 == 0) continue
                sum <- sum + i
            }
            return sum
        }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(1 + 3 + 5 + 7 + 9));
}

#[test]
fn test_for_continue_runs_action() {
    let source = r#"
        load sys;
        function main() {
            for (var i <- 0; i < 5; i <- i + 1) {
                if (i == 2) continue
                if (i == 4) break
                sys::Print(string(i))
            }
        }
    "#;
    let (_, out) = run(source);
    assert_eq!(out, "0\n1\n3\n");
}

#[test]
fn test_from_to_excludes_upper_bound() {
    let source = r#"
        load sys;
        function main() {
            from i <- 0 to 4 { sys::Write(string(i)) }
            sys::Write("|")
            from j <- 3 to 0 { sys::Write(string(j)) }
            sys::Write("|")
            from k <- 2 to 2 { sys::Write("never") }
        }
    "#;
    let (_, out) = run(source);
    assert_eq!(out, "0123|321|");
}

#[test]
fn test_from_to_bound_is_evaluated_once() {
    let source = r#"
        load sys;
        var calls int <- 0
        function limit() int { calls <- calls + 1; return 3 }
        function main() int {
            var n <- 0
            from i <- 0 to limit() { n <- n + 1 }
            return n * 10 + calls
        }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(31));
}

#[test]
fn test_loop_with_break() {
    let source = r#"
        function main() int {
            var count <- 0
            loop(100) {
                count <- count + 1
                if (count == 7) break
            }
            return count
        }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(7));
}

#[test]
fn test_nested_break_leaves_inner_loop_only() {
    let source = r#"
        load sys;
        function main() {
            from i <- 0 to 3 {
                from j <- 0 to 3 {
                    if (j == 1) break
                    sys::Write(string(i) + string(j) + " ")
                }
            }
        }
    "#;
    let (_, out) = run(source);
    assert_eq!(out, "00 10 20 ");
}

#[test]
fn test_if_else_chain() {
    let source = r#"
        function classify(n int) string {
            if (n < 0) return "negative"
            else if (n == 0) return "zero"
            else return "positive"
        }
        load sys;
        function main() {
            sys::Print(classify(-4))
            sys::Print(classify(0))
            sys::Print(classify(9))
        }
    "#;
    let (_, out) = run(source);
    assert_eq!(out, "negative\nzero\npositive\n");
}

#[test]
fn test_declarations_in_loop_body_are_fresh_each_iteration() {
    let source = r#"
        function main() int {
            var total <- 0
            loop(4) {
                var step int
                step <- step + 1
                total <- total + step
            }
            return total
        }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(4));
}

#[test]
fn test_from_to_listing() {
    let listing = listing("function main() { from i <- 0 to 3 { } }");
    insta::assert_snapshot!(listing, @r"
    function main::main() void
        var __bound int <- 3
        var i int <- 0
        goto L2
    L3:
    L1:
        approach i -> __bound
    L2:
        gotoif (i != __bound) L3
    L0:
        delete i
        delete __bound
    ");
}

// ============================================
// Values and Runtime
// ============================================

#[test]
fn test_arrays_alias() {
    let source = r#"
        function fill(a array[int]) { a[0] <- 7 }
        function main() int {
            var a <- make array[int](2)
            var b <- a
            b[1] <- 5
            fill(a)
            return a[0] + a[1]
        }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(12));
}

#[test]
fn test_shadowing_in_nested_block() {
    let source = r#"
        function main() int {
            var x <- 1
            { var x <- 2; x <- x + 40 }
            return x
        }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(1));
}

#[test]
fn test_globals_are_shared_between_calls() {
    let source = r#"
        var counter int <- 10
        var doubled <- counter * 2
        function bump() { counter <- counter + 1 }
        function main() int { bump(); bump(); return counter + doubled }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(32));
}

#[test]
fn test_packages_and_includes() {
    let util = "package util; function Twice(x int) int { return x * 2 }";
    let main = "load util include; function main() int { return Twice(4) + util::Twice(1) }";
    let programs: Vec<_> = [util, main]
        .iter()
        .map(|source| parse("test.gl", source, tokenize(source).unwrap()).unwrap())
        .collect();

    let mut session = Session::new(Config::default());
    session.bind(&programs).unwrap();
    session.lower().unwrap();
    let execution = session
        .evaluate_with_output("main", "main", &mut Vec::new())
        .unwrap();
    assert_eq!(execution.value, Value::Int(10));
}

#[test]
fn test_loaded_package_globals_initialize_first() {
    let main = "load lib include; var x int <- base_value(); function main() int { return x }";
    let lib = "package lib; var base int <- 10; function base_value() int { return base }";
    let mut session = lowered_session(Config::default(), &[main, lib]);
    let execution = session
        .evaluate_with_output("main", "main", &mut Vec::new())
        .unwrap();
    assert_eq!(execution.value, Value::Int(10));
    assert!(session.diagnostics().is_empty());
}

#[test]
fn test_load_cycle_sees_defaults() {
    let a = "package a; load main; var copy int <- main::Seen(); function Copy() int { return copy }";
    let main = "load a; var seen int <- 7; function Seen() int { return seen } function main() int { return a::Copy() + seen }";
    let mut session = lowered_session(Config::default(), &[main, a]);
    let execution = session
        .evaluate_with_output("main", "main", &mut Vec::new())
        .unwrap();
    // `a` initializes before the entry package and reads `seen` as its default
    assert_eq!(execution.value, Value::Int(7));
    assert!(session.diagnostics().is_empty());
}

#[test]
fn test_unloaded_package_is_rejected() {
    let util = "package util; function Twice(x int) int { return x * 2 }";
    let main = "function main() int { return util::Twice(1) }";
    let programs: Vec<_> = [util, main]
        .iter()
        .map(|source| parse("test.gl", source, tokenize(source).unwrap()).unwrap())
        .collect();

    let mut session = Session::new(Config::default());
    assert!(session.bind(&programs).is_err());
    assert_eq!(
        session.diagnostics().count_kind(BindErrorKind::UnknownPackage),
        1
    );
}

#[test]
fn test_string_builder() {
    let source = r#"
        load sys;
        function main() string {
            var sb <- sys::Builder()
            from i <- 0 to 3 { sb.Append(string(i)) }
            sb.Append("!")
            if (sb.Length() != 4) return "wrong length"
            return sb.Build()
        }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::str("012!"));
}

#[test]
fn test_recursion() {
    let source = r#"
        function fib(n int) int {
            if (n < 2) return n
            return fib(n - 1) + fib(n - 2)
        }
        function main() int { return fib(15) }
    "#;
    let (value, _) = run(source);
    assert_eq!(value, Value::Int(610));
}

#[test]
fn test_stack_overflow_is_fatal() {
    let mut config = Config::default();
    config.runtime.max_call_depth = 200;
    let (result, _, _) = run_with(config, "function down(n int) int { return down(n + 1) } function main() int { return down(0) }");
    match result {
        Err(CompileError::Runtime(err)) => assert_eq!(err.kind, ErrorKind::StackOverflow),
        other => panic!("expected stack overflow, got {other:?}"),
    }
}

#[test]
fn test_exit_code() {
    let source = r#"load sys; function main() { sys::Print("bye"); sys::Exit(3); sys::Print("unreachable") }"#;
    let mut session = Session::new(Config::default());
    let mut out = Vec::new();
    let execution = session.run_source_with_output(source, &mut out).unwrap();
    assert_eq!(execution.exit_code, 3);
    assert_eq!(String::from_utf8(out).unwrap(), "bye\n");
}

#[test]
fn test_integer_wraparound() {
    let (value, _) = run("function main() byte { var b byte <- byte(127); b <- b + byte(1); return b }");
    assert_eq!(value, Value::Byte(-128));
}

#[test]
fn test_widening_is_implicit() {
    let (value, _) = run("function main() long { var b byte <- byte(5); var l long <- b; return l * long(3) }");
    assert_eq!(value, Value::Long(15));
}

#[test]
fn test_string_conversions() {
    let source = r#"
        load sys;
        function main() int {
            sys::Print(string(2.5) + "/" + string(true))
            return int("42") + int("oops")
        }
    "#;
    let (result, out, session) = run_with(Config::default(), source);
    assert_eq!(result.unwrap(), Value::Int(42));
    assert_eq!(out, "2.5/true\n");
    assert_eq!(session.diagnostics().len(), 1);
}

#[test]
fn test_strict_mode_stops_on_recoverable_error() {
    let mut config = Config::default();
    config.runtime.strict = true;
    let (result, _, _) = run_with(config, "function main() int { var d <- 0; return 10 / d }");
    match result {
        Err(CompileError::Runtime(err)) => assert_eq!(err.kind, ErrorKind::DivisionByZero),
        other => panic!("expected division by zero, got {other:?}"),
    }
}

#[test]
fn test_configured_entry_point() {
    let mut config = Config::default();
    config.entry.function = "start".to_string();
    let (result, _, _) = run_with(config, "function start() int { return 9 }");
    assert_eq!(result.unwrap(), Value::Int(9));
}

#[test]
fn test_negative_array_length_recovers() {
    let source = "function main() int { var n <- 0 - 2; var a <- make array[int](n); return a[0] }";
    let (result, _, session) = run_with(Config::default(), source);
    assert_eq!(result.unwrap(), Value::Int(0));

    let kinds: Vec<_> = session
        .diagnostics()
        .errors()
        .filter_map(|e| match e {
            CompileError::Runtime(err) => Some(err.kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![ErrorKind::NegativeLength, ErrorKind::IndexOutOfBounds]);
}

#[test]
fn test_runtime_diagnostics_point_at_their_file() {
    let main = "load lib; function main() int { return lib::Ratio(0) }";
    let lib = "package lib; function Ratio(d int) int { return 10 / d }";
    let mut session = lowered_session(Config::default(), &[main, lib]);
    let execution = session
        .evaluate_with_output("main", "main", &mut Vec::new())
        .unwrap();
    assert_eq!(execution.value, Value::Int(0));
    let diagnostic = session.diagnostics().iter().next().unwrap();
    assert_eq!(diagnostic.file, Some(1));

    let mut config = Config::default();
    config.runtime.strict = true;
    let mut session = lowered_session(config, &[main, lib]);
    let err = session
        .evaluate_with_output("main", "main", &mut Vec::new())
        .unwrap_err();
    assert_eq!(err.file(), Some(1));
}

#[test]
fn test_stack_overflow_reported_in_callee_file() {
    let main = "load lib; function main() int { return lib::Deep(0) }";
    let lib = "package lib; function Deep(n int) int { return Deep(n + 1) }";
    let mut config = Config::default();
    config.runtime.max_call_depth = 20;
    let mut session = lowered_session(config, &[main, lib]);
    let err = session
        .evaluate_with_output("main", "main", &mut Vec::new())
        .unwrap_err();
    let CompileError::Runtime(err) = &err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(err.kind, ErrorKind::StackOverflow);
    assert_eq!(err.file, Some(1));
}

// ============================================
// Binder Diagnostics
// ============================================

#[test]
fn test_independent_errors_reported_in_one_pass() {
    let source = r#"
        function main() {
            var a <- nope
            missing()
            var b int <- "s"
        }
    "#;
    let mut kinds = bind_errors(source);
    kinds.sort_by_key(|k| format!("{k:?}"));
    assert_eq!(
        kinds,
        vec![
            BindErrorKind::MissingExplicitCast,
            BindErrorKind::UnknownFunction,
            BindErrorKind::UnknownName,
        ]
    );
}

#[test]
fn test_unknown_function_suggests_closest() {
    let mut session = Session::new(Config::default());
    let _ = session.run_source_with_output(
        "function square(x int) int { return x * x } function main() int { return sqare(3) }",
        &mut Vec::new(),
    );
    let message = session.diagnostics().errors().next().unwrap().message();
    assert!(message.contains("did you mean `square`"), "{message}");
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(
        bind_errors("function main() { break }"),
        vec![BindErrorKind::LoopControlOutsideLoop]
    );
}

#[test]
fn test_arity_mismatch() {
    assert_eq!(
        bind_errors("function f(a int) { } function main() { f(1, 2) }"),
        vec![BindErrorKind::ArityMismatch]
    );
}

#[test]
fn test_return_mismatch() {
    assert_eq!(
        bind_errors("function main() { return 1 }"),
        vec![BindErrorKind::ReturnMismatch]
    );
}

#[test]
fn test_mixed_families_have_no_operator() {
    assert_eq!(
        bind_errors("function main() { var x <- 1 + 2.5 }"),
        vec![BindErrorKind::NoOperator]
    );
}

#[test]
fn test_errors_halt_before_evaluation() {
    let (result, out, _) = run_with(
        Config::default(),
        r#"load sys; function main() { sys::Print("side effect"); undefined() }"#,
    );
    assert!(matches!(result, Err(CompileError::Halted { .. })));
    assert!(out.is_empty());
}

#[test]
fn test_unknown_type() {
    assert_eq!(
        bind_errors("function main() { var b Builder <- 1 }"),
        vec![BindErrorKind::UnknownType]
    );
    assert_eq!(
        bind_errors("function main(a array[strng]) { }"),
        vec![BindErrorKind::UnknownType]
    );
}

#[test]
fn test_method_call_errors() {
    assert_eq!(
        bind_errors("load sys; function main() { var sb <- sys::Builder(); sb.Apend(\"x\") }"),
        vec![BindErrorKind::UnknownFunction]
    );

    let mut session = Session::new(Config::default());
    let _ = session.run_source_with_output(
        "load sys; function main() { var sb <- sys::Builder(); sb.Apend(\"x\") }",
        &mut Vec::new(),
    );
    let message = session.diagnostics().errors().next().map(|e| e.message()).unwrap();
    assert!(message.contains("has no method `Apend`; did you mean `Append`?"), "{message}");

    assert_eq!(
        bind_errors("function main() { var s <- \"text\"; s.Length() }"),
        vec![BindErrorKind::UnknownFunction]
    );
}
