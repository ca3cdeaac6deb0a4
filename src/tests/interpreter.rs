use super::{parse, run, run_ok};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::host::HostFunction;
use crate::runtime::value::{values_equal, Value};
use crate::runtime::Interpreter;

#[test]
fn closure_captures_defining_environment() {
    let output = run_ok(
        r#"
        fn create_adder(n) {
            return fn (x) { return x + n; };
        }
        let add10 = create_adder(10);
        print(add10(5));
        "#,
    );
    assert_eq!(output, vec!["15"]);
}

#[test]
fn closure_factory_reads_its_own_result_binding() {
    // The returned closure names a variable that is only bound after the
    // closure literal was created; lookup happens at call time.
    let output = run_ok(
        r#"
        fn create_person(name) {
            person = { name: name };
            person.get_info = fn () { return person.name; };
            return person;
        }
        p = create_person("Ada");
        print(p.get_info());
        "#,
    );
    assert_eq!(output, vec!["Ada"]);
}

#[test]
fn shared_container_mutation_is_visible_through_all_aliases() {
    let output = run_ok(
        r#"
        person = { name: "Ada", age: 36 };
        project1 = { lead: null };
        project2 = { lead: null };
        project1.lead = person;
        project2.lead = person;
        person.age = 37;
        print(project1.lead.age);
        print(project2.lead.age);
        "#,
    );
    assert_eq!(output, vec!["37", "37"]);
}

#[test]
fn ternary_chain_selects_grade_bands() {
    let output = run_ok(
        r#"
        fn grade(score) {
            return score >= 90 ? "A"
                 : score >= 80 ? "B"
                 : score >= 70 ? "C"
                 : score >= 60 ? "D"
                 : "F";
        }
        for (score in [95, 85, 75, 65, 50]) {
            print(grade(score));
        }
        "#,
    );
    assert_eq!(output, vec!["A", "B", "C", "D", "F"]);
}

#[test]
fn ternary_evaluates_exactly_one_branch() {
    let output = run_ok(
        r#"
        fn touched(label) {
            print(label);
            return label;
        }
        result = true ? touched("then") : touched("else");
        print(result);
        "#,
    );
    assert_eq!(output, vec!["then", "then"]);
}

#[test]
fn plus_is_overloaded_for_concatenation() {
    let output = run_ok(
        r#"
        print("Result: " + 42);
        print(5 + 3);
        print(1.5 + "!");
        print("flag is " + true);
        print("value is " + null);
        "#,
    );
    assert_eq!(
        output,
        vec!["Result: 42", "8", "1.5!", "flag is true", "value is null"]
    );
}

#[test]
fn adding_array_to_number_is_a_runtime_error_not_coercion() {
    let (output, errors) = run(
        r#"
        x = [1] + 2;
        print("still running");
        "#,
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], RuntimeError::TypeMismatch { .. }));
    assert_eq!(output, vec!["still running"]);
}

#[test]
fn missing_arguments_bind_to_null_and_extras_are_ignored() {
    let output = run_ok(
        r#"
        fn three(a, b, c) {
            print(a);
            print(b);
            print(c);
        }
        three(1, 2);
        three(1, 2, 3, 4);
        "#,
    );
    assert_eq!(output, vec!["1", "2", "null", "1", "2", "3"]);
}

#[test]
fn bare_assignment_rewrites_visible_slot_else_declares_locally() {
    let output = run_ok(
        r#"
        x = 1;
        {
            x = 2;
        }
        print(x);
        "#,
    );
    assert_eq!(output, vec!["2"]);

    let (output, errors) = run(
        r#"
        {
            y = 3;
        }
        print(y);
        "#,
    );
    assert!(output.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        RuntimeError::UndefinedVariable { ref name } if name == "y"
    ));
}

#[test]
fn let_shadows_instead_of_rewriting() {
    let output = run_ok(
        r#"
        x = 1;
        {
            let x = 2;
            print(x);
        }
        print(x);
        "#,
    );
    assert_eq!(output, vec!["2", "1"]);
}

#[test]
fn while_loop_with_break_and_continue() {
    let output = run_ok(
        r#"
        i = 0;
        total = 0;
        while (true) {
            i = i + 1;
            if (i % 2 == 0) { continue; }
            if (i > 7) { break; }
            total = total + i;
        }
        print(total);
        "#,
    );
    assert_eq!(output, vec!["16"]);
}

#[test]
fn for_iterates_arrays_objects_and_strings() {
    let output = run_ok(
        r#"
        for (n in [1, 2, 3]) { print(n); }
        for (key in { b: 1, a: 2, c: 3 }) { print(key); }
        for (ch in "hi") { print(ch); }
        "#,
    );
    assert_eq!(output, vec!["1", "2", "3", "b", "a", "c", "h", "i"]);
}

#[test]
fn if_elif_else_first_truthy_branch_wins() {
    let output = run_ok(
        r#"
        fn classify(n) {
            if (n < 0) { return "negative"; }
            elif (n == 0) { return "zero"; }
            else { return "positive"; }
        }
        print(classify(0 - 5));
        print(classify(0));
        print(classify(5));
        "#,
    );
    assert_eq!(output, vec!["negative", "zero", "positive"]);
}

#[test]
fn truthiness_rule_for_conditions() {
    let output = run_ok(
        r#"
        for (v in [0, 1, "", "x", null, true, false]) {
            print(v ? "truthy" : "falsy");
        }
        print([] ? "truthy" : "falsy");
        print({} ? "truthy" : "falsy");
        "#,
    );
    assert_eq!(
        output,
        vec![
            "falsy", "truthy", "falsy", "truthy", "falsy", "truthy", "falsy", "truthy", "truthy"
        ]
    );
}

#[test]
fn object_literal_round_trip() {
    let output = run_ok(
        r#"
        employee = {
            name: "Grace",
            age: 47,
            active: true,
            skills: ["compilers", "navy"],
            address: { city: "Arlington" }
        };
        print(employee.name);
        print(employee.age);
        print(employee.active);
        print(employee.skills[0]);
        print(employee.address.city);
        "#,
    );
    assert_eq!(
        output,
        vec!["Grace", "47", "true", "compilers", "Arlington"]
    );
}

#[test]
fn absent_property_reads_as_null_and_writes_create_it() {
    let output = run_ok(
        r#"
        obj = {};
        print(obj.missing);
        obj.missing = 1;
        print(obj.missing);
        "#,
    );
    assert_eq!(output, vec!["null", "1"]);
}

#[test]
fn container_equality_is_identity() {
    let output = run_ok(
        r#"
        a = [1];
        b = [1];
        c = a;
        print(a == b);
        print(a == c);
        print(1 == 1);
        print("x" == "x");
        print(1 == "1");
        "#,
    );
    assert_eq!(output, vec!["false", "true", "true", "true", "false"]);
}

#[test]
fn logical_operators_short_circuit() {
    let output = run_ok(
        r#"
        fn boom() {
            x = [1] * 2;
            return true;
        }
        print(false && boom());
        print(true || boom());
        "#,
    );
    assert_eq!(output, vec!["false", "true"]);
}

#[test]
fn string_ordering_is_lexicographic() {
    let output = run_ok(
        r#"
        print("apple" < "banana");
        print("b" <= "a");
        "#,
    );
    assert_eq!(output, vec!["true", "false"]);
}

#[test]
fn string_indexing_yields_single_character_strings() {
    let output = run_ok(r#"print("hello"[1]);"#);
    assert_eq!(output, vec!["e"]);
}

#[test]
fn main_runs_after_top_level_statements() {
    let output = run_ok(
        r#"
        print("top");
        fn main() {
            print("main");
        }
        "#,
    );
    assert_eq!(output, vec!["top", "main"]);
}

#[test]
fn runtime_error_taxonomy() {
    let (_, errors) = run("x = 5; y = x.prop;");
    assert!(matches!(errors[0], RuntimeError::NotAnObject { .. }));

    let (_, errors) = run("x = 5; y = x[0];");
    assert!(matches!(errors[0], RuntimeError::NotIndexable { .. }));

    let (_, errors) = run("x = 5; x();");
    assert!(matches!(errors[0], RuntimeError::NotCallable { .. }));

    let (_, errors) = run("arr = [1, 2]; y = arr[5];");
    assert!(matches!(
        errors[0],
        RuntimeError::IndexOutOfRange { index: 5, len: 2 }
    ));

    let (_, errors) = run("arr = [1, 2]; arr[2] = 9;");
    assert!(matches!(errors[0], RuntimeError::IndexOutOfRange { .. }));

    let (_, errors) = run("x = 5; x.prop = 1;");
    assert!(matches!(errors[0], RuntimeError::InvalidTarget { .. }));

    let (_, errors) = run("import nosuchmodule;");
    assert!(matches!(errors[0], RuntimeError::UnknownModule { .. }));

    let (_, errors) = run("print(missing);");
    assert!(matches!(errors[0], RuntimeError::UndefinedVariable { .. }));
}

#[test]
fn top_level_recovers_and_continues_after_each_error() {
    let (output, errors) = run(
        r#"
        print("one");
        boom = missing + 1;
        print("two");
        x = 5;
        x();
        print("three");
        "#,
    );
    assert_eq!(output, vec!["one", "two", "three"]);
    assert_eq!(errors.len(), 2);
}

#[test]
fn errors_inside_a_call_abort_only_that_call() {
    let (output, errors) = run(
        r#"
        fn fails() {
            x = 5;
            x();
            print("unreachable");
        }
        fails();
        print("after");
        "#,
    );
    assert_eq!(output, vec!["after"]);
    assert_eq!(errors.len(), 1);
}

#[test]
fn calculator_object_with_closure_methods_shares_state() {
    let output = run_ok(
        r#"
        fn make_calculator() {
            calc = { total: 0 };
            calc.add = fn (n) {
                calc.total = calc.total + n;
                return calc.total;
            };
            return calc;
        }
        c = make_calculator();
        c.add(5);
        c.add(7);
        print(c.total);
        "#,
    );
    assert_eq!(output, vec!["12"]);
}

#[test]
fn print_can_be_shadowed_by_a_binding() {
    let output = run_ok(
        r#"
        let print = fn (x) { return x; };
        print("swallowed");
        "#,
    );
    assert!(output.is_empty());
}

#[test]
fn self_referential_containers_render_with_a_placeholder() {
    let output = run_ok(
        r#"
        import collections;
        a = [1];
        collections.append(a, a);
        print(a);
        o = {};
        o.me = o;
        print(o);
        "#,
    );
    assert_eq!(output, vec!["[1, [...]]", "{me: {...}}"]);
}

#[test]
fn shared_subtrees_render_fully_when_acyclic() {
    let output = run_ok(
        r#"
        inner = [1];
        print([inner, inner]);
        "#,
    );
    assert_eq!(output, vec!["[[1], [1]]"]);
}

#[test]
fn host_functions_compare_by_code_identity() {
    fn stub(_: &mut Interpreter, _: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::Null)
    }
    fn other_stub(_: &mut Interpreter, _: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::Bool(true))
    }
    let default = Value::Host(HostFunction {
        module: "math",
        name: "sqrt",
        call: stub,
    });
    let replacement = Value::Host(HostFunction {
        module: "math",
        name: "sqrt",
        call: other_stub,
    });
    let alias = Value::Host(HostFunction {
        module: "math",
        name: "sqrt",
        call: stub,
    });
    assert!(!values_equal(&default, &replacement));
    assert!(values_equal(&default, &alias));

    let output = run_ok("import math; print(math.sqrt == math.sqrt);");
    assert_eq!(output, vec!["true"]);
}

#[test]
fn array_rendering_quotes_nested_strings() {
    let output = run_ok(r#"print([1, "two", true, null, [3]]);"#);
    assert_eq!(output, vec![r#"[1, "two", true, null, [3]]"#]);
}

#[test]
fn string_module() {
    let output = run_ok(
        r#"
        import string;
        print(string.upper("hi"));
        print(string.lower("HI"));
        print(string.contains("maple", "apl"));
        print(string.toString(42));
        "#,
    );
    assert_eq!(output, vec!["HI", "hi", "true", "42"]);
}

#[test]
fn collections_module() {
    let output = run_ok(
        r#"
        import collections;
        items = [1, 2, 3];
        collections.append(items, 4);
        print(collections.length(items));
        print(collections.first(items));
        print(collections.slice(items, 1, 3));
        print(collections.keys({ a: 1, b: 2 }));
        print(collections.length("hello"));
        "#,
    );
    assert_eq!(
        output,
        vec!["4", "1", "[2, 3]", r#"["a", "b"]"#, "5"]
    );
}

#[test]
fn math_module() {
    let output = run_ok(
        r#"
        import math;
        print(math.sqrt(16));
        print(math.pow(2, 10));
        print(math.pi() > 3.14);
        print(math.e() > 2.71);
        "#,
    );
    assert_eq!(output, vec!["4", "1024", "true", "true"]);
}

#[test]
fn functional_module_calls_script_closures() {
    let output = run_ok(
        r#"
        import functional;
        nums = [1, 2, 3, 4];
        doubled = functional.map(nums, fn (x) { return x * 2; });
        evens = functional.filter(nums, fn (x) { return x % 2 == 0; });
        total = functional.reduce(nums, fn (acc, x) { return acc + x; });
        shifted = functional.reduce(nums, fn (acc, x) { return acc + x; }, 100);
        print(doubled);
        print(evens);
        print(total);
        print(shifted);
        "#,
    );
    assert_eq!(output, vec!["[2, 4, 6, 8]", "[2, 4]", "10", "110"]);
}

#[test]
fn json_module_preserves_insertion_order() {
    let output = run_ok(
        r#"
        import json;
        print(json.dumps({ name: "Ada", tags: ["x", "y"], age: 36, ok: true, gone: null }));
        "#,
    );
    assert_eq!(
        output,
        vec![r#"{"name": "Ada", "tags": ["x", "y"], "age": 36, "ok": true, "gone": null}"#]
    );
}

#[test]
fn json_refuses_function_values() {
    let (_, errors) = run(
        r#"
        import json;
        x = json.dumps(fn () { return 1; });
        "#,
    );
    assert!(matches!(errors[0], RuntimeError::HostError { .. }));
}

#[test]
fn json_rejects_circular_structures() {
    let (_, errors) = run(
        r#"
        import json;
        import collections;
        a = [];
        collections.append(a, a);
        x = json.dumps(a);
        "#,
    );
    assert!(matches!(errors[0], RuntimeError::HostError { .. }));
}

#[test]
fn datetime_module() {
    let output = run_ok(
        r#"
        import datetime;
        print(datetime.createTimestamp(1970, 1, 2));
        print(datetime.createTimestamp(2024, 1, 1, 0, 0, 30));
        print(datetime.addTimedelta(0, 1, 1));
        print(datetime.startOfDay(90061));
        "#,
    );
    assert_eq!(output, vec!["86400", "1704067230", "90000", "86400"]);
}

#[test]
fn random_module_is_deterministic_under_a_seed() {
    let program = parse(
        r#"
        import random;
        print(random.random());
        print(random.choice([7, 7, 7]));
        "#,
    );
    let mut interp = Interpreter::with_captured_output();
    interp.seed_random(42);
    let outcome = interp.run(&program);
    assert!(outcome.is_clean());
    let output = interp.take_output();
    let sample: f64 = output[0].parse().unwrap();
    assert!((0.0..1.0).contains(&sample));
    assert_eq!(output[1], "7");

    // Same seed, same sequence.
    let mut again = Interpreter::with_captured_output();
    again.seed_random(42);
    again.run(&program);
    assert_eq!(again.take_output(), output);
}

#[test]
fn host_argument_errors_surface_as_host_errors() {
    let (_, errors) = run(
        r#"
        import math;
        x = math.sqrt("nope");
        "#,
    );
    assert!(matches!(errors[0], RuntimeError::HostError { .. }));
}

#[test]
fn loop_binding_is_reassigned_not_redeclared_per_iteration() {
    let output = run_ok(
        r#"
        last = null;
        for (item in [1, 2, 3]) {
            last = item;
        }
        print(last);
        "#,
    );
    assert_eq!(output, vec!["3"]);
}

#[test]
fn division_follows_ieee_semantics() {
    let output = run_ok(
        r#"
        print(1 / 0);
        print(7 / 2);
        print(7 % 3);
        "#,
    );
    assert_eq!(output, vec!["inf", "3.5", "1"]);
}
