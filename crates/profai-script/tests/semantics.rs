//! Core language semantics: operators, scoping, functions, classes

mod common;

use common::{assert_eq, assert_throws, eval, eval_display, eval_json};
use profai_script::Value;
use rstest::rstest;

// ============================================================================
// Operators and conversions
// ============================================================================

#[rstest]
#[case("1 + 2", "3")]
#[case("'a' + 1", "a1")]
#[case("1 + '2'", "12")]
#[case("[1, 2] + ''", "1,2")]
#[case("({}) + ''", "[object Object]")]
#[case("'3' * '4'", "12")]
#[case("7 % 3", "1")]
#[case("-7 % 3", "-1")]
#[case("2 ** 10", "1024")]
#[case("0.1 + 0.2", "0.30000000000000004")]
#[case("1 / 0", "Infinity")]
#[case("-1 / 0", "-Infinity")]
#[case("0 / 0", "NaN")]
#[case("-0", "0")]
#[case("1e21", "1e+21")]
#[case("1e-7", "1e-7")]
#[case("123456789012345680000", "123456789012345680000")]
#[case("5 & 3", "1")]
#[case("5 | 3", "7")]
#[case("5 ^ 3", "6")]
#[case("~5", "-6")]
#[case("1 << 31", "-2147483648")]
#[case("-1 >>> 0", "4294967295")]
#[case("-16 >> 2", "-4")]
#[case("typeof null", "object")]
#[case("typeof undefined", "undefined")]
#[case("typeof notDeclared", "undefined")]
#[case("typeof function () {}", "function")]
#[case("typeof []", "object")]
#[case("void 0", "undefined")]
#[case("+'  42  '", "42")]
#[case("+''", "0")]
#[case("+'0x10'", "16")]
#[case("+'abc'", "NaN")]
#[case("+[]", "0")]
#[case("+[7]", "7")]
#[case("+null", "0")]
#[case("+true", "1")]
fn test_arithmetic_and_conversion(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

#[rstest]
#[case("1 == '1'", true)]
#[case("1 === '1'", false)]
#[case("null == undefined", true)]
#[case("null === undefined", false)]
#[case("null == 0", false)]
#[case("NaN == NaN", false)]
#[case("0 === -0", true)]
#[case("'b' > 'a'", true)]
#[case("'B' < 'a'", true)]
#[case("'10' < '9'", true)]
#[case("10 < 9", false)]
#[case("'10' < 9", false)]
#[case("[] == false", true)]
#[case("'a' in {a: 1}", true)]
#[case("0 in [5]", true)]
#[case("1 in [5]", false)]
#[case("!!''", false)]
#[case("!!'0'", true)]
#[case("!![]", true)]
fn test_comparison(#[case] source: &str, #[case] expected: bool) {
    match eval(source) {
        Value::Bool(b) => assert_eq!(b, expected, "{}", source),
        other => panic!("expected boolean for {}, got {:?}", source, other),
    }
}

#[rstest]
#[case("null ?? 'd'", "d")]
#[case("0 ?? 'd'", "0")]
#[case("0 || 'd'", "d")]
#[case("1 && 'y'", "y")]
#[case("let a = null; a ??= 5; a", "5")]
#[case("let a = 1; a ||= 5; a", "1")]
#[case("let a = 1; a &&= 5; a", "5")]
#[case("let a = 2; a **= 3; a", "8")]
#[case("let a = 'x'; a += 1; a", "x1")]
#[case("let i = 0; let j = i++; `${i} ${j}`", "1 0")]
#[case("let i = 0; let j = ++i; `${i} ${j}`", "1 1")]
#[case("let o = {n: 1}; o.n++; o.n", "2")]
#[case("let a = [1]; a[0] += 4; a[0]", "5")]
#[case("(1, 2, 3)", "3")]
#[case("true ? 'a' : 'b'", "a")]
fn test_logical_and_assignment(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

// ============================================================================
// Scoping
// ============================================================================

#[test]
fn test_var_and_function_hoisting() {
    let source = r#"
        const before = typeof later;
        function later() { return x; }
        var x = 3;
        before + ':' + later()
    "#;
    assert_eq!(eval_display(source), "function:3");
}

#[test]
fn test_block_scoping() {
    let source = r#"
        let x = 1;
        { let x = 2; }
        x
    "#;
    assert_eq!(eval_display(source), "1");
}

#[test]
fn test_let_loop_captures_each_iteration() {
    let source = r#"
        const fns = [];
        for (let i = 0; i < 3; i++) { fns.push(() => i); }
        fns.map(f => f())
    "#;
    assert_eq!(eval_json(source), "[0,1,2]");
}

#[test]
fn test_var_loop_shares_binding() {
    let source = r#"
        const fns = [];
        for (var i = 0; i < 3; i++) { fns.push(() => i); }
        fns.map(f => f())
    "#;
    assert_eq!(eval_json(source), "[3,3,3]");
}

#[test]
fn test_undeclared_assignment_creates_global() {
    let source = r#"
        function leak() { total = 10; }
        leak();
        total
    "#;
    assert_eq!(eval_display(source), "10");
}

#[test]
fn test_const_reassignment() {
    assert_throws(
        "const k = 1; k = 2;",
        "TypeError: Assignment to constant variable.",
    );
}

#[test]
fn test_unknown_identifier() {
    assert_throws("missing + 1", "ReferenceError: missing is not defined");
}

#[rstest]
#[case("x; let x = 1;", "x")]
#[case("x = 2; let x = 1;", "x")]
#[case("const k = k + 1;", "k")]
#[case("typeof C; class C {}", "C")]
#[case("let y = 1; { y; let y = 2; }", "y")]
#[case("function f() { return z; } f(); const z = 3;", "z")]
fn test_lexical_binding_before_declaration(#[case] source: &str, #[case] name: &str) {
    assert_throws(
        source,
        &format!("ReferenceError: Cannot access '{}' before initialization", name),
    );
}

#[test]
fn test_lexical_binding_read_after_declaration_through_closure() {
    let source = r#"
        function later() { return n * 2; }
        let n = 21;
        later()
    "#;
    assert_eq!(eval_display(source), "42");
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_closures_share_state() {
    let source = r#"
        function counter() {
            let n = 0;
            return { inc: () => ++n, get: () => n };
        }
        const c = counter();
        c.inc(); c.inc();
        c.get()
    "#;
    assert_eq!(eval_display(source), "2");
}

#[test]
fn test_recursion() {
    let source = r#"
        function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
        fib(15)
    "#;
    assert_eq!(eval_display(source), "610");
}

#[test]
fn test_default_and_rest_parameters() {
    let source = r#"
        function f(a, b = a * 2, ...rest) { return [a, b, rest]; }
        [f(1), f(1, 5, 6, 7)]
    "#;
    assert_eq!(eval_json(source), "[[1,2,[]],[1,5,[6,7]]]");
}

#[test]
fn test_arguments_object() {
    let source = "function f() { return arguments.length; } f(1, 2, 3)";
    assert_eq!(eval_display(source), "3");
}

#[test]
fn test_missing_arguments_are_undefined() {
    let source = "function f(a, b) { return b; } f(1)";
    assert!(matches!(eval(source), Value::Undefined));
}

#[test]
fn test_function_name_inference() {
    let source = r#"
        const arrow = () => 1;
        const obj = { method() {} };
        [arrow.name, obj.method.name, (function named() {}).name]
    "#;
    assert_eq!(eval_json(source), r#"["arrow","method","named"]"#);
}

#[test]
fn test_this_binding() {
    let source = r#"
        const obj = {
            value: 7,
            regular() { return this.value; },
            nested() { return [1].map(() => this.value)[0]; },
        };
        function plain() { return this; }
        [obj.regular(), obj.nested(), plain() === undefined]
    "#;
    assert_eq!(eval_json(source), "[7,7,true]");
}

#[test]
fn test_call_apply_bind() {
    let source = r#"
        function greet(greeting, mark) { return greeting + ' ' + this.name + mark; }
        const who = { name: 'Ada' };
        const bound = greet.bind(who, 'Hi');
        [greet.call(who, 'Hello', '!'), greet.apply(who, ['Hey', '?']), bound('.')]
    "#;
    assert_eq!(eval_json(source), r#"["Hello Ada!","Hey Ada?","Hi Ada."]"#);
}

#[test]
fn test_calling_non_function() {
    assert_throws("const x = 5; x()", "TypeError: x is not a function");
    assert_throws("const o = {}; o.go()", "TypeError: o.go is not a function");
}

#[test]
fn test_reading_property_of_undefined() {
    assert_throws(
        "let u; u.x",
        "TypeError: Cannot read properties of undefined (reading 'x')",
    );
    assert_throws(
        "null[0]",
        "TypeError: Cannot read properties of null (reading '0')",
    );
}

#[test]
fn test_optional_chaining() {
    let source = r#"
        const o = { a: { b: 1 }, f: null };
        [o?.a?.b, o.x?.y, o.f?.(), o.a.b?.toString()]
    "#;
    assert_eq!(eval_json(source), r#"[1,null,null,"1"]"#);
}

// ============================================================================
// Destructuring and spread
// ============================================================================

#[test]
fn test_destructuring() {
    let source = r#"
        const [a, , b = 9, ...rest] = [1, 2, undefined, 4, 5];
        const { x, y: renamed, z = 'dz', ...others } = { x: 1, y: 2, p: 3, q: 4 };
        [a, b, rest, x, renamed, z, others]
    "#;
    assert_eq!(eval_json(source), r#"[1,9,[4,5],1,2,"dz",{"p":3,"q":4}]"#);
}

#[test]
fn test_swap_by_destructuring_assignment() {
    let source = "let a = 1, b = 2; [a, b] = [b, a]; [a, b]";
    assert_eq!(eval_json(source), "[2,1]");
}

#[test]
fn test_spread() {
    let source = r#"
        const base = { a: 1, b: 2 };
        const merged = { ...base, b: 3, ['c' + 1]: 4 };
        const nums = [1, ...[2, 3], ...'ab'];
        [merged, nums, Math.max(...[4, 9, 2])]
    "#;
    assert_eq!(eval_json(source), r#"[{"a":1,"b":3,"c1":4},[1,2,3,"a","b"],9]"#);
}

#[test]
fn test_destructuring_undefined() {
    assert_throws(
        "const { a } = undefined;",
        "TypeError: Cannot destructure property 'a' of 'undefined' as it is undefined.",
    );
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_labeled_break_and_continue() {
    let source = r#"
        const out = [];
        outer: for (let i = 0; i < 3; i++) {
            for (let j = 0; j < 3; j++) {
                if (j === 1) continue outer;
                if (i === 2) break outer;
                out.push(`${i}${j}`);
            }
        }
        out
    "#;
    assert_eq!(eval_json(source), r#"["00","10"]"#);
}

#[test]
fn test_switch_fallthrough() {
    let source = r#"
        function kind(n) {
            let out = '';
            switch (n) {
                case 1:
                    out += 'one';
                case 2:
                    out += 'two';
                    break;
                default:
                    out += 'other';
            }
            return out;
        }
        [kind(1), kind(2), kind(3)]
    "#;
    assert_eq!(eval_json(source), r#"["onetwo","two","other"]"#);
}

#[test]
fn test_for_in_and_for_of() {
    let source = r#"
        const keys = [];
        for (const k in { b: 1, a: 2, 1: 3 }) keys.push(k);
        let sum = 0;
        for (const n of [1, 2, 3]) sum += n;
        const chars = [];
        for (const c of 'hé') chars.push(c);
        [keys, sum, chars]
    "#;
    assert_eq!(eval_json(source), r#"[["1","b","a"],6,["h","é"]]"#);
}

#[test]
fn test_do_while() {
    let source = "let n = 0; do { n++; } while (n < 5); n";
    assert_eq!(eval_display(source), "5");
}

#[test]
fn test_try_catch_finally() {
    let source = r#"
        const log = [];
        function f() {
            try {
                throw new RangeError('bad');
            } catch (e) {
                log.push(e.name, e.message, e instanceof RangeError, e instanceof Error);
                return 'caught';
            } finally {
                log.push('finally');
            }
        }
        [f(), log]
    "#;
    assert_eq!(
        eval_json(source),
        r#"["caught",["RangeError","bad",true,true,"finally"]]"#
    );
}

#[test]
fn test_throwing_non_errors() {
    let source = "try { throw { code: 42 }; } catch ({ code }) { code }";
    assert_eq!(eval_display(source), "42");
    assert_throws("throw 'plain'", "plain");
}

#[test]
fn test_optional_catch_binding() {
    let source = "let r; try { null.x; } catch { r = 'handled'; } r";
    assert_eq!(eval_display(source), "handled");
}

#[test]
fn test_asi() {
    let source = "
        let a = 1
        let b = 2
        function f() {
            return
            a + b
        }
        [a + b, f()]
    ";
    assert_eq!(eval_json(source), "[3,null]");
}

#[rstest]
#[case("if (true) { 'yes' } else { 'no' }", "yes")]
#[case("if (false) { 'yes' } else { 'no' }", "no")]
#[case("{ 1; 2 }", "2")]
#[case("let s = 0; for (const x of [1, 2, 3]) { s += x }", "6")]
#[case("let i = 0; while (i < 4) { i++ }", "3")]
#[case("try { 'body' } finally { }", "body")]
#[case("try { throw 1 } catch (e) { e + 1 }", "2")]
#[case("1; let z = 5;", "1")]
#[case("function f() { 'inner'; return 1 } 'outer'; let y = f();", "outer")]
fn test_completion_value_of_nested_statements(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

// ============================================================================
// Classes
// ============================================================================

#[test]
fn test_class_basics() {
    let source = r#"
        class Point {
            static origin() { return new Point(0, 0); }
            constructor(x, y) { this.x = x; this.y = y; }
            plus(other) { return new Point(this.x + other.x, this.y + other.y); }
            toString() { return `(${this.x}, ${this.y})`; }
        }
        const p = new Point(1, 2).plus(Point.origin()).plus(new Point(3, 4));
        [`${p}`, p.x, p instanceof Point]
    "#;
    assert_eq!(eval_json(source), r#"["(4, 6)",4,true]"#);
}

#[test]
fn test_class_inheritance_and_fields() {
    let source = r#"
        class Animal {
            legs = 4;
            constructor(name) { this.name = name; }
            speak() { return `${this.name} makes a sound`; }
        }
        class Bird extends Animal {
            legs = 2;
            speak() { return super.speak() + ' (tweet)'; }
        }
        const b = new Bird('Tweety');
        [b.speak(), b.legs, b instanceof Animal, Object.keys(b)]
    "#;
    assert_eq!(
        eval_json(source),
        r#"["Tweety makes a sound (tweet)",2,true,["legs","name"]]"#
    );
}

#[test]
fn test_custom_error_subclass() {
    let source = r#"
        class ValidationError extends Error {
            constructor(message) {
                super(message);
                this.name = 'ValidationError';
            }
        }
        try {
            throw new ValidationError('too short');
        } catch (e) {
            [String(e), e instanceof ValidationError, e instanceof Error]
        }
    "#;
    assert_eq!(
        eval_json(source),
        r#"["ValidationError: too short",true,true]"#
    );
}

#[test]
fn test_class_requires_new() {
    assert_throws(
        "class A {} A()",
        "TypeError: Class constructor A cannot be invoked without 'new'",
    );
}

#[test]
fn test_value_of_in_arithmetic() {
    let source = r#"
        class Money {
            constructor(cents) { this.cents = cents; }
            valueOf() { return this.cents; }
        }
        new Money(150) + new Money(50)
    "#;
    assert_eq!(eval_display(source), "200");
}
