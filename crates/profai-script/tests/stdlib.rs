//! Standard library behavior

mod common;

use common::{assert_eq, assert_throws, eval_display, eval_json, runtime};
use rstest::rstest;

// ============================================================================
// Array
// ============================================================================

#[rstest]
#[case("[3, 1, 2].sort()", "[1,2,3]")]
#[case("[10, 9, 1].sort()", "[1,10,9]")]
#[case("[10, 9, 1].sort((a, b) => a - b)", "[1,9,10]")]
#[case("[undefined, 3, 1].sort()", "[1,3,null]")]
#[case("[1, 2, 3, 4].filter(n => n % 2 === 0).map(n => n * 10)", "[20,40]")]
#[case("[1, 2, 3].reduce((acc, n) => acc + n, 0)", "6")]
#[case("['a', 'b'].reduceRight((acc, s) => acc + s)", "\"ba\"")]
#[case("[1, [2, [3, [4]]]].flat()", "[1,2,[3,[4]]]")]
#[case("[1, [2, [3, [4]]]].flat(Infinity)", "[1,2,3,4]")]
#[case("[1, 2].flatMap(n => [n, n * 2])", "[1,2,2,4]")]
#[case("[1, 2, 3].slice(-2)", "[2,3]")]
#[case("[1, 2, 3].at(-1)", "3")]
#[case("[1, 2, 3].indexOf(4)", "-1")]
#[case("[NaN].includes(NaN)", "true")]
#[case("[NaN].indexOf(NaN)", "-1")]
#[case("[1, 2, 3].join('-')", "\"1-2-3\"")]
#[case("[1, null, undefined, 2].join()", "\"1,,,2\"")]
#[case("Array.from({ length: 3 }, (_, i) => i * i)", "[0,1,4]")]
#[case("Array.from('abc')", "[\"a\",\"b\",\"c\"]")]
#[case("Array.of(7, 8)", "[7,8]")]
#[case("new Array(3).fill(0)", "[0,0,0]")]
#[case("Array.isArray([])", "true")]
#[case("[5, 1, 4].toSorted()", "[1,4,5]")]
#[case("[1, 2, 3].toReversed()", "[3,2,1]")]
#[case("[1, 2, 3].findLast(n => n < 3)", "2")]
#[case("[1, 2, 3].findIndex(n => n > 5)", "-1")]
#[case("['a', 'b'].entries()", "[[0,\"a\"],[1,\"b\"]]")]
#[case("[1, 2].some(n => n > 1) && [1, 2].every(n => n > 0)", "true")]
fn test_array_methods(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_json(source), expected);
}

#[test]
fn test_mutating_array_methods() {
    let source = r#"
        const a = [1, 2, 3, 4, 5];
        const removed = a.splice(1, 2, 'x', 'y', 'z');
        a.push(6);
        a.unshift(0);
        const last = a.pop();
        const first = a.shift();
        [a, removed, last, first, a.length]
    "#;
    assert_eq!(
        eval_json(source),
        r#"[[1,"x","y","z",4,5],[2,3],6,0,6]"#
    );
}

#[test]
fn test_sort_is_stable() {
    let source = r#"
        const people = [
            { name: 'a', age: 30 }, { name: 'b', age: 25 },
            { name: 'c', age: 30 }, { name: 'd', age: 25 },
        ];
        people.sort((x, y) => x.age - y.age).map(p => p.name).join('')
    "#;
    assert_eq!(eval_display(source), "bdac");
}

#[test]
fn test_length_assignment() {
    let source = "const a = [1, 2, 3]; a.length = 1; a[3] = 4; a";
    assert_eq!(eval_json(source), "[1,null,null,4]");
}

// ============================================================================
// String
// ============================================================================

#[rstest]
#[case("'Hello'.toUpperCase()", "HELLO")]
#[case("'  pad '.trim()", "pad")]
#[case("'abc'.padStart(5, '*')", "**abc")]
#[case("'5'.padEnd(3, '0')", "500")]
#[case("'a,b,,c'.split(',').length", "4")]
#[case("'abc'.split('').reverse().join('')", "cba")]
#[case("'racecar'.slice(-3)", "car")]
#[case("'hello'.substring(4, 1)", "ell")]
#[case("'hello'.charAt(1)", "e")]
#[case("'A'.charCodeAt(0)", "65")]
#[case("String.fromCharCode(72, 105)", "Hi")]
#[case("'ab'.repeat(3)", "ababab")]
#[case("'a-b-c'.replace('-', '+')", "a+b-c")]
#[case("'a-b-c'.replaceAll('-', '+')", "a+b+c")]
#[case("'x'.replace('x', '[$&]')", "[x]")]
#[case("'abc'.replace('b', m => m.toUpperCase())", "aBc")]
#[case("'hello world'.includes('o w')", "true")]
#[case("'hello'.startsWith('he') + ',' + 'hello'.endsWith('lo')", "true,true")]
#[case("'hello'.indexOf('l') + ',' + 'hello'.lastIndexOf('l')", "2,3")]
#[case("'hé'.length", "2")]
#[case("'abc'.at(-1)", "c")]
#[case("'a'.localeCompare('b')", "-1")]
#[case("`sum: ${1 + 2}`", "sum: 3")]
#[case("String(null) + String([1, [2, 3]])", "null1,2,3")]
fn test_string_methods(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

// ============================================================================
// Number and Math
// ============================================================================

#[rstest]
#[case("(3.14159).toFixed(2)", "3.14")]
#[case("(1.005).toFixed(2)", "1.00")]
#[case("(255).toString(16)", "ff")]
#[case("(255).toString(2)", "11111111")]
#[case("(123.456).toPrecision(4)", "123.5")]
#[case("parseInt('42px')", "42")]
#[case("parseInt('ff', 16)", "255")]
#[case("parseInt('abc')", "NaN")]
#[case("parseFloat('3.5e2abc')", "350")]
#[case("Number('12')", "12")]
#[case("Number.isInteger(5.0)", "true")]
#[case("Number.isSafeInteger(2 ** 53)", "false")]
#[case("Number.MAX_SAFE_INTEGER", "9007199254740991")]
#[case("isNaN('abc')", "true")]
#[case("Number.isNaN('abc')", "false")]
#[case("Math.round(2.5)", "3")]
#[case("Math.round(-2.5)", "-2")]
#[case("Math.max()", "-Infinity")]
#[case("Math.min(1, NaN)", "NaN")]
#[case("Math.floor(-1.5)", "-2")]
#[case("Math.trunc(-1.5)", "-1")]
#[case("Math.sign(-3)", "-1")]
#[case("Math.hypot(3, 4)", "5")]
#[case("Math.sqrt(16)", "4")]
#[case("Math.abs(-7)", "7")]
fn test_number_and_math(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

#[test]
fn test_math_random_range() {
    let source = r#"
        let ok = true;
        for (let i = 0; i < 100; i++) {
            const r = Math.random();
            if (r < 0 || r >= 1) ok = false;
        }
        ok
    "#;
    assert_eq!(eval_display(source), "true");
}

// ============================================================================
// Object, Map, Set
// ============================================================================

#[rstest]
#[case("Object.keys({ b: 1, a: 2, 2: 0, 1: 0 })", r#"["1","2","b","a"]"#)]
#[case("Object.values({ a: 1, b: [2] })", "[1,[2]]")]
#[case("Object.entries({ a: 1 })", r#"[["a",1]]"#)]
#[case("Object.assign({ a: 1 }, { b: 2 }, { a: 3 })", r#"{"a":3,"b":2}"#)]
#[case("Object.fromEntries([['x', 1], ['y', 2]])", r#"{"x":1,"y":2}"#)]
#[case("({ a: 1 }).hasOwnProperty('a')", "true")]
#[case("const o = Object.freeze({ a: 1 }); o.a = 2; o", r#"{"a":1}"#)]
#[case("const o = { a: 1, b: 2 }; delete o.a; o", r#"{"b":2}"#)]
fn test_object_functions(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_json(source), expected);
}

#[test]
fn test_map() {
    let source = r#"
        const m = new Map([['a', 1]]);
        m.set('b', 2).set(NaN, 'nan');
        m.delete('a');
        const seen = [];
        m.forEach((value, key) => seen.push(`${key}=${value}`));
        [m.size, m.get(NaN), m.has('a'), seen, [...m.keys()]]
    "#;
    assert_eq!(
        eval_json(source),
        r#"[2,"nan",false,["b=2","NaN=nan"],["b",null]]"#
    );
}

#[test]
fn test_set_deduplicates() {
    let source = r#"
        const s = new Set([1, 2, 2, 3, 1]);
        s.add(0).add(-0);
        [s.size, [...s], s.has(3)]
    "#;
    assert_eq!(eval_json(source), "[4,[1,2,3,0],true]");
}

// ============================================================================
// JSON
// ============================================================================

#[rstest]
#[case("JSON.stringify({ a: [1, 'two', null], b: undefined, c: () => 1 })", r#"{"a":[1,"two",null]}"#)]
#[case("JSON.stringify([undefined, NaN, Infinity])", "[null,null,null]")]
#[case("JSON.stringify('he said \"hi\"\\n')", r#""he said \"hi\"\n""#)]
#[case("JSON.stringify(new Map([[1, 2]]))", "{}")]
#[case("JSON.stringify({ toJSON() { return 'custom'; } })", r#""custom""#)]
#[case("JSON.parse('{\"x\": [1, 2.5, true, null]}').x[1]", "2.5")]
#[case("JSON.parse('\"text\"')", "text")]
#[case("JSON.parse('3.7037037037037037e-5') === 3.7037037037037037e-5", "true")]
#[case("JSON.parse('[1.0715660391465826e-75]')[0] === 1.0715660391465826e-75", "true")]
fn test_json(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

#[test]
fn test_json_indent() {
    let pretty = eval_display("JSON.stringify({ a: 1, b: [true] }, null, 2)");
    insta::assert_snapshot!(pretty, @r###"
    {
      "a": 1,
      "b": [
        true
      ]
    }
    "###);
}

#[test]
fn test_json_errors() {
    assert_throws(
        "const a = {}; a.self = a; JSON.stringify(a)",
        "TypeError: Converting circular structure to JSON",
    );
    let mut runtime = runtime();
    let err = runtime.eval("JSON.parse('{bad')").unwrap_err();
    assert!(err.to_string().starts_with("SyntaxError: "), "{}", err);
}

// ============================================================================
// Console
// ============================================================================

#[test]
fn test_console_rendering() {
    let mut runtime = runtime();
    runtime
        .eval(
            r#"
            function named() {}
            console.log('text', 42, true, null, undefined);
            console.info([1, { a: 'b' }]);
            console.error(new Error('boom'));
            console.debug(named, new Set());
            "#,
        )
        .unwrap();
    let texts: Vec<String> = runtime.console_lines().into_iter().map(|l| l.text).collect();
    assert_eq!(
        texts,
        vec![
            "text 42 true null undefined",
            r#"[1,{"a":"b"}]"#,
            "Error: boom",
            "[Function: named] [object Set]",
        ]
    );
}
