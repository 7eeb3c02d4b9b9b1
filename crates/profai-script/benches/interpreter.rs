//! Interpreter execution benchmarks
//!
//! Canonical learner-style programs that stress loops, calls, array
//! callbacks and string building, plus parse-only timing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use profai_script::{ExecutionLimits, Lexer, Parser, Runtime};

fn run(source: &str) {
    let mut runtime = Runtime::new(ExecutionLimits::unlimited());
    let _ = runtime.eval(source);
}

fn parse_only(source: &str) {
    let mut lexer = Lexer::new(source);
    let (tokens, _) = lexer.tokenize();
    let mut parser = Parser::new(tokens);
    let _ = parser.parse();
}

fn bench_arithmetic_loop(c: &mut Criterion) {
    c.bench_function("arithmetic_loop_10k", |b| {
        let code = "let sum = 0; for (let i = 0; i < 10000; i++) { sum += i; } sum";
        b.iter(|| run(black_box(code)));
    });
}

fn bench_fibonacci(c: &mut Criterion) {
    let mut group = c.benchmark_group("fibonacci");
    for n in [10, 15, 20] {
        let code = format!(
            "function fib(n) {{ return n < 2 ? n : fib(n - 1) + fib(n - 2); }} fib({})",
            n
        );
        group.bench_with_input(BenchmarkId::from_parameter(n), &code, |b, code| {
            b.iter(|| run(black_box(code)));
        });
    }
    group.finish();
}

fn bench_array_pipeline(c: &mut Criterion) {
    c.bench_function("array_map_filter_reduce_1k", |b| {
        let code = r#"
            Array.from({ length: 1000 }, (_, i) => i)
                .map(n => n * 3)
                .filter(n => n % 2 === 0)
                .reduce((acc, n) => acc + n, 0)
        "#;
        b.iter(|| run(black_box(code)));
    });
}

fn bench_string_building(c: &mut Criterion) {
    c.bench_function("string_reverse_join", |b| {
        let code = r#"
            let out = '';
            for (let i = 0; i < 500; i++) { out += String(i % 10); }
            out.split('').reverse().join('').length
        "#;
        b.iter(|| run(black_box(code)));
    });
}

fn bench_parse(c: &mut Criterion) {
    let code = r#"
        class Stack {
            items = [];
            push(x) { this.items.push(x); return this; }
            pop() { return this.items.pop(); }
        }
        function isBalanced(s) {
            const pairs = { ')': '(', ']': '[', '}': '{' };
            const stack = new Stack();
            for (const c of s) {
                if ('([{'.includes(c)) stack.push(c);
                else if (c in pairs && stack.pop() !== pairs[c]) return false;
            }
            return stack.items.length === 0;
        }
    "#
    .repeat(20);
    c.bench_function("parse_bracket_checker_x20", |b| {
        b.iter(|| parse_only(black_box(&code)));
    });
}

criterion_group!(
    benches,
    bench_arithmetic_loop,
    bench_fibonacci,
    bench_array_pipeline,
    bench_string_building,
    bench_parse
);
criterion_main!(benches);
