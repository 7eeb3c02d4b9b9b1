//! `Math` namespace
//!
//! All functions follow IEEE 754 semantics:
//! - NaN propagates through operations
//! - Domain errors return NaN (not panic)
//! - Arguments are converted with ToNumber, so `Math.max("3", 1)` is 3

use super::{arg, method, namespace, MethodTable};
use crate::interpreter::Interpreter;
use crate::value::{RuntimeError, Value};
use rand::RngExt;

/// Register a one-argument numeric function
fn unary(table: &mut MethodTable, name: &'static str, f: fn(f64) -> f64) {
    method(table, name, 1, move |interp, _, args| {
        let x = interp.to_number(&arg(args, 0))?;
        Ok(Value::Number(f(x)))
    });
}

/// `Math.round`: halves round toward +∞
pub fn round(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn numbers(interp: &mut Interpreter, args: &[Value]) -> Result<Vec<f64>, RuntimeError> {
    args.iter().map(|v| interp.to_number(v)).collect()
}

/// `Math.max` / `Math.min` fold; any NaN wins
fn extremum(values: &[f64], pick_max: bool) -> f64 {
    let mut result = if pick_max {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };
    for &v in values {
        if v.is_nan() {
            return f64::NAN;
        }
        let replace = if pick_max {
            v > result || (v == 0.0 && result == 0.0 && result.is_sign_negative())
        } else {
            v < result || (v == 0.0 && result == 0.0 && v.is_sign_negative())
        };
        if replace {
            result = v;
        }
    }
    result
}

pub fn install(interp: &mut Interpreter) {
    let mut table = MethodTable::new();

    table.insert("PI", Value::Number(std::f64::consts::PI));
    table.insert("E", Value::Number(std::f64::consts::E));
    table.insert("LN2", Value::Number(std::f64::consts::LN_2));
    table.insert("LN10", Value::Number(std::f64::consts::LN_10));
    table.insert("LOG2E", Value::Number(std::f64::consts::LOG2_E));
    table.insert("LOG10E", Value::Number(std::f64::consts::LOG10_E));
    table.insert("SQRT2", Value::Number(std::f64::consts::SQRT_2));
    table.insert("SQRT1_2", Value::Number(std::f64::consts::FRAC_1_SQRT_2));

    unary(&mut table, "abs", f64::abs);
    unary(&mut table, "floor", f64::floor);
    unary(&mut table, "ceil", f64::ceil);
    unary(&mut table, "round", round);
    unary(&mut table, "trunc", f64::trunc);
    unary(&mut table, "sign", sign);
    unary(&mut table, "sqrt", f64::sqrt);
    unary(&mut table, "cbrt", f64::cbrt);
    unary(&mut table, "exp", f64::exp);
    unary(&mut table, "log", f64::ln);
    unary(&mut table, "log2", f64::log2);
    unary(&mut table, "log10", f64::log10);
    unary(&mut table, "sin", f64::sin);
    unary(&mut table, "cos", f64::cos);
    unary(&mut table, "tan", f64::tan);
    unary(&mut table, "asin", f64::asin);
    unary(&mut table, "acos", f64::acos);
    unary(&mut table, "atan", f64::atan);
    unary(&mut table, "sinh", f64::sinh);
    unary(&mut table, "cosh", f64::cosh);
    unary(&mut table, "tanh", f64::tanh);

    method(&mut table, "pow", 2, |interp, _, args| {
        let base = interp.to_number(&arg(args, 0))?;
        let exponent = interp.to_number(&arg(args, 1))?;
        let left = Value::Number(base);
        let right = Value::Number(exponent);
        interp.binary_op(crate::ast::BinaryOp::Exp, &left, &right)
    });
    method(&mut table, "atan2", 2, |interp, _, args| {
        let y = interp.to_number(&arg(args, 0))?;
        let x = interp.to_number(&arg(args, 1))?;
        Ok(Value::Number(y.atan2(x)))
    });
    method(&mut table, "hypot", 2, |interp, _, args| {
        let values = numbers(interp, args)?;
        if values.iter().any(|v| v.is_infinite()) {
            return Ok(Value::Number(f64::INFINITY));
        }
        Ok(Value::Number(values.iter().map(|v| v * v).sum::<f64>().sqrt()))
    });
    method(&mut table, "max", 2, |interp, _, args| {
        let values = numbers(interp, args)?;
        Ok(Value::Number(extremum(&values, true)))
    });
    method(&mut table, "min", 2, |interp, _, args| {
        let values = numbers(interp, args)?;
        Ok(Value::Number(extremum(&values, false)))
    });
    method(&mut table, "random", 0, |_, _, _| {
        let mut rng = rand::rng();
        let value: f64 = rng.random(); // [0.0, 1.0)
        Ok(Value::Number(value))
    });

    interp.define_global("Math", namespace(table));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(2.5, 3.0)]
    #[case(-2.5, -2.0)]
    #[case(2.4, 2.0)]
    #[case(-0.4, -0.0)]
    fn test_round_half_up(#[case] x: f64, #[case] expected: f64) {
        assert_eq!(round(x), expected);
    }

    #[test]
    fn test_extremum() {
        assert_eq!(extremum(&[], true), f64::NEG_INFINITY);
        assert_eq!(extremum(&[1.0, 5.0, 3.0], true), 5.0);
        assert_eq!(extremum(&[1.0, 5.0, 3.0], false), 1.0);
        assert!(extremum(&[1.0, f64::NAN], false).is_nan());
        assert!(extremum(&[-0.0, 0.0], true).is_sign_positive());
    }
}
