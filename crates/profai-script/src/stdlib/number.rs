//! Number and Boolean built-ins, `parseInt` / `parseFloat`

use super::{arg, method, MethodTable};
use crate::interpreter::Interpreter;
use crate::value::{number_to_string, Function, RuntimeError, Value};

/// 2^53 - 1
const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

fn this_number(this: &Value, name: &str) -> Result<f64, RuntimeError> {
    match this {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::type_error(format!(
            "Number.prototype.{} requires that 'this' be a Number",
            name
        ))),
    }
}

/// `parseInt(string, radix)`
pub fn parse_int(input: &str, radix: Option<u32>) -> f64 {
    let mut s = input.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let negative = s.starts_with('-');
    if s.starts_with('-') || s.starts_with('+') {
        s = &s[1..];
    }

    let mut radix = radix.unwrap_or(0);
    if radix == 0 || radix == 16 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let mut value: f64 = 0.0;
    let mut any = false;
    for c in s.chars() {
        match c.to_digit(radix) {
            Some(d) => {
                value = value * radix as f64 + d as f64;
                any = true;
            }
            None => break,
        }
    }
    if !any {
        return f64::NAN;
    }
    if negative {
        -value
    } else {
        value
    }
}

/// `parseFloat(string)`: the longest decimal-literal prefix
pub fn parse_float(input: &str) -> f64 {
    let s = input.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    let mantissa = &s[digits_start..end];
    if mantissa.is_empty() || mantissa == "." {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// `Number.prototype.toFixed`; exact ties round away from zero
pub fn to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return number_to_string(n);
    }
    let scale = 10f64.powi(digits as i32);
    let scaled = n * scale;
    let value = if (scaled - scaled.trunc()).abs() == 0.5 && scaled.abs() < 4503599627370496.0 {
        (scaled.trunc() + scaled.signum()) / scale
    } else {
        n
    };
    if n == 0.0 {
        // -0 prints without a sign
        return format!("{:.*}", digits, 0.0);
    }
    format!("{:.*}", digits, value)
}

/// `Number.prototype.toPrecision`
pub fn to_precision(n: f64, precision: usize) -> String {
    if !n.is_finite() {
        return number_to_string(n);
    }
    let exponential = format!("{:.*e}", precision - 1, n);
    let (mantissa, exponent) = exponential.split_once('e').unwrap_or((&exponential, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -6 || exponent >= precision as i32 {
        let sign = if exponent < 0 { "-" } else { "+" };
        format!("{}e{}{}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, n)
    }
}

/// `Number.prototype.toString(radix)`
pub fn to_radix_string(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() {
        return number_to_string(n);
    }
    let negative = n < 0.0;
    let n = n.abs();
    let mut int_part = n.trunc();
    let mut frac = n - int_part;

    let mut digits = Vec::new();
    if int_part == 0.0 {
        digits.push('0');
    }
    while int_part >= 1.0 {
        let d = (int_part % radix as f64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        int_part = (int_part / radix as f64).trunc();
    }
    digits.reverse();
    let mut out: String = digits.into_iter().collect();

    if frac > 0.0 {
        out.push('.');
        for _ in 0..52 {
            frac *= radix as f64;
            let d = frac.trunc() as u32;
            out.push(std::char::from_digit(d, radix).unwrap_or('0'));
            frac -= d as f64;
            if frac <= 0.0 {
                break;
            }
        }
    }
    if negative {
        format!("-{}", out)
    } else {
        out
    }
}

fn number_statics() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "isInteger", 1, |_, _, args| {
        Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite() && n.trunc() == n)))
    });
    method(&mut table, "isSafeInteger", 1, |_, _, args| {
        Ok(Value::Bool(matches!(
            arg(args, 0),
            Value::Number(n) if n.is_finite() && n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
        )))
    });
    method(&mut table, "isFinite", 1, |_, _, args| {
        Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
    });
    method(&mut table, "isNaN", 1, |_, _, args| {
        Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
    });
    method(&mut table, "parseFloat", 1, global_parse_float);
    method(&mut table, "parseInt", 2, global_parse_int);

    table.insert("MAX_SAFE_INTEGER", Value::Number(MAX_SAFE_INTEGER));
    table.insert("MIN_SAFE_INTEGER", Value::Number(-MAX_SAFE_INTEGER));
    table.insert("EPSILON", Value::Number(f64::EPSILON));
    table.insert("MAX_VALUE", Value::Number(f64::MAX));
    table.insert("MIN_VALUE", Value::Number(5e-324));
    table.insert("POSITIVE_INFINITY", Value::Number(f64::INFINITY));
    table.insert("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
    table.insert("NaN", Value::Number(f64::NAN));
    table
}

fn global_parse_int(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let input = interp.to_string(&arg(args, 0))?;
    let radix = match arg(args, 1) {
        Value::Undefined => None,
        other => Some(crate::value::to_int32(interp.to_number(&other)?) as u32),
    };
    Ok(Value::Number(parse_int(&input, radix)))
}

fn global_parse_float(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let input = interp.to_string(&arg(args, 0))?;
    Ok(Value::Number(parse_float(&input)))
}

pub fn install(interp: &mut Interpreter) {
    let number = Function::native_constructor("Number", 1, |interp, _, args| match args.first() {
        None => Ok(Value::Number(0.0)),
        Some(value) => Ok(Value::Number(interp.to_number(value)?)),
    });
    if let Value::Function(function) = &number {
        function.properties.borrow_mut().extend(
            number_statics()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value)),
        );
    }
    interp.define_global("Number", number);

    interp.define_global(
        "Boolean",
        Function::native_constructor("Boolean", 1, |_, _, args| {
            Ok(Value::Bool(arg(args, 0).is_truthy()))
        }),
    );
    interp.define_global("parseInt", Function::native("parseInt", 2, global_parse_int));
    interp.define_global("parseFloat", Function::native("parseFloat", 1, global_parse_float));
    interp.define_global(
        "isNaN",
        Function::native("isNaN", 1, |interp, _, args| {
            Ok(Value::Bool(interp.to_number(&arg(args, 0))?.is_nan()))
        }),
    );
    interp.define_global(
        "isFinite",
        Function::native("isFinite", 1, |interp, _, args| {
            Ok(Value::Bool(interp.to_number(&arg(args, 0))?.is_finite()))
        }),
    );
}

pub fn prototype() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "toFixed", 1, |interp, this, args| {
        let n = this_number(this, "toFixed")?;
        let digits = super::to_integer(interp.to_number(&arg(args, 0))?);
        if !(0.0..=100.0).contains(&digits) {
            return Err(RuntimeError::range_error(
                "toFixed() digits argument must be between 0 and 100",
            ));
        }
        Ok(Value::string(to_fixed(n, digits as usize)))
    });
    method(&mut table, "toPrecision", 1, |interp, this, args| {
        let n = this_number(this, "toPrecision")?;
        let precision = match arg(args, 0) {
            Value::Undefined => return Ok(Value::string(number_to_string(n))),
            other => super::to_integer(interp.to_number(&other)?),
        };
        if !(1.0..=100.0).contains(&precision) {
            return Err(RuntimeError::range_error(
                "toPrecision() argument must be between 1 and 100",
            ));
        }
        Ok(Value::string(to_precision(n, precision as usize)))
    });
    method(&mut table, "toString", 1, |interp, this, args| {
        let n = this_number(this, "toString")?;
        let radix = match arg(args, 0) {
            Value::Undefined => 10.0,
            other => super::to_integer(interp.to_number(&other)?),
        };
        if !(2.0..=36.0).contains(&radix) {
            return Err(RuntimeError::range_error(
                "toString() radix must be between 2 and 36",
            ));
        }
        Ok(Value::string(to_radix_string(n, radix as u32)))
    });
    method(&mut table, "valueOf", 0, |_, this, _| Ok(Value::Number(this_number(this, "valueOf")?)));
    table
}

pub fn boolean_prototype() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "toString", 0, |_, this, _| Ok(Value::string(this.to_display_string())));
    method(&mut table, "valueOf", 0, |_, this, _| Ok(this.clone()));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("42", None, 42.0)]
    #[case("  -17px", None, -17.0)]
    #[case("0x1f", None, 31.0)]
    #[case("ff", Some(16), 255.0)]
    #[case("101", Some(2), 5.0)]
    #[case("3.9", None, 3.0)]
    fn test_parse_int(#[case] input: &str, #[case] radix: Option<u32>, #[case] expected: f64) {
        assert_eq!(parse_int(input, radix), expected);
    }

    #[test]
    fn test_parse_int_nan() {
        assert!(parse_int("abc", None).is_nan());
        assert!(parse_int("", None).is_nan());
        assert!(parse_int("1", Some(1)).is_nan());
    }

    #[rstest]
    #[case("3.14abc", 3.14)]
    #[case(".5", 0.5)]
    #[case("-2e3x", -2000.0)]
    #[case("1e", 1.0)]
    #[case("-Infinity", f64::NEG_INFINITY)]
    fn test_parse_float(#[case] input: &str, #[case] expected: f64) {
        assert_eq!(parse_float(input), expected);
    }

    #[rstest]
    #[case(3.14159, 2, "3.14")]
    #[case(2.5, 0, "3")]
    #[case(1.005, 2, "1.00")]
    #[case(-0.001, 2, "-0.00")]
    #[case(-0.0, 2, "0.00")]
    #[case(10.0, 1, "10.0")]
    fn test_to_fixed(#[case] n: f64, #[case] digits: usize, #[case] expected: &str) {
        assert_eq!(to_fixed(n, digits), expected);
    }

    #[test]
    fn test_to_precision_and_radix() {
        assert_eq!(to_precision(123.456, 4), "123.5");
        assert_eq!(to_precision(0.000123, 2), "0.00012");
        assert_eq!(to_precision(123456.0, 2), "1.2e+5");
        assert_eq!(to_radix_string(255.0, 16), "ff");
        assert_eq!(to_radix_string(-5.0, 2), "-101");
        assert_eq!(to_radix_string(0.5, 2), "0.1");
    }
}
