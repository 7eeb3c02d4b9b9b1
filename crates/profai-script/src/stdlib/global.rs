//! Global constants and `Function.prototype`

use super::{arg, method, MethodTable};
use crate::interpreter::{Interpreter, Scope};
use crate::value::{Function, FunctionKind, RuntimeError, Value};
use std::rc::Rc;

pub fn install(interp: &mut Interpreter) {
    let globals = interp.globals.clone();
    Scope::declare(&globals, "undefined", Value::Undefined, false);
    Scope::declare(&globals, "NaN", Value::Number(f64::NAN), false);
    Scope::declare(&globals, "Infinity", Value::Number(f64::INFINITY), false);
}

fn this_function(this: &Value, name: &str) -> Result<Rc<Function>, RuntimeError> {
    match this {
        Value::Function(f) => Ok(f.clone()),
        other => Err(RuntimeError::type_error(format!(
            "Function.prototype.{} called on {}",
            name,
            other.type_of()
        ))),
    }
}

pub fn function_prototype() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "call", 1, |interp, this, args| {
        this_function(this, "call")?;
        let this_arg = arg(args, 0);
        interp.call_function(this, this_arg, args.get(1..).unwrap_or(&[]))
    });
    method(&mut table, "apply", 2, |interp, this, args| {
        this_function(this, "apply")?;
        let this_arg = arg(args, 0);
        let call_args = match arg(args, 1) {
            Value::Undefined | Value::Null => Vec::new(),
            Value::Array(items) => items.borrow().clone(),
            _ => {
                return Err(RuntimeError::type_error(
                    "CreateListFromArrayLike called on non-object",
                ))
            }
        };
        interp.call_function(this, this_arg, &call_args)
    });
    method(&mut table, "bind", 1, |_, this, args| {
        let target = this_function(this, "bind")?;
        Ok(Value::Function(Rc::new(Function::new(FunctionKind::Bound {
            target,
            this: arg(args, 0),
            args: args.get(1..).unwrap_or(&[]).to_vec(),
        }))))
    });
    method(&mut table, "toString", 0, |_, this, _| {
        let function = this_function(this, "toString")?;
        Ok(Value::string(function.source_text()))
    });
    table
}
