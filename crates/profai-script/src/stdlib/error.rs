//! Error constructors

use super::arg;
use crate::interpreter::Interpreter;
use crate::value::{ErrorKind, Function, Value};

pub fn install(interp: &mut Interpreter) {
    for kind in ErrorKind::ALL {
        // Callable with or without `new`
        let constructor = Function::native_constructor(kind.name(), 1, move |interp, _, args| {
            let message = match arg(args, 0) {
                Value::Undefined => String::new(),
                other => interp.to_string(&other)?,
            };
            Ok(Value::new_error(kind, &message))
        });
        interp.define_global(kind.name(), constructor);
    }
}
