// ABOUTME: Wall-clock built-ins, explicitly non-deterministic

use super::util::expect_number;
use super::{Arity, BuiltinTable};
use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn register(table: &BuiltinTable) {
    table.register("time", Arity::Fixed(0), Rc::new(time));
    table.register("sleep", Arity::Fixed(1), Rc::new(sleep));
}

fn time(_ev: &Evaluator, _args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| PyrlError::type_error(format!("time: system clock error: {}", e), span))?;
    Ok(Value::Float(now.as_secs_f64()))
}

fn sleep(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let secs = expect_number(&args[0], "sleep", span)?;
    if secs < 0.0 {
        return Err(PyrlError::type_error("sleep: duration cannot be negative".to_string(), span));
    }
    std::thread::sleep(Duration::from_secs_f64(secs));
    Ok(Value::None)
}
