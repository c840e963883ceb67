// ABOUTME: String built-ins: case, trimming, splitting, and substring search

use super::util::expect_str;
use super::{Arity, BuiltinTable};
use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use std::rc::Rc;

pub fn register(table: &BuiltinTable) {
    table.register("lower", Arity::Fixed(1), Rc::new(lower));
    table.register("upper", Arity::Fixed(1), Rc::new(upper));
    table.register("strip", Arity::Fixed(1), Rc::new(strip));
    table.register("split", Arity::Range(1, 2), Rc::new(split));
    table.register("join", Arity::Fixed(2), Rc::new(join));
    table.register("replace", Arity::Fixed(3), Rc::new(replace));
    table.register("find", Arity::Fixed(2), Rc::new(find));
    table.register("startswith", Arity::Fixed(2), Rc::new(startswith));
    table.register("endswith", Arity::Fixed(2), Rc::new(endswith));
}

fn lower(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Str(expect_str(&args[0], "lower", span)?.to_lowercase()))
}

fn upper(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Str(expect_str(&args[0], "upper", span)?.to_uppercase()))
}

fn strip(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Str(expect_str(&args[0], "strip", span)?.trim().to_string()))
}

fn split(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let s = expect_str(&args[0], "split", span)?;
    let parts: Vec<Value> = if args.len() == 2 {
        let sep = expect_str(&args[1], "split", span)?;
        if sep.is_empty() {
            return Err(PyrlError::type_error("split: separator cannot be empty".to_string(), span));
        }
        s.split(sep).map(|p| Value::Str(p.to_string())).collect()
    } else {
        s.split_whitespace().map(|p| Value::Str(p.to_string())).collect()
    };
    Ok(Value::list(parts))
}

fn join(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let sep = expect_str(&args[0], "join", span)?;
    let items = super::util::expect_list(&args[1], "join", span)?;
    let parts: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
    Ok(Value::Str(parts.join(sep)))
}

fn replace(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let s = expect_str(&args[0], "replace", span)?;
    let from = expect_str(&args[1], "replace", span)?;
    let to = expect_str(&args[2], "replace", span)?;
    Ok(Value::Str(s.replace(from, to)))
}

fn find(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let s = expect_str(&args[0], "find", span)?;
    let needle = expect_str(&args[1], "find", span)?;
    let pos = s.find(needle).map(|byte_idx| s[..byte_idx].chars().count() as i64).unwrap_or(-1);
    Ok(Value::Int(pos))
}

fn startswith(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let s = expect_str(&args[0], "startswith", span)?;
    let prefix = expect_str(&args[1], "startswith", span)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn endswith(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let s = expect_str(&args[0], "endswith", span)?;
    let suffix = expect_str(&args[1], "endswith", span)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}
