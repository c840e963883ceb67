// ABOUTME: Shared argument-coercion helpers for built-in implementations

use crate::error::PyrlError;
use crate::span::Span;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub fn expect_str<'a>(v: &'a Value, who: &str, span: Span) -> Result<&'a str, PyrlError> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(PyrlError::type_error(
            format!("{}: expected Str, got {}", who, other.type_name()),
            span,
        )),
    }
}

pub fn expect_int(v: &Value, who: &str, span: Span) -> Result<i64, PyrlError> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(PyrlError::type_error(
            format!("{}: expected Int, got {}", who, other.type_name()),
            span,
        )),
    }
}

pub fn expect_number(v: &Value, who: &str, span: Span) -> Result<f64, PyrlError> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(n) => Ok(*n),
        other => Err(PyrlError::type_error(
            format!("{}: expected a number, got {}", who, other.type_name()),
            span,
        )),
    }
}

pub fn expect_list(v: &Value, who: &str, span: Span) -> Result<Rc<RefCell<Vec<Value>>>, PyrlError> {
    match v {
        Value::List(items) => Ok(items.clone()),
        other => Err(PyrlError::type_error(
            format!("{}: expected List, got {}", who, other.type_name()),
            span,
        )),
    }
}

pub fn expect_hash(
    v: &Value,
    who: &str,
    span: Span,
) -> Result<Rc<RefCell<indexmap::IndexMap<String, Value>>>, PyrlError> {
    match v {
        Value::Hash(h) => Ok(h.clone()),
        other => Err(PyrlError::type_error(
            format!("{}: expected Hash, got {}", who, other.type_name()),
            span,
        )),
    }
}

/// Coerces a hash/index key the same way the evaluator does for `Index` and
/// `HashLit`: strings pass through verbatim, everything else stringifies.
pub fn hash_key(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}
