// ABOUTME: JSON interchange built-ins bridging Pyrl values and serde_json

use super::util::expect_str;
use super::{Arity, BuiltinTable};
use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;

pub fn register(table: &BuiltinTable) {
    table.register("json_parse", Arity::Fixed(1), Rc::new(json_parse));
    table.register("json_stringify", Arity::Fixed(1), Rc::new(json_stringify));
}

fn json_parse(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let text = expect_str(&args[0], "json_parse", span)?;
    let parsed: serde_json::Value =
        serde_json::from_str(text).map_err(|e| PyrlError::type_error(format!("json_parse: {}", e), span))?;
    Ok(from_json(&parsed))
}

fn json_stringify(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let json = to_json(&args[0], span)?;
    Ok(Value::Str(json.to_string()))
}

fn from_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::list(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), from_json(v));
            }
            Value::hash(out)
        }
    }
}

fn to_json(v: &Value, span: Span) -> Result<serde_json::Value, PyrlError> {
    Ok(match v {
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::None => serde_json::Value::Null,
        Value::List(items) => {
            let mut out = Vec::new();
            for item in items.borrow().iter() {
                out.push(to_json(item, span)?);
            }
            serde_json::Value::Array(out)
        }
        Value::Hash(h) => {
            let mut out = serde_json::Map::new();
            for (k, val) in h.borrow().iter() {
                out.insert(k.clone(), to_json(val, span)?);
            }
            serde_json::Value::Object(out)
        }
        other => {
            return Err(PyrlError::type_error(
                format!("json_stringify: cannot serialize {}", other.type_name()),
                span,
            ))
        }
    })
}
