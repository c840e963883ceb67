// ABOUTME: List and hash built-ins: mutation, views, and higher-order iteration

use super::util::{expect_hash, expect_list, hash_key};
use super::{Arity, BuiltinTable};
use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use std::cmp::Ordering;
use std::rc::Rc;

pub fn register(table: &BuiltinTable) {
    table.register("append", Arity::Fixed(2), Rc::new(append));
    table.register("extend", Arity::Fixed(2), Rc::new(extend));
    table.register("insert", Arity::Fixed(3), Rc::new(insert));
    table.register("remove", Arity::Fixed(2), Rc::new(remove));
    table.register("pop", Arity::Range(1, 2), Rc::new(pop));
    table.register("sort", Arity::Fixed(1), Rc::new(sort));
    table.register("sorted", Arity::Fixed(1), Rc::new(sorted));
    table.register("reverse", Arity::Fixed(1), Rc::new(reverse));
    table.register("reversed", Arity::Fixed(1), Rc::new(reversed));
    table.register("keys", Arity::Fixed(1), Rc::new(keys));
    table.register("values", Arity::Fixed(1), Rc::new(values));
    table.register("items", Arity::Fixed(1), Rc::new(items));
    table.register("get", Arity::Range(2, 3), Rc::new(get));
    table.register("setdefault", Arity::Fixed(3), Rc::new(setdefault));
    table.register("update", Arity::Fixed(2), Rc::new(update));
    table.register("enumerate", Arity::Fixed(1), Rc::new(enumerate));
    table.register("zip", Arity::Fixed(2), Rc::new(zip));
    table.register("map", Arity::Fixed(2), Rc::new(map));
    table.register("filter", Arity::Fixed(2), Rc::new(filter));
    table.register("any", Arity::Fixed(2), Rc::new(any));
    table.register("all", Arity::Fixed(2), Rc::new(all));
}

fn compare(a: &Value, b: &Value, span: Span) -> Result<Ordering, PyrlError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let x = if let Value::Int(n) = a { *n as f64 } else if let Value::Float(n) = a { *n } else { unreachable!() };
            let y = if let Value::Int(n) = b { *n as f64 } else if let Value::Float(n) = b { *n } else { unreachable!() };
            x.partial_cmp(&y).ok_or_else(|| PyrlError::type_error("sort: cannot order NaN".to_string(), span))
        }
        _ => Err(PyrlError::type_error(
            format!("sort: cannot order {} and {}", a.type_name(), b.type_name()),
            span,
        )),
    }
}

fn append(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    expect_list(&args[0], "append", span)?.borrow_mut().push(args[1].clone());
    Ok(Value::None)
}

fn extend(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let target = expect_list(&args[0], "extend", span)?;
    let extra = expect_list(&args[1], "extend", span)?;
    let extra_items = extra.borrow().clone();
    target.borrow_mut().extend(extra_items);
    Ok(Value::None)
}

fn insert(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let list = expect_list(&args[0], "insert", span)?;
    let idx = super::util::expect_int(&args[1], "insert", span)?;
    let mut items = list.borrow_mut();
    let pos = (idx.max(0) as usize).min(items.len());
    items.insert(pos, args[2].clone());
    Ok(Value::None)
}

fn remove(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let list = expect_list(&args[0], "remove", span)?;
    let mut items = list.borrow_mut();
    if let Some(pos) = items.iter().position(|v| *v == args[1]) {
        items.remove(pos);
        Ok(Value::None)
    } else {
        Err(PyrlError::type_error("remove: value not found in list".to_string(), span))
    }
}

fn pop(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let list = expect_list(&args[0], "pop", span)?;
    let mut items = list.borrow_mut();
    if items.is_empty() {
        return Err(PyrlError::index_error("pop from empty list".to_string(), span));
    }
    let idx = if args.len() == 2 {
        let raw = super::util::expect_int(&args[1], "pop", span)?;
        let resolved = if raw < 0 { raw + items.len() as i64 } else { raw };
        if resolved < 0 || resolved as usize >= items.len() {
            return Err(PyrlError::index_error(format!("pop index {} out of range", raw), span));
        }
        resolved as usize
    } else {
        items.len() - 1
    };
    Ok(items.remove(idx))
}

fn sort(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let list = expect_list(&args[0], "sort", span)?;
    let mut err = None;
    list.borrow_mut().sort_by(|a, b| match compare(a, b, span) {
        Ok(ord) => ord,
        Err(e) => {
            err = Some(e);
            Ordering::Equal
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(Value::None)
}

fn sorted(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let list = expect_list(&args[0], "sorted", span)?;
    let mut items = list.borrow().clone();
    let mut err = None;
    items.sort_by(|a, b| match compare(a, b, span) {
        Ok(ord) => ord,
        Err(e) => {
            err = Some(e);
            Ordering::Equal
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(Value::list(items))
}

fn reverse(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    expect_list(&args[0], "reverse", span)?.borrow_mut().reverse();
    Ok(Value::None)
}

fn reversed(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let mut items = expect_list(&args[0], "reversed", span)?.borrow().clone();
    items.reverse();
    Ok(Value::list(items))
}

fn keys(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let h = expect_hash(&args[0], "keys", span)?;
    Ok(Value::list(h.borrow().keys().map(|k| Value::Str(k.clone())).collect()))
}

fn values(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let h = expect_hash(&args[0], "values", span)?;
    Ok(Value::list(h.borrow().values().cloned().collect()))
}

fn items(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let h = expect_hash(&args[0], "items", span)?;
    let pairs = h
        .borrow()
        .iter()
        .map(|(k, v)| Value::list(vec![Value::Str(k.clone()), v.clone()]))
        .collect();
    Ok(Value::list(pairs))
}

fn get(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let h = expect_hash(&args[0], "get", span)?;
    let key = hash_key(&args[1]);
    let default = args.get(2).cloned().unwrap_or(Value::None);
    Ok(h.borrow().get(&key).cloned().unwrap_or(default))
}

fn setdefault(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let h = expect_hash(&args[0], "setdefault", span)?;
    let key = hash_key(&args[1]);
    let mut map = h.borrow_mut();
    if let Some(existing) = map.get(&key) {
        return Ok(existing.clone());
    }
    map.insert(key, args[2].clone());
    Ok(args[2].clone())
}

fn update(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let target = expect_hash(&args[0], "update", span)?;
    let source = expect_hash(&args[1], "update", span)?;
    let entries: Vec<(String, Value)> = source.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let mut map = target.borrow_mut();
    for (k, v) in entries {
        map.insert(k, v);
    }
    Ok(Value::None)
}

fn enumerate(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let items = expect_list(&args[0], "enumerate", span)?;
    let pairs = items
        .borrow()
        .iter()
        .enumerate()
        .map(|(i, v)| Value::list(vec![Value::Int(i as i64), v.clone()]))
        .collect();
    Ok(Value::list(pairs))
}

fn zip(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let a = expect_list(&args[0], "zip", span)?;
    let b = expect_list(&args[1], "zip", span)?;
    let a = a.borrow();
    let b = b.borrow();
    let pairs = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| Value::list(vec![x.clone(), y.clone()]))
        .collect();
    Ok(Value::list(pairs))
}

fn map(ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let items = expect_list(&args[1], "map", span)?;
    let snapshot = items.borrow().clone();
    let mut mapped = Vec::with_capacity(snapshot.len());
    for item in snapshot {
        mapped.push(ev.call_value(&args[0], vec![item], span)?);
    }
    Ok(Value::list(mapped))
}

fn filter(ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let items = expect_list(&args[1], "filter", span)?;
    let snapshot = items.borrow().clone();
    let mut kept = Vec::new();
    for item in snapshot {
        if ev.call_value(&args[0], vec![item.clone()], span)?.is_truthy() {
            kept.push(item);
        }
    }
    Ok(Value::list(kept))
}

fn any(ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let items = expect_list(&args[1], "any", span)?;
    let snapshot = items.borrow().clone();
    for item in snapshot {
        if ev.call_value(&args[0], vec![item], span)?.is_truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn all(ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let items = expect_list(&args[1], "all", span)?;
    let snapshot = items.borrow().clone();
    for item in snapshot {
        if !ev.call_value(&args[0], vec![item], span)?.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}
