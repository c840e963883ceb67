// ABOUTME: Core built-ins: output, introspection, coercions, and scalar math

use super::util::{expect_int, expect_list, expect_number};
use super::{Arity, BuiltinTable};
use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use std::rc::Rc;

pub fn register(table: &BuiltinTable) {
    table.register("print", Arity::Variadic, Rc::new(print));
    table.register("len", Arity::Fixed(1), Rc::new(len));
    table.register("range", Arity::Range(1, 3), Rc::new(range));
    table.register("int", Arity::Fixed(1), Rc::new(int));
    table.register("float", Arity::Fixed(1), Rc::new(float));
    table.register("str", Arity::Fixed(1), Rc::new(str_));
    table.register("bool", Arity::Fixed(1), Rc::new(bool_));
    table.register("list", Arity::Fixed(1), Rc::new(list));
    table.register("dict", Arity::Fixed(1), Rc::new(dict));
    table.register("type", Arity::Fixed(1), Rc::new(type_));
    table.register("abs", Arity::Fixed(1), Rc::new(abs));
    table.register("round", Arity::Range(1, 2), Rc::new(round));
    table.register("min", Arity::Variadic, Rc::new(min));
    table.register("max", Arity::Variadic, Rc::new(max));
    table.register("sum", Arity::Variadic, Rc::new(sum));
    table.register("pow", Arity::Fixed(2), Rc::new(pow));
    table.register("sqrt", Arity::Fixed(1), Rc::new(sqrt));
    table.register("sin", Arity::Fixed(1), Rc::new(sin));
    table.register("cos", Arity::Fixed(1), Rc::new(cos));
    table.register("tan", Arity::Fixed(1), Rc::new(tan));
    table.register("log", Arity::Range(1, 2), Rc::new(log));
    table.register("exp", Arity::Fixed(1), Rc::new(exp));
    table.register("floor", Arity::Fixed(1), Rc::new(floor));
    table.register("ceil", Arity::Fixed(1), Rc::new(ceil));
}

fn print(ev: &Evaluator, args: &[Value], _span: Span) -> Result<Value, PyrlError> {
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    ev.write_stdout(&rendered.join(" "));
    ev.write_stdout("\n");
    Ok(Value::None)
}

fn len(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Hash(h) => h.borrow().len(),
        other => {
            return Err(PyrlError::type_error(
                format!("len: expected Str, List, or Hash, got {}", other.type_name()),
                span,
            ))
        }
    };
    Ok(Value::Int(n as i64))
}

fn range(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let (start, stop, step) = match args.len() {
        1 => (0, expect_int(&args[0], "range", span)?, 1),
        2 => (expect_int(&args[0], "range", span)?, expect_int(&args[1], "range", span)?, 1),
        3 => (
            expect_int(&args[0], "range", span)?,
            expect_int(&args[1], "range", span)?,
            expect_int(&args[2], "range", span)?,
        ),
        _ => unreachable!("arity checked by dispatcher"),
    };
    if step == 0 {
        return Err(PyrlError::type_error("range: step cannot be 0".to_string(), span));
    }
    let mut values = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            values.push(Value::Int(i));
            i += step;
        }
    } else {
        while i > stop {
            values.push(Value::Int(i));
            i += step;
        }
    }
    Ok(Value::list(values))
}

fn int(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => Ok(Value::Int(*n as i64)),
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        Value::Str(s) => {
            let trimmed = s.trim();
            let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16)
            } else if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
                i64::from_str_radix(bin, 2)
            } else {
                trimmed.parse::<i64>()
            };
            parsed
                .map(Value::Int)
                .map_err(|_| PyrlError::type_error(format!("int: invalid literal: {}", s), span))
        }
        other => Err(PyrlError::type_error(format!("int: cannot convert {}", other.type_name()), span)),
    }
}

fn float(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| PyrlError::type_error(format!("float: invalid literal: {}", s), span)),
        other => Err(PyrlError::type_error(format!("float: cannot convert {}", other.type_name()), span)),
    }
}

fn str_(_ev: &Evaluator, args: &[Value], _span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Str(args[0].to_string()))
}

fn bool_(_ev: &Evaluator, args: &[Value], _span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Bool(args[0].is_truthy()))
}

fn list(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    match &args[0] {
        Value::List(items) => Ok(Value::list(items.borrow().clone())),
        Value::Str(s) => Ok(Value::list(s.chars().map(|c| Value::Str(c.to_string())).collect())),
        Value::Hash(h) => Ok(Value::list(h.borrow().keys().map(|k| Value::Str(k.clone())).collect())),
        other => Err(PyrlError::type_error(format!("list: cannot convert {}", other.type_name()), span)),
    }
}

fn dict(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    match &args[0] {
        Value::Hash(h) => Ok(Value::hash(h.borrow().clone())),
        Value::List(items) => {
            let mut map = indexmap::IndexMap::new();
            for item in items.borrow().iter() {
                match item {
                    Value::List(pair) => {
                        let pair = pair.borrow();
                        if pair.len() != 2 {
                            return Err(PyrlError::type_error(
                                "dict: each entry must be a 2-element list".to_string(),
                                span,
                            ));
                        }
                        map.insert(super::util::hash_key(&pair[0]), pair[1].clone());
                    }
                    other => {
                        return Err(PyrlError::type_error(
                            format!("dict: cannot build an entry from {}", other.type_name()),
                            span,
                        ))
                    }
                }
            }
            Ok(Value::hash(map))
        }
        other => Err(PyrlError::type_error(format!("dict: cannot convert {}", other.type_name()), span)),
    }
}

fn type_(_ev: &Evaluator, args: &[Value], _span: Span) -> Result<Value, PyrlError> {
    let name = match &args[0] {
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Str(_) => "str",
        Value::Bool(_) => "bool",
        Value::None => "none",
        Value::List(_) => "list",
        Value::Hash(_) => "dict",
        Value::Function(_) | Value::BuiltIn(_) => "function",
        Value::Class(_) => "class",
        Value::Instance(_) => "instance",
        Value::Regex(_) => "regex",
    };
    Ok(Value::Str(name.to_string()))
}

fn abs(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(PyrlError::type_error(format!("abs: expected a number, got {}", other.type_name()), span)),
    }
}

fn round(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let x = expect_number(&args[0], "round", span)?;
    if args.len() == 2 {
        let digits = expect_int(&args[1], "round", span)?;
        let factor = 10f64.powi(digits as i32);
        return Ok(Value::Float((x * factor).round() / factor));
    }
    Ok(Value::Int(x.round() as i64))
}

fn min(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    extreme(args, span, "min", |a, b| a < b)
}

fn max(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    extreme(args, span, "max", |a, b| a > b)
}

fn extreme(args: &[Value], span: Span, who: &str, better: fn(f64, f64) -> bool) -> Result<Value, PyrlError> {
    let pool: Vec<Value> = if args.len() == 1 {
        if let Value::List(items) = &args[0] {
            items.borrow().clone()
        } else {
            vec![args[0].clone()]
        }
    } else {
        args.to_vec()
    };
    if pool.is_empty() {
        return Err(PyrlError::type_error(format!("{}: empty sequence", who), span));
    }
    let mut best = pool[0].clone();
    let mut best_n = expect_number(&best, who, span)?;
    for v in &pool[1..] {
        let n = expect_number(v, who, span)?;
        if better(n, best_n) {
            best = v.clone();
            best_n = n;
        }
    }
    Ok(best)
}

fn sum(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let pool: Vec<Value> = if args.len() == 1 {
        expect_list(&args[0], "sum", span)?.borrow().clone()
    } else {
        args.to_vec()
    };
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut saw_float = false;
    for v in &pool {
        match v {
            Value::Int(n) => int_total += n,
            Value::Float(n) => {
                saw_float = true;
                float_total += n;
            }
            other => return Err(PyrlError::type_error(format!("sum: expected a number, got {}", other.type_name()), span)),
        }
    }
    if saw_float {
        Ok(Value::Float(float_total + int_total as f64))
    } else {
        Ok(Value::Int(int_total))
    }
}

fn pow(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) if *b >= 0 => Ok(Value::Int(a.pow(*b as u32))),
        _ => {
            let a = expect_number(&args[0], "pow", span)?;
            let b = expect_number(&args[1], "pow", span)?;
            Ok(Value::Float(a.powf(b)))
        }
    }
}

fn sqrt(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Float(expect_number(&args[0], "sqrt", span)?.sqrt()))
}

fn sin(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Float(expect_number(&args[0], "sin", span)?.sin()))
}

fn cos(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Float(expect_number(&args[0], "cos", span)?.cos()))
}

fn tan(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Float(expect_number(&args[0], "tan", span)?.tan()))
}

fn log(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let x = expect_number(&args[0], "log", span)?;
    if args.len() == 2 {
        let base = expect_number(&args[1], "log", span)?;
        return Ok(Value::Float(x.log(base)));
    }
    Ok(Value::Float(x.ln()))
}

fn exp(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Float(expect_number(&args[0], "exp", span)?.exp()))
}

fn floor(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Int(expect_number(&args[0], "floor", span)?.floor() as i64))
}

fn ceil(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Int(expect_number(&args[0], "ceil", span)?.ceil() as i64))
}
