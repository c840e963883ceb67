// ABOUTME: Regex built-ins layered over the `=~`/`!~`/`s///` language operators

use super::util::expect_str;
use super::{Arity, BuiltinTable};
use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::rc::Rc;

pub fn register(table: &BuiltinTable) {
    table.register("re_match", Arity::Range(2, 3), Rc::new(re_match));
    table.register("re_search", Arity::Range(2, 3), Rc::new(re_search));
    table.register("re_findall", Arity::Range(2, 3), Rc::new(re_findall));
    table.register("re_sub", Arity::Range(3, 4), Rc::new(re_sub));
    table.register("re_split", Arity::Range(2, 3), Rc::new(re_split));
}

fn build_pattern(raw: &str, flags: &str) -> String {
    let mut prefix = String::new();
    for f in flags.chars() {
        match f {
            'i' => prefix.push('i'),
            'm' => prefix.push('m'),
            's' => prefix.push('s'),
            _ => {}
        }
    }
    if prefix.is_empty() {
        raw.to_string()
    } else {
        format!("(?{}){}", prefix, raw)
    }
}

fn compile(args: &[Value], idx: usize, who: &str, span: Span) -> Result<Regex, PyrlError> {
    let pattern = expect_str(&args[idx], who, span)?;
    let flags = args.get(idx + 1).map(|v| expect_str(v, who, span)).transpose()?.unwrap_or("");
    let full = build_pattern(pattern, flags);
    Regex::new(&full).map_err(|e| PyrlError::regex_error(e.to_string(), span))
}

/// A descriptor hash carrying `match`, `groups`, `start`, `end`, matching
/// `re_match`/`re_search`'s documented return shape.
fn match_descriptor(re: &Regex, text: &str) -> Option<Value> {
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    let groups: Vec<Value> = caps
        .iter()
        .skip(1)
        .map(|g| g.map(|m| Value::Str(m.as_str().to_string())).unwrap_or(Value::None))
        .collect();
    let mut map = IndexMap::new();
    map.insert("match".to_string(), Value::Str(whole.as_str().to_string()));
    map.insert("groups".to_string(), Value::list(groups));
    map.insert("start".to_string(), Value::Int(whole.start() as i64));
    map.insert("end".to_string(), Value::Int(whole.end() as i64));
    Some(Value::hash(map))
}

fn re_match(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let text = expect_str(&args[0], "re_match", span)?;
    let re = compile(args, 1, "re_match", span)?;
    match re.find(text) {
        Some(m) if m.start() == 0 => Ok(match_descriptor(&re, text).unwrap_or(Value::None)),
        _ => Ok(Value::None),
    }
}

fn re_search(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let text = expect_str(&args[0], "re_search", span)?;
    let re = compile(args, 1, "re_search", span)?;
    Ok(match_descriptor(&re, text).unwrap_or(Value::None))
}

fn re_findall(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let text = expect_str(&args[0], "re_findall", span)?;
    let re = compile(args, 1, "re_findall", span)?;
    let found = re.find_iter(text).map(|m| Value::Str(m.as_str().to_string())).collect();
    Ok(Value::list(found))
}

fn re_sub(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let text = expect_str(&args[0], "re_sub", span)?;
    let replacement = expect_str(&args[1], "re_sub", span)?;
    let re = compile(args, 2, "re_sub", span)?;
    Ok(Value::Str(re.replace_all(text, replacement).into_owned()))
}

fn re_split(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let text = expect_str(&args[0], "re_split", span)?;
    let re = compile(args, 1, "re_split", span)?;
    let parts = re.split(text).map(|p| Value::Str(p.to_string())).collect();
    Ok(Value::list(parts))
}

