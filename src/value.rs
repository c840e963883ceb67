// ABOUTME: Runtime value types produced and consumed by the evaluator

use crate::ast::{Expr, Param, Stmt};
use crate::env::Environment;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A user-defined function: its parameter list, body, and the environment
/// it closes over at the point of definition (not the call site).
#[derive(Debug)]
pub struct FunctionValue {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub closure: Rc<Environment>,
}

/// A class descriptor: its own property defaults, its own methods, and an
/// optional link to the parent class for linear single inheritance.
#[derive(Debug)]
pub struct ClassValue {
    pub name: String,
    pub parent: Option<Rc<ClassValue>>,
    pub props: Vec<(String, Option<Expr>)>,
    pub methods: IndexMap<String, Rc<FunctionValue>>,
}

impl ClassValue {
    /// Walks the `extends` chain looking for a method, most-derived first.
    pub fn find_method(&self, name: &str) -> Option<Rc<FunctionValue>> {
        if let Some(m) = self.methods.get(name) {
            return Some(m.clone());
        }
        self.parent.as_ref().and_then(|p| p.find_method(name))
    }

    /// Collects `(name, default expr)` pairs from the root ancestor down to
    /// this class, so a subclass's own prop of the same name overrides its
    /// parent's default while preserving declaration order.
    pub fn all_props(&self) -> Vec<(String, Option<Expr>)> {
        let mut props = match &self.parent {
            Some(p) => p.all_props(),
            None => Vec::new(),
        };
        for (name, default) in &self.props {
            if let Some(existing) = props.iter_mut().find(|(n, _)| n == name) {
                existing.1 = default.clone();
            } else {
                props.push((name.clone(), default.clone()));
            }
        }
        props
    }
}

/// An instance's fields live behind a shared, mutable cell: instances have
/// reference semantics, so assigning one variable to another aliases the
/// same object rather than copying it.
#[derive(Debug)]
pub struct InstanceValue {
    pub class: Rc<ClassValue>,
    pub fields: Rc<RefCell<IndexMap<String, Value>>>,
}

#[derive(Debug, Clone)]
pub struct RegexValue {
    pub pattern: String,
    pub flags: String,
    pub compiled: Rc<regex::Regex>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    /// Lists and hashes carry reference semantics: two bindings to the same
    /// list alias the same backing storage.
    List(Rc<RefCell<Vec<Value>>>),
    Hash(Rc<RefCell<IndexMap<String, Value>>>),
    Function(Rc<FunctionValue>),
    BuiltIn(String),
    Class(Rc<ClassValue>),
    Instance(Rc<InstanceValue>),
    Regex(RegexValue),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn hash(pairs: IndexMap<String, Value>) -> Value {
        Value::Hash(Rc::new(RefCell::new(pairs)))
    }

    /// The type name used in diagnostics, matching `Cannot access index '...'
    /// on <type-name>` and similar messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Bool(_) => "Bool",
            Value::None => "None",
            Value::List(_) => "List",
            Value::Hash(_) => "Hash",
            Value::Function(_) => "Function",
            Value::BuiltIn(_) => "Function",
            Value::Class(_) => "Class",
            Value::Instance(_) => "Instance",
            Value::Regex(_) => "Regex",
        }
    }

    /// A type description suitable for error messages, naming the class for
    /// instances (`Instance of Counter`) rather than just `Instance`.
    pub fn descriptive_type(&self) -> String {
        match self {
            Value::Instance(i) => format!("Instance of {}", i.class.name),
            other => other.type_name().to_string(),
        }
    }

    /// Truthiness per the runtime's rules: `None`, `False`, `0`, `0.0`, `""`,
    /// `[]`, and `{}` are falsy; everything else (including instances and
    /// functions) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Hash(h) => !h.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::List(a), Value::List(b)) => *a.borrow() == *b.borrow(),
            (Value::Hash(a), Value::Hash(b)) => *a.borrow() == *b.borrow(),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::None => write!(f, "None"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_repr(f, item)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: ", k)?;
                    write_repr(f, v)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::BuiltIn(name) => write!(f, "<built-in {}>", name),
            Value::Class(c) => write!(f, "<class {}>", c.name),
            Value::Instance(i) => write!(f, "<instance of {}>", i.class.name),
            Value::Regex(r) => write!(f, "<regex /{}/{}>", r.pattern, r.flags),
        }
    }
}

/// Renders an element nested inside a list/hash display, quoting strings so
/// `[1, "a"]` reads unambiguously instead of `[1, a]`.
fn write_repr(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Str(s) => write!(f, "{:?}", s),
        other => write!(f, "{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_float_equality_promotes() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
    }

    #[test]
    fn test_truthiness_of_falsy_values() {
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(!Value::hash(IndexMap::new()).is_truthy());
    }

    #[test]
    fn test_truthiness_of_truthy_values() {
        assert!(Value::Int(1).is_truthy());
        assert!(Value::Str("x".to_string()).is_truthy());
        assert!(Value::list(vec![Value::Int(0)]).is_truthy());
    }

    #[test]
    fn test_list_reference_semantics() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        assert!(a.same_identity(&b));
        if let Value::List(items) = &a {
            items.borrow_mut().push(Value::Int(2));
        }
        if let Value::List(items) = &b {
            assert_eq!(items.borrow().len(), 2);
        }
    }

    #[test]
    fn test_display_list_quotes_strings() {
        let v = Value::list(vec![Value::Int(1), Value::Str("a".to_string())]);
        assert_eq!(format!("{}", v), "[1, \"a\"]");
    }

    #[test]
    fn test_bool_display_capitalized() {
        assert_eq!(format!("{}", Value::Bool(true)), "True");
        assert_eq!(format!("{}", Value::Bool(false)), "False");
    }
}
