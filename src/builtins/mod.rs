// ABOUTME: Built-in dispatch table: registration and invocation of host operations

mod collections;
mod core;
mod json;
mod random;
mod regexp;
mod strings;
mod time;
pub(crate) mod util;

use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// How many arguments a built-in accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Range(usize, usize),
    Variadic,
}

impl Arity {
    fn describe(&self) -> String {
        match self {
            Arity::Fixed(n) => n.to_string(),
            Arity::Range(lo, hi) => format!("{}..{}", lo, hi),
            Arity::Variadic => "any number of".to_string(),
        }
    }

    fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Fixed(k) => n == *k,
            Arity::Range(lo, hi) => n >= *lo && n <= *hi,
            Arity::Variadic => true,
        }
    }
}

/// A built-in handler. It receives the evaluator so higher-order built-ins
/// (`map`, `filter`, `any`, `all`) can call back into user-defined functions.
pub type BuiltinHandler = Rc<dyn Fn(&Evaluator, &[Value], Span) -> Result<Value, PyrlError>>;

/// A built-in supplied by a host embedder, ignorant of the evaluator.
pub type HostBuiltin = Rc<dyn Fn(&[Value], Span) -> Result<Value, PyrlError>>;

struct BuiltinEntry {
    arity: Arity,
    handler: BuiltinHandler,
}

/// The bare-name-keyed table of built-in operations, separate from any
/// environment frame: built-ins are looked up by bare name directly, never
/// stored as ordinary bindings.
pub struct BuiltinTable {
    entries: RefCell<HashMap<String, BuiltinEntry>>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        let table = BuiltinTable { entries: RefCell::new(HashMap::new()) };
        core::register(&table);
        strings::register(&table);
        collections::register(&table);
        random::register(&table);
        regexp::register(&table);
        time::register(&table);
        json::register(&table);
        table
    }

    pub fn register(&self, name: impl Into<String>, arity: Arity, handler: BuiltinHandler) {
        self.entries.borrow_mut().insert(name.into(), BuiltinEntry { arity, handler });
    }

    /// Registers a host-supplied built-in, as exposed by the `register_builtin`
    /// embedding operation. The evaluator parameter is simply ignored.
    pub fn register_host(&self, name: impl Into<String>, arity: Arity, handler: HostBuiltin) {
        let wrapped: BuiltinHandler = Rc::new(move |_ev, args, span| handler(args, span));
        self.register(name, arity, wrapped);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn call(&self, evaluator: &Evaluator, name: &str, args: &[Value], span: Span) -> Result<Value, PyrlError> {
        let (arity, handler) = {
            let entries = self.entries.borrow();
            let entry = entries
                .get(name)
                .ok_or_else(|| PyrlError::name_error(format!("Undefined function: {}", name), span))?;
            (entry.arity, entry.handler.clone())
        };
        if !arity.accepts(args.len()) {
            return Err(PyrlError::arity_error(name, arity.describe(), args.len(), span));
        }
        handler(evaluator, args, span)
    }
}

impl Default for BuiltinTable {
    fn default() -> Self {
        Self::new()
    }
}
