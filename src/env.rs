// ABOUTME: Environment module for managing sigil-scoped variable bindings

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A lexical scope frame. Bindings are keyed by the sigil-prefixed name as
/// written in source (`$x`, `@xs`, `%h`, `&f`) so the four sigils occupy
/// independent namespaces: `$len` and `&len` never collide.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment with a parent, for function calls,
    /// blocks, and closures.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Binds `key` in THIS scope, shadowing any same-named binding in a
    /// parent scope without touching it.
    pub fn define(&self, key: String, value: Value) {
        self.bindings.borrow_mut().insert(key, value);
    }

    /// Looks up `key` in this scope, then walks up the parent chain.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(key) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(key))
    }

    /// Assigns `key`: if it already exists anywhere in the chain, updates
    /// that binding in place (so a closure's writes are visible to its
    /// defining scope); otherwise creates a new binding in THIS scope.
    pub fn assign(&self, key: &str, value: Value) {
        if self.bindings.borrow().contains_key(key) {
            self.bindings.borrow_mut().insert(key.to_string(), value);
            return;
        }
        if let Some(parent) = &self.parent {
            if parent.contains(key) {
                parent.assign(key, value);
                return;
            }
        }
        self.bindings.borrow_mut().insert(key.to_string(), value);
    }

    fn contains(&self, key: &str) -> bool {
        self.bindings.borrow().contains_key(key)
            || self.parent.as_ref().map(|p| p.contains(key)).unwrap_or(false)
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.bindings.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let env = Environment::new();
        env.define("$x".to_string(), Value::Int(42));
        assert_eq!(env.get("$x"), Some(Value::Int(42)));
    }

    #[test]
    fn test_undefined_key() {
        let env = Environment::new();
        assert!(env.get("$missing").is_none());
    }

    #[test]
    fn test_sigil_namespaces_are_independent() {
        let env = Environment::new();
        env.define("$len".to_string(), Value::Int(5));
        assert_eq!(env.get("$len"), Some(Value::Int(5)));
        assert!(env.get("&len").is_none());
    }

    #[test]
    fn test_child_sees_parent_binding() {
        let parent = Environment::new();
        parent.define("$x".to_string(), Value::Int(1));
        let child = Environment::with_parent(parent);
        assert_eq!(child.get("$x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_assign_updates_existing_parent_binding() {
        let parent = Environment::new();
        parent.define("$x".to_string(), Value::Int(1));
        let child = Environment::with_parent(parent.clone());
        child.assign("$x", Value::Int(2));
        assert_eq!(parent.get("$x"), Some(Value::Int(2)));
    }

    #[test]
    fn test_assign_creates_in_current_scope_when_absent() {
        let parent = Environment::new();
        let child = Environment::with_parent(parent.clone());
        child.assign("$y", Value::Int(9));
        assert_eq!(parent.get("$y"), None);
        assert_eq!(child.get("$y"), Some(Value::Int(9)));
    }
}
