// ABOUTME: Tree-walking evaluator: name resolution, control flow, functions, classes, regex ops

use crate::ast::{AssignTarget, BinaryOp, ClassMember, CompareOp, Expr, FuncKind, Literal, Param, Program, Sigil, Stmt, UnaryOp};
use crate::builtins::BuiltinTable;
use crate::config::Config;
use crate::env::Environment;
use crate::error::PyrlError;
use crate::span::Span;
use crate::value::{ClassValue, FunctionValue, InstanceValue, Value};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

/// A registered `test "label" { ... }` block, captured at the point it is
/// encountered during top-level execution and run later by `run_tests`.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub label: String,
    pub body: Vec<Stmt>,
}

/// One failing test block, as returned by `run_tests`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TestFailure {
    pub label: String,
    pub message: String,
    pub line: usize,
}

/// The aggregate result of `run_tests`, matching the embedding surface's
/// `{ passed, failed, total, failures[] }` shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
    pub failures: Vec<TestFailure>,
}

/// Signals how a statement (or block of statements) completed: either it
/// ran off the end normally, or a `return` unwound carrying a value. `if`,
/// `while`, and `for` bodies do not introduce their own scope frame — only
/// function and method calls do — so `Flow::Return` threads straight
/// through nested blocks to the call boundary.
enum Flow {
    Normal,
    Return(Value),
}

/// The tree-walking interpreter. Holds the global frame, the built-in
/// table, an accumulating stdout buffer, the test registry, and a call
/// depth counter standing in for the tail-call optimization `spec.md`
/// explicitly drops as a non-goal.
pub struct Evaluator {
    global: Rc<Environment>,
    builtins: Rc<BuiltinTable>,
    stdout: RefCell<String>,
    tests: RefCell<Vec<TestCase>>,
    depth: Cell<usize>,
    config: Config,
}

impl Evaluator {
    pub fn new(builtins: Rc<BuiltinTable>, config: Config) -> Self {
        Evaluator {
            global: Environment::new(),
            builtins,
            stdout: RefCell::new(String::new()),
            tests: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            config,
        }
    }

    pub fn global_env(&self) -> Rc<Environment> {
        self.global.clone()
    }

    pub fn builtins(&self) -> &BuiltinTable {
        &self.builtins
    }

    /// Discards all user globals and the test registry while keeping the
    /// built-in table, matching `reset()`'s documented contract.
    pub fn reset_globals(&mut self) {
        self.global = Environment::new();
        self.tests.borrow_mut().clear();
        self.depth.set(0);
    }

    pub fn write_stdout(&self, text: &str) {
        self.stdout.borrow_mut().push_str(text);
    }

    pub fn take_stdout(&self) -> String {
        std::mem::take(&mut *self.stdout.borrow_mut())
    }

    pub fn snapshot_variables(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> =
            self.global.snapshot().into_iter().map(|(k, v)| (k, render_variable(&v))).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn run_program(&self, program: &Program) -> Result<Value, PyrlError> {
        let mut last = Value::None;
        for stmt in &program.stmts {
            match self.eval_stmt(stmt, &self.global)? {
                Flow::Normal => {}
                Flow::Return(v) => {
                    last = v;
                    break;
                }
            }
        }
        Ok(last)
    }

    pub fn run_tests(&self) -> TestSummary {
        let tests = self.tests.borrow().clone();
        let mut passed = 0;
        let mut failed = 0;
        let mut failures = Vec::new();
        for test in &tests {
            let frame = Environment::with_parent(self.global.clone());
            match self.eval_block(&test.body, &frame) {
                Ok(_) => passed += 1,
                Err(e) => {
                    failed += 1;
                    let info = e.to_info();
                    failures.push(TestFailure { label: test.label.clone(), message: info.message, line: info.line });
                }
            }
        }
        TestSummary { passed, failed, total: tests.len(), failures }
    }

    // ---- statements ----------------------------------------------------

    fn eval_block(&self, stmts: &[Stmt], env: &Rc<Environment>) -> Result<Flow, PyrlError> {
        for stmt in stmts {
            match self.eval_stmt(stmt, env)? {
                Flow::Normal => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&self, stmt: &Stmt, env: &Rc<Environment>) -> Result<Flow, PyrlError> {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                let v = self.eval_expr(value, env)?;
                self.assign_target(target, v, env)?;
                Ok(Flow::Normal)
            }
            Stmt::ExprStmt { expr, .. } => {
                self.eval_expr(expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::None,
                };
                Ok(Flow::Return(v))
            }
            Stmt::Print { args, .. } => {
                let mut rendered = Vec::with_capacity(args.len());
                for a in args {
                    rendered.push(self.eval_expr(a, env)?.to_string());
                }
                self.write_stdout(&rendered.join(" "));
                self.write_stdout("\n");
                Ok(Flow::Normal)
            }
            Stmt::Assert { cond, span } => {
                let v = self.eval_expr(cond, env)?;
                if v.is_truthy() {
                    Ok(Flow::Normal)
                } else {
                    Err(PyrlError::assertion("assertion failed".to_string(), *span))
                }
            }
            Stmt::If { cond, then_body, elifs, else_body, .. } => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    return self.eval_block(then_body, env);
                }
                for (elif_cond, elif_body) in elifs {
                    if self.eval_expr(elif_cond, env)?.is_truthy() {
                        return self.eval_block(elif_body, env);
                    }
                }
                if let Some(body) = else_body {
                    return self.eval_block(body, env);
                }
                Ok(Flow::Normal)
            }
            Stmt::While { cond, body, .. } => {
                while self.eval_expr(cond, env)?.is_truthy() {
                    match self.eval_block(body, env)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { var, iter, body, span } => self.eval_for(var, iter, body, env, *span),
            Stmt::FuncDef { name, params, body, kind, .. } => {
                let func = Rc::new(FunctionValue { name: name.clone(), params: params.clone(), body: body.clone(), closure: env.clone() });
                env.define(Sigil::Func.key(name), Value::Function(func.clone()));
                if *kind == FuncKind::Indented {
                    env.define(name.clone(), Value::Function(func));
                }
                Ok(Flow::Normal)
            }
            Stmt::ClassDef { name, parent, members, span } => {
                let parent_class = match parent {
                    Some(parent_name) => match env.get(parent_name) {
                        Some(Value::Class(c)) => Some(c),
                        Some(_) => return Err(PyrlError::type_error(format!("{} is not a class", parent_name), *span)),
                        None => return Err(PyrlError::undefined_variable(parent_name.clone(), *span)),
                    },
                    None => None,
                };
                let mut props = Vec::new();
                let mut methods = IndexMap::new();
                for member in members {
                    match member {
                        ClassMember::Prop { name: pname, default, .. } => {
                            props.push((pname.clone(), default.clone()));
                        }
                        ClassMember::Method { name: mname, params, body, is_init, .. } => {
                            let key = if *is_init { "init".to_string() } else { mname.clone() };
                            let method = Rc::new(FunctionValue {
                                name: key.clone(),
                                params: params.clone(),
                                body: body.clone(),
                                closure: env.clone(),
                            });
                            methods.insert(key, method);
                        }
                    }
                }
                let class = Rc::new(ClassValue { name: name.clone(), parent: parent_class, props, methods });
                env.define(name.clone(), Value::Class(class));
                Ok(Flow::Normal)
            }
            Stmt::TestBlock { label, body, .. } => {
                self.tests.borrow_mut().push(TestCase { label: label.clone(), body: body.clone() });
                Ok(Flow::Normal)
            }
        }
    }

    fn eval_for(&self, var: &str, iter: &Expr, body: &[Stmt], env: &Rc<Environment>, span: Span) -> Result<Flow, PyrlError> {
        let iter_val = self.eval_expr(iter, env)?;
        let key = Sigil::Scalar.key(var);
        match iter_val {
            Value::List(items) => {
                let snapshot = items.borrow().clone();
                for item in snapshot {
                    env.define(key.clone(), item);
                    match self.eval_block(body, env)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            Value::Hash(h) => {
                let keys: Vec<String> = h.borrow().keys().cloned().collect();
                for k in keys {
                    env.define(key.clone(), Value::Str(k));
                    match self.eval_block(body, env)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            Value::Str(s) => {
                for ch in s.chars() {
                    env.define(key.clone(), Value::Str(ch.to_string()));
                    match self.eval_block(body, env)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            other => return Err(PyrlError::type_error(format!("for: cannot iterate over {}", other.type_name()), span)),
        }
        Ok(Flow::Normal)
    }

    fn assign_target(&self, target: &AssignTarget, value: Value, env: &Rc<Environment>) -> Result<(), PyrlError> {
        match target {
            AssignTarget::Var { sigil, name, .. } => {
                env.assign(&sigil.key(name), value);
                Ok(())
            }
            AssignTarget::Index { collection, key, span } => {
                let coll = self.eval_expr(collection, env)?;
                let key_val = self.eval_expr(key, env)?;
                match &coll {
                    Value::List(items) => {
                        let idx = expect_int_index(&key_val, "List", *span)?;
                        let mut items = items.borrow_mut();
                        let len = items.len() as i64;
                        let real = if idx < 0 { idx + len } else { idx };
                        if real < 0 || real >= len {
                            return Err(PyrlError::index_error(format!("list index {} out of range", idx), *span));
                        }
                        items[real as usize] = value;
                        Ok(())
                    }
                    Value::Hash(h) => {
                        h.borrow_mut().insert(crate::builtins::util::hash_key(&key_val), value);
                        Ok(())
                    }
                    other => Err(PyrlError::bad_index(crate::builtins::util::hash_key(&key_val), other.type_name(), *span)),
                }
            }
            AssignTarget::Attr { obj, name, span } => {
                let obj_val = self.eval_expr(obj, env)?;
                match obj_val {
                    Value::Instance(i) => {
                        i.fields.borrow_mut().insert(name.clone(), value);
                        Ok(())
                    }
                    other => Err(PyrlError::type_error(format!("cannot assign attribute '{}' on {}", name, other.type_name()), *span)),
                }
            }
        }
    }

    // ---- expressions -----------------------------------------------------

    fn eval_expr(&self, expr: &Expr, env: &Rc<Environment>) -> Result<Value, PyrlError> {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),
            Expr::VarRef { sigil, name, span } => env
                .get(&sigil.key(name))
                .ok_or_else(|| PyrlError::undefined_variable(format!("{}{}", sigil.ch(), name), *span)),
            Expr::IdentRef { name, span } => self.resolve_ident(env, name, *span, false),
            Expr::Index { collection, key, span } => {
                let coll = self.eval_expr(collection, env)?;
                let key_val = self.eval_expr(key, env)?;
                self.index_value(&coll, &key_val, *span)
            }
            Expr::Attr { obj, name, span } => {
                let obj_val = self.eval_expr(obj, env)?;
                match obj_val {
                    Value::Instance(i) => i
                        .fields
                        .borrow()
                        .get(name)
                        .cloned()
                        .ok_or_else(|| PyrlError::name_error(format!("no such attribute: {}", name), *span)),
                    other => Err(PyrlError::type_error(format!("cannot access attribute '{}' on {}", name, other.type_name()), *span)),
                }
            }
            Expr::MethodCall { obj, name, args, span } => {
                let obj_val = self.eval_expr(obj, env)?;
                let instance = match obj_val {
                    Value::Instance(i) => i,
                    other => return Err(PyrlError::type_error(format!("cannot call method '{}' on {}", name, other.type_name()), *span)),
                };
                let method = instance
                    .class
                    .find_method(name)
                    .ok_or_else(|| PyrlError::name_error(format!("no such method: {}", name), *span))?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for a in args {
                    arg_vals.push(self.eval_expr(a, env)?);
                }
                self.call_method(instance, method, arg_vals, *span)
            }
            Expr::Call { callee, args, span } => {
                let mut arg_vals = Vec::with_capacity(args.len());
                for a in args {
                    arg_vals.push(self.eval_expr(a, env)?);
                }
                let callee_val = match callee.as_ref() {
                    Expr::IdentRef { name, span: ispan } => self.resolve_ident(env, name, *ispan, true)?,
                    other => self.eval_expr(other, env)?,
                };
                self.call_value(&callee_val, arg_vals, *span)
            }
            Expr::Unary { op, expr, span } => {
                let v = self.eval_expr(expr, env)?;
                match (op, &v) {
                    (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
                    (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
                    (UnaryOp::Pos, Value::Int(n)) => Ok(Value::Int(*n)),
                    (UnaryOp::Pos, Value::Float(n)) => Ok(Value::Float(*n)),
                    _ => Err(PyrlError::type_error(format!("unary operator on {}", v.type_name()), *span)),
                }
            }
            Expr::Binary { op, left, right, span } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                eval_binary(*op, l, r, *span)
            }
            Expr::And { left, right, .. } => {
                let l = self.eval_expr(left, env)?;
                if l.is_truthy() {
                    self.eval_expr(right, env)
                } else {
                    Ok(l)
                }
            }
            Expr::Or { left, right, .. } => {
                let l = self.eval_expr(left, env)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(right, env)
                }
            }
            Expr::Not { expr, .. } => Ok(Value::Bool(!self.eval_expr(expr, env)?.is_truthy())),
            Expr::Compare { left, op, right, span } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                eval_compare(*op, &l, &r, *span)
            }
            Expr::RegexMatch { target, pattern, negated, span } => {
                let target_val = self.eval_expr(target, env)?;
                let text = match &target_val {
                    Value::Str(s) => s.clone(),
                    other => other.to_string(),
                };
                let pattern_val = self.eval_expr(pattern, env)?;
                let re = regex_from_value(&pattern_val, *span)?;
                let matched = re.is_match(&text);
                Ok(Value::Bool(if *negated { !matched } else { matched }))
            }
            Expr::RegexSubst { target, pattern, replacement, flags, span } => {
                let target_val = self.eval_expr(target, env)?;
                let text = match &target_val {
                    Value::Str(s) => s.clone(),
                    other => other.to_string(),
                };
                let re = compile_pattern(pattern, flags, *span)?;
                let replaced = if flags.contains('g') {
                    re.replace_all(&text, replacement.as_str()).into_owned()
                } else {
                    re.replacen(&text, 1, replacement.as_str())
                };
                if let Expr::VarRef { sigil, name, .. } = target.as_ref() {
                    env.assign(&sigil.key(name), Value::Str(replaced.clone()));
                }
                Ok(Value::Str(replaced))
            }
            Expr::ListLit { elems, .. } => {
                let mut items = Vec::with_capacity(elems.len());
                for e in elems {
                    items.push(self.eval_expr(e, env)?);
                }
                Ok(Value::list(items))
            }
            Expr::HashLit { pairs, .. } => {
                let mut map = IndexMap::new();
                for (k, v) in pairs {
                    let key_val = self.eval_expr(k, env)?;
                    let value_val = self.eval_expr(v, env)?;
                    map.insert(crate::builtins::util::hash_key(&key_val), value_val);
                }
                Ok(Value::hash(map))
            }
            Expr::RegexLit { pattern, flags, span } => {
                let compiled = Rc::new(compile_pattern(pattern, flags, *span)?);
                Ok(Value::Regex(crate::value::RegexValue { pattern: pattern.clone(), flags: flags.clone(), compiled }))
            }
            Expr::Lambda { params, body, span } => {
                let wrapped = vec![Stmt::Return { value: Some((**body).clone()), span: *span }];
                let func = Rc::new(FunctionValue {
                    name: "<lambda>".to_string(),
                    params: params.clone(),
                    body: wrapped,
                    closure: env.clone(),
                });
                Ok(Value::Function(func))
            }
        }
    }

    fn index_value(&self, coll: &Value, key_val: &Value, span: Span) -> Result<Value, PyrlError> {
        match coll {
            Value::List(items) => {
                let idx = expect_int_index(key_val, "List", span)?;
                let items = items.borrow();
                let len = items.len() as i64;
                let real = if idx < 0 { idx + len } else { idx };
                if real < 0 || real >= len {
                    return Err(PyrlError::index_error(format!("list index {} out of range", idx), span));
                }
                Ok(items[real as usize].clone())
            }
            Value::Hash(h) => {
                let key_str = crate::builtins::util::hash_key(key_val);
                h.borrow().get(&key_str).cloned().ok_or_else(|| PyrlError::key_error(key_str, span))
            }
            Value::Str(s) => {
                let idx = expect_int_index(key_val, "Str", span)?;
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let real = if idx < 0 { idx + len } else { idx };
                if real < 0 || real >= len {
                    return Err(PyrlError::index_error(format!("string index {} out of range", idx), span));
                }
                Ok(Value::Str(chars[real as usize].to_string()))
            }
            other => Err(PyrlError::bad_index(crate::builtins::util::hash_key(key_val), other.type_name(), span)),
        }
    }

    /// Resolution order for a bare identifier, per §4.3.1: `&name` in the
    /// chain, then the built-in table, then `name` as a class. The two
    /// failure messages differ by position: call position raises a
    /// `NameError` naming the missing function; expression position raises
    /// the normative `Undefined variable` message.
    fn resolve_ident(&self, env: &Rc<Environment>, name: &str, span: Span, call_position: bool) -> Result<Value, PyrlError> {
        if let Some(v) = env.get(&Sigil::Func.key(name)) {
            return Ok(v);
        }
        if self.builtins.contains(name) {
            return Ok(Value::BuiltIn(name.to_string()));
        }
        if let Some(v @ Value::Class(_)) = env.get(name) {
            return Ok(v);
        }
        if call_position {
            Err(PyrlError::name_error(format!("Undefined function: {}", name), span))
        } else {
            Err(PyrlError::undefined_variable(name, span))
        }
    }

    pub fn call_value(&self, callee: &Value, args: Vec<Value>, span: Span) -> Result<Value, PyrlError> {
        match callee {
            Value::Function(f) => self.call_function(f.clone(), args, span),
            Value::BuiltIn(name) => {
                let builtins = self.builtins.clone();
                builtins.call(self, name, &args, span)
            }
            Value::Class(c) => self.instantiate(c.clone(), args, span),
            other => Err(PyrlError::type_error(format!("{} is not callable", other.type_name()), span)),
        }
    }

    fn enter_call(&self, span: Span) -> Result<(), PyrlError> {
        let depth = self.depth.get() + 1;
        if depth > self.config.max_recursion_depth {
            return Err(PyrlError::type_error("maximum recursion depth exceeded", span));
        }
        self.depth.set(depth);
        Ok(())
    }

    fn exit_call(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    fn call_function(&self, f: Rc<FunctionValue>, args: Vec<Value>, span: Span) -> Result<Value, PyrlError> {
        self.enter_call(span)?;
        let result = (|| {
            let call_env = Environment::with_parent(f.closure.clone());
            self.bind_params(&call_env, &f.name, &f.params, &args, span)?;
            match self.eval_block(&f.body, &call_env)? {
                Flow::Return(v) => Ok(v),
                Flow::Normal => Ok(Value::None),
            }
        })();
        self.exit_call();
        result
    }

    /// Invokes a method with instance-field binding: every field not
    /// shadowed by a parameter name is pre-seeded into the call frame under
    /// its `$name` key, so ordinary reads and `assign`-based writes inside
    /// the method body observe and mutate the instance field directly; a
    /// same-named parameter shadows the field for the call's duration.
    fn call_method(&self, instance: Rc<InstanceValue>, method: Rc<FunctionValue>, args: Vec<Value>, span: Span) -> Result<Value, PyrlError> {
        self.enter_call(span)?;
        let result = (|| {
            let call_env = Environment::with_parent(method.closure.clone());
            let param_names: HashSet<&str> = method.params.iter().map(|p| p.name.as_str()).collect();
            let field_names: Vec<String> = {
                let fields = instance.fields.borrow();
                fields
                    .iter()
                    .filter(|(name, _)| !param_names.contains(name.as_str()))
                    .map(|(name, value)| {
                        call_env.define(Sigil::Scalar.key(name), value.clone());
                        name.clone()
                    })
                    .collect()
            };
            self.bind_params(&call_env, &method.name, &method.params, &args, span)?;
            let flow = self.eval_block(&method.body, &call_env)?;
            {
                let mut fields = instance.fields.borrow_mut();
                for name in &field_names {
                    if let Some(v) = call_env.get(&Sigil::Scalar.key(name)) {
                        fields.insert(name.clone(), v);
                    }
                }
            }
            match flow {
                Flow::Return(v) => Ok(v),
                Flow::Normal => Ok(Value::None),
            }
        })();
        self.exit_call();
        result
    }

    fn bind_params(&self, call_env: &Rc<Environment>, func_name: &str, params: &[Param], args: &[Value], span: Span) -> Result<(), PyrlError> {
        let mut ai = 0usize;
        for (pi, p) in params.iter().enumerate() {
            if p.is_vararg {
                let rest: Vec<Value> = args.get(ai..).unwrap_or(&[]).to_vec();
                ai = args.len();
                call_env.define(Sigil::Array.key(&p.name), Value::list(rest));
                continue;
            }
            if ai < args.len() {
                call_env.define(Sigil::Scalar.key(&p.name), args[ai].clone());
                ai += 1;
            } else if let Some(default) = &p.default {
                let v = self.eval_expr(default, call_env)?;
                call_env.define(Sigil::Scalar.key(&p.name), v);
            } else {
                return Err(PyrlError::arity_error(func_name, format!("at least {}", pi + 1), args.len(), span));
            }
        }
        if ai < args.len() && !params.iter().any(|p| p.is_vararg) {
            return Err(PyrlError::arity_error(func_name, params.len().to_string(), args.len(), span));
        }
        Ok(())
    }

    fn instantiate(&self, class: Rc<ClassValue>, args: Vec<Value>, span: Span) -> Result<Value, PyrlError> {
        let mut fields = IndexMap::new();
        for (name, default) in class.all_props() {
            let v = match &default {
                Some(expr) => self.eval_expr(expr, &self.global)?,
                None => Value::None,
            };
            fields.insert(name, v);
        }
        let instance = Rc::new(InstanceValue { class: class.clone(), fields: Rc::new(RefCell::new(fields)) });
        if let Some(init) = class.find_method("init") {
            self.call_method(instance.clone(), init, args, span)?;
        }
        Ok(Value::Instance(instance))
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::None => Value::None,
    }
}

fn expect_int_index(v: &Value, container: &str, span: Span) -> Result<i64, PyrlError> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(PyrlError::bad_index(crate::builtins::util::hash_key(other), container, span)),
    }
}

/// Renders a value the way `get_variables()` reports bindings: scalars and
/// containers use their `Display` form; closures/instances/classes get a
/// stable placeholder since they have no meaningful textual value.
fn render_variable(v: &Value) -> String {
    match v {
        Value::Function(_) | Value::BuiltIn(_) => "<function>".to_string(),
        Value::Instance(i) => format!("<instance of {}>", i.class.name),
        Value::Class(c) => format!("<class {}>", c.name),
        other => other.to_string(),
    }
}

fn compile_pattern(pattern: &str, flags: &str, span: Span) -> Result<regex::Regex, PyrlError> {
    let mut prefix = String::new();
    for f in flags.chars() {
        if matches!(f, 'i' | 'm' | 's') {
            prefix.push(f);
        }
    }
    let full = if prefix.is_empty() { pattern.to_string() } else { format!("(?{}){}", prefix, pattern) };
    regex::Regex::new(&full).map_err(|e| PyrlError::regex_error(e.to_string(), span))
}

fn regex_from_value(v: &Value, span: Span) -> Result<Rc<regex::Regex>, PyrlError> {
    match v {
        Value::Regex(r) => Ok(r.compiled.clone()),
        Value::Str(s) => Ok(Rc::new(compile_pattern(s, "", span)?)),
        other => Err(PyrlError::type_error(format!("cannot use {} as a regex pattern", other.type_name()), span)),
    }
}

fn eval_binary(op: BinaryOp, l: Value, r: Value, span: Span) -> Result<Value, PyrlError> {
    use BinaryOp::*;
    match op {
        Add => match (&l, &r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => Ok(Value::Float(as_f64(&l) + as_f64(&r))),
            _ => Err(type_mismatch("+", &l, &r, span)),
        },
        Sub => numeric_op(l, r, span, "-", |a, b| a - b, |a, b| a - b),
        Mul => match (&l, &r) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                if *n < 0 {
                    return Err(PyrlError::type_error("cannot repeat a string a negative number of times", span));
                }
                Ok(Value::Str(s.repeat(*n as usize)))
            }
            _ => numeric_op(l, r, span, "*", |a, b| a * b, |a, b| a * b),
        },
        Div => {
            let b = as_f64(&r);
            if b == 0.0 {
                return Err(PyrlError::zero_division("division by zero".to_string(), span));
            }
            match (&l, &r) {
                (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => Ok(Value::Float(as_f64(&l) / b)),
                _ => Err(type_mismatch("/", &l, &r, span)),
            }
        }
        FloorDiv => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(PyrlError::zero_division("division by zero".to_string(), span));
                }
                Ok(Value::Int(a.div_euclid(*b)))
            }
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let b = as_f64(&r);
                if b == 0.0 {
                    return Err(PyrlError::zero_division("division by zero".to_string(), span));
                }
                Ok(Value::Float((as_f64(&l) / b).floor()))
            }
            _ => Err(type_mismatch("//", &l, &r, span)),
        },
        Mod => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(PyrlError::zero_division("modulo by zero".to_string(), span));
                }
                Ok(Value::Int(a.rem_euclid(*b)))
            }
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let b = as_f64(&r);
                if b == 0.0 {
                    return Err(PyrlError::zero_division("modulo by zero".to_string(), span));
                }
                let a = as_f64(&l);
                Ok(Value::Float(a - b * (a / b).floor()))
            }
            _ => Err(type_mismatch("%", &l, &r, span)),
        },
        Pow => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) if *b >= 0 => Ok(Value::Int(a.pow(*b as u32))),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => Ok(Value::Float(as_f64(&l).powf(as_f64(&r)))),
            _ => Err(type_mismatch("**", &l, &r, span)),
        },
    }
}

fn numeric_op(l: Value, r: Value, span: Span, name: &str, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Result<Value, PyrlError> {
    match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => Ok(Value::Float(float_op(as_f64(&l), as_f64(&r)))),
        _ => Err(type_mismatch(name, &l, &r, span)),
    }
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int(n) => *n as f64,
        Value::Float(n) => *n,
        _ => 0.0,
    }
}

fn type_mismatch(op: &str, l: &Value, r: &Value, span: Span) -> PyrlError {
    PyrlError::type_error(format!("unsupported operand types for {}: {} and {}", op, l.type_name(), r.type_name()), span)
}

fn eval_compare(op: CompareOp, l: &Value, r: &Value, span: Span) -> Result<Value, PyrlError> {
    match op {
        CompareOp::Eq => Ok(Value::Bool(l == r)),
        CompareOp::Ne => Ok(Value::Bool(l != r)),
        CompareOp::In => match r {
            Value::List(items) => Ok(Value::Bool(items.borrow().iter().any(|item| item == l))),
            Value::Hash(h) => {
                let key = crate::builtins::util::hash_key(l);
                Ok(Value::Bool(h.borrow().contains_key(&key)))
            }
            other => Err(PyrlError::type_error(format!("'in' requires a List or Hash, got {}", other.type_name()), span)),
        },
        CompareOp::Lt | CompareOp::Gt | CompareOp::Le | CompareOp::Ge => {
            let ordering = match (l, r) {
                (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => as_f64(l).partial_cmp(&as_f64(r)),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let ordering = ordering.ok_or_else(|| {
                PyrlError::type_error(format!("cannot compare {} and {}", l.type_name(), r.type_name()), span)
            })?;
            let result = match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Gt => ordering.is_gt(),
                CompareOp::Le => ordering.is_le(),
                CompareOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str) -> (Evaluator, Result<Value, PyrlError>) {
        let program = parse(source).expect("parse failed");
        let ev = Evaluator::new(Rc::new(BuiltinTable::new()), Config::default());
        let result = ev.run_program(&program);
        (ev, result)
    }

    #[test]
    fn test_arithmetic_and_print() {
        let (ev, result) = run("print(2 + 3 * 4)\n");
        result.unwrap();
        assert_eq!(ev.take_stdout(), "14\n");
    }

    #[test]
    fn test_string_concat_and_repeat() {
        let (ev, result) = run("print(\"ab\" + \"cd\")\nprint(\"x\" * 3)\n");
        result.unwrap();
        assert_eq!(ev.take_stdout(), "abcd\nxxx\n");
    }

    #[test]
    fn test_recursive_factorial() {
        let source = "def factorial($n):\n    if $n <= 1:\n        return 1\n    return $n * factorial($n - 1)\nprint(factorial(5))\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "120\n");
    }

    #[test]
    fn test_hash_index_assign_and_read() {
        let source = "%u = {\"name\": \"Alice\", \"age\": 30}\n%u[\"email\"] = \"a@x\"\nprint(len(%u))\nprint(%u[\"email\"])\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "3\na@x\n");
    }

    #[test]
    fn test_sigil_isolation_from_builtins() {
        let source = "$len = 5\nprint(len(\"hi\"))\nprint($len)\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "2\n5\n");
    }

    #[test]
    fn test_class_init_and_method_mutation() {
        let source = "class Counter { prop count = 0 ;\n  init() = { $count = 0 } ;\n  method inc() = { $count = $count + 1 } ;\n  method get() = { return $count } }\n$c = Counter()\n$c.inc(); $c.inc(); $c.inc()\nprint($c.get())\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "3\n");
    }

    #[test]
    fn test_regex_match_in_condition() {
        let source = "$t = \"hello world\"\nif $t =~ m/world/ :\n    print(\"yes\")\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "yes\n");
    }

    #[test]
    fn test_closure_captures_enclosing_binding() {
        let source = "def make_adder($n):\n    &add($x) = { return $x + $n }\n    return &add\n$adder = make_adder(10)\nprint($adder(5))\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "15\n");
    }

    #[test]
    fn test_list_reference_semantics_through_append() {
        let source = "@a = [1, 2]\n@b = @a\nappend(@a, 3)\nprint(len(@b))\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "3\n");
    }

    #[test]
    fn test_undefined_variable_error() {
        let (_ev, result) = run("print($missing)\n");
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "NameError: Undefined variable: $missing at line 1, column 7");
    }

    #[test]
    fn test_zero_division_error() {
        let (_ev, result) = run("$x = 1 // 0\n");
        assert!(matches!(result, Err(PyrlError::ZeroDivision { .. })));
    }

    #[test]
    fn test_assert_failure_propagates() {
        let (_ev, result) = run("assert 1 == 2\n");
        assert!(matches!(result, Err(PyrlError::Assertion { .. })));
    }

    #[test]
    fn test_for_over_list_and_range() {
        let source = "$total = 0\nfor $i in range(1, 4):\n    $total = $total + $i\nprint($total)\n";
        let (ev, result) = run(source);
        result.unwrap();
        assert_eq!(ev.take_stdout(), "6\n");
    }

    #[test]
    fn test_run_tests_counts_pass_and_fail() {
        let source = "test \"ok\" { assert 1 == 1 }\ntest \"bad\" { assert 1 == 2 }\n";
        let program = parse(source).unwrap();
        let ev = Evaluator::new(Rc::new(BuiltinTable::new()), Config::default());
        ev.run_program(&program).unwrap();
        let summary = ev.run_tests();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].label, "bad");
    }
}
