// ABOUTME: Randomness built-ins, explicitly non-deterministic unless seeded

use super::util::expect_list;
use super::{Arity, BuiltinTable};
use crate::error::PyrlError;
use crate::eval::Evaluator;
use crate::span::Span;
use crate::value::Value;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

pub fn register(table: &BuiltinTable) {
    table.register("random", Arity::Fixed(0), Rc::new(random));
    table.register("randint", Arity::Fixed(2), Rc::new(randint));
    table.register("choice", Arity::Fixed(1), Rc::new(choice));
    table.register("shuffle", Arity::Fixed(1), Rc::new(shuffle));
    table.register("seed", Arity::Fixed(1), Rc::new(seed));
}

fn random(_ev: &Evaluator, _args: &[Value], _span: Span) -> Result<Value, PyrlError> {
    Ok(Value::Float(RNG.with(|rng| rng.borrow_mut().gen::<f64>())))
}

fn randint(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let lo = super::util::expect_int(&args[0], "randint", span)?;
    let hi = super::util::expect_int(&args[1], "randint", span)?;
    if lo > hi {
        return Err(PyrlError::type_error("randint: low bound greater than high bound".to_string(), span));
    }
    Ok(Value::Int(RNG.with(|rng| rng.borrow_mut().gen_range(lo..=hi))))
}

fn choice(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let items = expect_list(&args[0], "choice", span)?;
    let items = items.borrow();
    if items.is_empty() {
        return Err(PyrlError::type_error("choice: sequence is empty".to_string(), span));
    }
    let idx = RNG.with(|rng| rng.borrow_mut().gen_range(0..items.len()));
    Ok(items[idx].clone())
}

fn shuffle(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let items = expect_list(&args[0], "shuffle", span)?;
    RNG.with(|rng| items.borrow_mut().shuffle(&mut *rng.borrow_mut()));
    Ok(Value::None)
}

fn seed(_ev: &Evaluator, args: &[Value], span: Span) -> Result<Value, PyrlError> {
    let n = super::util::expect_int(&args[0], "seed", span)?;
    RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(n as u64));
    Ok(Value::None)
}
