//! Watcher - a compiled expression bound to a scope and a callback.
//!
//! Evaluating installs the watcher as the current evaluation target, so every
//! reactive cell the expression reads registers it. Any later write to one of
//! those cells calls [`Subscriber::update`], which re-evaluates and hands the
//! fresh value to the callback.
//!
//! The first evaluation happens inside [`Watcher::new`], so the callback has
//! fired with the initial value and all dependencies are registered before the
//! constructor returns.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::context;
use super::dep::Subscriber;
use super::Scope;
use crate::error::Result;
use crate::expression::{build_function, Program};
use crate::types::{Mutation, Value};

/// Receives `(value, mutation)` after every evaluation.
pub type WatchCallback = Box<dyn Fn(Value, Option<&Mutation>) -> Result<()>>;

thread_local! {
    static NEXT_WATCHER_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_id() -> u64 {
    NEXT_WATCHER_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

pub struct Watcher {
    id: u64,
    scope: Scope,
    program: Rc<Program>,
    callback: WatchCallback,
    value: RefCell<Value>,
    this: Weak<Watcher>,
}

impl Watcher {
    /// Compile `expr`, evaluate it once against `scope`, and call `callback`
    /// with the result.
    pub fn new(
        scope: Scope,
        expr: &str,
        callback: impl Fn(Value, Option<&Mutation>) -> Result<()> + 'static,
    ) -> Result<Rc<Self>> {
        let watcher = Rc::new_cyclic(|this| Watcher {
            id: next_id(),
            scope,
            program: build_function(expr),
            callback: Box::new(callback),
            value: RefCell::new(Value::Undefined),
            this: this.clone(),
        });
        watcher.update(None)?;
        Ok(watcher)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn expression(&self) -> &str {
        self.program.source()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Value handed to the callback by the last evaluation.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Evaluate with this watcher installed as the evaluation target.
    pub fn get(&self) -> Result<Value> {
        let _guard = self
            .this
            .upgrade()
            .map(|me| context::enter(me as Rc<dyn Subscriber>));
        self.program.evaluate(&self.scope)
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> u64 {
        self.id
    }

    fn update(&self, mutation: Option<&Mutation>) -> Result<()> {
        let value = match self.get()? {
            // Never render a literal "undefined" / "null".
            Value::Undefined | Value::Null => Value::String(String::new()),
            value => value,
        };
        *self.value.borrow_mut() = value.clone();
        (self.callback)(value, mutation)
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("expr", &self.program.source())
            .finish()
    }
}
