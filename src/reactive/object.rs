//! Reactive objects - records whose every property is a [`ReactiveCell`].
//!
//! A cell is one mutable value plus the [`Dep`] of everyone who read it while
//! evaluating. Reads register the current watcher; writes that change the
//! value (by `===`) notify.
//!
//! Assigning an object or array that is already part of the graph does not
//! re-wrap it: the destination property keeps its own cell and dependency,
//! and the assigned value is shared by reference with wherever else it lives.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::dep::Dep;
use crate::error::Result;
use crate::types::Value;

// =============================================================================
// ReactiveCell
// =============================================================================

/// One observed property: a private value slot plus its dependency.
#[derive(Debug, Default)]
pub struct ReactiveCell {
    value: RefCell<Value>,
    dep: Dep,
}

impl ReactiveCell {
    pub fn new(value: Value) -> Self {
        Self {
            value: RefCell::new(value),
            dep: Dep::new(),
        }
    }

    /// Tracked read.
    ///
    /// Registers the evaluating watcher with this cell, and with the array's
    /// own dependency when the value is an array, so both replacement and
    /// in-place mutation reach it.
    pub fn read(&self) -> Value {
        self.dep.depend();
        let value = self.value.borrow().clone();
        if let Value::Array(array) = &value {
            array.dep().depend();
        }
        value
    }

    /// Untracked read.
    pub fn peek(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Store `value` and notify, unless it is `===` to the current value.
    ///
    /// Returns whether a change happened.
    pub fn write(&self, value: Value) -> Result<bool> {
        {
            let mut slot = self.value.borrow_mut();
            if slot.strict_equals(&value) {
                return Ok(false);
            }
            *slot = value;
        }
        self.dep.notify(None)?;
        Ok(true)
    }

    pub fn dep(&self) -> &Dep {
        &self.dep
    }
}

// =============================================================================
// ObjectRef
// =============================================================================

/// Shared handle to a reactive record. Cloning shares the record.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<IndexMap<String, Rc<ReactiveCell>>>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let cells = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Rc::new(ReactiveCell::new(v.into()))))
            .collect();
        Self(Rc::new(RefCell::new(cells)))
    }

    /// The cell backing `key`, if the property exists.
    pub fn cell(&self, key: &str) -> Option<Rc<ReactiveCell>> {
        self.0.borrow().get(key).cloned()
    }

    /// Tracked read. Missing properties read as `undefined` and register nothing.
    pub fn get(&self, key: &str) -> Value {
        self.cell(key).map(|cell| cell.read()).unwrap_or_default()
    }

    /// Untracked read.
    pub fn peek(&self, key: &str) -> Value {
        self.cell(key).map(|cell| cell.peek()).unwrap_or_default()
    }

    /// Write a property.
    ///
    /// Existing properties go through their cell (no-op when unchanged). A
    /// missing property is created with a fresh cell; nothing can depend on
    /// it yet, so nothing is notified.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.cell(key) {
            Some(cell) => {
                cell.write(value)?;
            }
            None => {
                self.0
                    .borrow_mut()
                    .insert(key.to_string(), Rc::new(ReactiveCell::new(value)));
            }
        }
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef").field("keys", &self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::watcher::Watcher;
    use crate::reactive::Scope;
    use std::cell::Cell;

    #[test]
    fn test_set_unchanged_is_noop() {
        let obj = ObjectRef::from_pairs([("a", 1)]);
        let cell = obj.cell("a").unwrap();

        assert!(!cell.write(Value::from(1)).unwrap());
        assert!(cell.write(Value::from(2)).unwrap());
        assert_eq!(obj.peek("a").to_number(), 2.0);
    }

    #[test]
    fn test_nan_write_always_changes() {
        let cell = ReactiveCell::new(Value::Number(f64::NAN));
        assert!(cell.write(Value::Number(f64::NAN)).unwrap());
    }

    #[test]
    fn test_missing_key_reads_undefined_and_creates_on_write() {
        let obj = ObjectRef::new();
        assert!(matches!(obj.get("nope"), Value::Undefined));

        obj.set("nope", "now").unwrap();
        assert_eq!(obj.peek("nope").to_js_string(), "now");
        assert_eq!(obj.keys(), vec!["nope".to_string()]);
    }

    #[test]
    fn test_reassigned_object_keeps_independent_dep() {
        let inner = ObjectRef::from_pairs([("v", 1)]);
        let root = ObjectRef::from_pairs([
            ("src", Value::Object(inner.clone())),
            ("dst", Value::Object(ObjectRef::new())),
        ]);
        let scope = Scope::new(root.clone());

        let src_runs = Rc::new(Cell::new(0));
        let counter = src_runs.clone();
        let _w = Watcher::new(scope, "src", move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();
        assert_eq!(src_runs.get(), 1);

        // dst now aliases the same record but not src's property dependency.
        root.set("dst", Value::Object(inner.clone())).unwrap();
        assert_eq!(src_runs.get(), 1);

        let src_cell = root.cell("src").unwrap();
        let dst_cell = root.cell("dst").unwrap();
        assert!(!Rc::ptr_eq(&src_cell, &dst_cell));
        assert_eq!(src_cell.dep().len(), 1);
        assert_eq!(dst_cell.dep().len(), 0);
    }
}
