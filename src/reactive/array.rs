//! Observable arrays.
//!
//! An [`ArrayRef`] reads like a plain ordered sequence and routes the seven
//! structural operations (`push`, `pop`, `shift`, `unshift`, `splice`, `sort`,
//! `reverse`) through its own [`Dep`]. Each operation performs the mutation,
//! then notifies with a [`Mutation`] describing what ran, so list directives
//! can tell a structural change from a plain replacement.
//!
//! Elements enter the array already observed: anything converted into a
//! [`Value`] (including JSON, see [`observe`](super::observe)) is reactive.
//!
//! Index assignment ([`ArrayRef::set_index`]) does not notify, matching the
//! template language's semantics for `list[i] = x`. It may replace an element
//! or append one, never leave holes.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::dep::Dep;
use crate::error::{Error, Result};
use crate::types::{ArrayOp, Mutation, Value};

#[derive(Default)]
struct ArrayInner {
    items: RefCell<Vec<Value>>,
    dep: Dep,
}

/// Shared handle to an observable array. Cloning shares the array.
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<ArrayInner>);

impl ArrayRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self(Rc::new(ArrayInner {
            items: RefCell::new(values.into_iter().map(Into::into).collect()),
            dep: Dep::new(),
        }))
    }

    /// The array's own dependency (structural mutations).
    pub fn dep(&self) -> &Dep {
        &self.0.dep
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    /// Element at `index`, or `undefined`.
    pub fn get(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Iterate over a snapshot; mutation during iteration is not observed.
    pub fn iter(&self) -> std::vec::IntoIter<Value> {
        self.to_vec().into_iter()
    }

    /// `Array.prototype.join`: `null`/`undefined` elements become empty strings.
    pub fn join(&self, separator: &str) -> String {
        self.0
            .items
            .borrow()
            .iter()
            .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Position of the first `===` element.
    pub fn index_of(&self, needle: &Value) -> Option<usize> {
        self.0.items.borrow().iter().position(|v| v.strict_equals(needle))
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // -------------------------------------------------------------------------
    // Non-structural write
    // -------------------------------------------------------------------------

    /// Replace the element at `index`, or append when `index == len`, without
    /// notifying. Indices past the end are a type error.
    pub fn set_index(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let mut items = self.0.items.borrow_mut();
        match index.cmp(&items.len()) {
            Ordering::Less => items[index] = value.into(),
            Ordering::Equal => items.push(value.into()),
            Ordering::Greater => {
                return Err(Error::type_error(format!(
                    "index {index} is past the end of an array of length {}",
                    items.len()
                )));
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Structural operations
    // -------------------------------------------------------------------------

    /// Append one element. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        self.push_many([value])
    }

    /// Append several elements. Returns the new length.
    pub fn push_many(&self, values: impl IntoIterator<Item = impl Into<Value>>) -> Result<usize> {
        let inserted: Vec<Value> = values.into_iter().map(Into::into).collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.extend(inserted.iter().cloned());
            items.len()
        };
        self.notify(ArrayOp::Push, inserted)?;
        Ok(len)
    }

    /// Prepend one element. Returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<usize> {
        self.unshift_many([value])
    }

    /// Prepend several elements, keeping their order. Returns the new length.
    pub fn unshift_many(
        &self,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Result<usize> {
        let inserted: Vec<Value> = values.into_iter().map(Into::into).collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.splice(0..0, inserted.iter().cloned());
            items.len()
        };
        self.notify(ArrayOp::Unshift, inserted)?;
        Ok(len)
    }

    /// Remove and return the last element (`undefined` when empty).
    pub fn pop(&self) -> Result<Value> {
        let removed = self.0.items.borrow_mut().pop().unwrap_or_default();
        self.notify(ArrayOp::Pop, Vec::new())?;
        Ok(removed)
    }

    /// Remove and return the first element (`undefined` when empty).
    pub fn shift(&self) -> Result<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        };
        self.notify(ArrayOp::Shift, Vec::new())?;
        Ok(removed)
    }

    /// `Array.prototype.splice`: remove `delete_count` elements at `start`
    /// (negative counts from the end) and insert `items` there. Returns the
    /// removed elements.
    pub fn splice(
        &self,
        start: isize,
        delete_count: usize,
        items: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Result<Vec<Value>> {
        let inserted: Vec<Value> = items.into_iter().map(Into::into).collect();
        let removed = {
            let mut current = self.0.items.borrow_mut();
            let len = current.len() as isize;
            let at = (if start < 0 { (len + start).max(0) } else { start.min(len) }) as usize;
            let end = at + delete_count.min(current.len() - at);
            current.splice(at..end, inserted.iter().cloned()).collect::<Vec<Value>>()
        };

        let mut args = Vec::with_capacity(inserted.len() + 2);
        args.push(Value::from(start as i64));
        args.push(Value::from(delete_count));
        args.extend(inserted);
        self.notify(ArrayOp::Splice, args)?;
        Ok(removed)
    }

    /// Sort with the default ordering (`undefined` last, others by string form).
    pub fn sort(&self) -> Result<()> {
        self.sort_by(Value::default_sort_order)
    }

    /// Stable sort with a custom comparator.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) -> Result<()> {
        self.0.items.borrow_mut().sort_by(compare);
        self.notify(ArrayOp::Sort, Vec::new())
    }

    pub fn reverse(&self) -> Result<()> {
        self.0.items.borrow_mut().reverse();
        self.notify(ArrayOp::Reverse, Vec::new())
    }

    fn notify(&self, op: ArrayOp, args: Vec<Value>) -> Result<()> {
        tracing::trace!(message = "array.mutate", op = op.as_str(), len = self.len());
        self.0.dep.notify(Some(&Mutation { op, args }))
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Scope, Watcher};
    use crate::reactive::ObjectRef;

    fn numbers(array: &ArrayRef) -> Vec<f64> {
        array.to_vec().iter().map(Value::to_number).collect()
    }

    #[test]
    fn test_push_and_unshift_return_length() {
        let a = ArrayRef::from_values([2]);
        assert_eq!(a.push(3).unwrap(), 2);
        assert_eq!(a.unshift_many([0, 1]).unwrap(), 4);
        assert_eq!(numbers(&a), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_pop_and_shift_on_empty() {
        let a = ArrayRef::new();
        assert!(matches!(a.pop().unwrap(), Value::Undefined));
        assert!(matches!(a.shift().unwrap(), Value::Undefined));
    }

    #[test]
    fn test_splice_insert_remove_negative_start() {
        let a = ArrayRef::from_values([1, 2, 3, 4]);

        let removed = a.splice(1, 2, [9]).unwrap();
        assert_eq!(removed.iter().map(Value::to_number).collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert_eq!(numbers(&a), vec![1.0, 9.0, 4.0]);

        let removed = a.splice(-1, 5, Vec::<Value>::new()).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(numbers(&a), vec![1.0, 9.0]);

        a.splice(99, 0, [7]).unwrap();
        assert_eq!(numbers(&a), vec![1.0, 9.0, 7.0]);
    }

    #[test]
    fn test_set_index_replaces_or_appends() {
        let a = ArrayRef::from_values([1, 2]);
        a.set_index(0, 5).unwrap();
        a.set_index(2, 6).unwrap();
        assert_eq!(numbers(&a), vec![5.0, 2.0, 6.0]);

        assert!(matches!(a.set_index(4, 0), Err(Error::Type(_))));
        assert!(matches!(a.set_index(1_000_000_000_000_000_000, 0), Err(Error::Type(_))));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_splice_descriptor_keeps_caller_start() {
        let list = ArrayRef::from_values([1, 2, 3]);
        let root = ObjectRef::from_pairs([("list", Value::Array(list.clone()))]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let _w = Watcher::new(Scope::new(root), "list", move |_, m| {
            if let Some(m) = m {
                log.borrow_mut().extend(m.args.iter().map(Value::to_number));
            }
            Ok(())
        })
        .unwrap();

        list.splice(-1, 1, [9]).unwrap();
        assert_eq!(*seen.borrow(), vec![-1.0, 1.0, 9.0]);
    }

    #[test]
    fn test_default_sort_is_string_order() {
        let a = ArrayRef::from_values([10, 9, 1]);
        a.sort().unwrap();
        assert_eq!(numbers(&a), vec![1.0, 10.0, 9.0]);

        a.sort_by(|x, y| x.to_number().total_cmp(&y.to_number())).unwrap();
        assert_eq!(numbers(&a), vec![1.0, 9.0, 10.0]);

        a.reverse().unwrap();
        assert_eq!(numbers(&a), vec![10.0, 9.0, 1.0]);
    }

    #[test]
    fn test_mutation_reaches_watcher_with_descriptor() {
        let list = ArrayRef::from_values([1, 2]);
        let root = ObjectRef::from_pairs([("list", Value::Array(list.clone()))]);

        let seen: Rc<RefCell<Vec<Option<(ArrayOp, usize)>>>> = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let _w = Watcher::new(Scope::new(root), "list", move |_, m| {
            log.borrow_mut().push(m.map(|m| (m.op, m.args.len())));
            Ok(())
        })
        .unwrap();

        list.push_many([3, 4]).unwrap();
        list.splice(0, 1, [5]).unwrap();
        list.set_index(0, 42).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![None, Some((ArrayOp::Push, 2)), Some((ArrayOp::Splice, 3))]
        );
    }

    #[test]
    fn test_join_skips_nullish() {
        let a = ArrayRef::from_values([Value::from(1), Value::Null, Value::from("x")]);
        assert_eq!(a.join(","), "1,,x");
        assert_eq!(a.index_of(&Value::from("x")), Some(2));
    }
}
