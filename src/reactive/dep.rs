//! Dependency - per-property subscriber set.
//!
//! Every reactive cell and every observable array owns one [`Dep`]. A watcher
//! that reads the cell while it is evaluating is added; a write notifies all
//! of them in registration order.
//!
//! Subscribers are held weakly. A watcher lives as long as the directive that
//! owns it; once that directive is dropped (its subtree torn down by `if` or
//! `foreach`), the dead entry is pruned on the next notify. Nothing ever
//! unsubscribes explicitly.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::context;
use crate::error::Result;
use crate::types::Mutation;

/// Anything that can be notified by a [`Dep`].
pub trait Subscriber {
    /// Stable identity used for set semantics.
    fn id(&self) -> u64;

    /// Called on every notify of a dependency this subscriber registered with.
    fn update(&self, mutation: Option<&Mutation>) -> Result<()>;
}

/// Subscriber registry for one observed property.
#[derive(Default)]
pub struct Dep {
    subs: RefCell<IndexMap<u64, Weak<dyn Subscriber>>>,
}

impl Dep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Adding the same id twice is a no-op. Dropped
    /// subscribers are pruned whenever a new one is added.
    pub fn add_sub(&self, sub: &Rc<dyn Subscriber>) {
        let mut subs = self.subs.borrow_mut();
        if subs.contains_key(&sub.id()) {
            return;
        }
        subs.retain(|_, weak| weak.strong_count() > 0);
        subs.insert(sub.id(), Rc::downgrade(sub));
    }

    /// Remove a subscriber by id.
    pub fn remove_sub(&self, id: u64) {
        self.subs.borrow_mut().shift_remove(&id);
    }

    /// Register the currently evaluating watcher, if any.
    pub fn depend(&self) {
        if let Some(target) = context::current_target() {
            self.add_sub(&target);
        }
    }

    /// Notify every live subscriber in registration order.
    ///
    /// Subscribers added while the notification runs are not called in this
    /// round; subscribers dropped by an earlier update in the round are
    /// skipped. The first error aborts the round and is returned.
    pub fn notify(&self, mutation: Option<&Mutation>) -> Result<()> {
        let round: Vec<Weak<dyn Subscriber>> = {
            let mut subs = self.subs.borrow_mut();
            subs.retain(|_, weak| weak.strong_count() > 0);
            subs.values().cloned().collect()
        };

        for sub in round.iter().filter_map(Weak::upgrade) {
            sub.update(mutation)?;
        }
        Ok(())
    }

    /// Whether a subscriber with this id is registered (live or not yet pruned).
    pub fn contains(&self, id: u64) -> bool {
        self.subs.borrow().contains_key(&id)
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.subs
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep").field("subs", &self.len()).finish()
    }
}
