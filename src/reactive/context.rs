//! Evaluation context - the "currently evaluating" watcher.
//!
//! One slot per thread. A watcher installs itself with [`enter`] for the
//! duration of its evaluation; every reactive read made meanwhile registers
//! it. The guard restores the previous occupant when dropped, so the slot is
//! cleared again even if evaluation fails.
//!
//! Nesting is not part of the contract: a read that synchronously starts
//! another watcher's evaluation is unsupported and not checked.

use std::cell::RefCell;
use std::rc::Rc;

use super::dep::Subscriber;

thread_local! {
    static CURRENT_TARGET: RefCell<Option<Rc<dyn Subscriber>>> = const { RefCell::new(None) };
}

/// Restores the previous evaluation target on drop.
#[must_use = "the target is uninstalled as soon as the guard is dropped"]
pub struct EvaluationGuard {
    previous: Option<Rc<dyn Subscriber>>,
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_TARGET.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Install `target` as the currently evaluating subscriber.
pub fn enter(target: Rc<dyn Subscriber>) -> EvaluationGuard {
    let previous = CURRENT_TARGET.with(|slot| slot.borrow_mut().replace(target));
    EvaluationGuard { previous }
}

/// The subscriber currently evaluating, if any.
pub fn current_target() -> Option<Rc<dyn Subscriber>> {
    CURRENT_TARGET.with(|slot| slot.borrow().clone())
}

/// Run `f` with no evaluation target installed: reads inside are not tracked.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let previous = CURRENT_TARGET.with(|slot| slot.borrow_mut().take());
    let _guard = EvaluationGuard { previous };
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::types::Mutation;

    struct Noop(u64);

    impl Subscriber for Noop {
        fn id(&self) -> u64 {
            self.0
        }

        fn update(&self, _mutation: Option<&Mutation>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_guard_clears_on_drop() {
        assert!(current_target().is_none());
        {
            let _guard = enter(Rc::new(Noop(1)));
            assert_eq!(current_target().map(|t| t.id()), Some(1));
        }
        assert!(current_target().is_none());
    }

    #[test]
    fn test_untracked_hides_target() {
        let _guard = enter(Rc::new(Noop(3)));
        untracked(|| assert!(current_target().is_none()));
        assert_eq!(current_target().map(|t| t.id()), Some(3));
    }
}
