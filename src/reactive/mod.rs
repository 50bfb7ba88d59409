//! Reactive core - observed data, dependencies, watchers.
//!
//! - [`ObjectRef`] / [`ReactiveCell`] - records whose properties track readers
//! - [`ArrayRef`] - observable arrays with structural mutation notifications
//! - [`Dep`] - per-property subscriber registry
//! - [`Watcher`] - expression + scope + callback, re-run on every notify
//! - [`Scope`] - layered binding frames over the root object
//! - [`observe`] - plain JSON → reactive graph
//!
//! # Data Flow
//!
//! ```text
//! Watcher::get ── installs itself ──► context
//!      │
//!      └─ evaluates expression ─► ReactiveCell::read ─► Dep::depend (registers)
//!
//! ObjectRef::set ─► ReactiveCell::write ─► Dep::notify ─► Watcher::update ─► callback
//! ```
//!
//! Everything is synchronous: a write has re-run every dependent watcher and
//! every directive update before it returns.

mod array;
pub mod context;
mod dep;
mod object;
mod observer;
mod scope;
mod watcher;

pub use array::ArrayRef;
pub use context::{current_target, untracked, EvaluationGuard};
pub use dep::{Dep, Subscriber};
pub use object::{ObjectRef, ReactiveCell};
pub use observer::{observe, observe_object, to_json};
pub use scope::Scope;
pub use watcher::{WatchCallback, Watcher};
