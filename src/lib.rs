//! # quebind
//!
//! Reactive data-binding runtime for Rust.
//!
//! Observed data, mustache templates and live directives: a template is
//! compiled once into bindings, and every later write to the data updates
//! exactly the nodes that read it. No virtual DOM and no diff pass.
//!
//! ## Architecture
//!
//! ```text
//! Compiler ─ walks markup ─► Directive ─ owns ─► Watcher ─ evaluates ─► Expression
//!                                                   ▲                      │
//!                                                   │ notify               │ reads
//!                                                   └──────── Dep ◄── ReactiveCell
//! ```
//!
//! Everything is synchronous and single-threaded: a write has updated every
//! dependent node before it returns.
//!
//! ## Modules
//!
//! - [`types`] - `Value`, methods, array mutation descriptors
//! - [`reactive`] - reactive cells, arrays, dependencies, watchers, scopes
//! - [`expression`] - template expression parser, evaluator and cache
//! - [`dom`] - document arena, events, markup
//! - [`directives`] - `text`, `attr`, `hidden`, `model`, `event`, `if`, `foreach`
//! - [`compiler`] - template walk and mount
//! - [`pipeline`] - application bootstrap and lifecycle hooks
//!
//! ## Example
//!
//! ```ignore
//! use quebind::{load_document, App, AppOptions, Location};
//! use serde_json::json;
//!
//! let mut app = App::new(AppOptions::new(json!({ "items": ["a", "b"] })))?;
//! let body = load_document(r#"<ul><li foreach="(item, i) in items">{{i}}: {{item}}</li></ul>"#)?;
//! app.mount(body, &Location::parse("/"))?;
//!
//! app.data().peek("items").as_array().unwrap().push("c")?;
//! ```

pub mod compiler;
pub mod directives;
pub mod dom;
pub mod error;
pub mod expression;
pub mod pipeline;
pub mod reactive;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

pub use reactive::{observe, to_json, ArrayRef, Dep, ObjectRef, ReactiveCell, Scope, Subscriber, Watcher};

pub use expression::{build_function, compute, parse_mustache, Program};

pub use directives::{Descriptor, Directive, DirectiveKind};

pub use compiler::{compile, mount, View};

pub use dom::{register_event_adapter, Event, EventAdapter, EventCallback, NodeId};

pub use pipeline::{load_document, App, AppOptions, Location};
