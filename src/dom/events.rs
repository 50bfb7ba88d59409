//! Events - listeners, dispatch with bubbling, custom event adapters.
//!
//! Listeners are stored per node in a thread-local table, separate from the
//! node arena, so cloning a node never copies them. Dispatch snapshots the
//! listener list before calling anything: a listener may add listeners,
//! mutate the document or write reactive data without tripping a borrow.
//!
//! # Custom adapters
//!
//! An adapter takes over how an `@name` binding is wired to a node. It gets
//! the node and the handler, and decides when to fire it:
//!
//! ```ignore
//! use quebind::dom::{add_event_listener, register_event_adapter};
//!
//! // "@tap" fires on click
//! register_event_adapter("tap", Rc::new(|node: NodeId, handler: EventCallback| {
//!     add_event_listener(node, "click", handler);
//!     Ok(())
//! }));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::document::{self, NodeId};
use crate::error::Result;
use crate::types::Value;

/// An event being dispatched.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event type (`"click"`, `"input"`, ...).
    pub kind: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Node whose listener is running.
    pub current_target: Option<NodeId>,
    pub bubbles: bool,
    /// Payload for synthetic events.
    pub detail: Value,
}

impl Event {
    /// A bubbling event with no payload.
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            current_target: None,
            bubbles: true,
            detail: Value::Undefined,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }
}

/// Event listener / handler.
pub type EventCallback = Rc<dyn Fn(&Event) -> Result<()>>;

/// Custom wiring for an event name: `(node, handler)`.
pub type EventAdapter = Rc<dyn Fn(NodeId, EventCallback) -> Result<()>>;

thread_local! {
    static LISTENERS: RefCell<HashMap<NodeId, Vec<(String, EventCallback)>>> =
        RefCell::new(HashMap::new());

    static ADAPTERS: RefCell<HashMap<String, EventAdapter>> = RefCell::new(HashMap::new());
}

// =============================================================================
// Listeners
// =============================================================================

pub fn add_event_listener(node: NodeId, kind: &str, listener: EventCallback) {
    LISTENERS.with(|listeners| {
        listeners
            .borrow_mut()
            .entry(node)
            .or_default()
            .push((kind.to_string(), listener));
    });
}

pub fn listener_count(node: NodeId, kind: &str) -> usize {
    LISTENERS.with(|listeners| {
        listeners
            .borrow()
            .get(&node)
            .map_or(0, |list| list.iter().filter(|(k, _)| k == kind).count())
    })
}

fn listeners_for(node: NodeId, kind: &str) -> Vec<EventCallback> {
    LISTENERS.with(|listeners| {
        listeners
            .borrow()
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|(k, _)| k == kind)
                    .map(|(_, l)| l.clone())
                    .collect()
            })
            .unwrap_or_default()
    })
}

/// Drop every listener registered on `node` and its descendants.
pub fn remove_listeners(node: NodeId) {
    let mut subtree = vec![node];
    let mut i = 0;
    while let Some(&current) = subtree.get(i) {
        subtree.extend(document::children(current));
        i += 1;
    }
    LISTENERS.with(|listeners| {
        let mut listeners = listeners.borrow_mut();
        for id in &subtree {
            listeners.remove(id);
        }
    });
}

pub(crate) fn reset_listeners() {
    LISTENERS.with(|listeners| listeners.borrow_mut().clear());
}

/// Run the listeners for `event` on its target, then on each ancestor when
/// the event bubbles. The first listener error stops dispatch.
pub fn dispatch(mut event: Event) -> Result<()> {
    let mut path = vec![event.target];
    if event.bubbles {
        let mut node = event.target;
        while let Some(parent) = document::parent(node) {
            path.push(parent);
            node = parent;
        }
    }

    tracing::trace!(message = "event.dispatch", kind = %event.kind, target = %event.target);
    for node in path {
        event.current_target = Some(node);
        for listener in listeners_for(node, &event.kind) {
            listener(&event)?;
        }
    }
    Ok(())
}

/// Dispatch a plain bubbling event of `kind` on `target`.
pub fn dispatch_event(target: NodeId, kind: &str) -> Result<()> {
    dispatch(Event::new(kind, target))
}

// =============================================================================
// Adapters
// =============================================================================

/// Register (or replace) the adapter for `@name` bindings.
pub fn register_event_adapter(name: &str, adapter: EventAdapter) {
    ADAPTERS.with(|adapters| {
        adapters.borrow_mut().insert(name.to_string(), adapter);
    });
}

pub fn event_adapter(name: &str) -> Option<EventAdapter> {
    ADAPTERS.with(|adapters| adapters.borrow().get(name).cloned())
}

/// Remove every registered adapter (for testing).
pub fn reset_event_adapters() {
    ADAPTERS.with(|adapters| adapters.borrow_mut().clear());
}
