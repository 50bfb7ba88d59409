use std::rc::Rc;

use super::{Descriptor, DirectiveBehavior};
use crate::dom::{self, Event, EventCallback, NodeId};
use crate::error::Result;
use crate::reactive::Scope;
use crate::types::{CallArgs, Value};

/// `@name="method"`: calls a scope method when the event fires.
///
/// The method is resolved once, at init. A registered adapter for `name`
/// decides how the handler is wired; otherwise a plain listener is added.
/// Names that do not resolve to a function bind nothing.
pub struct EventDirective {
    name: String,
}

impl EventDirective {
    pub fn init(node: NodeId, scope: &Scope, descriptor: Descriptor) -> Result<Self> {
        let name = descriptor.name.unwrap_or_default();
        let method_name = descriptor.method.unwrap_or_default();
        dom::remove_attribute(node, &format!("@{name}"))?;

        let Value::Function(method) = scope.peek(&method_name) else {
            tracing::debug!(message = "directive.event.skip", event = %name, method = %method_name);
            return Ok(Self { name });
        };

        let this = scope.clone();
        let handler: EventCallback = Rc::new(move |event: &Event| {
            let mut event = event.clone();
            event.current_target = Some(node);
            method.call(&this, &CallArgs::with_event(event)).map(drop)
        });

        match dom::event_adapter(&name) {
            Some(adapter) => adapter(node, handler)?,
            None => dom::add_event_listener(node, &name, handler),
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DirectiveBehavior for EventDirective {
    fn expression(&self) -> Option<&str> {
        None
    }

    fn reactive(&self) -> bool {
        false
    }
}
