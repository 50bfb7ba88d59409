//! Two-way binding for text inputs and textareas.
//!
//! Data flows in through `update`, typed text flows out through the `input`
//! listener. While the user is typing the node carries [`NodeFlags::TYPING`]
//! and updates leave its value alone: echoing the assignment back would reset
//! the field under the cursor. `blur` clears the flag.

use std::rc::Rc;

use super::{Descriptor, DirectiveBehavior};
use crate::dom::{self, Event, NodeFlags, NodeId};
use crate::error::Result;
use crate::expression::assign_path;
use crate::reactive::Scope;
use crate::types::{Mutation, Value};

pub struct ModelDirective {
    node: NodeId,
    path: Option<String>,
}

impl ModelDirective {
    pub fn init(node: NodeId, scope: &Scope, descriptor: Descriptor) -> Result<Self> {
        let attribute = descriptor.name.as_deref().unwrap_or("model");
        dom::remove_attribute(node, attribute)?;

        if let Some(path) = descriptor.expr.clone() {
            let scope = scope.clone();
            dom::add_event_listener(
                node,
                "input",
                Rc::new(move |event: &Event| {
                    let field = event.current_target.unwrap_or(event.target);
                    dom::set_flag(field, NodeFlags::TYPING, true)?;
                    assign_path(&scope, &path, Value::String(dom::value(field)))
                }),
            );
        }
        dom::add_event_listener(
            node,
            "blur",
            Rc::new(|event: &Event| {
                let field = event.current_target.unwrap_or(event.target);
                dom::set_flag(field, NodeFlags::TYPING, false)
            }),
        );

        Ok(Self {
            node,
            path: descriptor.expr,
        })
    }
}

impl DirectiveBehavior for ModelDirective {
    fn expression(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn update(&self, value: Value, _mutation: Option<&Mutation>) -> Result<()> {
        if dom::has_flag(self.node, NodeFlags::TYPING) {
            return Ok(());
        }
        dom::set_value(self.node, &value.to_js_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::Directive;
    use crate::dom::{create_element, dispatch, reset_document, set_attribute, set_value, value};
    use crate::reactive::ObjectRef;

    fn setup() -> (ObjectRef, NodeId, Directive) {
        reset_document();
        let form = ObjectRef::from_pairs([("name", "Ann")]);
        let root = ObjectRef::from_pairs([("form", form)]);
        let input = create_element("input");
        set_attribute(input, "model", "form.name").unwrap();
        let d = Directive::create(input, &Scope::new(root.clone()), Descriptor::named("model", "form.name"))
            .unwrap()
            .unwrap();
        (root, input, d)
    }

    #[test]
    fn test_data_to_field() {
        let (root, input, _d) = setup();
        assert!(!dom::has_attribute(input, "model"));
        assert_eq!(value(input), "Ann");

        let form = root.peek("form").as_object().cloned().unwrap();
        form.set("name", "Bob").unwrap();
        assert_eq!(value(input), "Bob");
    }

    #[test]
    fn test_keystroke_writes_back_without_echo() {
        let (root, input, _d) = setup();
        let form = root.peek("form").as_object().cloned().unwrap();

        set_value(input, "Annie").unwrap();
        dispatch(Event::new("input", input)).unwrap();
        assert_eq!(form.peek("name").to_js_string(), "Annie");
        assert!(dom::has_flag(input, NodeFlags::TYPING));

        // Programmatic change while typing does not touch the field.
        form.set("name", "Zed").unwrap();
        assert_eq!(value(input), "Annie");

        dispatch(Event::new("blur", input)).unwrap();
        form.set("name", "Yan").unwrap();
        assert_eq!(value(input), "Yan");
    }
}
