use super::{Descriptor, DirectiveBehavior};
use crate::dom::{self, NodeId};
use crate::error::Result;
use crate::types::{Mutation, Value};

/// `hidden="expr"`: the attribute is present while the expression is falsy.
pub struct HiddenDirective {
    node: NodeId,
    name: String,
    expr: Option<String>,
}

impl HiddenDirective {
    pub fn init(node: NodeId, descriptor: Descriptor) -> Self {
        Self {
            node,
            name: descriptor.name.unwrap_or_else(|| "hidden".to_string()),
            expr: descriptor.expr,
        }
    }
}

impl DirectiveBehavior for HiddenDirective {
    fn expression(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    fn update(&self, value: Value, _mutation: Option<&Mutation>) -> Result<()> {
        if value.truthy() {
            dom::remove_attribute(self.node, &self.name)
        } else {
            dom::set_attribute(self.node, &self.name, "true")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::Directive;
    use crate::dom::{create_element, get_attribute, has_attribute, reset_document};
    use crate::reactive::{ObjectRef, Scope};

    #[test]
    fn test_hidden_toggles_presence() {
        reset_document();
        let root = ObjectRef::from_pairs([("open", false)]);
        let node = create_element("section");
        let _d = Directive::create(node, &Scope::new(root.clone()), Descriptor::named("hidden", "open"))
            .unwrap();

        assert_eq!(get_attribute(node, "hidden").as_deref(), Some("true"));
        root.set("open", true).unwrap();
        assert!(!has_attribute(node, "hidden"));
    }
}
