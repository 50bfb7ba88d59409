use super::{Descriptor, DirectiveBehavior};
use crate::dom::{self, NodeId};
use crate::error::Result;
use crate::types::{Mutation, Value};

/// `{{expr}}` inside a text node: the whole node text is replaced on update.
pub struct TextDirective {
    node: NodeId,
    expr: Option<String>,
}

impl TextDirective {
    pub fn init(node: NodeId, descriptor: Descriptor) -> Self {
        Self {
            node,
            expr: descriptor.expr,
        }
    }
}

impl DirectiveBehavior for TextDirective {
    fn expression(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    fn update(&self, value: Value, _mutation: Option<&Mutation>) -> Result<()> {
        dom::set_text_content(self.node, &value.to_js_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::Directive;
    use crate::dom::{create_text, reset_document, text};
    use crate::reactive::{ObjectRef, Scope};

    #[test]
    fn test_text_follows_data() {
        reset_document();
        let root = ObjectRef::from_pairs([("name", "Ann")]);
        let node = create_text("{{name}}");
        let _d = Directive::create(node, &Scope::new(root.clone()), Descriptor::text("(name)"))
            .unwrap()
            .unwrap();

        assert_eq!(text(node), "Ann");
        root.set("name", "Bob").unwrap();
        assert_eq!(text(node), "Bob");
    }
}
