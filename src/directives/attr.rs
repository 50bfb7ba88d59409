use super::{Descriptor, DirectiveBehavior};
use crate::dom::{self, NodeId};
use crate::error::Result;
use crate::types::{Mutation, Value};

/// Attribute value with `{{expr}}` interpolation.
///
/// `data-src` is a lazy-loading placeholder: the first update removes it and
/// writes `src` instead.
pub struct AttrDirective {
    node: NodeId,
    name: String,
    expr: Option<String>,
}

impl AttrDirective {
    pub fn init(node: NodeId, descriptor: Descriptor) -> Self {
        Self {
            node,
            name: descriptor.name.unwrap_or_default(),
            expr: descriptor.expr,
        }
    }
}

impl DirectiveBehavior for AttrDirective {
    fn expression(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    fn update(&self, value: Value, _mutation: Option<&Mutation>) -> Result<()> {
        let value = value.to_js_string();
        if self.name == "data-src" {
            dom::remove_attribute(self.node, "data-src")?;
            dom::set_attribute(self.node, "src", &value)
        } else {
            dom::set_attribute(self.node, &self.name, &value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::Directive;
    use crate::dom::{create_element, get_attribute, has_attribute, reset_document, set_attribute};
    use crate::reactive::{ObjectRef, Scope};

    #[test]
    fn test_attribute_interpolation() {
        reset_document();
        let root = ObjectRef::from_pairs([("kind", "primary")]);
        let node = create_element("button");
        let descriptor = Descriptor::attr("class", "\"btn \"+(kind)");
        let _d = Directive::create(node, &Scope::new(root.clone()), descriptor).unwrap();

        assert_eq!(get_attribute(node, "class").as_deref(), Some("btn primary"));
        root.set("kind", "danger").unwrap();
        assert_eq!(get_attribute(node, "class").as_deref(), Some("btn danger"));
    }

    #[test]
    fn test_data_src_becomes_src() {
        reset_document();
        let root = ObjectRef::from_pairs([("url", "/a.png")]);
        let node = create_element("img");
        set_attribute(node, "data-src", "{{url}}").unwrap();
        let _d = Directive::create(node, &Scope::new(root), Descriptor::attr("data-src", "(url)"))
            .unwrap();

        assert!(!has_attribute(node, "data-src"));
        assert_eq!(get_attribute(node, "src").as_deref(), Some("/a.png"));
    }
}
