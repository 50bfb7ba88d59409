//! Directives - live bindings between a compiled node and a side effect.
//!
//! The compiler turns every bindable node or attribute into a [`Descriptor`]
//! and hands it to [`Directive::create`]. Creation runs the variant's `init`
//! (its constructor) and, when the variant is reactive and has an expression,
//! attaches a [`Watcher`] whose callback is the variant's `update`.
//!
//! # Variants
//!
//! | kind | source | update |
//! |------|--------|--------|
//! | `text` | `{{expr}}` in a text node | text content |
//! | `attr` | `{{expr}}` in an attribute value | attribute (`data-src` becomes `src`) |
//! | `hidden` | `hidden="expr"` | attribute present while falsy |
//! | `model` | `model="path"` | input value, two-way |
//! | `event` | `@name="method"` | none, wires a listener once |
//! | `if` | `if="expr"` (+ `else` sibling) | swaps node and anchor |
//! | `foreach` | `foreach="item in list"` | rebuilds every clone |
//!
//! # Ownership
//!
//! A directive owns its watcher. Structural directives own the directives
//! compiled inside their subtrees, so dropping a rendered `foreach` clone
//! drops its watchers too, and the dependencies they were registered with
//! forget them. The clone's listeners are removed with it. Its nodes stay in
//! the document arena, detached, since node ids are never reused.

mod attr;
mod conditional;
mod event;
mod foreach;
mod hidden;
mod model;
mod text;

use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::error::Result;
use crate::reactive::{Scope, Watcher};
use crate::types::{Mutation, Value};

pub use attr::AttrDirective;
pub use conditional::ConditionalDirective;
pub use event::EventDirective;
pub use foreach::{parse_foreach, ForeachDirective, ForeachHeader};
pub use hidden::HiddenDirective;
pub use model::ModelDirective;
pub use text::TextDirective;

// =============================================================================
// Kind & descriptor
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Text,
    Attr,
    Hidden,
    Model,
    Event,
    If,
    Foreach,
}

impl DirectiveKind {
    /// Look up a variant by its tag. Unknown tags give `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "text" => Self::Text,
            "attr" => Self::Attr,
            "hidden" => Self::Hidden,
            "model" => Self::Model,
            "event" => Self::Event,
            "if" => Self::If,
            "foreach" => Self::Foreach,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Attr => "attr",
            Self::Hidden => "hidden",
            Self::Model => "model",
            Self::Event => "event",
            Self::If => "if",
            Self::Foreach => "foreach",
        }
    }

    /// `if` and `foreach` take over their element's whole subtree.
    pub fn is_structural(self) -> bool {
        matches!(self, Self::If | Self::Foreach)
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the compiler found: a variant tag plus the variant's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    /// Variant tag. Kept as a string so unknown tags can be skipped.
    pub kind: String,
    pub expr: Option<String>,
    /// Attribute or event name.
    pub name: Option<String>,
    /// Scope method name (`event`).
    pub method: Option<String>,
}

impl Descriptor {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    pub fn text(expr: impl Into<String>) -> Self {
        Self {
            expr: Some(expr.into()),
            ..Self::new("text")
        }
    }

    pub fn attr(name: &str, expr: impl Into<String>) -> Self {
        Self {
            expr: Some(expr.into()),
            name: Some(name.to_string()),
            ..Self::new("attr")
        }
    }

    /// `hidden` or `model`: the attribute name is the tag.
    pub fn named(name: &str, expr: impl Into<String>) -> Self {
        Self {
            expr: Some(expr.into()),
            name: Some(name.to_string()),
            ..Self::new(name)
        }
    }

    pub fn event(name: &str, method: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            method: Some(method.to_string()),
            ..Self::new("event")
        }
    }

    /// `if` / `foreach`.
    pub fn structural(kind: &str, expr: impl Into<String>) -> Self {
        Self {
            expr: Some(expr.into()),
            ..Self::new(kind)
        }
    }
}

// =============================================================================
// Behavior
// =============================================================================

/// Variant-specific behavior. Construction is the variant's `init`.
pub trait DirectiveBehavior {
    /// Expression to watch. `None` means no watcher.
    fn expression(&self) -> Option<&str>;

    /// Apply a freshly computed value.
    fn update(&self, _value: Value, _mutation: Option<&Mutation>) -> Result<()> {
        Ok(())
    }

    /// Whether the variant has an `update` at all.
    fn reactive(&self) -> bool {
        true
    }

    /// Directives currently owned by this one (structural variants).
    fn owned_directives(&self) -> usize {
        0
    }
}

// =============================================================================
// Directive
// =============================================================================

pub struct Directive {
    kind: DirectiveKind,
    node: NodeId,
    watcher: Option<Rc<Watcher>>,
    behavior: Rc<dyn DirectiveBehavior>,
}

impl Directive {
    /// Build the directive `descriptor` describes on `node`.
    ///
    /// Returns `Ok(None)` for an unknown variant tag. Errors come from the
    /// variant's init or from the first evaluation of its expression.
    pub fn create(node: NodeId, scope: &Scope, descriptor: Descriptor) -> Result<Option<Directive>> {
        let Some(kind) = DirectiveKind::from_tag(&descriptor.kind) else {
            tracing::trace!(message = "directive.unknown", kind = %descriptor.kind, %node);
            return Ok(None);
        };
        tracing::debug!(
            message = "directive.create",
            %kind,
            %node,
            expr = descriptor.expr.as_deref().unwrap_or_default()
        );

        let behavior: Rc<dyn DirectiveBehavior> = match kind {
            DirectiveKind::Text => Rc::new(TextDirective::init(node, descriptor)),
            DirectiveKind::Attr => Rc::new(AttrDirective::init(node, descriptor)),
            DirectiveKind::Hidden => Rc::new(HiddenDirective::init(node, descriptor)),
            DirectiveKind::Model => Rc::new(ModelDirective::init(node, scope, descriptor)?),
            DirectiveKind::Event => Rc::new(EventDirective::init(node, scope, descriptor)?),
            DirectiveKind::If => Rc::new(ConditionalDirective::init(node, scope, descriptor)?),
            DirectiveKind::Foreach => Rc::new(ForeachDirective::init(node, scope, descriptor)?),
        };

        let watcher = match behavior.expression().map(str::to_owned) {
            Some(expr) if behavior.reactive() => {
                let target = behavior.clone();
                Some(Watcher::new(scope.clone(), &expr, move |value, mutation| {
                    target.update(value, mutation)
                })?)
            }
            _ => None,
        };

        Ok(Some(Directive {
            kind,
            node,
            watcher,
            behavior,
        }))
    }

    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn watcher(&self) -> Option<&Rc<Watcher>> {
        self.watcher.as_ref()
    }

    pub fn expression(&self) -> Option<&str> {
        self.behavior.expression()
    }

    /// This directive plus everything it owns, recursively.
    pub fn live_count(&self) -> usize {
        1 + self.behavior.owned_directives()
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("kind", &self.kind)
            .field("node", &self.node)
            .field("expr", &self.expression())
            .finish()
    }
}

/// Total of [`Directive::live_count`] over a directive list.
pub fn live_count(directives: &[Directive]) -> usize {
    directives.iter().map(Directive::live_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{create_element, reset_document};
    use crate::reactive::ObjectRef;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in [
            DirectiveKind::Text,
            DirectiveKind::Attr,
            DirectiveKind::Hidden,
            DirectiveKind::Model,
            DirectiveKind::Event,
            DirectiveKind::If,
            DirectiveKind::Foreach,
        ] {
            assert_eq!(DirectiveKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(DirectiveKind::from_tag("tooltip"), None);
    }

    #[test]
    fn test_unknown_variant_is_skipped() {
        reset_document();
        let node = create_element("div");
        let scope = Scope::new(ObjectRef::new());
        let descriptor = Descriptor::structural("tooltip", "a");
        assert!(Directive::create(node, &scope, descriptor).unwrap().is_none());
    }

    #[test]
    fn test_descriptor_constructors() {
        let d = Descriptor::named("hidden", "!open");
        assert_eq!(d.kind, "hidden");
        assert_eq!(d.name.as_deref(), Some("hidden"));

        let d = Descriptor::event("click", "save");
        assert_eq!(d.expr, None);
        assert_eq!(d.method.as_deref(), Some("save"));
    }
}
