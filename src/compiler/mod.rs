//! Compiler - walks a template subtree and instantiates directives.
//!
//! # Classification
//!
//! - **Element** (anything but `script`): a structural attribute (`foreach`,
//!   then `if`) wins. It is stripped, its directive is built, and the walk
//!   stops there; the directive compiles the subtree itself, once per render.
//!   Otherwise every attribute is checked (`@event`, `hidden`, `model`,
//!   `{{...}}` in the value) and the children are walked.
//! - **Fragment**: children are walked.
//! - **Text**: compiled to a `text` directive when its trimmed content holds
//!   an interpolation.
//! - **Comment**: ignored.
//!
//! Children are walked over a snapshot of the child list. A child that is no
//! longer attached to the node by the time the walk reaches it, or that an
//! `if` directive has claimed as its `else` branch, is skipped.
//!
//! # Example
//!
//! ```ignore
//! use quebind::compiler::mount;
//! use quebind::dom::{children, parse_html};
//!
//! let body = children(parse_html(r#"<body><p>{{greeting}}</p></body>"#)?)[0];
//! let view = mount(body, &scope)?;
//! assert_eq!(view.len(), 1);
//! ```

use crate::directives::{live_count, Descriptor, Directive, DirectiveKind};
use crate::dom::{self, NodeFlags, NodeId, NodeKind};
use crate::error::Result;
use crate::expression::parse_mustache;
use crate::reactive::Scope;

// =============================================================================
// Compile
// =============================================================================

/// Compile `node` against `scope` and return the directives built.
pub fn compile(node: NodeId, scope: &Scope) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();
    compile_node(node, scope, &mut directives)?;
    Ok(directives)
}

fn compile_node(node: NodeId, scope: &Scope, out: &mut Vec<Directive>) -> Result<()> {
    match dom::kind(node) {
        Some(NodeKind::Element) => {
            if dom::tag_name(node).as_deref() == Some("script") {
                return Ok(());
            }
            compile_element(node, scope, out)
        }
        Some(NodeKind::Fragment) => compile_children(node, scope, out),
        Some(NodeKind::Text) => compile_text(node, scope, out),
        Some(NodeKind::Comment) | None => Ok(()),
    }
}

fn compile_element(node: NodeId, scope: &Scope, out: &mut Vec<Directive>) -> Result<()> {
    if let Some(descriptor) = terminal_directive(node) {
        dom::remove_attribute(node, &descriptor.kind)?;
        out.extend(Directive::create(node, scope, descriptor)?);
        return Ok(());
    }

    for (name, value) in dom::attributes(node) {
        if let Some(descriptor) = attribute_directive(&name, &value) {
            out.extend(Directive::create(node, scope, descriptor)?);
        }
    }

    compile_children(node, scope, out)
}

fn compile_children(node: NodeId, scope: &Scope, out: &mut Vec<Directive>) -> Result<()> {
    for child in dom::children(node) {
        if dom::parent(child) != Some(node) || dom::has_flag(child, NodeFlags::CLAIMED) {
            continue;
        }
        compile_node(child, scope, out)?;
    }
    Ok(())
}

fn compile_text(node: NodeId, scope: &Scope, out: &mut Vec<Directive>) -> Result<()> {
    let text = dom::text(node);
    if let Some(expr) = parse_mustache(text.trim()) {
        out.extend(Directive::create(node, scope, Descriptor::text(expr))?);
    }
    Ok(())
}

// =============================================================================
// Classification
// =============================================================================

/// `foreach` or `if` on an element, checked in that order.
pub fn terminal_directive(node: NodeId) -> Option<Descriptor> {
    [DirectiveKind::Foreach, DirectiveKind::If]
        .into_iter()
        .find_map(|kind| {
            dom::get_attribute(node, kind.as_str())
                .map(|expr| Descriptor::structural(kind.as_str(), expr))
        })
}

/// Directive described by one attribute, if any.
pub fn attribute_directive(name: &str, value: &str) -> Option<Descriptor> {
    if let Some(event) = name.strip_prefix('@') {
        return Some(Descriptor::event(event, value.trim()));
    }
    if name == "hidden" || name == "model" {
        return Some(Descriptor::named(name, value));
    }
    parse_mustache(value).map(|expr| Descriptor::attr(name, expr))
}

// =============================================================================
// Mount
// =============================================================================

/// Directives compiled for one mounted element.
#[derive(Debug)]
pub struct View {
    root: NodeId,
    directives: Vec<Directive>,
}

impl View {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Top-level directives.
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Every live directive, including those owned by `if` / `foreach`.
    pub fn live_count(&self) -> usize {
        live_count(&self.directives)
    }
}

/// Compile the children of `el` in a detached working fragment and put them
/// back. Comments and whitespace-only text nodes are dropped on the way.
///
/// Dropping the returned [`View`] drops every binding it holds.
pub fn mount(el: NodeId, scope: &Scope) -> Result<View> {
    let fragment = dom::create_fragment();
    for child in dom::children(el) {
        if is_ignorable(child) {
            dom::remove(child)?;
        } else {
            dom::append_child(fragment, child)?;
        }
    }

    let directives = compile(fragment, scope)?;
    dom::append_child(el, fragment)?;

    tracing::debug!(message = "compiler.mount", root = %el, directives = directives.len());
    Ok(View {
        root: el,
        directives,
    })
}

fn is_ignorable(node: NodeId) -> bool {
    match dom::kind(node) {
        Some(NodeKind::Comment) => true,
        Some(NodeKind::Text) => dom::text(node).trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{children, has_attribute, inner_html, parse_html, reset_document};
    use crate::reactive::ObjectRef;
    use crate::types::Value;
    use serde_json::json;

    fn body(markup: &str) -> NodeId {
        reset_document();
        let body = dom::create_element("body");
        let fragment = parse_html(markup).unwrap();
        dom::append_child(body, fragment).unwrap();
        body
    }

    fn scope(data: serde_json::Value) -> (ObjectRef, Scope) {
        let root = Value::from(data).as_object().cloned().unwrap();
        (root.clone(), Scope::new(root))
    }

    #[test]
    fn test_attribute_classification() {
        assert_eq!(
            attribute_directive("@click", "save"),
            Some(Descriptor::event("click", "save"))
        );
        assert_eq!(
            attribute_directive("model", "form.name"),
            Some(Descriptor::named("model", "form.name"))
        );
        assert_eq!(
            attribute_directive("title", "Hi {{name}}"),
            Some(Descriptor::attr("title", "\"Hi \"+(name)"))
        );
        assert_eq!(attribute_directive("class", "static"), None);
    }

    #[test]
    fn test_mount_drops_comments_and_blank_text() {
        let el = body("\n  <!-- c -->\n  <p>{{a}}</p>\n  ");
        let (_root, scope) = scope(json!({ "a": 1 }));
        let view = mount(el, &scope).unwrap();

        assert_eq!(view.len(), 1);
        assert_eq!(inner_html(el), "<p>1</p>");
    }

    #[test]
    fn test_structural_attribute_stops_the_walk() {
        let el = body(r#"<ul><li foreach="n in list" title="{{n}}">{{n}}</li></ul>"#);
        let (_root, scope) = scope(json!({ "list": [1, 2] }));
        let view = mount(el, &scope).unwrap();

        // One foreach at top level; each clone has an attr and a text directive.
        assert_eq!(view.len(), 1);
        assert_eq!(view.live_count(), 1 + 2 * 2);
        assert_eq!(inner_html(el), r#"<ul><li title="1">1</li><li title="2">2</li></ul>"#);
    }

    #[test]
    fn test_script_is_not_compiled() {
        let el = body("<script>var x = '{{a}}';</script>");
        let (_root, scope) = scope(json!({ "a": 1 }));
        let view = mount(el, &scope).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn test_else_branch_compiled_once() {
        let el = body(r#"<p if="ok">{{yes}}</p><p else>{{no}}</p>"#);
        let (root, scope) = scope(json!({ "ok": false, "yes": "Y", "no": "N" }));
        let view = mount(el, &scope).unwrap();

        // if + its two text bindings; the else node is not compiled again.
        assert_eq!(view.len(), 1);
        assert_eq!(view.live_count(), 3);
        let visible = children(el);
        assert_eq!(inner_html(el), "<p>N</p>");
        assert!(!has_attribute(visible[1], "else"));

        root.set("ok", true).unwrap();
        assert_eq!(inner_html(el), "<p>Y</p>");
        assert_eq!(dom::parent(visible[1]), None);
    }
}
