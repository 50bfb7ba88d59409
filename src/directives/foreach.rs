//! `foreach="item in list"` / `foreach="(item, i) of list"`.
//!
//! The element is the template: it is replaced by an anchor at init and never
//! compiled itself. Every update throws away all rendered clones, with the
//! directives compiled inside them and the listeners those installed, and
//! renders the list again: one deep clone per element, inserted before the
//! anchor and compiled against a child scope that binds the alias (and index).

use std::cell::RefCell;

use super::{live_count, Descriptor, Directive, DirectiveBehavior};
use crate::compiler::compile;
use crate::dom::{self, NodeId};
use crate::error::{Error, Result};
use crate::reactive::Scope;
use crate::types::{Mutation, Value};

/// Parsed loop header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeachHeader {
    pub alias: String,
    pub index: Option<String>,
    pub list: String,
}

/// Parse `alias in list`, `alias of list` or `(alias, index) in list`.
///
/// The separator is the last ` in ` / ` of ` with text on both sides.
pub fn parse_foreach(expr: &str) -> Option<ForeachHeader> {
    let split = [" in ", " of "]
        .iter()
        .filter_map(|sep| expr.rfind(sep).map(|at| (at, sep.len())))
        .filter(|&(at, len)| at > 0 && at + len < expr.len())
        .max_by_key(|&(at, _)| at)?;

    let (head, list) = (&expr[..split.0], &expr[split.0 + split.1..]);
    let list = list.trim();
    if list.is_empty() {
        return None;
    }

    let head = head.trim();
    let pair = head
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .and_then(|inner| inner.rsplit_once(','));
    let (alias, index) = match pair {
        Some((alias, index)) => (alias.trim(), Some(index.trim().to_string())),
        None => (head, None),
    };
    if alias.is_empty() {
        return None;
    }

    Some(ForeachHeader {
        alias: alias.to_string(),
        index,
        list: list.to_string(),
    })
}

pub struct ForeachDirective {
    template: NodeId,
    anchor: NodeId,
    scope: Scope,
    header: ForeachHeader,
    rendered: RefCell<Vec<(NodeId, Vec<Directive>)>>,
}

impl ForeachDirective {
    pub fn init(node: NodeId, scope: &Scope, descriptor: Descriptor) -> Result<Self> {
        let source = descriptor.expr.unwrap_or_default();
        let header = parse_foreach(&source).ok_or_else(|| Error::Syntax {
            expr: source.clone(),
            message: "expected `alias in list` or `(alias, index) in list`".to_string(),
        })?;

        let anchor = dom::create_text("");
        dom::replace_with(node, anchor)?;

        Ok(Self {
            template: node,
            anchor,
            scope: scope.clone(),
            header,
            rendered: RefCell::new(Vec::new()),
        })
    }

    pub fn header(&self) -> &ForeachHeader {
        &self.header
    }

    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    /// Root nodes of the current clones, in order.
    pub fn rendered_nodes(&self) -> Vec<NodeId> {
        self.rendered.borrow().iter().map(|(node, _)| *node).collect()
    }

    fn clear(&self) -> Result<()> {
        let old = self.rendered.take();
        for (node, _) in &old {
            dom::remove(*node)?;
            dom::remove_listeners(*node);
        }
        Ok(())
    }

    fn render_item(&self, item: Value, index: usize) -> Result<(NodeId, Vec<Directive>)> {
        let mut bindings = vec![(self.header.alias.clone(), item)];
        if let Some(name) = &self.header.index {
            bindings.push((name.clone(), Value::from(index)));
        }
        let scope = self.scope.child(bindings);

        let clone = dom::clone_node(self.template, true)?;
        dom::insert_before_node(self.anchor, clone)?;
        let directives = compile(clone, &scope)?;
        Ok((clone, directives))
    }
}

impl DirectiveBehavior for ForeachDirective {
    fn expression(&self) -> Option<&str> {
        Some(&self.header.list)
    }

    fn update(&self, value: Value, mutation: Option<&Mutation>) -> Result<()> {
        self.clear()?;

        let items = match &value {
            Value::Array(array) => array.to_vec(),
            other if !other.truthy() => Vec::new(),
            other => {
                return Err(Error::type_error(format!(
                    "foreach over `{}` needs an array, got {}",
                    self.header.list,
                    other.type_name()
                )));
            }
        };

        tracing::debug!(
            message = "directive.foreach.render",
            list = %self.header.list,
            items = items.len(),
            op = mutation.map(|m| m.op.as_str()).unwrap_or("set")
        );

        let mut rendered = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            rendered.push(self.render_item(item, index)?);
        }
        *self.rendered.borrow_mut() = rendered;
        Ok(())
    }

    fn owned_directives(&self) -> usize {
        self.rendered
            .borrow()
            .iter()
            .map(|(_, directives)| live_count(directives))
            .sum()
    }
}
