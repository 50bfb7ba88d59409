//! `if="expr"` with an optional `else` sibling.
//!
//! Both branches are detached at init and parked behind empty text anchors
//! that hold their places. Updates swap node and anchor with
//! [`replace_with`](crate::dom::replace_with), never insertion, so the
//! parent's child list keeps its length while the compiler walks it.
//!
//! The branches are compiled once, at init. Toggling only moves nodes, so
//! the bindings inside a branch stay live while it is detached.

use super::{live_count, Descriptor, Directive, DirectiveBehavior};
use crate::compiler::compile;
use crate::dom::{self, NodeFlags, NodeId};
use crate::error::Result;
use crate::reactive::Scope;
use crate::types::{Mutation, Value};

pub struct ConditionalDirective {
    node: NodeId,
    anchor: NodeId,
    /// `(else node, its anchor)`
    else_branch: Option<(NodeId, NodeId)>,
    expr: Option<String>,
    owned: Vec<Directive>,
}

impl ConditionalDirective {
    pub fn init(node: NodeId, scope: &Scope, descriptor: Descriptor) -> Result<Self> {
        let mut owned = Vec::new();

        let else_branch = match dom::next_element_sibling(node) {
            Some(next) if dom::has_attribute(next, "else") => {
                dom::remove_attribute(next, "else")?;
                dom::set_flag(next, NodeFlags::CLAIMED, true)?;
                let else_anchor = dom::create_text("");
                dom::replace_with(next, else_anchor)?;
                owned.extend(compile(next, scope)?);
                Some((next, else_anchor))
            }
            _ => None,
        };

        let anchor = dom::create_text("");
        dom::replace_with(node, anchor)?;
        owned.extend(compile(node, scope)?);

        Ok(Self {
            node,
            anchor,
            else_branch,
            expr: descriptor.expr,
            owned,
        })
    }

    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    pub fn else_node(&self) -> Option<NodeId> {
        self.else_branch.map(|(node, _)| node)
    }
}

impl DirectiveBehavior for ConditionalDirective {
    fn expression(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    fn update(&self, value: Value, _mutation: Option<&Mutation>) -> Result<()> {
        if value.truthy() {
            dom::replace_with(self.anchor, self.node)?;
            if let Some((else_node, else_anchor)) = self.else_branch {
                dom::replace_with(else_node, else_anchor)?;
            }
        } else {
            dom::replace_with(self.node, self.anchor)?;
            if let Some((else_node, else_anchor)) = self.else_branch {
                dom::replace_with(else_anchor, else_node)?;
            }
        }
        Ok(())
    }

    fn owned_directives(&self) -> usize {
        live_count(&self.owned)
    }
}
