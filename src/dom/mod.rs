//! Document model the compiler and directives operate on.
//!
//! - [`document`] - node arena, tree operations, attributes, values, flags
//! - [`events`] - listeners, bubbling dispatch, custom event adapters
//! - [`markup`] - HTML subset reader and serializer
//!
//! All state is per thread. Nothing here holds a borrow while calling user
//! code, so listeners and adapters may mutate the document freely.

pub mod document;
pub mod events;
pub mod markup;

pub use document::{
    append_child, attributes, children, clone_node, contains, create_comment, create_element,
    create_fragment, create_text, first_child, flags, get_attribute, has_attribute, has_flag,
    insert_before, insert_before_node, is_element, kind, next_element_sibling, next_sibling,
    node_count, parent, previous_sibling, remove, remove_attribute, replace_with, reset_document,
    set_attribute, set_flag, set_text_content, set_value, tag_name, text, text_content, value,
    NodeFlags, NodeId, NodeKind,
};
pub use events::{
    add_event_listener, dispatch, dispatch_event, event_adapter, listener_count,
    register_event_adapter, remove_listeners, reset_event_adapters, Event, EventAdapter, EventCallback,
};
pub use markup::{decode_entities, inner_html, parse_html, to_html};
