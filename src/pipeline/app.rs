//! Application bootstrap - options, method merge, mount, lifecycle hooks.
//!
//! # Lifecycle
//!
//! ```text
//! App::new(options)     methods merged onto data, data observed
//!        │
//! App::mount(el, loc)   el compiled against the data, then ready(path, query)
//!        │
//! App::device_ready()   onDeviceReady()
//!        │
//! App::unmount()        every binding dropped
//! ```
//!
//! Hooks are ordinary methods looked up on the data by name, so they run with
//! the root scope as `this` and can read or write sibling data.
//!
//! # Example
//!
//! ```ignore
//! use quebind::pipeline::{App, AppOptions, Location};
//! use serde_json::json;
//!
//! let options = AppOptions::new(json!({ "title": "Inbox", "unread": 3 }))
//!     .method("ready", |this, args| {
//!         tracing::info!(path = %args.arg(0), "ready");
//!         this.set("title", "Inbox (ready)")?;
//!         Ok(Value::Undefined)
//!     });
//!
//! let mut app = App::new(options)?;
//! let body = load_document("<body><h1>{{title}} ({{unread}})</h1></body>")?;
//! app.mount(body, &Location::parse("https://mail.example/inbox?tab=2"))?;
//! ```

use indexmap::IndexMap;

use super::location::Location;
use crate::compiler::{self, View};
use crate::dom::{self, NodeId, NodeKind};
use crate::error::{Error, Result};
use crate::reactive::{ObjectRef, Scope};
use crate::types::{CallArgs, Method, Value};

// =============================================================================
// Options
// =============================================================================

/// Configuration for an [`App`].
#[derive(Debug, Default)]
pub struct AppOptions {
    /// Root record. A JSON object, or an already reactive object.
    pub data: Value,
    /// Functions merged onto `data` before it is observed.
    pub methods: IndexMap<String, Method>,
}

impl AppOptions {
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            data: data.into(),
            methods: IndexMap::new(),
        }
    }

    /// Read options from a JSON document: the object under `"data"`, or the
    /// whole document when it has no `"data"` key.
    pub fn from_json(text: &str) -> Result<Self> {
        let document: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::Data(e.to_string()))?;
        let data = match document {
            serde_json::Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or_default()
            }
            other => other,
        };
        Ok(Self::new(data))
    }

    /// Add a method.
    pub fn method(
        mut self,
        name: &str,
        f: impl Fn(&Scope, &CallArgs) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(name.to_string(), Method::new(f));
        self
    }
}

// =============================================================================
// App
// =============================================================================

pub struct App {
    data: ObjectRef,
    scope: Scope,
    view: Option<View>,
    location: Option<Location>,
}

impl App {
    /// Merge the methods onto the data and observe it.
    pub fn new(options: AppOptions) -> Result<Self> {
        let data = match options.data {
            Value::Object(object) => object,
            Value::Undefined | Value::Null => ObjectRef::new(),
            other => {
                return Err(Error::Data(format!(
                    "`data` must be an object, got {}",
                    other.type_name()
                )));
            }
        };
        for (name, method) in options.methods {
            data.set(&name, method)?;
        }

        tracing::debug!(message = "app.new", keys = data.len());
        Ok(Self {
            scope: Scope::new(data.clone()),
            data,
            view: None,
            location: None,
        })
    }

    /// Root data object.
    pub fn data(&self) -> &ObjectRef {
        &self.data
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.view.is_some()
    }

    /// The document-ready step: compile `root`, then call
    /// `ready(path, query)` when the data defines it.
    ///
    /// Mounting again replaces (and drops) the previous view.
    pub fn mount(&mut self, root: NodeId, location: &Location) -> Result<()> {
        let view = compiler::mount(root, &self.scope)?;
        tracing::debug!(
            message = "app.mount",
            %root,
            directives = view.live_count(),
            path = %location.path
        );
        self.view = Some(view);
        self.location = Some(location.clone());

        self.call_hook(
            "ready",
            vec![
                Value::String(location.path.clone()),
                Value::String(location.query.clone()),
            ],
        )?;
        Ok(())
    }

    /// The host-readiness signal: calls `onDeviceReady()` when defined.
    pub fn device_ready(&self) -> Result<()> {
        self.call_hook("onDeviceReady", Vec::new())?;
        Ok(())
    }

    /// Call the method `name` with the root scope as `this`.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        match self.data.peek(name) {
            Value::Function(method) => method.call(&self.scope, &CallArgs::new(args)),
            _ => Err(Error::NotCallable {
                callee: name.to_string(),
            }),
        }
    }

    /// Drop every binding. The document keeps its current content.
    pub fn unmount(&mut self) {
        if let Some(view) = self.view.take() {
            tracing::debug!(message = "app.unmount", directives = view.live_count());
        }
    }

    /// Call a lifecycle hook if the data defines it. Returns whether it ran.
    fn call_hook(&self, name: &str, args: Vec<Value>) -> Result<bool> {
        let Value::Function(method) = self.data.peek(name) else {
            return Ok(false);
        };
        tracing::debug!(message = "app.hook", hook = name);
        method.call(&self.scope, &CallArgs::new(args))?;
        Ok(true)
    }
}

// =============================================================================
// Document loading
// =============================================================================

/// Parse a page and return its `body` element. Markup without a `body` is
/// wrapped in a new one.
pub fn load_document(markup: &str) -> Result<NodeId> {
    let fragment = dom::parse_html(markup)?;
    if let Some(body) = find_element(fragment, "body") {
        return Ok(body);
    }
    let body = dom::create_element("body");
    dom::append_child(body, fragment)?;
    Ok(body)
}

fn find_element(node: NodeId, tag: &str) -> Option<NodeId> {
    dom::children(node).into_iter().find_map(|child| {
        if dom::kind(child) != Some(NodeKind::Element) {
            return None;
        }
        if dom::tag_name(child).as_deref() == Some(tag) {
            return Some(child);
        }
        find_element(child, tag)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, reset_document};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_methods_merged_onto_data() {
        let options = AppOptions::new(json!({ "n": 1 }))
            .method("double", |this, _| Ok(Value::Number(this.get("n").to_number() * 2.0)));
        let app = App::new(options).unwrap();

        assert!(app.data().has("double"));
        assert_eq!(app.call("double", vec![]).unwrap().to_number(), 2.0);
        assert!(matches!(app.call("n", vec![]), Err(Error::NotCallable { .. })));
    }

    #[test]
    fn test_mount_then_ready_hook() {
        reset_document();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let options = AppOptions::new(json!({ "title": "Draft" })).method("ready", move |this, args| {
            sink.borrow_mut()
                .push(format!("{}|{}", args.arg(0).to_js_string(), args.arg(1).to_js_string()));
            this.set("title", "Loaded")?;
            Ok(Value::Undefined)
        });

        let mut app = App::new(options).unwrap();
        let body = load_document("<html><body><h1>{{title}}</h1></body></html>").unwrap();
        app.mount(body, &Location::parse("/docs/a%20b?id=7")).unwrap();

        assert_eq!(*calls.borrow(), vec!["/docs/a b|id=7"]);
        // The hook runs after compilation, so its write is rendered.
        assert_eq!(inner_html(body), "<h1>Loaded</h1>");
        assert!(app.is_mounted());
    }

    #[test]
    fn test_device_ready_is_optional() {
        let app = App::new(AppOptions::default()).unwrap();
        app.device_ready().unwrap();

        let fired = Rc::new(RefCell::new(false));
        let flag = fired.clone();
        let app = App::new(AppOptions::new(json!({})).method("onDeviceReady", move |_, _| {
            *flag.borrow_mut() = true;
            Ok(Value::Undefined)
        }))
        .unwrap();
        app.device_ready().unwrap();
        assert!(*fired.borrow());
    }

    #[test]
    fn test_options_from_json() {
        let options = AppOptions::from_json(r#"{ "data": { "a": [1, 2] } }"#).unwrap();
        let app = App::new(options).unwrap();
        assert_eq!(app.data().peek("a").as_array().map(|a| a.len()), Some(2));

        assert!(matches!(AppOptions::from_json("{ nope"), Err(Error::Data(_))));
        assert!(matches!(App::new(AppOptions::new(json!([1]))), Err(Error::Data(_))));
    }

    #[test]
    fn test_unmount_drops_bindings() {
        reset_document();
        let mut app = App::new(AppOptions::new(json!({ "a": 1 }))).unwrap();
        let body = load_document("<p>{{a}}</p>").unwrap();
        app.mount(body, &Location::default()).unwrap();

        app.unmount();
        app.data().set("a", 2).unwrap();
        assert_eq!(inner_html(body), "<p>1</p>");
        assert!(app.data().cell("a").unwrap().dep().is_empty());
    }
}
