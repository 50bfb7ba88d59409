//! Application pipeline
//!
//! Connects observed data to a document and drives the lifecycle hooks.
//!
//! ```text
//! AppOptions → App::new (merge methods, observe) → App::mount (compile, ready) → App::device_ready
//! ```
//!
//! - [`app`] - options, the [`App`] handle, document loading
//! - [`location`] - page path and query for the `ready` hook

pub mod app;
pub mod location;

pub use app::{load_document, App, AppOptions};
pub use location::{decode_uri, Location};
