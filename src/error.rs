//! Error type shared by every layer of the runtime.
//!
//! Template mistakes are development-time problems: nothing here is caught
//! internally. An error raised while a watcher evaluates travels back out of
//! whatever started the evaluation (compilation, a property write, an array
//! mutation, an event dispatch).

use thiserror::Error;

/// Errors raised by the binding runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An expression could not be parsed. Reported on first evaluation.
    #[error("syntax error in `{expr}`: {message}")]
    Syntax { expr: String, message: String },

    /// A call target was not a function.
    #[error("`{callee}` is not a function")]
    NotCallable { callee: String },

    /// An operation was applied to a value of the wrong kind.
    #[error("type error: {0}")]
    Type(String),

    /// A `model` binding path (or any assignment target) is not a property path.
    #[error("invalid assignment target: `{0}`")]
    InvalidPath(String),

    /// Template markup could not be read.
    #[error("markup error at byte {offset}: {message}")]
    Markup { offset: usize, message: String },

    /// Application data could not be loaded.
    #[error("invalid application data: {0}")]
    Data(String),

    /// A node id that does not belong to the current document.
    #[error("unknown node #{0}")]
    UnknownNode(usize),
}

impl Error {
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
