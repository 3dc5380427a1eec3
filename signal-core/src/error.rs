//! Error Types
//!
//! Two kinds of failure flow through the engine:
//!
//! - Stream errors travel through a signal as data, delivered to a
//!   subscriber's `on_error` exactly once. `SignalError` is the default
//!   payload, but any `Clone + Send + Sync` type works.
//!
//! - Resource errors come back from `Disposable::dispose()` when a cleanup
//!   action fails. They are reported to whoever called `dispose()` and never
//!   reach a subscriber.

use std::sync::Arc;

/// The default error type carried by a `Signal`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalError {
    /// A plain error message.
    #[error("{0}")]
    Message(Arc<str>),

    /// An arbitrary error produced by a producer.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl SignalError {
    /// Create an error from a message.
    pub fn msg(message: impl Into<Arc<str>>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }
}

/// Failure reported by `Disposable::dispose()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisposeError {
    /// A cleanup action returned an error.
    #[error("cleanup action failed: {0}")]
    Action(String),

    /// Several children of a composite failed. Every child was still
    /// disposed; the failures are listed in child order.
    #[error("{} disposables failed to release", .0.len())]
    Multiple(Vec<DisposeError>),
}

impl DisposeError {
    /// Create an action error from a message.
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }

    /// Fold a list of failures into one result.
    pub(crate) fn collect(mut errors: Vec<DisposeError>) -> Result<(), DisposeError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }
}
