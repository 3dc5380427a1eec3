//! A disposable holding one replaceable child.

use std::sync::Arc;

use super::{Disposable, DisposableRef};
use crate::error::DisposeError;
use crate::sync::AtomicCell;

#[derive(Default)]
struct SerialState {
    inner: Option<DisposableRef>,
    disposed: bool,
}

/// A disposable that owns at most one "current" child.
///
/// Setting a new child disposes the previous one. Once the serial
/// disposable itself is disposed, any child set afterwards is disposed
/// immediately instead of being stored.
#[derive(Clone, Default)]
pub struct SerialDisposable {
    state: Arc<AtomicCell<SerialState>>,
}

impl SerialDisposable {
    /// Create an empty, live serial disposable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a live serial disposable that already holds `inner`.
    pub fn with_inner(inner: DisposableRef) -> Self {
        Self {
            state: Arc::new(AtomicCell::new(SerialState {
                inner: Some(inner),
                disposed: false,
            })),
        }
    }

    /// The current child, if any.
    pub fn inner(&self) -> Option<DisposableRef> {
        self.state.with_value(|state| state.inner.clone())
    }

    /// Replace the current child.
    ///
    /// The outgoing child is disposed. If this disposable is already
    /// disposed, `inner` is disposed instead and nothing is stored.
    pub fn set_inner(&self, inner: Option<DisposableRef>) -> Result<(), DisposeError> {
        let (_, to_dispose) = self.state.modify_with_result(move |state| {
            if state.disposed {
                let current = SerialState {
                    inner: None,
                    disposed: true,
                };
                (current, inner)
            } else {
                let next = SerialState {
                    inner,
                    disposed: false,
                };
                (next, state.inner.clone())
            }
        });

        match to_dispose {
            Some(disposable) => disposable.dispose(),
            None => Ok(()),
        }
    }
}

impl Disposable for SerialDisposable {
    fn dispose(&self) -> Result<(), DisposeError> {
        let previous = self.state.swap(SerialState {
            inner: None,
            disposed: true,
        });

        match previous.inner {
            Some(inner) => inner.dispose(),
            None => Ok(()),
        }
    }

    fn is_disposed(&self) -> bool {
        self.state.with_value(|state| state.disposed)
    }
}

impl std::fmt::Debug for SerialDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDisposable")
            .field("has_inner", &self.inner().is_some())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
