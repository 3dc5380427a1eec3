//! A disposable that only records that it was disposed.

use std::sync::Arc;
use std::time::Duration;

use super::Disposable;
use crate::error::DisposeError;
use crate::sync::AtomicCell;

/// A disposable that flips a flag and does nothing else.
///
/// Useful as a cancellation token: a producer polls `is_disposed()` and
/// stops when it turns `true`.
#[derive(Clone, Default)]
pub struct SimpleDisposable {
    disposed: Arc<AtomicCell<bool>>,
}

impl SimpleDisposable {
    /// Create a new, live disposable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until disposed or until `timeout` elapses.
    ///
    /// Returns whether the disposable was disposed.
    pub fn wait_disposed(&self, timeout: Duration) -> bool {
        self.disposed.wait_until(|disposed| *disposed, timeout)
    }
}

impl Disposable for SimpleDisposable {
    fn dispose(&self) -> Result<(), DisposeError> {
        self.disposed.set(true);
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl std::fmt::Debug for SimpleDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
