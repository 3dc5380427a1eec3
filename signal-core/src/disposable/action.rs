//! A disposable that runs a cleanup action.

use std::sync::Arc;

use super::Disposable;
use crate::error::DisposeError;
use crate::sync::AtomicCell;

type Action = Box<dyn FnOnce() -> Result<(), DisposeError> + Send>;

/// A disposable that runs a cleanup action on first disposal.
///
/// Disposal swaps the action out of its cell before running it, so the
/// action runs at most once even when several threads dispose concurrently.
/// The disposable counts as disposed as soon as the action has been taken.
#[derive(Clone)]
pub struct ActionDisposable {
    action: Arc<AtomicCell<Option<Action>>>,
}

impl ActionDisposable {
    /// Create a disposable around an infallible cleanup.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::fallible(move || {
            action();
            Ok(())
        })
    }

    /// Create a disposable around a cleanup that may fail.
    ///
    /// The failure is returned from the `dispose()` call that ran it.
    pub fn fallible<F>(action: F) -> Self
    where
        F: FnOnce() -> Result<(), DisposeError> + Send + 'static,
    {
        Self {
            action: Arc::new(AtomicCell::new(Some(Box::new(action)))),
        }
    }
}

impl Disposable for ActionDisposable {
    fn dispose(&self) -> Result<(), DisposeError> {
        match self.action.swap(None) {
            Some(action) => action(),
            None => Ok(()),
        }
    }

    fn is_disposed(&self) -> bool {
        self.action.with_value(Option::is_none)
    }
}

impl std::fmt::Debug for ActionDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn action_runs_on_dispose() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let disposable = ActionDisposable::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!disposable.is_disposed());
        disposable.dispose().unwrap();

        assert!(disposable.is_disposed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn action_runs_only_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let disposable = ActionDisposable::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        disposable.dispose().unwrap();
        disposable.dispose().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn action_runs_once_under_contention() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let disposable = ActionDisposable::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let disposable = disposable.clone();
                thread::spawn(move || disposable.dispose())
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn action_failure_reported_once() {
        let disposable = ActionDisposable::fallible(|| Err(DisposeError::action("socket busy")));

        assert_eq!(
            disposable.dispose(),
            Err(DisposeError::action("socket busy"))
        );
        // The action is gone, so the second call has nothing to report
        assert_eq!(disposable.dispose(), Ok(()));
        assert!(disposable.is_disposed());
    }
}
