//! Composite Disposable
//!
//! A composite owns a dynamic set of child disposables and releases all of
//! them when it is disposed. It is the backbone of subscription teardown:
//! each subscriber owns one, producers add their cleanups to it, and
//! operators add the subscriptions they open upstream.
//!
//! # State
//!
//! The cell holds `Some(children)` while live and `None` once disposed. The
//! `None` marker is what makes late additions safe: `add` inspects and
//! updates the state in one step, so a child is either stored in a live
//! composite or handed back to be disposed immediately. It can never be
//! stored in a composite that has already run its teardown.

use std::sync::Arc;
use std::time::Duration;

use smallvec::SmallVec;

use super::{ActionDisposable, Disposable, DisposableRef};
use crate::error::DisposeError;
use crate::sync::AtomicCell;

/// Most composites own a handful of children (a subscriber's own cleanup
/// plus one or two upstream subscriptions).
type Children = SmallVec<[DisposableRef; 4]>;

/// A disposable that disposes any number of children together.
#[derive(Clone)]
pub struct CompositeDisposable {
    children: Arc<AtomicCell<Option<Children>>>,
}

impl CompositeDisposable {
    /// Create an empty, live composite.
    pub fn new() -> Self {
        Self {
            children: Arc::new(AtomicCell::new(Some(SmallVec::new()))),
        }
    }

    /// Create a live composite whose first child runs `action`.
    pub fn with_action<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut children = Children::new();
        children.push(Arc::new(ActionDisposable::new(action)));

        Self {
            children: Arc::new(AtomicCell::new(Some(children))),
        }
    }

    /// Add a child.
    ///
    /// If this composite is already disposed the child is disposed right
    /// away instead of being stored, and any error from that disposal is
    /// returned.
    pub fn add<D>(&self, child: D) -> Result<(), DisposeError>
    where
        D: Disposable + 'static,
    {
        self.add_shared(Arc::new(child))
    }

    /// Add a child that is already shared.
    pub fn add_shared(&self, child: DisposableRef) -> Result<(), DisposeError> {
        let rejected = self.children.update(move |children| match children {
            Some(children) => {
                children.push(child);
                None
            }
            None => Some(child),
        });

        match rejected {
            Some(child) => child.dispose(),
            None => Ok(()),
        }
    }

    /// Add a child if there is one. `None` is a no-op.
    pub fn add_optional<D>(&self, child: Option<D>) -> Result<(), DisposeError>
    where
        D: Disposable + 'static,
    {
        match child {
            Some(child) => self.add(child),
            None => Ok(()),
        }
    }

    /// Add a cleanup action as a child.
    pub fn add_action<F>(&self, action: F) -> Result<(), DisposeError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.add(ActionDisposable::new(action))
    }

    /// Drop children that are already disposed, without touching the rest.
    ///
    /// Long-lived merges call this as inner signals finish so the child list
    /// tracks only live work.
    pub fn prune_disposed(&self) {
        self.children.update(|children| {
            if let Some(children) = children {
                children.retain(|child| !child.is_disposed());
            }
        });
    }

    /// Number of children currently tracked. Zero once disposed.
    pub fn len(&self) -> usize {
        self.children
            .with_value(|children| children.as_ref().map_or(0, |c| c.len()))
    }

    /// Whether no children are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until disposed or until `timeout` elapses.
    ///
    /// Each waiter has its own deadline. Returns whether the composite was
    /// disposed.
    pub fn wait_disposed(&self, timeout: Duration) -> bool {
        self.children.wait_until(Option::is_none, timeout)
    }
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) -> Result<(), DisposeError> {
        let Some(children) = self.children.swap(None) else {
            return Ok(());
        };

        // Every child is disposed even if an earlier one fails
        let mut errors = Vec::new();
        for child in children {
            if let Err(err) = child.dispose() {
                tracing::warn!(error = %err, "composite child failed to dispose");
                errors.push(err);
            }
        }

        DisposeError::collect(errors)
    }

    fn is_disposed(&self) -> bool {
        self.children.with_value(Option::is_none)
    }
}

impl std::fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeDisposable")
            .field("children", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::SimpleDisposable;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn counting_action(counter: &Arc<AtomicUsize>) -> ActionDisposable {
        let counter = counter.clone();
        ActionDisposable::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn composite_disposes_all_children() {
        let composite = CompositeDisposable::new();
        let a = SimpleDisposable::new();
        let b = SimpleDisposable::new();

        composite.add(a.clone()).unwrap();
        composite.add(b.clone()).unwrap();
        assert_eq!(composite.len(), 2);

        composite.dispose().unwrap();

        assert!(composite.is_disposed());
        assert!(a.is_disposed());
        assert!(b.is_disposed());
        assert!(composite.is_empty());
    }

    #[test]
    fn composite_disposes_children_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let composite = CompositeDisposable::new();

        for i in 0..3 {
            let order = order.clone();
            composite.add_action(move || order.lock().push(i)).unwrap();
        }

        composite.dispose().unwrap();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn composite_runs_seed_action_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let composite = CompositeDisposable::with_action(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        composite.dispose().unwrap();
        composite.dispose().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn composite_add_after_dispose_disposes_child() {
        let composite = CompositeDisposable::new();
        composite.dispose().unwrap();

        let child = SimpleDisposable::new();
        composite.add(child.clone()).unwrap();

        assert!(child.is_disposed());
        assert_eq!(composite.len(), 0);
    }

    #[test]
    fn composite_add_after_dispose_reports_child_error() {
        let composite = CompositeDisposable::new();
        composite.dispose().unwrap();

        let result = composite.add(ActionDisposable::fallible(|| {
            Err(DisposeError::action("late"))
        }));

        assert_eq!(result, Err(DisposeError::action("late")));
    }

    #[test]
    fn composite_add_optional_none_is_noop() {
        let composite = CompositeDisposable::new();
        composite.add_optional(None::<SimpleDisposable>).unwrap();
        assert!(composite.is_empty());

        composite.add_optional(Some(SimpleDisposable::new())).unwrap();
        assert_eq!(composite.len(), 1);
    }

    #[test]
    fn composite_failure_does_not_block_siblings() {
        let calls = Arc::new(AtomicUsize::new(0));
        let composite = CompositeDisposable::new();

        composite.add(counting_action(&calls)).unwrap();
        composite
            .add(ActionDisposable::fallible(|| Err(DisposeError::action("first"))))
            .unwrap();
        composite.add(counting_action(&calls)).unwrap();
        composite
            .add(ActionDisposable::fallible(|| Err(DisposeError::action("second"))))
            .unwrap();

        let result = composite.dispose();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            result,
            Err(DisposeError::Multiple(vec![
                DisposeError::action("first"),
                DisposeError::action("second"),
            ]))
        );
    }

    #[test]
    fn composite_prune_removes_only_disposed() {
        let composite = CompositeDisposable::new();
        let live = SimpleDisposable::new();
        let dead = SimpleDisposable::new();

        composite.add(live.clone()).unwrap();
        composite.add(dead.clone()).unwrap();
        dead.dispose().unwrap();

        composite.prune_disposed();

        assert_eq!(composite.len(), 1);
        assert!(!live.is_disposed());
        assert!(!composite.is_disposed());
    }

    #[test]
    fn composite_prune_after_dispose_is_noop() {
        let composite = CompositeDisposable::new();
        composite.dispose().unwrap();
        composite.prune_disposed();
        assert!(composite.is_disposed());
    }

    #[test]
    fn composite_concurrent_add_and_dispose_loses_nothing() {
        // Every child must end up disposed, whether it was stored before the
        // teardown or rejected after it.
        for _ in 0..50 {
            let composite = CompositeDisposable::new();
            let children: Vec<_> = (0..16).map(|_| SimpleDisposable::new()).collect();

            let adders: Vec<_> = children
                .chunks(4)
                .map(|chunk| {
                    let composite = composite.clone();
                    let chunk = chunk.to_vec();
                    thread::spawn(move || {
                        for child in chunk {
                            composite.add(child).unwrap();
                        }
                    })
                })
                .collect();

            composite.dispose().unwrap();

            for adder in adders {
                adder.join().unwrap();
            }

            assert!(children.iter().all(|c| c.is_disposed()));
        }
    }

    #[test]
    fn composite_wait_disposed_times_out_while_live() {
        let composite = CompositeDisposable::new();
        assert!(!composite.wait_disposed(Duration::from_millis(10)));

        composite.dispose().unwrap();
        assert!(composite.wait_disposed(Duration::from_millis(10)));
    }
}
