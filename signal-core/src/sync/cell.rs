//! Atomic Cell Implementation
//!
//! An `AtomicCell` is a mutable slot whose reads, writes, and
//! read-modify-write operations are each indivisible with respect to every
//! other operation on the same cell.
//!
//! # Thread Safety
//!
//! The value is guarded by a `parking_lot::Mutex`. Critical sections are
//! bounded by the closure the caller passes in, so no operation blocks
//! indefinitely unless that closure does.
//!
//! Writers also signal a condition variable, which lets a thread wait (with
//! a timeout) for the value to satisfy a predicate. Each waiter has its own
//! deadline, so an abandoned waiter never holds up writers or other waiters.

use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A thread-safe mutable slot with linearizable operations.
///
/// # Example
///
/// ```rust
/// use signal_core::sync::AtomicCell;
///
/// let cell = AtomicCell::new(1);
/// let previous = cell.modify(|v| v + 1);
///
/// assert_eq!(previous, 1);
/// assert_eq!(cell.get(), 2);
/// ```
pub struct AtomicCell<V> {
    /// The current value.
    value: Mutex<V>,

    /// Signalled after every write.
    changed: Condvar,
}

impl<V> AtomicCell<V> {
    /// Create a new cell holding `value`.
    pub fn new(value: V) -> Self {
        Self {
            value: Mutex::new(value),
            changed: Condvar::new(),
        }
    }

    /// Get a copy of the current value.
    pub fn get(&self) -> V
    where
        V: Clone,
    {
        self.value.lock().clone()
    }

    /// Replace the current value.
    ///
    /// The previous value is dropped after the lock is released.
    pub fn set(&self, value: V) {
        drop(self.swap(value));
    }

    /// Replace the current value, returning the previous one.
    pub fn swap(&self, value: V) -> V {
        self.modify(move |_| value)
    }

    /// Apply `f` to the current value and store the result.
    ///
    /// Returns the previous value.
    pub fn modify<F>(&self, f: F) -> V
    where
        F: FnOnce(&V) -> V,
    {
        self.modify_with_result(|current| (f(current), ())).0
    }

    /// Apply `f` to the current value, store the first element of its
    /// result, and hand the second element back to the caller.
    ///
    /// Returns the previous value plus the caller-defined data. This is how
    /// operators make a decision and the matching state transition in one
    /// step.
    pub fn modify_with_result<R, F>(&self, f: F) -> (V, R)
    where
        F: FnOnce(&V) -> (V, R),
    {
        let mut guard = self.value.lock();
        let (next, result) = f(&*guard);
        let previous = std::mem::replace(&mut *guard, next);
        drop(guard);

        self.changed.notify_all();
        (previous, result)
    }

    /// Mutate the value in place.
    pub fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let result = f(&mut *self.value.lock());
        self.changed.notify_all();
        result
    }

    /// Run a read-only action with exclusive access to the value.
    pub fn with_value<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&V) -> R,
    {
        f(&*self.value.lock())
    }

    /// Block until `ready` holds for the value, or until `timeout` elapses.
    ///
    /// Returns whether `ready` held when the wait ended.
    pub fn wait_until<F>(&self, mut ready: F, timeout: Duration) -> bool
    where
        F: FnMut(&V) -> bool,
    {
        let mut guard = self.value.lock();
        self.changed
            .wait_while_for(&mut guard, |value| !ready(value), timeout);
        ready(&*guard)
    }

    /// Consume the cell, returning the value.
    pub fn into_inner(self) -> V {
        self.value.into_inner()
    }
}

impl<V: Default> Default for AtomicCell<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: fmt::Debug> fmt::Debug for AtomicCell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.try_lock() {
            Some(value) => f.debug_struct("AtomicCell").field("value", &*value).finish(),
            None => f.debug_struct("AtomicCell").field("value", &"<locked>").finish(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
