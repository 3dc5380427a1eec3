//! Signal Implementation
//!
//! A Signal is a reusable recipe for producing events. It stores a single
//! production routine, and every call to `subscribe` runs that routine
//! against a fresh `Subscriber`.
//!
//! # How Signals Work
//!
//! 1. Creating a signal does nothing but store the routine.
//!
//! 2. Subscribing runs the routine with the subscriber. The routine may
//!    deliver events synchronously, or hand the subscriber to another thread
//!    and return immediately.
//!
//! 3. The caller gets back the subscriber's `CompositeDisposable`. Disposing
//!    it stops delivery and releases everything the subscription owns.
//!
//! Because a signal holds no per-subscription state, subscribing twice
//! produces two independent event sequences with two independent disposal
//! chains. Operators follow the same rule: any state they need (counters,
//! buffers, accumulators) is created inside the routine, once per
//! subscription.
//!
//! # Thread Safety
//!
//! Signals are `Send + Sync` and cheap to clone; the routine sits behind an
//! `Arc`.

use std::fmt;
use std::sync::Arc;

use super::subscriber::Subscriber;
use crate::disposable::CompositeDisposable;
use crate::error::SignalError;

/// A reusable, push-based event sequence.
///
/// # Type Parameters
///
/// - `T`: The value type. Must be Clone + Send + Sync.
/// - `E`: The stream error type. Defaults to `SignalError`.
///
/// # Example
///
/// ```rust
/// use signal_core::reactive::Signal;
///
/// let doubled = Signal::<i32>::from_values(vec![1, 2, 3]).map(|v| v * 2);
///
/// doubled.subscribe_next(|v| println!("{v}"));
/// ```
pub struct Signal<T, E = SignalError> {
    /// The production routine, run once per subscription.
    produce: Arc<dyn Fn(Subscriber<T, E>) + Send + Sync>,
}

impl<T, E> Signal<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a signal from a production routine.
    ///
    /// The routine runs once for each subscription.
    pub fn create<F>(produce: F) -> Self
    where
        F: Fn(Subscriber<T, E>) + Send + Sync + 'static,
    {
        Self {
            produce: Arc::new(produce),
        }
    }

    /// A signal that completes immediately.
    pub fn empty() -> Self {
        Self::create(|subscriber| subscriber.on_completed())
    }

    /// A signal that emits `value` and then completes.
    pub fn single(value: T) -> Self {
        Self::create(move |subscriber| {
            subscriber.on_next(value.clone());
            subscriber.on_completed();
        })
    }

    /// A signal that emits `error` and nothing else.
    pub fn error(error: E) -> Self {
        Self::create(move |subscriber| subscriber.on_error(error.clone()))
    }

    /// A signal that never emits anything.
    pub fn never() -> Self {
        Self::create(|_| {})
    }

    /// A signal that emits each element of `values` in order, then
    /// completes.
    ///
    /// Emission stops early if the subscription is disposed part way
    /// through.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let values: Arc<[T]> = values.into_iter().collect();

        Self::create(move |subscriber| {
            for value in values.iter() {
                if subscriber.is_disposed() {
                    return;
                }
                subscriber.on_next(value.clone());
            }
            subscriber.on_completed();
        })
    }

    /// Start producing events for `subscriber`.
    ///
    /// Returns the subscriber's disposable. Disposing it cancels the
    /// subscription; production that is already running may finish its
    /// current step, but nothing further is delivered.
    pub fn subscribe(&self, subscriber: Subscriber<T, E>) -> CompositeDisposable {
        let disposable = subscriber.disposable().clone();
        (self.produce)(subscriber);
        disposable
    }

    /// Subscribe with all three callbacks.
    pub fn subscribe_fn<N, Er, C>(&self, next: N, error: Er, completed: C) -> CompositeDisposable
    where
        N: Fn(T) + Send + Sync + 'static,
        Er: FnOnce(E) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.subscribe(Subscriber::new(next, error, completed))
    }

    /// Subscribe to values only, ignoring the terminal event.
    pub fn subscribe_next<N>(&self, next: N) -> CompositeDisposable
    where
        N: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(Subscriber::builder().on_next(next).build())
    }

    /// Subscribe `observer` on behalf of `parent`.
    ///
    /// The observer's scope is registered with the parent before any event
    /// can flow, so a parent that terminates during synchronous production
    /// tears the upstream subscription down straight away.
    pub(crate) fn subscribe_scoped<U>(&self, parent: &Subscriber<U, E>, observer: Subscriber<T, E>)
    where
        U: Send + 'static,
    {
        let _ = parent.disposable().add(observer.disposable().clone());
        if observer.is_disposed() {
            return;
        }
        self.subscribe(observer);
    }
}

impl<T, E> Clone for Signal<T, E> {
    fn clone(&self) -> Self {
        Self {
            produce: Arc::clone(&self.produce),
        }
    }
}

impl<T, E> fmt::Debug for Signal<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal").finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
