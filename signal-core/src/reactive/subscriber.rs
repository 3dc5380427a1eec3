//! Subscriber Implementation
//!
//! A Subscriber is the per-subscription event sink. It wraps up to three
//! callbacks and owns the `CompositeDisposable` that scopes everything the
//! subscription started.
//!
//! # Lifecycle
//!
//! 1. Producers call `on_next` any number of times.
//!
//! 2. At most one terminal event (`on_error` or `on_completed`) is
//!    delivered. The callbacks are taken out of the subscriber before the
//!    terminal callback runs, so nothing reaches the consumer afterwards.
//!
//! 3. The composite is disposed, which releases every resource registered
//!    with it: upstream subscriptions, producer cleanups, nested operator
//!    state.
//!
//! Disposing the composite from outside (cancellation) clears the callbacks
//! as part of the teardown. Production code that is already running keeps
//! running, but once `dispose()` returns no new event is delivered.
//!
//! # Thread Safety
//!
//! Producers may call into one subscriber from several threads (a merge of
//! producers running on different threads, for instance). Delivery goes
//! through a reentrant gate, so calls from different threads are strictly
//! serialized while a callback that synchronously feeds the same subscriber
//! again on its own thread does not deadlock.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;

use crate::disposable::{CompositeDisposable, Disposable};
use crate::sync::AtomicCell;

type NextFn<T> = Arc<dyn Fn(T) + Send + Sync>;
type ErrorFn<E> = Box<dyn FnOnce(E) + Send>;
type CompletedFn = Box<dyn FnOnce() + Send>;

/// The consumer's callbacks. Any of them may be absent.
struct Callbacks<T, E> {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn<E>>,
    completed: Option<CompletedFn>,
}

struct Inner<T, E> {
    /// Serializes delivery across threads.
    gate: ReentrantMutex<()>,

    /// `None` once the subscriber has terminated or been disposed.
    callbacks: AtomicCell<Option<Callbacks<T, E>>>,

    /// Scope of everything this subscription owns.
    disposable: CompositeDisposable,
}

/// A per-subscription event sink.
///
/// Cloning a subscriber yields another handle to the same sink, which is how
/// a producer moves it onto another thread.
///
/// # Example
///
/// ```rust
/// use signal_core::reactive::Subscriber;
/// use signal_core::SignalError;
///
/// let subscriber = Subscriber::<i32, SignalError>::builder()
///     .on_next(|v| println!("got {v}"))
///     .on_completed(|| println!("done"))
///     .build();
///
/// subscriber.on_next(1);
/// subscriber.on_completed();
/// assert!(subscriber.is_disposed());
/// ```
pub struct Subscriber<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Subscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a subscriber from its three callbacks.
    pub fn new<N, Er, C>(next: N, error: Er, completed: C) -> Self
    where
        N: Fn(T) + Send + Sync + 'static,
        Er: FnOnce(E) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self::from_callbacks(Callbacks {
            next: Some(Arc::new(next)),
            error: Some(Box::new(error)),
            completed: Some(Box::new(completed)),
        })
    }

    /// Start building a subscriber with optional callbacks.
    pub fn builder() -> SubscriberBuilder<T, E> {
        SubscriberBuilder {
            callbacks: Callbacks {
                next: None,
                error: None,
                completed: None,
            },
        }
    }

    fn from_callbacks(callbacks: Callbacks<T, E>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner<T, E>>| {
            // Clearing the callbacks on teardown breaks any reference cycle
            // through state captured by the consumer.
            let weak = weak.clone();
            let disposable = CompositeDisposable::with_action(move || {
                if let Some(inner) = weak.upgrade() {
                    drop(inner.callbacks.swap(None));
                }
            });

            Inner {
                gate: ReentrantMutex::new(()),
                callbacks: AtomicCell::new(Some(callbacks)),
                disposable,
            }
        });

        Self { inner }
    }

    /// Deliver a value.
    ///
    /// A no-op once the subscriber has terminated or been disposed.
    pub fn on_next(&self, value: T) {
        let _gate = self.inner.gate.lock();
        if self.inner.disposable.is_disposed() {
            return;
        }

        let next = self
            .inner
            .callbacks
            .with_value(|callbacks| callbacks.as_ref().and_then(|c| c.next.clone()));

        if let Some(next) = next {
            next(value);
        }
    }

    /// Deliver an error, then dispose.
    pub fn on_error(&self, error: E) {
        let _gate = self.inner.gate.lock();

        if let Some(callbacks) = self.inner.callbacks.swap(None) {
            tracing::trace!("subscriber terminated with error");
            if let Some(on_error) = callbacks.error {
                on_error(error);
            }
        }

        self.dispose_scope();
    }

    /// Deliver completion, then dispose.
    pub fn on_completed(&self) {
        let _gate = self.inner.gate.lock();

        if let Some(callbacks) = self.inner.callbacks.swap(None) {
            tracing::trace!("subscriber completed");
            if let Some(on_completed) = callbacks.completed {
                on_completed();
            }
        }

        self.dispose_scope();
    }

    /// The composite that scopes this subscription.
    ///
    /// Producers register their cleanups here, and operators register the
    /// subscriptions they open upstream.
    pub fn disposable(&self) -> &CompositeDisposable {
        &self.inner.disposable
    }

    /// Whether the subscription has terminated or been cancelled.
    ///
    /// Long-running producers poll this to stop early.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposable.is_disposed()
    }

    fn dispose_scope(&self) {
        // Teardown failures belong to whoever owns the failing resource;
        // the composite already logged them.
        let _ = self.inner.disposable.dispose();
    }
}

impl<T, E> Clone for Subscriber<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Subscriber<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("disposed", &self.inner.disposable.is_disposed())
            .finish()
    }
}

/// Builder for a `Subscriber` whose callbacks are all optional.
pub struct SubscriberBuilder<T, E> {
    callbacks: Callbacks<T, E>,
}

impl<T, E> SubscriberBuilder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Set the value callback.
    pub fn on_next<F>(mut self, f: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.callbacks.next = Some(Arc::new(f));
        self
    }

    /// Set the error callback.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(E) + Send + 'static,
    {
        self.callbacks.error = Some(Box::new(f));
        self
    }

    /// Set the completion callback.
    pub fn on_completed<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.callbacks.completed = Some(Box::new(f));
        self
    }

    /// Build the subscriber.
    pub fn build(self) -> Subscriber<T, E> {
        Subscriber::from_callbacks(self.callbacks)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::SimpleDisposable;
    use crate::error::SignalError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn recording() -> (Arc<Mutex<Vec<i32>>>, Subscriber<i32, SignalError>) {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = values.clone();
        let subscriber = Subscriber::builder()
            .on_next(move |v| sink.lock().push(v))
            .build();
        (values, subscriber)
    }

    #[test]
    fn subscriber_calls_next() {
        let (values, subscriber) = recording();

        subscriber.on_next(2);
        subscriber.on_next(3);

        assert_eq!(*values.lock(), vec![2, 3]);
        assert!(!subscriber.is_disposed());
    }

    #[test]
    fn subscriber_calls_error_and_disposes() {
        let received = Arc::new(Mutex::new(None));
        let received_clone = received.clone();

        let subscriber = Subscriber::<i32, SignalError>::builder()
            .on_error(move |err| *received_clone.lock() = Some(err.to_string()))
            .build();

        subscriber.on_error(SignalError::msg("broken pipe"));

        assert_eq!(received.lock().as_deref(), Some("broken pipe"));
        assert!(subscriber.is_disposed());
    }

    #[test]
    fn subscriber_calls_completed_and_disposes() {
        let completed = Arc::new(AtomicBool::new(false));
        let completed_clone = completed.clone();

        let subscriber = Subscriber::<i32, SignalError>::builder()
            .on_completed(move || completed_clone.store(true, Ordering::SeqCst))
            .build();

        subscriber.on_completed();

        assert!(completed.load(Ordering::SeqCst));
        assert!(subscriber.disposable().wait_disposed(Duration::from_millis(10)));
    }

    #[test]
    fn subscriber_ignores_events_after_completion() {
        let (values, subscriber) = recording();

        subscriber.on_next(1);
        subscriber.on_completed();
        subscriber.on_next(2);

        assert_eq!(*values.lock(), vec![1]);
    }

    #[test]
    fn subscriber_terminates_only_once() {
        let terminal = Arc::new(AtomicUsize::new(0));
        let on_error = terminal.clone();
        let on_completed = terminal.clone();

        let subscriber = Subscriber::<i32, SignalError>::new(
            |_| {},
            move |_| {
                on_error.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                on_completed.fetch_add(1, Ordering::SeqCst);
            },
        );

        subscriber.on_completed();
        subscriber.on_error(SignalError::msg("late"));
        subscriber.on_completed();

        assert_eq!(terminal.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_external_dispose_stops_delivery() {
        let (values, subscriber) = recording();

        subscriber.on_next(1);
        subscriber.disposable().dispose().unwrap();
        subscriber.on_next(2);

        assert_eq!(*values.lock(), vec![1]);
    }

    #[test]
    fn subscriber_termination_disposes_registered_resources() {
        let subscriber = Subscriber::<i32, SignalError>::builder().build();
        let resource = SimpleDisposable::new();
        subscriber.disposable().add(resource.clone()).unwrap();

        subscriber.on_completed();

        assert!(resource.is_disposed());
    }

    #[test]
    fn subscriber_termination_releases_captured_state() {
        let state = Arc::new(());
        let captured = state.clone();

        let subscriber = Subscriber::<i32, SignalError>::builder()
            .on_next(move |_| {
                let _held = Arc::clone(&captured);
            })
            .build();

        assert_eq!(Arc::strong_count(&state), 2);
        subscriber.on_completed();
        assert_eq!(Arc::strong_count(&state), 1);
    }

    #[test]
    fn subscriber_allows_reentrant_delivery() {
        let values = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<Subscriber<i32, SignalError>>>> = Arc::new(Mutex::new(None));

        let sink = values.clone();
        let slot_clone = slot.clone();
        let subscriber = Subscriber::builder()
            .on_next(move |v: i32| {
                sink.lock().push(v);
                if v == 1 {
                    let me = slot_clone.lock().clone();
                    if let Some(me) = me {
                        me.on_next(2);
                    }
                }
            })
            .build();
        *slot.lock() = Some(subscriber.clone());

        subscriber.on_next(1);

        assert_eq!(*values.lock(), vec![1, 2]);
        subscriber.on_completed();
        slot.lock().take();
    }

    #[test]
    fn subscriber_serializes_concurrent_producers() {
        let active = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicUsize::new(0));

        let (a, o, c) = (active.clone(), overlap.clone(), count.clone());
        let subscriber = Subscriber::<i32, SignalError>::builder()
            .on_next(move |_| {
                if a.fetch_add(1, Ordering::SeqCst) != 0 {
                    o.store(true, Ordering::SeqCst);
                }
                thread::yield_now();
                c.fetch_add(1, Ordering::SeqCst);
                a.fetch_sub(1, Ordering::SeqCst);
            })
            .build();

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let subscriber = subscriber.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        subscriber.on_next(i);
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        assert!(!overlap.load(Ordering::SeqCst));
        assert_eq!(count.load(Ordering::SeqCst), 1_000);
    }
}
