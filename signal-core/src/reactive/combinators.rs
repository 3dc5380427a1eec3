//! Flattening Combinators
//!
//! `merge` and `concat` turn a signal of signals into a signal of values.
//!
//! # Merge
//!
//! Every inner signal is subscribed as soon as it arrives and its values are
//! forwarded as they come. An in-flight counter starts at 1 for the outer
//! signal and goes up by one per inner signal. Each completion (outer or
//! inner) decrements it, and the transition to zero completes the result.
//! Each inner subscription sits in its own `SerialDisposable` inside a
//! composite, which is pruned as inner signals finish.
//!
//! # Concat
//!
//! Inner signals are subscribed one at a time, in arrival order. Arrivals
//! while one is active wait in a FIFO queue. The result completes once the
//! outer signal has completed, the queue is empty and no inner signal is
//! active.
//!
//! Advancing the queue is a loop, not a recursion: an inner signal that
//! completes while it is being subscribed only marks itself finished, and
//! the loop that subscribed it moves on to the next one. A long run of
//! synchronous inner signals therefore uses constant stack.
//!
//! # Errors
//!
//! The first error from the outer signal or any inner signal terminates the
//! result. Terminating disposes the downstream scope, which holds every
//! in-flight inner subscription, so sibling inner signals are cancelled
//! rather than left running with their output suppressed.

use std::collections::VecDeque;
use std::sync::Arc;

use super::signal::Signal;
use super::subscriber::Subscriber;
use crate::disposable::{CompositeDisposable, Disposable, SerialDisposable};
use crate::sync::AtomicCell;

impl<T, E> Signal<Signal<T, E>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Flatten by subscribing to every inner signal as it arrives.
    ///
    /// Values are forwarded in the order the inner signals produce them.
    /// The result completes once the outer signal and every inner signal
    /// have completed.
    pub fn merge(&self) -> Signal<T, E> {
        let source = self.clone();

        Signal::create(move |subscriber: Subscriber<T, E>| {
            let inners = CompositeDisposable::new();
            let _ = subscriber.disposable().add(inners.clone());

            let in_flight = Arc::new(AtomicCell::new(1usize));
            let decrement: Arc<dyn Fn() + Send + Sync> = {
                let subscriber = subscriber.clone();
                let in_flight = in_flight.clone();
                Arc::new(move || {
                    let previous = in_flight.modify(|n| n - 1);
                    tracing::trace!(in_flight = previous - 1, "merge producer finished");
                    if previous == 1 {
                        subscriber.on_completed();
                    }
                })
            };

            let on_inner = {
                let subscriber = subscriber.clone();
                let decrement = decrement.clone();
                move |inner: Signal<T, E>| {
                    let previous = in_flight.modify(|n| n + 1);
                    tracing::trace!(in_flight = previous + 1, "merge producer started");

                    let slot = SerialDisposable::new();
                    let _ = inners.add(slot.clone());

                    let forward = subscriber.clone();
                    let fail = subscriber.clone();
                    let (fail_slot, done_slot) = (slot.clone(), slot.clone());
                    let (fail_inners, done_inners) = (inners.clone(), inners.clone());
                    let done = decrement.clone();

                    let inner_subscriber = Subscriber::new(
                        move |value| forward.on_next(value),
                        move |err| {
                            let _ = fail_slot.dispose();
                            fail_inners.prune_disposed();
                            fail.on_error(err);
                        },
                        move || {
                            let _ = done_slot.dispose();
                            done_inners.prune_disposed();
                            done();
                        },
                    );

                    let _ = slot.set_inner(Some(Arc::new(inner_subscriber.disposable().clone())));
                    if !inner_subscriber.is_disposed() {
                        inner.subscribe(inner_subscriber);
                    }
                }
            };

            let on_error = subscriber.clone();
            let outer = Subscriber::new(
                on_inner,
                move |err| on_error.on_error(err),
                move || decrement(),
            );

            source.subscribe_scoped(&subscriber, outer);
        })
    }

    /// Flatten by subscribing to inner signals one at a time, in arrival
    /// order, never overlapping.
    ///
    /// The queue of waiting inner signals has no capacity limit. Memory
    /// grows with the number of inner signals the outer signal emits while
    /// an earlier one is still running.
    pub fn concat(&self) -> Signal<T, E> {
        let source = self.clone();

        Signal::create(move |subscriber: Subscriber<T, E>| {
            let driver = Arc::new(ConcatDriver {
                state: AtomicCell::new(ConcatState {
                    pending: VecDeque::new(),
                    active: false,
                    outer_done: false,
                    draining: false,
                }),
                inners: CompositeDisposable::new(),
                subscriber: subscriber.clone(),
            });
            let _ = subscriber.disposable().add(driver.inners.clone());

            let (arrived, finished) = (driver.clone(), driver.clone());
            let on_error = subscriber.clone();
            let outer = Subscriber::new(
                move |inner: Signal<T, E>| arrived.enqueue(inner),
                move |err| on_error.on_error(err),
                move || finished.outer_completed(),
            );

            source.subscribe_scoped(&subscriber, outer);
        })
    }
}

impl<T, E> Signal<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Emit every value of `self`, then every value of `other`.
    pub fn concat_with(&self, other: &Signal<T, E>) -> Signal<T, E> {
        Signal::from_values([self.clone(), other.clone()]).concat()
    }
}

struct ConcatState<T, E> {
    /// Inner signals waiting for the active one to finish.
    pending: VecDeque<Signal<T, E>>,

    /// Whether an inner signal is currently subscribed and unfinished.
    active: bool,

    /// Whether the outer signal has completed.
    outer_done: bool,

    /// Whether some caller is running the drain loop. Completions that
    /// arrive while it runs only clear `active` and leave the next step to
    /// that loop, so synchronous inner signals never nest on the stack.
    draining: bool,
}

/// What the drain loop does next. Computed under the state cell's lock,
/// carried out after releasing it.
enum ConcatStep<T, E> {
    Subscribe(Signal<T, E>),
    Complete,
    Stop,
}

struct ConcatDriver<T, E> {
    state: AtomicCell<ConcatState<T, E>>,
    inners: CompositeDisposable,
    subscriber: Subscriber<T, E>,
}

impl<T, E> ConcatDriver<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn enqueue(self: &Arc<Self>, inner: Signal<T, E>) {
        let drive = self.state.update(|state| {
            state.pending.push_back(inner);
            tracing::trace!(pending = state.pending.len(), "concat queued inner signal");
            Self::claim(state)
        });
        if drive {
            self.drain();
        }
    }

    fn inner_completed(self: &Arc<Self>) {
        self.inners.prune_disposed();

        let drive = self.state.update(|state| {
            state.active = false;
            Self::claim(state)
        });
        if drive {
            self.drain();
        }
    }

    fn outer_completed(self: &Arc<Self>) {
        let drive = self.state.update(|state| {
            state.outer_done = true;
            Self::claim(state)
        });
        if drive {
            self.drain();
        }
    }

    /// Take over the drain loop unless it is running or an inner signal is
    /// still active.
    fn claim(state: &mut ConcatState<T, E>) -> bool {
        if state.draining || state.active {
            return false;
        }
        state.draining = true;
        true
    }

    /// Subscribe queued inner signals one after another until one stays
    /// pending, the queue runs dry, or the result completes.
    fn drain(self: &Arc<Self>) {
        loop {
            let terminated = self.subscriber.is_disposed();
            let step = self.state.update(|state| {
                if terminated || state.active {
                    state.draining = false;
                    return ConcatStep::Stop;
                }
                match state.pending.pop_front() {
                    Some(next) => {
                        state.active = true;
                        ConcatStep::Subscribe(next)
                    }
                    None => {
                        state.draining = false;
                        if state.outer_done {
                            ConcatStep::Complete
                        } else {
                            ConcatStep::Stop
                        }
                    }
                }
            });

            match step {
                ConcatStep::Subscribe(inner) => self.subscribe_inner(inner),
                ConcatStep::Complete => {
                    self.subscriber.on_completed();
                    return;
                }
                ConcatStep::Stop => return,
            }
        }
    }

    fn subscribe_inner(self: &Arc<Self>, inner: Signal<T, E>) {
        let forward = self.subscriber.clone();
        let fail = self.subscriber.clone();
        let driver = Arc::clone(self);

        let inner_subscriber = Subscriber::new(
            move |value| forward.on_next(value),
            move |err| fail.on_error(err),
            move || driver.inner_completed(),
        );

        let _ = self.inners.add(inner_subscriber.disposable().clone());
        if !inner_subscriber.is_disposed() {
            inner.subscribe(inner_subscriber);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
