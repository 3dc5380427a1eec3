//! Signal Operators
//!
//! Every stateful per-value operator is built on one primitive,
//! `map_accumulate`, which threads an accumulator through the upstream
//! values and can stop the upstream early.
//!
//! | Operator     | Built from                                        |
//! |--------------|---------------------------------------------------|
//! | `map`        | `map_accumulate` with a unit state                |
//! | `filter`     | `map` to 0- or 1-element signals, then `merge`    |
//! | `scan`       | `map_accumulate` with the running fold as state   |
//! | `reduce`     | `single(seed)` then `scan`, keeping the last value|
//! | `take`       | `map_accumulate` with a counter                   |
//! | `take_last`  | a bounded buffer flushed on completion            |
//! | `take_while` | `map_accumulate` to 0- or 1-element signals, then `merge` |
//!
//! Errors and completion from upstream pass through every operator
//! unchanged.

use std::collections::VecDeque;
use std::sync::Arc;

use super::signal::Signal;
use super::subscriber::Subscriber;
use crate::sync::AtomicCell;

impl<T, E> Signal<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Map over the values, threading an accumulator along the way.
    ///
    /// For each upstream value, `step` receives the current state and the
    /// value, and returns the next state plus the value to emit. The value
    /// is always emitted. Returning `None` as the next state then completes
    /// the result and disposes the upstream subscription.
    ///
    /// The state lives in a cell created per subscription, and each step's
    /// read and write of it happen as one transition.
    pub fn map_accumulate<S, U, F>(&self, initial: S, step: F) -> Signal<U, E>
    where
        S: Clone + Send + Sync + 'static,
        U: Clone + Send + Sync + 'static,
        F: Fn(&S, T) -> (Option<S>, U) + Send + Sync + 'static,
    {
        let source = self.clone();
        let step = Arc::new(step);

        Signal::create(move |subscriber: Subscriber<U, E>| {
            let state = AtomicCell::new(Some(initial.clone()));
            let step = step.clone();

            let downstream = subscriber.clone();
            let on_error = subscriber.clone();
            let on_completed = subscriber.clone();

            let upstream = Subscriber::new(
                move |value: T| {
                    let (_, outcome) = state.modify_with_result(|current| match current {
                        Some(current) => {
                            let (next, output) = step(current, value);
                            let done = next.is_none();
                            (next, Some((output, done)))
                        }
                        // Already stopped; late values are dropped
                        None => (None, None),
                    });

                    if let Some((output, done)) = outcome {
                        downstream.on_next(output);
                        if done {
                            downstream.on_completed();
                        }
                    }
                },
                move |err| on_error.on_error(err),
                move || on_completed.on_completed(),
            );

            source.subscribe_scoped(&subscriber, upstream);
        })
    }

    /// Transform each value with `f`.
    pub fn map<U, F>(&self, f: F) -> Signal<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.map_accumulate((), move |_, value| (Some(()), f(value)))
    }

    /// Keep only the values for which `predicate` holds.
    pub fn filter<P>(&self, predicate: P) -> Signal<T, E>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.map(move |value| {
            if predicate(&value) {
                Signal::single(value)
            } else {
                Signal::empty()
            }
        })
        .merge()
    }

    /// Fold the values, emitting every intermediate result.
    pub fn scan<U, F>(&self, seed: U, f: F) -> Signal<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&U, T) -> U + Send + Sync + 'static,
    {
        self.map_accumulate(seed, move |acc, value| {
            let next = f(acc, value);
            (Some(next.clone()), next)
        })
    }

    /// Fold the values, emitting only the final result once upstream
    /// completes. An empty upstream yields `seed`.
    pub fn reduce<U, F>(&self, seed: U, f: F) -> Signal<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&U, T) -> U + Send + Sync + 'static,
    {
        Signal::single(seed.clone())
            .concat_with(&self.scan(seed, f))
            .take_last(1)
    }

    /// Emit the first `count` values, then complete.
    ///
    /// The upstream subscription is disposed as soon as the last value has
    /// been forwarded.
    pub fn take(&self, count: usize) -> Signal<T, E> {
        if count == 0 {
            return Signal::empty();
        }

        self.map_accumulate(0usize, move |seen, value| {
            let seen = seen + 1;
            let next = (seen < count).then_some(seen);
            (next, value)
        })
    }

    /// Wait for upstream to complete, then emit its last `count` values in
    /// their original order.
    ///
    /// If upstream errors, the buffered values are discarded and the error
    /// is forwarded.
    pub fn take_last(&self, count: usize) -> Signal<T, E> {
        if count == 0 {
            return self.filter(|_| false);
        }

        let source = self.clone();

        Signal::create(move |subscriber: Subscriber<T, E>| {
            let buffer = Arc::new(AtomicCell::new(VecDeque::new()));
            let pending = buffer.clone();

            let on_error = subscriber.clone();
            let on_completed = subscriber.clone();

            let upstream = Subscriber::new(
                move |value: T| {
                    buffer.update(|buffer| {
                        buffer.push_back(value);
                        if buffer.len() > count {
                            buffer.pop_front();
                        }
                    });
                },
                move |err| on_error.on_error(err),
                move || {
                    for value in pending.swap(VecDeque::new()) {
                        on_completed.on_next(value);
                    }
                    on_completed.on_completed();
                },
            );

            source.subscribe_scoped(&subscriber, upstream);
        })
    }

    /// Emit values while `predicate` holds. The first value that fails it
    /// is dropped and the result completes.
    pub fn take_while<P>(&self, predicate: P) -> Signal<T, E>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.map_accumulate((), move |_, value| {
            if predicate(&value) {
                (Some(()), Signal::single(value))
            } else {
                (None, Signal::empty())
            }
        })
        .merge()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
