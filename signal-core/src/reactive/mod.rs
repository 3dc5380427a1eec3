//! Reactive Signals
//!
//! This module implements push-based signals: reusable recipes that deliver
//! a sequence of values to a subscriber, followed by at most one terminal
//! event (error or completion).
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal stores a production routine. Every subscription runs the routine
//! afresh, so one signal can feed any number of independent subscribers.
//! Nothing happens until someone subscribes.
//!
//! ## Subscribers
//!
//! A Subscriber wraps the three callbacks and enforces the event contract:
//! events are serialized, nothing follows a terminal event, and the
//! subscriber's scope is disposed as soon as it terminates. The scope is a
//! `CompositeDisposable` that producers and operators hang their cleanups on.
//!
//! ## Operators
//!
//! Operators (`map`, `filter`, `scan`, `take`, `merge`, `concat`, ...) build
//! new signals from existing ones. Each operator subscribes upstream on
//! behalf of its downstream subscriber and registers that upstream
//! subscription in the downstream scope, so disposing the final subscription
//! tears down the whole chain.
//!
//! # Implementation Notes
//!
//! Most single-input operators are expressed through `map_accumulate`, a
//! stateful map that can also end the sequence early. The flattening
//! combinators (`merge`, `concat`) are built separately because they track
//! several upstream subscriptions at once.

mod combinators;
mod operators;
mod signal;
mod stream;
mod subscriber;

pub use signal::Signal;
pub use stream::SignalStream;
pub use subscriber::{Subscriber, SubscriberBuilder};
