//! Signal Core
//!
//! This crate provides push-based reactive signals with deterministic
//! resource disposal. It implements:
//!
//! - A linearizable shared cell (`AtomicCell`)
//! - Composable disposables (simple, action, composite, serial)
//! - Signals, subscribers and the standard operator set
//! - A bridge from signals to async streams
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `sync`: The atomic cell every other module builds its state on
//! - `disposable`: Cancellation and resource-release handles
//! - `reactive`: Signals, subscribers, operators and the stream bridge
//! - `error`: Error types for streams and disposal
//!
//! # Example
//!
//! ```rust
//! use signal_core::reactive::Signal;
//!
//! let total = Signal::<i32>::from_values(vec![1, 2, 3, 4])
//!     .filter(|v| v % 2 == 0)
//!     .map(|v| v * 10)
//!     .reduce(0, |acc, v| acc + v);
//!
//! total.subscribe_next(|v| assert_eq!(v, 60));
//! ```

pub mod disposable;
pub mod error;
pub mod reactive;
pub mod sync;

pub use disposable::{
    ActionDisposable, CompositeDisposable, Disposable, DisposableRef, SerialDisposable,
    SimpleDisposable,
};
pub use error::{DisposeError, SignalError};
pub use reactive::{Signal, SignalStream, Subscriber, SubscriberBuilder};
pub use sync::AtomicCell;
