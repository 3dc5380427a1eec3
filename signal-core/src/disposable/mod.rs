//! Disposables
//!
//! A disposable is a handle to something that can be released exactly once:
//! a running producer, a registered callback, a nested subscription. Every
//! operator in the engine ties its resources to a disposable, and every
//! subscription hands one back to the caller.
//!
//! # Variants
//!
//! - `SimpleDisposable`: just a flag.
//! - `ActionDisposable`: runs a cleanup closure on first disposal.
//! - `CompositeDisposable`: owns a growing set of children and disposes all
//!   of them together. Children added after disposal are disposed on the
//!   spot instead of being stored.
//! - `SerialDisposable`: owns at most one replaceable child. Replacing the
//!   child disposes the old one.
//!
//! # Guarantees
//!
//! For every variant, `dispose()` performs its effect at most once no matter
//! how many threads call it, and `is_disposed()` only ever moves from
//! `false` to `true`. All state lives in an `AtomicCell`, so the decision
//! "am I already disposed?" and the transition to disposed are one step.
//!
//! All variants are cheap handles: cloning one shares the same underlying
//! state.

mod action;
mod composite;
mod serial;
mod simple;

use std::sync::Arc;

use crate::error::DisposeError;

pub use action::ActionDisposable;
pub use composite::CompositeDisposable;
pub use serial::SerialDisposable;
pub use simple::SimpleDisposable;

/// Something that can be released exactly once.
pub trait Disposable: Send + Sync {
    /// Release the resource.
    ///
    /// Idempotent: only the first call has an effect. Errors from cleanup
    /// actions are reported to the caller of the call that ran them.
    fn dispose(&self) -> Result<(), DisposeError>;

    /// Whether `dispose()` has completed its transition.
    fn is_disposed(&self) -> bool;
}

/// A shared, type-erased disposable.
pub type DisposableRef = Arc<dyn Disposable>;

impl<D: Disposable + ?Sized> Disposable for Arc<D> {
    fn dispose(&self) -> Result<(), DisposeError> {
        (**self).dispose()
    }

    fn is_disposed(&self) -> bool {
        (**self).is_disposed()
    }
}
