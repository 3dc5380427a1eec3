//! Synchronization Primitives
//!
//! Every piece of shared mutable state in the engine lives inside an
//! `AtomicCell`. Disposables keep their flags and child lists in cells,
//! operators keep their accumulators and counters in cells, and subscribers
//! keep their callbacks in a cell.
//!
//! # Why a Cell and Not Raw Locks
//!
//! Operators need read-modify-write steps that also report a decision back
//! to the caller ("was this the last in-flight producer?", "was the
//! composite already disposed when I added this child?"). Expressing each of
//! those as a single closure run under the cell's lock keeps the decision and
//! the state transition in one indivisible step, and keeps lock guards from
//! ever escaping into operator code.
//!
//! Callers must not call back into the same cell from inside one of its
//! closures; the cell's lock is not reentrant.

mod cell;

pub use cell::AtomicCell;
