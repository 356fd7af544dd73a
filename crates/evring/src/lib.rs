//! evring - Fixed-Capacity Event Ring with Reply Reservation
//!
//! A bounded FIFO of whole records with reserved-slot accounting, built for
//! per-client event queues: an engine-side producer appends events, a single
//! consumer drains them, and a reservation counter guarantees that every
//! accepted asynchronous request can later be answered even when unsolicited
//! traffic fills the queue.
//!
//! The ring itself is not a synchronization primitive. Reserving a reply slot
//! and later writing the reply are separate calls, so the owner must hold its
//! own lock across every access; all methods take `&mut self` to make that
//! explicit. This keeps the ring free of atomics and `unsafe`.
//!
//! # Example
//!
//! ```
//! use evring::Ring;
//!
//! let mut ring = Ring::with_capacity(4);
//!
//! // Reserve a slot for a future reply, then fill the rest.
//! ring.reserve().unwrap();
//! assert_eq!(ring.free_slots(), 3);
//!
//! ring.try_push("state-change").unwrap();
//!
//! // The reserved slot can always be written, even after ordinary
//! // pushes start failing.
//! ring.push_reserved("reply");
//!
//! assert_eq!(ring.pop(), Some("state-change"));
//! assert_eq!(ring.pop(), Some("reply"));
//! ```

mod invariants;
mod ring;

pub use ring::{Ring, RingError, RingStats};
