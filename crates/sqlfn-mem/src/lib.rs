//! sqlfn-mem: storage that lives in the engine's allocator.
//!
//! Everything the engine eventually frees must come from the engine's own
//! allocator, and must be handed over together with the destructor that knows
//! how to tear it down. This crate owns that pairing:
//!
//! - `ManagedPtr<T>` allocates with `sqlite3_malloc64`, constructs one `T`, and
//!   converts into an inseparable `RawParts { ptr, destructor }`
//! - `LazySlot<T>` is the per-group aggregate state machine, valid when
//!   zero-filled, so it can sit directly in `sqlite3_aggregate_context` memory
//! - `layout` computes storage sizes and aligned pointers for over-aligned types
//! - `tracking` counts live managed blocks and peak bytes
//!
//! No registration logic lives here; see `sqlfn-func`.

pub mod error;
pub mod failpoints;
pub mod layout;
pub mod managed;
pub mod slot;
pub mod tracking;

pub use error::{Error, Result};
pub use managed::{managed_deleter, Destructor, ManagedPtr, RawParts};
pub use slot::{aggregate_slot, LazySlot, SlotState};
pub use tracking::AllocationTracker;
