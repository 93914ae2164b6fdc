//! Per-group aggregate storage with deferred construction.
//!
//! The engine hands out per-group memory already zero-filled and never runs a
//! constructor on it. `LazySlot<T>` is laid out so that all-zero bytes are the
//! `Uninitialized` variant; the instance is built on first access and taken
//! out exactly once when the group is finalized.

use std::any::type_name;
use std::ffi::c_int;
use std::mem;

use libsqlite3_sys as ffi;

use crate::error::{Error, Result};
use crate::failpoints;
use crate::layout::{pointer_cast, storage_size};

/// Tag 0 must stay `Uninitialized`: zero-filled memory is read as that variant.
#[repr(C, u8)]
pub enum LazySlot<T> {
    Uninitialized = 0,
    Initialized(T) = 1,
    Destroyed = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Initialized,
    Destroyed,
}

impl<T> LazySlot<T> {
    pub fn state(&self) -> SlotState {
        match self {
            LazySlot::Uninitialized => SlotState::Uninitialized,
            LazySlot::Initialized(_) => SlotState::Initialized,
            LazySlot::Destroyed => SlotState::Destroyed,
        }
    }

    /// The instance, built with `init` if this is the first access.
    ///
    /// If `init` panics the slot stays `Uninitialized`.
    pub fn get_or_init(&mut self, init: impl FnOnce() -> T) -> Result<&mut T> {
        if let LazySlot::Uninitialized = self {
            *self = LazySlot::Initialized(init());
        }
        match self {
            LazySlot::Initialized(value) => Ok(value),
            _ => Err(Error::SlotDestroyed),
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            LazySlot::Initialized(value) => Some(value),
            _ => None,
        }
    }

    /// Move the instance out and mark the slot destroyed.
    /// Returns `None` (and leaves the state alone) unless initialized.
    pub fn take(&mut self) -> Option<T> {
        if !matches!(self, LazySlot::Initialized(_)) {
            return None;
        }
        match mem::replace(self, LazySlot::Destroyed) {
            LazySlot::Initialized(value) => Some(value),
            _ => None,
        }
    }
}

/// The group's slot inside `sqlite3_aggregate_context` memory.
///
/// The first call for a group allocates zero-filled storage; later calls
/// return the same block. Null from the engine means it is out of memory.
///
/// # Safety
/// `ctx` must be the context of an aggregate callback currently executing, and
/// every call for that group must use the same `T`. The returned borrow must
/// not outlive the callback.
pub unsafe fn aggregate_slot<'a, T>(
    ctx: *mut ffi::sqlite3_context,
) -> Result<&'a mut LazySlot<T>> {
    let what = type_name::<T>();
    let bytes = storage_size::<LazySlot<T>>();
    let request = c_int::try_from(bytes).map_err(|_| Error::TooLarge { what, bytes })?;

    if crate::fail_point!(failpoints::AGGREGATE_SLOT) {
        return Err(Error::AllocFailed { what, bytes });
    }

    let base = ffi::sqlite3_aggregate_context(ctx, request);
    if base.is_null() {
        return Err(Error::AllocFailed { what, bytes });
    }
    Ok(&mut *pointer_cast::<LazySlot<T>>(base))
}
