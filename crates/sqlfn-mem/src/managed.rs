//! Single instances owned by the engine's allocator.
//!
//! A `ManagedPtr<T>` owns one `T` inside a block from `sqlite3_malloc64`.
//! While the Rust side holds it, dropping it destroys and frees the value.
//! Once converted with [`ManagedPtr::into_raw_parts`], the pointer and its
//! destructor travel together and the engine decides when to call it.

use std::any::type_name;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};

use libsqlite3_sys as ffi;

use crate::error::{Error, Result};
use crate::failpoints;
use crate::layout::{pointer_cast, storage_size};
use crate::tracking;

/// Destructor signature the engine invokes on user data.
pub type Destructor = unsafe extern "C" fn(*mut c_void);

/// A storage pointer and the destructor that releases it.
///
/// `destructor` is `None` for storage the engine must never free.
#[derive(Debug, Clone, Copy)]
pub struct RawParts {
    pub ptr: *mut c_void,
    pub destructor: Option<Destructor>,
}

impl RawParts {
    /// Storage the caller keeps alive and frees (or never frees).
    pub fn unmanaged(ptr: *mut c_void) -> Self {
        Self {
            ptr,
            destructor: None,
        }
    }

    /// Run the destructor on a path where the engine never took ownership.
    ///
    /// # Safety
    /// The parts must not have been handed to the engine, and must not be
    /// released twice.
    pub unsafe fn release(self) {
        if let Some(destructor) = self.destructor {
            destructor(self.ptr);
        }
    }
}

pub struct ManagedPtr<T> {
    base: NonNull<c_void>,
    _owns: PhantomData<T>,
}

// The block is exclusively owned; thread-safety follows `T`.
unsafe impl<T: Send> Send for ManagedPtr<T> {}
unsafe impl<T: Sync> Sync for ManagedPtr<T> {}

impl<T> ManagedPtr<T> {
    /// Move `value` into fresh engine storage.
    pub fn new(value: T) -> Result<Self> {
        Self::new_with(move || value)
    }

    /// Allocate first, then build the value for that storage.
    ///
    /// A panicking `init` releases the block and reports `ConstructFailed`.
    pub fn new_with(init: impl FnOnce() -> T) -> Result<Self> {
        let what = type_name::<T>();
        let bytes = storage_size::<T>();

        if crate::fail_point!(failpoints::MANAGED_ALLOC) {
            return Err(Error::AllocFailed { what, bytes });
        }

        let raw = unsafe { ffi::sqlite3_malloc64(bytes as ffi::sqlite3_uint64) };
        let base = NonNull::new(raw).ok_or(Error::AllocFailed { what, bytes })?;

        match panic::catch_unwind(AssertUnwindSafe(init)) {
            Ok(value) => unsafe { pointer_cast::<T>(base.as_ptr()).write(value) },
            Err(_) => {
                unsafe { ffi::sqlite3_free(base.as_ptr()) };
                #[cfg(feature = "tracing")]
                tracing::warn!(what, bytes, "managed construction panicked");
                return Err(Error::ConstructFailed { what, bytes });
            }
        }

        tracking::global().record_alloc(bytes);
        #[cfg(feature = "tracing")]
        tracing::trace!(what, bytes, "managed alloc");

        Ok(Self {
            base,
            _owns: PhantomData,
        })
    }

    pub fn get(&self) -> &T {
        unsafe { &*pointer_cast::<T>(self.base.as_ptr()) }
    }

    /// Base pointer of the engine block (not necessarily the address of `T`).
    pub fn base_ptr(&self) -> *mut c_void {
        self.base.as_ptr()
    }

    /// Hand the block over. The returned destructor is its only release path.
    pub fn into_raw_parts(self) -> RawParts {
        let ptr = self.base.as_ptr();
        mem::forget(self);
        RawParts {
            ptr,
            destructor: Some(managed_deleter::<T>),
        }
    }
}

impl<T> Drop for ManagedPtr<T> {
    fn drop(&mut self) {
        unsafe { managed_deleter::<T>(self.base.as_ptr()) }
    }
}

/// Destroy the `T` in an engine block and free the block.
///
/// A panicking `Drop` is contained here; the block is still freed.
///
/// # Safety
/// `base` must come from `ManagedPtr::<T>` and must not be used afterwards.
pub unsafe extern "C" fn managed_deleter<T>(base: *mut c_void) {
    if base.is_null() {
        return;
    }
    let value = pointer_cast::<T>(base);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| ptr::drop_in_place(value)));
    ffi::sqlite3_free(base);
    tracking::global().record_free(storage_size::<T>());

    // NOTE: a drop panic is swallowed; unwinding into the engine would abort.
    if outcome.is_err() {
        #[cfg(feature = "tracing")]
        tracing::warn!(what = type_name::<T>(), "drop panicked inside engine destructor");
    }
}
