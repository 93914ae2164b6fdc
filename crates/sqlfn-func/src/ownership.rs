//! Where a registered callable lives, and how the trampoline finds it again.

use std::any::type_name;
use std::ffi::c_void;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;

use sqlfn_core::{Error, Result};
use sqlfn_mem::layout::pointer_cast;
use sqlfn_mem::{ManagedPtr, RawParts};

use crate::classify::{is_stateless, StorageMode};

pub(crate) enum Storage<F: 'static> {
    Stateless,
    Borrowed(&'static F),
    Managed(ManagedPtr<F>),
}

impl<F: 'static> Storage<F> {
    /// Managed-move mode; stateless values are dropped in favor of no storage.
    pub(crate) fn owned(value: F) -> Result<Self> {
        if is_stateless::<F>() {
            mem::forget(value);
            return Ok(Storage::Stateless);
        }
        Ok(Storage::Managed(ManagedPtr::new(value)?))
    }

    /// Managed-construct mode: storage first, then `init` builds the value.
    /// A panicking `init` is an allocation failure.
    pub(crate) fn construct(init: impl FnOnce() -> F) -> Result<Self> {
        if is_stateless::<F>() {
            let value = panic::catch_unwind(AssertUnwindSafe(init)).map_err(|_| {
                Error::AllocationFailed {
                    what: type_name::<F>(),
                    bytes: 0,
                }
            })?;
            mem::forget(value);
            return Ok(Storage::Stateless);
        }
        Ok(Storage::Managed(ManagedPtr::new_with(init)?))
    }

    pub(crate) fn borrowed(value: &'static F) -> Self {
        Storage::Borrowed(value)
    }

    pub(crate) fn mode(&self) -> StorageMode {
        match self {
            Storage::Stateless => StorageMode::Stateless,
            Storage::Borrowed(_) => StorageMode::Unmanaged,
            Storage::Managed(_) => StorageMode::Managed,
        }
    }

    /// User-data pointer and destructor for the registration call.
    pub(crate) fn into_raw_parts(self) -> RawParts {
        match self {
            Storage::Stateless => RawParts::unmanaged(NonNull::<F>::dangling().as_ptr().cast()),
            Storage::Borrowed(value) => {
                RawParts::unmanaged((value as *const F).cast_mut().cast::<c_void>())
            }
            Storage::Managed(managed) => managed.into_raw_parts(),
        }
    }
}

/// The callable behind a user-data pointer produced by [`Storage::into_raw_parts`].
///
/// # Safety
/// `user_data` must come from a `Storage<F>` of the same `F` whose
/// registration is still alive.
pub(crate) unsafe fn recover<'a, F>(user_data: *mut c_void) -> Result<&'a F> {
    if user_data.is_null() {
        return Err(Error::misuse("callback invoked without user data"));
    }
    Ok(&*pointer_cast::<F>(user_data))
}
