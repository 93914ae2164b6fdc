//! Collations, stored the same way as scalar functions.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::ffi::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use libsqlite3_sys as ffi;
use sqlfn_conn::Connection;
use sqlfn_core::{FunctionFlags, Result};

use crate::function::{finish_registration, function_name, RegistrationKind};
use crate::function::{rejected, Registration};
use crate::ownership::{recover, Storage};

/// Orders two text values.
///
/// Text that is not valid UTF-8 is compared after lossy decoding.
pub trait Collation {
    fn compare(&self, lhs: &str, rhs: &str) -> Ordering;
}

impl<F> Collation for F
where
    F: Fn(&str, &str) -> Ordering,
{
    fn compare(&self, lhs: &str, rhs: &str) -> Ordering {
        self(lhs, rhs)
    }
}

unsafe fn text_arg<'a>(len: c_int, data: *const c_void) -> Cow<'a, str> {
    if data.is_null() || len <= 0 {
        return Cow::Borrowed("");
    }
    String::from_utf8_lossy(slice::from_raw_parts(data.cast::<u8>(), len as usize))
}

/// `xCompare`. Collations have no error channel: a panic compares equal.
unsafe extern "C" fn compare_trampoline<C: Collation>(
    user_data: *mut c_void,
    lhs_len: c_int,
    lhs: *const c_void,
    rhs_len: c_int,
    rhs: *const c_void,
) -> c_int {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let collation = recover::<C>(user_data)?;
        let lhs = text_arg(lhs_len, lhs);
        let rhs = text_arg(rhs_len, rhs);
        Ok::<_, sqlfn_core::Error>(collation.compare(&lhs, &rhs))
    }));
    match outcome {
        Ok(Ok(ordering)) => ordering as c_int,
        _ => {
            #[cfg(feature = "tracing")]
            tracing::warn!(collation = std::any::type_name::<C>(), "collation failed; treating as equal");
            0
        }
    }
}

/// Register `collation` by value (engine-owned, or stateless when empty).
pub fn register_collation<C>(conn: &Connection, name: &str, collation: C) -> Result<Registration>
where
    C: Collation + Send + 'static,
{
    let c_name = function_name(name)?;
    install::<C>(conn, name, &c_name, Storage::owned(collation)?)
}

/// Register a collation the caller keeps alive for the rest of the program.
pub fn register_collation_ref<C>(
    conn: &Connection,
    name: &str,
    collation: &'static C,
) -> Result<Registration>
where
    C: Collation + Sync + 'static,
{
    let c_name = function_name(name)?;
    install::<C>(conn, name, &c_name, Storage::borrowed(collation))
}

/// Allocate storage, build the collation with `init`, then register it.
pub fn create_collation_with<C, I>(conn: &Connection, name: &str, init: I) -> Result<Registration>
where
    C: Collation + Send + 'static,
    I: FnOnce() -> C,
{
    let c_name = function_name(name)?;
    install::<C>(conn, name, &c_name, Storage::construct(init)?)
}

/// Drop collation `name`; the engine destroys its storage.
pub fn remove_collation(conn: &Connection, name: &str) -> Result<()> {
    let c_name = function_name(name)?;
    let rc = unsafe {
        ffi::sqlite3_create_collation_v2(
            conn.handle(),
            c_name.as_ptr(),
            FunctionFlags::UTF8.bits(),
            ptr::null_mut(),
            None,
            None,
        )
    };
    if rc == ffi::SQLITE_OK as c_int {
        Ok(())
    } else {
        Err(rejected(conn, name, rc))
    }
}

fn install<C>(
    conn: &Connection,
    name: &str,
    c_name: &std::ffi::CString,
    storage: Storage<C>,
) -> Result<Registration>
where
    C: Collation + 'static,
{
    let mode = storage.mode();
    let parts = storage.into_raw_parts();
    let rc = unsafe {
        ffi::sqlite3_create_collation_v2(
            conn.handle(),
            c_name.as_ptr(),
            FunctionFlags::UTF8.bits(),
            parts.ptr,
            Some(compare_trampoline::<C>),
            parts.destructor,
        )
    };
    if rc != ffi::SQLITE_OK as c_int {
        // Unlike functions, a failed collation registration leaves the
        // storage with us.
        unsafe { parts.release() };
    }
    finish_registration(conn, name, rc, 2, RegistrationKind::Collation, mode)
}
