//! Scalar function registration.

use std::ffi::{c_int, CString};
use std::ptr;

use libsqlite3_sys as ffi;
use serde::{Deserialize, Serialize};
use sqlfn_conn::error::errstr;
use sqlfn_conn::Connection;
use sqlfn_core::{Error, ErrorCode, FunctionFlags, Result};

use crate::classify::StorageMode;
use crate::ownership::Storage;
use crate::signature::ScalarCallable;
use crate::trampoline::scalar_trampoline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationKind {
    Scalar,
    Aggregate,
    Window,
    Collation,
}

/// What a successful registration installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    /// SQL-visible argument count (2 for collations).
    pub arity: i32,
    pub kind: RegistrationKind,
    pub storage: StorageMode,
}

/// Register `func`, moving it into engine-owned storage.
///
/// Zero-sized callables (fn items, closures without captures) allocate
/// nothing. Anything else gets one engine block, destroyed when the function
/// is replaced, removed, or the connection closes.
pub fn register_function<F, M>(
    conn: &Connection,
    name: &str,
    flags: FunctionFlags,
    func: F,
) -> Result<Registration>
where
    F: ScalarCallable<M> + Send + 'static,
{
    let () = <F as ScalarCallable<M>>::ARITY_OK;
    let c_name = function_name(name)?;
    install_scalar::<F, M>(conn, name, &c_name, flags, Storage::owned(func)?)
}

/// Register a callable the caller keeps alive for the rest of the program.
/// The engine never frees it.
pub fn register_function_ref<F, M>(
    conn: &Connection,
    name: &str,
    flags: FunctionFlags,
    func: &'static F,
) -> Result<Registration>
where
    F: ScalarCallable<M> + Sync + 'static,
{
    let () = <F as ScalarCallable<M>>::ARITY_OK;
    let c_name = function_name(name)?;
    install_scalar::<F, M>(conn, name, &c_name, flags, Storage::borrowed(func))
}

/// Allocate storage, build the callable with `init`, then register it.
///
/// A panicking `init` reports `AllocationFailed` and registers nothing.
pub fn create_function_with<F, M, I>(
    conn: &Connection,
    name: &str,
    flags: FunctionFlags,
    init: I,
) -> Result<Registration>
where
    F: ScalarCallable<M> + Send + 'static,
    I: FnOnce() -> F,
{
    let () = <F as ScalarCallable<M>>::ARITY_OK;
    let c_name = function_name(name)?;
    install_scalar::<F, M>(conn, name, &c_name, flags, Storage::construct(init)?)
}

/// Drop the UTF-8 function `name` taking `arity` arguments (`-1` for
/// variadic). Its storage is destroyed by the engine.
pub fn remove_function(conn: &Connection, name: &str, arity: i32) -> Result<()> {
    let c_name = function_name(name)?;
    let rc = unsafe {
        ffi::sqlite3_create_function_v2(
            conn.handle(),
            c_name.as_ptr(),
            arity as c_int,
            FunctionFlags::UTF8.bits(),
            ptr::null_mut(),
            None,
            None,
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

fn install_scalar<F, M>(
    conn: &Connection,
    name: &str,
    c_name: &CString,
    flags: FunctionFlags,
    storage: Storage<F>,
) -> Result<Registration>
where
    F: ScalarCallable<M> + 'static,
{
    let arity = F::ARITY as c_int;
    let mode = storage.mode();
    let parts = storage.into_raw_parts();

    // On failure the engine runs `parts.destructor` itself.
    let rc = unsafe {
        ffi::sqlite3_create_function_v2(
            conn.handle(),
            c_name.as_ptr(),
            arity,
            flags.bits(),
            parts.ptr,
            Some(scalar_trampoline::<F, M>),
            None,
            None,
            parts.destructor,
        )
    };
    finish_registration(conn, name, rc, arity, RegistrationKind::Scalar, mode)
}

pub(crate) fn function_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| Error::misuse(format!("name {name:?} contains a NUL byte")))
}

pub(crate) fn rejected(conn: &Connection, name: &str, rc: c_int) -> Error {
    let mut message = conn.last_error_message();
    if message.is_empty() {
        message = errstr(rc);
    }
    Error::RegistrationRejected {
        name: name.to_string(),
        code: ErrorCode::from_raw(rc),
        message,
    }
}

pub(crate) fn finish_registration(
    conn: &Connection,
    name: &str,
    rc: c_int,
    arity: c_int,
    kind: RegistrationKind,
    storage: StorageMode,
) -> Result<Registration> {
    if rc != ffi::SQLITE_OK as c_int {
        let err = rejected(conn, name, rc);
        #[cfg(feature = "tracing")]
        tracing::warn!(function = name, arity, kind = ?kind, error = %err, "registration rejected");
        return Err(err);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(function = name, arity, kind = ?kind, storage = ?storage, "registered");

    Ok(Registration {
        name: name.to_string(),
        arity,
        kind,
        storage,
    })
}
