//! Per-invocation execution context.

use std::any::Any;
use std::ffi::{c_char, c_int, c_void};
use std::ptr::NonNull;
use std::sync::Arc;

use libsqlite3_sys as ffi;
use sqlfn_core::{Error, ErrorCode};

use crate::marshal::ToResult;

type AuxData = Arc<dyn Any + Send + Sync>;

/// Handle to the engine's `sqlite3_context` for one callback invocation.
///
/// Only ever lent out as `&Context` for the duration of a call; it cannot be
/// cloned or stored.
pub struct Context {
    raw: NonNull<ffi::sqlite3_context>,
}

impl Context {
    /// # Safety
    /// `raw` must be the context of the callback currently executing.
    pub(crate) unsafe fn from_raw(raw: *mut ffi::sqlite3_context) -> Option<Self> {
        NonNull::new(raw).map(|raw| Context { raw })
    }

    pub fn as_ptr(&self) -> *mut ffi::sqlite3_context {
        self.raw.as_ptr()
    }

    /// Set the call's result. The last setter wins.
    pub fn set_result<T: ToResult>(&self, value: T) {
        value.set_result(self);
    }

    /// Report `err` as the call's result, using its engine code.
    pub fn set_error(&self, err: &Error) {
        self.set_error_message(err.code(), &err.to_string());
    }

    /// Report a failure with an explicit code and message.
    ///
    /// An empty message is replaced by the code's description.
    pub fn set_error_message(&self, code: ErrorCode, message: &str) {
        let ctx = self.as_ptr();
        let message = if message.is_empty() {
            code.description()
        } else {
            message
        };
        unsafe {
            match code {
                ErrorCode::NoMem => ffi::sqlite3_result_error_nomem(ctx),
                ErrorCode::TooBig => ffi::sqlite3_result_error_toobig(ctx),
                _ => {
                    let len = c_int::try_from(message.len()).unwrap_or(c_int::MAX);
                    // Message first: error_code keeps an existing message.
                    ffi::sqlite3_result_error(ctx, message.as_ptr().cast::<c_char>(), len);
                    let raw = if code.is_error() {
                        code.raw()
                    } else {
                        ErrorCode::Error.raw()
                    };
                    ffi::sqlite3_result_error_code(ctx, raw as c_int);
                }
            }
        }
    }

    /// Storage pointer given at registration.
    pub fn user_data(&self) -> *mut c_void {
        unsafe { ffi::sqlite3_user_data(self.as_ptr()) }
    }

    /// Connection the function is running on.
    pub fn db_handle(&self) -> *mut ffi::sqlite3 {
        unsafe { ffi::sqlite3_context_db_handle(self.as_ptr()) }
    }

    /// Attach `value` to argument `arg` so later rows of the same statement can
    /// reuse it while that argument stays constant.
    ///
    /// The engine may drop the value at any time, including immediately.
    pub fn set_auxdata<T: Send + Sync + 'static>(&self, arg: usize, value: T) -> Arc<T> {
        let shared = Arc::new(value);
        let boxed: Box<AuxData> = Box::new(shared.clone());
        unsafe {
            ffi::sqlite3_set_auxdata(
                self.as_ptr(),
                arg as c_int,
                Box::into_raw(boxed).cast::<c_void>(),
                Some(free_auxdata),
            );
        }
        shared
    }

    /// Value previously attached to argument `arg`, if it is still there and
    /// has type `T`.
    pub fn get_auxdata<T: Send + Sync + 'static>(&self, arg: usize) -> Option<Arc<T>> {
        let raw = unsafe { ffi::sqlite3_get_auxdata(self.as_ptr(), arg as c_int) };
        if raw.is_null() {
            return None;
        }
        let aux = unsafe { &*raw.cast::<AuxData>() };
        aux.clone().downcast::<T>().ok()
    }
}

unsafe extern "C" fn free_auxdata(raw: *mut c_void) {
    if !raw.is_null() {
        drop(Box::from_raw(raw.cast::<AuxData>()));
    }
}
