//! Conversions between engine values and host types.
//!
//! [`FromValue`] builds a host argument from one engine value; [`ToResult`]
//! hands a host value (or failure) to the engine's result setters. Both are
//! resolved at compile time, so an unsupported type is a build error.
//!
//! Applications extend the set by implementing the traits for their own
//! types:
//!
//! ```
//! use sqlfn_core::Result;
//! use sqlfn_func::{Context, FromValue, ToResult, ValueRef};
//!
//! struct Celsius(f64);
//!
//! impl FromValue for Celsius {
//!     fn from_value(value: ValueRef<'_>) -> Result<Self> {
//!         Ok(Celsius(value.as_f64()))
//!     }
//! }
//!
//! impl ToResult for Celsius {
//!     fn set_result(self, ctx: &Context) {
//!         ctx.set_result(self.0);
//!     }
//! }
//! ```

use std::ffi::{c_char, c_int, c_uchar, c_void};

use libsqlite3_sys as ffi;
use sqlfn_core::{Error, ErrorCode, Result, Value};

use crate::context::Context;
use crate::value::{RawValue, ValueRef};

/// Error type accepted from callables returning `Result<T, E>`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub trait FromValue: Sized {
    fn from_value(value: ValueRef<'_>) -> Result<Self>;
}

pub trait ToResult {
    fn set_result(self, ctx: &Context);
}

/// What a context-taking callable may return: nothing (it set the result
/// itself), `Result<(), E>` (it set the result itself, or failed) or any
/// [`ToResult`] value.
pub trait ContextReturn {
    fn finish(self, ctx: &Context);
}

impl ContextReturn for () {
    fn finish(self, _ctx: &Context) {}
}

impl<E: Into<BoxError>> ContextReturn for std::result::Result<(), E> {
    fn finish(self, ctx: &Context) {
        if let Err(err) = self {
            report_failure(ctx, err.into());
        }
    }
}

impl<T: ToResult> ContextReturn for T {
    fn finish(self, ctx: &Context) {
        self.set_result(ctx);
    }
}

/// Explicit SQL NULL result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Null;

impl FromValue for i64 {
    fn from_value(value: ValueRef<'_>) -> Result<Self> {
        Ok(value.as_i64())
    }
}

impl FromValue for i32 {
    fn from_value(value: ValueRef<'_>) -> Result<Self> {
        Ok(value.as_i32())
    }
}

impl FromValue for f64 {
    fn from_value(value: ValueRef<'_>) -> Result<Self> {
        Ok(value.as_f64())
    }
}

impl FromValue for bool {
    fn from_value(value: ValueRef<'_>) -> Result<Self> {
        Ok(value.as_i64() != 0)
    }
}

impl FromValue for String {
    fn from_value(mut value: ValueRef<'_>) -> Result<Self> {
        String::from_utf8(value.text().to_vec())
            .map_err(|e| Error::Mismatch(format!("argument text is not valid UTF-8: {e}")))
    }
}

impl FromValue for Box<str> {
    fn from_value(value: ValueRef<'_>) -> Result<Self> {
        String::from_value(value).map(String::into_boxed_str)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(mut value: ValueRef<'_>) -> Result<Self> {
        Ok(value.blob().to_vec())
    }
}

impl FromValue for Box<[u8]> {
    fn from_value(mut value: ValueRef<'_>) -> Result<Self> {
        Ok(value.blob().into())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: ValueRef<'_>) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(mut value: ValueRef<'_>) -> Result<Self> {
        Ok(value.to_value())
    }
}

impl FromValue for RawValue {
    fn from_value(value: ValueRef<'_>) -> Result<Self> {
        Ok(value.as_raw())
    }
}

fn set_text(ctx: &Context, text: &str) {
    unsafe {
        ffi::sqlite3_result_text64(
            ctx.as_ptr(),
            text.as_ptr().cast::<c_char>(),
            text.len() as ffi::sqlite3_uint64,
            ffi::SQLITE_TRANSIENT(),
            ffi::SQLITE_UTF8 as c_uchar,
        );
    }
}

fn set_blob(ctx: &Context, blob: &[u8]) {
    unsafe {
        ffi::sqlite3_result_blob64(
            ctx.as_ptr(),
            blob.as_ptr().cast::<c_void>(),
            blob.len() as ffi::sqlite3_uint64,
            ffi::SQLITE_TRANSIENT(),
        );
    }
}

impl ToResult for i64 {
    fn set_result(self, ctx: &Context) {
        unsafe { ffi::sqlite3_result_int64(ctx.as_ptr(), self) }
    }
}

impl ToResult for i32 {
    fn set_result(self, ctx: &Context) {
        unsafe { ffi::sqlite3_result_int(ctx.as_ptr(), self as c_int) }
    }
}

impl ToResult for u32 {
    fn set_result(self, ctx: &Context) {
        i64::from(self).set_result(ctx);
    }
}

impl ToResult for bool {
    fn set_result(self, ctx: &Context) {
        i64::from(self).set_result(ctx);
    }
}

impl ToResult for f64 {
    fn set_result(self, ctx: &Context) {
        unsafe { ffi::sqlite3_result_double(ctx.as_ptr(), self) }
    }
}

impl ToResult for &str {
    fn set_result(self, ctx: &Context) {
        set_text(ctx, self);
    }
}

impl ToResult for String {
    fn set_result(self, ctx: &Context) {
        set_text(ctx, &self);
    }
}

impl ToResult for Box<str> {
    fn set_result(self, ctx: &Context) {
        set_text(ctx, &self);
    }
}

impl ToResult for &[u8] {
    fn set_result(self, ctx: &Context) {
        set_blob(ctx, self);
    }
}

impl ToResult for Vec<u8> {
    fn set_result(self, ctx: &Context) {
        set_blob(ctx, &self);
    }
}

impl ToResult for Null {
    fn set_result(self, ctx: &Context) {
        unsafe { ffi::sqlite3_result_null(ctx.as_ptr()) }
    }
}

impl<T: ToResult> ToResult for Option<T> {
    fn set_result(self, ctx: &Context) {
        match self {
            Some(value) => value.set_result(ctx),
            None => Null.set_result(ctx),
        }
    }
}

impl ToResult for Value {
    fn set_result(self, ctx: &Context) {
        match self {
            Value::Null => Null.set_result(ctx),
            Value::Integer(v) => v.set_result(ctx),
            Value::Real(v) => v.set_result(ctx),
            Value::Text(s) => set_text(ctx, &s),
            Value::Blob(b) => set_blob(ctx, &b),
        }
    }
}

/// `Err` becomes the call's error result. A `sqlfn_core::Error` keeps its
/// engine code; anything else is reported as a generic error with its text.
impl<T: ToResult, E: Into<BoxError>> ToResult for std::result::Result<T, E> {
    fn set_result(self, ctx: &Context) {
        match self {
            Ok(value) => value.set_result(ctx),
            Err(err) => report_failure(ctx, err.into()),
        }
    }
}

pub(crate) fn report_failure(ctx: &Context, err: BoxError) {
    match err.downcast::<Error>() {
        Ok(typed) => ctx.set_error(&typed),
        Err(other) => ctx.set_error_message(ErrorCode::Error, &other.to_string()),
    }
}
