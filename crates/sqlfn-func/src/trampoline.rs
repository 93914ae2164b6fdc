//! `extern "C"` entry points the engine calls, and the boundary that keeps
//! Rust failures from crossing into it.

use std::any::Any;
use std::ffi::c_int;
use std::panic::{self, AssertUnwindSafe};

use libsqlite3_sys as ffi;
use sqlfn_core::{ErrorCode, Result};

use crate::context::Context;
use crate::ownership::recover;
use crate::signature::ScalarCallable;
use crate::value::Args;

const UNKNOWN_FAILURE: &str = "unknown failure in user callback";

/// Run `body` for the callback whose context is `raw`.
///
/// Errors become the call's error result; panics are caught and reported the
/// same way. Nothing unwinds past this function.
pub(crate) fn absorb(
    raw: *mut ffi::sqlite3_context,
    role: &'static str,
    body: impl FnOnce(&Context) -> Result<()>,
) {
    let Some(ctx) = (unsafe { Context::from_raw(raw) }) else {
        return;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| body(&ctx))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(role, code = %err.code(), error = %err, "callback failed");
            ctx.set_error(&err);
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            #[cfg(feature = "tracing")]
            tracing::warn!(role, message = %message, "callback panicked");
            ctx.set_error_message(ErrorCode::Error, &message);
            // A payload whose Drop panics must not escape either.
            let _ = panic::catch_unwind(AssertUnwindSafe(move || drop(payload)));
        }
    }

    #[cfg(not(feature = "tracing"))]
    let _ = role;
}

/// Best-effort text of a panic payload; never empty.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    let text = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::new()
    };
    if text.is_empty() {
        UNKNOWN_FAILURE.to_string()
    } else {
        text
    }
}

/// `xFunc` for scalar callables.
pub(crate) unsafe extern "C" fn scalar_trampoline<F, M>(
    raw: *mut ffi::sqlite3_context,
    argc: c_int,
    argv: *mut *mut ffi::sqlite3_value,
) where
    F: ScalarCallable<M>,
{
    absorb(raw, "scalar", |ctx| {
        let func = recover::<F>(ctx.user_data())?;
        let mut args = Args::from_raw(argc, argv);
        func.invoke(ctx, &mut args)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_messages_are_never_empty() {
        let static_str: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(static_str.as_ref()), "boom");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");

        let opaque: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(opaque.as_ref()), UNKNOWN_FAILURE);

        let empty: Box<dyn Any + Send> = Box::new(String::new());
        assert_eq!(panic_message(empty.as_ref()), UNKNOWN_FAILURE);
    }
}
