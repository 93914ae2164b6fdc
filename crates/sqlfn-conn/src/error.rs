//! Mapping engine return codes into `sqlfn_core::Error`.

use std::ffi::{c_int, CStr};

use libsqlite3_sys as ffi;
use sqlfn_core::{Error, ErrorCode, Result};

/// `Ok(())` for `SQLITE_OK`, otherwise the connection's current error.
pub fn check(db: *mut ffi::sqlite3, rc: c_int) -> Result<()> {
    if rc == ffi::SQLITE_OK as c_int {
        Ok(())
    } else {
        Err(error_from_handle(db, rc))
    }
}

/// Build an error from `rc`, taking message and extended code from `db` when
/// there is one.
pub fn error_from_handle(db: *mut ffi::sqlite3, rc: c_int) -> Error {
    if db.is_null() {
        return error_from_code(rc);
    }
    let (message, extended) = unsafe {
        let msg = ffi::sqlite3_errmsg(db);
        let message = if msg.is_null() {
            errstr(rc)
        } else {
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        };
        (message, ffi::sqlite3_extended_errcode(db))
    };
    Error::Sqlite {
        code: ErrorCode::from_raw(rc),
        extended,
        message,
    }
}

pub fn error_from_code(rc: c_int) -> Error {
    Error::Sqlite {
        code: ErrorCode::from_raw(rc),
        extended: rc,
        message: errstr(rc),
    }
}

/// The engine's generic description of `rc`.
pub fn errstr(rc: c_int) -> String {
    unsafe {
        let msg = ffi::sqlite3_errstr(rc);
        if msg.is_null() {
            ErrorCode::from_raw(rc).description().to_string()
        } else {
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        }
    }
}
