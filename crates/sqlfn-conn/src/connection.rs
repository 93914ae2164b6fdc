//! Connection handle.

use std::ffi::{c_char, c_int, CStr, CString};
use std::ops::BitOr;
use std::path::Path;
use std::ptr::{self, NonNull};

use libsqlite3_sys as ffi;
use once_cell::sync::Lazy;
use sqlfn_core::{AdapterConfig, Error, Result, Value};

use crate::error::{check, error_from_code, error_from_handle};
use crate::statement::Statement;

/// Environment configuration, read once per process.
static ENV_CONFIG: Lazy<AdapterConfig> = Lazy::new(AdapterConfig::from_env);

/// `sqlite3_open_v2` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags(c_int);

impl OpenFlags {
    pub const READ_ONLY: OpenFlags = OpenFlags(ffi::SQLITE_OPEN_READONLY as c_int);
    pub const READ_WRITE: OpenFlags = OpenFlags(ffi::SQLITE_OPEN_READWRITE as c_int);
    pub const CREATE: OpenFlags = OpenFlags(ffi::SQLITE_OPEN_CREATE as c_int);
    pub const URI: OpenFlags = OpenFlags(ffi::SQLITE_OPEN_URI as c_int);
    pub const MEMORY: OpenFlags = OpenFlags(ffi::SQLITE_OPEN_MEMORY as c_int);
    pub const NO_MUTEX: OpenFlags = OpenFlags(ffi::SQLITE_OPEN_NOMUTEX as c_int);
    pub const FULL_MUTEX: OpenFlags = OpenFlags(ffi::SQLITE_OPEN_FULLMUTEX as c_int);

    pub fn bits(self) -> c_int {
        self.0
    }

    pub fn from_config(config: &AdapterConfig) -> Self {
        let base = if config.open_read_only {
            OpenFlags::READ_ONLY
        } else if config.open_create {
            OpenFlags::READ_WRITE | OpenFlags::CREATE
        } else {
            OpenFlags::READ_WRITE
        };
        base | OpenFlags::URI
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::URI
    }
}

impl BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        OpenFlags(self.0 | rhs.0)
    }
}

pub struct Connection {
    db: NonNull<ffi::sqlite3>,
    config: AdapterConfig,
}

// The handle is opened in serialized (full mutex) mode.
unsafe impl Send for Connection {}

impl Connection {
    /// Open a database file with the environment configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, ENV_CONFIG.clone())
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: AdapterConfig) -> Result<Self> {
        let flags = OpenFlags::from_config(&config);
        Self::open_inner(path.as_ref(), flags, config)
    }

    pub fn open_with_flags(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self> {
        Self::open_inner(path.as_ref(), flags, ENV_CONFIG.clone())
    }

    fn open_inner(path: &Path, flags: OpenFlags, config: AdapterConfig) -> Result<Self> {
        let c_path = path_to_cstring(path)?;
        let mut raw: *mut ffi::sqlite3 = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_open_v2(
                c_path.as_ptr(),
                &mut raw,
                (flags | OpenFlags::FULL_MUTEX).bits(),
                ptr::null(),
            )
        };

        if rc != ffi::SQLITE_OK as c_int {
            // A handle is usually allocated even on failure and must be closed.
            let err = if raw.is_null() {
                error_from_code(rc)
            } else {
                let err = error_from_handle(raw, rc);
                unsafe { ffi::sqlite3_close(raw) };
                err
            };
            return Err(err);
        }

        let db = NonNull::new(raw).ok_or_else(|| error_from_code(ffi::SQLITE_NOMEM as c_int))?;
        let conn = Connection { db, config };

        if conn.config.extended_result_codes {
            unsafe { ffi::sqlite3_extended_result_codes(raw, 1) };
        }
        if conn.config.busy_timeout_ms > 0 {
            let ms = c_int::try_from(conn.config.busy_timeout_ms).unwrap_or(c_int::MAX);
            check(raw, unsafe { ffi::sqlite3_busy_timeout(raw, ms) })?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), flags = flags.bits(), "connection opened");

        Ok(conn)
    }

    /// Raw handle for registration calls. Valid for the lifetime of `self`.
    pub fn handle(&self) -> *mut ffi::sqlite3 {
        self.db.as_ptr()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Run one or more `;`-separated statements, discarding any rows.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let c_sql = CString::new(sql).map_err(|_| Error::misuse("SQL contains a NUL byte"))?;
        let mut errmsg: *mut c_char = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_exec(self.handle(), c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };
        if rc == ffi::SQLITE_OK as c_int {
            return Ok(());
        }

        let err = if errmsg.is_null() {
            error_from_handle(self.handle(), rc)
        } else {
            let message = unsafe { CStr::from_ptr(errmsg).to_string_lossy().into_owned() };
            unsafe { ffi::sqlite3_free(errmsg.cast()) };
            Error::Sqlite {
                code: sqlfn_core::ErrorCode::from_raw(rc),
                extended: unsafe { ffi::sqlite3_extended_errcode(self.handle()) },
                message,
            }
        };
        Err(err)
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        Statement::prepare(self, sql)
    }

    /// Every row of a single statement.
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        self.prepare(sql)?.query_rows()
    }

    /// First column of the first row, or `Null` when there are no rows.
    pub fn query_value(&self, sql: &str) -> Result<Value> {
        let mut stmt = self.prepare(sql)?;
        if stmt.step()? {
            Ok(stmt.column_value(0))
        } else {
            Ok(Value::Null)
        }
    }

    /// Message of the most recent failed call on this connection.
    pub fn last_error_message(&self) -> String {
        unsafe {
            let msg = ffi::sqlite3_errmsg(self.handle());
            if msg.is_null() {
                String::new()
            } else {
                CStr::from_ptr(msg).to_string_lossy().into_owned()
            }
        }
    }

    /// Close now and report failure. Registered functions are destroyed here.
    pub fn close(self) -> Result<()> {
        let raw = self.db.as_ptr();
        std::mem::forget(self);
        let rc = unsafe { ffi::sqlite3_close(raw) };
        #[cfg(feature = "tracing")]
        tracing::debug!(rc, "connection closed");
        if rc == ffi::SQLITE_OK as c_int {
            Ok(())
        } else {
            Err(error_from_code(rc))
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Statements borrow the connection, so none are alive here.
        unsafe { ffi::sqlite3_close(self.db.as_ptr()) };
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let s = path
        .to_str()
        .ok_or_else(|| Error::misuse(format!("path is not valid UTF-8: {}", path.display())))?;
    CString::new(s).map_err(|_| Error::misuse("path contains a NUL byte"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_flags_follow_config() {
        let mut cfg = AdapterConfig::default();
        assert_eq!(
            OpenFlags::from_config(&cfg),
            OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::URI
        );
        cfg.open_read_only = true;
        assert_eq!(
            OpenFlags::from_config(&cfg),
            OpenFlags::READ_ONLY | OpenFlags::URI
        );
    }

    #[test]
    fn close_after_statements_finalized() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE t(x); INSERT INTO t VALUES (1);")
            .expect("seed");
        {
            let mut stmt = conn.prepare("SELECT x FROM t").expect("prepare");
            assert!(stmt.step().expect("step"));
        }
        assert_eq!(conn.query_value("SELECT count(*) FROM t").expect("query"), Value::Integer(1));
        conn.close().expect("close succeeds once statements are gone");
    }

    #[test]
    fn batch_errors_carry_engine_message() {
        let conn = Connection::open_in_memory().expect("open");
        let err = conn
            .execute_batch("CREATE TABLE t(x); SELECT nope FROM t;")
            .expect_err("unknown column");
        match err {
            Error::Sqlite { message, .. } => assert!(message.contains("nope")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
