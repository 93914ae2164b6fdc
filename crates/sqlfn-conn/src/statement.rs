//! Prepared statements.

use std::ffi::{c_char, c_int, c_uchar, c_void};
use std::ptr::{self, NonNull};
use std::slice;

use libsqlite3_sys as ffi;
use sqlfn_core::{Error, Result, Value, ValueType};

use crate::connection::Connection;
use crate::error::{check, error_from_handle};

pub struct Statement<'conn> {
    conn: &'conn Connection,
    stmt: NonNull<ffi::sqlite3_stmt>,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn prepare(conn: &'conn Connection, sql: &str) -> Result<Self> {
        let len = c_int::try_from(sql.len()).map_err(|_| Error::misuse("SQL text too long"))?;
        let mut raw: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                conn.handle(),
                sql.as_ptr().cast::<c_char>(),
                len,
                &mut raw,
                ptr::null_mut(),
            )
        };
        check(conn.handle(), rc)?;
        let stmt = NonNull::new(raw).ok_or_else(|| Error::misuse("SQL contains no statement"))?;
        Ok(Statement { conn, stmt })
    }

    fn raw(&self) -> *mut ffi::sqlite3_stmt {
        self.stmt.as_ptr()
    }

    /// Advance to the next row. `Ok(false)` once the statement is done.
    pub fn step(&mut self) -> Result<bool> {
        let rc = unsafe { ffi::sqlite3_step(self.raw()) };
        match rc {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => Ok(false),
            _ => Err(error_from_handle(self.conn.handle(), rc)),
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        let rc = unsafe { ffi::sqlite3_reset(self.raw()) };
        check(self.conn.handle(), rc)
    }

    pub fn column_count(&self) -> usize {
        unsafe { ffi::sqlite3_column_count(self.raw()) as usize }
    }

    pub fn column_type(&self, index: usize) -> ValueType {
        ValueType::from_raw(unsafe { ffi::sqlite3_column_type(self.raw(), index as c_int) })
    }

    pub fn column_i64(&self, index: usize) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.raw(), index as c_int) }
    }

    pub fn column_f64(&self, index: usize) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.raw(), index as c_int) }
    }

    /// Text of the column; `None` for NULL. Invalid UTF-8 is replaced.
    pub fn column_text(&self, index: usize) -> Option<String> {
        unsafe {
            let text = ffi::sqlite3_column_text(self.raw(), index as c_int);
            if text.is_null() {
                return None;
            }
            let len = ffi::sqlite3_column_bytes(self.raw(), index as c_int) as usize;
            let bytes = slice::from_raw_parts(text, len);
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    pub fn column_blob(&self, index: usize) -> Vec<u8> {
        unsafe {
            let blob = ffi::sqlite3_column_blob(self.raw(), index as c_int);
            let len = ffi::sqlite3_column_bytes(self.raw(), index as c_int) as usize;
            if blob.is_null() || len == 0 {
                return Vec::new();
            }
            slice::from_raw_parts(blob.cast::<u8>(), len).to_vec()
        }
    }

    pub fn column_value(&self, index: usize) -> Value {
        match self.column_type(index) {
            ValueType::Integer => Value::Integer(self.column_i64(index)),
            ValueType::Real => Value::Real(self.column_f64(index)),
            ValueType::Text => self.column_text(index).map_or(Value::Null, Value::Text),
            ValueType::Blob => Value::Blob(self.column_blob(index)),
            ValueType::Null => Value::Null,
        }
    }

    /// Bind `value` to the 1-based parameter `index`.
    pub fn bind_value(&mut self, index: usize, value: &Value) -> Result<()> {
        let idx = c_int::try_from(index).map_err(|_| Error::Range { index, argc: 0 })?;
        let rc = unsafe {
            match value {
                Value::Null => ffi::sqlite3_bind_null(self.raw(), idx),
                Value::Integer(v) => ffi::sqlite3_bind_int64(self.raw(), idx, *v),
                Value::Real(v) => ffi::sqlite3_bind_double(self.raw(), idx, *v),
                Value::Text(s) => ffi::sqlite3_bind_text64(
                    self.raw(),
                    idx,
                    s.as_ptr().cast::<c_char>(),
                    s.len() as ffi::sqlite3_uint64,
                    ffi::SQLITE_TRANSIENT(),
                    ffi::SQLITE_UTF8 as c_uchar,
                ),
                Value::Blob(b) => ffi::sqlite3_bind_blob64(
                    self.raw(),
                    idx,
                    b.as_ptr().cast::<c_void>(),
                    b.len() as ffi::sqlite3_uint64,
                    ffi::SQLITE_TRANSIENT(),
                ),
            }
        };
        check(self.conn.handle(), rc)
    }

    pub fn bind_values(&mut self, values: &[Value]) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            self.bind_value(i + 1, value)?;
        }
        Ok(())
    }

    pub fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if !self.step()? {
            return Ok(None);
        }
        let row = (0..self.column_count())
            .map(|i| self.column_value(i))
            .collect();
        Ok(Some(row))
    }

    pub fn query_rows(&mut self) -> Result<Vec<Vec<Value>>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        unsafe { ffi::sqlite3_finalize(self.raw()) };
    }
}
