//! Borrowed views over the engine's argument vector.

use std::ffi::c_int;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::slice;

use libsqlite3_sys as ffi;
use sqlfn_core::{Error, Result, Value, ValueType};

use crate::marshal::FromValue;

/// One argument of the current call.
///
/// Reading text or blob may convert the value in place, which invalidates
/// slices from earlier reads; those readers therefore take `&mut self`.
pub struct ValueRef<'a> {
    raw: NonNull<ffi::sqlite3_value>,
    _call: PhantomData<&'a mut ffi::sqlite3_value>,
}

impl<'a> ValueRef<'a> {
    /// # Safety
    /// `raw` must be a protected value of the callback currently executing.
    pub(crate) unsafe fn from_raw(raw: *mut ffi::sqlite3_value) -> Option<Self> {
        NonNull::new(raw).map(|raw| ValueRef {
            raw,
            _call: PhantomData,
        })
    }

    fn ptr(&self) -> *mut ffi::sqlite3_value {
        self.raw.as_ptr()
    }

    pub fn value_type(&self) -> ValueType {
        ValueType::from_raw(unsafe { ffi::sqlite3_value_type(self.ptr()) })
    }

    pub fn is_null(&self) -> bool {
        self.value_type() == ValueType::Null
    }

    pub fn as_i64(&self) -> i64 {
        unsafe { ffi::sqlite3_value_int64(self.ptr()) }
    }

    /// Narrowed by the engine (truncating), not range-checked.
    pub fn as_i32(&self) -> i32 {
        unsafe { ffi::sqlite3_value_int(self.ptr()) }
    }

    pub fn as_f64(&self) -> f64 {
        unsafe { ffi::sqlite3_value_double(self.ptr()) }
    }

    /// UTF-8 bytes of the value as text (empty for NULL).
    pub fn text(&mut self) -> &[u8] {
        unsafe {
            // text before bytes: the conversion must happen before measuring.
            let text = ffi::sqlite3_value_text(self.ptr());
            if text.is_null() {
                return &[];
            }
            let len = ffi::sqlite3_value_bytes(self.ptr()) as usize;
            slice::from_raw_parts(text, len)
        }
    }

    /// Bytes of the value as a blob (empty for NULL and zero-length blobs).
    pub fn blob(&mut self) -> &[u8] {
        unsafe {
            let blob = ffi::sqlite3_value_blob(self.ptr());
            let len = ffi::sqlite3_value_bytes(self.ptr()) as usize;
            if blob.is_null() || len == 0 {
                return &[];
            }
            slice::from_raw_parts(blob.cast::<u8>(), len)
        }
    }

    /// Owned copy in the value's own storage class.
    pub fn to_value(&mut self) -> Value {
        match self.value_type() {
            ValueType::Integer => Value::Integer(self.as_i64()),
            ValueType::Real => Value::Real(self.as_f64()),
            ValueType::Text => Value::Text(String::from_utf8_lossy(self.text()).into_owned()),
            ValueType::Blob => Value::Blob(self.blob().to_vec()),
            ValueType::Null => Value::Null,
        }
    }

    pub fn as_raw(&self) -> RawValue {
        RawValue(self.raw)
    }
}

/// Untouched handle to an argument, for callables that want to inspect the
/// engine value themselves. Only valid during the call it was received in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawValue(NonNull<ffi::sqlite3_value>);

impl RawValue {
    pub fn as_ptr(self) -> *mut ffi::sqlite3_value {
        self.0.as_ptr()
    }

    /// # Safety
    /// Must be called during the invocation that produced this handle.
    pub unsafe fn as_value_ref<'a>(self) -> ValueRef<'a> {
        ValueRef {
            raw: self.0,
            _call: PhantomData,
        }
    }
}

/// The SQL-visible arguments of one call.
pub struct Args<'a> {
    argv: &'a [*mut ffi::sqlite3_value],
}

impl<'a> Args<'a> {
    /// # Safety
    /// `argc`/`argv` must be the argument vector of the callback currently
    /// executing.
    pub(crate) unsafe fn from_raw(argc: c_int, argv: *mut *mut ffi::sqlite3_value) -> Self {
        let argv: &'a [*mut ffi::sqlite3_value] = if argc <= 0 || argv.is_null() {
            &[]
        } else {
            slice::from_raw_parts(argv, argc as usize)
        };
        Args { argv }
    }

    pub fn len(&self) -> usize {
        self.argv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    /// View of argument `index`. One view at a time keeps earlier text/blob
    /// slices valid.
    pub fn get(&mut self, index: usize) -> Result<ValueRef<'_>> {
        let raw = self.argv.get(index).copied().ok_or(Error::Range {
            index,
            argc: self.argv.len(),
        })?;
        unsafe { ValueRef::from_raw(raw) }
            .ok_or_else(|| Error::misuse(format!("argument {index} is a null handle")))
    }

    /// Marshal argument `*index` into `T` and advance.
    pub(crate) fn take<T: FromValue>(&mut self, index: &mut usize) -> Result<T> {
        let value = T::from_value(self.get(*index)?)?;
        *index += 1;
        Ok(value)
    }
}
