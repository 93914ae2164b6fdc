use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical result for sqlfn.
pub type Result<T> = std::result::Result<T, Error>;

/// Primary result codes of the engine.
///
/// Extended codes carry the primary code in their low byte and fold into it
/// through [`ErrorCode::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    Error = 1,
    Internal = 2,
    Perm = 3,
    Abort = 4,
    Busy = 5,
    Locked = 6,
    NoMem = 7,
    ReadOnly = 8,
    Interrupt = 9,
    IoErr = 10,
    Corrupt = 11,
    NotFound = 12,
    Full = 13,
    CantOpen = 14,
    Protocol = 15,
    Empty = 16,
    Schema = 17,
    TooBig = 18,
    Constraint = 19,
    Mismatch = 20,
    Misuse = 21,
    NoLfs = 22,
    Auth = 23,
    Format = 24,
    Range = 25,
    NotADb = 26,
    Notice = 27,
    Warning = 28,
    Row = 100,
    Done = 101,
}

impl ErrorCode {
    /// Map a raw (possibly extended) code to its primary code.
    /// Unknown codes become `Error`.
    pub fn from_raw(raw: i32) -> Self {
        match raw & 0xff {
            0 => ErrorCode::Ok,
            1 => ErrorCode::Error,
            2 => ErrorCode::Internal,
            3 => ErrorCode::Perm,
            4 => ErrorCode::Abort,
            5 => ErrorCode::Busy,
            6 => ErrorCode::Locked,
            7 => ErrorCode::NoMem,
            8 => ErrorCode::ReadOnly,
            9 => ErrorCode::Interrupt,
            10 => ErrorCode::IoErr,
            11 => ErrorCode::Corrupt,
            12 => ErrorCode::NotFound,
            13 => ErrorCode::Full,
            14 => ErrorCode::CantOpen,
            15 => ErrorCode::Protocol,
            16 => ErrorCode::Empty,
            17 => ErrorCode::Schema,
            18 => ErrorCode::TooBig,
            19 => ErrorCode::Constraint,
            20 => ErrorCode::Mismatch,
            21 => ErrorCode::Misuse,
            22 => ErrorCode::NoLfs,
            23 => ErrorCode::Auth,
            24 => ErrorCode::Format,
            25 => ErrorCode::Range,
            26 => ErrorCode::NotADb,
            27 => ErrorCode::Notice,
            28 => ErrorCode::Warning,
            100 => ErrorCode::Row,
            101 => ErrorCode::Done,
            _ => ErrorCode::Error,
        }
    }

    pub fn raw(self) -> i32 {
        self as i32
    }

    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }

    pub fn is_row(self) -> bool {
        self == ErrorCode::Row
    }

    pub fn is_done(self) -> bool {
        self == ErrorCode::Done
    }

    /// Anything other than `Ok`, `Row` and `Done`.
    pub fn is_error(self) -> bool {
        !matches!(self, ErrorCode::Ok | ErrorCode::Row | ErrorCode::Done)
    }

    /// Short human-readable description, in the engine's wording.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Ok => "not an error",
            ErrorCode::Error => "SQL logic error",
            ErrorCode::Internal => "internal logic error",
            ErrorCode::Perm => "access permission denied",
            ErrorCode::Abort => "query aborted",
            ErrorCode::Busy => "database is locked",
            ErrorCode::Locked => "database table is locked",
            ErrorCode::NoMem => "out of memory",
            ErrorCode::ReadOnly => "attempt to write a readonly database",
            ErrorCode::Interrupt => "interrupted",
            ErrorCode::IoErr => "disk I/O error",
            ErrorCode::Corrupt => "database disk image is malformed",
            ErrorCode::NotFound => "unknown operation",
            ErrorCode::Full => "database or disk is full",
            ErrorCode::CantOpen => "unable to open database file",
            ErrorCode::Protocol => "locking protocol",
            ErrorCode::Empty => "empty",
            ErrorCode::Schema => "database schema has changed",
            ErrorCode::TooBig => "string or blob too big",
            ErrorCode::Constraint => "constraint failed",
            ErrorCode::Mismatch => "datatype mismatch",
            ErrorCode::Misuse => "bad parameter or other API misuse",
            ErrorCode::NoLfs => "large file support is disabled",
            ErrorCode::Auth => "authorization denied",
            ErrorCode::Format => "auxiliary database format error",
            ErrorCode::Range => "column index out of range",
            ErrorCode::NotADb => "file is not a database",
            ErrorCode::Notice => "notification message",
            ErrorCode::Warning => "warning message",
            ErrorCode::Row => "another row available",
            ErrorCode::Done => "no more rows available",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.raw())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Engine-owned storage could not be obtained, or the value could not be
    /// constructed inside it.
    #[error("allocation failed for {bytes} bytes ({what})")]
    AllocationFailed { what: &'static str, bytes: usize },

    /// The engine refused a registration call.
    #[error("registration of '{name}' rejected: {code}: {message}")]
    RegistrationRejected {
        name: String,
        code: ErrorCode,
        message: String,
    },

    #[error("argument index {index} out of range ({argc} arguments)")]
    Range { index: usize, argc: usize },

    #[error("misuse: {0}")]
    Misuse(String),

    /// A value could not be represented as the requested host type.
    #[error("type mismatch: {0}")]
    Mismatch(String),

    /// Failure raised by a user callable.
    #[error("{message}")]
    Callable { code: ErrorCode, message: String },

    /// Failure reported by the engine for a connection or statement operation.
    #[error("sqlite error {code}: {message}")]
    Sqlite {
        code: ErrorCode,
        extended: i32,
        message: String,
    },
}

impl Error {
    /// A host-callable failure reported with the generic error code.
    pub fn user(message: impl Into<String>) -> Self {
        Error::Callable {
            code: ErrorCode::Error,
            message: message.into(),
        }
    }

    /// A host-callable failure reported with an explicit engine code.
    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Error::Callable {
            code,
            message: message.into(),
        }
    }

    pub fn misuse(message: impl Into<String>) -> Self {
        Error::Misuse(message.into())
    }

    /// The engine code used when this error crosses into a result channel.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::AllocationFailed { .. } => ErrorCode::NoMem,
            Error::RegistrationRejected { code, .. } => *code,
            Error::Range { .. } => ErrorCode::Range,
            Error::Misuse(_) => ErrorCode::Misuse,
            Error::Mismatch(_) => ErrorCode::Mismatch,
            Error::Callable { code, .. } => *code,
            Error::Sqlite { code, .. } => *code,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Misuse(format!("invalid configuration: {e}"))
    }
}
