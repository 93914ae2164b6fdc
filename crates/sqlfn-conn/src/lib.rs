//! sqlfn-conn: the connection that functions get registered on.
//!
//! A deliberately small RAII layer over the engine's connection and statement
//! handles:
//! - open/close with flags taken from `AdapterConfig`
//! - `execute_batch` for DDL/DML scripts
//! - prepared statements with `Value` binding and row reading
//!
//! Function, aggregate and collation registration is in `sqlfn-func`, which
//! only needs [`Connection::handle`].

pub mod connection;
pub mod error;
pub mod statement;

pub use connection::{Connection, OpenFlags};
pub use statement::Statement;
