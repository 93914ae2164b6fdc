//! sqlfn: Rust callables as SQLite scalar functions, aggregates, window
//! functions and collations.
//!
//! This crate re-exports the workspace:
//! - [`base`]: errors, result codes, flags, values, configuration
//! - [`mem`]: engine-allocator storage and allocation tracking
//! - [`conn`]: connection and statement handles
//! - [`func`]: the registration façade and marshaling traits
//!
//! Most applications only need the top-level re-exports.

pub use sqlfn_conn as conn;
pub use sqlfn_core as base;
pub use sqlfn_func as func;
pub use sqlfn_mem as mem;

pub use sqlfn_conn::{Connection, OpenFlags, Statement};
pub use sqlfn_core::{AdapterConfig, Error, ErrorCode, FunctionFlags, Result, Value, ValueType};
pub use sqlfn_func::{
    create_aggregate, create_collation_with, create_function_with, create_window_function,
    register_collation, register_collation_ref, register_function, register_function_ref,
    remove_collation, remove_function, Aggregate, Collation, Construct, Context, FromValue, Null,
    RawValue, Registration, RegistrationKind, StorageMode, ToResult, ValueRef, WindowAggregate,
};
