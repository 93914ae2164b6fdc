//! sqlfn-func: host callables as engine callbacks.
//!
//! This crate turns Rust callables into the C callbacks the engine expects:
//! - `signature`: which callables are accepted as scalar functions, with
//!   arity and context use derived at compile time
//! - `marshal`: `FromValue` / `ToResult`, the per-type argument and result
//!   conversions (extensible by applications)
//! - `trampoline`: the `extern "C"` entry points and the boundary that turns
//!   errors and panics into engine error results
//! - `ownership`: stateless, unmanaged, and engine-managed storage
//! - `aggregate`: per-group instance lifecycle for aggregate and window
//!   functions
//! - `function` / `collation`: the registration façade
//!
//! ```
//! use sqlfn_conn::Connection;
//! use sqlfn_core::{FunctionFlags, Value};
//! use sqlfn_func::{register_function, Context, StorageMode};
//!
//! fn add_one(x: i64) -> i64 {
//!     x + 1
//! }
//!
//! let conn = Connection::open_in_memory()?;
//! let reg = register_function(&conn, "add_one", FunctionFlags::DETERMINISTIC, add_one)?;
//! assert_eq!(reg.storage, StorageMode::Stateless);
//! assert_eq!(conn.query_value("SELECT add_one(41)")?, Value::Integer(42));
//!
//! // A context parameter lets the callable set the result itself.
//! register_function(&conn, "shout", FunctionFlags::NONE, |ctx: &Context, s: String| {
//!     ctx.set_result(s.to_uppercase());
//! })?;
//! assert_eq!(conn.query_value("SELECT shout('hi')")?, Value::Text("HI".into()));
//! # Ok::<(), sqlfn_core::Error>(())
//! ```

pub mod aggregate;
pub mod classify;
pub mod collation;
pub mod context;
pub mod function;
pub mod marshal;
mod ownership;
pub mod prelude;
pub mod signature;
mod trampoline;
pub mod value;

pub use aggregate::{
    create_aggregate, create_window_function, Aggregate, Construct, StepArgs, WindowAggregate,
};
pub use classify::{is_stateless, signature_of, CallableSignature, StorageMode};
pub use collation::{
    create_collation_with, register_collation, register_collation_ref, remove_collation,
    Collation,
};
pub use context::Context;
pub use function::{
    create_function_with, register_function, register_function_ref, remove_function,
    Registration, RegistrationKind,
};
pub use marshal::{BoxError, ContextReturn, FromValue, Null, ToResult};
pub use signature::{ScalarCallable, MAX_ARITY};
pub use value::{Args, RawValue, ValueRef};
