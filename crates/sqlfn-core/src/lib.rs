#![forbid(unsafe_code)]
//! sqlfn-core: shared vocabulary for the sqlfn crates.
//!
//! - The error taxonomy every registration and callback outcome is classified into
//! - The engine's primary result codes (`ErrorCode`)
//! - Function registration flags and text encodings
//! - A dynamic `Value` mirroring the engine's five storage classes
//! - Adapter configuration (serde + environment overrides)
//!
//! Nothing here talks to the engine; the FFI lives in `sqlfn-mem`, `sqlfn-conn`
//! and `sqlfn-func`.

pub mod config;
pub mod error;
pub mod flags;
pub mod prelude;
pub mod types;

pub use config::AdapterConfig;
pub use error::{Error, ErrorCode, Result};
pub use flags::{FunctionFlags, TextEncoding};
pub use types::{Value, ValueType};
