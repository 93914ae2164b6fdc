//! Convenient re-exports for downstream crates.

pub use crate::config::AdapterConfig;
pub use crate::error::{Error, ErrorCode, Result};
pub use crate::flags::{FunctionFlags, TextEncoding};
pub use crate::types::{Value, ValueType};
