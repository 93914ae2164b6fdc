//! Convenient re-exports for applications registering functions.

pub use crate::aggregate::{
    create_aggregate, create_window_function, Aggregate, Construct, WindowAggregate,
};
pub use crate::collation::{register_collation, Collation};
pub use crate::context::Context;
pub use crate::function::{register_function, Registration};
pub use crate::marshal::{FromValue, Null, ToResult};
pub use crate::value::{RawValue, ValueRef};
pub use sqlfn_core::prelude::*;
