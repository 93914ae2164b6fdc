//! Static classification of callables and their storage.

use std::mem::{needs_drop, size_of};

use serde::{Deserialize, Serialize};

use crate::signature::ScalarCallable;

/// Empty and trivially destructible: can be materialized from nothing, so
/// registering it needs no storage at all.
pub const fn is_stateless<T>() -> bool {
    size_of::<T>() == 0 && !needs_drop::<T>()
}

/// Where a registration's callable (or aggregate control block) lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageMode {
    /// Nothing allocated; the trampoline materializes the value.
    Stateless,
    /// Caller-owned `'static` reference; the engine never frees it.
    Unmanaged,
    /// One engine-allocated block, freed by the engine's destructor callback.
    Managed,
}

/// Runtime summary of a callable's shape. Argument and return types stay at
/// the type level, in the `ScalarCallable<M>` impl that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallableSignature {
    pub arity: usize,
    pub needs_context: bool,
    pub stateless: bool,
}

pub fn signature_of<F, M>(_callable: &F) -> CallableSignature
where
    F: ScalarCallable<M>,
{
    CallableSignature {
        arity: F::ARITY,
        needs_context: F::NEEDS_CONTEXT,
        stateless: is_stateless::<F>(),
    }
}
