//! Callable shapes accepted as scalar functions.
//!
//! A callable is any `Fn(A1, .., An) -> R` with `R: ToResult`, or any
//! `Fn(&Context, A1, .., An) -> R` with `R: ContextReturn` (which includes
//! `()`, for callables that set the result themselves). The marker type
//! parameter keeps the two families of impls apart; callers never name it.
//!
//! Every `Ai` must implement `FromValue`. Returning nothing without taking
//! the context does not compile, because nothing would set the result:
//!
//! ```compile_fail
//! # use sqlfn_conn::Connection;
//! # use sqlfn_core::FunctionFlags;
//! let conn = Connection::open_in_memory().unwrap();
//! sqlfn_func::register_function(&conn, "noop", FunctionFlags::NONE, |_x: i64| {});
//! ```
//!
//! Argument types without a `FromValue` impl are rejected the same way:
//!
//! ```compile_fail
//! # use sqlfn_conn::Connection;
//! # use sqlfn_core::FunctionFlags;
//! struct Opaque;
//! let conn = Connection::open_in_memory().unwrap();
//! sqlfn_func::register_function(&conn, "f", FunctionFlags::NONE, |_x: Opaque| 1i64);
//! ```

use std::marker::PhantomData;

use sqlfn_core::Result;

use crate::context::Context;
use crate::marshal::{ContextReturn, FromValue, ToResult};
use crate::value::Args;

/// Most SQL-visible arguments the engine accepts for one function.
pub const MAX_ARITY: usize = 127;

/// Marker for callables without a context parameter.
pub struct Plain<A>(PhantomData<fn(A)>);

/// Marker for callables whose first parameter is `&Context`.
pub struct WithContext<A>(PhantomData<fn(A)>);

pub trait ScalarCallable<Marker> {
    /// Number of SQL-visible arguments.
    const ARITY: usize;
    const NEEDS_CONTEXT: bool;

    #[doc(hidden)]
    const ARITY_OK: () = assert!(
        Self::ARITY <= MAX_ARITY,
        "a SQL function takes at most 127 arguments"
    );

    /// Marshal `args`, call, and route the return value into `ctx`.
    fn invoke(&self, ctx: &Context, args: &mut Args<'_>) -> Result<()>;
}

macro_rules! one {
    ($x:ident) => {
        1
    };
}

macro_rules! impl_scalar_callable {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> ScalarCallable<Plain<($($arg,)*)>> for Func
        where
            Func: Fn($($arg),*) -> Ret,
            Ret: ToResult,
            $($arg: FromValue,)*
        {
            const ARITY: usize = 0 $(+ one!($arg))*;
            const NEEDS_CONTEXT: bool = false;

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, ctx: &Context, args: &mut Args<'_>) -> Result<()> {
                let mut index = 0usize;
                $(let $arg = args.take::<$arg>(&mut index)?;)*
                (self)($($arg),*).set_result(ctx);
                Ok(())
            }
        }

        impl<Func, Ret, $($arg,)*> ScalarCallable<WithContext<($($arg,)*)>> for Func
        where
            Func: Fn(&Context, $($arg),*) -> Ret,
            Ret: ContextReturn,
            $($arg: FromValue,)*
        {
            const ARITY: usize = 0 $(+ one!($arg))*;
            const NEEDS_CONTEXT: bool = true;

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, ctx: &Context, args: &mut Args<'_>) -> Result<()> {
                let mut index = 0usize;
                $(let $arg = args.take::<$arg>(&mut index)?;)*
                (self)(ctx, $($arg),*).finish(ctx);
                Ok(())
            }
        }
    };
}

impl_scalar_callable!();
impl_scalar_callable!(A1);
impl_scalar_callable!(A1, A2);
impl_scalar_callable!(A1, A2, A3);
impl_scalar_callable!(A1, A2, A3, A4);
impl_scalar_callable!(A1, A2, A3, A4, A5);
impl_scalar_callable!(A1, A2, A3, A4, A5, A6);
impl_scalar_callable!(A1, A2, A3, A4, A5, A6, A7);
impl_scalar_callable!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_scalar_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_scalar_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_scalar_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_scalar_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);
