//! Aggregate and window functions.
//!
//! An aggregate is a type implementing [`Aggregate`]. One instance exists per
//! group; it lives in the engine's per-group memory, is built on first use
//! from the arguments captured at registration ([`Construct`]), and is
//! destroyed exactly once, right after `final` produced the group's result.
//!
//! ```
//! use sqlfn_conn::Connection;
//! use sqlfn_core::{FunctionFlags, Result, Value};
//! use sqlfn_func::{create_aggregate, Aggregate};
//!
//! #[derive(Default)]
//! struct Sum(i64);
//!
//! impl Aggregate for Sum {
//!     type Args<'c> = (i64,);
//!     type Output = i64;
//!
//!     fn step(&mut self, (x,): (i64,)) -> Result<()> {
//!         self.0 += x;
//!         Ok(())
//!     }
//!
//!     fn value(&self) -> i64 {
//!         self.0
//!     }
//! }
//!
//! let conn = Connection::open_in_memory()?;
//! create_aggregate::<Sum, ()>(&conn, "my_sum", FunctionFlags::NONE, ())?;
//! conn.execute_batch("CREATE TABLE t(x); INSERT INTO t VALUES (1), (2), (3);")?;
//! assert_eq!(conn.query_value("SELECT my_sum(x) FROM t")?, Value::Integer(6));
//! # Ok::<(), sqlfn_core::Error>(())
//! ```
//!
//! Constructors cannot fail; returning a `Result` from one does not compile:
//!
//! ```compile_fail
//! use sqlfn_func::Construct;
//! struct Scaled(f64);
//! impl Construct<f64> for Scaled {
//!     fn construct(factor: &f64) -> Result<Self, String> {
//!         Ok(Scaled(*factor))
//!     }
//! }
//! ```
//!
//! `inverse` must take exactly the arguments `step` takes:
//!
//! ```compile_fail
//! use sqlfn_core::Result;
//! use sqlfn_func::{Aggregate, WindowAggregate};
//! #[derive(Default)]
//! struct Total(f64);
//! impl Aggregate for Total {
//!     type Args<'c> = (f64,);
//!     type Output = f64;
//!     fn step(&mut self, (x,): (f64,)) -> Result<()> { self.0 += x; Ok(()) }
//!     fn value(&self) -> f64 { self.0 }
//! }
//! impl WindowAggregate for Total {
//!     fn inverse(&mut self, (x,): (i64,)) -> Result<()> { self.0 -= x as f64; Ok(()) }
//! }
//! ```

use std::ffi::c_int;
use std::marker::PhantomData;

use libsqlite3_sys as ffi;
use sqlfn_conn::Connection;
use sqlfn_core::{Error, FunctionFlags, Result};
use sqlfn_mem::aggregate_slot;

use crate::context::Context;
use crate::function::{finish_registration, function_name, Registration, RegistrationKind};
use crate::marshal::{FromValue, ToResult};
use crate::ownership::{recover, Storage};
use crate::signature::MAX_ARITY;
use crate::trampoline::absorb;
use crate::value::Args;

/// Arguments of one `step`/`inverse` call: a tuple of `FromValue` types,
/// optionally led by `&Context`.
pub trait StepArgs<'c>: Sized {
    /// Number of SQL-visible arguments.
    const ARITY: usize;
    const NEEDS_CONTEXT: bool;

    fn extract(ctx: &'c Context, args: &mut Args<'_>) -> Result<Self>;
}

macro_rules! one {
    ($x:ident) => {
        1
    };
}

macro_rules! impl_step_args {
    ($($arg:ident),*) => {
        impl<'c, $($arg: FromValue,)*> StepArgs<'c> for ($($arg,)*) {
            const ARITY: usize = 0 $(+ one!($arg))*;
            const NEEDS_CONTEXT: bool = false;

            #[allow(unused_mut, unused_variables)]
            fn extract(_ctx: &'c Context, args: &mut Args<'_>) -> Result<Self> {
                let mut index = 0usize;
                Ok(($(args.take::<$arg>(&mut index)?,)*))
            }
        }

        impl<'c, $($arg: FromValue,)*> StepArgs<'c> for (&'c Context, $($arg,)*) {
            const ARITY: usize = 0 $(+ one!($arg))*;
            const NEEDS_CONTEXT: bool = true;

            #[allow(unused_mut, unused_variables)]
            fn extract(ctx: &'c Context, args: &mut Args<'_>) -> Result<Self> {
                let mut index = 0usize;
                Ok((ctx, $(args.take::<$arg>(&mut index)?,)*))
            }
        }
    };
}

impl_step_args!();
impl_step_args!(A1);
impl_step_args!(A1, A2);
impl_step_args!(A1, A2, A3);
impl_step_args!(A1, A2, A3, A4);
impl_step_args!(A1, A2, A3, A4, A5);
impl_step_args!(A1, A2, A3, A4, A5, A6);
impl_step_args!(A1, A2, A3, A4, A5, A6, A7);
impl_step_args!(A1, A2, A3, A4, A5, A6, A7, A8);

pub trait Aggregate: Send + 'static {
    /// SQL-visible arguments of `step` (and `inverse`).
    type Args<'c>: StepArgs<'c>;
    type Output: ToResult;

    fn step(&mut self, args: Self::Args<'_>) -> Result<()>;

    /// Current result. Called by `final`, and by `value` for window frames.
    fn value(&self) -> Self::Output;
}

/// Aggregates that can remove a row from their state, enabling sliding
/// window frames without recomputation.
pub trait WindowAggregate: Aggregate {
    fn inverse(&mut self, args: Self::Args<'_>) -> Result<()>;
}

/// Builds an aggregate instance from the arguments captured at registration.
pub trait Construct<A>: Sized {
    fn construct(args: &A) -> Self;
}

impl<T: Default> Construct<()> for T {
    fn construct(_args: &()) -> Self {
        T::default()
    }
}

/// Per-registration state shared by all groups: the constructor arguments.
/// Zero-sized (and therefore unallocated) when there are none.
struct ControlBlock<T, A> {
    args: A,
    _instance: PhantomData<fn() -> T>,
}

impl<T: Construct<A>, A> ControlBlock<T, A> {
    fn new(args: A) -> Self {
        Self {
            args,
            _instance: PhantomData,
        }
    }

    fn construct(&self) -> T {
        T::construct(&self.args)
    }
}

struct ArityCheck<T>(PhantomData<T>);

impl<T: Aggregate> ArityCheck<T> {
    const ARITY: usize = <T::Args<'static> as StepArgs<'static>>::ARITY;
    const OK: () = assert!(
        Self::ARITY <= MAX_ARITY,
        "a SQL function takes at most 127 arguments"
    );
}

fn extract_args<'c, T: Aggregate>(ctx: &'c Context, args: &mut Args<'_>) -> Result<T::Args<'c>> {
    <T::Args<'c> as StepArgs<'c>>::extract(ctx, args)
}

/// The group's instance, constructed on first access.
///
/// # Safety
/// Must run inside an aggregate callback registered with `ControlBlock<T, A>`.
unsafe fn instance<'a, T, A>(ctx: &Context) -> Result<&'a mut T>
where
    T: Aggregate + Construct<A>,
    A: 'static,
{
    let slot = aggregate_slot::<T>(ctx.as_ptr())?;
    let control = recover::<ControlBlock<T, A>>(ctx.user_data())?;
    Ok(slot.get_or_init(|| control.construct())?)
}

unsafe extern "C" fn step_trampoline<T, A>(
    raw: *mut ffi::sqlite3_context,
    argc: c_int,
    argv: *mut *mut ffi::sqlite3_value,
) where
    T: Aggregate + Construct<A>,
    A: 'static,
{
    absorb(raw, "aggregate step", |ctx| {
        let agg = instance::<T, A>(ctx)?;
        let mut args = Args::from_raw(argc, argv);
        agg.step(extract_args::<T>(ctx, &mut args)?)
    });
}

unsafe extern "C" fn inverse_trampoline<T, A>(
    raw: *mut ffi::sqlite3_context,
    argc: c_int,
    argv: *mut *mut ffi::sqlite3_value,
) where
    T: WindowAggregate + Construct<A>,
    A: 'static,
{
    absorb(raw, "aggregate inverse", |ctx| {
        let agg = instance::<T, A>(ctx)?;
        let mut args = Args::from_raw(argc, argv);
        agg.inverse(extract_args::<T>(ctx, &mut args)?)
    });
}

unsafe extern "C" fn value_trampoline<T, A>(raw: *mut ffi::sqlite3_context)
where
    T: Aggregate + Construct<A>,
    A: 'static,
{
    absorb(raw, "aggregate value", |ctx| {
        let agg = instance::<T, A>(ctx)?;
        agg.value().set_result(ctx);
        Ok(())
    });
}

/// Also runs when a statement is reset mid-aggregation; the result is then
/// discarded but the instance is still destroyed.
unsafe extern "C" fn final_trampoline<T, A>(raw: *mut ffi::sqlite3_context)
where
    T: Aggregate + Construct<A>,
    A: 'static,
{
    absorb(raw, "aggregate final", |ctx| {
        let slot = aggregate_slot::<T>(ctx.as_ptr())?;
        let control = recover::<ControlBlock<T, A>>(ctx.user_data())?;
        // Empty groups never saw a step; they still get a result.
        slot.get_or_init(|| control.construct())?;
        let agg = slot
            .take()
            .ok_or_else(|| Error::misuse("aggregate instance missing at final"))?;
        agg.value().set_result(ctx);
        drop(agg);
        Ok(())
    });
}

/// Register `T` as a plain aggregate (`step` + `final`).
///
/// `args` is captured once and handed to `T::construct` for every group.
pub fn create_aggregate<T, A>(
    conn: &Connection,
    name: &str,
    flags: FunctionFlags,
    args: A,
) -> Result<Registration>
where
    T: Aggregate + Construct<A>,
    A: Send + 'static,
{
    install::<T, A>(conn, name, flags, args, RegistrationKind::Aggregate, None, None)
}

/// Register `T` as an aggregate usable with sliding window frames
/// (`step`, `inverse`, `value`, `final`).
pub fn create_window_function<T, A>(
    conn: &Connection,
    name: &str,
    flags: FunctionFlags,
    args: A,
) -> Result<Registration>
where
    T: WindowAggregate + Construct<A>,
    A: Send + 'static,
{
    install::<T, A>(
        conn,
        name,
        flags,
        args,
        RegistrationKind::Window,
        Some(value_trampoline::<T, A>),
        Some(inverse_trampoline::<T, A>),
    )
}

type ValueFn = unsafe extern "C" fn(*mut ffi::sqlite3_context);
type StepFn = unsafe extern "C" fn(*mut ffi::sqlite3_context, c_int, *mut *mut ffi::sqlite3_value);

fn install<T, A>(
    conn: &Connection,
    name: &str,
    flags: FunctionFlags,
    args: A,
    kind: RegistrationKind,
    x_value: Option<ValueFn>,
    x_inverse: Option<StepFn>,
) -> Result<Registration>
where
    T: Aggregate + Construct<A>,
    A: Send + 'static,
{
    let () = ArityCheck::<T>::OK;
    let c_name = function_name(name)?;
    let arity = ArityCheck::<T>::ARITY as c_int;

    let control = Storage::owned(ControlBlock::<T, A>::new(args))?;
    let mode = control.mode();
    let parts = control.into_raw_parts();

    // On failure the engine runs `parts.destructor` itself.
    let rc = unsafe {
        ffi::sqlite3_create_window_function(
            conn.handle(),
            c_name.as_ptr(),
            arity,
            flags.bits(),
            parts.ptr,
            Some(step_trampoline::<T, A>),
            Some(final_trampoline::<T, A>),
            x_value,
            x_inverse,
            parts.destructor,
        )
    };
    finish_registration(conn, name, rc, arity, kind, mode)
}
