//! Allocation failure tests, driven by the thread-local failpoints in
//! `sqlfn-mem`.

use std::cell::Cell;

use sqlfn::{
    create_aggregate, create_function_with, register_function, Aggregate, Connection, Construct,
    Error, ErrorCode, FunctionFlags, Result, StorageMode, Value,
};
use sqlfn_mem::failpoints::{self, AGGREGATE_SLOT, MANAGED_ALLOC};

fn add_one(x: i64) -> i64 {
    x + 1
}

fn open() -> Connection {
    Connection::open_in_memory().expect("open in-memory database")
}

#[test]
fn test_managed_allocation_failure_registers_nothing() {
    let conn = open();
    let offset = 5i64;
    {
        let _armed = failpoints::scoped(MANAGED_ALLOC);
        let err = register_function(&conn, "plus_offset", FunctionFlags::NONE, move |x: i64| {
            x + offset
        })
        .expect_err("allocation fails");
        assert!(matches!(err, Error::AllocationFailed { .. }), "{err:?}");
        assert_eq!(err.code(), ErrorCode::NoMem);
    }
    assert!(!failpoints::is_armed(MANAGED_ALLOC));

    let err = conn
        .query_value("SELECT plus_offset(1)")
        .expect_err("function absent");
    assert!(err.to_string().contains("no such function"), "{err}");
}

#[test]
fn test_stateless_registration_never_allocates() {
    let conn = open();
    let _armed = failpoints::scoped(MANAGED_ALLOC);

    let reg = register_function(&conn, "add_one", FunctionFlags::NONE, add_one)
        .expect("stateless registration unaffected");
    assert_eq!(reg.storage, StorageMode::Stateless);
    assert_eq!(
        conn.query_value("SELECT add_one(1)").expect("query"),
        Value::Integer(2)
    );
}

#[test]
fn test_construct_mode_skips_init_when_allocation_fails() {
    let conn = open();
    let init_ran = Cell::new(false);
    let _armed = failpoints::scoped(MANAGED_ALLOC);

    let err = create_function_with(&conn, "lazy", FunctionFlags::NONE, || {
        init_ran.set(true);
        let base = 3i64;
        move |x: i64| x * base
    })
    .expect_err("allocation fails");
    assert!(matches!(err, Error::AllocationFailed { .. }), "{err:?}");
    assert!(!init_ran.get());
}

struct Joined {
    separator: String,
    parts: Vec<String>,
}

impl Construct<String> for Joined {
    fn construct(separator: &String) -> Self {
        Self {
            separator: separator.clone(),
            parts: Vec::new(),
        }
    }
}

impl Aggregate for Joined {
    type Args<'c> = (String,);
    type Output = String;

    fn step(&mut self, (part,): (String,)) -> Result<()> {
        self.parts.push(part);
        Ok(())
    }

    fn value(&self) -> String {
        self.parts.join(&self.separator)
    }
}

#[test]
fn test_aggregate_control_block_allocation_failure() {
    let conn = open();
    {
        let _armed = failpoints::scoped(MANAGED_ALLOC);
        let err = create_aggregate::<Joined, String>(&conn, "joined", FunctionFlags::NONE, ",".into())
            .expect_err("allocation fails");
        assert!(matches!(err, Error::AllocationFailed { .. }), "{err:?}");
    }
    let err = conn
        .query_value("SELECT joined('a')")
        .expect_err("aggregate absent");
    assert!(err.to_string().contains("no such function"), "{err}");
}

#[derive(Default)]
struct Sum(i64);

impl Aggregate for Sum {
    type Args<'c> = (i64,);
    type Output = i64;

    fn step(&mut self, (x,): (i64,)) -> Result<()> {
        self.0 += x;
        Ok(())
    }

    fn value(&self) -> i64 {
        self.0
    }
}

#[test]
fn test_group_storage_failure_reports_out_of_memory() {
    let conn = open();
    create_aggregate::<Sum, ()>(&conn, "my_sum", FunctionFlags::NONE, ()).expect("register my_sum");
    conn.execute_batch("CREATE TABLE t(x); INSERT INTO t VALUES (1), (2), (3);")
        .expect("seed");

    {
        let _armed = failpoints::scoped(AGGREGATE_SLOT);
        let err = conn
            .query_value("SELECT my_sum(x) FROM t")
            .expect_err("group storage unavailable");
        assert_eq!(err.code(), ErrorCode::NoMem);
    }

    // Disarmed, the same query succeeds on the same connection.
    assert_eq!(
        conn.query_value("SELECT my_sum(x) FROM t").expect("query"),
        Value::Integer(6)
    );
}
