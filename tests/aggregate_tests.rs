//! Aggregate function lifecycle tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sqlfn::{
    create_aggregate, Aggregate, Connection, Construct, Context, Error, ErrorCode, FunctionFlags,
    RegistrationKind, Result, StorageMode, Value,
};

fn open_with_numbers() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    conn.execute_batch(
        "CREATE TABLE nums(grp INTEGER, x INTEGER);
         INSERT INTO nums VALUES (1, 1), (1, 2), (1, 3), (2, 4), (2, 5), (2, 6);",
    )
    .expect("seed nums");
    conn
}

/// Declares a summing aggregate whose constructions and destructions are
/// counted in its own statics, so tests running in parallel don't interfere.
macro_rules! counted_sum {
    ($ty:ident, $built:ident, $dropped:ident) => {
        static $built: AtomicUsize = AtomicUsize::new(0);
        static $dropped: AtomicUsize = AtomicUsize::new(0);

        struct $ty {
            total: i64,
        }

        impl Default for $ty {
            fn default() -> Self {
                $built.fetch_add(1, Ordering::SeqCst);
                Self { total: 0 }
            }
        }

        impl Drop for $ty {
            fn drop(&mut self) {
                $dropped.fetch_add(1, Ordering::SeqCst);
            }
        }

        impl Aggregate for $ty {
            type Args<'c> = (i64,);
            type Output = i64;

            fn step(&mut self, (x,): (i64,)) -> Result<()> {
                self.total += x;
                Ok(())
            }

            fn value(&self) -> i64 {
                self.total
            }
        }
    };
}

counted_sum!(SingleGroupSum, SINGLE_BUILT, SINGLE_DROPPED);
counted_sum!(GroupedSum, GROUPED_BUILT, GROUPED_DROPPED);
counted_sum!(EmptySum, EMPTY_BUILT, EMPTY_DROPPED);
counted_sum!(ManyGroupSum, MANY_BUILT, MANY_DROPPED);

#[test]
fn test_single_group_lifecycle() {
    let conn = Connection::open_in_memory().expect("open");
    let reg = create_aggregate::<SingleGroupSum, ()>(&conn, "sum_agg", FunctionFlags::NONE, ())
        .expect("register sum_agg");
    assert_eq!(reg.kind, RegistrationKind::Aggregate);
    assert_eq!(reg.storage, StorageMode::Stateless);
    assert_eq!(reg.arity, 1);

    conn.execute_batch("CREATE TABLE t(x); INSERT INTO t VALUES (1), (2), (3), (4), (5);")
        .expect("seed");
    assert_eq!(
        conn.query_value("SELECT sum_agg(x) FROM t").expect("query"),
        Value::Integer(15)
    );
    assert_eq!(SINGLE_BUILT.load(Ordering::SeqCst), 1);
    assert_eq!(SINGLE_DROPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_group_by_gives_one_instance_per_group() {
    let conn = open_with_numbers();
    create_aggregate::<GroupedSum, ()>(&conn, "grouped_sum", FunctionFlags::NONE, ())
        .expect("register grouped_sum");

    let rows = conn
        .query_rows("SELECT grp, grouped_sum(x) FROM nums GROUP BY grp ORDER BY grp")
        .expect("query");
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::Integer(6)],
            vec![Value::Integer(2), Value::Integer(15)],
        ]
    );
    assert_eq!(GROUPED_BUILT.load(Ordering::SeqCst), 2);
    assert_eq!(GROUPED_DROPPED.load(Ordering::SeqCst), 2);
}

#[test]
fn test_empty_input_constructs_in_final() {
    let conn = Connection::open_in_memory().expect("open");
    create_aggregate::<EmptySum, ()>(&conn, "empty_sum", FunctionFlags::NONE, ())
        .expect("register empty_sum");
    conn.execute_batch("CREATE TABLE empty(x);").expect("create");

    assert_eq!(
        conn.query_value("SELECT empty_sum(x) FROM empty").expect("query"),
        Value::Integer(0)
    );
    assert_eq!(EMPTY_BUILT.load(Ordering::SeqCst), 1);
    assert_eq!(EMPTY_DROPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_constructions_match_destructions_across_many_groups() {
    let conn = Connection::open_in_memory().expect("open");
    create_aggregate::<ManyGroupSum, ()>(&conn, "many_sum", FunctionFlags::NONE, ())
        .expect("register many_sum");
    conn.execute_batch(
        "CREATE TABLE data(g, v);
         WITH RECURSIVE seq(i) AS (SELECT 0 UNION ALL SELECT i + 1 FROM seq WHERE i < 499)
         INSERT INTO data SELECT (i * 7919) % 37, i FROM seq;",
    )
    .expect("seed data");

    let rows = conn
        .query_rows("SELECT g, many_sum(v), sum(v) FROM data GROUP BY g")
        .expect("query");
    assert_eq!(rows.len(), 37);
    for row in &rows {
        assert_eq!(row[1], row[2], "group {:?}", row[0]);
    }

    let built = MANY_BUILT.load(Ordering::SeqCst);
    assert_eq!(built, 37);
    assert_eq!(MANY_DROPPED.load(Ordering::SeqCst), built);
}

struct Concat {
    separator: String,
    parts: Vec<String>,
}

impl Construct<String> for Concat {
    fn construct(separator: &String) -> Self {
        Self {
            separator: separator.clone(),
            parts: Vec::new(),
        }
    }
}

impl Aggregate for Concat {
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
fn test_constructor_arguments_reach_every_group() {
    let conn = Connection::open_in_memory().expect("open");
    let reg = create_aggregate::<Concat, String>(&conn, "concat_agg", FunctionFlags::NONE, "|".into())
        .expect("register concat_agg");
    assert_eq!(reg.storage, StorageMode::Managed);

    conn.execute_batch(
        "CREATE TABLE people(id INTEGER PRIMARY KEY, team, name);
         INSERT INTO people VALUES
            (1, 'a', 'Alice'), (2, 'a', 'Bob'), (3, 'b', 'Charlie'), (4, 'b', 'David');",
    )
    .expect("seed people");

    assert_eq!(
        conn.query_value("SELECT concat_agg(name) FROM (SELECT name FROM people ORDER BY id)")
            .expect("query"),
        Value::Text("Alice|Bob|Charlie|David".into())
    );
    let rows = conn
        .query_rows(
            "SELECT team, concat_agg(name) FROM (SELECT team, name FROM people ORDER BY id)
             GROUP BY team ORDER BY team",
        )
        .expect("query");
    assert_eq!(
        rows,
        vec![
            vec![Value::Text("a".into()), Value::Text("Alice|Bob".into())],
            vec![Value::Text("b".into()), Value::Text("Charlie|David".into())],
        ]
    );
}

/// Constructor argument that reports when the registration releases it.
struct Tracker(Arc<AtomicUsize>);

impl Drop for Tracker {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Tally(i64);

impl Construct<Tracker> for Tally {
    fn construct(_tracker: &Tracker) -> Self {
        Tally(0)
    }
}

impl Aggregate for Tally {
    type Args<'c> = ();
    type Output = i64;

    fn step(&mut self, (): ()) -> Result<()> {
        self.0 += 1;
        Ok(())
    }

    fn value(&self) -> i64 {
        self.0
    }
}

#[test]
fn test_control_block_released_on_close() {
    let released = Arc::new(AtomicUsize::new(0));
    let conn = open_with_numbers();
    let reg = create_aggregate::<Tally, Tracker>(
        &conn,
        "tally",
        FunctionFlags::NONE,
        Tracker(released.clone()),
    )
    .expect("register tally");
    assert_eq!(reg.arity, 0);

    assert_eq!(
        conn.query_value("SELECT tally() FROM nums").expect("query"),
        Value::Integer(6)
    );
    assert_eq!(released.load(Ordering::SeqCst), 0);

    conn.close().expect("close");
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

static FAILING_BUILT: AtomicUsize = AtomicUsize::new(0);
static FAILING_DROPPED: AtomicUsize = AtomicUsize::new(0);

struct Failing;

impl Default for Failing {
    fn default() -> Self {
        FAILING_BUILT.fetch_add(1, Ordering::SeqCst);
        Failing
    }
}

impl Drop for Failing {
    fn drop(&mut self) {
        FAILING_DROPPED.fetch_add(1, Ordering::SeqCst);
    }
}

impl Aggregate for Failing {
    type Args<'c> = (i64,);
    type Output = i64;

    fn step(&mut self, (x,): (i64,)) -> Result<()> {
        if x == 3 {
            return Err(Error::user("Intentional test error"));
        }
        Ok(())
    }

    fn value(&self) -> i64 {
        0
    }
}

#[test]
fn test_step_error_aborts_query_and_destroys_instance() {
    let conn = open_with_numbers();
    create_aggregate::<Failing, ()>(&conn, "failing", FunctionFlags::NONE, ())
        .expect("register failing");

    let err = conn
        .query_value("SELECT failing(x) FROM nums")
        .expect_err("step fails");
    assert_eq!(err.code(), ErrorCode::Error);
    assert!(err.to_string().contains("Intentional test error"), "{err}");

    // The aborted group was still cleaned up.
    assert_eq!(FAILING_BUILT.load(Ordering::SeqCst), 1);
    assert_eq!(FAILING_DROPPED.load(Ordering::SeqCst), 1);

    // The connection stays usable.
    assert_eq!(
        conn.query_value("SELECT count(*) FROM nums").expect("query"),
        Value::Integer(6)
    );
}

#[derive(Default)]
struct Panicky(i64);

impl Aggregate for Panicky {
    type Args<'c> = (i64,);
    type Output = i64;

    fn step(&mut self, (x,): (i64,)) -> Result<()> {
        if x > 4 {
            panic!("step exploded at {x}");
        }
        self.0 += x;
        Ok(())
    }

    fn value(&self) -> i64 {
        self.0
    }
}

#[test]
fn test_step_panic_becomes_error() {
    let conn = open_with_numbers();
    create_aggregate::<Panicky, ()>(&conn, "panicky", FunctionFlags::NONE, ())
        .expect("register panicky");

    let err = conn
        .query_value("SELECT panicky(x) FROM nums")
        .expect_err("step panics");
    assert!(err.to_string().contains("step exploded at 5"), "{err}");

    // Groups that never reach the panicking row still succeed.
    assert_eq!(
        conn.query_value("SELECT panicky(x) FROM nums WHERE grp = 1")
            .expect("query"),
        Value::Integer(6)
    );
}

/// Counts rows and checks the context it is handed.
#[derive(Default)]
struct ContextCount {
    rows: i64,
}

impl Aggregate for ContextCount {
    type Args<'c> = (&'c Context, Option<i64>);
    type Output = i64;

    fn step(&mut self, (ctx, x): (&Context, Option<i64>)) -> Result<()> {
        if ctx.db_handle().is_null() {
            return Err(Error::misuse("aggregate context without a connection"));
        }
        if x.is_some() {
            self.rows += 1;
        }
        Ok(())
    }

    fn value(&self) -> i64 {
        self.rows
    }
}

#[test]
fn test_context_led_step_arguments() {
    let conn = open_with_numbers();
    let reg = create_aggregate::<ContextCount, ()>(&conn, "count_set", FunctionFlags::NONE, ())
        .expect("register count_set");
    // The context parameter is not counted as a SQL argument.
    assert_eq!(reg.arity, 1);

    conn.execute_batch("INSERT INTO nums VALUES (3, NULL);").expect("insert");
    assert_eq!(
        conn.query_value("SELECT count_set(x) FROM nums").expect("query"),
        Value::Integer(6)
    );
}

#[test]
fn test_wrong_argument_count_is_rejected_by_engine() {
    let conn = open_with_numbers();
    create_aggregate::<Concat, String>(&conn, "concat_one", FunctionFlags::NONE, ",".into())
        .expect("register concat_one");

    let err = conn
        .query_value("SELECT concat_one(x, grp) FROM nums")
        .expect_err("arity mismatch");
    assert!(err.to_string().contains("concat_one"), "{err}");
}
