//! Configuration and registration descriptor tests

use sqlfn::{
    register_function, AdapterConfig, Connection, FunctionFlags, OpenFlags, RegistrationKind,
    StorageMode, Value,
};

fn add_one(x: i64) -> i64 {
    x + 1
}

#[test]
fn test_config_from_json_drives_function_flags() {
    let config = AdapterConfig::from_json(r#"{ "deterministic": true, "busy_timeout_ms": 250 }"#)
        .expect("parse config");
    assert!(config.deterministic);
    assert_eq!(config.busy_timeout_ms, 250);
    // Unlisted fields keep their defaults.
    assert!(config.open_create);

    let flags = config.function_flags();
    assert!(flags.contains(FunctionFlags::DETERMINISTIC));
    assert!(!flags.contains(FunctionFlags::DIRECT_ONLY));
}

#[test]
fn test_open_with_config() {
    let config = AdapterConfig {
        extended_result_codes: true,
        ..AdapterConfig::default()
    };
    let conn = Connection::open_with_config(":memory:", config.clone()).expect("open");
    assert_eq!(conn.config().extended_result_codes, config.extended_result_codes);

    register_function(&conn, "add_one", conn.config().function_flags(), add_one)
        .expect("register add_one");
    assert_eq!(
        conn.query_value("SELECT add_one(1)").expect("query"),
        Value::Integer(2)
    );
}

#[test]
fn test_open_flags_follow_config() {
    let read_only = AdapterConfig {
        open_read_only: true,
        ..AdapterConfig::default()
    };
    let flags = OpenFlags::from_config(&read_only);
    assert_eq!(flags, OpenFlags::READ_ONLY | OpenFlags::URI);

    let flags = OpenFlags::from_config(&AdapterConfig::default());
    assert_eq!(flags, OpenFlags::default());
}

#[test]
fn test_registration_descriptor_serializes() {
    let conn = Connection::open_in_memory().expect("open");
    let reg = register_function(&conn, "add_one", FunctionFlags::NONE, add_one)
        .expect("register add_one");
    assert_eq!(reg.kind, RegistrationKind::Scalar);
    assert_eq!(reg.storage, StorageMode::Stateless);

    let json = serde_json::to_value(&reg).expect("serialize registration");
    assert_eq!(json["name"], "add_one");
    assert_eq!(json["arity"], 1);
}
