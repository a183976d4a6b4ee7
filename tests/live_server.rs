//! End-to-end scenarios against a live server, opted into via `DATABASE_URL`.
//!
//! Run with:
//! ```sh
//! DATABASE_URL=psql://postgres@localhost/postgres cargo test -- --ignored
//! ```
use ivory::{cancel_query, Client, Config, ErrorKind};

fn connect() -> Client {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for live tests");
    let config: Config = url.parse().expect("DATABASE_URL must be a valid psql:// url");
    Client::connect(config).expect("failed to connect")
}

#[test]
#[ignore]
fn selects_a_scalar() {
    let mut client = connect();
    let result = client.query("SELECT 42 AS n").unwrap();
    assert_eq!(result.command_tags, ["SELECT 1"]);
    let row = result.one().unwrap();
    assert_eq!(row.get::<_, i32>("n"), 42);
}

#[test]
#[ignore]
fn creates_inserts_and_selects_rows_in_order() {
    let mut client = connect();
    client.execute("DROP TABLE IF EXISTS ivory_live_test_t").unwrap();
    client.execute("CREATE TABLE ivory_live_test_t(id INT, name TEXT, enabled BOOL)").unwrap();
    client.execute("INSERT INTO ivory_live_test_t VALUES (1, 'foo', true)").unwrap();
    client.execute("INSERT INTO ivory_live_test_t VALUES (2, 'bar', false)").unwrap();

    let result = client.query("SELECT id, name, enabled FROM ivory_live_test_t ORDER BY id").unwrap();
    assert_eq!(result.len(), 2);

    let row0 = &result.rows[0];
    assert_eq!(row0.get::<_, i32>("id"), 1);
    assert_eq!(row0.get::<_, String>("name"), "foo");
    assert_eq!(row0.get::<_, bool>("enabled"), true);

    let row1 = &result.rows[1];
    assert_eq!(row1.get::<_, i32>("id"), 2);
    assert_eq!(row1.get::<_, String>("name"), "bar");
    assert_eq!(row1.get::<_, bool>("enabled"), false);

    client.execute("DROP TABLE ivory_live_test_t").unwrap();
}

#[test]
#[ignore]
fn prepared_statement_runs_with_distinct_parameters() {
    let mut client = connect();
    let stmt = client.prepare("SELECT $1::int + $2::int", None).unwrap();

    let sum1 = client.query_prepared(&stmt, &[2.into(), 3.into()]).unwrap().one().unwrap();
    assert_eq!(sum1.get::<usize, i32>(0), 5);

    let sum2 = client.query_prepared(&stmt, &[10.into(), 20.into()]).unwrap().one().unwrap();
    assert_eq!(sum2.get::<usize, i32>(0), 30);
}

#[test]
#[ignore]
fn ssl_request_against_a_plaintext_only_server_is_refused() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for live tests");
    let config: Config = url.parse().unwrap();
    let err = Client::connect_ssl(config).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Ssl(_)));
}

#[test]
#[ignore]
fn division_by_zero_leaves_session_usable() {
    let mut client = connect();
    let err = client.query("SELECT 1/0").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Database(_)));

    let result = client.query("SELECT 1").unwrap();
    assert_eq!(result.one().unwrap().get::<usize, i32>(0), 1);
}

#[test]
#[ignore]
fn empty_query_yields_no_rows() {
    let mut client = connect();
    let result = client.query("").unwrap();
    assert_eq!(result.command_tags, [""]);
    assert!(result.rows.is_empty());
}

#[test]
#[ignore]
fn multi_statement_query_yields_two_tags() {
    let mut client = connect();
    let tags = client.execute("SELECT 1; SELECT 2;").unwrap();
    assert_eq!(tags, ["SELECT 1", "SELECT 1"]);
}

#[test]
#[ignore]
fn cancel_token_interrupts_a_long_running_query() {
    let mut client = connect();
    let token = client.cancel_token().expect("connection must be open to get a token");
    cancel_query(&token).unwrap();
    // the next operation on `client` still works: cancellation targets the
    // connection identified by the token, not necessarily an in-flight query
    // on this one if none was running when the signal arrived.
    assert!(client.is_working());
}
