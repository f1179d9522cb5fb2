use super::*;
use crate::{
    adapter::Capabilities,
    error::ErrorClass,
    field::Field,
    obs::{metrics_report, metrics_reset},
    plan::{IndexConstraint, choose_plan},
    test_support::{Call, FixtureAdapter, people_columns, people_rows},
};
use chrono::NaiveDate;

fn people(capabilities: Capabilities) -> (VirtualTable, crate::test_support::CallLog) {
    let adapter = FixtureAdapter::new(people_columns(), people_rows()).with_capabilities(capabilities);
    let log = adapter.log();
    let table = VirtualTable::new("people", Box::new(adapter)).expect("table should open");
    (table, log)
}

fn events() -> (VirtualTable, crate::test_support::CallLog) {
    let columns = Columns::new()
        .with("title", Field::text())
        .with("day", Field::iso_date());
    let rows = vec![
        Row::new().with("title", "launch").with("day", "2024-03-01"),
        Row::new().with("title", "broken").with("day", "someday"),
    ];
    let adapter = FixtureAdapter::new(columns, rows).with_capabilities(Capabilities::NONE.with_insert_delete());
    let log = adapter.log();
    let table = VirtualTable::new("events", Box::new(adapter)).expect("table should open");
    (table, log)
}

#[test]
fn declaration_lists_engine_types() {
    let (table, _) = people(Capabilities::NONE);

    assert_eq!(
        table.create_table_sql(),
        r#"CREATE TABLE "people" ("id" INTEGER, "name" TEXT, "age" INTEGER)"#
    );
}

#[test]
fn table_without_columns_is_rejected() {
    let adapter = FixtureAdapter::new(Columns::new(), Vec::new());
    let err = VirtualTable::new("empty", Box::new(adapter))
        .err()
        .expect("a table needs columns");

    assert_eq!(err.table.as_deref(), Some("empty"));
}

#[test]
fn cursor_converts_to_engine_form() {
    let (mut table, _) = events();
    let mut cursor = table.scan(&ScanRequest::default()).expect("scan should open");

    let first = cursor
        .next()
        .expect("a first row should exist")
        .expect("first row should convert");
    assert_eq!(
        first.get("day"),
        &Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"))
    );

    let err = cursor
        .next()
        .expect("a second row should exist")
        .expect_err("malformed date should not convert");
    assert_eq!(err.class, ErrorClass::TypeConversion);
    assert_eq!(err.table.as_deref(), Some("events"));
    assert!(err.message.contains("someday"));
}

#[test]
fn rows_rebuild_the_planned_request() {
    let (mut table, log) = people(Capabilities::NONE);
    let constraints = [IndexConstraint::compare(0, Operator::Ge, true)];
    let plan = choose_plan([table.best_index(&constraints, &[], None).expect("planning should succeed")])
        .expect("one candidate should be chosen");

    let ids: Vec<Value> = table
        .rows(&plan.index, &[Value::Integer(3)])
        .expect("rows should open")
        .map(|row| row.expect("row should convert").get("id").clone())
        .collect();

    assert_eq!(ids, vec![Value::Integer(3), Value::Integer(4)]);
    let calls = log.lock();
    let Some(Call::Scan(request)) = calls.first() else {
        panic!("the adapter should have been scanned");
    };
    assert!(request.bounds.contains_key("id"));
}

#[test]
fn abandoned_cursor_reports_rows_pulled() {
    metrics_reset();
    let (mut table, _) = people(Capabilities::NONE);

    {
        let mut cursor = table.scan(&ScanRequest::default()).expect("scan should open");
        cursor.next();
        cursor.next();
        assert_eq!(cursor.fetched(), 2);
    }

    assert_eq!(metrics_report().tables["people"].rows_fetched, 2);
}

#[test]
fn insert_stores_internal_form() {
    let (mut table, log) = events();
    let day = NaiveDate::from_ymd_opt(2025, 12, 24).expect("valid date");

    table
        .insert_row(Row::new().with("title", "party").with("day", Value::Date(day)))
        .expect("insert should succeed");

    let calls = log.lock();
    let Some(Call::Insert(row)) = calls.last() else {
        panic!("the adapter should have received an insert");
    };
    assert_eq!(row.get("day"), &Value::Text("2025-12-24".to_string()));
}

#[test]
fn insert_rejects_unknown_columns() {
    let (mut table, _) = events();
    let err = table
        .insert_row(Row::new().with("colour", "red"))
        .expect_err("unknown column should be rejected");

    assert_eq!(err.class, ErrorClass::InvalidArgument);
}

#[test]
fn update_without_native_support_reinserts() {
    let (mut table, log) = people(Capabilities::NONE.with_insert_delete());
    let row = Row::new().with("id", 2).with("name", "robert").with("age", 20);

    let rowid = table.update_row(1, row).expect("update should fall back");

    assert_ne!(rowid, 1, "the fallback assigns a new rowid");
    let calls = log.lock();
    assert!(matches!(calls[0], Call::Delete(1)));
    assert!(matches!(&calls[1], Call::Insert(row) if row.rowid.is_none()));
}

#[test]
fn native_update_keeps_rowid() {
    let (mut table, log) = people(Capabilities::NONE.with_insert_delete().with_update());
    let rowid = table
        .update_row(1, Row::new().with("id", 2).with("name", "robert"))
        .expect("native update should succeed");

    assert_eq!(rowid, 1);
    assert!(matches!(log.lock()[0], Call::Update(1, _)));
}

#[test]
fn update_without_any_support_is_unsupported() {
    let (mut table, log) = people(Capabilities::NONE);
    let err = table
        .update_row(1, Row::new().with("name", "x"))
        .expect_err("read-only table cannot update");

    assert!(err.is_unsupported());
    assert_eq!(err.table.as_deref(), Some("people"));
    assert!(log.lock().is_empty(), "nothing should reach the adapter");
}

#[test]
fn close_runs_once() {
    let (mut table, log) = people(Capabilities::NONE);

    table.close().expect("close should succeed");
    table.close().expect("second close should be a no-op");
    assert!(table.is_closed());
    drop(table);

    let closes = log.lock().iter().filter(|call| **call == Call::Close).count();
    assert_eq!(closes, 1);
}

#[test]
fn closed_table_refuses_work() {
    let (mut table, _) = people(Capabilities::NONE.with_drop());
    table.close().expect("close should succeed");

    assert!(table.scan(&ScanRequest::default()).is_err());
    assert!(table.drop_table().is_err());
}

#[test]
fn drop_table_requires_capability() {
    let (mut table, log) = people(Capabilities::NONE.with_drop());
    table.drop_table().expect("drop should succeed");
    assert!(log.lock().contains(&Call::Drop));

    let (mut table, _) = people(Capabilities::NONE);
    assert!(table.drop_table().expect_err("drop is unsupported").is_unsupported());
}
