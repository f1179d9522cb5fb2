use super::*;
use crate::{
    adapter::{Adapter, Capabilities, RowStream, ScanRequest},
    field::Columns,
    error::ErrorClass,
    exec::select,
    query::{Predicate, Select},
    test_support::{Call, CallLog, FixtureAdapter, people_columns, people_rows},
    value::Value,
};

fn open(capabilities: Capabilities) -> (VirtualTable, CallLog) {
    let adapter = FixtureAdapter::new(people_columns(), people_rows()).with_capabilities(capabilities);
    let log = adapter.log();
    let table = VirtualTable::new("people", Box::new(adapter)).expect("table should open");
    (table, log)
}

fn mutations(log: &CallLog) -> Vec<Call> {
    log.lock()
        .iter()
        .filter(|call| !matches!(call, Call::Scan(_)))
        .cloned()
        .collect()
}

#[test]
fn inserted_row_is_selectable() {
    let (mut table, _) = open(Capabilities::NONE.with_insert_delete());
    let rowid = insert(
        &mut table,
        &Insert::table("people").value("id", 9).value("name", "erin").value("age", 41),
    )
    .expect("insert should succeed");

    let result = select(&mut table, &Select::table("people").filter(Predicate::eq("name", "erin")))
        .expect("select should succeed");

    assert_eq!(result.rows.len(), 1);
    let row = &result.rows[0];
    assert_eq!(row.rowid, Some(rowid));
    assert_eq!(row.get("id"), &Value::Integer(9));
    assert_eq!(row.get("age"), &Value::Integer(41));
}

#[test]
fn delete_removes_each_matching_rowid() {
    let (mut table, log) = open(Capabilities::NONE.with_insert_delete());
    let deleted = delete(&mut table, &Delete::table("people").filter(Predicate::eq("age", 19)))
        .expect("delete should succeed");

    assert_eq!(deleted, 2);
    assert_eq!(mutations(&log), vec![Call::Delete(1), Call::Delete(3)]);
}

#[test]
fn update_without_native_support_deletes_then_inserts_merged_row() {
    let (mut table, log) = open(Capabilities::NONE.with_insert_delete());
    let rowids = update(
        &mut table,
        &Update::table("people").set("age", 20).filter(Predicate::eq("name", "bob")),
    )
    .expect("update should succeed");

    assert_eq!(rowids.len(), 1);
    assert_ne!(rowids[0], 1, "the rowid changes");

    let calls = mutations(&log);
    assert_eq!(calls[0], Call::Delete(1));
    let Call::Insert(row) = &calls[1] else {
        panic!("the fallback should insert after deleting");
    };
    assert_eq!(row.rowid, None);
    assert_eq!(row.get("name"), &Value::from("bob"));
    assert_eq!(row.get("age"), &Value::Integer(20));
    assert_eq!(row.get("id"), &Value::Integer(2), "unchanged columns are carried over");
}

#[test]
fn native_update_keeps_rowids() {
    let (mut table, log) = open(Capabilities::NONE.with_insert_delete().with_update());
    let rowids = update(
        &mut table,
        &Update::table("people").set("name", "robert").filter(Predicate::eq("id", 2)),
    )
    .expect("update should succeed");

    assert_eq!(rowids, vec![1]);
    assert!(matches!(mutations(&log).as_slice(), [Call::Update(1, _)]));
}

#[test]
fn read_only_table_rejects_mutations() {
    let (mut table, log) = open(Capabilities::NONE);

    let err = update(&mut table, &Update::table("people").set("age", 1)).expect_err("update should fail");
    assert!(err.is_unsupported());
    let err = delete(&mut table, &Delete::table("people")).expect_err("delete should fail");
    assert!(err.is_unsupported());
    let err = insert(&mut table, &Insert::table("people").value("id", 5)).expect_err("insert should fail");
    assert!(err.is_unsupported());

    assert!(mutations(&log).is_empty());
}

#[test]
fn update_of_unknown_column_is_rejected_before_reading() {
    let (mut table, log) = open(Capabilities::NONE.with_insert_delete());
    let err = update(&mut table, &Update::table("people").set("colour", "red")).expect_err("update should fail");

    assert_eq!(err.class, ErrorClass::InvalidArgument);
    assert!(log.lock().is_empty());
}

#[test]
fn earlier_mutations_survive_a_later_failure() {
    struct RefusesRow(FixtureAdapter, RowId);

    impl Adapter for RefusesRow {
        fn columns(&self) -> &Columns {
            self.0.columns()
        }

        fn capabilities(&self) -> Capabilities {
            self.0.capabilities()
        }

        fn get_data(&mut self, request: &ScanRequest) -> Result<RowStream<'_>, InternalError> {
            self.0.get_data(request)
        }

        fn delete_data(&mut self, rowid: RowId) -> Result<(), InternalError> {
            if rowid == self.1 {
                return Err(InternalError::adapter_io("row is locked"));
            }
            self.0.delete_data(rowid)
        }
    }

    let adapter = FixtureAdapter::new(people_columns(), people_rows())
        .with_capabilities(Capabilities::NONE.with_insert_delete());
    let log = adapter.log();
    let mut table =
        VirtualTable::new("people", Box::new(RefusesRow(adapter, 2))).expect("table should open");

    let err = delete(&mut table, &Delete::table("people")).expect_err("third delete should fail");

    assert_eq!(err.class, ErrorClass::AdapterIo);
    assert_eq!(err.table.as_deref(), Some("people"));
    assert_eq!(mutations(&log), vec![Call::Delete(0), Call::Delete(1)], "no rollback");

    let left = select(&mut table, &Select::table("people")).expect("select should succeed");
    assert_eq!(left.rows.len(), 2);
}
