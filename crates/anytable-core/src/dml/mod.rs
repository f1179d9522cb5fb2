//! Module: dml
//! Responsibility: reconcile INSERT, UPDATE and DELETE with adapters that
//! only understand single-row mutations keyed by rowid.
//! Does not own: rowid assignment, which each adapter does itself.
//!
//! DELETE and UPDATE first identify the affected rows with an ordinary
//! scan (same pushdown and local re-check as SELECT), then mutate one
//! rowid at a time. There is no rollback: a failure part-way leaves the
//! earlier mutations applied.

#[cfg(test)]
mod tests;

use crate::{
    adapter::{Row, RowId},
    error::InternalError,
    exec::matching_rows,
    query::{Delete, Insert, Update},
    vtab::VirtualTable,
};
use tracing::debug;

/// Insert one row. Returns the rowid the adapter assigned or kept.
pub fn insert(table: &mut VirtualTable, insert: &Insert) -> Result<RowId, InternalError> {
    table.insert_row(insert.row.clone())
}

/// Delete every row matching the predicates. Returns how many were removed.
pub fn delete(table: &mut VirtualTable, delete: &Delete) -> Result<u64, InternalError> {
    let rows = matching_rows(table, &delete.predicates)?;
    let rowids = identify(table, rows)?;
    debug!(table = %table.name(), rows = rowids.len(), "deleting rows");

    let mut deleted = 0_u64;
    for (rowid, _) in rowids {
        table.delete_row(rowid)?;
        deleted += 1;
    }

    Ok(deleted)
}

/// Update every row matching the predicates. Returns the rowid each row
/// ends up with, which differs from the old one when the adapter has no
/// native update.
pub fn update(table: &mut VirtualTable, update: &Update) -> Result<Vec<RowId>, InternalError> {
    for column in update.set.keys() {
        if table.columns().get(column).is_none() {
            return Err(InternalError::session_invalid(format!("no such column: {column}")).with_table(table.name()));
        }
    }

    let rows = matching_rows(table, &update.predicates)?;
    let targets = identify(table, rows)?;
    debug!(table = %table.name(), rows = targets.len(), "updating rows");

    let mut rowids = Vec::with_capacity(targets.len());
    for (rowid, mut row) in targets {
        row.values
            .extend(update.set.iter().map(|(column, value)| (column.clone(), value.clone())));
        rowids.push(table.update_row(rowid, row)?);
    }

    Ok(rowids)
}

// Every scanned row must carry its rowid for the mutation to address it.
fn identify(table: &VirtualTable, rows: Vec<Row>) -> Result<Vec<(RowId, Row)>, InternalError> {
    rows.into_iter()
        .map(|row| match row.rowid {
            Some(rowid) => Ok((
                rowid,
                Row {
                    rowid: None,
                    values: row.values,
                },
            )),
            None => Err(InternalError::adapter_invalid("scanned row has no rowid").with_table(table.name())),
        })
        .collect()
}
