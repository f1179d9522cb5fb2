use crate::{adapter::RowId, error::InternalError};
use std::ops::Range;
use thiserror::Error as ThisError;

///
/// RowIdError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum RowIdError {
    #[error("row ID {0} already present")]
    AlreadyPresent(RowId),

    #[error("row ID {0} not found")]
    NotFound(RowId),

    #[error("row ID {0} is out of range")]
    OutOfRange(RowId),
}

impl From<RowIdError> for InternalError {
    fn from(err: RowIdError) -> Self {
        Self::adapter_invalid(err.to_string())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Slot {
    Live(Range<RowId>),
    Deleted,
}

///
/// RowIdManager
///
/// Row ids for append-only storage. Slots mirror physical row positions:
/// iterating yields one entry per stored row, `None` where the row was
/// deleted, so ids can be zipped with the rows on disk.
///
/// Ids are never re-issued once handed out, even after deletion.
///

#[derive(Clone, Debug)]
pub struct RowIdManager {
    slots: Vec<Slot>,
    next: RowId,
}

impl RowIdManager {
    /// Manager for `rows` rows already in storage, numbered from zero.
    #[must_use]
    pub fn with_rows(rows: usize) -> Self {
        let end = RowId::try_from(rows).unwrap_or(RowId::MAX);

        Self {
            slots: vec![Slot::Live(0..end)],
            next: end,
        }
    }

    /// Row id per physical slot; `None` marks a deleted row.
    pub fn iter(&self) -> impl Iterator<Item = Option<RowId>> + '_ {
        self.slots.iter().flat_map(|slot| -> Box<dyn Iterator<Item = Option<RowId>>> {
            match slot {
                Slot::Live(range) => Box::new(range.clone().map(Some)),
                Slot::Deleted => Box::new(std::iter::once(None)),
            }
        })
    }

    /// Ids still live.
    pub fn live(&self) -> impl Iterator<Item = RowId> + '_ {
        self.iter().flatten()
    }

    #[must_use]
    pub fn contains(&self, rowid: RowId) -> bool {
        self.slots
            .iter()
            .any(|slot| matches!(slot, Slot::Live(range) if range.contains(&rowid)))
    }

    /// Number of physical slots, deleted ones included.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Live(range) => range.clone().count(),
                Slot::Deleted => 1,
            })
            .sum()
    }

    /// Register a new row at the end of storage.
    pub fn insert(&mut self, rowid: Option<RowId>) -> Result<RowId, RowIdError> {
        let rowid = match rowid {
            Some(id) if self.contains(id) => return Err(RowIdError::AlreadyPresent(id)),
            Some(id) => id,
            None => self.next,
        };
        let end = rowid.checked_add(1).ok_or(RowIdError::OutOfRange(rowid))?;

        match self.slots.last_mut() {
            Some(Slot::Live(range)) if range.end == rowid => range.end = end,
            _ => self.slots.push(Slot::Live(rowid..end)),
        }
        self.next = self.next.max(end);

        Ok(rowid)
    }

    /// Mark a row deleted, keeping its physical slot.
    pub fn delete(&mut self, rowid: RowId) -> Result<(), RowIdError> {
        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Live(range) if range.contains(&rowid)))
            .ok_or(RowIdError::NotFound(rowid))?;

        let Slot::Live(range) = self.slots[index].clone() else {
            return Err(RowIdError::NotFound(rowid));
        };

        let replacement = [
            Slot::Live(range.start..rowid),
            Slot::Deleted,
            Slot::Live(rowid + 1..range.end),
        ]
        .into_iter()
        .filter(|slot| !matches!(slot, Slot::Live(range) if range.is_empty()));

        self.slots.splice(index..=index, replacement);

        Ok(())
    }

    /// Physical position of a live row.
    #[must_use]
    pub fn position(&self, rowid: RowId) -> Option<usize> {
        self.iter().position(|slot| slot == Some(rowid))
    }
}
