use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for planning and adapter traffic.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub tables: BTreeMap<String, TableCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Discovery
    pub discoveries: u64,
    pub slow_probes: u64,

    // Planning
    pub plans: u64,
    pub pushed_filters: u64,
    pub residual_filters: u64,
    pub local_sorts: u64,
    pub limits_delegated: u64,

    // Rows
    pub rows_fetched: u64,
    pub rows_filtered: u64,

    // Mutations
    pub inserts: u64,
    pub deletes: u64,
    pub updates: u64,
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableCounters {
    pub plans: u64,
    pub rows_fetched: u64,
    pub rows_filtered: u64,
    pub inserts: u64,
    pub deletes: u64,
    pub updates: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub fn reset() {
    with_state_mut(|m| *m = EventState::default());
}
