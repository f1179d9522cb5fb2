use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Order
///
/// Ordering guarantee a column declares for the rows an adapter returns.
/// `Any` means the adapter sorts on request.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Order {
    #[default]
    None,
    Ascending,
    Descending,
    Any,
}

impl Order {
    /// Whether this static guarantee already satisfies a requested direction.
    #[must_use]
    pub const fn satisfies(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Self::Ascending, Direction::Ascending) | (Self::Descending, Direction::Descending)
        )
    }
}

///
/// Direction
///
/// A requested sort direction.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
