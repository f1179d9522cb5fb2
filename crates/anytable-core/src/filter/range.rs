use crate::{
    filter::{Filter, Operator},
    value::{Value, strict_order_cmp},
};
use std::{cmp::Ordering, fmt};

///
/// Side
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

///
/// Endpoint
///
/// One edge of a range. An absent value is unbounded on its side.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Endpoint {
    pub value: Option<Value>,
    pub include: bool,
    pub side: Side,
}

impl Endpoint {
    #[must_use]
    pub const fn new(value: Option<Value>, include: bool, side: Side) -> Self {
        Self {
            value,
            include,
            side,
        }
    }

    #[must_use]
    pub const fn unbounded(side: Side) -> Self {
        Self::new(None, true, side)
    }

    /// Whether `self` lies strictly beyond `other` on the number line.
    ///
    /// Equal values are ordered by openness: an open left edge sits just
    /// above a closed one, an open right edge just below a closed one.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        let (Some(mine), Some(theirs)) = (&self.value, &other.value) else {
            return match (&self.value, &other.value) {
                (None, _) => self.side == Side::Right && !(other.value.is_none() && other.side == Side::Right),
                (_, None) => other.side == Side::Left,
                _ => false,
            };
        };

        match strict_order_cmp(mine, theirs) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Less) | None => false,
            Some(Ordering::Equal) => match (self.side, other.side) {
                (Side::Left, Side::Left) => !self.include && other.include,
                (Side::Right, Side::Right) => self.include && !other.include,
                (Side::Left, Side::Right) => !(self.include && other.include),
                (Side::Right, Side::Left) => false,
            },
        }
    }
}

///
/// Range
///
/// Interval with independently inclusive edges; `None` means unbounded.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Range {
    pub start: Option<Value>,
    pub end: Option<Value>,
    pub include_start: bool,
    pub include_end: bool,
}

impl Range {
    #[must_use]
    pub const fn new(
        start: Option<Value>,
        end: Option<Value>,
        include_start: bool,
        include_end: bool,
    ) -> Self {
        Self {
            start,
            end,
            include_start,
            include_end,
        }
    }

    /// Half-open `[start, end)`.
    #[must_use]
    pub const fn half_open(start: Value, end: Value) -> Self {
        Self::new(Some(start), Some(end), true, false)
    }

    #[must_use]
    pub fn start_endpoint(&self) -> Endpoint {
        Endpoint::new(self.start.clone(), self.include_start, Side::Left)
    }

    #[must_use]
    pub fn end_endpoint(&self) -> Endpoint {
        Endpoint::new(self.end.clone(), self.include_end, Side::Right)
    }

    /// The single value of a degenerate closed range, if it is one.
    #[must_use]
    pub fn point(&self) -> Option<&Value> {
        match (&self.start, &self.end) {
            (Some(start), Some(end))
                if self.include_start
                    && self.include_end
                    && strict_order_cmp(start, end) == Some(Ordering::Equal) =>
            {
                Some(start)
            }
            _ => None,
        }
    }

    /// Intersect the constraints of one column.
    pub(crate) fn build(operations: &[(Operator, Value)]) -> Filter {
        operations
            .iter()
            .try_fold(Self::default(), |acc, (operator, value)| {
                let step = match operator {
                    Operator::Eq => Self::new(Some(value.clone()), Some(value.clone()), true, true),
                    Operator::Ge => Self::new(Some(value.clone()), None, true, false),
                    Operator::Gt => Self::new(Some(value.clone()), None, false, false),
                    Operator::Le => Self::new(None, Some(value.clone()), false, true),
                    Operator::Lt => Self::new(None, Some(value.clone()), false, false),
                    _ => return None,
                };
                acc.intersect(&step)
            })
            .map_or(Filter::Impossible, Filter::Range)
    }

    /// Combine two ranges; an empty intersection yields `Impossible`.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Filter {
        self.intersect(other).map_or(Filter::Impossible, Filter::Range)
    }

    fn intersect(&self, other: &Self) -> Option<Self> {
        let (a, b) = (self.start_endpoint(), other.start_endpoint());
        let start = if b.is_after(&a) { b } else { a };

        let (a, b) = (self.end_endpoint(), other.end_endpoint());
        let end = if a.is_after(&b) { b } else { a };

        if start.is_after(&end) {
            return None;
        }

        Some(Self::new(start.value, end.value, start.include, end.include))
    }

    #[must_use]
    pub fn check(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }

        let lower = self.start.as_ref().is_none_or(|start| {
            match strict_order_cmp(value, start) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => self.include_start,
                _ => false,
            }
        });
        let upper = self.end.as_ref().is_none_or(|end| match strict_order_cmp(value, end) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => self.include_end,
            _ => false,
        });

        lower && upper
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(point) = self.point() {
            return write!(f, "=={point}");
        }

        let mut parts = Vec::new();
        if let Some(start) = &self.start {
            let op = if self.include_start { ">=" } else { ">" };
            parts.push(format!("{op}{start}"));
        }
        if let Some(end) = &self.end {
            let op = if self.include_end { "<=" } else { "<" };
            parts.push(format!("{op}{end}"));
        }

        write!(f, "{}", parts.join(","))
    }
}
