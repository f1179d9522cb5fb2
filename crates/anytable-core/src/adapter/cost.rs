use crate::adapter::FIXED_COST;

///
/// CostModel
///
/// Ready-made `estimate_cost` bodies. `Simple` charges a linear pass per
/// filter and an n·log n sort per order key on top of a fixed cost.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CostModel {
    Fixed(f64),
    Simple { rows: u64, fixed: f64 },
}

impl CostModel {
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn estimate(&self, filters: usize, order: usize) -> f64 {
        match *self {
            Self::Fixed(cost) => cost,
            Self::Simple { rows, fixed } => {
                let rows = rows as f64;
                let sort = if rows > 1.0 { rows * rows.log2() } else { 0.0 };
                (filters as f64).mul_add(rows, (order as f64).mul_add(sort, fixed))
            }
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::Fixed(FIXED_COST)
    }
}
