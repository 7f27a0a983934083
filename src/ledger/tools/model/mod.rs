use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Zero};

/// Column names every input file must provide, in the order they are written
/// to the clean output.
pub const REQUIRED_COLUMNS: [&str; 3] = ["sku", "qty", "unit_price"];

/// One validated and normalized input record.
///
/// Rows are only produced by the validator once every check has passed, so
/// the fields are private and exposed read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    sku: String,
    qty: BigInt,
    unit_price: BigDecimal,
}

impl Row {
    pub(crate) fn new(sku: String, qty: BigInt, unit_price: BigDecimal) -> Self {
        Self {
            sku,
            qty,
            unit_price,
        }
    }

    /// Trimmed, non-empty stock keeping unit.
    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// Strictly positive quantity, unbounded in size.
    pub fn qty(&self) -> &BigInt {
        &self.qty
    }

    /// Non-negative unit price with the scale it was written with.
    pub fn unit_price(&self) -> &BigDecimal {
        &self.unit_price
    }

    /// Exact `qty * unit_price`.
    pub fn line_total(&self) -> BigDecimal {
        BigDecimal::from(self.qty.clone()) * &self.unit_price
    }

    /// Fields in clean-output column order.
    pub fn to_record(&self) -> [String; 3] {
        [
            self.sku.clone(),
            self.qty.to_string(),
            self.unit_price.to_string(),
        ]
    }
}

/// Aggregate summary of a pipeline run.
///
/// `rows_in` and `rows_out` are both advanced only for accepted rows, so they
/// are always equal; rejected lines are not counted by either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub rows_in: u64,
    pub rows_out: u64,
    pub total_qty: BigInt,
    pub gross_revenue: BigDecimal,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            rows_in: 0,
            rows_out: 0,
            total_qty: BigInt::zero(),
            gross_revenue: BigDecimal::zero(),
        }
    }
}

impl Stats {
    /// Folds an accepted row into the running totals.
    pub(crate) fn accumulate(&mut self, row: &Row) {
        self.rows_in += 1;
        self.rows_out += 1;
        self.total_qty += row.qty();
        self.gross_revenue += row.line_total();
    }
}
