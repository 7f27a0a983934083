//! Per-record validation of raw CSV fields into [`Row`] values.
//!
//! Header checks happen once through [`ColumnIndex::from_headers`]. Each data
//! record is then validated independently; [`Records`] walks a reader lazily
//! and yields one [`RecordOutcome`] per record, leaving the decision to count,
//! write or log to the caller.

use std::io::Read;
use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Signed};
use csv::{StringRecord, StringRecordsIter};

use crate::ledger::tools::error::{PipelineError, Result, ValidationFailure};
use crate::ledger::tools::model::{REQUIRED_COLUMNS, Row};

/// Line number of the first data record; the header occupies line 1.
pub const FIRST_DATA_LINE: u64 = 2;

/// Raw text of the required columns for one record. Fields that the record
/// does not carry are `None` and validate like empty text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawFields<'a> {
    pub sku: Option<&'a str>,
    pub qty: Option<&'a str>,
    pub unit_price: Option<&'a str>,
}

/// Positions of the required columns within the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    sku: usize,
    qty: usize,
    unit_price: usize,
}

impl ColumnIndex {
    /// Locates the required columns in `headers`. Extra columns are ignored;
    /// when a name repeats, the last occurrence wins.
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        if headers.is_empty() {
            return Err(PipelineError::format("input has no header row"));
        }

        let position = |name: &str| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, header)| *header == name)
                .map(|(idx, _)| idx)
                .last()
        };
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|&name| position(name).is_none())
            .collect();

        match (position("sku"), position("qty"), position("unit_price")) {
            (Some(sku), Some(qty), Some(unit_price)) => Ok(Self {
                sku,
                qty,
                unit_price,
            }),
            _ => Err(PipelineError::format(format!(
                "input missing required columns: {missing:?}"
            ))),
        }
    }

    /// Picks the required fields out of a data record.
    pub fn project<'r>(&self, record: &'r StringRecord) -> RawFields<'r> {
        RawFields {
            sku: record.get(self.sku),
            qty: record.get(self.qty),
            unit_price: record.get(self.unit_price),
        }
    }
}

/// Validates one record. The first failing check determines the message.
pub fn validate_record(
    fields: RawFields<'_>,
    line_number: u64,
) -> std::result::Result<Row, ValidationFailure> {
    let fail = |message: String| ValidationFailure::new(line_number, message);

    let sku = fields.sku.unwrap_or_default().trim();
    if sku.is_empty() {
        return Err(fail("sku must be non-empty".into()));
    }

    let qty_raw = fields.qty.unwrap_or_default().trim();
    let qty = BigInt::from_str(qty_raw)
        .map_err(|_| fail(format!("qty must be an integer (got '{qty_raw}')")))?;
    if !qty.is_positive() {
        return Err(fail("qty must be > 0".into()));
    }

    let price_raw = fields.unit_price.unwrap_or_default().trim();
    let unit_price = BigDecimal::from_str(price_raw).map_err(|_| {
        fail(format!(
            "unit_price must be a decimal number (got '{price_raw}')"
        ))
    })?;
    if unit_price.is_negative() {
        return Err(fail("unit_price must be >= 0".into()));
    }

    Ok(Row::new(sku.to_string(), qty, unit_price))
}

/// Result of validating a single data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted(Row),
    Rejected(ValidationFailure),
}

/// Lazy sequence of validated records read from a CSV source.
///
/// Line numbers are assigned by record position, starting at
/// [`FIRST_DATA_LINE`], independent of whether earlier records were rejected.
/// Errors from the underlying reader are yielded as-is so the caller can
/// decide how fatal they are.
pub struct Records<I> {
    records: I,
    columns: ColumnIndex,
    next_line: u64,
}

impl<I> Records<I>
where
    I: Iterator<Item = csv::Result<StringRecord>>,
{
    pub fn new(records: I, columns: ColumnIndex) -> Self {
        Self {
            records,
            columns,
            next_line: FIRST_DATA_LINE,
        }
    }
}

impl<'r, R: Read> Records<StringRecordsIter<'r, R>> {
    /// Reads and checks the header of `reader`, then returns an iterator over
    /// the remaining records.
    pub fn from_reader(reader: &'r mut csv::Reader<R>) -> Result<Self> {
        let columns = read_columns(reader)?;
        Ok(Self::new(reader.records(), columns))
    }
}

impl<I> Iterator for Records<I>
where
    I: Iterator<Item = csv::Result<StringRecord>>,
{
    type Item = csv::Result<RecordOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(error) => return Some(Err(error)),
        };
        let line_number = self.next_line;
        self.next_line += 1;

        let outcome = match validate_record(self.columns.project(&record), line_number) {
            Ok(row) => RecordOutcome::Accepted(row),
            Err(failure) => RecordOutcome::Rejected(failure),
        };
        Some(Ok(outcome))
    }
}

fn read_columns<R: Read>(reader: &mut csv::Reader<R>) -> Result<ColumnIndex> {
    let headers = reader
        .headers()
        .map_err(|error| PipelineError::format_with("failed to read CSV header", error))?;
    ColumnIndex::from_headers(headers)
}
