//! Decoding of query results into destination shapes.
//!
//! The shape is picked once per call through [`Destination`]; the decoder then drains the
//! cursor in a single pass and always closes it before returning.

mod dynamic;
mod value;

pub use dynamic::Record;
pub use value::{FromValue, Mismatch};

use dynamic::DynamicPlan;

use crate::driver::{ColumnMeta, Cursor};
use crate::error::{DbcError, DecodeError, Operation};
use crate::schema::{Association, Schema, Tagged};
use crate::types::SqlValue;

pub(crate) fn mismatch(column: &ColumnMeta, m: Mismatch) -> DecodeError {
    DecodeError::TypeMismatch {
        column: column.name.clone(),
        expected: m.expected,
        found: m.found,
    }
}

/// A single scan target.
pub trait ScalarSink {
    /// # Errors
    /// Returns `DecodeError::TypeMismatch` if `value` does not fit the target.
    fn scan(&mut self, column: &ColumnMeta, value: &SqlValue) -> Result<(), DecodeError>;
}

impl<T: FromValue> ScalarSink for T {
    fn scan(&mut self, column: &ColumnMeta, value: &SqlValue) -> Result<(), DecodeError> {
        *self = T::from_value(value).map_err(|m| mismatch(column, m))?;
        Ok(())
    }
}

/// A growable sequence of scan targets.
pub trait SequenceSink {
    /// # Errors
    /// Returns `DecodeError::TypeMismatch` if `value` does not fit the element type.
    fn push_scan(&mut self, column: &ColumnMeta, value: &SqlValue) -> Result<(), DecodeError>;
}

impl<T: FromValue> SequenceSink for Vec<T> {
    fn push_scan(&mut self, column: &ColumnMeta, value: &SqlValue) -> Result<(), DecodeError> {
        self.push(T::from_value(value).map_err(|m| mismatch(column, m))?);
        Ok(())
    }
}

/// Receiver for tagged records: one record, or a sequence that grows by one per row.
pub trait TaggedSink {
    fn associate(&self, columns: &[ColumnMeta]) -> Association;

    /// # Errors
    /// Returns a `DecodeError` if a bound cell does not fit its field.
    fn accept(
        &mut self,
        association: &Association,
        columns: &[ColumnMeta],
        row: &[SqlValue],
    ) -> Result<(), DecodeError>;
}

struct TaggedOne<'a, T> {
    schema: &'a Schema<T>,
    dest: &'a mut T,
}

impl<T> TaggedSink for TaggedOne<'_, T> {
    fn associate(&self, columns: &[ColumnMeta]) -> Association {
        self.schema.associate(columns)
    }

    fn accept(
        &mut self,
        association: &Association,
        columns: &[ColumnMeta],
        row: &[SqlValue],
    ) -> Result<(), DecodeError> {
        self.schema.decode_row(association, columns, row, self.dest)
    }
}

struct TaggedMany<'a, T> {
    schema: &'a Schema<T>,
    dest: &'a mut Vec<T>,
}

impl<T: Default> TaggedSink for TaggedMany<'_, T> {
    fn associate(&self, columns: &[ColumnMeta]) -> Association {
        self.schema.associate(columns)
    }

    fn accept(
        &mut self,
        association: &Association,
        columns: &[ColumnMeta],
        row: &[SqlValue],
    ) -> Result<(), DecodeError> {
        let mut record = T::default();
        self.schema
            .decode_row(association, columns, row, &mut record)?;
        self.dest.push(record);
        Ok(())
    }
}

/// Where the rows of a query go.
///
/// ```rust
/// use sql_dbc::prelude::*;
///
/// # fn demo(conn: &Connection) -> Result<(), DbcError> {
/// let mut count = 0_i64;
/// conn.query("SELECT COUNT(*) FROM users", &[])
///     .load(Destination::scalar(&mut count))?;
///
/// let mut rows: Vec<Record> = Vec::new();
/// conn.query("SELECT id, name FROM users", &[])
///     .load(Destination::records(&mut rows))?;
/// # Ok(()) }
/// ```
pub enum Destination<'a> {
    /// First column of the first row; no row leaves the target untouched.
    Scalar(&'a mut dyn ScalarSink),
    /// First column of every row, appended in row order.
    ScalarSequence(&'a mut dyn SequenceSink),
    /// Every column of the first row, keyed by column name.
    DynamicRecord(&'a mut Record),
    /// One record per row, appended in row order.
    DynamicRecordSequence(&'a mut Vec<Record>),
    /// Bound columns of the first row written into one record.
    TaggedRecord(Box<dyn TaggedSink + 'a>),
    /// One record per row; the sink decides how rows are stored.
    TaggedRecordSequence(Box<dyn TaggedSink + 'a>),
}

impl<'a> Destination<'a> {
    pub fn scalar<T: FromValue>(dest: &'a mut T) -> Self {
        Destination::Scalar(dest)
    }

    pub fn scalars<T: FromValue>(dest: &'a mut Vec<T>) -> Self {
        Destination::ScalarSequence(dest)
    }

    pub fn record(dest: &'a mut Record) -> Self {
        Destination::DynamicRecord(dest)
    }

    pub fn records(dest: &'a mut Vec<Record>) -> Self {
        Destination::DynamicRecordSequence(dest)
    }

    pub fn tagged<T>(schema: &'a Schema<T>, dest: &'a mut T) -> Self {
        Destination::TaggedRecord(Box::new(TaggedOne { schema, dest }))
    }

    pub fn tagged_seq<T: Default>(schema: &'a Schema<T>, dest: &'a mut Vec<T>) -> Self {
        Destination::TaggedRecordSequence(Box::new(TaggedMany { schema, dest }))
    }

    /// Like [`Destination::tagged`], using the schema the record type declares.
    pub fn of<T: Tagged>(dest: &'a mut T) -> Self {
        Self::tagged(T::schema(), dest)
    }

    /// Like [`Destination::tagged_seq`], using the schema the record type declares.
    pub fn seq_of<T: Tagged + Default>(dest: &'a mut Vec<T>) -> Self {
        Self::tagged_seq(T::schema(), dest)
    }
}

/// Closes the cursor on every exit path.
struct CursorGuard(Box<dyn Cursor>);

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if let Err(err) = self.0.close() {
            tracing::warn!(error = %err, "failed to close result cursor");
        }
    }
}

/// Drain `cursor` into `dest`.
///
/// A decode error wins over the cursor's own terminal error; the latter is returned only when
/// decoding succeeded. Rows already appended to a sequence stay there when decoding stops.
///
/// # Errors
/// Returns `DbcError::Decode` for conversion failures and `DbcError::Statement` (operation
/// `Scan`) when the row stream itself failed.
pub fn load(cursor: Box<dyn Cursor>, dest: Destination<'_>) -> Result<(), DbcError> {
    let mut guard = CursorGuard(cursor);
    let cursor = guard.0.as_mut();

    match dest {
        Destination::Scalar(sink) => load_scalar(cursor, sink)?,
        Destination::ScalarSequence(sink) => load_scalars(cursor, sink)?,
        Destination::DynamicRecord(record) => load_record(cursor, record)?,
        Destination::DynamicRecordSequence(records) => load_records(cursor, records)?,
        Destination::TaggedRecord(mut sink) => load_tagged(cursor, sink.as_mut(), false)?,
        Destination::TaggedRecordSequence(mut sink) => load_tagged(cursor, sink.as_mut(), true)?,
    }

    match cursor.err() {
        Some(err) => Err(DbcError::statement(Operation::Scan, err)),
        None => Ok(()),
    }
}

/// Scalar shapes take rows of exactly one column.
fn single_cell<'c>(
    columns: &'c [ColumnMeta],
    row: &[SqlValue],
) -> Result<&'c ColumnMeta, DecodeError> {
    match (columns.first(), row.len()) {
        (Some(column), 1) => Ok(column),
        _ => Err(DecodeError::ColumnCount {
            expected: 1,
            found: row.len(),
        }),
    }
}

fn load_scalar(cursor: &mut dyn Cursor, sink: &mut dyn ScalarSink) -> Result<(), DecodeError> {
    let Some(row) = cursor.next_row() else {
        return Ok(());
    };
    let column = single_cell(cursor.columns(), &row)?;
    sink.scan(column, &row[0])
}

fn load_scalars(cursor: &mut dyn Cursor, sink: &mut dyn SequenceSink) -> Result<(), DecodeError> {
    while let Some(row) = cursor.next_row() {
        let column = single_cell(cursor.columns(), &row)?;
        sink.push_scan(column, &row[0])?;
    }
    Ok(())
}

fn load_record(cursor: &mut dyn Cursor, record: &mut Record) -> Result<(), DecodeError> {
    let Some(row) = cursor.next_row() else {
        return Ok(());
    };
    let plan = DynamicPlan::new(cursor.columns())?;
    plan.fill(row, record)
}

fn load_records(cursor: &mut dyn Cursor, records: &mut Vec<Record>) -> Result<(), DecodeError> {
    let Some(first) = cursor.next_row() else {
        return Ok(());
    };
    // Columns are fixed for the whole result set; copy them so the plan outlives the borrow
    // needed to keep advancing the cursor.
    let columns = cursor.columns().to_vec();
    let plan = DynamicPlan::new(&columns)?;

    let mut next = Some(first);
    while let Some(row) = next {
        let mut record = Record::with_capacity(columns.len());
        plan.fill(row, &mut record)?;
        records.push(record);
        next = cursor.next_row();
    }
    Ok(())
}

fn load_tagged(
    cursor: &mut dyn Cursor,
    sink: &mut dyn TaggedSink,
    all_rows: bool,
) -> Result<(), DecodeError> {
    let columns = cursor.columns().to_vec();
    let association = sink.associate(&columns);
    while let Some(row) = cursor.next_row() {
        sink.accept(&association, &columns, &row)?;
        if !all_rows {
            break;
        }
    }
    Ok(())
}
