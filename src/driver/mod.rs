//! Boundary to the blocking SQL driver.
//!
//! The access layer never talks to a database directly; it goes through these traits. The
//! bundled `sqlite` module implements them on top of rusqlite, and tests or other backends can
//! supply their own.

use std::collections::VecDeque;

use crate::error::DriverError;
use crate::types::SqlValue;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// What the driver reports for a successful `exec`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecSummary {
    pub last_insert_id: i64,
    pub rows_affected: u64,
}

/// Locking behaviour requested when a transaction starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TxBehavior {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

/// Options for `Connection::begin_with`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub behavior: TxBehavior,
}

impl TxOptions {
    #[must_use]
    pub fn with_behavior(mut self, behavior: TxBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

/// Type family of a result column, as far as dynamic decoding is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Text,
    Integer,
    Boolean,
}

/// Name and driver-reported type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub database_type: Option<String>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, database_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            database_type: database_type.map(str::to_owned),
        }
    }

    /// Classify the reported type, ignoring case and any size suffix such as `VARCHAR(10)`.
    #[must_use]
    pub fn family(&self) -> Option<TypeFamily> {
        let raw = self.database_type.as_deref()?;
        let base = raw.split('(').next().unwrap_or(raw).trim().to_ascii_uppercase();
        match base.as_str() {
            "VARCHAR" | "NVARCHAR" | "TEXT" | "CHAR" | "NCHAR" | "CLOB" | "STRING" => {
                Some(TypeFamily::Text)
            }
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "INT2"
            | "INT4" | "INT8" => Some(TypeFamily::Integer),
            "BOOL" | "BOOLEAN" => Some(TypeFamily::Boolean),
            _ => None,
        }
    }
}

/// Single-pass handle over the rows of one query.
pub trait Cursor {
    fn columns(&self) -> &[ColumnMeta];

    /// Advance to the next row. `None` means the rows are exhausted or the stream failed;
    /// check `err` to tell the two apart.
    fn next_row(&mut self) -> Option<Vec<SqlValue>>;

    /// Terminal error of the stream, if it stopped early. Only reported once `next_row` has
    /// returned `None`; rows that were never requested cannot fail the caller.
    fn err(&self) -> Option<DriverError>;

    /// Release the cursor. Calling it more than once is harmless.
    ///
    /// # Errors
    /// Returns the driver's error if releasing the underlying resources fails.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// Statement execution shared by open connections and transactions.
pub trait Statements {
    /// # Errors
    /// Returns the driver's error if the statement fails.
    fn exec(&self, query: &str, args: &[SqlValue]) -> Result<ExecSummary, DriverError>;

    /// # Errors
    /// Returns the driver's error if the statement cannot be started.
    fn query(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn Cursor>, DriverError>;
}

/// An open driver handle.
pub trait Driver: Statements + Send {
    /// # Errors
    /// Returns the driver's error if the database does not answer.
    fn ping(&self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns the driver's error if the transaction cannot be started.
    fn begin(&self, options: &TxOptions) -> Result<Box<dyn DriverTx + '_>, DriverError>;

    /// # Errors
    /// Returns the driver's error if the handle cannot be shut down cleanly.
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// An in-flight driver transaction. Both terminal calls consume the handle.
pub trait DriverTx: Statements {
    /// # Errors
    /// Returns the driver's error if the commit fails.
    fn commit(self: Box<Self>) -> Result<(), DriverError>;

    /// # Errors
    /// Returns the driver's error if the rollback fails.
    fn rollback(self: Box<Self>) -> Result<(), DriverError>;
}

/// Cursor over rows that were already fetched, optionally ending in a stream error.
#[derive(Debug, Default)]
pub struct BufferedCursor {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<SqlValue>>,
    terminal: Option<DriverError>,
    /// Set once `next_row` has returned `None` for lack of rows.
    exhausted: bool,
    closed: bool,
}

impl BufferedCursor {
    #[must_use]
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            terminal: None,
            exhausted: false,
            closed: false,
        }
    }

    /// Report `err` once the caller has read past the last buffered row.
    #[must_use]
    pub fn with_terminal_error(mut self, err: DriverError) -> Self {
        self.terminal = Some(err);
        self
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Cursor for BufferedCursor {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Vec<SqlValue>> {
        if self.closed {
            return None;
        }
        let row = self.rows.pop_front();
        if row.is_none() {
            self.exhausted = true;
        }
        row
    }

    fn err(&self) -> Option<DriverError> {
        if self.exhausted {
            self.terminal.clone()
        } else {
            None
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_ignore_case_and_size() {
        assert_eq!(
            ColumnMeta::new("a", Some("varchar(10)")).family(),
            Some(TypeFamily::Text)
        );
        assert_eq!(
            ColumnMeta::new("b", Some("BIGINT")).family(),
            Some(TypeFamily::Integer)
        );
        assert_eq!(
            ColumnMeta::new("c", Some("Boolean")).family(),
            Some(TypeFamily::Boolean)
        );
        assert_eq!(ColumnMeta::new("d", Some("REAL")).family(), None);
        assert_eq!(ColumnMeta::new("e", None).family(), None);
    }

    #[test]
    fn buffered_cursor_reports_terminal_error_after_rows() {
        let mut cursor = BufferedCursor::new(
            vec![ColumnMeta::new("id", Some("INTEGER"))],
            vec![vec![SqlValue::Int(1)]],
        )
        .with_terminal_error(DriverError::msg("connection reset"));

        assert!(cursor.err().is_none());
        assert_eq!(cursor.next_row(), Some(vec![SqlValue::Int(1)]));
        // The last row was read, but nobody asked for the next one yet.
        assert!(cursor.err().is_none());
        assert!(cursor.next_row().is_none());
        assert_eq!(cursor.err().map(|e| e.to_string()).as_deref(), Some("connection reset"));
    }

    #[test]
    fn closed_cursor_yields_nothing() {
        let mut cursor = BufferedCursor::new(
            vec![ColumnMeta::new("id", Some("INTEGER"))],
            vec![vec![SqlValue::Int(1)]],
        );
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert!(cursor.next_row().is_none());
    }
}
