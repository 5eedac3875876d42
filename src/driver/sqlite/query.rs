use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use crate::driver::{BufferedCursor, ColumnMeta, ExecSummary};
use crate::error::DriverError;
use crate::types::SqlValue;

use super::params::Params;

/// Extract a `SqlValue` from a `SQLite` row.
///
/// # Errors
///
/// Returns the rusqlite error if the cell cannot be read.
pub fn sqlite_extract_value(row: &Row<'_>, idx: usize) -> Result<SqlValue, rusqlite::Error> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    })
}

fn storage_class(value: &SqlValue) -> Option<&'static str> {
    match value {
        SqlValue::Int(_) => Some("INTEGER"),
        SqlValue::Float(_) => Some("REAL"),
        SqlValue::Text(_) => Some("TEXT"),
        SqlValue::Blob(_) => Some("BLOB"),
        _ => None,
    }
}

pub(super) fn exec(
    conn: &Connection,
    query: &str,
    args: &[SqlValue],
) -> Result<ExecSummary, DriverError> {
    let params = Params::convert(args);
    let mut stmt = conn.prepare(query)?;
    let rows_affected = stmt.execute(params.as_params())?;
    Ok(ExecSummary {
        last_insert_id: conn.last_insert_rowid(),
        rows_affected: rows_affected as u64,
    })
}

/// Run a query and buffer its rows.
///
/// A failure on the first step is returned as the query error; a later failure becomes the
/// terminal error of the returned cursor, after the rows read so far.
pub(super) fn query(
    conn: &Connection,
    query: &str,
    args: &[SqlValue],
) -> Result<BufferedCursor, DriverError> {
    let params = Params::convert(args);
    let mut stmt = conn.prepare(query)?;
    let mut columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .map(|col| ColumnMeta::new(col.name(), col.decl_type()))
        .collect();
    let column_count = columns.len();

    let mut rows_iter = stmt.query(params.as_params())?;
    let mut rows: Vec<Vec<SqlValue>> = Vec::new();
    let mut terminal: Option<DriverError> = None;

    loop {
        match rows_iter.next() {
            Ok(Some(row)) => {
                let mut values = Vec::with_capacity(column_count);
                let mut failed = None;
                for idx in 0..column_count {
                    match sqlite_extract_value(row, idx) {
                        Ok(value) => values.push(value),
                        Err(err) => {
                            failed = Some(err);
                            break;
                        }
                    }
                }
                if let Some(err) = failed {
                    terminal = Some(err.into());
                    break;
                }
                rows.push(values);
            }
            Ok(None) => break,
            Err(err) if rows.is_empty() => return Err(err.into()),
            Err(err) => {
                terminal = Some(err.into());
                break;
            }
        }
    }

    // Expressions carry no declared type; report the storage class of the first value instead.
    for (idx, column) in columns.iter_mut().enumerate() {
        if column.database_type.is_none() {
            column.database_type = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .find_map(storage_class)
                .map(str::to_owned);
        }
    }

    let cursor = BufferedCursor::new(columns, rows);
    Ok(match terminal {
        Some(err) => cursor.with_terminal_error(err),
        None => cursor,
    })
}
