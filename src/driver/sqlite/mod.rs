// SQLite driver - the bundled implementation of the driver boundary
//
// - params: conversion from `SqlValue` to rusqlite values
// - query: statement execution and row buffering

pub mod params;
pub mod query;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::driver::{Cursor, Driver, DriverTx, ExecSummary, Statements, TxBehavior, TxOptions};
use crate::error::DriverError;
use crate::types::SqlValue;

/// A rusqlite connection behind the driver traits.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open the database at `path`; `:memory:` and `file:` URIs are accepted.
    ///
    /// # Errors
    /// Returns the rusqlite error if the database cannot be opened.
    pub fn open(path: &str) -> Result<Self, DriverError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Switch the journal to WAL.
    ///
    /// # Errors
    /// Returns the rusqlite error if the pragma fails.
    pub fn enable_wal(&self) -> Result<(), DriverError> {
        self.conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(())
    }
}

impl Statements for SqliteDriver {
    fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<ExecSummary, DriverError> {
        query::exec(&self.conn, sql, args)
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Box<dyn Cursor>, DriverError> {
        Ok(Box::new(query::query(&self.conn, sql, args)?))
    }
}

impl Driver for SqliteDriver {
    fn ping(&self) -> Result<(), DriverError> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn begin(&self, options: &TxOptions) -> Result<Box<dyn DriverTx + '_>, DriverError> {
        let behavior = match options.behavior {
            TxBehavior::Deferred => TransactionBehavior::Deferred,
            TxBehavior::Immediate => TransactionBehavior::Immediate,
            TxBehavior::Exclusive => TransactionBehavior::Exclusive,
        };
        let tx = Transaction::new_unchecked(&self.conn, behavior)?;
        Ok(Box::new(SqliteTx { tx }))
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn.close().map_err(|(_, err)| DriverError::from(err))
    }
}

/// Transaction on a [`SqliteDriver`]. Dropping it without a terminal call rolls back.
pub struct SqliteTx<'conn> {
    tx: Transaction<'conn>,
}

impl Statements for SqliteTx<'_> {
    fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<ExecSummary, DriverError> {
        query::exec(&self.tx, sql, args)
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Box<dyn Cursor>, DriverError> {
        Ok(Box::new(query::query(&self.tx, sql, args)?))
    }
}

impl DriverTx for SqliteTx<'_> {
    fn commit(self: Box<Self>) -> Result<(), DriverError> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        self.tx.rollback()?;
        Ok(())
    }
}
