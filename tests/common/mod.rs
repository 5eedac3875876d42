#![allow(dead_code)]

//! Scripted driver used to inject faults the bundled `SQLite` driver cannot produce on demand.

use std::sync::{Arc, Mutex};

use sql_dbc::driver::{
    BufferedCursor, ColumnMeta, Cursor, Driver, DriverTx, ExecSummary, Statements, TxOptions,
};
use sql_dbc::error::DriverError;
use sql_dbc::types::SqlValue;

/// How the mock behaves.
#[derive(Debug, Default, Clone)]
pub struct Script {
    pub fail_ping: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    /// Any statement containing this text fails.
    pub fail_marker: Option<String>,
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Reported by every cursor once its rows are exhausted.
    pub terminal_error: Option<String>,
}

/// What the mock saw.
#[derive(Debug, Default)]
pub struct Calls {
    pub statements: Vec<String>,
    pub args: Vec<Vec<SqlValue>>,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
    pub cursor_closes: usize,
}

pub type SharedCalls = Arc<Mutex<Calls>>;

pub struct MockDriver {
    script: Arc<Script>,
    calls: SharedCalls,
}

impl MockDriver {
    pub fn new(script: Script) -> (Box<dyn Driver>, SharedCalls) {
        let calls = SharedCalls::default();
        let driver = MockDriver {
            script: Arc::new(script),
            calls: Arc::clone(&calls),
        };
        (Box::new(driver), calls)
    }
}

fn run_exec(
    script: &Script,
    calls: &SharedCalls,
    query: &str,
    args: &[SqlValue],
) -> Result<ExecSummary, DriverError> {
    let mut calls = calls.lock().unwrap();
    calls.statements.push(query.to_string());
    calls.args.push(args.to_vec());
    if fails(script, query) {
        return Err(DriverError::msg(format!("scripted failure: {query}")));
    }
    Ok(ExecSummary {
        last_insert_id: calls.statements.len() as i64,
        rows_affected: 1,
    })
}

fn run_query(
    script: &Script,
    calls: &SharedCalls,
    query: &str,
    args: &[SqlValue],
) -> Result<Box<dyn Cursor>, DriverError> {
    {
        let mut seen = calls.lock().unwrap();
        seen.statements.push(query.to_string());
        seen.args.push(args.to_vec());
    }
    if fails(script, query) {
        return Err(DriverError::msg(format!("scripted failure: {query}")));
    }
    let mut inner = BufferedCursor::new(script.columns.clone(), script.rows.clone());
    if let Some(msg) = &script.terminal_error {
        inner = inner.with_terminal_error(DriverError::msg(msg.clone()));
    }
    Ok(Box::new(CountingCursor {
        inner,
        calls: Arc::clone(calls),
    }))
}

/// Records every `close` in `Calls::cursor_closes`.
struct CountingCursor {
    inner: BufferedCursor,
    calls: SharedCalls,
}

impl Cursor for CountingCursor {
    fn columns(&self) -> &[ColumnMeta] {
        self.inner.columns()
    }

    fn next_row(&mut self) -> Option<Vec<SqlValue>> {
        self.inner.next_row()
    }

    fn err(&self) -> Option<DriverError> {
        self.inner.err()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.calls.lock().unwrap().cursor_closes += 1;
        self.inner.close()
    }
}

fn fails(script: &Script, query: &str) -> bool {
    script
        .fail_marker
        .as_deref()
        .is_some_and(|marker| query.contains(marker))
}

impl Statements for MockDriver {
    fn exec(&self, query: &str, args: &[SqlValue]) -> Result<ExecSummary, DriverError> {
        run_exec(&self.script, &self.calls, query, args)
    }

    fn query(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn Cursor>, DriverError> {
        run_query(&self.script, &self.calls, query, args)
    }
}

impl Driver for MockDriver {
    fn ping(&self) -> Result<(), DriverError> {
        if self.script.fail_ping {
            return Err(DriverError::msg("scripted ping failure"));
        }
        Ok(())
    }

    fn begin(&self, _options: &TxOptions) -> Result<Box<dyn DriverTx + '_>, DriverError> {
        self.calls.lock().unwrap().begins += 1;
        Ok(Box::new(MockTx {
            script: Arc::clone(&self.script),
            calls: Arc::clone(&self.calls),
        }))
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.calls.lock().unwrap().closes += 1;
        Ok(())
    }
}

struct MockTx {
    script: Arc<Script>,
    calls: SharedCalls,
}

impl Statements for MockTx {
    fn exec(&self, query: &str, args: &[SqlValue]) -> Result<ExecSummary, DriverError> {
        run_exec(&self.script, &self.calls, query, args)
    }

    fn query(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn Cursor>, DriverError> {
        run_query(&self.script, &self.calls, query, args)
    }
}

impl DriverTx for MockTx {
    fn commit(self: Box<Self>) -> Result<(), DriverError> {
        self.calls.lock().unwrap().commits += 1;
        if self.script.fail_commit {
            return Err(DriverError::msg("scripted commit failure"));
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        self.calls.lock().unwrap().rollbacks += 1;
        if self.script.fail_rollback {
            return Err(DriverError::msg("scripted rollback failure"));
        }
        Ok(())
    }
}
