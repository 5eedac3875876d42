use std::fmt;

use crate::caller::Executor;
use crate::decode::{Destination, load};
use crate::driver::{Cursor, ExecSummary};
use crate::error::DbcError;
use crate::named::NamedParams;
use crate::types::SqlValue;

/// Outcome of a single `exec`.
///
/// Holds either the driver's summary or the error, never both.
pub struct ExecResult<'a> {
    outcome: Result<Completed<'a>, DbcError>,
}

struct Completed<'a> {
    summary: ExecSummary,
    executor: &'a dyn Executor,
}

impl<'a> ExecResult<'a> {
    pub(crate) fn new(executor: &'a dyn Executor, outcome: Result<ExecSummary, DbcError>) -> Self {
        Self {
            outcome: outcome.map(|summary| Completed { summary, executor }),
        }
    }

    fn failed(err: DbcError) -> Self {
        Self { outcome: Err(err) }
    }

    #[must_use]
    pub fn error(&self) -> Option<&DbcError> {
        self.outcome.as_ref().err()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Row id of the last insert; `0` when the statement failed.
    #[must_use]
    pub fn last_insert_id(&self) -> i64 {
        self.summary().map_or(0, |s| s.last_insert_id)
    }

    /// Rows changed by the statement; `0` when it failed.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.summary().map_or(0, |s| s.rows_affected)
    }

    #[must_use]
    pub fn summary(&self) -> Option<ExecSummary> {
        self.outcome.as_ref().ok().map(|c| c.summary)
    }

    /// # Errors
    /// Returns the statement's error, if it failed.
    pub fn into_result(self) -> Result<ExecSummary, DbcError> {
        self.outcome.map(|c| c.summary)
    }

    /// Continue with another statement on the same executor.
    ///
    /// If this statement failed the returned chain is broken: every further call on it returns
    /// this error without reaching the driver or the hooks.
    ///
    /// ```rust
    /// use sql_dbc::prelude::*;
    ///
    /// # fn demo(conn: &Connection) -> Result<(), DbcError> {
    /// conn.exec("INSERT INTO t VALUES (1)", &[])
    ///     .then()
    ///     .exec("INSERT INTO t VALUES (2)", &[])
    ///     .then()
    ///     .exec("INSERT INTO t VALUES (3)", &[])
    ///     .into_result()?;
    /// # Ok(()) }
    /// ```
    #[must_use]
    pub fn then(self) -> ExecChain<'a> {
        match self.outcome {
            Ok(done) => ExecChain::Live(done.executor),
            Err(err) => ExecChain::Broken(err),
        }
    }
}

impl fmt::Debug for ExecResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecResult")
            .field("summary", &self.summary())
            .field("error", &self.error())
            .finish()
    }
}

/// Sequential statements that stop at the first failure.
pub enum ExecChain<'a> {
    Live(&'a dyn Executor),
    /// Holds the error that broke the chain.
    Broken(DbcError),
}

impl<'a> ExecChain<'a> {
    pub fn exec(&self, query: &str, args: &[SqlValue]) -> ExecResult<'a> {
        match *self {
            ExecChain::Live(executor) => executor.exec(query, args),
            ExecChain::Broken(ref err) => ExecResult::failed(err.clone()),
        }
    }

    pub fn exec_named(&self, query: &str, params: &dyn NamedParams) -> ExecResult<'a> {
        match *self {
            ExecChain::Live(executor) => executor.exec_named(query, params),
            ExecChain::Broken(ref err) => ExecResult::failed(err.clone()),
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&DbcError> {
        match self {
            ExecChain::Live(_) => None,
            ExecChain::Broken(err) => Some(err),
        }
    }

    #[must_use]
    pub fn is_broken(&self) -> bool {
        matches!(self, ExecChain::Broken(_))
    }
}

impl fmt::Debug for ExecChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecChain::Live(_) => f.write_str("ExecChain::Live"),
            ExecChain::Broken(err) => f.debug_tuple("ExecChain::Broken").field(err).finish(),
        }
    }
}

/// Outcome of a single `query`: a live cursor or the error, never both.
///
/// The cursor is consumed by [`QueryResult::load`]. Dropping an unread result closes it.
pub struct QueryResult {
    /// `None` once the cursor has been handed out.
    cursor: Option<Box<dyn Cursor>>,
    error: Option<DbcError>,
}

impl QueryResult {
    pub(crate) fn new(outcome: Result<Box<dyn Cursor>, DbcError>) -> Self {
        match outcome {
            Ok(cursor) => Self {
                cursor: Some(cursor),
                error: None,
            },
            Err(err) => Self {
                cursor: None,
                error: Some(err),
            },
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&DbcError> {
        self.error.as_ref()
    }

    /// Take the cursor; the caller becomes responsible for closing it.
    ///
    /// # Errors
    /// Returns the query's error, if it failed.
    pub fn into_cursor(mut self) -> Result<Box<dyn Cursor>, DbcError> {
        self.take_cursor()
    }

    /// Decode every row into `dest` and close the cursor.
    ///
    /// # Errors
    /// Returns the query's own error if it failed, otherwise whatever decoding reports.
    pub fn load(mut self, dest: Destination<'_>) -> Result<(), DbcError> {
        load(self.take_cursor()?, dest)
    }

    fn take_cursor(&mut self) -> Result<Box<dyn Cursor>, DbcError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.cursor
            .take()
            .ok_or_else(|| DbcError::Parameter("query result was already consumed".into()))
    }
}

impl Drop for QueryResult {
    fn drop(&mut self) {
        if let Some(mut cursor) = self.cursor.take()
            && let Err(err) = cursor.close()
        {
            tracing::warn!(error = %err, "failed to close unread result cursor");
        }
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("QueryResult");
        if let Some(cursor) = &self.cursor {
            out.field("columns", &cursor.columns());
        }
        if let Some(err) = &self.error {
            out.field("error", err);
        }
        out.finish()
    }
}
