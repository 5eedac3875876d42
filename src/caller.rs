use std::time::Instant;

use crate::callbacks::Callbacks;
use crate::driver::Statements;
use crate::error::{DbcError, Operation};
use crate::named::{NamedParams, rewrite};
use crate::result::{ExecResult, QueryResult};
use crate::types::SqlValue;

/// Statements that do not return rows. Implemented by [`Connection`](crate::Connection) and
/// [`Transaction`](crate::Transaction).
pub trait Executor {
    /// Execute a statement with positional `?` arguments.
    fn exec(&self, query: &str, args: &[SqlValue]) -> ExecResult<'_>;

    /// Execute a statement with `@name` references resolved from `params`. A reference that
    /// cannot be resolved fails the call before anything reaches the driver.
    fn exec_named(&self, query: &str, params: &dyn NamedParams) -> ExecResult<'_>;
}

/// Statements that return rows.
pub trait Querier {
    fn query(&self, query: &str, args: &[SqlValue]) -> QueryResult;

    fn query_named(&self, query: &str, params: &dyn NamedParams) -> QueryResult;
}

/// Runs statements against a driver handle with the registry's hooks around each one.
pub(crate) struct Caller<'a, S: ?Sized> {
    pub(crate) db: &'a S,
    pub(crate) callbacks: &'a Callbacks,
}

impl<S: Statements + ?Sized> Caller<'_, S> {
    pub(crate) fn exec<'r>(
        &self,
        executor: &'r dyn Executor,
        query: &str,
        args: &[SqlValue],
    ) -> ExecResult<'r> {
        self.callbacks.call_before(query);
        let started_at = Instant::now();
        let outcome = self
            .db
            .exec(query, args)
            .map_err(|e| DbcError::statement(Operation::Exec, e));
        self.callbacks
            .call_after(query, started_at.elapsed(), outcome.as_ref().err());
        ExecResult::new(executor, outcome)
    }

    pub(crate) fn exec_named<'r>(
        &self,
        executor: &'r dyn Executor,
        query: &str,
        params: &dyn NamedParams,
    ) -> ExecResult<'r> {
        match rewrite(query, params) {
            Ok(rewritten) => self.exec(executor, &rewritten.sql, &rewritten.args),
            Err(err) => ExecResult::new(executor, Err(err)),
        }
    }

    pub(crate) fn query(&self, query: &str, args: &[SqlValue]) -> QueryResult {
        self.callbacks.call_before(query);
        let started_at = Instant::now();
        let outcome = self
            .db
            .query(query, args)
            .map_err(|e| DbcError::statement(Operation::Query, e));
        self.callbacks
            .call_after(query, started_at.elapsed(), outcome.as_ref().err());
        QueryResult::new(outcome)
    }

    pub(crate) fn query_named(&self, query: &str, params: &dyn NamedParams) -> QueryResult {
        match rewrite(query, params) {
            Ok(rewritten) => self.query(&rewritten.sql, &rewritten.args),
            Err(err) => QueryResult::new(Err(err)),
        }
    }
}
