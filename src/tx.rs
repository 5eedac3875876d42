use std::fmt;

use crate::callbacks::Callbacks;
use crate::caller::{Caller, Executor, Querier};
use crate::conn::Connection;
use crate::driver::{DriverTx, TxOptions};
use crate::error::{DbcError, Operation};
use crate::named::NamedParams;
use crate::result::{ExecResult, QueryResult};
use crate::types::SqlValue;

/// Transaction handle passed to the handler of [`Connection::begin`].
///
/// The handle is only borrowed by the handler; committing or rolling back is decided by the
/// handler's return value, so each happens at most once.
pub struct Transaction<'c> {
    handle: Box<dyn DriverTx + 'c>,
    callbacks: &'c Callbacks,
}

impl<'c> Transaction<'c> {
    /// The registry shared with the parent connection.
    #[must_use]
    pub fn callbacks(&self) -> &Callbacks {
        self.callbacks
    }

    fn caller(&self) -> Caller<'_, dyn DriverTx + 'c> {
        Caller {
            db: self.handle.as_ref(),
            callbacks: self.callbacks,
        }
    }

    fn commit(self) -> Result<(), DbcError> {
        self.handle
            .commit()
            .map_err(|e| DbcError::transaction(Operation::Commit, e))?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// The caller's error takes precedence, so a failed rollback is only logged.
    fn rollback(self) {
        match self.handle.rollback() {
            Ok(()) => tracing::debug!("transaction rolled back"),
            Err(err) => tracing::warn!(error = %err, "rollback after handler error failed"),
        }
    }
}

impl Executor for Transaction<'_> {
    fn exec(&self, query: &str, args: &[SqlValue]) -> ExecResult<'_> {
        self.caller().exec(self, query, args)
    }

    fn exec_named(&self, query: &str, params: &dyn NamedParams) -> ExecResult<'_> {
        self.caller().exec_named(self, query, params)
    }
}

impl Querier for Transaction<'_> {
    fn query(&self, query: &str, args: &[SqlValue]) -> QueryResult {
        self.caller().query(query, args)
    }

    fn query_named(&self, query: &str, params: &dyn NamedParams) -> QueryResult {
        self.caller().query_named(query, params)
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("callbacks", self.callbacks)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Run `handler` inside a transaction with default options.
    ///
    /// ```rust
    /// use sql_dbc::prelude::*;
    ///
    /// # fn demo(conn: &Connection) -> Result<(), DbcError> {
    /// let id = conn.begin(|tx| {
    ///     let id = tx
    ///         .exec("INSERT INTO accounts (owner) VALUES (?)", &["ada".into()])
    ///         .into_result()?
    ///         .last_insert_id;
    ///     tx.exec("INSERT INTO ledger (account, amount) VALUES (?, 0)", &[id.into()])
    ///         .into_result()?;
    ///     Ok::<_, DbcError>(id)
    /// })?;
    /// # let _ = id;
    /// # Ok(()) }
    /// ```
    ///
    /// # Errors
    /// See [`Connection::begin_with`].
    pub fn begin<T, E, F>(&self, handler: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbcError>,
    {
        self.begin_with(TxOptions::default(), handler)
    }

    /// Run `handler` inside a transaction.
    ///
    /// When the handler returns `Ok` the transaction is committed before this returns. When it
    /// returns `Err` the transaction is rolled back exactly once and the handler's error is
    /// returned, whether or not the rollback succeeded. If the handler panics the driver handle
    /// is dropped, which rolls back for drivers that roll back on drop.
    ///
    /// # Errors
    /// Returns `DbcError::Transaction` (operation `Begin` or `Commit`) converted into `E`, or the
    /// handler's own error.
    pub fn begin_with<T, E, F>(&self, options: TxOptions, handler: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbcError>,
    {
        let handle = self
            .driver
            .begin(&options)
            .map_err(|e| DbcError::transaction(Operation::Begin, e))?;
        tracing::debug!(behavior = ?options.behavior, "transaction started");

        let tx = Transaction {
            handle,
            callbacks: &self.callbacks,
        };
        match handler(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use crate::prelude::*;

    fn setup() -> Connection {
        let conn = connect(Flavor::Sqlite, ":memory:").unwrap();
        conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", &[])
            .into_result()
            .unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        let mut n = -1_i64;
        conn.query("SELECT COUNT(*) FROM t", &[])
            .load(Destination::scalar(&mut n))
            .unwrap();
        n
    }

    #[test]
    fn ok_handler_commits() {
        let conn = setup();
        let value = conn
            .begin(|tx| {
                tx.exec("INSERT INTO t (v) VALUES ('a')", &[]).into_result()?;
                Ok::<_, DbcError>(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn failing_handler_rolls_back_and_keeps_its_error() {
        let conn = setup();
        let err = conn
            .begin(|tx| {
                tx.exec("INSERT INTO t (v) VALUES ('a')", &[]).into_result()?;
                tx.exec("INSERT INTO missing VALUES (1)", &[]).into_result()?;
                Ok::<_, DbcError>(())
            })
            .unwrap_err();
        assert_eq!(err.operation(), Some(Operation::Exec));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn immediate_behaviour_is_accepted() {
        let conn = setup();
        conn.begin_with(TxOptions::default().with_behavior(TxBehavior::Immediate), |tx| {
            tx.exec("INSERT INTO t (v) VALUES ('b')", &[]).into_result()
        })
        .unwrap();
        assert_eq!(count(&conn), 1);
    }
}
