use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::callbacks::Callbacks;
use crate::caller::{Caller, Executor, Querier};
use crate::config::ConnectOptions;
#[cfg(feature = "sqlite")]
use crate::driver::sqlite::SqliteDriver;
use crate::driver::Driver;
use crate::error::{DbcError, Operation};
use crate::named::NamedParams;
use crate::result::{ExecResult, QueryResult};
use crate::types::{Flavor, SqlValue};

/// An open database handle plus the hooks that run around its statements.
///
/// The connection exclusively owns the driver. Transactions opened with
/// [`Connection::begin`] borrow it and share its hook registry.
pub struct Connection {
    pub(crate) driver: Box<dyn Driver>,
    pub(crate) callbacks: Arc<Callbacks>,
    flavor: Flavor,
}

/// Open a connection and check that it answers.
///
/// # Errors
/// Returns `DbcError::Connection` (operation `Open` or `Ping`) if the database cannot be opened
/// or does not respond, and `DbcError::Config` for flavors that need a caller-supplied driver.
pub fn connect(flavor: Flavor, dsn: &str) -> Result<Connection, DbcError> {
    connect_with(&ConnectOptions::new(flavor, dsn))
}

/// Open a connection as described by `opts`.
///
/// # Errors
/// Same as [`connect`]; a failure to switch the journal mode is reported as an `Open` error.
pub fn connect_with(opts: &ConnectOptions) -> Result<Connection, DbcError> {
    let driver = open_driver(opts)?;
    let conn = Connection::with_flavor(driver, opts.flavor)?;
    if opts.trace_statements {
        conn.callbacks.install_tracing();
    }
    tracing::debug!(flavor = ?opts.flavor, dsn = %opts.dsn, "connection opened");
    Ok(conn)
}

fn open_driver(opts: &ConnectOptions) -> Result<Box<dyn Driver>, DbcError> {
    match opts.flavor {
        #[cfg(feature = "sqlite")]
        Flavor::Sqlite => {
            let driver = SqliteDriver::open(&opts.dsn)
                .map_err(|e| DbcError::connection(Operation::Open, e))?;
            if opts.wal {
                driver
                    .enable_wal()
                    .map_err(|e| DbcError::connection(Operation::Open, e))?;
            }
            Ok(Box::new(driver))
        }
        Flavor::Custom => Err(DbcError::Config(
            "custom drivers are attached with Connection::from_driver".into(),
        )),
    }
}

impl Connection {
    /// Wrap an already open driver after checking that it answers.
    ///
    /// # Errors
    /// Returns `DbcError::Connection` (operation `Ping`) if the driver does not answer.
    pub fn from_driver(driver: Box<dyn Driver>) -> Result<Self, DbcError> {
        Self::with_flavor(driver, Flavor::Custom)
    }

    fn with_flavor(driver: Box<dyn Driver>, flavor: Flavor) -> Result<Self, DbcError> {
        driver
            .ping()
            .map_err(|e| DbcError::connection(Operation::Ping, e))?;
        Ok(Self {
            driver,
            callbacks: Arc::new(Callbacks::new()),
            flavor,
        })
    }

    #[must_use]
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// The hook registry shared with every transaction of this connection.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<Callbacks> {
        &self.callbacks
    }

    /// Register a hook that runs before every statement.
    pub fn before<F>(&self, cb: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.add_before(cb);
    }

    /// Register a hook that runs after every statement, successful or not.
    pub fn after<F>(&self, cb: F)
    where
        F: Fn(&str, Duration, Option<&DbcError>) + Send + Sync + 'static,
    {
        self.callbacks.add_after(cb);
    }

    /// Check that the database still answers.
    ///
    /// # Errors
    /// Returns `DbcError::Connection` (operation `Ping`) if it does not.
    pub fn ping(&self) -> Result<(), DbcError> {
        self.driver
            .ping()
            .map_err(|e| DbcError::connection(Operation::Ping, e))
    }

    /// Close the underlying handle.
    ///
    /// # Errors
    /// Returns `DbcError::Connection` (operation `Close`) if the driver refuses to close.
    pub fn close(self) -> Result<(), DbcError> {
        tracing::debug!(flavor = ?self.flavor, "closing connection");
        self.driver
            .close()
            .map_err(|e| DbcError::connection(Operation::Close, e))
    }

    fn caller(&self) -> Caller<'_, dyn Driver> {
        Caller {
            db: self.driver.as_ref(),
            callbacks: &self.callbacks,
        }
    }
}

impl Executor for Connection {
    fn exec(&self, query: &str, args: &[SqlValue]) -> ExecResult<'_> {
        self.caller().exec(self, query, args)
    }

    fn exec_named(&self, query: &str, params: &dyn NamedParams) -> ExecResult<'_> {
        self.caller().exec_named(self, query, params)
    }
}

impl Querier for Connection {
    fn query(&self, query: &str, args: &[SqlValue]) -> QueryResult {
        self.caller().query(query, args)
    }

    fn query_named(&self, query: &str, params: &dyn NamedParams) -> QueryResult {
        self.caller().query_named(query, params)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("flavor", &self.flavor)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn hooks_wrap_every_attempt() {
        let conn = connect(Flavor::Sqlite, ":memory:").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let before = Arc::clone(&log);
        conn.before(move |q| before.lock().unwrap().push(format!("before {q}")));
        let after = Arc::clone(&log);
        conn.after(move |q, _, err| {
            after
                .lock()
                .unwrap()
                .push(format!("after {q} failed={}", err.is_some()));
        });

        assert!(conn.exec("CREATE TABLE t (a INTEGER)", &[]).is_ok());
        assert!(conn.exec("INSERT INTO nope VALUES (1)", &[]).error().is_some());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "before CREATE TABLE t (a INTEGER)".to_string(),
                "after CREATE TABLE t (a INTEGER) failed=false".to_string(),
                "before INSERT INTO nope VALUES (1)".to_string(),
                "after INSERT INTO nope VALUES (1) failed=true".to_string(),
            ]
        );
    }

    #[test]
    fn custom_flavor_needs_a_driver() {
        let err = connect(Flavor::Custom, "anything").unwrap_err();
        assert!(matches!(err, DbcError::Config(_)));
    }

    #[test]
    fn exec_reports_insert_id_and_rows() {
        let conn = connect(Flavor::Sqlite, ":memory:").unwrap();
        conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", &[])
            .into_result()
            .unwrap();
        let res = conn.exec("INSERT INTO t (v) VALUES (?)", &["a".into()]);
        assert_eq!(res.last_insert_id(), 1);
        assert_eq!(res.rows_affected(), 1);
        conn.close().unwrap();
    }
}
