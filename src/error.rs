use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// The driver call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Ping,
    Close,
    Exec,
    Query,
    Scan,
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Ping => "ping",
            Operation::Close => "close",
            Operation::Exec => "exec",
            Operation::Query => "query",
            Operation::Scan => "scan",
            Operation::Begin => "begin",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// An error reported by the underlying driver.
///
/// Shared behind an `Arc` so results and broken chains can hand the same failure out more
/// than once.
#[derive(Clone)]
pub struct DriverError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl DriverError {
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    /// Build a driver error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(MessageError(message.into())))
    }

    /// Whether two handles point at the very same underlying error.
    #[must_use]
    pub fn same_as(&self, other: &DriverError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        DriverError::new(err)
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

/// Failures while turning rows into a destination shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("column {column:?}: cannot scan {found} into {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("column {column:?}: unsupported column type {type_name:?}")]
    UnsupportedColumnType { column: String, type_name: String },

    #[error("expected {expected} column(s), result has {found}")]
    ColumnCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, Error)]
pub enum DbcError {
    #[error("connection error during {op}: {source}")]
    Connection {
        op: Operation,
        #[source]
        source: DriverError,
    },

    #[error("Named parameter @{name} was not found")]
    NamedParameterNotFound { name: String },

    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{op} failed: {source}")]
    Statement {
        op: Operation,
        #[source]
        source: DriverError,
    },

    #[error("transaction {op} failed: {source}")]
    Transaction {
        op: Operation,
        #[source]
        source: DriverError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbcError {
    pub(crate) fn connection(op: Operation, source: DriverError) -> Self {
        DbcError::Connection { op, source }
    }

    pub(crate) fn statement(op: Operation, source: DriverError) -> Self {
        DbcError::Statement { op, source }
    }

    pub(crate) fn transaction(op: Operation, source: DriverError) -> Self {
        DbcError::Transaction { op, source }
    }

    /// The operation a driver-level error was wrapped with, if any.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            DbcError::Connection { op, .. }
            | DbcError::Statement { op, .. }
            | DbcError::Transaction { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// The driver error underneath, if any.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            DbcError::Connection { source, .. }
            | DbcError::Statement { source, .. }
            | DbcError::Transaction { source, .. } => Some(source),
            _ => None,
        }
    }
}
