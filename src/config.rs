use serde::Deserialize;

use crate::conn::Connection;
use crate::error::DbcError;
use crate::types::Flavor;

/// Options for opening a [`Connection`].
///
/// Deserializable so it can sit inside an application's own config file:
///
/// ```rust
/// use sql_dbc::prelude::*;
///
/// let opts: ConnectOptions =
///     serde_json::from_str(r#"{ "flavor": "sqlite", "dsn": ":memory:", "wal": true }"#).unwrap();
/// assert_eq!(opts.flavor, Flavor::Sqlite);
/// assert!(opts.wal);
/// assert!(!opts.trace_statements);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectOptions {
    pub flavor: Flavor,
    pub dsn: String,
    /// Install the `tracing` hook pair on the new connection.
    #[serde(default)]
    pub trace_statements: bool,
    /// Switch `SQLite` databases to WAL journaling after opening.
    #[serde(default)]
    pub wal: bool,
}

impl ConnectOptions {
    #[must_use]
    pub fn new(flavor: Flavor, dsn: impl Into<String>) -> Self {
        Self {
            flavor,
            dsn: dsn.into(),
            trace_statements: false,
            wal: false,
        }
    }

    #[must_use]
    pub fn builder(flavor: Flavor, dsn: impl Into<String>) -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::new(flavor, dsn)
    }
}

/// Fluent builder for [`ConnectOptions`].
#[derive(Debug, Clone)]
pub struct ConnectOptionsBuilder {
    opts: ConnectOptions,
}

impl ConnectOptionsBuilder {
    #[must_use]
    pub fn new(flavor: Flavor, dsn: impl Into<String>) -> Self {
        Self {
            opts: ConnectOptions::new(flavor, dsn),
        }
    }

    #[must_use]
    pub fn trace_statements(mut self, trace_statements: bool) -> Self {
        self.opts.trace_statements = trace_statements;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectOptions {
        self.opts
    }

    /// Open a connection with the collected options.
    ///
    /// # Errors
    /// Returns `DbcError::Connection` if opening fails or the database does not answer a ping.
    pub fn connect(self) -> Result<Connection, DbcError> {
        crate::conn::connect_with(&self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_flags() {
        let opts = ConnectOptionsBuilder::new(Flavor::Custom, "mock://")
            .trace_statements(true)
            .wal(true)
            .finish();
        assert_eq!(opts.dsn, "mock://");
        assert!(opts.trace_statements);
        assert!(opts.wal);
    }

    #[test]
    fn flags_default_to_off_when_deserialized() {
        let opts: ConnectOptions =
            serde_json::from_str(r#"{ "flavor": "custom", "dsn": "x" }"#).unwrap();
        assert_eq!(opts, ConnectOptions::new(Flavor::Custom, "x"));
    }

    #[test]
    fn unknown_flavor_is_rejected() {
        let parsed = serde_json::from_str::<ConnectOptions>(r#"{ "flavor": "oracle", "dsn": "x" }"#);
        assert!(parsed.is_err());
    }
}
