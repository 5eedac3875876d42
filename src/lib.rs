//! Blocking SQL access layer.
//!
//! A [`Connection`] wraps a driver and adds:
//!
//! - `@name` parameters rewritten into positional placeholders ([`named`])
//! - before/after hooks around every statement ([`callbacks`])
//! - exec chains that stop at the first failure ([`ExecChain`])
//! - closure-scoped transactions that commit on `Ok` and roll back on `Err`
//! - decoding of result rows into scalars, maps and tagged records ([`decode`], [`schema`])
//!
//! ```rust
//! use std::collections::HashMap;
//! use sql_dbc::prelude::*;
//!
//! # fn main() -> Result<(), DbcError> {
//! let conn = connect(Flavor::Sqlite, ":memory:")?;
//! conn.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])
//!     .then()
//!     .exec("INSERT INTO users (name) VALUES ('ada')", &[])
//!     .into_result()?;
//!
//! let mut params = HashMap::new();
//! params.insert("name".to_string(), SqlValue::from("ada"));
//! let mut id = 0_i64;
//! conn.query_named("SELECT id FROM users WHERE name = @name", &params)
//!     .load(Destination::scalar(&mut id))?;
//! assert_eq!(id, 1);
//! conn.close()
//! # }
//! ```

pub mod callbacks;
pub mod caller;
pub mod config;
pub mod conn;
pub mod decode;
pub mod driver;
pub mod error;
pub mod named;
pub mod prelude;
pub mod result;
pub mod schema;
pub mod tx;
pub mod types;

pub use callbacks::Callbacks;
pub use caller::{Executor, Querier};
pub use config::{ConnectOptions, ConnectOptionsBuilder};
pub use conn::{Connection, connect, connect_with};
pub use decode::{Destination, FromValue, Record, load};
pub use error::{DbcError, DecodeError, DriverError, Operation};
pub use named::{NamedParams, StructParams, rewrite};
pub use result::{ExecChain, ExecResult, QueryResult};
pub use schema::{Schema, Tagged};
pub use tx::Transaction;
pub use types::{Flavor, SqlValue};
