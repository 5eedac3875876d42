//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::callbacks::Callbacks;
pub use crate::caller::{Executor, Querier};
pub use crate::config::{ConnectOptions, ConnectOptionsBuilder};
pub use crate::conn::{Connection, connect, connect_with};
pub use crate::decode::{Destination, FromValue, Record, load};
pub use crate::driver::{ExecSummary, TxBehavior, TxOptions};
pub use crate::error::{DbcError, DecodeError, Operation};
pub use crate::named::{NamedParams, StructParams, rewrite};
pub use crate::result::{ExecChain, ExecResult, QueryResult};
pub use crate::schema::{Schema, Tagged};
pub use crate::tx::Transaction;
pub use crate::types::{Flavor, SqlValue};

#[cfg(feature = "sqlite")]
pub use crate::driver::sqlite::SqliteDriver;
