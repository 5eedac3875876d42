//! Hooks run around every statement.
//!
//! One registry is shared by a connection and all transactions opened from it, so a hook
//! registered while a transaction is running applies to that transaction's next statement.
//! Registration and dispatch are synchronised internally. Dispatch works on a snapshot of the
//! hook list, so a hook may itself register hooks; those run from the following statement on.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::DbcError;

/// Called with the query text before it is sent to the driver.
pub type BeforeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Called with the query text, the elapsed time and the outcome after the driver returned.
pub type AfterCallback = Arc<dyn Fn(&str, Duration, Option<&DbcError>) + Send + Sync>;

#[derive(Default)]
pub struct Callbacks {
    before: RwLock<Vec<BeforeCallback>>,
    after: RwLock<Vec<AfterCallback>>,
}

impl Callbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_before<F>(&self, cb: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.before
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(cb));
    }

    pub fn add_after<F>(&self, cb: F)
    where
        F: Fn(&str, Duration, Option<&DbcError>) + Send + Sync + 'static,
    {
        self.after
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(cb));
    }

    pub fn call_before(&self, query: &str) {
        let hooks = self
            .before
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for cb in &hooks {
            cb(query);
        }
    }

    pub fn call_after(&self, query: &str, took: Duration, err: Option<&DbcError>) {
        let hooks = self
            .after
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for cb in &hooks {
            cb(query, took, err);
        }
    }

    /// Register a hook pair that logs every statement through `tracing`.
    pub fn install_tracing(&self) {
        self.add_before(|query| {
            tracing::trace!(target: "sql_dbc::statement", query, "statement starting");
        });
        self.add_after(|query, took, err| {
            let micros = u64::try_from(took.as_micros()).unwrap_or(u64::MAX);
            match err {
                None => tracing::debug!(target: "sql_dbc::statement", query, micros, "statement finished"),
                Some(err) => tracing::warn!(
                    target: "sql_dbc::statement",
                    query,
                    micros,
                    error = %err,
                    "statement failed"
                ),
            }
        });
    }

    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        (
            self.before.read().unwrap_or_else(PoisonError::into_inner).len(),
            self.after.read().unwrap_or_else(PoisonError::into_inner).len(),
        )
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (before, after) = self.counts();
        f.debug_struct("Callbacks")
            .field("before", &before)
            .field("after", &after)
            .finish()
    }
}
