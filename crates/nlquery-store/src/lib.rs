//! Read-only data store access for nlquery
//!
//! The workflow engine only sees [`DataStore`]; [`SqliteStore`] is the
//! production implementation.

mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;

pub use nlquery_utils::error::StoreError;
pub use nlquery_utils::types::Row;
pub use sqlite::SqliteStore;

/// Executes a single validated query and returns its rows in store order.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Run `query` and collect every row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Query` with the store's own message when the
    /// statement is rejected, and `StoreError::Connection` when the store is
    /// unreachable.
    async fn query(&self, query: &str) -> Result<Vec<Row>, StoreError>;
}

#[async_trait]
impl<T: DataStore + ?Sized> DataStore for Arc<T> {
    async fn query(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        (**self).query(query).await
    }
}
