use async_trait::async_trait;
use nlquery_utils::error::StoreError;
use nlquery_utils::types::Row;
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Decode, Row as _, TypeInfo, ValueRef};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

use crate::DataStore;

/// SQLite database opened read-only.
///
/// The connection is opened with `SQLITE_OPEN_READONLY`, so even a statement
/// that slipped past query validation cannot modify the file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database at `path` with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the file does not exist or cannot
    /// be opened.
    pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::Connection(format!(
                "database file not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!(path = %path.display(), max_connections, "Opened SQLite store");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn query(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        let started = Instant::now();
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let decoded = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
        debug!(
            rows = decoded.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(decoded)
    }
}

/// Keep the database's own wording for statement errors; the repair prompt
/// needs it verbatim.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => StoreError::Query(db.message().to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

/// Decode one row into a column-ordered JSON map.
///
/// Declared `BOOLEAN` columns become booleans. Everything else follows the
/// value's storage class, which is what SQLite actually returned: TEXT stays
/// a string verbatim and BLOB becomes an array of bytes.
fn decode_row(row: &SqliteRow) -> Result<Row, StoreError> {
    let mut map = Row::new();
    for col in row.columns() {
        let field = col.name();
        let raw_value = row
            .try_get_raw(col.ordinal())
            .map_err(|e| decode_error(field, e))?;

        let value = if raw_value.is_null() {
            Value::Null
        } else {
            let declared = col.type_info();
            let storage = raw_value.type_info();
            let column_type = if declared.name() == "BOOLEAN" {
                "BOOLEAN"
            } else if storage.is_null() {
                declared.name()
            } else {
                storage.name()
            };

            match column_type {
                "BOOLEAN" => decode_raw::<bool>(field, raw_value)?.into(),
                "INTEGER" => decode_raw::<i64>(field, raw_value)?.into(),
                "REAL" | "NUMERIC" => decode_raw::<f64>(field, raw_value)?.into(),
                "BLOB" => decode_raw::<Vec<u8>>(field, raw_value)?.into(),
                _ => Value::String(decode_raw::<String>(field, raw_value)?),
            }
        };
        map.insert(field.to_owned(), value);
    }
    Ok(map)
}

fn decode_raw<'r, T>(field: &str, value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<T, StoreError>
where
    T: Decode<'r, Sqlite>,
{
    T::decode(value).map_err(|source| {
        warn!(column = field, "Failed to decode column");
        StoreError::Decode {
            column: field.to_owned(),
            reason: source.to_string(),
        }
    })
}

fn decode_error(field: &str, err: sqlx::Error) -> StoreError {
    StoreError::Decode {
        column: field.to_owned(),
        reason: err.to_string(),
    }
}
