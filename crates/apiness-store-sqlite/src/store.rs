//! [`SqliteStore`], the SQLite implementation of [`TableStore`], and the
//! [`SqliteConnector`] that opens it.

use std::path::Path;

use apiness_core::{
  ident::{StoreLocation, StorePath},
  store::{Connector, ResultSet, TableStore},
  table::{ConflictPolicy, Table},
};
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value as SqlValue};
use tracing::debug;

use crate::{
  Result,
  encode::{decode_value, encode_cell},
  schema,
};

/// Rows inserted per transaction.
const CHUNK_ROWS: usize = 100_000;

const MEMORY_NAME: &str = ":memory:";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A store backed by a single SQLite file or the in-memory database.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  name: String,
}

impl SqliteStore {
  /// Open (or create) a store at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Ok(Self { conn, name })
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self { conn, name: MEMORY_NAME.to_owned() })
  }
}

impl TableStore for SqliteStore {
  type Error = crate::Error;

  fn name(&self) -> &str { &self.name }

  async fn execute(&self, sql: String) -> Result<ResultSet> {
    let rs = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> =
          stmt.column_names().into_iter().map(str::to_owned).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
          let values = (0..width)
            .map(|i| row.get_ref(i).map(decode_value))
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.push(values);
        }
        Ok(ResultSet { columns, rows })
      })
      .await?;
    Ok(rs)
  }

  async fn table_exists(&self, table: String) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        let found = conn
          .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            rusqlite::params![table],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(found)
      })
      .await?;
    Ok(exists)
  }

  async fn drop_table(&self, table: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", schema::quote_ident(&table)))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write_table(&self, table: String, data: Table, policy: ConflictPolicy) -> Result<usize> {
    let columns = data.column_names().to_vec();
    let ddl = schema::create_table(
      &table,
      &columns,
      data.storage_types(),
      policy == ConflictPolicy::Append,
    );
    let insert = schema::insert(&table, &columns);
    let next_id = schema::next_id(&table);
    let rows = data.into_rows();
    let store = self.name.clone();

    let written = self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        let start: i64 = conn.query_row(&next_id, [], |r| r.get(0))?;

        let mut id = start;
        for chunk in rows.chunks(CHUNK_ROWS) {
          let tx = conn.transaction()?;
          {
            let mut stmt = tx.prepare_cached(&insert)?;
            for row in chunk {
              let values = std::iter::once(SqlValue::Integer(id)).chain(row.iter().map(encode_cell));
              stmt.execute(params_from_iter(values))?;
              id += 1;
            }
          }
          tx.commit()?;
          debug!(store = %store, table = %table, rows = chunk.len(), "wrote chunk");
        }
        Ok(rows.len())
      })
      .await?;
    Ok(written)
  }
}

// ─── Connector ───────────────────────────────────────────────────────────────

/// Opens [`SqliteStore`]s, creating parent directories for file stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
  type Store = SqliteStore;

  async fn connect(&self, location: StoreLocation) -> Result<SqliteStore> {
    match location.path {
      StorePath::Memory => SqliteStore::open_in_memory().await,
      StorePath::File(path) => {
        if let Some(parent) = path.parent()
          && !parent.as_os_str().is_empty()
        {
          tokio::fs::create_dir_all(parent).await?;
        }
        SqliteStore::open(&path).await
      }
    }
  }
}
