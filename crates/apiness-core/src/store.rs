//! The `TableStore` and `Connector` traits, and the per-process connection
//! registry.
//!
//! Traits are implemented by storage backends (e.g. `apiness-store-sqlite`).
//! The materializer, query runner and route configuration store only ever
//! see these abstractions.

use std::future::Future;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::info;

use crate::{
  Error, Result,
  ident::StoreLocation,
  table::{ConflictPolicy, Table},
};

// ─── Result set ──────────────────────────────────────────────────────────────

/// Rows returned by [`TableStore::execute`], in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<Value>>,
}

impl ResultSet {
  /// Convert to one JSON object per row, keyed by column name.
  pub fn into_records(self) -> Vec<Map<String, Value>> {
    let columns = self.columns;
    self
      .rows
      .into_iter()
      .map(|row| columns.iter().cloned().zip(row).collect())
      .collect()
  }

  /// The first cell of the first row, if any.
  pub fn scalar(&self) -> Option<&Value> { self.rows.first().and_then(|r| r.first()) }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A handle to one relational store.
///
/// Cloning must be cheap: clones share the underlying connection. All methods
/// return `Send` futures so handles can be driven from axum handlers.
pub trait TableStore: Clone + Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Short name used in error messages.
  fn name(&self) -> &str;

  /// Run a single read statement and collect every row.
  fn execute(
    &self,
    sql: String,
  ) -> impl Future<Output = Result<ResultSet, Self::Error>> + Send + '_;

  fn table_exists(
    &self,
    table: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Drop `table` if it exists.
  fn drop_table(
    &self,
    table: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Write `data` into `table`, prefixed by a generated integer `id` column.
  ///
  /// `Append` creates the table when missing and continues ids after the
  /// current maximum. `Replace` and `Fail` create the table and error if it
  /// already exists. Returns the number of rows written.
  fn write_table(
    &self,
    table: String,
    data: Table,
    policy: ConflictPolicy,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

/// Opens [`TableStore`] handles for resolved store locations.
pub trait Connector: Send + Sync + 'static {
  type Store: TableStore;

  fn connect(
    &self,
    location: StoreLocation,
  ) -> impl Future<Output = Result<Self::Store, <Self::Store as TableStore>::Error>> + Send + '_;
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Caches one open handle per store location.
///
/// Every request naming the same store gets a clone of the same handle, so
/// the in-memory store is shared across requests for the process lifetime.
pub struct ConnectionRegistry<C: Connector> {
  connector: C,
  handles:   DashMap<String, C::Store>,
}

impl<C: Connector> ConnectionRegistry<C> {
  pub fn new(connector: C) -> Self { Self { connector, handles: DashMap::new() } }

  /// Return the cached handle for `location`, opening it on first use.
  pub async fn handle(&self, location: &StoreLocation) -> Result<C::Store> {
    let key = location.key();
    let cached = self.handles.get(&key).map(|h| h.value().clone());
    if let Some(store) = cached {
      return Ok(store);
    }

    let opened = self
      .connector
      .connect(location.clone())
      .await
      .map_err(|e| Error::database(location.file_name(), e))?;
    info!(store = %location, "opened store");

    // A concurrent open may have won the race; keep whichever landed first.
    Ok(self.handles.entry(key).or_insert(opened).value().clone())
  }

  pub fn len(&self) -> usize { self.handles.len() }

  pub fn is_empty(&self) -> bool { self.handles.is_empty() }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{
      Arc,
      atomic::{AtomicUsize, Ordering},
    },
  };

  use serde_json::json;

  use super::*;

  #[derive(Clone)]
  struct NullStore {
    serial: usize,
  }

  impl TableStore for NullStore {
    type Error = Infallible;

    fn name(&self) -> &str { "null" }

    async fn execute(&self, _sql: String) -> Result<ResultSet, Infallible> {
      Ok(ResultSet::default())
    }

    async fn table_exists(&self, _table: String) -> Result<bool, Infallible> { Ok(false) }

    async fn drop_table(&self, _table: String) -> Result<(), Infallible> { Ok(()) }

    async fn write_table(
      &self,
      _table: String,
      data: Table,
      _policy: ConflictPolicy,
    ) -> Result<usize, Infallible> {
      Ok(data.len())
    }
  }

  #[derive(Default)]
  struct CountingConnector {
    opened: Arc<AtomicUsize>,
  }

  impl Connector for CountingConnector {
    type Store = NullStore;

    async fn connect(&self, _location: StoreLocation) -> Result<NullStore, Infallible> {
      Ok(NullStore { serial: self.opened.fetch_add(1, Ordering::SeqCst) })
    }
  }

  #[tokio::test]
  async fn registry_reuses_handles_per_location() {
    let registry = ConnectionRegistry::new(CountingConnector::default());
    let memory = StoreLocation::memory();
    let file = crate::ident::resolve_store(Some("demo"), std::path::Path::new("data")).unwrap();

    let a = registry.handle(&memory).await.unwrap();
    let b = registry.handle(&memory).await.unwrap();
    let c = registry.handle(&file).await.unwrap();
    assert_eq!(a.serial, b.serial);
    assert_ne!(a.serial, c.serial);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.handle(&file).await.unwrap().serial, c.serial);
  }

  #[test]
  fn result_set_into_records() {
    let rs = ResultSet {
      columns: vec!["id".into(), "name".into()],
      rows:    vec![vec![json!(1), json!("a")], vec![json!(2), json!(null)]],
    };
    assert_eq!(rs.scalar(), Some(&json!(1)));
    let records = rs.into_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], json!("a"));
    assert_eq!(records[1]["name"], Value::Null);
    assert_eq!(records[0].keys().map(String::as_str).collect::<Vec<_>>(), ["id", "name"]);
  }
}
