//! The route configuration store: the durable record of every synthesized
//! data route, used to rebuild the HTTP surface on restart.
//!
//! Records live in an ordinary relation named [`ROUTES_CONFIG_TABLE`] with
//! four text columns. Writes always append.

use serde_json::Value;
use tracing::{debug, info};

use crate::{
  Error, Result,
  filter::quote,
  materialize::materialize,
  schema::RouteRecord,
  store::TableStore,
  table::{Cell, ConflictPolicy, Table},
};

pub const ROUTES_CONFIG_TABLE: &str = "routes_config";

const COLUMNS: [&str; 4] = ["route_path", "route_name", "route_tags", "query_params"];

/// Reads and writes [`RouteRecord`]s in one store.
#[derive(Clone)]
pub struct RoutesConfigStore<S> {
  store: S,
}

impl<S: TableStore> RoutesConfigStore<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Drop every record. Used when bootstrapping a fresh session.
  pub async fn reset(&self) -> Result<()> {
    self
      .store
      .drop_table(ROUTES_CONFIG_TABLE.to_owned())
      .await
      .map_err(|e| Error::database(self.store.name(), e))?;
    info!(store = self.store.name(), "reset route configuration");
    Ok(())
  }

  /// Append one record.
  pub async fn record(&self, route: &RouteRecord) -> Result<()> {
    let row = vec![
      Cell::Text(route.route_path.clone()),
      Cell::Text(route.route_name.clone()),
      Cell::Text(route.encode_tags()?),
      Cell::Text(route.encode_params()?),
    ];
    let table = Table::new(COLUMNS.iter().map(|c| c.to_string()).collect(), vec![row]);
    materialize(&self.store, ROUTES_CONFIG_TABLE, table, ConflictPolicy::Append).await?;
    debug!(path = %route.route_path, "recorded route");
    Ok(())
  }

  /// Every record in insertion order. Empty if nothing was ever recorded.
  pub async fn all_records(&self) -> Result<Vec<RouteRecord>> {
    if !self.exists().await? {
      return Ok(Vec::new());
    }
    self.select("ORDER BY id".to_owned()).await
  }

  /// The most recent record for `route_path`.
  pub async fn record_for(&self, route_path: &str) -> Result<RouteRecord> {
    let not_found = || Error::NotFound(format!("no route record for {route_path}"));
    if !self.exists().await? {
      return Err(not_found());
    }
    self
      .select(format!("WHERE route_path={} ORDER BY id DESC LIMIT 1", quote(route_path)))
      .await?
      .pop()
      .ok_or_else(not_found)
  }

  async fn exists(&self) -> Result<bool> {
    self
      .store
      .table_exists(ROUTES_CONFIG_TABLE.to_owned())
      .await
      .map_err(|e| Error::database(self.store.name(), e))
  }

  async fn select(&self, tail: String) -> Result<Vec<RouteRecord>> {
    let sql = format!("SELECT {} FROM {ROUTES_CONFIG_TABLE} {tail}", COLUMNS.join(", "));
    let rows = self
      .store
      .execute(sql)
      .await
      .map_err(|e| Error::database(self.store.name(), e))?
      .rows;

    rows.into_iter().map(decode_row).collect()
  }
}

fn decode_row(row: Vec<Value>) -> Result<RouteRecord> {
  let text = |i: usize| -> Result<String> {
    match row.get(i) {
      Some(Value::String(s)) => Ok(s.clone()),
      other => Err(Error::CorruptRecord(format!(
        "column {} holds {other:?}, expected text",
        COLUMNS[i]
      ))),
    }
  };
  RouteRecord::decode(text(0)?, text(1)?, &text(2)?, &text(3)?)
}
