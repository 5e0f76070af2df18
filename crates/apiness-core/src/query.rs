//! Executing compiled queries and shaping the result envelope.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{Error, Result, filter::CompiledQuery, store::TableStore};

/// Metadata describing one executed query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetadata {
  pub database:      String,
  pub table:         String,
  pub sql_query:     String,
  /// Rows matching the predicate, ignoring projection and `cmd`.
  pub full_count:    u64,
  pub results_count: u64,
}

/// The JSON body returned by a data route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEnvelope {
  pub metadata: QueryMetadata,
  pub data:     Vec<Map<String, Value>>,
}

/// The result of [`run`]: rows plus metadata, along with the column order
/// for renderers that need it.
#[derive(Debug, Clone)]
pub struct QueryOutput {
  pub columns:  Vec<String>,
  pub envelope: QueryEnvelope,
}

/// Execute `query` against `store`.
///
/// The count statement runs first; the select follows. Either failure is
/// reported as a database error naming the store.
pub async fn run<S: TableStore>(
  store: &S,
  database: &str,
  query: &CompiledQuery,
) -> Result<QueryOutput> {
  let count_sql = query.count_sql();
  debug!(store = store.name(), sql = %count_sql, "counting rows");
  let counted = store
    .execute(count_sql)
    .await
    .map_err(|e| Error::database(store.name(), e))?;
  let full_count = counted.scalar().and_then(Value::as_u64).unwrap_or(0);

  let sql_query = query.select_sql();
  debug!(store = store.name(), sql = %sql_query, "selecting rows");
  let selected = store
    .execute(sql_query.clone())
    .await
    .map_err(|e| Error::database(store.name(), e))?;

  let columns = selected.columns.clone();
  let data = selected.into_records();
  let metadata = QueryMetadata {
    database: database.to_owned(),
    table: query.table.clone(),
    sql_query,
    full_count,
    results_count: data.len() as u64,
  };

  Ok(QueryOutput { columns, envelope: QueryEnvelope { metadata, data } })
}
