//! Integration tests for `SqliteStore` driven through the core materializer,
//! query runner and route configuration store.

use apiness_core::{
  Error as CoreError,
  filter::compile,
  ident::{StoreLocation, resolve_store},
  kind::{ParamValue, ScalarKind},
  materialize::materialize,
  query,
  routes_config::RoutesConfigStore,
  schema::{ParameterSchema, RouteRecord},
  store::{ConnectionRegistry, TableStore},
  table::{Cell, ConflictPolicy, Table},
};
use serde_json::json;

use crate::{SqliteConnector, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn items(rows: &[(&str, i64)]) -> Table {
  Table::new(
    vec!["name".into(), "score".into()],
    rows
      .iter()
      .map(|(name, score)| vec![Cell::from(*name), Cell::Integer(*score)])
      .collect(),
  )
}

async fn count(s: &SqliteStore, table: &str) -> u64 {
  let compiled = compile(table, &[]).unwrap();
  query::run(s, "memory", &compiled)
    .await
    .unwrap()
    .envelope
    .metadata
    .full_count
}

// ─── Materializer ────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_then_query_returns_every_row() {
  let s = store().await;
  let relation = materialize(&s, "Items", items(&[("a", 1), ("b", 2)]), ConflictPolicy::Replace)
    .await
    .unwrap();
  assert_eq!(relation.table, "items");
  assert_eq!(relation.rows_written, 2);
  assert_eq!(relation.columns[1].kind, ScalarKind::Integer);

  let out = query::run(&s, "memory", &compile("items", &[]).unwrap()).await.unwrap();
  let meta = &out.envelope.metadata;
  assert_eq!(meta.full_count, 2);
  assert_eq!(meta.results_count, 2);
  assert_eq!(meta.sql_query, "SELECT * FROM items");
  assert_eq!(out.columns, ["id", "name", "score"]);
  assert_eq!(out.envelope.data[0]["id"], json!(0));
  assert_eq!(out.envelope.data[1]["name"], json!("b"));
}

#[tokio::test]
async fn replace_discards_previous_rows() {
  let s = store().await;
  materialize(&s, "items", items(&[("a", 1), ("b", 2)]), ConflictPolicy::Replace)
    .await
    .unwrap();
  materialize(&s, "items", items(&[("c", 3)]), ConflictPolicy::Replace)
    .await
    .unwrap();
  assert_eq!(count(&s, "items").await, 1);
}

#[tokio::test]
async fn append_sums_row_counts_and_continues_ids() {
  let s = store().await;
  materialize(&s, "items", items(&[("a", 1), ("b", 2)]), ConflictPolicy::Append)
    .await
    .unwrap();
  materialize(&s, "items", items(&[("c", 3), ("d", 4), ("e", 5)]), ConflictPolicy::Append)
    .await
    .unwrap();
  assert_eq!(count(&s, "items").await, 5);

  let rs = s.execute("SELECT MAX(id), COUNT(DISTINCT id) FROM items".into()).await.unwrap();
  assert_eq!(rs.rows[0], vec![json!(4), json!(5)]);
}

#[tokio::test]
async fn fail_on_existing_table_preserves_data() {
  let s = store().await;
  materialize(&s, "items", items(&[("a", 1), ("b", 2)]), ConflictPolicy::Replace)
    .await
    .unwrap();
  let err = materialize(&s, "items", items(&[("z", 9)]), ConflictPolicy::Fail)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Database { .. }));
  assert_eq!(count(&s, "items").await, 2);
}

#[tokio::test]
async fn invalid_table_name_writes_nothing() {
  let s = store().await;
  let err = materialize(&s, "items;drop", items(&[("a", 1)]), ConflictPolicy::Replace)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidIdentifier { .. }));
  assert!(!s.table_exists("items;drop".into()).await.unwrap());
}

#[tokio::test]
async fn column_names_are_normalised() {
  let s = store().await;
  let table = Table::new(
    vec!["First Name".into(), "Unnamed: 1".into()],
    vec![vec!["a".into(), Cell::Real(1.5)]],
  );
  let relation = materialize(&s, "people", table, ConflictPolicy::Replace).await.unwrap();
  let names: Vec<&str> = relation.columns.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, ["first_name", "x__1"]);

  let out = query::run(&s, "memory", &compile("people", &[]).unwrap()).await.unwrap();
  assert_eq!(out.envelope.data[0]["x__1"], json!(1.5));
}

#[tokio::test]
async fn booleans_are_stored_as_integers() {
  let s = store().await;
  let table = Table::new(vec!["flag".into()], vec![vec![Cell::Bool(true)], vec![Cell::Bool(false)]]);
  let relation = materialize(&s, "flags", table, ConflictPolicy::Replace).await.unwrap();
  assert_eq!(relation.columns[0].kind, ScalarKind::Integer);

  let rs = s.execute("SELECT flag FROM flags ORDER BY id".into()).await.unwrap();
  assert_eq!(rs.rows, vec![vec![json!(1)], vec![json!(0)]]);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_count_ignores_projection_and_limit() {
  let s = store().await;
  materialize(&s, "items", items(&[("a", 1), ("b", 2), ("c", 3)]), ConflictPolicy::Replace)
    .await
    .unwrap();

  let params = vec![
    ("score_gte".to_string(), ParamValue::Integer(2)),
    ("cmd".to_string(), ParamValue::Text("ORDER BY score DESC LIMIT 1".into())),
    ("cols".to_string(), ParamValue::Text("name".into())),
  ];
  let out = query::run(&s, "memory", &compile("items", &params).unwrap()).await.unwrap();
  assert_eq!(out.envelope.metadata.full_count, 2);
  assert_eq!(out.envelope.metadata.results_count, 1);
  assert_eq!(out.envelope.data[0], json!({ "name": "c" }).as_object().unwrap().clone());
}

#[tokio::test]
async fn missing_table_is_a_database_error() {
  let s = store().await;
  let err = query::run(&s, "memory", &compile("nowhere", &[]).unwrap())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Database { .. }));
  assert!(err.to_string().contains(":memory:"));
  assert!(err.to_string().contains("nowhere"));
}

// ─── Route configuration ─────────────────────────────────────────────────────

fn record(path: &str, schema: &ParameterSchema) -> RouteRecord {
  RouteRecord::new(path, "demo_items", vec!["demo".into()], schema)
}

#[tokio::test]
async fn routes_config_round_trips_records() {
  let config = RoutesConfigStore::new(store().await);
  assert!(config.all_records().await.unwrap().is_empty());

  let relation = materialize(config.store(), "items", items(&[("a", 1)]), ConflictPolicy::Replace)
    .await
    .unwrap();
  let schema = ParameterSchema::for_columns(&relation.columns);
  let first = record("/demo/{table}", &schema);
  let second = record("/other/{table}", &ParameterSchema::for_columns(&[]));
  config.record(&first).await.unwrap();
  config.record(&second).await.unwrap();

  let all = config.all_records().await.unwrap();
  assert_eq!(all, vec![first.clone(), second]);
  assert_eq!(all[0].schema().unwrap(), schema);

  assert_eq!(config.record_for("/demo/{table}").await.unwrap(), first);
}

#[tokio::test]
async fn record_for_returns_latest_or_not_found() {
  let config = RoutesConfigStore::new(store().await);
  assert!(matches!(
    config.record_for("/demo/{table}").await.unwrap_err(),
    CoreError::NotFound(_)
  ));

  let old = record("/demo/{table}", &ParameterSchema::for_columns(&[]));
  let mut schema = ParameterSchema::new();
  schema.push("score", ScalarKind::Integer);
  let new = record("/demo/{table}", &schema);
  config.record(&old).await.unwrap();
  config.record(&new).await.unwrap();
  assert_eq!(config.record_for("/demo/{table}").await.unwrap(), new);

  config.reset().await.unwrap();
  assert!(config.all_records().await.unwrap().is_empty());
  assert!(matches!(
    config.record_for("/demo/{table}").await.unwrap_err(),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn record_paths_with_quotes_are_escaped() {
  let config = RoutesConfigStore::new(store().await);
  let rec = record("/it's/{table}", &ParameterSchema::for_columns(&[]));
  config.record(&rec).await.unwrap();
  assert_eq!(config.record_for("/it's/{table}").await.unwrap(), rec);
}

// ─── Connector ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn registry_shares_memory_and_file_stores() {
  let dir = tempfile::tempdir().unwrap();
  let registry = ConnectionRegistry::new(SqliteConnector);

  let memory = StoreLocation::memory();
  let a = registry.handle(&memory).await.unwrap();
  materialize(&a, "items", items(&[("a", 1)]), ConflictPolicy::Replace)
    .await
    .unwrap();
  let b = registry.handle(&memory).await.unwrap();
  assert!(b.table_exists("items".into()).await.unwrap());

  let location = resolve_store(Some("Demo"), &dir.path().join("nested")).unwrap();
  let file = registry.handle(&location).await.unwrap();
  assert_eq!(file.name(), "demo.db");
  materialize(&file, "items", items(&[("a", 1), ("b", 2)]), ConflictPolicy::Replace)
    .await
    .unwrap();
  assert!(dir.path().join("nested").join("demo.db").exists());
  assert_eq!(registry.len(), 2);
}
