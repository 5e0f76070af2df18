//! The route synthesizer: turns materialized relations and persisted route
//! records into registered data routes.

use std::sync::Arc;

use apiness_core::{
  ident::{MEMORY_STORE, StoreLocation, resolve_store},
  schema::{ParameterSchema, RouteRecord},
  store::Connector,
  table::Relation,
};
use tracing::info;

use crate::{AppState, error::ApiError, handlers::data::DataRoute};

/// The path template serving every table of `database`.
pub fn route_path(database: &str) -> String { format!("/{database}/{{table}}") }

/// Register the data route for a freshly materialized relation and return
/// the record to persist.
pub fn synthesize<C: Connector>(
  state: &AppState<C>,
  location: &StoreLocation,
  relation: &Relation,
) -> Result<RouteRecord, ApiError> {
  let schema = ParameterSchema::for_columns(&relation.columns);
  let record = RouteRecord::new(
    route_path(&location.name),
    format!("{}_{}", location.name, relation.table).to_lowercase(),
    vec![location.name.to_lowercase()],
    &schema,
  );
  install(state, location.clone(), &record, schema)?;
  Ok(record)
}

/// Re-register routes from persisted records without touching their data.
pub fn replay<C: Connector>(
  state: &AppState<C>,
  records: &[RouteRecord],
) -> Result<usize, ApiError> {
  for record in records {
    let schema = record.schema()?;
    let location = location_for(record, state)?;
    install(state, location, record, schema)?;
  }
  info!(routes = records.len(), "replayed route configuration");
  Ok(records.len())
}

fn install<C: Connector>(
  state: &AppState<C>,
  location: StoreLocation,
  record: &RouteRecord,
  schema: ParameterSchema,
) -> Result<(), ApiError> {
  let handler = Arc::new(DataRoute::new(Arc::clone(&state.connections), location));
  state
    .routes
    .register(&record.route_path, handler, &record.route_name, record.route_tags.clone());
  state.routes.set_parameter_schema(&record.route_path, schema)
}

/// The store a record's route reads from: the first path segment names it.
fn location_for<C: Connector>(
  record: &RouteRecord,
  state: &AppState<C>,
) -> Result<StoreLocation, ApiError> {
  let name = record
    .route_path
    .split('/')
    .find(|s| !s.is_empty())
    .unwrap_or_default();
  if name == MEMORY_STORE {
    return Ok(StoreLocation::memory());
  }
  Ok(resolve_store(Some(name), &state.config.data_dir)?)
}
