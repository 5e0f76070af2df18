//! HTTP surface for Apiness.
//!
//! Exposes an axum [`Router`] that serves one synthesized read endpoint per
//! loaded store, plus the fixed system routes (`/download`, `/createdb`,
//! `/upload`, `/routes`). Data routes live in a [`RouteRegistry`] and are
//! reached through the router's fallback, so they can be added at runtime and
//! their accepted parameters replaced after registration.

pub mod error;
pub mod handlers;
pub mod html;
pub mod routing;
pub mod synth;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use apiness_core::{
  Error as CoreError,
  ident::{MEMORY_STORE, StorePath, normalize_table_name, resolve_store, validate_identifier},
  materialize::materialize,
  routes_config::{ROUTES_CONFIG_TABLE, RoutesConfigStore},
  schema::RouteRecord,
  store::{ConnectionRegistry, Connector},
  table::ConflictPolicy,
};
use apiness_tabular::Source;
use axum::{
  Router,
  extract::{Query, State},
  http::{Method, Uri},
  response::Response,
  routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::info;

use handlers::{createdb, download, routes, upload};
use routing::{RouteRegistry, RouteRequest};

/// File store names that would be shadowed by system routes or by the
/// in-memory store's `/memory/{table}` prefix.
pub const RESERVED_NAMES: [&str; 5] = ["download", "createdb", "upload", "routes", MEMORY_STORE];

// ─── Configuration ───────────────────────────────────────────────────────────

/// What happens to the route configuration store at startup.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapMode {
  /// Drop every stored route record.
  #[default]
  Fresh,
  /// Re-register every stored route.
  Replay,
}

impl BootstrapMode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Fresh => "fresh",
      Self::Replay => "replay",
    }
  }
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `APINESS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  /// Directory holding `<store>.db` files.
  pub data_dir:      PathBuf,
  /// Name of the store holding the route configuration.
  pub routes_config: String,
  pub bootstrap:     BootstrapMode,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "127.0.0.1".to_owned(),
      port:          8000,
      data_dir:      PathBuf::from("."),
      routes_config: ROUTES_CONFIG_TABLE.to_owned(),
      bootstrap:     BootstrapMode::default(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. Constructed once per
/// process and passed to every entry point.
pub struct AppState<C: Connector> {
  pub connections: Arc<ConnectionRegistry<C>>,
  pub routes:      Arc<RouteRegistry>,
  pub config:      Arc<ServerConfig>,
}

impl<C: Connector> Clone for AppState<C> {
  fn clone(&self) -> Self {
    Self {
      connections: Arc::clone(&self.connections),
      routes:      Arc::clone(&self.routes),
      config:      Arc::clone(&self.config),
    }
  }
}

impl<C: Connector> AppState<C> {
  pub fn new(connector: C, config: ServerConfig) -> Self {
    Self {
      connections: Arc::new(ConnectionRegistry::new(connector)),
      routes:      Arc::new(RouteRegistry::new()),
      config:      Arc::new(config),
    }
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// A data route created by [`create_database`].
#[derive(Debug, Clone)]
pub struct CreatedRoute {
  /// `/{database}/{table}`
  pub endpoint: String,
  pub record:   RouteRecord,
}

impl CreatedRoute {
  pub fn params(&self) -> Vec<String> {
    self.record.query_params.iter().map(|(_, name, _)| name.clone()).collect()
  }

  /// The success body shared by `createdb` and `upload`.
  pub fn summary(&self) -> Value {
    json!({ "status:": "success", "endpoint": self.endpoint, "params": self.params() })
  }
}

/// Load `source` into `table_name` of `database`, register its data route
/// and record the route in the route configuration store.
pub async fn create_database<C: Connector>(
  state: &AppState<C>,
  database: Option<&str>,
  table_name: &str,
  source: Source,
  policy: ConflictPolicy,
) -> Result<CreatedRoute, ApiError> {
  let location = resolve_store(database, &state.config.data_dir)?;
  if matches!(location.path, StorePath::File(_))
    && RESERVED_NAMES.contains(&location.name.as_str())
  {
    return Err(reserved(&location.name));
  }
  let table_name = normalize_table_name(table_name);
  validate_identifier(&table_name)?;
  if table_name == ROUTES_CONFIG_TABLE {
    return Err(reserved(&table_name));
  }

  let table = source.load().await?;
  let store = state.connections.handle(&location).await?;
  let relation = materialize(&store, &table_name, table, policy).await?;
  let record = synth::synthesize(state, &location, &relation)?;
  routes_config_store(state).await?.record(&record).await?;

  let endpoint = format!("/{}/{}", location.name, relation.table);
  info!(%endpoint, rows = relation.rows_written, "created data route");
  Ok(CreatedRoute { endpoint, record })
}

fn reserved(name: &str) -> ApiError {
  ApiError::Core(CoreError::InvalidIdentifier {
    name:   name.to_owned(),
    reason: "name is reserved".to_owned(),
  })
}

/// The route configuration store named by the server configuration.
pub async fn routes_config_store<C: Connector>(
  state: &AppState<C>,
) -> Result<RoutesConfigStore<C::Store>, ApiError> {
  let location = resolve_store(Some(&state.config.routes_config), &state.config.data_dir)?;
  let store = state.connections.handle(&location).await?;
  Ok(RoutesConfigStore::new(store))
}

/// Prepare the route configuration store according to the configured
/// [`BootstrapMode`]. Returns the number of routes replayed.
pub async fn bootstrap<C: Connector>(state: &AppState<C>) -> Result<usize, ApiError> {
  let config = routes_config_store(state).await?;
  match state.config.bootstrap {
    BootstrapMode::Fresh => {
      config.reset().await?;
      Ok(0)
    }
    BootstrapMode::Replay => {
      let records = config.all_records().await?;
      synth::replay(state, &records)
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for `state`.
pub fn router<C: Connector>(state: AppState<C>) -> Router {
  Router::new()
    .route("/download/{db}", get(download::handler::<C>))
    .route("/createdb", get(createdb::handler::<C>))
    .route("/upload/{database}/{table}", post(upload::handler::<C>))
    .route("/routes", get(routes::handler::<C>))
    .fallback(dispatch::<C>)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Serve a data route from the registry.
async fn dispatch<C: Connector>(
  State(state): State<AppState<C>>,
  method: Method,
  uri: Uri,
  Query(raw): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
  let path = uri.path();
  let (route, path_params) = state
    .routes
    .resolve(path)
    .ok_or_else(|| ApiError::NotFound(format!("no route for {path}")))?;
  if method != Method::GET && method != Method::HEAD {
    return Err(ApiError::MethodNotAllowed);
  }

  let query = route.schema.bind(&raw)?;
  let request = RouteRequest { path: path.to_owned(), path_params, query };
  route.handler.handle(request).await
}
