//! apiness server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `APINESS_*`
//! environment variables, prepares the route configuration store, optionally
//! loads a data file, and serves the HTTP API.
//!
//! ```text
//! apiness data/items.csv --database demo --bootstrap replay
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use apiness_api::{AppState, BootstrapMode, ServerConfig, bootstrap, create_database, router};
use apiness_core::{
  ident::table_name_from_path,
  table::{ConflictPolicy, DataFormat},
};
use apiness_store_sqlite::SqliteConnector;
use apiness_tabular::Source;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Serve CSV and XLSX files as queryable HTTP endpoints")]
struct Cli {
  /// CSV or XLSX file to load before serving.
  data_path: Option<PathBuf>,

  /// Format of DATA_PATH: CSV or XLSX.
  #[arg(default_value = "CSV")]
  data_format: DataFormat,

  /// Store to load DATA_PATH into; the in-memory store when omitted.
  #[arg(long)]
  database: Option<String>,

  /// What to do when the table already exists: replace, append or fail.
  #[arg(long, default_value = "replace")]
  if_exists: ConflictPolicy,

  /// Load DATA_PATH and exit without serving.
  #[arg(long)]
  no_server: bool,

  #[arg(long)]
  host: Option<String>,

  #[arg(long)]
  port: Option<u16>,

  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Drop (fresh) or re-register (replay) stored routes at startup.
  #[arg(long, value_enum)]
  bootstrap: Option<BootstrapMode>,

  /// Directory holding store files.
  #[arg(long)]
  data_dir: Option<PathBuf>,

  /// Name of the store holding the route configuration.
  #[arg(long)]
  routes_config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // File, then environment, then command line.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("APINESS"))
    .set_override_option("host", cli.host.clone())?
    .set_override_option("port", cli.port.map(i64::from))?
    .set_override_option(
      "data_dir",
      cli.data_dir.as_ref().map(|p| p.to_string_lossy().into_owned()),
    )?
    .set_override_option("routes_config", cli.routes_config.clone())?
    .set_override_option("bootstrap", cli.bootstrap.map(BootstrapMode::as_str))?
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let state = AppState::new(SqliteConnector, server_cfg.clone());

  let replayed = bootstrap(&state)
    .await
    .context("failed to bootstrap route configuration")?;
  tracing::info!(mode = server_cfg.bootstrap.as_str(), replayed, "bootstrapped routes");

  if let Some(path) = cli.data_path {
    let table_name = table_name_from_path(&path);
    let source = Source::Path { path: path.clone(), format: cli.data_format };
    let created = create_database(&state, cli.database.as_deref(), &table_name, source, cli.if_exists)
      .await
      .with_context(|| format!("failed to load {}", path.display()))?;
    tracing::info!(endpoint = %created.endpoint, params = created.params().len(), "loaded data file");
  }

  if cli.no_server {
    return Ok(());
  }

  let app = router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
