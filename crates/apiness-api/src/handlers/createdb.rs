//! Handler for `GET /createdb`.
//!
//! Loads a file readable by the server process. Unlike every other endpoint,
//! failures here are reported as `418` with a plain-text message.

use std::{path::PathBuf, str::FromStr as _};

use apiness_core::{
  ident::table_name_from_path,
  store::Connector,
  table::{ConflictPolicy, DataFormat},
};
use apiness_tabular::Source;
use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use crate::{AppState, create_database};

#[derive(Debug, Deserialize, Default)]
pub struct CreateDbParams {
  /// Target store; the in-memory store when absent.
  pub database:    Option<String>,
  pub data_path:   Option<String>,
  /// `CSV` (default) or `XLSX`.
  pub data_format: Option<String>,
  /// `replace` (default), `append` or `fail`.
  pub if_exists:   Option<String>,
}

/// `GET /createdb?database=&data_path=&data_format=&if_exists=`
pub async fn handler<C: Connector>(
  State(state): State<AppState<C>>,
  Query(params): Query<CreateDbParams>,
) -> Response {
  let Some(data_path) = params.data_path.filter(|p| !p.is_empty()) else {
    return teapot("You must provide a data_path value".to_owned());
  };
  let Ok(format) = DataFormat::from_str(non_empty(&params.data_format).unwrap_or("CSV")) else {
    return teapot("data_format parameter must be one of ['CSV', 'XLSX']".to_owned());
  };
  let Ok(policy) = ConflictPolicy::from_str(non_empty(&params.if_exists).unwrap_or("replace"))
  else {
    return teapot("if_exists parameter must be one of ['fail', 'replace', 'append']".to_owned());
  };

  let path = PathBuf::from(data_path);
  let table_name = table_name_from_path(&path);
  let source = Source::Path { path, format };
  match create_database(&state, non_empty(&params.database), &table_name, source, policy).await {
    Ok(created) => (StatusCode::OK, Json(created.summary())).into_response(),
    Err(e) => {
      warn!(error = %e, "createdb failed");
      teapot(format!("Failed: {e}"))
    }
  }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|v| !v.is_empty())
}

fn teapot(message: String) -> Response { (StatusCode::IM_A_TEAPOT, message).into_response() }
