//! Handler for `POST /upload/{database}/{table}`: create a data route from
//! an uploaded file body.

use std::str::FromStr as _;

use apiness_core::{
  Error as CoreError,
  store::Connector,
  table::{ConflictPolicy, DataFormat},
};
use apiness_tabular::Source;
use axum::{
  Json,
  extract::{Path, Query, State},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::{AppState, create_database, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct UploadParams {
  pub data_format: Option<String>,
  pub if_exists:   Option<String>,
}

pub async fn handler<C: Connector>(
  State(state): State<AppState<C>>,
  Path((database, table)): Path<(String, String)>,
  Query(params): Query<UploadParams>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let format = match params.data_format.as_deref() {
    None | Some("") => DataFormat::default(),
    Some(f) => DataFormat::from_str(f).map_err(|_| CoreError::UnsupportedFormat(f.to_owned()))?,
  };
  let policy = match params.if_exists.as_deref() {
    None | Some("") => ConflictPolicy::default(),
    Some(p) => ConflictPolicy::from_str(p).map_err(|_| {
      ApiError::BadRequest(format!(
        "if_exists parameter must be one of ['fail', 'replace', 'append'], got {p:?}"
      ))
    })?,
  };

  let source = Source::Bytes { data: body, format };
  let created = create_database(&state, Some(&database), &table, source, policy).await?;
  Ok(Json(created.summary()))
}
