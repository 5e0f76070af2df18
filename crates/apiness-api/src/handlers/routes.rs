//! Handler for `GET /routes`: every registered data route with its
//! accepted parameters.

use apiness_core::{schema::ParameterSpec, store::Connector};
use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RouteSummary {
  pub path:   String,
  pub name:   String,
  pub tags:   Vec<String>,
  pub params: Vec<ParameterSpec>,
}

pub async fn handler<C: Connector>(State(state): State<AppState<C>>) -> Json<Vec<RouteSummary>> {
  let routes = state
    .routes
    .list()
    .into_iter()
    .map(|route| {
      let path = route.template.as_str().to_owned();
      let params = state
        .routes
        .parameter_schema(&path)
        .map(|schema| schema.iter().cloned().collect())
        .unwrap_or_default();
      RouteSummary { path, name: route.name.clone(), tags: route.tags.clone(), params }
    })
    .collect();
  Json(routes)
}
