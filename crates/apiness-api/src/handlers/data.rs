//! The handler behind every synthesized data route.

use std::sync::Arc;

use apiness_core::{
  filter,
  ident::StoreLocation,
  query,
  store::{ConnectionRegistry, Connector},
};
use async_trait::async_trait;
use axum::{
  Json,
  response::{Html, IntoResponse, Response},
};

use crate::{
  error::ApiError,
  html,
  routing::{RouteHandler, RouteRequest},
};

/// Serves `GET /{database}/{table}` for one store. The table comes from the
/// request path, so one route serves every table in the store.
pub struct DataRoute<C: Connector> {
  connections: Arc<ConnectionRegistry<C>>,
  location:    StoreLocation,
}

impl<C: Connector> DataRoute<C> {
  pub fn new(connections: Arc<ConnectionRegistry<C>>, location: StoreLocation) -> Self {
    Self { connections, location }
  }
}

#[async_trait]
impl<C: Connector> RouteHandler for DataRoute<C> {
  async fn handle(&self, request: RouteRequest) -> Result<Response, ApiError> {
    let table = request
      .path_param("table")
      .ok_or_else(|| ApiError::NotFound(format!("no table in path {}", request.path)))?;

    // Rejected filters never reach the store.
    let compiled = filter::compile(table, &request.query)?;
    let store = self.connections.handle(&self.location).await?;
    let output = query::run(&store, &self.location.name, &compiled).await?;

    if compiled.to_html {
      Ok(Html(html::render(&output.columns, &output.envelope.data)).into_response())
    } else {
      Ok(Json(output.envelope).into_response())
    }
  }
}
