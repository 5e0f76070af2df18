//! The dynamic route registry.
//!
//! Data routes are only known once their tables have been loaded, and their
//! accepted query parameters only once column kinds are inferred. Routes are
//! therefore kept here rather than in the axum router: the router's fallback
//! resolves each request path against this registry, binds the query string
//! against the route's [`ParameterSchema`] and hands the request to the
//! route's [`RouteHandler`].

use std::sync::Arc;

use apiness_core::{kind::ParamValue, schema::ParameterSchema};
use async_trait::async_trait;
use axum::response::Response;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::error::ApiError;

// ─── Path templates ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Literal(String),
  Param(String),
}

/// A path such as `/demo/{table}`: literal segments plus named captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
  raw:      String,
  segments: Vec<Segment>,
}

impl PathTemplate {
  pub fn parse(raw: &str) -> Self {
    let segments = split(raw)
      .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(name) => Segment::Param(name.to_owned()),
        None => Segment::Literal(s.to_owned()),
      })
      .collect();
    Self { raw: raw.to_owned(), segments }
  }

  pub fn as_str(&self) -> &str { &self.raw }

  /// Match `path`, returning the captured parameters in template order.
  pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
    let parts: Vec<&str> = split(path).collect();
    if parts.len() != self.segments.len() {
      return None;
    }
    let mut captures = Vec::new();
    for (segment, part) in self.segments.iter().zip(parts) {
      match segment {
        Segment::Literal(l) if l == part => {}
        Segment::Literal(_) => return None,
        Segment::Param(name) => captures.push((name.clone(), part.to_owned())),
      }
    }
    Some(captures)
  }

  fn literal_count(&self) -> usize {
    self.segments.iter().filter(|s| matches!(s, Segment::Literal(_))).count()
  }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
  path.split('/').filter(|s| !s.is_empty())
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// A request after path matching and parameter binding.
#[derive(Debug, Clone)]
pub struct RouteRequest {
  pub path:        String,
  pub path_params: Vec<(String, String)>,
  /// Query parameters bound against the route's schema, in request order.
  pub query:       Vec<(String, ParamValue)>,
}

impl RouteRequest {
  pub fn path_param(&self, name: &str) -> Option<&str> {
    self
      .path_params
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }
}

#[async_trait]
pub trait RouteHandler: Send + Sync {
  async fn handle(&self, request: RouteRequest) -> Result<Response, ApiError>;
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// One registered route. Replaced wholesale when its schema changes.
#[derive(Clone)]
pub struct RegisteredRoute {
  pub template: PathTemplate,
  pub name:     String,
  pub tags:     Vec<String>,
  pub schema:   ParameterSchema,
  pub handler:  Arc<dyn RouteHandler>,
}

/// Routes keyed by path template.
#[derive(Default)]
pub struct RouteRegistry {
  routes: DashMap<String, Arc<RegisteredRoute>>,
}

impl RouteRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register `handler` at `template` with an empty parameter schema.
  ///
  /// Registering a template twice replaces the earlier route.
  pub fn register(
    &self,
    template: &str,
    handler: Arc<dyn RouteHandler>,
    name: &str,
    tags: Vec<String>,
  ) {
    let route = RegisteredRoute {
      template: PathTemplate::parse(template),
      name: name.to_owned(),
      tags,
      schema: ParameterSchema::new(),
      handler,
    };
    if self.routes.insert(template.to_owned(), Arc::new(route)).is_some() {
      warn!(path = template, name, "replaced existing route");
    } else {
      info!(path = template, name, "registered route");
    }
  }

  pub fn parameter_schema(&self, template: &str) -> Option<ParameterSchema> {
    self.routes.get(template).map(|r| r.schema.clone())
  }

  /// Replace the accepted parameters of an already registered route.
  pub fn set_parameter_schema(
    &self,
    template: &str,
    schema: ParameterSchema,
  ) -> Result<(), ApiError> {
    let mut entry = self
      .routes
      .get_mut(template)
      .ok_or_else(|| ApiError::NotFound(format!("no route registered at {template}")))?;
    let mut route = RegisteredRoute::clone(&entry);
    route.schema = schema;
    *entry = Arc::new(route);
    Ok(())
  }

  /// Remove the route at `template`. Returns `true` if one existed.
  pub fn remove(&self, template: &str) -> bool {
    let removed = self.routes.remove(template).is_some();
    if removed {
      info!(path = template, "removed route");
    }
    removed
  }

  /// Find the route serving `path`. When several templates match, the one
  /// with the most literal segments wins.
  pub fn resolve(&self, path: &str) -> Option<(Arc<RegisteredRoute>, Vec<(String, String)>)> {
    self
      .routes
      .iter()
      .filter_map(|entry| {
        let route = entry.value();
        route.template.matches(path).map(|c| (Arc::clone(route), c))
      })
      .max_by_key(|(route, _)| route.template.literal_count())
  }

  /// Every route, ordered by path template.
  pub fn list(&self) -> Vec<Arc<RegisteredRoute>> {
    let mut routes: Vec<_> = self.routes.iter().map(|e| Arc::clone(e.value())).collect();
    routes.sort_by(|a, b| a.template.as_str().cmp(b.template.as_str()));
    routes
  }

  pub fn len(&self) -> usize { self.routes.len() }

  pub fn is_empty(&self) -> bool { self.routes.is_empty() }
}
