//! Parameter schemas and their durable route records.

use std::str::FromStr as _;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  filter::{FIXED_PARAMS, FilterOp},
  kind::{ParamValue, ScalarKind},
  table::Column,
};

// ─── ParameterSchema ─────────────────────────────────────────────────────────

/// One named, typed query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
  pub name: String,
  pub kind: ScalarKind,
}

/// The ordered set of query parameters a route accepts. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema {
  params: Vec<ParameterSpec>,
}

impl ParameterSchema {
  pub fn new() -> Self { Self::default() }

  /// Build the schema for a relation's columns.
  ///
  /// Each column contributes its equality parameter plus the suffixed
  /// variants for its kind; `where`, `cols`, `cmd` and `tohtml` follow.
  pub fn for_columns(columns: &[Column]) -> Self {
    let mut schema = Self::new();
    for column in columns {
      schema.push(&column.name, column.kind);
      for op in FilterOp::variants_for(column.kind) {
        schema.push(&format!("{}{}", column.name, op.suffix()), column.kind);
      }
    }
    for name in FIXED_PARAMS {
      schema.push(name, ScalarKind::Text);
    }
    schema
  }

  /// Append a parameter. Returns `false`, leaving the schema unchanged, if
  /// the name is already taken.
  pub fn push(&mut self, name: &str, kind: ScalarKind) -> bool {
    if self.get(name).is_some() {
      return false;
    }
    self.params.push(ParameterSpec { name: name.to_owned(), kind });
    true
  }

  pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
    self.params.iter().find(|p| p.name == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> { self.params.iter() }

  pub fn names(&self) -> Vec<String> { self.params.iter().map(|p| p.name.clone()).collect() }

  pub fn len(&self) -> usize { self.params.len() }

  pub fn is_empty(&self) -> bool { self.params.is_empty() }

  /// Bind raw query-string pairs against the schema.
  ///
  /// Names are matched lower-cased; pairs naming no parameter are dropped.
  /// Each kept value is converted to its parameter's kind, and request order
  /// is preserved.
  pub fn bind(&self, raw: &[(String, String)]) -> Result<Vec<(String, ParamValue)>> {
    raw
      .iter()
      .filter_map(|(name, value)| {
        let name = name.to_lowercase();
        self.get(&name).map(|spec| (spec, value))
      })
      .map(|(spec, value)| Ok((spec.name.clone(), ParamValue::parse(value, spec.kind)?)))
      .collect()
  }
}

// ─── RouteRecord ─────────────────────────────────────────────────────────────

/// The durable projection of a synthesized data route.
///
/// `query_params` holds `(route_path, param_name, kind_name)` triples so a
/// route's schema can be rebuilt without re-reading its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
  pub route_path:   String,
  pub route_name:   String,
  pub route_tags:   Vec<String>,
  pub query_params: Vec<(String, String, String)>,
}

impl RouteRecord {
  pub fn new(
    route_path: impl Into<String>,
    route_name: impl Into<String>,
    route_tags: Vec<String>,
    schema: &ParameterSchema,
  ) -> Self {
    let route_path = route_path.into();
    let query_params = schema
      .iter()
      .map(|p| (route_path.clone(), p.name.clone(), p.kind.to_string()))
      .collect();
    Self { route_path, route_name: route_name.into(), route_tags, query_params }
  }

  /// Rebuild the parameter schema from the persisted triples.
  pub fn schema(&self) -> Result<ParameterSchema> {
    let mut schema = ParameterSchema::new();
    for (_, name, kind) in &self.query_params {
      let kind = ScalarKind::from_str(kind).map_err(|_| {
        Error::CorruptRecord(format!(
          "{}: unknown kind {kind:?} for parameter {name:?}",
          self.route_path
        ))
      })?;
      schema.push(name, kind);
    }
    Ok(schema)
  }

  /// The `route_tags` column value: a JSON array.
  pub fn encode_tags(&self) -> Result<String> { Ok(serde_json::to_string(&self.route_tags)?) }

  /// The `query_params` column value: a JSON array of triples.
  pub fn encode_params(&self) -> Result<String> {
    Ok(serde_json::to_string(&self.query_params)?)
  }

  /// Reassemble a record from its four stored columns.
  pub fn decode(
    route_path: String,
    route_name: String,
    route_tags: &str,
    query_params: &str,
  ) -> Result<Self> {
    Ok(Self {
      route_path,
      route_name,
      route_tags: serde_json::from_str(route_tags)?,
      query_params: serde_json::from_str(query_params)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn columns() -> Vec<Column> {
    vec![
      Column { name: "name".into(), kind: ScalarKind::Text },
      Column { name: "score".into(), kind: ScalarKind::Integer },
      Column { name: "ratio".into(), kind: ScalarKind::Real },
    ]
  }

  #[test]
  fn schema_expands_columns_by_kind() {
    let schema = ParameterSchema::for_columns(&columns());
    assert_eq!(
      schema.names(),
      [
        "name", "name_in", "name_like", "name_begin", "name_end",
        "score", "score_gt", "score_gte", "score_lt", "score_lte",
        "ratio", "ratio_gt", "ratio_gte", "ratio_lt", "ratio_lte",
        "where", "cols", "cmd", "tohtml",
      ]
    );
    assert_eq!(schema.get("ratio_lt").unwrap().kind, ScalarKind::Real);
    assert_eq!(schema.get("name_in").unwrap().kind, ScalarKind::Text);
    assert_eq!(schema.get("tohtml").unwrap().kind, ScalarKind::Text);
  }

  #[test]
  fn fixed_parameters_appear_once() {
    let cols = vec![Column { name: "cmd".into(), kind: ScalarKind::Text }];
    let schema = ParameterSchema::for_columns(&cols);
    for fixed in FIXED_PARAMS {
      assert_eq!(schema.iter().filter(|p| p.name == fixed).count(), 1);
    }
    assert_eq!(ParameterSchema::for_columns(&[]).names(), FIXED_PARAMS);
  }

  #[test]
  fn push_rejects_duplicates() {
    let mut schema = ParameterSchema::new();
    assert!(schema.push("a", ScalarKind::Text));
    assert!(!schema.push("a", ScalarKind::Integer));
    assert_eq!(schema.len(), 1);
    assert_eq!(schema.get("a").unwrap().kind, ScalarKind::Text);
  }

  #[test]
  fn bind_converts_and_drops_unknown() {
    let schema = ParameterSchema::for_columns(&columns());
    let raw = vec![
      ("SCORE_GT".to_string(), "1".to_string()),
      ("unknown".to_string(), "x".to_string()),
      ("name".to_string(), "b".to_string()),
    ];
    let bound = schema.bind(&raw).unwrap();
    assert_eq!(
      bound,
      [
        ("score_gt".to_string(), ParamValue::Integer(1)),
        ("name".to_string(), ParamValue::Text("b".into())),
      ]
    );

    let bad = vec![("score".to_string(), "high".to_string())];
    assert!(matches!(schema.bind(&bad).unwrap_err(), Error::InvalidOperand { .. }));
  }

  #[test]
  fn record_round_trips_schema() {
    let schema = ParameterSchema::for_columns(&columns());
    let record = RouteRecord::new("/demo/{table}", "demo_items", vec!["demo".into()], &schema);
    assert_eq!(record.query_params[0], ("/demo/{table}".into(), "name".into(), "str".into()));

    let decoded = RouteRecord::decode(
      record.route_path.clone(),
      record.route_name.clone(),
      &record.encode_tags().unwrap(),
      &record.encode_params().unwrap(),
    )
    .unwrap();
    assert_eq!(decoded, record);
    assert_eq!(decoded.schema().unwrap(), schema);
  }

  #[test]
  fn corrupt_kind_is_reported() {
    let record = RouteRecord {
      route_path:   "/demo/{table}".into(),
      route_name:   "demo_items".into(),
      route_tags:   vec![],
      query_params: vec![("/demo/{table}".into(), "a".into(), "decimal".into())],
    };
    assert!(matches!(record.schema().unwrap_err(), Error::CorruptRecord(_)));
  }
}
