//! Scalar kinds and the type inferencer.
//!
//! Two steps live here: [`infer`] classifies a column from the storage type
//! its loader assigned, and [`coerce`] interprets a textual filter operand as
//! a number.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, table::Cell};

// ─── ScalarKind ──────────────────────────────────────────────────────────────

/// The semantic type of a column or query parameter.
///
/// The string forms (`int`, `float`, `str`) are what the route configuration
/// store persists; they must stay stable for replay to work.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
pub enum ScalarKind {
  #[serde(rename = "int")]
  #[strum(serialize = "int")]
  Integer,
  #[serde(rename = "float")]
  #[strum(serialize = "float")]
  Real,
  #[serde(rename = "str")]
  #[strum(serialize = "str")]
  Text,
}

impl ScalarKind {
  pub fn is_numeric(self) -> bool { matches!(self, Self::Integer | Self::Real) }
}

// ─── StorageType ─────────────────────────────────────────────────────────────

/// The storage-level type tag a loader assigns to a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
  Bool,
  Int64,
  Float64,
  /// Generic text/object storage; also the fallback for anything unknown.
  Object,
}

impl StorageType {
  /// A zero-filled probe value of this storage type.
  pub fn zero(self) -> Cell {
    match self {
      Self::Bool => Cell::Bool(false),
      Self::Int64 => Cell::Integer(0),
      Self::Float64 => Cell::Real(0.0),
      Self::Object => Cell::Text(String::new()),
    }
  }

  /// Classify a column from its cells.
  ///
  /// Integers with missing values widen to `Float64`, booleans with missing
  /// values fall back to `Object`, and an all-missing column is `Float64`.
  pub fn of_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
    let (mut nulls, mut bools, mut ints, mut reals, mut other) =
      (false, false, false, false, false);
    for cell in cells {
      match cell {
        Cell::Null => nulls = true,
        Cell::Bool(_) => bools = true,
        Cell::Integer(_) => ints = true,
        Cell::Real(_) => reals = true,
        Cell::Text(_) => other = true,
      }
    }

    if other || (bools && (ints || reals || nulls)) {
      Self::Object
    } else if bools {
      Self::Bool
    } else if ints && !reals && !nulls {
      Self::Int64
    } else {
      Self::Float64
    }
  }
}

/// Map a column's storage type to its [`ScalarKind`]. Total and
/// deterministic: object storage is text, numeric storage is probed with a
/// zero value and classified by whether that value is a whole number.
pub fn infer(storage: StorageType) -> ScalarKind {
  if storage == StorageType::Object {
    return ScalarKind::Text;
  }
  match storage.zero() {
    Cell::Bool(_) | Cell::Integer(_) => ScalarKind::Integer,
    Cell::Real(_) => ScalarKind::Real,
    Cell::Null | Cell::Text(_) => ScalarKind::Text,
  }
}

// ─── ParamValue ──────────────────────────────────────────────────────────────

/// A query-parameter value after conversion to its schema kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
  Integer(i64),
  Real(f64),
  Text(String),
}

impl ParamValue {
  /// Convert a raw query-string value to `kind`.
  pub fn parse(raw: &str, kind: ScalarKind) -> Result<Self> {
    match kind {
      ScalarKind::Text => Ok(Self::Text(raw.to_owned())),
      ScalarKind::Integer => raw
        .trim()
        .parse()
        .map(Self::Integer)
        .map_err(|e| invalid_operand(raw, e)),
      ScalarKind::Real => raw
        .trim()
        .parse()
        .map(Self::Real)
        .map_err(|e| invalid_operand(raw, e)),
    }
  }
}

impl fmt::Display for ParamValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Integer(i) => write!(f, "{i}"),
      Self::Real(r) => write!(f, "{r}"),
      Self::Text(s) => f.write_str(s),
    }
  }
}

/// Interpret a textual operand as a number: values containing `.` are
/// parsed as reals, everything else as integers.
pub fn coerce(value: &str) -> Result<ParamValue> {
  if value.contains('.') {
    value
      .parse()
      .map(ParamValue::Real)
      .map_err(|e| invalid_operand(value, e))
  } else {
    value
      .parse()
      .map(ParamValue::Integer)
      .map_err(|e| invalid_operand(value, e))
  }
}

fn invalid_operand(value: &str, e: impl fmt::Display) -> Error {
  Error::InvalidOperand { value: value.to_owned(), reason: e.to_string() }
}
