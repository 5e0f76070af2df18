//! In-memory tables, columns and relations.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  ident::normalize_column_name,
  kind::{ScalarKind, StorageType, infer},
};

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single value of a tabular data source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
  Null,
  Bool(bool),
  Integer(i64),
  Real(f64),
  Text(String),
}

impl fmt::Display for Cell {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Null => Ok(()),
      Self::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
      Self::Integer(i) => write!(f, "{i}"),
      Self::Real(r) => write!(f, "{r}"),
      Self::Text(s) => f.write_str(s),
    }
  }
}

impl From<&str> for Cell {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Cell {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for Cell {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<f64> for Cell {
  fn from(r: f64) -> Self { Self::Real(r) }
}

impl From<bool> for Cell {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

// ─── Column / Relation ───────────────────────────────────────────────────────

/// A named column with its inferred kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
  pub name: String,
  pub kind: ScalarKind,
}

/// A table that has been written to a store.
#[derive(Debug, Clone)]
pub struct Relation {
  pub table:        String,
  /// Data columns in source order; the generated `id` column is not listed.
  pub columns:      Vec<Column>,
  pub rows_written: usize,
}

// ─── Policies and formats ────────────────────────────────────────────────────

/// How an existing table is treated when data is loaded again.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConflictPolicy {
  /// Drop and recreate the table before writing.
  #[default]
  Replace,
  /// Write into the existing table, creating it if missing.
  Append,
  /// Error if the table already exists.
  Fail,
}

/// Supported tabular file formats.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum DataFormat {
  #[default]
  Csv,
  Xlsx,
}

// ─── Table ───────────────────────────────────────────────────────────────────

/// A rectangular table with named columns and one storage type per column.
///
/// Cells are harmonised with their column's storage type on construction:
/// integers in a `Float64` column become reals, and everything in an
/// `Object` column becomes text.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
  columns: Vec<String>,
  storage: Vec<StorageType>,
  rows:    Vec<Vec<Cell>>,
}

impl Table {
  /// Build a table, padding short rows with nulls. Cells past the last
  /// column are dropped, so loaders must reject wide rows before this.
  pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
    let width = columns.len();
    let mut rows: Vec<Vec<Cell>> = rows
      .into_iter()
      .map(|mut row| {
        row.resize(width, Cell::Null);
        row
      })
      .collect();

    let storage: Vec<StorageType> = (0..width)
      .map(|i| StorageType::of_cells(rows.iter().map(|r| &r[i])))
      .collect();

    for row in &mut rows {
      for (cell, ty) in row.iter_mut().zip(&storage) {
        harmonise(cell, *ty);
      }
    }

    Self { columns, storage, rows }
  }

  pub fn column_names(&self) -> &[String] { &self.columns }

  pub fn storage_types(&self) -> &[StorageType] { &self.storage }

  pub fn rows(&self) -> &[Vec<Cell>] { &self.rows }

  pub fn into_rows(self) -> Vec<Vec<Cell>> { self.rows }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  /// Normalise every column name in place, preserving order. Duplicates are
  /// not resolved here; the storage layer rejects them.
  pub fn normalize_column_names(&mut self) {
    for name in &mut self.columns {
      *name = normalize_column_name(name);
    }
  }

  /// The table's columns with their inferred [`ScalarKind`]s.
  pub fn columns(&self) -> Vec<Column> {
    self
      .columns
      .iter()
      .zip(&self.storage)
      .map(|(name, ty)| Column { name: name.clone(), kind: infer(*ty) })
      .collect()
  }
}

fn harmonise(cell: &mut Cell, storage: StorageType) {
  let replacement = match (storage, &*cell) {
    (StorageType::Float64, Cell::Integer(i)) => Some(Cell::Real(*i as f64)),
    (StorageType::Object, Cell::Null | Cell::Text(_)) => None,
    (StorageType::Object, other) => Some(Cell::Text(other.to_string())),
    _ => None,
  };
  if let Some(r) = replacement {
    *cell = r;
  }
}
