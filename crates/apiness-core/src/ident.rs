//! Identifier validation, name normalisation and store resolution.

use std::{
  collections::BTreeSet,
  fmt,
  path::{Path, PathBuf},
};

use crate::{Error, Result};

/// Characters that may never appear in a store or table name.
pub const FORBIDDEN_CHARS: &str = ",;:()[]+-*/<>=~!@#%^&|`?$";

/// Name of the shared in-memory store.
pub const MEMORY_STORE: &str = "memory";

const MEMORY_PATH: &str = ":memory:";

/// Reject names that are empty or contain any of [`FORBIDDEN_CHARS`].
pub fn validate_identifier(name: &str) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::InvalidIdentifier {
      name:   name.to_owned(),
      reason: "name must not be empty".to_owned(),
    });
  }

  let invalid: BTreeSet<char> =
    name.chars().filter(|c| FORBIDDEN_CHARS.contains(*c)).collect();
  if invalid.is_empty() {
    Ok(())
  } else {
    let chars: String = invalid.into_iter().collect();
    Err(Error::InvalidIdentifier {
      name:   name.to_owned(),
      reason: format!("invalid character(s) {chars:?}"),
    })
  }
}

/// Lower-case a table name and replace spaces and dots with `_`.
pub fn normalize_table_name(name: &str) -> String {
  name.to_lowercase().replace([' ', '.'], "_")
}

/// Lower-case a column name, replace spaces, dots and colons with `_`, and
/// rewrite the anonymous-column marker (`Unnamed: N`) to `x`.
pub fn normalize_column_name(name: &str) -> String {
  name
    .to_lowercase()
    .replace([' ', '.', ':'], "_")
    .replace("unnamed", "x")
}

/// Derive a table name from a data file path: its normalised file stem.
pub fn table_name_from_path(path: &Path) -> String {
  let stem = path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();
  normalize_table_name(&stem)
}

// ─── Store location ──────────────────────────────────────────────────────────

/// Where a store's data physically lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorePath {
  /// The process-wide shared in-memory store.
  Memory,
  File(PathBuf),
}

/// A resolved store: the name used as the route prefix plus its physical
/// location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreLocation {
  pub name: String,
  pub path: StorePath,
}

impl StoreLocation {
  pub fn memory() -> Self {
    Self { name: MEMORY_STORE.to_owned(), path: StorePath::Memory }
  }

  /// Key under which the store's handle is cached. Two locations with the
  /// same key share one connection.
  pub fn key(&self) -> String {
    match &self.path {
      StorePath::Memory => MEMORY_PATH.to_owned(),
      StorePath::File(p) => p.to_string_lossy().into_owned(),
    }
  }

  /// The store's file name (`demo.db`), or `:memory:`.
  pub fn file_name(&self) -> String {
    match &self.path {
      StorePath::Memory => MEMORY_PATH.to_owned(),
      StorePath::File(_) => format!("{}.db", self.name),
    }
  }
}

impl fmt::Display for StoreLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.file_name())
  }
}

/// Resolve a caller-supplied database name to a [`StoreLocation`].
///
/// No name, an empty name, or `:memory:` selects the in-memory store.
/// Otherwise the name is lower-cased and validated, and the store lives in
/// `<data_dir>/<name>.db`.
pub fn resolve_store(database: Option<&str>, data_dir: &Path) -> Result<StoreLocation> {
  let database = match database.map(str::trim) {
    None | Some("") | Some(MEMORY_PATH) => return Ok(StoreLocation::memory()),
    Some(d) => d.to_lowercase(),
  };

  let name = database
    .strip_suffix(".db")
    .unwrap_or(&database)
    .to_owned();
  validate_identifier(&name)?;

  let path = data_dir.join(format!("{name}.db"));
  Ok(StoreLocation { name, path: StorePath::File(path) })
}
