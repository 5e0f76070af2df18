//! DDL and DML builders for data tables.
//!
//! Table and column names are always double-quoted here, so any name that
//! survived normalisation is storable.

use apiness_core::kind::StorageType;

/// Name of the generated row identifier column.
pub const ID_COLUMN: &str = "id";

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

pub fn sql_type(storage: StorageType) -> &'static str {
  match storage {
    StorageType::Bool | StorageType::Int64 => "INTEGER",
    StorageType::Float64 => "REAL",
    StorageType::Object => "TEXT",
  }
}

/// `CREATE TABLE` for `table` plus the index on its `id` column.
pub fn create_table(
  table: &str,
  columns: &[String],
  storage: &[StorageType],
  if_not_exists: bool,
) -> String {
  let mut defs = vec![format!("{} INTEGER", quote_ident(ID_COLUMN))];
  defs.extend(
    columns
      .iter()
      .zip(storage)
      .map(|(name, ty)| format!("{} {}", quote_ident(name), sql_type(*ty))),
  );
  let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
  format!(
    "CREATE TABLE {guard}{table_q} ({defs});\nCREATE INDEX IF NOT EXISTS {index} ON {table_q} ({id});",
    table_q = quote_ident(table),
    defs = defs.join(", "),
    index = quote_ident(&format!("ix_{table}_{ID_COLUMN}")),
    id = quote_ident(ID_COLUMN),
  )
}

/// The first id to assign when writing into `table`.
pub fn next_id(table: &str) -> String {
  format!("SELECT COALESCE(MAX({id}) + 1, 0) FROM {}", quote_ident(table), id = quote_ident(ID_COLUMN))
}

/// A positional `INSERT` of the id followed by every column.
pub fn insert(table: &str, columns: &[String]) -> String {
  let names: Vec<String> = std::iter::once(ID_COLUMN)
    .chain(columns.iter().map(String::as_str))
    .map(quote_ident)
    .collect();
  let slots: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    quote_ident(table),
    names.join(", "),
    slots.join(", ")
  )
}
