//! Writing tables into a store.

use tracing::info;

use crate::{
  Error, Result,
  ident::{normalize_table_name, validate_identifier},
  store::TableStore,
  table::{ConflictPolicy, Relation, Table},
};

/// Write `table` into `store` under `table_name` and describe the result.
///
/// The table name is normalised and validated and the column names are
/// normalised before anything is written. Under [`ConflictPolicy::Replace`]
/// the existing table is dropped first; the drop and the write are separate
/// steps, so a failed write leaves the table missing.
pub async fn materialize<S: TableStore>(
  store: &S,
  table_name: &str,
  mut table: Table,
  policy: ConflictPolicy,
) -> Result<Relation> {
  let name = normalize_table_name(table_name);
  validate_identifier(&name)?;
  table.normalize_column_names();
  let columns = table.columns();

  if policy == ConflictPolicy::Replace {
    store
      .drop_table(name.clone())
      .await
      .map_err(|e| Error::database(store.name(), e))?;
  }

  let rows_written = store
    .write_table(name.clone(), table, policy)
    .await
    .map_err(|e| Error::database(store.name(), e))?;

  info!(store = store.name(), table = %name, rows = rows_written, %policy, "materialized table");
  Ok(Relation { table: name, columns, rows_written })
}
