//! Loaders turning CSV and XLSX bytes into [`Table`]s.
//!
//! Cells are typed per field: empty fields are missing, then integers,
//! reals and booleans are recognised before falling back to text. Column
//! storage types are inferred by [`Table::new`]. Rows shorter than the
//! header are padded with missing values; rows longer than it are rejected.

pub mod error;

use std::{io::Cursor, path::PathBuf};

use apiness_core::table::{Cell, DataFormat, Table};
use bytes::Bytes;
use calamine::{Data, Reader as _, Xlsx};
use tracing::debug;

pub use error::{Error, Result};

// ─── Source ──────────────────────────────────────────────────────────────────

/// Where a table comes from.
#[derive(Debug, Clone)]
pub enum Source {
  /// An uploaded file body.
  Bytes { data: Bytes, format: DataFormat },
  /// A file readable by the server process.
  Path { path: PathBuf, format: DataFormat },
  /// An already-built table.
  Table(Table),
}

impl Source {
  /// Read and parse the source.
  pub async fn load(self) -> Result<Table> {
    match self {
      Self::Bytes { data, format } => parse(&data, format),
      Self::Path { path, format } => {
        debug!(path = %path.display(), %format, "reading data file");
        let data = tokio::fs::read(&path).await?;
        parse(&data, format)
      }
      Self::Table(table) => Ok(table),
    }
  }
}

/// Parse `data` as `format`.
pub fn parse(data: &[u8], format: DataFormat) -> Result<Table> {
  match format {
    DataFormat::Csv => parse_csv(data),
    DataFormat::Xlsx => parse_xlsx(data),
  }
}

// ─── CSV ─────────────────────────────────────────────────────────────────────

fn parse_csv(data: &[u8]) -> Result<Table> {
  let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

  let columns: Vec<String> = reader
    .headers()?
    .iter()
    .enumerate()
    .map(|(i, h)| header_name(i, h.trim()))
    .collect();
  let expected = columns.len();

  let rows = reader
    .records()
    .map(|record| {
      let record = record?;
      if record.len() > expected {
        return Err(Error::RaggedRow {
          line: record.position().map_or(0, |p| p.line()),
          expected,
          found: record.len(),
        });
      }
      Ok(record.iter().map(parse_field).collect())
    })
    .collect::<Result<Vec<Vec<Cell>>>>()?;

  Ok(Table::new(columns, rows))
}

fn header_name(index: usize, raw: &str) -> String {
  if raw.is_empty() { format!("Unnamed: {index}") } else { raw.to_owned() }
}

/// Type a single CSV field.
pub fn parse_field(field: &str) -> Cell {
  let trimmed = field.trim();
  if trimmed.is_empty() {
    return Cell::Null;
  }
  if let Ok(i) = trimmed.parse::<i64>() {
    return Cell::Integer(i);
  }
  if let Ok(r) = trimmed.parse::<f64>() {
    return Cell::Real(r);
  }
  match trimmed {
    "True" | "TRUE" | "true" => Cell::Bool(true),
    "False" | "FALSE" | "false" => Cell::Bool(false),
    _ => Cell::Text(field.to_owned()),
  }
}

// ─── XLSX ────────────────────────────────────────────────────────────────────

fn parse_xlsx(data: &[u8]) -> Result<Table> {
  let mut workbook = Xlsx::new(Cursor::new(data))?;
  let range = workbook.worksheet_range_at(0).ok_or(Error::EmptyWorkbook)??;

  let mut rows = range.rows();
  let columns = match rows.next() {
    Some(header) => header
      .iter()
      .enumerate()
      .map(|(i, cell)| header_name(i, cell.to_string().trim()))
      .collect(),
    None => Vec::new(),
  };
  let rows = rows.map(|row| row.iter().map(xlsx_cell).collect()).collect();

  Ok(Table::new(columns, rows))
}

fn xlsx_cell(data: &Data) -> Cell {
  match data {
    Data::Int(i) => Cell::Integer(*i),
    Data::Float(f) => Cell::Real(*f),
    Data::String(s) => Cell::Text(s.clone()),
    Data::Bool(b) => Cell::Bool(*b),
    Data::Empty | Data::Error(_) => Cell::Null,
    other => Cell::Text(other.to_string()),
  }
}
