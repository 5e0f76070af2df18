//! Error type for `apiness-tabular`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("xlsx error: {0}")]
  Xlsx(#[from] calamine::XlsxError),

  #[error("line {line}: expected {expected} fields, found {found}")]
  RaggedRow { line: u64, expected: usize, found: usize },

  #[error("workbook has no worksheets")]
  EmptyWorkbook,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
