//! Handler for `GET /download/{db}`.

use apiness_core::{
  ident::{StorePath, resolve_store},
  store::Connector,
};
use axum::{
  body::Body,
  extract::{Path, State},
  http::header,
  response::{IntoResponse, Response},
};
use chrono::Local;
use tokio_util::io::ReaderStream;

use crate::{AppState, error::ApiError};

/// Return a store's backing file as an attachment named
/// `<store>_<YYYY-mm-dd_HH_MM>.db`.
pub async fn handler<C: Connector>(
  State(state): State<AppState<C>>,
  Path(db): Path<String>,
) -> Result<Response, ApiError> {
  let location = resolve_store(Some(&db), &state.config.data_dir)?;
  let not_found = || ApiError::NotFound(format!("{} file not found!", location.file_name()));

  let StorePath::File(path) = &location.path else {
    return Err(not_found());
  };
  let file = match tokio::fs::File::open(path).await {
    Ok(file) => file,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
    Err(e) => return Err(e.into()),
  };
  let length = file.metadata().await?.len();

  let stamp = Local::now().format("%Y-%m-%d_%H_%M");
  let disposition = format!("attachment; filename=\"{}_{stamp}.db\"", location.name);
  Ok(
    (
      [
        (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
        (header::CONTENT_LENGTH, length.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      Body::from_stream(ReaderStream::new(file)),
    )
      .into_response(),
  )
}
