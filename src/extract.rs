use axum::extract::FromRequest;

use crate::errors::AppError;

/// Request body extractor. Behaves like `axum::Json` but rejects malformed
/// bodies with the service's JSON error envelope instead of plain text.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
