/// Request extractors
///
/// [`ApiJson`] is `axum::Json` with its rejections turned into [`ApiError`],
/// so a missing field or a malformed body answers 400 with the usual JSON
/// error body instead of axum's plain-text 415/422.

use crate::error::ApiError;
use axum::extract::FromRequest;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
