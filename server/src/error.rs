//! HTTP-facing error type (§10.3). Wraps `docsync_types::Error` (the
//! library-level taxonomy of §7) the same way the existing server's
//! `error.rs` wraps its own adapter errors: one status/code/message triple
//! per variant, `warn!` before any lossy conversion.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// No live document for the requested name (§4.7 admin surface).
	NotFound,

	/// Malformed request (bad path/query, non-UTF-8 upgrade headers, ...).
	BadRequest(String),

	/// A library-level failure that has no narrower HTTP meaning.
	Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
	code: &'static str,
	message: String,
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{self:?}")
	}
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let (status, code, message) = match self {
			Error::NotFound => (StatusCode::NOT_FOUND, "E-DOC-NOTFOUND", "document not found".to_string()),
			Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "E-REQ-INVALID", msg),
			Error::Internal(msg) => {
				tracing::warn!("internal error: {}", msg);
				(StatusCode::INTERNAL_SERVER_ERROR, "E-SRV-INTERNAL", "internal server error".to_string())
			}
		};

		(status, Json(ErrorBody { code, message })).into_response()
	}
}

impl From<docsync_types::Error> for Error {
	fn from(err: docsync_types::Error) -> Self {
		tracing::warn!("library error surfaced at HTTP boundary: {}", err);
		match err {
			docsync_types::Error::NotFound => Error::NotFound,
			other => Error::Internal(other.to_string()),
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		tracing::warn!("io error: {}", err);
		Error::Internal(err.to_string())
	}
}

// vim: ts=4
