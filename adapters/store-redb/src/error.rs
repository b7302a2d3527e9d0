//! redb-specific error wrapping, converted into the shared `docsync_types::Error`.

use std::fmt;

#[derive(Debug)]
pub enum Error {
	DbError(String),
	IoError(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::DbError(msg) => write!(f, "redb error: {msg}"),
			Error::IoError(msg) => write!(f, "I/O error: {msg}"),
		}
	}
}

impl std::error::Error for Error {}

impl From<Error> for docsync_types::Error {
	fn from(err: Error) -> Self {
		tracing::warn!("durable store error: {}", err);
		docsync_types::Error::Serialization(err.to_string())
	}
}

// vim: ts=4
