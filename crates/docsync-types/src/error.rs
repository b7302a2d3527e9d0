//! Unified error type shared by the codec, the content-store client, the
//! durable-store adapters and the coordinator. Mirrors the §7 error taxonomy.

use tracing::warn;

pub type DocResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Session transport is closed or in the wrong ready-state for sending.
	TransportClosed,

	/// Content store `GET` returned a status other than 200/404.
	UpstreamUnavailable(u16),

	/// Content store `PUT` returned 401: caller should close every session
	/// for the document so clients reconnect with fresh credentials.
	UpstreamRejected,

	/// Content store `PUT` returned a non-2xx, non-401 status.
	UpstreamWriteFailed(u16),

	/// Chunked encoding would need `chunks >= MAX_KEYS` key/value pairs.
	StorageOverflow { chunks: usize, max_keys: usize },

	/// Durable record's `doc` field does not match the expected document name.
	StorageStale,

	/// HTML could not be parsed into the structured-document model.
	CodecError(String),

	/// Document name has no live `SharedDocument` in the registry.
	NotFound,

	Io(std::io::Error),
	Network(String),
	Serialization(String),
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::TransportClosed => write!(f, "transport closed"),
			Error::UpstreamUnavailable(status) => {
				write!(f, "content store unavailable (status {status})")
			}
			Error::UpstreamRejected => write!(f, "content store rejected credentials (401)"),
			Error::UpstreamWriteFailed(status) => {
				write!(f, "content store write failed (status {status})")
			}
			Error::StorageOverflow { chunks, max_keys } => {
				write!(f, "durable state needs {chunks} chunks, exceeds max_keys {max_keys}")
			}
			Error::StorageStale => write!(f, "durable record belongs to a different document"),
			Error::CodecError(msg) => write!(f, "codec error: {msg}"),
			Error::NotFound => write!(f, "document not found"),
			Error::Io(e) => write!(f, "I/O error: {e}"),
			Error::Network(msg) => write!(f, "network error: {msg}"),
			Error::Serialization(msg) => write!(f, "serialization error: {msg}"),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		warn!("I/O error: {}", err);
		Error::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		warn!("serialization error: {}", err);
		Error::Serialization(err.to_string())
	}
}

// vim: ts=4
