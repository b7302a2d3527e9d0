//! Core data-model types shared across the codec, the content-store client,
//! the durable-store adapters and the coordinator (§3).

use std::fmt;
use std::sync::Arc;

/// Stable identifier for a document, typically a URL. Cheap to clone since
/// every session and every adapter call carries one around.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct DocName(Arc<str>);

impl DocName {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		DocName(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for DocName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for DocName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "DocName({:?})", self.0)
	}
}

impl From<&str> for DocName {
	fn from(value: &str) -> Self {
		DocName(Arc::from(value))
	}
}

impl From<String> for DocName {
	fn from(value: String) -> Self {
		DocName(Arc::from(value))
	}
}

/// Yjs/`y-sync` client id for one awareness entry. Opaque to this crate;
/// the CRDT engine assigns and interprets these.
pub type ClientId = u64;

/// Opaque bearer credential carried by a session and forwarded to the
/// content store. `None` sessions still count toward I2/broadcast but
/// never contribute to the PUT authorization aggregate.
pub type AuthToken = Arc<str>;

/// The last-known error surfaced on a `SharedDocument`'s auxiliary
/// `"error"` map (§3, §4.6 step 4 upstream observer).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEntry {
	pub timestamp: i64,
	pub message: String,
	pub stack: Option<String>,
}

impl ErrorEntry {
	pub fn new(message: impl Into<String>) -> Self {
		ErrorEntry {
			timestamp: chrono::Utc::now().timestamp_millis(),
			message: message.into(),
			stack: None,
		}
	}
}

/// Outcome of a content-store `PUT` (§4.3). Never constructed from a
/// transport-level failure — `ContentStoreClient::put` always resolves to
/// one of these rather than propagating a network error, per §4.3 "Never
/// throws; returns the triple."
#[derive(Debug, Clone)]
pub struct PutOutcome {
	pub ok: bool,
	pub status: u16,
	pub status_text: String,
}

impl PutOutcome {
	pub fn success(status: u16, status_text: impl Into<String>) -> Self {
		PutOutcome { ok: true, status, status_text: status_text.into() }
	}

	pub fn failure(status: u16, status_text: impl Into<String>) -> Self {
		PutOutcome { ok: false, status, status_text: status_text.into() }
	}
}

/// The canonical empty document returned by the content store on 404 (§6).
pub const EMPTY_DOC: &str = "<main></main>";

// vim: ts=4
