//! Adapter trait seams: the coordinator (C6, in `docsync-sync`) is written
//! only against these traits, so the redb-backed durable store and the HTTP
//! content-store client are both swappable and independently testable,
//! mirroring how the teacher server separates adapter traits (in its types
//! crate) from adapter implementations (in `adapters/*`).

use async_trait::async_trait;

use crate::error::DocResult;
use crate::model::{AuthToken, DocName, PutOutcome};

/// The chunked durable codec (C2), behind a trait so the CRDT coordinator
/// never depends on `redb` directly.
#[async_trait]
pub trait DurableStore: Send + Sync {
	/// §4.2 read algorithm. Returns `Ok(None)` for "none" (absent or a
	/// stale record from a prior occupant, which this call discards via
	/// `deleteAll()` before returning).
	async fn read(&self, name: &DocName) -> DocResult<Option<Vec<u8>>>;

	/// §4.2 write algorithm: always `deleteAll()` then `put(serialized)`.
	/// Returns `Error::StorageOverflow` if the encoded state would need
	/// `chunks >= MAX_KEYS` key/value pairs.
	async fn write(&self, name: &DocName, state: &[u8]) -> DocResult<()>;
}

/// The content-store HTTP client (C3), behind a trait for the same reason.
#[async_trait]
pub trait ContentStoreClient: Send + Sync {
	/// `GET <name>`. Returns the canonical empty document on 404 rather
	/// than an error (§4.3); any other non-200 status is
	/// `Error::UpstreamUnavailable`.
	async fn get(&self, name: &DocName, auth: Option<&AuthToken>) -> DocResult<String>;

	/// `PUT <name>` with the HTML body and the deduplicated, aggregated
	/// session auth tokens. Never returns `Err` — transport failures are
	/// folded into a failing `PutOutcome` (§4.3 "Never throws").
	async fn put(&self, name: &DocName, html: &str, auths: &[AuthToken]) -> PutOutcome;
}

// vim: ts=4
