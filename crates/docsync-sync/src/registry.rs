//! The shared-document registry (C4, §4.4): a process-wide `name →
//! SharedDocument` map. §9 "Global state" asks for this to be encapsulated
//! behind `get_or_create`/`remove_if_empty`/`remove(name)` so it stays
//! mockable; here that's `get_or_create_and_attach` (the only way a caller
//! ever gets a session attached — creation and first-attach are the same
//! atomic step) and `remove`, called by the document's own actor once its
//! `sessions` map is empty (I3) or on admin invalidation (§4.7).

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use docsync_types::{AuthToken, ContentStoreClient, DocName, DurableStore};

use crate::coordinator::{self, DocumentHandle};
use crate::session::{SessionId, SessionSink};

/// I1: at most one live document per name. Cheap to clone — just an `Arc`
/// around the map — so every actor can hold one to call `remove` on
/// itself without a back-reference cycle to anything heavier.
#[derive(Clone)]
pub struct Registry {
	docs: Arc<DashMap<DocName, DocumentHandle>>,
}

impl Registry {
	pub fn new() -> Self {
		Registry { docs: Arc::new(DashMap::new()) }
	}

	/// Looks up `name`; if absent, spawns a new document actor bound to
	/// `sink`/`auth`/`write_capable` as its first session. If present,
	/// attaches to the existing actor instead (§4.4 "a second concurrent
	/// opener awaits the same promise and reuses the document"). Returns
	/// the handle the caller should keep using to forward frames/detach,
	/// plus the assigned session id (`0` if the existing actor had already
	/// exited between the lookup and the attach call — rare: the document
	/// was concurrently invalidated — in which case the caller should
	/// retry the whole call rather than use the returned handle).
	pub async fn get_or_create_and_attach(
		&self,
		name: DocName,
		content: Arc<dyn ContentStoreClient>,
		durable: Arc<dyn DurableStore>,
		sink: Arc<dyn SessionSink>,
		auth: Option<AuthToken>,
		write_capable: bool,
	) -> (DocumentHandle, SessionId) {
		let existing = match self.docs.entry(name.clone()) {
			Entry::Occupied(entry) => entry.get().clone(),
			Entry::Vacant(entry) => {
				let (handle, id) =
					coordinator::spawn(name.clone(), content, durable, self.clone(), sink, auth, write_capable);
				entry.insert(handle.clone());
				return (handle, id);
			}
		};

		let id = existing.attach_session(sink, auth, write_capable).await;
		(existing, id)
	}

	/// Looks up a live document without creating one (§4.7 admin surface).
	pub fn lookup(&self, name: &DocName) -> Option<DocumentHandle> {
		self.docs.get(name).map(|entry| entry.clone())
	}

	/// Called by a document's own actor once it has no reason to keep
	/// running (I3, or §4.7 admin invalidation). Safe to call unconditionally:
	/// while this entry is occupied, every concurrent `get_or_create_and_attach`
	/// for the same name attaches to the caller instead of creating a new
	/// entry (`dashmap`'s per-key locking plus this being the only removal
	/// point means a fresh occupant can never exist for `name` until after
	/// this call completes).
	pub fn remove(&self, name: &DocName) {
		self.docs.remove(name);
	}
}

impl Default for Registry {
	fn default() -> Self {
		Registry::new()
	}
}

// vim: ts=4
