//! The per-document coordinator (C6, §4.6) as a single-threaded cooperative
//! actor (§5): one `tokio::task` per live document processes an ordered
//! `ActorMsg` stream, so session attach/detach, frame handling, and
//! observer callbacks are always serialized for a given document while
//! different documents still run fully in parallel — "model observers as
//! messages to the per-document actor" (§9).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Doc, Options, ReadTxn, StateVector, Transact, Update, XmlFragmentRef};

use docsync_types::{ContentStoreClient, DurableStore};
use docsync_types::prelude::*;

use crate::awareness::{self, AwarenessState, AwarenessUpdate};
use crate::frame::{self, Frame, SyncMessage};
use crate::registry::Registry;
use crate::session::{Session, SessionId, SessionSink};
use crate::{debounce, FIRST_SESSION_ID};

enum ActorMsg {
	AttachSession {
		sink: Arc<dyn SessionSink>,
		auth: Option<AuthToken>,
		write_capable: bool,
		reply: oneshot::Sender<SessionId>,
	},
	DetachSession {
		id: SessionId,
	},
	IncomingFrame {
		id: SessionId,
		bytes: Bytes,
	},
	ObservedUpdate {
		update: Vec<u8>,
	},
	DebounceFire,
	DelayedReset,
	AdminInvalidate,
}

/// A cheap, cloneable reference to a live document's actor. The registry
/// keeps exactly one of these per document name (I1); everything else
/// (the `server` crate's websocket handler, `admin.rs`) only ever talks to
/// the document through this handle.
#[derive(Clone)]
pub struct DocumentHandle {
	tx: mpsc::UnboundedSender<ActorMsg>,
}

impl DocumentHandle {
	/// §4.6 "Session attach": queues behind whatever the actor is already
	/// doing (including the initial `bindState`, since that runs before
	/// the actor's message loop starts accepting anything else), so a
	/// concurrent opener naturally waits for the same bind as the spec's
	/// "cached bind promise" requires. Returns `0` if the actor has
	/// already exited (document was concurrently invalidated); the caller
	/// should re-resolve through the registry.
	pub async fn attach_session(&self, sink: Arc<dyn SessionSink>, auth: Option<AuthToken>, write_capable: bool) -> SessionId {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(ActorMsg::AttachSession { sink, auth, write_capable, reply }).is_err() {
			return 0;
		}
		rx.await.unwrap_or(0)
	}

	pub fn detach_session(&self, id: SessionId) {
		let _ = self.tx.send(ActorMsg::DetachSession { id });
	}

	pub fn incoming_frame(&self, id: SessionId, bytes: Bytes) {
		let _ = self.tx.send(ActorMsg::IncomingFrame { id, bytes });
	}

	/// §4.7: forcibly closes every session; returns `true` if the actor
	/// was still alive to receive the request.
	pub fn admin_invalidate(&self) -> bool {
		self.tx.send(ActorMsg::AdminInvalidate).is_ok()
	}
}

struct Actor {
	name: DocName,
	doc: Doc,
	fragment: XmlFragmentRef,
	content: Arc<dyn ContentStoreClient>,
	durable: Arc<dyn DurableStore>,
	registry: Registry,
	rx: mpsc::UnboundedReceiver<ActorMsg>,
	tx: mpsc::UnboundedSender<ActorMsg>,
	sessions: HashMap<SessionId, Session>,
	awareness: AwarenessState,
	current: String,
	error: Option<ErrorEntry>,
	debounce_dirty: mpsc::UnboundedSender<()>,
	next_session_id: SessionId,
	_update_sub: Option<yrs::Subscription>,
}

/// Spawns the actor for a brand-new document, attaching `first session` as
/// part of startup. Always assigns `FIRST_SESSION_ID` to that session so
/// the caller can learn its id without waiting on the actor.
pub fn spawn(
	name: DocName,
	content: Arc<dyn ContentStoreClient>,
	durable: Arc<dyn DurableStore>,
	registry: Registry,
	first_sink: Arc<dyn SessionSink>,
	first_auth: Option<AuthToken>,
	first_write_capable: bool,
) -> (DocumentHandle, SessionId) {
	let (tx, rx) = mpsc::unbounded_channel();
	let (debounce_tx, debounce_rx) = mpsc::unbounded_channel();
	let (fire_tx, mut fire_rx) = mpsc::unbounded_channel();

	tokio::spawn(debounce::run(debounce_rx, fire_tx));

	let forward_tx = tx.clone();
	tokio::spawn(async move {
		while fire_rx.recv().await.is_some() {
			if forward_tx.send(ActorMsg::DebounceFire).is_err() {
				return;
			}
		}
	});

	let doc = Doc::with_options(Options { skip_gc: true, ..Options::default() });
	let fragment = doc.get_or_insert_xml_fragment("prosemirror");

	let actor = Actor {
		name,
		doc,
		fragment,
		content,
		durable,
		registry,
		rx,
		tx: tx.clone(),
		sessions: HashMap::new(),
		awareness: AwarenessState::new(),
		current: String::new(),
		error: None,
		debounce_dirty: debounce_tx,
		next_session_id: FIRST_SESSION_ID + 1,
		_update_sub: None,
	};

	tokio::spawn(actor.run(first_sink, first_auth, first_write_capable));

	(DocumentHandle { tx }, FIRST_SESSION_ID)
}

impl Actor {
	async fn run(mut self, first_sink: Arc<dyn SessionSink>, first_auth: Option<AuthToken>, first_write_capable: bool) {
		self.bind_state(first_auth.as_ref()).await;
		self.register_observers();
		self.attach(FIRST_SESSION_ID, first_sink, first_auth, first_write_capable).await;

		if self.sessions.is_empty() {
			// The first session's initial exchange failed outright (send
			// rejected before anyone else could attach); nothing will ever
			// detach it again, so remove from the registry here instead of
			// relying on the loop's post-message check (I3).
			self.registry.remove(&self.name);
			return;
		}

		while let Some(msg) = self.rx.recv().await {
			match msg {
				ActorMsg::AttachSession { sink, auth, write_capable, reply } => {
					let id = self.next_session_id;
					self.next_session_id += 1;
					self.attach(id, sink, auth, write_capable).await;
					let _ = reply.send(id);
				}
				ActorMsg::DetachSession { id } => self.handle_detach(id).await,
				ActorMsg::IncomingFrame { id, bytes } => self.handle_incoming(id, bytes).await,
				ActorMsg::ObservedUpdate { update } => self.handle_observed_update(update).await,
				ActorMsg::DebounceFire => self.handle_debounce_fire().await,
				ActorMsg::DelayedReset => self.handle_delayed_reset().await,
				ActorMsg::AdminInvalidate => {
					info!("admin invalidation for {}: closing all sessions", self.name);
					self.close_all_sessions().await;
					self.registry.remove(&self.name);
					break;
				}
			}

			if self.sessions.is_empty() {
				self.registry.remove(&self.name);
				break;
			}
		}
	}

	/// §4.6 "bindState", run exactly once before the actor accepts any
	/// other message.
	async fn bind_state(&mut self, auth: Option<&AuthToken>) {
		let current = match self.content.get(&self.name, auth).await {
			Ok(html) => html,
			Err(e) => {
				warn!("bind: content store GET failed for {}: {}", self.name, e);
				self.error = Some(ErrorEntry::new(format!("bind GET failed: {e}")));
				EMPTY_DOC.to_string()
			}
		};
		self.current = current.clone();

		let stored = match self.durable.read(&self.name).await {
			Ok(s) => s,
			Err(e) => {
				warn!("bind: durable read failed for {}: {}", self.name, e);
				self.error = Some(ErrorEntry::new(format!("bind durable read failed: {e}")));
				None
			}
		};

		let restored = match stored {
			Some(bytes) if !bytes.is_empty() => self.try_restore(&bytes, &current),
			_ => false,
		};

		if !restored && current != EMPTY_DOC {
			let tx = self.tx.clone();
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_secs(1)).await;
				let _ = tx.send(ActorMsg::DelayedReset);
			});
		}
	}

	/// §4.6 step 2: applies `bytes` to a scratch document first so a
	/// mismatching durable record never touches the real `doc` at all —
	/// "leave the document as if stored had never existed" (I4).
	fn try_restore(&mut self, bytes: &[u8], current: &str) -> bool {
		let scratch = Doc::with_options(Options { skip_gc: true, ..Options::default() });
		let scratch_fragment = scratch.get_or_insert_xml_fragment("prosemirror");

		let update = match Update::decode_v1(bytes) {
			Ok(u) => u,
			Err(e) => {
				warn!("bind: durable record for {} failed to decode: {}", self.name, e);
				self.error = Some(ErrorEntry::new(format!("durable decode failed: {e}")));
				return false;
			}
		};

		{
			let mut txn = scratch.transact_mut();
			if let Err(e) = txn.apply_update(update) {
				warn!("bind: durable record for {} failed to apply: {}", self.name, e);
				self.error = Some(ErrorEntry::new(format!("durable apply failed: {e}")));
				return false;
			}
		}

		let projection = {
			let txn = scratch.transact();
			match docsync_codec::doc2aem(&scratch_fragment, &txn) {
				Ok(html) => html,
				Err(e) => {
					warn!("bind: durable record for {} failed to project: {}", self.name, e);
					self.error = Some(ErrorEntry::new(format!("durable projection failed: {e}")));
					return false;
				}
			}
		};

		if projection != current {
			return false;
		}

		let merged = {
			let txn = scratch.transact();
			txn.encode_state_as_update_v1(&StateVector::default())
		};
		match Update::decode_v1(&merged) {
			Ok(update) => {
				let mut txn = self.doc.transact_mut();
				if let Err(e) = txn.apply_update(update) {
					warn!("bind: merging restored state for {} failed: {}", self.name, e);
					return false;
				}
				true
			}
			Err(e) => {
				warn!("bind: re-encoding restored state for {} failed: {}", self.name, e);
				false
			}
		}
	}

	/// §4.6 step 4: both observers are registered immediately (§9 open
	/// question (b) — no ambiguous pre-registration delay).
	fn register_observers(&mut self) {
		let tx = self.tx.clone();
		let sub = self.doc.observe_update_v1(move |_txn, event| {
			let _ = tx.send(ActorMsg::ObservedUpdate { update: event.update.clone() });
		});
		self._update_sub = Some(sub);
	}

	async fn attach(&mut self, id: SessionId, sink: Arc<dyn SessionSink>, auth: Option<AuthToken>, write_capable: bool) {
		info!("session {} attached to {}", id, self.name);
		let session = Session::new(id, sink, auth, write_capable);
		self.sessions.insert(id, session);
		self.run_initial_exchange(id).await;
	}

	/// §4.5 "Outgoing initial exchange".
	async fn run_initial_exchange(&mut self, id: SessionId) {
		let Some(session) = self.sessions.get(&id) else { return };

		let step1 = {
			let txn = self.doc.transact();
			Frame::Sync(SyncMessage::Step1(txn.state_vector().encode_v1()))
		};
		if !session.send_or_close(frame::encode_frame(&step1)).await {
			self.handle_detach(id).await;
			return;
		}

		if !self.awareness.is_empty() {
			let payload = self.awareness.encode_all();
			let Some(session) = self.sessions.get(&id) else { return };
			if !session.send_or_close(frame::encode_frame(&Frame::Awareness(payload))).await {
				self.handle_detach(id).await;
			}
		}
	}

	/// §4.6 "Session detach / close".
	async fn handle_detach(&mut self, id: SessionId) {
		let removed = self.remove_session(id);
		if removed.is_empty() {
			return;
		}
		info!("session {} detached from {}, removing {} awareness ids", id, self.name, removed.len());
		let update: AwarenessUpdate = removed.into_iter().map(|cid| (cid, None)).collect();
		let frame = frame::encode_frame(&Frame::Awareness(awareness::encode_update(update)));
		self.broadcast(&frame, None).await;
	}

	fn remove_session(&mut self, id: SessionId) -> Vec<ClientId> {
		let Some(session) = self.sessions.remove(&id) else { return Vec::new() };
		self.awareness.remove_all(session.controlled)
	}

	async fn handle_incoming(&mut self, id: SessionId, bytes: Bytes) {
		let frame = match frame::decode_frame(&bytes) {
			Ok(f) => f,
			Err(e) => {
				warn!("discarding malformed frame from session {} on {}: {}", id, self.name, e);
				return;
			}
		};

		match frame {
			Frame::Sync(msg) => {
				let reply = match self.handle_sync_message(msg) {
					Ok(reply) => reply,
					Err(e) => {
						warn!("sync message from session {} on {} rejected: {}", id, self.name, e);
						return;
					}
				};
				if let Some(reply) = reply {
					if let Some(session) = self.sessions.get(&id) {
						if !session.send_or_close(frame::encode_frame(&reply)).await {
							self.handle_detach(id).await;
						}
					}
				}
			}
			Frame::Awareness(payload) => {
				let update = match awareness::decode_update(&payload) {
					Ok(u) => u,
					Err(e) => {
						warn!("awareness update from session {} on {} rejected: {}", id, self.name, e);
						return;
					}
				};
				let diff = self.awareness.apply(update);
				if diff.is_empty() {
					return;
				}
				if let Some(session) = self.sessions.get_mut(&id) {
					for cid in &diff.added {
						session.controlled.insert(*cid);
					}
					for cid in &diff.removed {
						session.controlled.remove(cid);
					}
				}
				let ids = diff.changed_ids();
				let encoded = self.awareness.encode_ids(&ids);
				let frame = frame::encode_frame(&Frame::Awareness(encoded));
				self.broadcast(&frame, None).await;
			}
		}
	}

	/// §4.5 "Incoming": `readSyncMessage` equivalent.
	fn handle_sync_message(&self, msg: SyncMessage) -> DocResult<Option<Frame>> {
		match msg {
			SyncMessage::Step1(their_sv) => {
				let their_sv = StateVector::decode_v1(&their_sv)
					.map_err(|e| Error::CodecError(format!("invalid state vector: {e}")))?;
				let txn = self.doc.transact();
				let diff = txn.encode_diff_v1(&their_sv);
				Ok(Some(Frame::Sync(SyncMessage::Step2(diff))))
			}
			SyncMessage::Step2(update) | SyncMessage::Update(update) => {
				let update = Update::decode_v1(&update)
					.map_err(|e| Error::CodecError(format!("invalid update: {e}")))?;
				let mut txn = self.doc.transact_mut();
				txn.apply_update(update).map_err(|e| Error::CodecError(format!("failed to apply update: {e}")))?;
				Ok(None)
			}
		}
	}

	/// §4.6 step 4 "Storage observer" + "Upstream observer" trigger.
	async fn handle_observed_update(&mut self, update: Vec<u8>) {
		let state = {
			let txn = self.doc.transact();
			txn.encode_state_as_update_v1(&StateVector::default())
		};
		if let Err(e) = self.durable.write(&self.name, &state).await {
			warn!("storage write failed for {}: {}", self.name, e);
			self.error = Some(ErrorEntry::new(format!("storage write failed: {e}")));
		}

		let frame = frame::encode_frame(&Frame::Sync(SyncMessage::Update(update)));
		self.broadcast(&frame, None).await;

		let _ = self.debounce_dirty.send(());
	}

	/// §4.6 step 4 "Upstream observer (debounced)".
	async fn handle_debounce_fire(&mut self) {
		let projection = {
			let txn = self.doc.transact();
			match docsync_codec::doc2aem(&self.fragment, &txn) {
				Ok(html) => html,
				Err(e) => {
					warn!("debounced projection failed for {}: {}", self.name, e);
					self.error = Some(ErrorEntry::new(format!("projection failed: {e}")));
					return;
				}
			}
		};

		if projection == self.current {
			return; // I5
		}

		let auths: Vec<AuthToken> = self.sessions.values().filter_map(|s| s.auth.clone()).collect();
		let outcome = self.content.put(&self.name, &projection, &auths).await;

		if outcome.ok {
			self.current = projection;
			self.error = None;
			return;
		}

		if outcome.status == 401 {
			warn!("content store rejected credentials for {}, closing all sessions", self.name);
			self.close_all_sessions().await;
			return;
		}

		warn!("content store write failed for {}: {} {}", self.name, outcome.status, outcome.status_text);
		self.error = Some(ErrorEntry::new(format!("{} {}", outcome.status, outcome.status_text)));
	}

	/// §4.6 step 3: the delayed transactional reset. `aem2doc` already
	/// clears the fragment's existing contents before writing
	/// (`docsync_codec::xmlconv::write_fragment`), so this is a direct call.
	async fn handle_delayed_reset(&mut self) {
		let current = self.current.clone();
		let mut txn = self.doc.transact_mut();
		if let Err(e) = docsync_codec::aem2doc(&current, &self.fragment, &mut txn) {
			warn!("delayed reset failed for {}: {}", self.name, e);
			self.error = Some(ErrorEntry::new(format!("reset failed: {e}")));
		}
	}

	async fn close_all_sessions(&mut self) {
		for (_, session) in self.sessions.drain() {
			session.sink.close().await;
		}
		self.awareness = AwarenessState::new();
	}

	/// Sends `frame` to every session except `exclude`; sessions whose
	/// send fails are dropped and their awareness ids broadcast as removed
	/// in one follow-up frame (best-effort: a session that fails during
	/// the follow-up is simply dropped, not chased further).
	async fn broadcast(&mut self, frame: &Bytes, exclude: Option<SessionId>) {
		let mut failed = Vec::new();
		for (id, session) in self.sessions.iter() {
			if Some(*id) == exclude {
				continue;
			}
			if !session.send_or_close(frame.clone()).await {
				failed.push(*id);
			}
		}
		if failed.is_empty() {
			return;
		}

		let mut removed_ids = Vec::new();
		for id in failed {
			removed_ids.extend(self.remove_session(id));
		}
		if removed_ids.is_empty() {
			return;
		}

		let update: AwarenessUpdate = removed_ids.into_iter().map(|cid| (cid, None)).collect();
		let follow_up = frame::encode_frame(&Frame::Awareness(awareness::encode_update(update)));
		let mut more_failed = Vec::new();
		for (id, session) in self.sessions.iter() {
			if !session.send_or_close(follow_up.clone()).await {
				more_failed.push(*id);
			}
		}
		for id in more_failed {
			self.remove_session(id);
		}
	}
}

// vim: ts=4
