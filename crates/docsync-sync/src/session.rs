//! §3 "Session": one connected editor, multiplexed onto a `SharedDocument`
//! by its coordinator actor. The transport itself is owned by whatever
//! wires an axum websocket (or any other framed channel) into
//! [`SessionSink`]; this crate never touches a socket directly.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use docsync_types::{AuthToken, ClientId};

pub type SessionId = u64;

/// §3 `readyState`, mirroring the small state machine every framed
/// transport (websockets included) exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
	Connecting,
	Open,
	Closing,
	Closed,
}

impl ReadyState {
	/// §4.5 "Send policy": "neither connecting nor open" → close.
	pub fn sendable(self) -> bool {
		matches!(self, ReadyState::Connecting | ReadyState::Open)
	}
}

/// The transport-facing half of a session. Implemented by the `server`
/// crate over a split websocket sink; kept as a trait so the coordinator
/// and its tests never depend on axum or tokio-tungstenite.
#[async_trait]
pub trait SessionSink: Send + Sync {
	fn ready_state(&self) -> ReadyState;

	/// Sends one already-framed message. Returns `false` on failure
	/// (§4.5 "If the underlying send fails ... close it").
	async fn send(&self, frame: Bytes) -> bool;

	/// Server-initiated close (§4.6 step 4 on 401, §4.7 admin invalidation).
	async fn close(&self);
}

/// One attached session (§3). `controlled` is the awareness client-id set
/// this session owns, kept here so I2 holds without scanning every other
/// session on every detach.
pub struct Session {
	pub id: SessionId,
	pub sink: Arc<dyn SessionSink>,
	pub auth: Option<AuthToken>,
	pub write_capable: bool,
	pub controlled: HashSet<ClientId>,
}

impl Session {
	pub fn new(id: SessionId, sink: Arc<dyn SessionSink>, auth: Option<AuthToken>, write_capable: bool) -> Self {
		Session { id, sink, auth, write_capable, controlled: HashSet::new() }
	}

	/// §4.5 "Send policy": checks `readyState` before attempting a send,
	/// closing the session on either a bad ready-state or a failed send.
	pub async fn send_or_close(&self, frame: Bytes) -> bool {
		if !self.sink.ready_state().sendable() {
			self.sink.close().await;
			return false;
		}
		if !self.sink.send(frame).await {
			self.sink.close().await;
			return false;
		}
		true
	}
}

// vim: ts=4
