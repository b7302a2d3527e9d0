//! Websocket transport wiring for C5's `SessionSink` (§4.5, §6 "Transport").
//!
//! Bridges an axum `WebSocket` into `docsync_sync::SessionSink`: the socket
//! is split so the coordinator actor can push frames out through one half
//! while a dedicated receive loop feeds incoming frames back to the actor,
//! the same split-socket shape the existing server's own
//! `crdt/websocket.rs` uses for its connection handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;

use docsync_sync::{ReadyState, Registry, SessionSink};
use docsync_types::{AuthToken, ContentStoreClient, DocName, DurableStore};

use crate::prelude::*;

/// `SessionSink` over one half of a split axum websocket. `closed` tracks
/// `readyState` (§3) without needing to round-trip through axum, since
/// axum's `WebSocket` exposes no ready-state query of its own.
pub struct WsSessionSink {
	tx: Mutex<SplitSink<WebSocket, Message>>,
	closed: AtomicBool,
}

impl WsSessionSink {
	fn new(tx: SplitSink<WebSocket, Message>) -> Self {
		WsSessionSink { tx: Mutex::new(tx), closed: AtomicBool::new(false) }
	}
}

#[async_trait::async_trait]
impl SessionSink for WsSessionSink {
	fn ready_state(&self) -> ReadyState {
		if self.closed.load(Ordering::Acquire) {
			ReadyState::Closed
		} else {
			ReadyState::Open
		}
	}

	/// §4.5 "Send policy": a failed send closes the session.
	async fn send(&self, frame: Bytes) -> bool {
		if self.closed.load(Ordering::Acquire) {
			return false;
		}
		let mut tx = self.tx.lock().await;
		if tx.send(Message::Binary(frame)).await.is_err() {
			self.closed.store(true, Ordering::Release);
			return false;
		}
		true
	}

	async fn close(&self) {
		if self.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		let mut tx = self.tx.lock().await;
		let _ = tx.send(Message::Close(Some(CloseFrame { code: 1000, reason: "closed".into() }))).await;
		let _ = tx.close().await;
	}
}

/// Parameters the outer router forwards for one connection attempt (§1
/// "Out of scope ... authorization headers forwarding" — this crate only
/// carries what the coordinator needs once the outer router has already
/// resolved them).
pub struct ConnectionParams {
	pub name: DocName,
	pub auth: Option<AuthToken>,
	pub write_capable: bool,
}

/// Drives one client connection end-to-end: attaches to (or creates) the
/// named document (§4.6 "Session attach"), then forwards incoming binary
/// frames to the coordinator until the socket closes (§4.5 "Incoming"),
/// finally detaching the session (§4.6 "Session detach / close").
pub async fn handle_connection(
	socket: WebSocket,
	params: ConnectionParams,
	content: Arc<dyn ContentStoreClient>,
	durable: Arc<dyn DurableStore>,
	registry: Registry,
) {
	let ConnectionParams { name, auth, write_capable } = params;
	let (ws_tx, mut ws_rx) = socket.split();
	let sink: Arc<dyn SessionSink> = Arc::new(WsSessionSink::new(ws_tx));

	let (handle, session_id) =
		registry.get_or_create_and_attach(name.clone(), content, durable, sink.clone(), auth, write_capable).await;

	if session_id == 0 {
		// §4.4 "a second concurrent opener awaits the same promise" lost a
		// race against admin invalidation (§4.7); the caller reconnects.
		warn!("session attach raced a concurrent invalidation for {}, dropping connection", name);
		sink.close().await;
		return;
	}

	info!(document = %name, session = session_id, "websocket session open");

	while let Some(msg) = ws_rx.next().await {
		match msg {
			Ok(Message::Binary(bytes)) => handle.incoming_frame(session_id, bytes),
			Ok(Message::Close(_)) => break,
			Ok(Message::Ping(_) | Message::Pong(_)) => {}
			Ok(Message::Text(_)) => {
				warn!(document = %name, session = session_id, "discarding text frame, protocol is binary-only");
			}
			Err(e) => {
				warn!(document = %name, session = session_id, "websocket receive error: {}", e);
				break;
			}
		}
	}

	info!(document = %name, session = session_id, "websocket session closed");
	handle.detach_session(session_id);
}

// vim: ts=4
