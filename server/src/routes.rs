//! HTTP routing: the thin "outer router" the spec's §1 explicitly places
//! out of scope, reduced here to the minimum needed to drive C1-C7 end to
//! end — a websocket upgrade route, the two admin handlers (§4.7, §6), and
//! a health endpoint (§10.6 "Health/readiness endpoint"). Forwarding
//! richer per-tenant authorization headers, rate-limiting, and multi-route
//! dispatch are the named external collaborator's job, not this core's.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use docsync_types::{AuthToken, DocName};

use crate::app::App;
use crate::{admin, websocket};

/// Query parameters the outer router would normally resolve from an
/// already-authenticated request; here they arrive directly on the
/// upgrade request since there is no real outer router in this binary.
#[derive(Debug, Deserialize, Default)]
pub struct SessionQuery {
	/// §3 "Session ... `auth` token (opaque, forwarded to content store)".
	pub auth: Option<String>,
	/// Comma-separated capability strings (§3 "`authActions`"); the
	/// session is write-capable iff this set contains `"write"`.
	pub actions: Option<String>,
}

pub fn build(state: App) -> Router {
	Router::new()
		.route("/healthz", get(health))
		.route("/ws/{*name}", get(ws_upgrade))
		.route("/admin/sync/{*name}", post(admin::sync_admin))
		.route("/admin/delete/{*name}", delete(admin::delete_admin))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

/// §10.6 "Health/readiness endpoint": 200 once the process is accepting
/// sessions (always true while the router itself is being served).
async fn health() -> StatusCode {
	StatusCode::OK
}

/// Upgrades one HTTP connection to the §6 "Transport" binary channel and
/// hands it off to [`websocket::handle_connection`].
async fn ws_upgrade(
	ws: WebSocketUpgrade,
	State(app): State<App>,
	Path(name): Path<String>,
	Query(query): Query<SessionQuery>,
) -> Response {
	let auth: Option<AuthToken> = query.auth.map(AuthToken::from);
	let write_capable = query.actions.as_deref().is_some_and(|actions| actions.split(',').any(|a| a == "write"));
	let name = DocName::new(name);
	let content = app.content.clone();
	let durable = app.durable.clone();
	let registry = app.registry.clone();

	ws.on_upgrade(move |socket| async move {
		websocket::handle_connection(
			socket,
			websocket::ConnectionParams { name, auth, write_capable },
			content,
			durable,
			registry,
		)
		.await
	})
}


// vim: ts=4
