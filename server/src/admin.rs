//! HTTP handlers for C7's admin invalidation surface (§4.7, §6 "HTTP admin
//! surface"). Both handlers resolve to the same underlying operation
//! (`docsync_sync::invalidate`); they differ only in which status codes the
//! spec assigns to "was live" vs. "wasn't live" for each signal name.

use axum::extract::{Path, State};
use axum::http::StatusCode;

use docsync_sync::InvalidationOutcome;
use docsync_types::DocName;

use crate::prelude::*;

/// `syncAdmin(name)` → 200 if document was live, 404 otherwise.
pub async fn sync_admin(State(app): State<App>, Path(name): Path<String>) -> StatusCode {
	let name = DocName::new(name);
	match docsync_sync::invalidate(&app.registry, &name) {
		InvalidationOutcome::Found => {
			info!(document = %name, "sync-admin invalidated live document");
			StatusCode::OK
		}
		InvalidationOutcome::NotFound => StatusCode::NOT_FOUND,
	}
}

/// `deleteAdmin(name)` → 204 if document was live, 404 otherwise.
pub async fn delete_admin(State(app): State<App>, Path(name): Path<String>) -> StatusCode {
	let name = DocName::new(name);
	match docsync_sync::invalidate(&app.registry, &name) {
		InvalidationOutcome::Found => {
			info!(document = %name, "delete-admin invalidated live document");
			StatusCode::NO_CONTENT
		}
		InvalidationOutcome::NotFound => StatusCode::NOT_FOUND,
	}
}

// vim: ts=4
