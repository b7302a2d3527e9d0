//! Process bootstrap: `AppState`/`App`/`Builder`, mirroring the existing
//! server's own `AppState`/`Builder` split in its `lib.rs` — adapters are
//! supplied by the caller (the binary entry point) rather than constructed
//! here, so the core stays testable against fakes.

use std::sync::Arc;

use tokio::signal;

use docsync_sync::Registry;
use docsync_types::{ContentStoreClient, DurableStore};

use crate::config::Config;
use crate::prelude::*;
use crate::routes;

pub struct AppState {
	pub registry: Registry,
	pub content: Arc<dyn ContentStoreClient>,
	pub durable: Arc<dyn DurableStore>,
	pub config: Config,
}

pub type App = Arc<AppState>;

pub struct Builder {
	config: Config,
	content: Arc<dyn ContentStoreClient>,
	durable: Arc<dyn DurableStore>,
}

impl Builder {
	/// Adapters are required up front (unlike the existing server's
	/// optional-then-validated adapter slots): there is no sensible
	/// default content-store client or durable store, so asking for them
	/// at construction time turns a missing adapter into a compile error
	/// instead of a startup-time panic.
	pub fn new(content: Arc<dyn ContentStoreClient>, durable: Arc<dyn DurableStore>) -> Self {
		Builder { config: Config::default(), content, durable }
	}

	pub fn config(mut self, config: Config) -> Self {
		self.config = config;
		self
	}

	/// Builds the router and app state without binding a socket, for tests
	/// that want to drive the router directly (`tower::ServiceExt::oneshot`
	/// and friends).
	pub fn build(self) -> (App, axum::Router) {
		let state: App = Arc::new(AppState {
			registry: Registry::new(),
			content: self.content,
			durable: self.durable,
			config: self.config,
		});
		let router = routes::build(state.clone());
		(state, router)
	}

	pub async fn run(self) -> Result<()> {
		tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.init();

		let listen = self.config.listen;
		let (_state, router) = self.build();

		let listener = tokio::net::TcpListener::bind(listen).await?;
		info!("listening on {}", listen);

		axum::serve(listener, router)
			.with_graceful_shutdown(shutdown_signal())
			.await
			.map_err(|e| Error::Internal(format!("server loop failed: {e}")))?;

		info!("shutdown complete");
		Ok(())
	}
}

/// Waits for SIGINT or SIGTERM (§10.6 "Graceful shutdown"). Axum stops
/// accepting new connections immediately on either signal and then lets
/// in-flight handlers — including any coordinator actor still finishing a
/// message — run to completion before `run()` returns.
async fn shutdown_signal() {
	let ctrl_c = async {
		let _ = signal::ctrl_c().await;
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => warn!("failed to install SIGTERM handler: {}", e),
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => info!("received SIGINT, shutting down"),
		() = terminate => info!("received SIGTERM, shutting down"),
	}
}

// vim: ts=4
