//! Process configuration (§10.4): a small struct covering only what C1-C7
//! and the admin surface need, loaded from environment variables with
//! hard-coded defaults — the same `env::var(..).unwrap_or(..)` idiom the
//! existing server's own binary entry point uses to find its data
//! directory, rather than the full `Builder`/`BuilderOpts` machinery the
//! existing server needs for its much larger (TLS/ACME/multi-tenant)
//! surface.
//!
//! The chunked-storage limits (§4.2 `MAX_VALUE`/`MAX_KEYS`) and the
//! debounce timings (§4.6 "2 s trailing, 10 s max-wait") stay compiled-in
//! constants (`docsync_types::limits`, `docsync_sync`'s debounce task):
//! nothing downstream reads them from `Config`, so exposing override
//! fields for them here would be dead configuration. See `DESIGN.md`.

use std::net::SocketAddr;
use std::path::PathBuf;

/// `GET /healthz` and the websocket upgrade route both bind off the same
/// listen address; there is only one process-wide socket for this server.
#[derive(Debug, Clone)]
pub struct Config {
	pub listen: SocketAddr,
	pub content_store_base_url: String,
	pub durable_store_path: PathBuf,
}

impl Config {
	pub fn from_env() -> Self {
		let listen = std::env::var("DOCSYNC_LISTEN")
			.ok()
			.and_then(|v| v.parse().ok())
			.unwrap_or_else(Self::default_listen);

		let content_store_base_url = std::env::var("DOCSYNC_CONTENT_STORE_URL")
			.unwrap_or_else(|_| "http://127.0.0.1:4000".to_string());

		let durable_store_path = std::env::var("DOCSYNC_DURABLE_STORE_PATH")
			.map(PathBuf::from)
			.unwrap_or_else(|_| PathBuf::from("./docsync-data/docsync.db"));

		Config { listen, content_store_base_url, durable_store_path }
	}

	fn default_listen() -> SocketAddr {
		SocketAddr::from(([127, 0, 0, 1], 8080))
	}
}

impl Default for Config {
	fn default() -> Self {
		Config {
			listen: Self::default_listen(),
			content_store_base_url: "http://127.0.0.1:4000".to_string(),
			durable_store_path: PathBuf::from("./docsync-data/docsync.db"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_binds_loopback() {
		let config = Config::default();
		assert_eq!(config.listen, SocketAddr::from(([127, 0, 0, 1], 8080)));
	}
}

// vim: ts=4
