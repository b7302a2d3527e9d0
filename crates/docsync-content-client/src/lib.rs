//! HTTP client for the authoritative external content store (C3, §4.3).
//!
//! `get`/`put` are the only two operations the coordinator needs; both are
//! built by hand on `hyper`/`hyper-rustls`/`http-body-util` the same way
//! the existing server's `core/request.rs` builds its own request bodies
//! rather than reaching for a higher-level HTTP crate, including its
//! `timeout` wrapper and status-to-error mapping style.

use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::http::StatusCode;
use hyper::Method;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::time::timeout;
use tracing::{debug, warn};

use docsync_types::{AuthToken, ContentStoreClient, DocName, DocResult, Error, PutOutcome};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MULTIPART_BOUNDARY: &str = "docsync-boundary-4a1f9d";

/// `docsync_types::ContentStoreClient` backed by a real HTTP connection.
///
/// Document names are URLs (§3 "`name` ... typically a URL"); `base_url`
/// is prepended only when a name does not already look absolute, so the
/// same client works whether the router passes fully-qualified URLs or
/// store-relative paths.
#[derive(Clone)]
pub struct HttpContentStoreClient {
	client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
	base_url: Arc<str>,
}

impl HttpContentStoreClient {
	pub fn new(base_url: impl Into<Arc<str>>) -> DocResult<Self> {
		let https = HttpsConnectorBuilder::new()
			.with_native_roots()
			.map_err(|_| Error::Network("no native root CA certificates found".to_string()))?
			.https_only()
			.enable_http1()
			.enable_http2()
			.build();

		Ok(HttpContentStoreClient {
			client: Client::builder(TokioExecutor::new()).build(https),
			base_url: base_url.into(),
		})
	}

	fn resolve_url(&self, name: &DocName) -> String {
		let name = name.as_str();
		if name.starts_with("http://") || name.starts_with("https://") {
			name.to_string()
		} else {
			format!("{}{name}", self.base_url)
		}
	}

	async fn timed_request(
		&self,
		req: hyper::Request<Full<Bytes>>,
	) -> DocResult<hyper::Response<hyper::body::Incoming>> {
		timeout(REQUEST_TIMEOUT, self.client.request(req))
			.await
			.map_err(|_| Error::Network("content store request timed out".to_string()))?
			.map_err(|e| Error::Network(format!("content store request failed: {e}")))
	}

	async fn collect_body(body: hyper::body::Incoming) -> DocResult<Bytes> {
		timeout(REQUEST_TIMEOUT, body.collect())
			.await
			.map_err(|_| Error::Network("content store body read timed out".to_string()))?
			.map_err(|e| Error::Network(format!("content store body read failed: {e}")))
			.map(http_body_util::Collected::to_bytes)
	}

	fn multipart_body(html: &str) -> Full<Bytes> {
		let mut body = String::new();
		body.push_str("--");
		body.push_str(MULTIPART_BOUNDARY);
		body.push_str("\r\n");
		body.push_str("Content-Disposition: form-data; name=\"data\"\r\n");
		body.push_str("Content-Type: text/html\r\n\r\n");
		body.push_str(html);
		body.push_str("\r\n--");
		body.push_str(MULTIPART_BOUNDARY);
		body.push_str("--\r\n");
		Full::new(Bytes::from(body.into_bytes()))
	}
}

#[async_trait::async_trait]
impl ContentStoreClient for HttpContentStoreClient {
	async fn get(&self, name: &DocName, auth: Option<&AuthToken>) -> DocResult<String> {
		let mut builder = hyper::Request::builder().method(Method::GET).uri(self.resolve_url(name));
		if let Some(auth) = auth {
			builder = builder.header("Authorization", auth.as_ref());
		}
		let req = builder
			.body(Full::new(Bytes::new()))
			.map_err(|e| Error::Network(format!("failed to build GET request: {e}")))?;

		let res = self.timed_request(req).await?;
		debug!("content store GET {} -> {}", name, res.status());

		match res.status() {
			StatusCode::OK => {
				let bytes = Self::collect_body(res.into_body()).await?;
				String::from_utf8(bytes.to_vec())
					.map_err(|e| Error::Network(format!("content store returned non-utf8 body: {e}")))
			}
			StatusCode::NOT_FOUND => Ok(docsync_types::EMPTY_DOC.to_string()),
			status => Err(Error::UpstreamUnavailable(status.as_u16())),
		}
	}

	async fn put(&self, name: &DocName, html: &str, auths: &[AuthToken]) -> PutOutcome {
		let dedup_auth = dedup_auth_header(auths);

		let mut builder = hyper::Request::builder()
			.method(Method::PUT)
			.uri(self.resolve_url(name))
			.header("Content-Type", format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"))
			.header("X-DA-Initiator", "collab");
		if let Some(auth) = &dedup_auth {
			builder = builder.header("Authorization", auth.as_str());
		}

		let req = match builder.body(Self::multipart_body(html)) {
			Ok(req) => req,
			Err(e) => {
				warn!("failed to build content store PUT request for {}: {}", name, e);
				return PutOutcome::failure(0, e.to_string());
			}
		};

		match self.timed_request(req).await {
			Ok(res) => {
				let status = res.status();
				debug!("content store PUT {} -> {}", name, status);
				if status.is_success() {
					PutOutcome::success(status.as_u16(), status.canonical_reason().unwrap_or("").to_string())
				} else {
					PutOutcome::failure(status.as_u16(), status.canonical_reason().unwrap_or("").to_string())
				}
			}
			Err(e) => {
				warn!("content store PUT for {} failed: {}", name, e);
				PutOutcome::failure(0, e.to_string())
			}
		}
	}
}

/// §4.3 "the comma-separated **deduplicated** list of all session auth
/// tokens". Returns `None` when no session has an auth token, matching
/// "If any session has an `auth`" — the header is omitted entirely rather
/// than sent empty.
fn dedup_auth_header(auths: &[AuthToken]) -> Option<String> {
	let mut seen = Vec::new();
	for auth in auths {
		if !seen.iter().any(|s: &AuthToken| s.as_ref() == auth.as_ref()) {
			seen.push(auth.clone());
		}
	}
	if seen.is_empty() {
		None
	} else {
		Some(seen.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(","))
	}
}

impl std::fmt::Debug for HttpContentStoreClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpContentStoreClient").field("base_url", &self.base_url).finish()
	}
}


// vim: ts=4
