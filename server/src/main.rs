//! Process entry point: wires the redb-backed durable store (C2) and the
//! HTTP content-store client (C3) into the coordinator and starts serving,
//! the same shape as the existing server's own binary entry point (parse
//! config from the environment, construct adapters, hand them to a
//! `Builder`, run).

use std::sync::Arc;

use docsync_content_client::HttpContentStoreClient;
use docsync_server::{Builder, Config};
use docsync_store_redb::RedbDurableStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_env();

	let content = Arc::new(HttpContentStoreClient::new(config.content_store_base_url.clone())?);
	let durable = Arc::new(RedbDurableStore::open(&config.durable_store_path).await?);

	Builder::new(content, durable).config(config).run().await?;

	Ok(())
}

// vim: ts=4
