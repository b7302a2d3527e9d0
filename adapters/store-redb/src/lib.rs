//! redb-based durable store adapter (C2, §4.2).
//!
//! # Storage layout
//!
//! One shared redb file holds a single table, `docsync_records`, keyed by
//! `"{doc_name}\u{1}{field}"` and storing the field's raw bytes. A record's
//! fields are exactly the ones described by §4.2: `doc`, and either
//! `docstore` or `chunks` + `chunk_0..chunk_{N-1}`. This mirrors the
//! key/value-store abstraction the spec assumes (`list`/`put`/`deleteAll`)
//! on top of a single `TableDefinition`, rather than redb's own typed
//! per-table layout used for the append-only update log this crate is
//! descended from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use tokio::sync::Mutex;

use docsync_types::chunk::{self, Payload, Record};
use docsync_types::{DocName, DocResult};

mod error;
pub use error::Error;

const TABLE_RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("docsync_records");
const FIELD_SEP: char = '\u{1}';

fn doc_key(name: &DocName, field: &str) -> String {
	format!("{}{FIELD_SEP}{field}", name.as_str())
}

fn doc_prefix(name: &DocName) -> String {
	format!("{}{FIELD_SEP}", name.as_str())
}

/// redb-backed implementation of `docsync_types::DurableStore`.
///
/// redb transactions are synchronous; a `tokio::sync::Mutex` around the
/// single shared `Database` handle serializes writers the way the spec's
/// "transactional key/value store" abstraction expects, while still
/// letting each document's coordinator actor `await` the call like any
/// other suspension point.
pub struct RedbDurableStore {
	db: Arc<Mutex<redb::Database>>,
}

impl RedbDurableStore {
	pub async fn open(path: impl AsRef<Path>) -> DocResult<Self> {
		let path: PathBuf = path.as_ref().to_path_buf();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.map_err(|e| Error::IoError(format!("failed to create storage directory: {e}")))?;
		}

		let db = redb::Database::create(&path)
			.map_err(|e| Error::DbError(format!("failed to open database at {path:?}: {e}")))?;

		let tx = db
			.begin_write()
			.map_err(|e| Error::DbError(format!("failed to begin write transaction: {e}")))?;
		let _ = tx
			.open_table(TABLE_RECORDS)
			.map_err(|e| Error::DbError(format!("failed to open records table: {e}")))?;
		tx.commit().map_err(|e| Error::DbError(format!("failed to commit table creation: {e}")))?;

		tracing::debug!("opened durable store at {:?}", path);
		Ok(RedbDurableStore { db: Arc::new(Mutex::new(db)) })
	}

	/// §4.2 `list()`: every field currently stored for `name`.
	fn list_fields(db: &redb::Database, name: &DocName) -> Result<BTreeMap<String, Vec<u8>>, Error> {
		let tx = db
			.begin_read()
			.map_err(|e| Error::DbError(format!("failed to begin read transaction: {e}")))?;
		let table = tx
			.open_table(TABLE_RECORDS)
			.map_err(|e| Error::DbError(format!("failed to open records table: {e}")))?;

		let prefix = doc_prefix(name);
		let mut fields = BTreeMap::new();
		let range = table
			.range(prefix.as_str()..)
			.map_err(|e| Error::DbError(format!("failed to range records: {e}")))?;

		for item in range {
			let (key, value) = item.map_err(|e| Error::DbError(format!("failed to iterate records: {e}")))?;
			let key_str = key.value();
			let Some(field) = key_str.strip_prefix(&prefix) else {
				break;
			};
			fields.insert(field.to_string(), value.value().to_vec());
		}

		Ok(fields)
	}

	/// §4.2 `deleteAll()`.
	fn delete_all(db: &redb::Database, name: &DocName) -> Result<(), Error> {
		let tx = db
			.begin_write()
			.map_err(|e| Error::DbError(format!("failed to begin write transaction: {e}")))?;

		{
			let mut table = tx
				.open_table(TABLE_RECORDS)
				.map_err(|e| Error::DbError(format!("failed to open records table: {e}")))?;

			let prefix = doc_prefix(name);
			let keys_to_delete: Vec<String> = {
				let range = table
					.range(prefix.as_str()..)
					.map_err(|e| Error::DbError(format!("failed to range records: {e}")))?;
				let mut keys = Vec::new();
				for item in range {
					let (key, _) = item.map_err(|e| Error::DbError(format!("failed to iterate records: {e}")))?;
					let key_str = key.value();
					if !key_str.starts_with(&prefix) {
						break;
					}
					keys.push(key_str.to_string());
				}
				keys
			};

			for key in keys_to_delete {
				table
					.remove(key.as_str())
					.map_err(|e| Error::DbError(format!("failed to delete record field: {e}")))?;
			}
		}

		tx.commit().map_err(|e| Error::DbError(format!("failed to commit deletion: {e}")))?;
		Ok(())
	}

	/// §4.2 `put(object)`.
	fn put_record(db: &redb::Database, name: &DocName, record: &Record) -> Result<(), Error> {
		let tx = db
			.begin_write()
			.map_err(|e| Error::DbError(format!("failed to begin write transaction: {e}")))?;

		{
			let mut table = tx
				.open_table(TABLE_RECORDS)
				.map_err(|e| Error::DbError(format!("failed to open records table: {e}")))?;

			table
				.insert(doc_key(name, "doc").as_str(), record.doc.as_bytes())
				.map_err(|e| Error::DbError(format!("failed to insert doc field: {e}")))?;

			match &record.payload {
				Payload::Inline(bytes) => {
					table
						.insert(doc_key(name, "docstore").as_str(), bytes.as_slice())
						.map_err(|e| Error::DbError(format!("failed to insert docstore field: {e}")))?;
				}
				Payload::Chunked(chunks) => {
					table
						.insert(doc_key(name, "chunks").as_str(), (chunks.len() as u64).to_le_bytes().as_slice())
						.map_err(|e| Error::DbError(format!("failed to insert chunks field: {e}")))?;
					for (i, chunk) in chunks.iter().enumerate() {
						table
							.insert(doc_key(name, &format!("chunk_{i}")).as_str(), chunk.as_slice())
							.map_err(|e| Error::DbError(format!("failed to insert chunk_{i}: {e}")))?;
					}
				}
			}
		}

		tx.commit().map_err(|e| Error::DbError(format!("failed to commit record: {e}")))?;
		Ok(())
	}

	fn record_from_fields(fields: &BTreeMap<String, Vec<u8>>) -> Option<Record> {
		let doc_bytes = fields.get("doc")?;
		let doc = String::from_utf8_lossy(doc_bytes).into_owned();

		if let Some(inline) = fields.get("docstore") {
			return Some(Record { doc, payload: Payload::Inline(inline.clone()) });
		}

		let chunks_bytes = fields.get("chunks")?;
		let count = u64::from_le_bytes(chunks_bytes.as_slice().try_into().ok()?) as usize;
		let mut chunks = Vec::with_capacity(count);
		for i in 0..count {
			chunks.push(fields.get(&format!("chunk_{i}"))?.clone());
		}
		Some(Record { doc, payload: Payload::Chunked(chunks) })
	}
}

#[async_trait::async_trait]
impl docsync_types::DurableStore for RedbDurableStore {
	async fn read(&self, name: &DocName) -> DocResult<Option<Vec<u8>>> {
		let db = self.db.lock().await;
		let fields = Self::list_fields(&db, name)?;
		let record = Self::record_from_fields(&fields);

		match chunk::decode(name, record) {
			Ok(state) => Ok(state),
			Err(docsync_types::Error::StorageStale) => {
				tracing::warn!("discarding stale durable record for {}", name);
				Self::delete_all(&db, name)?;
				Ok(None)
			}
			Err(other) => Err(other),
		}
	}

	async fn write(&self, name: &DocName, state: &[u8]) -> DocResult<()> {
		let record = chunk::encode_default(name, state)?;
		let db = self.db.lock().await;
		Self::delete_all(&db, name)?;
		Self::put_record(&db, name, &record)?;
		Ok(())
	}
}

impl std::fmt::Debug for RedbDurableStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RedbDurableStore").finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use docsync_types::DurableStore;

	async fn create_test_store() -> (RedbDurableStore, tempfile::TempDir) {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = RedbDurableStore::open(dir.path().join("docsync.db")).await.expect("open store");
		(store, dir)
	}

	#[tokio::test]
	async fn round_trips_small_state() {
		let (store, _dir) = create_test_store().await;
		let name = DocName::new("doc-a");

		store.write(&name, b"hello world").await.expect("write");
		let read = store.read(&name).await.expect("read");
		assert_eq!(read, Some(b"hello world".to_vec()));
	}

	#[tokio::test]
	async fn round_trips_chunked_state() {
		let (store, _dir) = create_test_store().await;
		let name = DocName::new("doc-big");
		let state = vec![7u8; docsync_types::limits::MAX_VALUE * 3 + 17];

		store.write(&name, &state).await.expect("write");
		let read = store.read(&name).await.expect("read");
		assert_eq!(read, Some(state));
	}

	#[tokio::test]
	async fn missing_document_reads_as_none() {
		let (store, _dir) = create_test_store().await;
		let name = DocName::new("never-written");
		assert_eq!(store.read(&name).await.expect("read"), None);
	}

	#[tokio::test]
	async fn stale_record_is_discarded_on_read() {
		let (store, _dir) = create_test_store().await;
		let name = DocName::new("slot");

		// Write a record whose `doc` tag doesn't match the slot it's stored
		// under, as if the name previously bound to this slot changed.
		{
			let db = store.db.lock().await;
			let stale = Record { doc: "someone-else".to_string(), payload: Payload::Inline(b"ghost".to_vec()) };
			RedbDurableStore::put_record(&db, &name, &stale).expect("put stale");
		}

		let read = store.read(&name).await.expect("read");
		assert_eq!(read, None, "stale record must be discarded, not returned");

		// P6: the slot is now empty, not just masked.
		let db = store.db.lock().await;
		let fields = RedbDurableStore::list_fields(&db, &name).expect("list");
		assert!(fields.is_empty());
	}

	#[tokio::test]
	async fn second_write_overwrites_first_without_mixing_fields() {
		let (store, _dir) = create_test_store().await;
		let name = DocName::new("doc-a");

		let big = vec![1u8; docsync_types::limits::MAX_VALUE + 10];
		store.write(&name, &big).await.expect("write chunked");
		store.write(&name, b"small now").await.expect("write inline");

		let read = store.read(&name).await.expect("read");
		assert_eq!(read, Some(b"small now".to_vec()));
	}
}

// vim: ts=4
