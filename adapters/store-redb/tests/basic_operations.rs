//! Black-box integration tests for `RedbDurableStore` against the public
//! `DurableStore` trait (§4.2), covering the same ground as `src/lib.rs`'s
//! unit tests but through a fresh `TempDir`-backed database per test, the
//! way an out-of-process caller would use this adapter.

use docsync_types::{DocName, DurableStore, Error};
use docsync_store_redb::RedbDurableStore;
use tempfile::TempDir;

async fn create_test_store() -> (RedbDurableStore, TempDir) {
	let temp_dir = TempDir::new().expect("failed to create temp directory");
	let store = RedbDurableStore::open(temp_dir.path().join("docsync.db")).await.expect("failed to open store");
	(store, temp_dir)
}

#[tokio::test]
async fn reading_a_document_that_was_never_written_is_none() {
	let (store, _temp) = create_test_store().await;
	let name = DocName::new("doc-nonexistent");

	let read = store.read(&name).await.expect("read should not error");
	assert_eq!(read, None);
}

#[tokio::test]
async fn small_state_round_trips() {
	let (store, _temp) = create_test_store().await;
	let name = DocName::new("doc1");
	let state = vec![0x01, 0x02, 0x03];

	store.write(&name, &state).await.expect("write should succeed");
	let read = store.read(&name).await.expect("read should succeed");
	assert_eq!(read, Some(state));
}

#[tokio::test]
async fn repeated_writes_to_the_same_document_overwrite_rather_than_accumulate() {
	let (store, _temp) = create_test_store().await;
	let name = DocName::new("doc2");

	for i in 1..=3u8 {
		store.write(&name, &[i]).await.expect("write should succeed");
	}

	let read = store.read(&name).await.expect("read should succeed");
	assert_eq!(read, Some(vec![3]), "§4.2 write always deleteAll()s before put(), so only the last write survives");
}

#[tokio::test]
async fn distinct_documents_do_not_cross_contaminate() {
	let (store, _temp) = create_test_store().await;
	let doc_a = DocName::new("shared-name-space-a");
	let doc_b = DocName::new("shared-name-space-b");

	store.write(&doc_a, &[0x11]).await.expect("write a");
	store.write(&doc_b, &[0x22]).await.expect("write b");

	assert_eq!(store.read(&doc_a).await.expect("read a"), Some(vec![0x11]));
	assert_eq!(store.read(&doc_b).await.expect("read b"), Some(vec![0x22]));
}

#[tokio::test]
async fn large_state_round_trips_across_many_chunks() {
	let (store, _temp) = create_test_store().await;
	let name = DocName::new("large-doc");
	let large_state = vec![0xAB; 300 * 1024];

	store.write(&name, &large_state).await.expect("write should succeed");
	let read = store.read(&name).await.expect("read should succeed");
	assert_eq!(read, Some(large_state));
}

#[tokio::test]
async fn a_document_that_would_need_too_many_chunks_overflows() {
	let (store, _temp) = create_test_store().await;
	let name = DocName::new("impossibly-large-doc");
	// §4.2 MAX_VALUE=131072, MAX_KEYS=128: anything at or above MAX_VALUE *
	// MAX_KEYS bytes needs chunks >= MAX_KEYS and must fail.
	let oversized = vec![0u8; docsync_types::limits::MAX_VALUE * docsync_types::limits::MAX_KEYS];

	let err = store.write(&name, &oversized).await.expect_err("oversized write must fail");
	assert!(matches!(err, Error::StorageOverflow { .. }));
}
