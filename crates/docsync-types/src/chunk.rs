//! Pure chunk-codec logic for C2 (§4.2), independent of any concrete
//! key/value store. A durable-store adapter maps `Record` to its own
//! storage primitives and uses `encode`/`decode` for the splitting and
//! concatenation rules, so P5 (chunk round-trip) and P6 (stale discard)
//! are testable without standing up a database.

use crate::error::{DocResult, Error};
use crate::limits::{MAX_KEYS, MAX_VALUE};
use crate::model::DocName;

/// One durable record as a set of object fields (§4.2 "Layout").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
	pub doc: String,
	pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
	Inline(Vec<u8>),
	Chunked(Vec<Vec<u8>>),
}

/// Splits `state` into a `Record` for `name`, choosing `docstore` for
/// small states and `chunks`/`chunk_N` otherwise. Fails with
/// `StorageOverflow` if the chunk count would reach `MAX_KEYS`.
pub fn encode(name: &DocName, state: &[u8], chunk_size: usize) -> DocResult<Record> {
	if state.len() < chunk_size {
		return Ok(Record { doc: name.as_str().to_string(), payload: Payload::Inline(state.to_vec()) });
	}

	let mut chunks = Vec::with_capacity(state.len().div_ceil(chunk_size));
	for slice in state.chunks(chunk_size) {
		chunks.push(slice.to_vec());
	}

	if chunks.len() >= MAX_KEYS {
		return Err(Error::StorageOverflow { chunks: chunks.len(), max_keys: MAX_KEYS });
	}

	Ok(Record { doc: name.as_str().to_string(), payload: Payload::Chunked(chunks) })
}

pub fn encode_default(name: &DocName, state: &[u8]) -> DocResult<Record> {
	encode(name, state, MAX_VALUE)
}

/// §4.2 read algorithm, given a record already fetched from storage (or
/// `None` for an empty `list()`). Returns `Err(StorageStale)` when `doc`
/// does not match `name`; the caller (the adapter) is responsible for
/// running `deleteAll()` in that case before treating the slot as empty.
pub fn decode(name: &DocName, record: Option<Record>) -> DocResult<Option<Vec<u8>>> {
	let Some(record) = record else {
		return Ok(None);
	};

	if record.doc != name.as_str() {
		return Err(Error::StorageStale);
	}

	match record.payload {
		Payload::Inline(bytes) => Ok(Some(bytes)),
		Payload::Chunked(chunks) => {
			let total: usize = chunks.iter().map(Vec::len).sum();
			let mut out = Vec::with_capacity(total);
			for chunk in chunks {
				out.extend_from_slice(&chunk);
			}
			Ok(Some(out))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn small_state_is_stored_inline() {
		let name = DocName::new("doc-a");
		let record = encode(&name, b"hello", 131_072).expect("encode");
		assert_eq!(record.payload, Payload::Inline(b"hello".to_vec()));
	}

	#[test]
	fn chunked_write_matches_scenario_5() {
		let name = DocName::new("doc-a");
		let state: Vec<u8> = (1..=9).collect();
		let record = encode(&name, &state, 4).expect("encode");
		assert_eq!(
			record.payload,
			Payload::Chunked(vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8], vec![9]])
		);
	}

	#[test]
	fn round_trip_holds_for_any_chunk_size() {
		let name = DocName::new("doc-a");
		for chunk_size in [1usize, 2, 3, 7, 64, 131_072] {
			let state: Vec<u8> = (0..250u32).map(|n| (n % 251) as u8).collect();
			let record = encode(&name, &state, chunk_size).expect("encode");
			let decoded = decode(&name, Some(record)).expect("decode").expect("present");
			assert_eq!(decoded, state, "chunk_size={chunk_size}");
		}
	}

	#[test]
	fn overflow_is_rejected() {
		let name = DocName::new("doc-a");
		let state = vec![0u8; 5000];
		let err = encode(&name, &state, 10).unwrap_err();
		assert!(matches!(err, Error::StorageOverflow { .. }));
	}

	#[test]
	fn stale_record_is_discarded() {
		let other = DocName::new("doc-a");
		let record = Record { doc: "doc-b".to_string(), payload: Payload::Inline(vec![1, 2, 3]) };
		let err = decode(&other, Some(record)).unwrap_err();
		assert!(matches!(err, Error::StorageStale));
	}

	#[test]
	fn missing_record_is_none() {
		let name = DocName::new("doc-a");
		assert_eq!(decode(&name, None).expect("decode"), None);
	}
}

// vim: ts=4
