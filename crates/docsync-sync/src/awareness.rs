//! Awareness state (§3 "Awareness entry"): a client-id → JSON mapping kept
//! natively here rather than through `y-sync`'s `Awareness` type (see
//! `DESIGN.md` for why that dependency was dropped). The wire format is a
//! flat list of `(client_id, Option<json>)` entries; `None` means the
//! entry was removed.

use std::collections::HashMap;

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;

use docsync_types::{ClientId, DocResult, Error};

/// One awareness frame's worth of entries as decoded off the wire, or as
/// about to be put on it. `None` marks a removal.
pub type AwarenessUpdate = Vec<(ClientId, Option<Value>)>;

/// The set of client-ids known to the engine (§3), independent of which
/// session controls which ids — that bookkeeping lives in `session.rs`.
#[derive(Debug, Default)]
pub struct AwarenessState {
	states: HashMap<ClientId, Value>,
}

/// Result of applying an update: the union `added ∪ updated ∪ removed`
/// that §4.5 "Broadcast" says to re-encode and fan out, split by kind so
/// the caller can also update per-session controlled-id sets (I2).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AwarenessDiff {
	pub added: Vec<ClientId>,
	pub updated: Vec<ClientId>,
	pub removed: Vec<ClientId>,
}

impl AwarenessDiff {
	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
	}

	pub fn changed_ids(&self) -> Vec<ClientId> {
		self.added.iter().chain(self.updated.iter()).chain(self.removed.iter()).copied().collect()
	}
}

impl AwarenessState {
	pub fn new() -> Self {
		AwarenessState::default()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn ids(&self) -> impl Iterator<Item = &ClientId> {
		self.states.keys()
	}

	/// Applies a decoded update, returning which ids were added, changed,
	/// or removed so the caller can broadcast and update I2 bookkeeping.
	pub fn apply(&mut self, update: AwarenessUpdate) -> AwarenessDiff {
		let mut diff = AwarenessDiff::default();
		for (id, state) in update {
			match state {
				Some(value) => {
					if self.states.insert(id, value).is_some() {
						diff.updated.push(id);
					} else {
						diff.added.push(id);
					}
				}
				None => {
					if self.states.remove(&id).is_some() {
						diff.removed.push(id);
					}
				}
			}
		}
		diff
	}

	/// Removes every id in `ids` (session detach removing its controlled
	/// ids, §4.6 "Session detach").
	pub fn remove_all(&mut self, ids: impl IntoIterator<Item = ClientId>) -> Vec<ClientId> {
		let mut removed = Vec::new();
		for id in ids {
			if self.states.remove(&id).is_some() {
				removed.push(id);
			}
		}
		removed
	}

	/// §4.5 "Outgoing initial exchange" step 2: encode every known
	/// client-id's current state.
	pub fn encode_all(&self) -> Vec<u8> {
		encode_update(self.states.iter().map(|(id, v)| (*id, Some(v.clone()))).collect())
	}

	/// Encodes just the given ids (§4.5 "Broadcast" re-encodes the
	/// changed subset), treating ids no longer present as removals.
	pub fn encode_ids(&self, ids: &[ClientId]) -> Vec<u8> {
		let update: AwarenessUpdate =
			ids.iter().map(|id| (*id, self.states.get(id).cloned())).collect();
		encode_update(update)
	}
}

pub fn encode_update(update: AwarenessUpdate) -> Vec<u8> {
	let mut buf = BytesMut::new();
	write_varu64(&mut buf, update.len() as u64);
	for (id, state) in update {
		write_varu64(&mut buf, id);
		match state {
			Some(value) => {
				buf.put_u8(1);
				let json = serde_json::to_vec(&value).unwrap_or_default();
				write_varu64(&mut buf, json.len() as u64);
				buf.put_slice(&json);
			}
			None => buf.put_u8(0),
		}
	}
	buf.to_vec()
}

pub fn decode_update(bytes: &[u8]) -> DocResult<AwarenessUpdate> {
	let mut buf = bytes;
	let count = read_varu64(&mut buf)?;
	let mut out = Vec::with_capacity(count as usize);
	for _ in 0..count {
		let id = read_varu64(&mut buf)?;
		if !buf.has_remaining() {
			return Err(Error::CodecError("truncated awareness entry".to_string()));
		}
		let present = buf.get_u8();
		let state = match present {
			0 => None,
			1 => {
				let len = read_varu64(&mut buf)? as usize;
				if buf.remaining() < len {
					return Err(Error::CodecError("truncated awareness json".to_string()));
				}
				let json = &buf[..len];
				let value: Value = serde_json::from_slice(json)
					.map_err(|e| Error::CodecError(format!("invalid awareness json: {e}")))?;
				buf.advance(len);
				Some(value)
			}
			other => return Err(Error::CodecError(format!("unknown awareness flag {other}"))),
		};
		out.push((id, state));
	}
	Ok(out)
}

fn write_varu64(buf: &mut BytesMut, mut value: u64) {
	loop {
		let byte = (value & 0x7f) as u8;
		value >>= 7;
		if value == 0 {
			buf.put_u8(byte);
			break;
		}
		buf.put_u8(byte | 0x80);
	}
}

fn read_varu64(buf: &mut &[u8]) -> DocResult<u64> {
	let mut value: u64 = 0;
	let mut shift = 0;
	loop {
		if !buf.has_remaining() {
			return Err(Error::CodecError("truncated varint".to_string()));
		}
		let byte = buf.get_u8();
		value |= ((byte & 0x7f) as u64) << shift;
		if byte & 0x80 == 0 {
			return Ok(value);
		}
		shift += 7;
		if shift >= 64 {
			return Err(Error::CodecError("varint too long".to_string()));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn apply_tracks_added_updated_removed() {
		let mut state = AwarenessState::new();
		let diff = state.apply(vec![(1, Some(json!({"name": "a"})))]);
		assert_eq!(diff.added, vec![1]);

		let diff = state.apply(vec![(1, Some(json!({"name": "b"})))]);
		assert_eq!(diff.updated, vec![1]);

		let diff = state.apply(vec![(1, None)]);
		assert_eq!(diff.removed, vec![1]);
		assert!(state.is_empty());
	}

	#[test]
	fn encode_decode_round_trips() {
		let update: AwarenessUpdate = vec![(7, Some(json!({"cursor": 3}))), (8, None)];
		let bytes = encode_update(update.clone());
		let decoded = decode_update(&bytes).expect("decode");
		assert_eq!(decoded, update);
	}

	#[test]
	fn remove_all_only_reports_ids_that_were_present() {
		let mut state = AwarenessState::new();
		state.apply(vec![(1, Some(json!(1))), (2, Some(json!(2)))]);
		let removed = state.remove_all([1, 3]);
		assert_eq!(removed, vec![1]);
	}
}

// vim: ts=4
