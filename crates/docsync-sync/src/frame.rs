//! Wire framing for C5 (§4.5). Every frame begins with a var-uint `type`;
//! sync frames carry a second var-uint sub-type (step1/step2/update)
//! followed by a length-prefixed payload. Awareness frames carry one
//! length-prefixed payload understood by [`crate::awareness`].
//!
//! No `y-sync` dependency: the sync sub-protocol only needs `yrs`'s own
//! state-vector/update primitives, and those are what `SyncMessage`
//! encodes/decodes here directly.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use docsync_types::{DocResult, Error};

const FRAME_SYNC: u64 = 0;
const FRAME_AWARENESS: u64 = 1;

const SYNC_STEP1: u64 = 0;
const SYNC_STEP2: u64 = 1;
const SYNC_UPDATE: u64 = 2;

/// A decoded frame body (§4.5 "Framing").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	Sync(SyncMessage),
	Awareness(Vec<u8>),
}

/// The CRDT engine's standard sync sub-messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
	/// Step 1: the sender's state vector.
	Step1(Vec<u8>),
	/// Step 2: an update computed against a peer's state vector.
	Step2(Vec<u8>),
	/// An update broadcast outside the initial handshake.
	Update(Vec<u8>),
}

pub fn encode_frame(frame: &Frame) -> Bytes {
	let mut buf = BytesMut::new();
	match frame {
		Frame::Sync(msg) => {
			write_varu64(&mut buf, FRAME_SYNC);
			let (sub, payload) = match msg {
				SyncMessage::Step1(sv) => (SYNC_STEP1, sv),
				SyncMessage::Step2(update) => (SYNC_STEP2, update),
				SyncMessage::Update(update) => (SYNC_UPDATE, update),
			};
			write_varu64(&mut buf, sub);
			write_var_buf(&mut buf, payload);
		}
		Frame::Awareness(payload) => {
			write_varu64(&mut buf, FRAME_AWARENESS);
			write_var_buf(&mut buf, payload);
		}
	}
	buf.freeze()
}

pub fn decode_frame(bytes: &[u8]) -> DocResult<Frame> {
	let mut buf = bytes;
	let kind = read_varu64(&mut buf)?;
	match kind {
		FRAME_SYNC => {
			let sub = read_varu64(&mut buf)?;
			let payload = read_var_buf(&mut buf)?;
			let msg = match sub {
				SYNC_STEP1 => SyncMessage::Step1(payload),
				SYNC_STEP2 => SyncMessage::Step2(payload),
				SYNC_UPDATE => SyncMessage::Update(payload),
				other => return Err(Error::CodecError(format!("unknown sync sub-type {other}"))),
			};
			Ok(Frame::Sync(msg))
		}
		FRAME_AWARENESS => Ok(Frame::Awareness(read_var_buf(&mut buf)?)),
		other => Err(Error::CodecError(format!("unknown frame type {other}"))),
	}
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

fn write_var_buf(buf: &mut BytesMut, payload: &[u8]) {
	write_varu64(buf, payload.len() as u64);
	buf.put_slice(payload);
}

fn read_var_buf(buf: &mut &[u8]) -> DocResult<Vec<u8>> {
	let len = read_varu64(buf)? as usize;
	if buf.remaining() < len {
		return Err(Error::CodecError("truncated frame payload".to_string()));
	}
	let payload = buf[..len].to_vec();
	buf.advance(len);
	Ok(payload)
}


// vim: ts=4
