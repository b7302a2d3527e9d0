//! Chunked durable codec limits (§4.2, §6).

/// Per-value size limit of the underlying key/value store. States at or
/// above this size are split into `chunk_0..chunk_{N-1}` fields.
pub const MAX_VALUE: usize = 131_072;

/// Per-object key limit of the underlying key/value store. A state that
/// would need `chunks >= MAX_KEYS` fails with `Error::StorageOverflow`.
pub const MAX_KEYS: usize = 128;

// vim: ts=4
