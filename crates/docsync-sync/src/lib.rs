//! Shared-document registry, session frame protocol, and per-document
//! coordinator actor (C4 §4.4, C5 §4.5, C6 §4.6), built directly on `yrs`.
//!
//! The only process-wide state is [`registry::Registry`]; everything else
//! (sessions, awareness, the CRDT `Doc`) lives inside one actor task per
//! document (§5 "single-threaded cooperative" scheduling model), reached
//! only through a [`coordinator::DocumentHandle`].

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

mod admin;
mod awareness;
mod coordinator;
mod debounce;
mod frame;
pub mod prelude;
mod registry;
mod session;

pub use admin::{invalidate, InvalidationOutcome};
pub use awareness::{AwarenessDiff, AwarenessState, AwarenessUpdate};
pub use coordinator::DocumentHandle;
pub use frame::{decode_frame, encode_frame, Frame, SyncMessage};
pub use registry::Registry;
pub use session::{ReadyState, Session, SessionId, SessionSink};

/// §4.6 "bindState ... firstSession": the session that triggers document
/// creation is always assigned this id, so a caller that just created the
/// document (rather than attaching to an existing one) never has to wait
/// on the actor to learn its own session id.
pub const FIRST_SESSION_ID: SessionId = 1;

// vim: ts=4
