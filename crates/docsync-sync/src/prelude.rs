pub use crate::{DocumentHandle, Registry, ReadyState, Session, SessionId, SessionSink, FIRST_SESSION_ID};
pub use docsync_types::prelude::*;

// vim: ts=4
