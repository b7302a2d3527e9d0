//! Real-time collaborative document server: HTTP surface, websocket
//! transport and process bootstrap around the `docsync-sync` coordinator.
//!
//! This crate is intentionally thin: every piece of the spec's core
//! algorithm (the per-document actor, the CRDT sync protocol, the chunked
//! durable store, the HTML bijection, the content-store client) lives in
//! its own crate and is only wired together here. See `DESIGN.md` for the
//! grounding behind each module.

pub mod admin;
pub mod app;
pub mod config;
pub mod error;
pub mod prelude;
pub mod routes;
pub mod websocket;

pub use app::{App, AppState, Builder};
pub use config::Config;
pub use error::{Error, Result};

// vim: ts=4
