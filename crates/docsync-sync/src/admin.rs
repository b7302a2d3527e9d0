//! Admin invalidation (C7, §4.7). Both external signals the spec names —
//! `syncAdmin` and `deleteAdmin` — resolve to exactly the same operation
//! here: force-close every session for the named document, which by I3
//! removes it from the registry so the next opener rebinds from the
//! authoritative content store.

use docsync_types::DocName;

use crate::registry::Registry;

/// Whether the named document was live when the signal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOutcome {
	Found,
	NotFound,
}

/// §6 "`syncAdmin(name)` → 200 if document was live, 404 otherwise" and
/// "`deleteAdmin(name)` → 204 if live, 404 otherwise" — the status-code
/// mapping is the `server` crate's concern; this just reports liveness.
pub fn invalidate(registry: &Registry, name: &DocName) -> InvalidationOutcome {
	match registry.lookup(name) {
		Some(handle) if handle.admin_invalidate() => InvalidationOutcome::Found,
		_ => InvalidationOutcome::NotFound,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn invalidating_an_unknown_document_is_not_found() {
		let registry = Registry::new();
		let name = DocName::new("https://store.example/doc-a");
		assert_eq!(invalidate(&registry, &name), InvalidationOutcome::NotFound);
	}
}

// vim: ts=4
