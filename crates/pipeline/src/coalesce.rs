//! Per-document notification coalescing.
//!
//! A burst of edits to one document collapses into a single pending entry
//! holding the latest handle. Iteration order is first-notification order,
//! which keeps runs deterministic.

use indexmap::IndexMap;
use regen_primitives::{DocumentKey, ProjectKey};

use crate::document::DocumentHandle;

/// Workload captured at the start of a run. Immutable once taken.
pub type PendingWorkload = IndexMap<DocumentKey, DocumentHandle>;

/// Insertion-ordered map from document key to its most recent handle.
#[derive(Debug, Default)]
pub struct NotificationCoalescer {
	pending: PendingWorkload,
}

impl NotificationCoalescer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `document`, replacing any earlier handle for the same key.
	///
	/// Returns true if the key was not pending before.
	pub fn insert(&mut self, document: DocumentHandle) -> bool {
		self.pending.insert(document.key().clone(), document).is_none()
	}

	/// Captures the pending map and leaves the coalescer empty.
	pub fn take(&mut self) -> PendingWorkload {
		std::mem::take(&mut self.pending)
	}

	pub fn remove(&mut self, key: &DocumentKey) -> Option<DocumentHandle> {
		self.pending.shift_remove(key)
	}

	/// Drops every pending entry belonging to `project`.
	pub fn remove_project(&mut self, project: &ProjectKey) -> usize {
		let before = self.pending.len();
		self.pending.retain(|key, _| key.project() != project);
		before - self.pending.len()
	}

	pub fn get(&self, key: &DocumentKey) -> Option<&DocumentHandle> {
		self.pending.get(key)
	}

	pub fn contains(&self, key: &DocumentKey) -> bool {
		self.pending.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}
}
