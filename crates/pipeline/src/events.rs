//! Per-document outcomes broadcast by the scheduler.

use regen_primitives::{DocumentKey, VersionStamp};

use crate::error::GenerationError;

/// Outcome of regenerating one document during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerationEvent {
	/// Output is installed; `output_version` is the entry's output version afterwards.
	Completed { key: DocumentKey, output_version: VersionStamp },
	/// The generator failed. The run continues with the next document.
	Failed { key: DocumentKey, error: GenerationError },
}

impl RegenerationEvent {
	pub fn key(&self) -> &DocumentKey {
		match self {
			Self::Completed { key, .. } | Self::Failed { key, .. } => key,
		}
	}

	pub fn is_failure(&self) -> bool {
		matches!(self, Self::Failed { .. })
	}
}
