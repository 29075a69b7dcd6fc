//! Error types for the regeneration pipeline.

use std::path::PathBuf;

use regen_primitives::DocumentKey;
use thiserror::Error;

/// Failure of the external generation function for one document.
///
/// Cloneable because a single computation's outcome is shared with every
/// caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
	/// The generator reported an error.
	#[error("generation failed for {path}: {message}")]
	Failed {
		/// Source document path.
		path: PathBuf,
		/// Generator-provided description.
		message: String,
	},

	/// The generator panicked.
	#[error("generator panicked for {path}: {message}")]
	Panicked {
		/// Source document path.
		path: PathBuf,
		/// Panic payload, when it was a string.
		message: String,
	},

	/// The computation task ended without reporting a result.
	#[error("generation for {path} was interrupted")]
	Interrupted {
		/// Source document path.
		path: PathBuf,
	},
}

impl GenerationError {
	/// Builds a [`GenerationError::Failed`] for `key`.
	pub fn failed(key: &DocumentKey, message: impl Into<String>) -> Self {
		Self::Failed {
			path: key.path().to_path_buf(),
			message: message.into(),
		}
	}
}

/// Errors from [`crate::BackgroundGenerator::request_artifact_text`].
#[derive(Debug, Clone, Error)]
pub enum TextLoadError {
	/// The project no longer contains the document.
	#[error("document not found: {0}")]
	DocumentNotFound(DocumentKey),

	/// Generating the artifact failed.
	#[error(transparent)]
	Generation(#[from] GenerationError),

	/// The background generator has shut down.
	#[error("background generator is shut down")]
	SchedulerClosed,
}

/// Errors from querying a stopped scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
	/// The scheduler actor has shut down.
	#[error("background generator is shut down")]
	Closed,
}
