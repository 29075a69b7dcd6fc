//! Document snapshots and project context.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use regen_primitives::{DocumentKey, ProjectKey, Rope, VersionStamp};

use crate::artifact::ArtifactGenerator;
use crate::cache::{CachedOutput, VersionedOutputCache};
use crate::error::GenerationError;

/// Project-wide context handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
	key: ProjectKey,
	root_namespace: Option<String>,
}

impl ProjectContext {
	pub fn new(key: ProjectKey) -> Self {
		Self { key, root_namespace: None }
	}

	#[must_use]
	pub fn with_root_namespace(mut self, root_namespace: impl Into<String>) -> Self {
		self.root_namespace = Some(root_namespace.into());
		self
	}

	pub fn key(&self) -> &ProjectKey {
		&self.key
	}

	pub fn root_namespace(&self) -> Option<&str> {
		self.root_namespace.as_deref()
	}
}

struct HandleInner {
	key: DocumentKey,
	text: Rope,
	version: VersionStamp,
	project: Arc<ProjectContext>,
	output: VersionedOutputCache,
}

/// Immutable snapshot of a document's text at one version.
///
/// Edits never mutate a handle; [`Self::with_text`] produces a replacement
/// with a newer [`VersionStamp`]. All handles of one document share a single
/// [`VersionedOutputCache`], which belongs to the document identity rather
/// than to any snapshot.
#[derive(Clone)]
pub struct DocumentHandle {
	inner: Arc<HandleInner>,
}

impl DocumentHandle {
	/// Creates the first snapshot of a new document identity.
	pub fn new(project: Arc<ProjectContext>, path: impl Into<PathBuf>, text: Rope) -> Self {
		Self {
			inner: Arc::new(HandleInner {
				key: DocumentKey::new(project.key().clone(), path),
				text,
				version: VersionStamp::next(),
				project,
				output: VersionedOutputCache::new(),
			}),
		}
	}

	/// Returns a replacement snapshot carrying `text` and a newer version.
	#[must_use]
	pub fn with_text(&self, text: Rope) -> Self {
		self.derive(text, Arc::clone(&self.inner.project))
	}

	/// Returns a replacement snapshot bound to an updated project context.
	#[must_use]
	pub fn with_project(&self, project: Arc<ProjectContext>) -> Self {
		self.derive(self.inner.text.clone(), project)
	}

	fn derive(&self, text: Rope, project: Arc<ProjectContext>) -> Self {
		Self {
			inner: Arc::new(HandleInner {
				key: self.inner.key.clone(),
				text,
				version: self.inner.version.newer(),
				project,
				output: self.inner.output.clone(),
			}),
		}
	}

	pub fn key(&self) -> &DocumentKey {
		&self.inner.key
	}

	pub fn text(&self) -> &Rope {
		&self.inner.text
	}

	pub fn version(&self) -> VersionStamp {
		self.inner.version
	}

	pub fn project(&self) -> &Arc<ProjectContext> {
		&self.inner.project
	}

	/// Per-document output cache shared by every snapshot of this document.
	pub fn output(&self) -> &VersionedOutputCache {
		&self.inner.output
	}

	/// Returns the generated output for this snapshot, computing it if needed.
	pub async fn generated_output(&self, generator: &Arc<dyn ArtifactGenerator>) -> Result<CachedOutput, GenerationError> {
		self.inner.output.get_or_compute(self, generator).await
	}

	/// Returns true if both handles are the same snapshot.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for DocumentHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentHandle")
			.field("key", &self.inner.key)
			.field("version", &self.inner.version)
			.field("len_bytes", &self.inner.text.len_bytes())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn project() -> Arc<ProjectContext> {
		Arc::new(ProjectContext::new(ProjectKey::new("/app/app.proj")).with_root_namespace("App"))
	}

	#[test]
	fn with_text_is_newer_and_shares_cache() {
		let first = DocumentHandle::new(project(), "/app/Index.page", Rope::from("<p>Hello</p>"));
		let second = first.with_text(Rope::from("<p>Bye</p>"));

		assert_eq!(first.key(), second.key());
		assert!(second.version() > first.version());
		assert!(!first.ptr_eq(&second));
		assert!(first.output().same_entry(second.output()));
		assert_eq!(first.text().to_string(), "<p>Hello</p>");
		assert_eq!(second.text().to_string(), "<p>Bye</p>");
	}

	#[test]
	fn distinct_documents_have_distinct_caches() {
		let a = DocumentHandle::new(project(), "/app/A.page", Rope::new());
		let b = DocumentHandle::new(project(), "/app/B.page", Rope::new());
		assert!(!a.output().same_entry(b.output()));
	}

	#[test]
	fn with_project_rebinds_context() {
		let doc = DocumentHandle::new(project(), "/app/A.page", Rope::from("x"));
		let ctx = Arc::new(ProjectContext::new(ProjectKey::new("/app/app.proj")).with_root_namespace("Renamed"));
		let rebound = doc.with_project(ctx);
		assert_eq!(rebound.project().root_namespace(), Some("Renamed"));
		assert!(rebound.version() > doc.version());
		assert_eq!(rebound.text().to_string(), "x");
	}
}
