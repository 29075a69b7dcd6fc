//! Project model seam and the in-memory [`Workspace`] implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use regen_primitives::{DocumentKey, ProjectKey, Rope};
use tokio::sync::broadcast;

use crate::artifact::ArtifactGenerator;
use crate::document::{DocumentHandle, ProjectContext};

/// Read access to the current state of every project.
pub trait ProjectModel: Send + Sync + 'static {
	/// Returns the current snapshot of `key`, or `None` if it no longer exists.
	fn resolve_current_document(&self, key: &DocumentKey) -> Option<DocumentHandle>;

	/// Returns the current snapshots of every document in `project`.
	fn documents(&self, project: &ProjectKey) -> Vec<DocumentHandle>;

	/// Generator used for every document of this model.
	fn generator(&self) -> Arc<dyn ArtifactGenerator>;
}

/// Change notification published by [`Workspace`].
#[derive(Debug, Clone)]
pub enum ProjectChange {
	ProjectAdded(ProjectKey),
	ProjectChanged(ProjectKey),
	ProjectRemoved(ProjectKey),
	DocumentAdded(DocumentHandle),
	DocumentChanged(DocumentHandle),
	DocumentRemoved(DocumentKey),
}

struct ProjectEntry {
	context: Arc<ProjectContext>,
	documents: IndexMap<PathBuf, DocumentHandle>,
}

const CHANGE_BUFFER: usize = 1024;

/// In-memory project model.
///
/// Mutations publish a [`ProjectChange`] after the write lock is released.
pub struct Workspace {
	projects: RwLock<IndexMap<ProjectKey, ProjectEntry>>,
	changes: broadcast::Sender<ProjectChange>,
	generator: Arc<dyn ArtifactGenerator>,
}

impl Workspace {
	pub fn new(generator: Arc<dyn ArtifactGenerator>) -> Self {
		Self {
			projects: RwLock::new(IndexMap::new()),
			changes: broadcast::channel(CHANGE_BUFFER).0,
			generator,
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ProjectChange> {
		self.changes.subscribe()
	}

	fn publish(&self, change: ProjectChange) {
		tracing::trace!(?change, "regen.workspace.change");
		// No subscribers is fine.
		let _ = self.changes.send(change);
	}

	/// Adds `context` as a new project, replacing nothing if it already exists.
	///
	/// Returns false if a project with the same key was already present.
	pub fn add_project(&self, context: ProjectContext) -> bool {
		let key = context.key().clone();
		{
			let mut projects = self.projects.write();
			if projects.contains_key(&key) {
				return false;
			}
			projects.insert(
				key.clone(),
				ProjectEntry {
					context: Arc::new(context),
					documents: IndexMap::new(),
				},
			);
		}
		self.publish(ProjectChange::ProjectAdded(key));
		true
	}

	/// Replaces a project's context and rebinds every document to it.
	pub fn update_project(&self, context: ProjectContext) -> bool {
		let key = context.key().clone();
		{
			let mut projects = self.projects.write();
			let Some(entry) = projects.get_mut(&key) else {
				return false;
			};
			entry.context = Arc::new(context);
			for handle in entry.documents.values_mut() {
				*handle = handle.with_project(Arc::clone(&entry.context));
			}
		}
		self.publish(ProjectChange::ProjectChanged(key));
		true
	}

	/// Removes a project and drops the cached output of its documents.
	pub fn remove_project(&self, key: &ProjectKey) -> bool {
		let Some(entry) = self.projects.write().shift_remove(key) else {
			return false;
		};
		for handle in entry.documents.values() {
			handle.output().clear();
		}
		self.publish(ProjectChange::ProjectRemoved(key.clone()));
		true
	}

	/// Adds a document to `project`. Returns `None` if the project is unknown.
	///
	/// Adding an existing path replaces its text like [`Self::update_text`].
	pub fn add_document(&self, project: &ProjectKey, path: impl Into<PathBuf>, text: Rope) -> Option<DocumentHandle> {
		let path = path.into();
		let (handle, existed) = {
			let mut projects = self.projects.write();
			let entry = projects.get_mut(project)?;
			match entry.documents.get(&path) {
				Some(current) => {
					let handle = current.with_text(text);
					entry.documents.insert(path, handle.clone());
					(handle, true)
				}
				None => {
					let handle = DocumentHandle::new(Arc::clone(&entry.context), path.clone(), text);
					entry.documents.insert(path, handle.clone());
					(handle, false)
				}
			}
		};
		self.publish(if existed {
			ProjectChange::DocumentChanged(handle.clone())
		} else {
			ProjectChange::DocumentAdded(handle.clone())
		});
		Some(handle)
	}

	/// Replaces a document's text, producing a newer snapshot.
	pub fn update_text(&self, key: &DocumentKey, text: Rope) -> Option<DocumentHandle> {
		let handle = {
			let mut projects = self.projects.write();
			let slot = projects.get_mut(key.project())?.documents.get_mut(key.path())?;
			*slot = slot.with_text(text);
			slot.clone()
		};
		self.publish(ProjectChange::DocumentChanged(handle.clone()));
		Some(handle)
	}

	/// Removes a document and drops its cached output.
	pub fn remove_document(&self, key: &DocumentKey) -> bool {
		let removed = {
			let mut projects = self.projects.write();
			projects.get_mut(key.project()).and_then(|entry| entry.documents.shift_remove(key.path()))
		};
		let Some(handle) = removed else {
			return false;
		};
		handle.output().clear();
		self.publish(ProjectChange::DocumentRemoved(key.clone()));
		true
	}

	pub fn document(&self, project: &ProjectKey, path: &Path) -> Option<DocumentHandle> {
		self.projects.read().get(project)?.documents.get(path).cloned()
	}

	pub fn project(&self, key: &ProjectKey) -> Option<Arc<ProjectContext>> {
		self.projects.read().get(key).map(|entry| Arc::clone(&entry.context))
	}
}

impl ProjectModel for Workspace {
	fn resolve_current_document(&self, key: &DocumentKey) -> Option<DocumentHandle> {
		self.document(key.project(), key.path())
	}

	fn documents(&self, project: &ProjectKey) -> Vec<DocumentHandle> {
		self.projects
			.read()
			.get(project)
			.map(|entry| entry.documents.values().cloned().collect())
			.unwrap_or_default()
	}

	fn generator(&self) -> Arc<dyn ArtifactGenerator> {
		Arc::clone(&self.generator)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::test_support::{TestGenerator, as_dyn};

	fn workspace() -> (Workspace, ProjectKey) {
		let ws = Workspace::new(as_dyn(&TestGenerator::new()));
		let key = ProjectKey::new("/app/app.proj");
		assert!(ws.add_project(ProjectContext::new(key.clone()).with_root_namespace("App")));
		(ws, key)
	}

	#[test]
	fn publishes_document_lifecycle() {
		let (ws, project) = workspace();
		let mut rx = ws.subscribe();

		let added = ws.add_document(&project, "/app/A.page", Rope::from("a")).unwrap();
		let changed = ws.update_text(added.key(), Rope::from("b")).unwrap();
		assert!(ws.remove_document(added.key()));
		assert!(!ws.remove_document(added.key()));

		assert!(matches!(rx.try_recv().unwrap(), ProjectChange::DocumentAdded(h) if h.ptr_eq(&added)));
		assert!(matches!(rx.try_recv().unwrap(), ProjectChange::DocumentChanged(h) if h.ptr_eq(&changed)));
		assert!(matches!(rx.try_recv().unwrap(), ProjectChange::DocumentRemoved(k) if &k == added.key()));
		assert!(ws.resolve_current_document(added.key()).is_none());
	}

	#[test]
	fn resolve_returns_latest_snapshot() {
		let (ws, project) = workspace();
		let first = ws.add_document(&project, "/app/A.page", Rope::from("a")).unwrap();
		let second = ws.update_text(first.key(), Rope::from("b")).unwrap();

		let current = ws.resolve_current_document(first.key()).unwrap();
		assert!(current.ptr_eq(&second));
		assert!(current.output().same_entry(first.output()));
	}

	#[test]
	fn update_project_rebinds_documents() {
		let (ws, project) = workspace();
		let doc = ws.add_document(&project, "/app/A.page", Rope::from("a")).unwrap();

		assert!(ws.update_project(ProjectContext::new(project.clone()).with_root_namespace("Renamed")));
		let rebound = ws.resolve_current_document(doc.key()).unwrap();
		assert_eq!(rebound.project().root_namespace(), Some("Renamed"));
		assert!(rebound.version() > doc.version());
	}

	#[test]
	fn documents_lists_in_insertion_order() {
		let (ws, project) = workspace();
		ws.add_document(&project, "/app/B.page", Rope::new());
		ws.add_document(&project, "/app/A.page", Rope::new());

		let paths: Vec<_> = ws.documents(&project).iter().map(|d| d.key().path().to_path_buf()).collect();
		assert_eq!(paths, vec![PathBuf::from("/app/B.page"), PathBuf::from("/app/A.page")]);
		assert!(ws.documents(&ProjectKey::new("/other.proj")).is_empty());
	}

	#[test]
	fn unknown_project_rejects_documents() {
		let (ws, _) = workspace();
		assert!(ws.add_document(&ProjectKey::new("/nope.proj"), "/nope/A.page", Rope::new()).is_none());
		assert!(!ws.remove_project(&ProjectKey::new("/nope.proj")));
	}
}
