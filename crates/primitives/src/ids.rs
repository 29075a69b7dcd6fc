use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identity of a project, keyed by its project file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey(Arc<Path>);

impl ProjectKey {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self(Arc::from(path.into()))
	}

	/// Project file path.
	pub fn path(&self) -> &Path {
		&self.0
	}
}

impl fmt::Display for ProjectKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.display())
	}
}

/// Stable identity of a document within a project.
///
/// Two projects may include the same file; each inclusion is a distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
	project: ProjectKey,
	path: Arc<Path>,
}

impl DocumentKey {
	pub fn new(project: ProjectKey, path: impl Into<PathBuf>) -> Self {
		Self {
			project,
			path: Arc::from(path.into()),
		}
	}

	/// Owning project.
	pub fn project(&self) -> &ProjectKey {
		&self.project
	}

	/// Document file path.
	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl fmt::Display for DocumentKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.path.display(), self.project)
	}
}
