//! Scriptable generator shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use regen_primitives::{ProjectKey, Rope};
use tokio::sync::watch;

use crate::artifact::{ArtifactGenerator, GeneratedArtifact};
use crate::document::{DocumentHandle, ProjectContext};
use crate::error::GenerationError;

pub(crate) const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn project() -> Arc<ProjectContext> {
	Arc::new(ProjectContext::new(ProjectKey::new("/app/app.proj")).with_root_namespace("App"))
}

pub(crate) fn doc(path: &str, text: &str) -> DocumentHandle {
	DocumentHandle::new(project(), path, Rope::from(text))
}

/// Blocks a generator call until opened; reports when a call has entered.
pub(crate) struct Gate {
	open: Mutex<bool>,
	cv: Condvar,
	entered: watch::Sender<bool>,
}

impl Gate {
	fn new() -> Self {
		Self {
			open: Mutex::new(false),
			cv: Condvar::new(),
			entered: watch::channel(false).0,
		}
	}

	pub(crate) fn open(&self) {
		*self.open.lock() = true;
		self.cv.notify_all();
	}

	pub(crate) async fn entered(&self) {
		let mut rx = self.entered.subscribe();
		let _ = rx.wait_for(|entered| *entered).await;
	}

	fn pass(&self) {
		self.entered.send_replace(true);
		let mut open = self.open.lock();
		while !*open {
			self.cv.wait(&mut open);
		}
	}
}

/// Generator producing `// <path>\n<text>`, with per-text gates and failures.
#[derive(Default)]
pub(crate) struct TestGenerator {
	calls: AtomicUsize,
	gates: Mutex<HashMap<String, Arc<Gate>>>,
	failing: Mutex<HashSet<PathBuf>>,
	panicking: Mutex<HashSet<PathBuf>>,
}

impl TestGenerator {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Installs a gate that holds every generation of a document whose text is `text`.
	pub(crate) fn gate(&self, text: &str) -> Arc<Gate> {
		let gate = Arc::new(Gate::new());
		self.gates.lock().insert(text.to_string(), Arc::clone(&gate));
		gate
	}

	pub(crate) fn fail_on(&self, path: impl AsRef<Path>) {
		self.failing.lock().insert(path.as_ref().to_path_buf());
	}

	pub(crate) fn panic_on(&self, path: impl AsRef<Path>) {
		self.panicking.lock().insert(path.as_ref().to_path_buf());
	}

	pub(crate) fn render(path: &Path, text: &str) -> String {
		format!("// {}\n{text}", path.display())
	}
}

impl ArtifactGenerator for TestGenerator {
	fn generate(&self, document: &DocumentHandle) -> Result<GeneratedArtifact, GenerationError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let text = document.text().to_string();
		let gate = self.gates.lock().get(&text).cloned();
		if let Some(gate) = gate {
			gate.pass();
		}
		let path = document.key().path();
		if self.panicking.lock().contains(path) {
			panic!("generator exploded on {}", path.display());
		}
		if self.failing.lock().contains(path) {
			return Err(GenerationError::failed(document.key(), "syntax error"));
		}
		Ok(GeneratedArtifact::new(Self::render(path, &text)))
	}
}

pub(crate) fn as_dyn(generator: &Arc<TestGenerator>) -> Arc<dyn ArtifactGenerator> {
	Arc::clone(generator) as Arc<dyn ArtifactGenerator>
}
