//! Per-document versioned output cache.
//!
//! Guarantees:
//! - single-flight: a request joins an in-flight computation whose version is
//!   at least the requested one instead of starting another
//! - freshest wins: a result computed from an older snapshot never replaces
//!   one already installed from a newer snapshot, whatever the completion order
//! - [`VersionedOutputCache::clear`] drops the artifact but keeps the output
//!   version, so version-only observers see no change across an
//!   evict/recompute cycle

use std::sync::Arc;

use parking_lot::Mutex;
use regen_primitives::{Rope, VersionStamp};
use regen_worker::TaskClass;
use tokio::sync::watch;

use crate::artifact::{ArtifactGenerator, GeneratedArtifact};
use crate::document::DocumentHandle;
use crate::error::GenerationError;

type ComputeResult = Result<CachedOutput, GenerationError>;

/// An installed artifact together with the snapshot it was produced from.
#[derive(Debug, Clone)]
pub struct CachedOutput {
	artifact: Arc<GeneratedArtifact>,
	version: VersionStamp,
	source: Rope,
}

impl CachedOutput {
	pub fn artifact(&self) -> &Arc<GeneratedArtifact> {
		&self.artifact
	}

	/// Version of the snapshot that produced the artifact.
	pub fn version(&self) -> VersionStamp {
		self.version
	}

	/// Source text the artifact was produced from.
	pub fn source(&self) -> &Rope {
		&self.source
	}
}

struct Inflight {
	version: VersionStamp,
	result: watch::Receiver<Option<ComputeResult>>,
}

#[derive(Default)]
struct CacheEntry {
	installed: Option<CachedOutput>,
	output_version: Option<VersionStamp>,
	/// Newest computation; requests for versions it covers join it.
	inflight: Option<Inflight>,
	/// Computations still running, including superseded ones.
	running: usize,
}

/// Memoized generated output for one document.
///
/// Cloning yields another handle to the same entry.
#[derive(Clone, Default)]
pub struct VersionedOutputCache {
	entry: Arc<Mutex<CacheEntry>>,
}

impl std::fmt::Debug for VersionedOutputCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let entry = self.entry.lock();
		f.debug_struct("VersionedOutputCache")
			.field("producing_version", &entry.installed.as_ref().map(CachedOutput::version))
			.field("output_version", &entry.output_version)
			.field("inflight", &entry.inflight.as_ref().map(|f| f.version))
			.field("running", &entry.running)
			.finish()
	}
}

impl VersionedOutputCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true if both handles refer to the same entry.
	pub fn same_entry(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.entry, &other.entry)
	}

	/// Returns whatever is installed, without computing.
	pub fn try_get_cached(&self) -> Option<CachedOutput> {
		self.entry.lock().installed.clone()
	}

	/// Returns the output version; `None` only before the first install.
	pub fn output_version(&self) -> Option<VersionStamp> {
		self.entry.lock().output_version
	}

	/// Returns true while any computation is running, superseded ones included.
	pub fn is_computing(&self) -> bool {
		self.entry.lock().running > 0
	}

	/// Drops the installed artifact, keeping the output version.
	///
	/// An in-flight computation is unaffected and still installs on completion
	/// if it is the freshest result present at that time.
	pub fn clear(&self) {
		let mut entry = self.entry.lock();
		if entry.installed.take().is_some() {
			tracing::trace!(output_version = ?entry.output_version, "regen.cache.clear");
		}
	}

	/// Returns output at least as new as `document`, computing it if needed.
	pub async fn get_or_compute(&self, document: &DocumentHandle, generator: &Arc<dyn ArtifactGenerator>) -> Result<CachedOutput, GenerationError> {
		let version = document.version();
		let result = {
			let mut entry = self.entry.lock();
			if let Some(cached) = entry.installed.as_ref().filter(|c| c.version >= version) {
				return Ok(cached.clone());
			}
			let joinable = entry.inflight.as_ref().filter(|f| f.version >= version).map(|f| (f.version, f.result.clone()));
			match joinable {
				Some((joined, result)) => {
					tracing::trace!(doc = %document.key(), version = %version, joined = %joined, "regen.cache.join");
					result
				}
				None => self.start(&mut entry, document, generator),
			}
		};

		match wait_for_result(result, document).await {
			Ok(computed) => Ok(self.freshest(computed)),
			Err(err) => match self.try_get_cached().filter(|c| c.version >= version) {
				Some(fresher) => Ok(fresher),
				None => Err(err),
			},
		}
	}

	/// Spawns a detached computation and records it as the newest in flight.
	///
	/// The computation installs its own result, so it completes even if every
	/// caller stops waiting.
	fn start(&self, entry: &mut CacheEntry, document: &DocumentHandle, generator: &Arc<dyn ArtifactGenerator>) -> watch::Receiver<Option<ComputeResult>> {
		let version = document.version();
		let (tx, rx) = watch::channel(None);
		entry.running += 1;
		if let Some(superseded) = entry.inflight.replace(Inflight {
			version,
			result: rx.clone(),
		}) {
			tracing::trace!(doc = %document.key(), superseded = %superseded.version, version = %version, "regen.cache.supersede");
		}

		let cache = self.clone();
		let document = document.clone();
		let generator = Arc::clone(generator);
		regen_worker::spawn(TaskClass::Background, async move {
			let task_document = document.clone();
			let joined = regen_worker::spawn_blocking(TaskClass::CpuBlocking, move || generator.generate(&task_document)).await;
			let path = document.key().path().to_path_buf();
			let result = match joined {
				Ok(Ok(artifact)) => Ok(CachedOutput {
					artifact: Arc::new(artifact),
					version,
					source: document.text().clone(),
				}),
				Ok(Err(err)) => Err(err),
				Err(err) => Err(match regen_worker::join_error_panic_message(err) {
					Some(message) => GenerationError::Panicked { path, message },
					None => GenerationError::Interrupted { path },
				}),
			};
			cache.complete(version, &result);
			let _ = tx.send(Some(result));
		});
		rx
	}

	/// Applies freshest-wins and releases the in-flight slot.
	fn complete(&self, version: VersionStamp, result: &ComputeResult) {
		let mut entry = self.entry.lock();
		entry.running = entry.running.saturating_sub(1);
		if entry.inflight.as_ref().is_some_and(|f| f.version == version) {
			entry.inflight = None;
		}
		let Ok(output) = result else {
			return;
		};
		if let Some(current) = entry.installed.as_ref()
			&& current.version >= version
		{
			tracing::trace!(installed = %current.version, stale = %version, "regen.cache.stale_discarded");
			return;
		}
		let output_version = entry.output_version.map_or(version, |v| v.max(version));
		entry.output_version = Some(output_version);
		entry.installed = Some(output.clone());
		tracing::debug!(version = %version, output_version = %output_version, "regen.cache.install");
	}

	/// Re-checks freshest-wins for a joiner that just woke up.
	fn freshest(&self, computed: CachedOutput) -> CachedOutput {
		match self.entry.lock().installed.as_ref() {
			Some(current) if current.version > computed.version => current.clone(),
			_ => computed,
		}
	}
}

async fn wait_for_result(mut rx: watch::Receiver<Option<ComputeResult>>, document: &DocumentHandle) -> ComputeResult {
	let interrupted = || GenerationError::Interrupted {
		path: document.key().path().to_path_buf(),
	};
	match rx.wait_for(Option::is_some).await {
		Ok(value) => value.clone().unwrap_or_else(|| Err(interrupted())),
		Err(_) => Err(interrupted()),
	}
}

#[cfg(test)]
mod tests;
