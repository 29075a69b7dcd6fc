//! Debounced background regeneration.
//!
//! [`BackgroundGenerator`] runs a single-writer scheduler actor. Every
//! enqueue restarts a quiet-period timer; when the timer fires, one worker
//! captures the coalesced workload and regenerates each document through its
//! output cache. Enqueues that arrive during a run seed the next run.
//!
//! ```text
//!            enqueue                 timer fires
//!   Idle ───────────────► Scheduled ────────────► Running
//!    ▲                     ▲   │ enqueue               │
//!    │                     │   └─ restart timer        │ run finished
//!    │                     └───────── pending ◄────────┤
//!    └──────────────────────────── no pending ◄────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use regen_primitives::DocumentKey;
use regen_worker::{ActorHandle, ActorShutdownReport, ActorSpec, TaskClass};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

mod actor;
mod hooks;

#[cfg(any(test, feature = "test-hooks"))]
pub use hooks::{ResetEvent, SchedulerHooks};

use self::actor::{SchedulerActor, SchedulerCmd};
use self::hooks::HookDispatch;
use crate::config::GeneratorConfig;
use crate::document::DocumentHandle;
use crate::error::{SchedulerError, TextLoadError};
use crate::events::RegenerationEvent;
use crate::project::{ProjectChange, ProjectModel};
use crate::text_loader::{GeneratedTextLoader, TextAndVersion};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
	/// Nothing pending, no timer armed.
	Idle,
	/// Quiet-period timer armed.
	Scheduled,
	/// A worker is processing a captured workload.
	Running,
}

/// Snapshot of the scheduler, ordered after every earlier enqueue from the same caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
	pub state: SchedulerState,
	/// Documents waiting for the next run.
	pub pending: usize,
}

impl SchedulerStatus {
	pub fn is_scheduled_or_running(&self) -> bool {
		self.state != SchedulerState::Idle
	}

	pub fn has_pending_notifications(&self) -> bool {
		self.pending > 0
	}
}

/// Handle to the background regeneration scheduler.
///
/// Dropping the handle cancels the scheduler.
pub struct BackgroundGenerator {
	actor: ActorHandle<SchedulerCmd, RegenerationEvent>,
	project: Arc<dyn ProjectModel>,
	loader: GeneratedTextLoader,
	listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundGenerator {
	/// Starts the scheduler on the current runtime.
	pub fn spawn(project: Arc<dyn ProjectModel>, config: &GeneratorConfig) -> Self {
		Self::spawn_with_dispatch(project, config, HookDispatch::default())
	}

	/// Starts the scheduler with hook points installed.
	#[cfg(any(test, feature = "test-hooks"))]
	pub fn spawn_with_hooks(project: Arc<dyn ProjectModel>, config: &GeneratorConfig, hooks: SchedulerHooks) -> Self {
		Self::spawn_with_dispatch(project, config, HookDispatch::new(hooks))
	}

	fn spawn_with_dispatch(project: Arc<dyn ProjectModel>, config: &GeneratorConfig, dispatch: HookDispatch) -> Self {
		let actor = SchedulerActor::new(Arc::clone(&project), config.quiet_period(), dispatch);
		let spec = ActorSpec::new("regen.scheduler", TaskClass::Foreground, actor).event_buffer(config.event_buffer.max(1));
		tracing::debug!(quiet_period_ms = config.quiet_period_ms, "regen.scheduler.spawn");
		Self {
			actor: regen_worker::spawn_actor(spec),
			loader: GeneratedTextLoader::new(project.generator()).with_encoding(config.encoding()),
			project,
			listeners: Mutex::new(Vec::new()),
		}
	}

	/// Schedules `document` for regeneration. Never waits.
	///
	/// Outcomes are reported to [`Self::subscribe`] listeners only.
	pub fn enqueue(&self, document: DocumentHandle) {
		self.send(SchedulerCmd::Enqueue(document));
	}

	fn send(&self, cmd: SchedulerCmd) {
		if self.actor.send(cmd).is_err() {
			tracing::debug!("regen.scheduler.closed");
		}
	}

	/// Feeds a project change stream into the scheduler.
	///
	/// Added or changed documents and projects are enqueued; removals drop
	/// their pending entries.
	pub fn attach(&self, mut changes: broadcast::Receiver<ProjectChange>) {
		let port = self.actor.port();
		let listener = regen_worker::spawn(TaskClass::Background, async move {
			loop {
				let change = match changes.recv().await {
					Ok(change) => change,
					Err(broadcast::error::RecvError::Lagged(missed)) => {
						tracing::warn!(missed, "regen.scheduler.changes_lagged");
						continue;
					}
					Err(broadcast::error::RecvError::Closed) => break,
				};
				let cmd = match change {
					ProjectChange::DocumentAdded(document) | ProjectChange::DocumentChanged(document) => SchedulerCmd::Enqueue(document),
					ProjectChange::DocumentRemoved(key) => SchedulerCmd::Forget(key),
					ProjectChange::ProjectAdded(project) | ProjectChange::ProjectChanged(project) => SchedulerCmd::EnqueueProject(project),
					ProjectChange::ProjectRemoved(project) => SchedulerCmd::ForgetProject(project),
				};
				if port.send(cmd).is_err() {
					break;
				}
			}
		});
		self.listeners.lock().push(listener);
	}

	pub fn subscribe(&self) -> broadcast::Receiver<RegenerationEvent> {
		self.actor.subscribe()
	}

	/// Returns the scheduler state as of every earlier enqueue from this caller.
	pub async fn status(&self) -> Result<SchedulerStatus, SchedulerError> {
		let (reply, status) = oneshot::channel();
		self.actor.send(SchedulerCmd::Status(reply)).map_err(|_| SchedulerError::Closed)?;
		status.await.map_err(|_| SchedulerError::Closed)
	}

	/// Returns true when called from the scheduler's own task.
	pub fn is_scheduler_task(&self) -> bool {
		self.actor.is_current()
	}

	/// Loads generated text for the current snapshot of `key`, then evicts it.
	pub async fn request_artifact_text(&self, key: &DocumentKey) -> Result<TextAndVersion, TextLoadError> {
		if self.actor.port().is_closed() {
			return Err(TextLoadError::SchedulerClosed);
		}
		let document = self
			.project
			.resolve_current_document(key)
			.ok_or_else(|| TextLoadError::DocumentNotFound(key.clone()))?;
		Ok(self.loader.load(&document).await?)
	}

	/// Stops listeners, closes the mailbox, and joins the scheduler.
	pub async fn shutdown(&self) -> ActorShutdownReport {
		for listener in self.listeners.lock().drain(..) {
			listener.abort();
		}
		self.actor.shutdown_graceful_or_force(SHUTDOWN_TIMEOUT).await
	}
}

impl Drop for BackgroundGenerator {
	fn drop(&mut self) {
		for listener in self.listeners.get_mut().drain(..) {
			listener.abort();
		}
	}
}
