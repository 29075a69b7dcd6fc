//! Observation and blocking points inside a scheduler run.
//!
//! Only compiled for tests and the `test-hooks` feature. Production builds
//! carry an empty [`HookDispatch`] whose methods compile to nothing.

#[cfg(any(test, feature = "test-hooks"))]
use std::sync::Arc;

#[cfg(any(test, feature = "test-hooks"))]
use tokio::sync::watch;

/// Awaitable flag that stays set until explicitly reset.
#[cfg(any(test, feature = "test-hooks"))]
#[derive(Debug, Clone)]
pub struct ResetEvent {
	state: Arc<watch::Sender<bool>>,
}

#[cfg(any(test, feature = "test-hooks"))]
impl ResetEvent {
	pub fn new(initially_set: bool) -> Self {
		Self {
			state: Arc::new(watch::channel(initially_set).0),
		}
	}

	pub fn set(&self) {
		self.state.send_replace(true);
	}

	pub fn reset(&self) {
		self.state.send_replace(false);
	}

	pub fn is_set(&self) -> bool {
		*self.state.borrow()
	}

	/// Waits until the event is set. Returns immediately if it already is.
	pub async fn wait(&self) {
		let mut rx = self.state.subscribe();
		// The sender lives in `self`, so the channel cannot close while waiting.
		let _ = rx.wait_for(|set| *set).await;
	}
}

/// Hook points a test can observe or hold a scheduler run at.
///
/// `block_work_start` and `block_work_completing` start set (open); reset
/// them to hold the worker at that point.
#[cfg(any(test, feature = "test-hooks"))]
#[derive(Debug, Clone)]
pub struct SchedulerHooks {
	/// Set just before the worker begins a run.
	pub work_starting: ResetEvent,
	/// Gate the worker waits on before capturing the workload.
	pub block_work_start: ResetEvent,
	/// Set right after the workload has been captured.
	pub captured_workload: ResetEvent,
	/// Set when the worker has finished the workload, before `block_work_completing`.
	pub work_completing: ResetEvent,
	/// Gate the worker waits on before reporting completion.
	pub block_work_completing: ResetEvent,
	/// Set after the post-run state transition.
	pub work_completed: ResetEvent,
}

#[cfg(any(test, feature = "test-hooks"))]
impl Default for SchedulerHooks {
	fn default() -> Self {
		Self {
			work_starting: ResetEvent::new(false),
			block_work_start: ResetEvent::new(true),
			captured_workload: ResetEvent::new(false),
			work_completing: ResetEvent::new(false),
			block_work_completing: ResetEvent::new(true),
			work_completed: ResetEvent::new(false),
		}
	}
}

/// Hook dispatch carried by the scheduler actor and its worker.
#[derive(Debug, Clone, Default)]
pub(crate) struct HookDispatch {
	#[cfg(any(test, feature = "test-hooks"))]
	hooks: Option<SchedulerHooks>,
}

impl HookDispatch {
	#[cfg(any(test, feature = "test-hooks"))]
	pub(crate) fn new(hooks: SchedulerHooks) -> Self {
		Self { hooks: Some(hooks) }
	}

	pub(crate) async fn work_starting(&self) {
		#[cfg(any(test, feature = "test-hooks"))]
		if let Some(hooks) = &self.hooks {
			hooks.work_starting.set();
			hooks.block_work_start.wait().await;
		}
	}

	pub(crate) fn captured_workload(&self) {
		#[cfg(any(test, feature = "test-hooks"))]
		if let Some(hooks) = &self.hooks {
			hooks.captured_workload.set();
		}
	}

	pub(crate) async fn work_completing(&self) {
		#[cfg(any(test, feature = "test-hooks"))]
		if let Some(hooks) = &self.hooks {
			hooks.work_completing.set();
			hooks.block_work_completing.wait().await;
		}
	}

	pub(crate) fn work_completed(&self) {
		#[cfg(any(test, feature = "test-hooks"))]
		if let Some(hooks) = &self.hooks {
			hooks.work_completed.set();
		}
	}
}
