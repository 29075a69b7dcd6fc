use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regen_primitives::{DocumentKey, ProjectKey};
use regen_worker::{ActorContext, ActorFlow, ActorPort, TaskClass, WorkerActor};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::hooks::HookDispatch;
use super::{SchedulerState, SchedulerStatus};
use crate::coalesce::{NotificationCoalescer, PendingWorkload};
use crate::document::DocumentHandle;
use crate::events::RegenerationEvent;
use crate::project::ProjectModel;

pub(crate) enum SchedulerCmd {
	Enqueue(DocumentHandle),
	EnqueueProject(ProjectKey),
	Forget(DocumentKey),
	ForgetProject(ProjectKey),
	TimerFired { epoch: u64 },
	Capture(oneshot::Sender<PendingWorkload>),
	RunFinished,
	Status(oneshot::Sender<SchedulerStatus>),
}

type Ctx = ActorContext<SchedulerCmd, RegenerationEvent>;

/// Owns all queue state. Timer and worker tasks report back via commands.
pub(crate) struct SchedulerActor {
	project: Arc<dyn ProjectModel>,
	quiet_period: Duration,
	state: SchedulerState,
	pending: NotificationCoalescer,
	timer: Option<JoinHandle<()>>,
	epoch: u64,
	dispatch: HookDispatch,
}

impl SchedulerActor {
	pub(crate) fn new(project: Arc<dyn ProjectModel>, quiet_period: Duration, dispatch: HookDispatch) -> Self {
		Self {
			project,
			quiet_period,
			state: SchedulerState::Idle,
			pending: NotificationCoalescer::new(),
			timer: None,
			epoch: 0,
			dispatch,
		}
	}

	/// Starts or restarts the quiet-period timer.
	fn arm(&mut self, ctx: &Ctx) {
		self.disarm();
		self.epoch = self.epoch.wrapping_add(1);
		self.state = SchedulerState::Scheduled;

		let epoch = self.epoch;
		let quiet_period = self.quiet_period;
		let port = ctx.port();
		let cancel = ctx.child_token();
		self.timer = Some(regen_worker::spawn(TaskClass::Background, async move {
			tokio::select! {
				_ = cancel.cancelled() => {}
				_ = tokio::time::sleep(quiet_period) => {
					let _ = port.send(SchedulerCmd::TimerFired { epoch });
				}
			}
		}));
	}

	fn disarm(&mut self) {
		if let Some(timer) = self.timer.take() {
			timer.abort();
		}
	}

	/// Applies the enqueue transition after pending entries were added.
	fn on_enqueued(&mut self, ctx: &Ctx) {
		match self.state {
			SchedulerState::Idle | SchedulerState::Scheduled => self.arm(ctx),
			// The running worker already captured its workload; the entry waits for the next run.
			SchedulerState::Running => {}
		}
	}

	fn on_forgotten(&mut self) {
		if self.state == SchedulerState::Scheduled && self.pending.is_empty() {
			self.disarm();
			self.state = SchedulerState::Idle;
			tracing::trace!("regen.scheduler.idle");
		}
	}

	fn start_run(&mut self, ctx: &Ctx) {
		self.timer = None;
		self.state = SchedulerState::Running;
		tracing::debug!(pending = self.pending.len(), "regen.run.start");

		let worker = RunWorker {
			project: Arc::clone(&self.project),
			port: ctx.port(),
			events: ctx.event_sender(),
			dispatch: self.dispatch.clone(),
		};
		let cancel = ctx.child_token();
		regen_worker::spawn(TaskClass::Background, worker.supervise(cancel));
	}

	fn finish_run(&mut self, ctx: &Ctx) {
		if self.pending.is_empty() {
			self.state = SchedulerState::Idle;
			tracing::debug!("regen.run.finish");
		} else {
			tracing::debug!(pending = self.pending.len(), "regen.run.finish_rescheduled");
			self.arm(ctx);
		}
		self.dispatch.work_completed();
	}
}

#[async_trait]
impl WorkerActor for SchedulerActor {
	type Cmd = SchedulerCmd;
	type Evt = RegenerationEvent;

	async fn on_stop(&mut self, _ctx: &mut Ctx) {
		self.disarm();
	}

	async fn handle(&mut self, cmd: SchedulerCmd, ctx: &mut Ctx) -> Result<ActorFlow, String> {
		match cmd {
			SchedulerCmd::Enqueue(document) => {
				self.pending.insert(document);
				self.on_enqueued(ctx);
			}
			SchedulerCmd::EnqueueProject(project) => {
				let documents = self.project.documents(&project);
				if !documents.is_empty() {
					for document in documents {
						self.pending.insert(document);
					}
					self.on_enqueued(ctx);
				}
			}
			SchedulerCmd::Forget(key) => {
				if self.pending.remove(&key).is_some() {
					self.on_forgotten();
				}
			}
			SchedulerCmd::ForgetProject(project) => {
				if self.pending.remove_project(&project) > 0 {
					self.on_forgotten();
				}
			}
			SchedulerCmd::TimerFired { epoch } => {
				if epoch == self.epoch && self.state == SchedulerState::Scheduled {
					self.start_run(ctx);
				} else {
					tracing::trace!(epoch, current = self.epoch, state = ?self.state, "regen.scheduler.stale_timer");
				}
			}
			SchedulerCmd::Capture(reply) => {
				let workload = self.pending.take();
				// A dropped receiver means the worker was cancelled; its workload is lost with it.
				let _ = reply.send(workload);
			}
			SchedulerCmd::RunFinished => self.finish_run(ctx),
			SchedulerCmd::Status(reply) => {
				let _ = reply.send(SchedulerStatus {
					state: self.state,
					pending: self.pending.len(),
				});
			}
		}
		Ok(ActorFlow::Continue)
	}
}

/// The single background worker of one run.
struct RunWorker {
	project: Arc<dyn ProjectModel>,
	port: ActorPort<SchedulerCmd>,
	events: broadcast::Sender<RegenerationEvent>,
	dispatch: HookDispatch,
}

impl RunWorker {
	/// Runs the workload and reports completion even if the run panics.
	async fn supervise(self, cancel: CancellationToken) {
		let port = self.port.clone();
		let dispatch = self.dispatch.clone();
		let mut run = regen_worker::spawn(TaskClass::Background, self.run());
		let joined = tokio::select! {
			_ = cancel.cancelled() => {
				run.abort();
				return;
			}
			joined = &mut run => joined,
		};
		if let Err(err) = joined {
			let message = regen_worker::join_error_panic_message(err);
			tracing::error!(?message, "regen.run.panicked");
		}
		dispatch.work_completing().await;
		let _ = port.send(SchedulerCmd::RunFinished);
	}

	async fn run(self) {
		self.dispatch.work_starting().await;

		let (reply, workload) = oneshot::channel();
		if self.port.send(SchedulerCmd::Capture(reply)).is_err() {
			return;
		}
		let Ok(workload) = workload.await else {
			return;
		};
		self.dispatch.captured_workload();
		tracing::debug!(documents = workload.len(), "regen.run.captured");

		let generator = self.project.generator();
		for key in workload.into_keys() {
			// The captured handle may already be superseded by a newer edit.
			let Some(current) = self.project.resolve_current_document(&key) else {
				tracing::trace!(doc = %key, "regen.run.document_gone");
				continue;
			};
			let event = match current.generated_output(&generator).await {
				Ok(output) => RegenerationEvent::Completed {
					output_version: current.output().output_version().unwrap_or(output.version()),
					key,
				},
				Err(error) => {
					tracing::warn!(doc = %key, %error, "regen.run.generation_failed");
					RegenerationEvent::Failed { key, error }
				}
			};
			let _ = self.events.send(event);
		}
	}
}
