//! Single-writer actor runtime.
//!
//! An actor owns its state exclusively and is reached only through its
//! mailbox. Helper tasks spawned by a handler (timers, workers) report back by
//! posting commands through an [`ActorPort`], so every state transition runs
//! on the actor task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::TaskClass;
use crate::mailbox::{Mailbox, MailboxReceiver, MailboxSendError, MailboxSender};
use crate::token::{self, ActorId};

mod join_ctrl;

use join_ctrl::ActorJoinCtrl;

/// Continuation directive from one actor command handling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorFlow {
	/// Continue processing commands.
	Continue,
	/// Stop this actor.
	Stop,
}

/// Exit classification for an actor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActorExitKind {
	Stopped,
	MailboxClosed,
	Cancelled,
	HandlerFailed,
	Panicked,
}

/// Exit summary recorded when the actor task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorExit {
	kind: ActorExitKind,
	message: Option<String>,
}

impl ActorExit {
	fn new(kind: ActorExitKind) -> Self {
		Self { kind, message: None }
	}

	fn with_message(kind: ActorExitKind, message: String) -> Self {
		Self {
			kind,
			message: Some(message),
		}
	}

	pub fn kind(&self) -> ActorExitKind {
		self.kind
	}

	pub fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	pub fn is_failure(&self) -> bool {
		matches!(
			self.kind,
			ActorExitKind::HandlerFailed | ActorExitKind::Panicked
		)
	}
}

/// Shutdown mode for actors.
#[derive(Debug, Clone, Copy)]
pub enum ActorShutdownMode {
	/// Cancel the actor, preempting any running handler.
	Immediate,
	/// Close the mailbox and let the actor drain queued commands.
	Graceful { timeout: Duration },
}

/// Shutdown report for one actor.
#[derive(Debug, Clone)]
pub struct ActorShutdownReport {
	completed: bool,
	timed_out: bool,
	last_exit: Option<ActorExit>,
}

impl ActorShutdownReport {
	pub fn completed(&self) -> bool {
		self.completed
	}

	pub fn timed_out(&self) -> bool {
		self.timed_out
	}

	pub fn last_exit(&self) -> Option<&ActorExit> {
		self.last_exit.as_ref()
	}
}

/// Actor behavior executed on the actor task.
#[async_trait]
pub trait WorkerActor: Send + 'static {
	type Cmd: Send + 'static;
	type Evt: Clone + Send + 'static;

	async fn on_stop(&mut self, _ctx: &mut ActorContext<Self::Cmd, Self::Evt>) {}

	async fn handle(&mut self, cmd: Self::Cmd, ctx: &mut ActorContext<Self::Cmd, Self::Evt>) -> Result<ActorFlow, String>;
}

/// Error returned when sending a command to a stopped actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorSendError {
	/// The actor's mailbox is closed.
	Closed,
}

impl From<MailboxSendError> for ActorSendError {
	fn from(_: MailboxSendError) -> Self {
		ActorSendError::Closed
	}
}

impl std::fmt::Display for ActorSendError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ActorSendError::Closed => write!(f, "actor mailbox closed"),
		}
	}
}

impl std::error::Error for ActorSendError {}

/// Cloneable command port into one actor.
pub struct ActorPort<Cmd> {
	id: ActorId,
	tx: MailboxSender<Cmd>,
}

impl<Cmd> Clone for ActorPort<Cmd> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			tx: self.tx.clone(),
		}
	}
}

impl<Cmd> ActorPort<Cmd> {
	/// Non-blocking enqueue at the back of the actor's mailbox.
	pub fn send(&self, cmd: Cmd) -> Result<(), ActorSendError> {
		self.tx.send(cmd)?;
		Ok(())
	}

	/// Returns true when called from this actor's own task.
	pub fn is_current(&self) -> bool {
		token::current_actor() == Some(self.id)
	}

	/// Returns true once the actor stopped accepting commands.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Actor execution context: event emitter, self port, and cancellation.
pub struct ActorContext<Cmd, Evt> {
	events: broadcast::Sender<Evt>,
	port: ActorPort<Cmd>,
	cancel: CancellationToken,
}

impl<Cmd, Evt> ActorContext<Cmd, Evt>
where
	Evt: Clone + Send + 'static,
{
	/// Emits one actor event to subscribers.
	pub fn emit(&self, evt: Evt) {
		let _ = self.events.send(evt);
	}

	/// Returns a sender for emitting events from helper tasks.
	pub fn event_sender(&self) -> broadcast::Sender<Evt> {
		self.events.clone()
	}

	/// Returns a port that posts commands back to this actor.
	pub fn port(&self) -> ActorPort<Cmd> {
		self.port.clone()
	}

	/// Returns a token cancelled when the actor is torn down.
	pub fn child_token(&self) -> CancellationToken {
		self.cancel.child_token()
	}
}

/// Builder spec for one actor.
pub struct ActorSpec<A>
where
	A: WorkerActor,
{
	name: String,
	class: TaskClass,
	event_buffer: usize,
	actor: A,
}

impl<A> ActorSpec<A>
where
	A: WorkerActor,
{
	/// Creates a new actor spec around an initial actor state.
	pub fn new(name: impl Into<String>, class: TaskClass, actor: A) -> Self {
		Self {
			name: name.into(),
			class,
			event_buffer: 128,
			actor,
		}
	}

	/// Sets the event broadcast buffer capacity.
	///
	/// # Panics
	///
	/// Panics if `size` is zero.
	#[must_use]
	pub fn event_buffer(mut self, size: usize) -> Self {
		assert!(size > 0, "event buffer size must be > 0");
		self.event_buffer = size;
		self
	}
}

/// Handle for one running actor.
pub struct ActorHandle<Cmd, Evt>
where
	Cmd: Send + 'static,
	Evt: Clone + Send + 'static,
{
	name: String,
	port: ActorPort<Cmd>,
	events: broadcast::Sender<Evt>,
	cancel: CancellationToken,
	last_exit: Arc<Mutex<Option<ActorExit>>>,
	join_ctrl: Arc<ActorJoinCtrl>,
}

impl<Cmd, Evt> Drop for ActorHandle<Cmd, Evt>
where
	Cmd: Send + 'static,
	Evt: Clone + Send + 'static,
{
	fn drop(&mut self) {
		self.cancel.cancel();
		self.port.tx.close();
	}
}

impl<Cmd, Evt> ActorHandle<Cmd, Evt>
where
	Cmd: Send + 'static,
	Evt: Clone + Send + 'static,
{
	/// Subscribes to actor events.
	pub fn subscribe(&self) -> broadcast::Receiver<Evt> {
		self.events.subscribe()
	}

	/// Sends one command. Never waits.
	pub fn send(&self, cmd: Cmd) -> Result<(), ActorSendError> {
		self.port.send(cmd)
	}

	/// Returns a cloneable command port.
	pub fn port(&self) -> ActorPort<Cmd> {
		self.port.clone()
	}

	/// Returns true when called from this actor's own task.
	pub fn is_current(&self) -> bool {
		self.port.is_current()
	}

	/// Requests cancellation and closes the mailbox.
	pub fn cancel(&self) {
		self.cancel.cancel();
		self.port.tx.close();
	}

	/// Returns the exit summary, once the actor task has ended.
	pub fn last_exit(&self) -> Option<ActorExit> {
		self.last_exit.lock().clone()
	}

	/// Shuts down this actor.
	pub async fn shutdown(&self, mode: ActorShutdownMode) -> ActorShutdownReport {
		match mode {
			ActorShutdownMode::Immediate => {
				self.cancel();
				self.join_ctrl.join_forever().await;
				ActorShutdownReport {
					completed: true,
					timed_out: false,
					last_exit: self.last_exit(),
				}
			}
			ActorShutdownMode::Graceful { timeout } => {
				self.port.tx.close();
				let completed = self.join_ctrl.join_with_timeout(timeout).await;
				if !completed {
					self.cancel.cancel();
				}
				ActorShutdownReport {
					completed,
					timed_out: !completed,
					last_exit: self.last_exit(),
				}
			}
		}
	}

	/// Two-phase shutdown: tries graceful first, forces immediate on timeout.
	pub async fn shutdown_graceful_or_force(&self, timeout: Duration) -> ActorShutdownReport {
		let report = self.shutdown(ActorShutdownMode::Graceful { timeout }).await;
		if report.timed_out() {
			tracing::warn!(actor = %self.name, "graceful shutdown timed out; forcing immediate");
			return self.shutdown(ActorShutdownMode::Immediate).await;
		}
		report
	}
}

/// Spawns an actor on its own task.
pub fn spawn_actor<A>(spec: ActorSpec<A>) -> ActorHandle<A::Cmd, A::Evt>
where
	A: WorkerActor,
{
	let ActorSpec {
		name,
		class,
		event_buffer,
		actor,
	} = spec;
	let mailbox = Mailbox::new();
	let id = ActorId::next();
	let port = ActorPort { id, tx: mailbox.sender() };
	let rx = mailbox.into_receiver();

	let (events, _) = broadcast::channel(event_buffer);
	let cancel = CancellationToken::new();
	let last_exit = Arc::new(Mutex::new(None));

	let ctx = ActorContext {
		events: events.clone(),
		port: port.clone(),
		cancel: cancel.clone(),
	};
	let task_name = name.clone();
	let task_class = class;
	let task_exit = Arc::clone(&last_exit);
	let task_cancel = cancel.clone();
	let (done, join_ctrl) = ActorJoinCtrl::new();

	crate::spawn(task_class, async move {
		let child = crate::spawn(task_class, token::scope(id, run_actor(actor, rx, ctx)));
		let exit = match child.await {
			Ok(exit) => exit,
			Err(err) if err.is_cancelled() => ActorExit::new(ActorExitKind::Cancelled),
			Err(err) => match crate::join_error_panic_message(err) {
				Some(msg) => ActorExit::with_message(ActorExitKind::Panicked, msg),
				None => ActorExit::new(ActorExitKind::Panicked),
			},
		};
		// Late senders must fail fast rather than queue into a dead actor.
		task_cancel.cancel();

		if exit.is_failure() {
			tracing::error!(actor = %task_name, class = ?task_class, kind = ?exit.kind(), message = ?exit.message(), "worker.actor.exit");
		} else {
			tracing::debug!(actor = %task_name, class = ?task_class, kind = ?exit.kind(), "worker.actor.exit");
		}
		*task_exit.lock() = Some(exit);
		done.send_replace(true);
	});

	ActorHandle {
		name,
		port,
		events,
		cancel,
		last_exit,
		join_ctrl: Arc::new(join_ctrl),
	}
}

async fn run_actor<A>(mut actor: A, rx: MailboxReceiver<A::Cmd>, mut ctx: ActorContext<A::Cmd, A::Evt>) -> ActorExit
where
	A: WorkerActor,
{
	let token = ctx.cancel.clone();

	let exit = loop {
		let cmd = tokio::select! {
			biased;
			_ = token.cancelled() => break ActorExit::new(ActorExitKind::Cancelled),
			msg = rx.recv() => {
				let Some(cmd) = msg else {
					break ActorExit::new(ActorExitKind::MailboxClosed);
				};
				cmd
			}
		};

		let flow = tokio::select! {
			biased;
			_ = token.cancelled() => break ActorExit::new(ActorExitKind::Cancelled),
			res = actor.handle(cmd, &mut ctx) => res,
		};

		match flow {
			Ok(ActorFlow::Continue) => {}
			Ok(ActorFlow::Stop) => break ActorExit::new(ActorExitKind::Stopped),
			Err(err) => break ActorExit::with_message(ActorExitKind::HandlerFailed, err),
		}
	};

	ctx.port.tx.close();
	let dropped = rx.discard_pending();
	if dropped > 0 {
		tracing::debug!(dropped, "worker.actor.discard_pending");
	}
	actor.on_stop(&mut ctx).await;
	exit
}
