//! Worker runtime primitives for the regeneration pipeline.
//!
//! * [`TaskClass`] tags spawned work for tracing.
//! * [`spawn`] / [`spawn_blocking`] route work onto the ambient tokio runtime.
//! * [`actor`] hosts single-writer state behind an unbounded FIFO mailbox and
//!   broadcasts events to subscribers.

pub mod actor;
mod class;
pub mod mailbox;
mod spawn;
mod token;

pub use actor::{
	ActorContext, ActorExit, ActorExitKind, ActorFlow, ActorHandle, ActorPort, ActorSendError, ActorShutdownMode, ActorShutdownReport,
	ActorSpec, WorkerActor, spawn_actor,
};
pub use class::TaskClass;
pub use spawn::{join_error_panic_message, spawn, spawn_blocking};
