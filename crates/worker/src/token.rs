use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one spawned actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ActorId(u64);

impl ActorId {
	/// Allocates the next actor ID.
	pub(crate) fn next() -> Self {
		Self(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
	}
}

tokio::task_local! {
	static CURRENT_ACTOR: ActorId;
}

/// Runs `fut` with `id` marked as the current actor.
pub(crate) async fn scope<F: std::future::Future>(id: ActorId, fut: F) -> F::Output {
	CURRENT_ACTOR.scope(id, fut).await
}

/// Returns the actor whose task is currently executing, if any.
pub(crate) fn current_actor() -> Option<ActorId> {
	CURRENT_ACTOR.try_with(|id| *id).ok()
}
