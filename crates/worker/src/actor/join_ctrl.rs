use std::time::Duration;

use tokio::sync::watch;

/// Completion signal for an actor's supervising task.
///
/// The supervisor owns the sender and flips it once the exit is recorded. If
/// the supervisor is torn down without flipping it (runtime shutdown), the
/// dropped sender counts as completion too.
pub(super) struct ActorJoinCtrl {
	done: watch::Receiver<bool>,
}

impl ActorJoinCtrl {
	pub(super) fn new() -> (watch::Sender<bool>, Self) {
		let (tx, done) = watch::channel(false);
		(tx, Self { done })
	}

	/// Waits until the supervising task finished. Any number of callers may wait.
	pub(super) async fn join_forever(&self) {
		let mut done = self.done.clone();
		let _ = done.wait_for(|finished| *finished).await;
	}

	/// Returns `true` if the task finished within `timeout`.
	pub(super) async fn join_with_timeout(&self, timeout: Duration) -> bool {
		tokio::time::timeout(timeout, self.join_forever()).await.is_ok()
	}
}
