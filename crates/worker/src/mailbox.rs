use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Mailbox send error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxSendError {
	/// Mailbox is closed.
	Closed,
}

impl std::fmt::Display for MailboxSendError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Closed => write!(f, "mailbox closed"),
		}
	}
}

impl std::error::Error for MailboxSendError {}

struct MailboxState<T> {
	queue: VecDeque<T>,
	closed: bool,
}

struct MailboxInner<T> {
	state: Mutex<MailboxState<T>>,
	notify_recv: Notify,
}

/// Multi-producer actor mailbox sender.
///
/// Sending never waits: the queue is unbounded so that callers on
/// latency-sensitive paths (edit notifications) can enqueue from sync code.
pub struct MailboxSender<T> {
	inner: Arc<MailboxInner<T>>,
}

/// Actor mailbox receiver.
pub struct MailboxReceiver<T> {
	inner: Arc<MailboxInner<T>>,
}

/// FIFO mailbox primitive used by supervised actors.
pub struct Mailbox<T> {
	inner: Arc<MailboxInner<T>>,
}

impl<T> Clone for MailboxSender<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Default for Mailbox<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Mailbox<T> {
	/// Creates an empty, open mailbox.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(MailboxInner {
				state: Mutex::new(MailboxState {
					queue: VecDeque::new(),
					closed: false,
				}),
				notify_recv: Notify::new(),
			}),
		}
	}

	/// Returns a sender handle.
	pub fn sender(&self) -> MailboxSender<T> {
		MailboxSender {
			inner: Arc::clone(&self.inner),
		}
	}

	/// Returns the receiver handle, consuming the mailbox.
	///
	/// There is exactly one receiver per mailbox: the owning actor.
	pub fn into_receiver(self) -> MailboxReceiver<T> {
		MailboxReceiver { inner: self.inner }
	}
}

impl<T> MailboxSender<T> {
	/// Enqueues one message at the back of the queue.
	pub fn send(&self, msg: T) -> Result<(), MailboxSendError> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(MailboxSendError::Closed);
		}
		state.queue.push_back(msg);
		drop(state);
		self.inner.notify_recv.notify_one();
		Ok(())
	}

	/// Requests mailbox closure. The receiver drains queued items then returns `None`.
	pub fn close(&self) {
		self.inner.state.lock().closed = true;
		self.inner.notify_recv.notify_one();
	}

	/// Returns true once [`Self::close`] has been called.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Returns current queue length.
	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	/// Returns true when no messages are queued.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T> MailboxReceiver<T> {
	/// Receives one message. Returns `None` once the mailbox is closed and drained.
	pub async fn recv(&self) -> Option<T> {
		loop {
			// Register before checking the queue to avoid a lost wakeup between
			// releasing the lock and awaiting.
			let notified = self.inner.notify_recv.notified();
			{
				let mut state = self.inner.state.lock();
				if let Some(msg) = state.queue.pop_front() {
					return Some(msg);
				}
				if state.closed {
					return None;
				}
			}
			notified.await;
		}
	}

	/// Drops every queued message without processing it.
	pub fn discard_pending(&self) -> usize {
		let mut state = self.inner.state.lock();
		let count = state.queue.len();
		state.queue.clear();
		count
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn delivers_in_fifo_order() {
		let mailbox = Mailbox::new();
		let tx = mailbox.sender();
		let rx = mailbox.into_receiver();

		for i in 0..5u32 {
			tx.send(i).unwrap();
		}
		assert_eq!(tx.len(), 5);

		for i in 0..5u32 {
			assert_eq!(rx.recv().await, Some(i));
		}
		assert!(tx.is_empty());
	}

	#[tokio::test]
	async fn close_drains_then_ends() {
		let mailbox = Mailbox::new();
		let tx = mailbox.sender();
		let rx = mailbox.into_receiver();

		tx.send(1u32).unwrap();
		tx.send(2).unwrap();
		tx.close();

		assert_eq!(tx.send(3), Err(MailboxSendError::Closed));
		assert_eq!(rx.recv().await, Some(1));
		assert_eq!(rx.recv().await, Some(2));
		assert_eq!(rx.recv().await, None);
	}

	#[tokio::test]
	async fn recv_wakes_on_send_from_other_task() {
		let mailbox = Mailbox::new();
		let tx = mailbox.sender();
		let rx = mailbox.into_receiver();

		let recv_task = tokio::spawn(async move { rx.recv().await });
		tokio::time::sleep(Duration::from_millis(10)).await;
		tx.send(42u32).unwrap();

		let got = tokio::time::timeout(Duration::from_secs(1), recv_task)
			.await
			.expect("recv should wake after send")
			.unwrap();
		assert_eq!(got, Some(42));
	}

	#[tokio::test]
	async fn recv_wakes_on_close() {
		let mailbox: Mailbox<u32> = Mailbox::new();
		let tx = mailbox.sender();
		let rx = mailbox.into_receiver();

		let recv_task = tokio::spawn(async move { rx.recv().await });
		tokio::time::sleep(Duration::from_millis(10)).await;
		tx.close();

		let got = tokio::time::timeout(Duration::from_secs(1), recv_task)
			.await
			.expect("recv should wake after close")
			.unwrap();
		assert_eq!(got, None);
	}

	#[test]
	fn discard_pending_empties_queue() {
		let mailbox = Mailbox::new();
		let tx = mailbox.sender();
		let rx = mailbox.into_receiver();
		tx.send("a").unwrap();
		tx.send("b").unwrap();
		assert_eq!(rx.discard_pending(), 2);
		assert!(tx.is_empty());
	}
}
