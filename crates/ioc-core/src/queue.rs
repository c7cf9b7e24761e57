//! Generic bounded FIFO queue shared by the EVT, DAT, and CMD primitives.
//!
//! EVT and DAT backpressure and CMD's single-in-flight-slot discipline are
//! both "bounded FIFO with a blocking policy on push" — this module
//! implements that once rather than duplicating the wait/notify dance per
//! primitive. Primitive-specific semantics (error kinds, timeout vs.
//! fullness-error on expiry) live in `delivery::*`.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, Notify};
use tokio::time::Instant;

use ioc_proto::Blocking;

use crate::link::LinkState;

/// Outcome of a non-blocking push/pop attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryOutcome {
	/// The queue accepted the item (or had one to hand back).
	Ready,
	/// The queue was full (or empty); caller must decide how to react.
	WouldBlock,
}

/// Outcome of a blocking `push`.
#[derive(Debug)]
pub enum PushOutcome<T> {
	/// The item was accepted onto the queue.
	Accepted,
	/// `blocking` gave up (immediately for `NonBlock`, after `d` for `Timeout`)
	/// before room opened up. The item is handed back.
	WouldBlock(T),
	/// The watched link left `Connected` while this call was waiting. The
	/// item is handed back; the caller has nowhere left to route it.
	Closed(T),
}

/// Outcome of a blocking `pop`.
#[derive(Debug)]
pub enum PopOutcome<T> {
	/// An item was available.
	Item(T),
	/// `blocking` gave up before an item arrived.
	WouldBlock,
	/// The watched link left `Connected` while this call was waiting.
	Closed,
}

/// Outcome of a blocking `wait_drained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
	/// The queue was (or became) empty.
	Drained,
	/// `blocking` gave up before the queue emptied.
	WouldBlock,
	/// The watched link left `Connected` while this call was waiting.
	Closed,
}

/// Resolves once `cancel`'s link has left `Connected`, or never if `cancel`
/// is `None`. Racing this against a `Notify`/`timeout_at` future is how
/// `push`/`pop`/`wait_drained` stop a caller from blocking forever on a
/// queue whose owning link was cascaded away out from under it.
async fn wait_for_close(cancel: &mut Option<watch::Receiver<LinkState>>) {
	match cancel {
		None => std::future::pending().await,
		Some(rx) => loop {
			if !matches!(*rx.borrow(), LinkState::Attaching | LinkState::Connected) {
				return;
			}
			if rx.changed().await.is_err() {
				return;
			}
		},
	}
}

/// A bounded, mutex-protected FIFO with `Notify`-based wakeups.
///
/// Not a `tokio::sync::mpsc` channel: both ends need the ability to *peek*
/// fullness/emptiness without consuming (`len`, `is_full`), and CMD reuses
/// this as a 1-slot rendezvous, which `mpsc` models awkwardly since it has
/// no "is anyone currently holding the single permit" query.
#[derive(Debug)]
pub struct BoundedQueue<T> {
	state: Mutex<VecDeque<T>>,
	capacity: usize,
	not_full: Notify,
	not_empty: Notify,
}

impl<T> BoundedQueue<T> {
	/// Create a queue that holds at most `capacity` items.
	#[must_use]
	pub fn new(capacity: usize) -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
			capacity,
			not_full: Notify::new(),
			not_empty: Notify::new(),
		})
	}

	/// Current number of queued items.
	pub async fn len(&self) -> usize {
		self.state.lock().await.len()
	}

	/// Whether the queue currently holds no items.
	pub async fn is_empty(&self) -> bool {
		self.state.lock().await.is_empty()
	}

	/// Attempt to push without waiting.
	pub async fn try_push(&self, item: T) -> Result<(), T> {
		let mut guard = self.state.lock().await;
		if guard.len() >= self.capacity {
			return Err(item);
		}
		guard.push_back(item);
		drop(guard);
		self.not_empty.notify_one();
		Ok(())
	}

	/// Attempt to pop without waiting.
	pub async fn try_pop(&self) -> Option<T> {
		let mut guard = self.state.lock().await;
		let item = guard.pop_front();
		if item.is_some() {
			drop(guard);
			self.not_full.notify_one();
		}
		item
	}

	/// Push according to a blocking discipline, waiting past `deadline` only
	/// for `Blocking::MayBlock`/`Timeout`. `cancel`, if given, is a link's
	/// state watch: should that link leave `Connected` while this call
	/// waits, the wait is abandoned and the item handed back as `Closed`
	/// instead of hanging until `blocking` itself would give up (or forever,
	/// under `MayBlock`).
	pub async fn push(&self, mut item: T, blocking: Blocking, mut cancel: Option<watch::Receiver<LinkState>>) -> PushOutcome<T> {
		let deadline = match blocking {
			Blocking::Timeout(d) => Some(Instant::now() + d),
			_ => None,
		};
		loop {
			match self.try_push(item).await {
				Ok(()) => return PushOutcome::Accepted,
				Err(back) => item = back,
			}
			match blocking {
				Blocking::NonBlock => return PushOutcome::WouldBlock(item),
				Blocking::MayBlock => {
					tokio::select! {
						() = self.not_full.notified() => {},
						() = wait_for_close(&mut cancel) => return PushOutcome::Closed(item),
					}
				}
				Blocking::Timeout(_) => {
					let deadline = deadline.expect("set above for Blocking::Timeout");
					tokio::select! {
						res = tokio::time::timeout_at(deadline, self.not_full.notified()) => {
							if res.is_err() {
								return PushOutcome::WouldBlock(item);
							}
						}
						() = wait_for_close(&mut cancel) => return PushOutcome::Closed(item),
					}
				}
			}
		}
	}

	/// Pop according to a blocking discipline. See [`Self::push`] for `cancel`.
	pub async fn pop(&self, blocking: Blocking, mut cancel: Option<watch::Receiver<LinkState>>) -> PopOutcome<T> {
		let deadline = match blocking {
			Blocking::Timeout(d) => Some(Instant::now() + d),
			_ => None,
		};
		loop {
			if let Some(item) = self.try_pop().await {
				return PopOutcome::Item(item);
			}
			match blocking {
				Blocking::NonBlock => return PopOutcome::WouldBlock,
				Blocking::MayBlock => {
					tokio::select! {
						() = self.not_empty.notified() => {},
						() = wait_for_close(&mut cancel) => return PopOutcome::Closed,
					}
				}
				Blocking::Timeout(_) => {
					let deadline = deadline.expect("set above for Blocking::Timeout");
					tokio::select! {
						res = tokio::time::timeout_at(deadline, self.not_empty.notified()) => {
							if res.is_err() {
								return PopOutcome::WouldBlock;
							}
						}
						() = wait_for_close(&mut cancel) => return PopOutcome::Closed,
					}
				}
			}
		}
	}

	/// Wait until the queue is empty, honoring `blocking`. Used by
	/// `forceProcEVT`/`flushDAT` style drains once the worker has consumed
	/// everything. See [`Self::push`] for `cancel`.
	pub async fn wait_drained(&self, blocking: Blocking, mut cancel: Option<watch::Receiver<LinkState>>) -> DrainOutcome {
		let deadline = match blocking {
			Blocking::Timeout(d) => Some(Instant::now() + d),
			_ => None,
		};
		loop {
			if self.is_empty().await {
				return DrainOutcome::Drained;
			}
			match blocking {
				Blocking::NonBlock => return DrainOutcome::WouldBlock,
				Blocking::MayBlock => {
					tokio::select! {
						() = self.not_full.notified() => {},
						() = wait_for_close(&mut cancel) => return DrainOutcome::Closed,
					}
				}
				Blocking::Timeout(_) => {
					let deadline = deadline.expect("set above for Blocking::Timeout");
					tokio::select! {
						res = tokio::time::timeout_at(deadline, self.not_full.notified()) => {
							if res.is_err() {
								return DrainOutcome::WouldBlock;
							}
						}
						() = wait_for_close(&mut cancel) => return DrainOutcome::Closed,
					}
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn push_pop_fifo_order() {
		let q: Arc<BoundedQueue<u32>> = BoundedQueue::new(4);
		assert!(matches!(q.push(1, Blocking::NonBlock, None).await, PushOutcome::Accepted));
		assert!(matches!(q.push(2, Blocking::NonBlock, None).await, PushOutcome::Accepted));
		assert!(matches!(q.pop(Blocking::NonBlock, None).await, PopOutcome::Item(1)));
		assert!(matches!(q.pop(Blocking::NonBlock, None).await, PopOutcome::Item(2)));
	}

	#[tokio::test]
	async fn nonblock_push_fails_when_full() {
		let q: Arc<BoundedQueue<u32>> = BoundedQueue::new(1);
		assert!(matches!(q.push(1, Blocking::NonBlock, None).await, PushOutcome::Accepted));
		assert!(matches!(q.push(2, Blocking::NonBlock, None).await, PushOutcome::WouldBlock(2)));
	}

	#[tokio::test(start_paused = true)]
	async fn timeout_push_waits_then_fails() {
		let q: Arc<BoundedQueue<u32>> = BoundedQueue::new(1);
		assert!(matches!(q.push(1, Blocking::NonBlock, None).await, PushOutcome::Accepted));
		let start = Instant::now();
		let res = q.push(2, Blocking::Timeout(Duration::from_millis(100)), None).await;
		assert!(matches!(res, PushOutcome::WouldBlock(2)));
		assert!(start.elapsed() >= Duration::from_millis(100));
	}

	#[tokio::test]
	async fn mayblock_push_unblocks_after_pop() {
		let q: Arc<BoundedQueue<u32>> = BoundedQueue::new(1);
		assert!(matches!(q.push(1, Blocking::NonBlock, None).await, PushOutcome::Accepted));
		let q2 = q.clone();
		let waiter = tokio::spawn(async move { q2.push(2, Blocking::MayBlock, None).await });
		tokio::task::yield_now().await;
		assert!(matches!(q.pop(Blocking::NonBlock, None).await, PopOutcome::Item(1)));
		assert!(matches!(waiter.await.unwrap(), PushOutcome::Accepted));
		assert!(matches!(q.pop(Blocking::NonBlock, None).await, PopOutcome::Item(2)));
	}

	#[tokio::test]
	async fn push_reports_closed_when_cancel_link_leaves_connected() {
		let (tx, rx) = watch::channel(LinkState::Connected);
		let q: Arc<BoundedQueue<u32>> = BoundedQueue::new(1);
		assert!(matches!(q.push(1, Blocking::NonBlock, None).await, PushOutcome::Accepted));
		let q2 = q.clone();
		let waiter = tokio::spawn(async move { q2.push(2, Blocking::MayBlock, Some(rx)).await });
		tokio::task::yield_now().await;
		tx.send(LinkState::Closed).unwrap();
		assert!(matches!(waiter.await.unwrap(), PushOutcome::Closed(2)));
	}
}
