//! The refcounted record behind `split` and `ensure_started`.
//!
//! One child operation, started at most once, fans its single completion out
//! to any number of downstream consumers. Consumers waiting for the
//! completion sit in a mutex-guarded list; publishing swaps the list for its
//! *closed* variant (the tombstone), so a consumer registering afterwards is
//! notified synchronously from its own `start`, and a stop callback racing
//! the publication can observe exactly one of the two states.
//!
//! Memory is managed by `Arc`; the *watcher* count tracks the semantic
//! audience (outstanding handles plus connected consumer states). When the
//! last watcher detaches, the internal stop source fires, and a child that
//! was never started is reclaimed on the spot.

use core::{
	pin::Pin,
	sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::sync::Arc;

use headwater::{
	env::GetStopToken,
	stop::{StopCallback, StopSource, StopToken},
	Completion, Env, Error, OperationState, Receiver, Sender,
};
use parking_lot::Mutex;
use tracing::trace;

type ChildOperation<S> = <S as Sender>::Operation<SharedReceiver<S>>;

pub(crate) struct SharedState<S: Sender> {
	/// Outstanding handles plus connected consumer states.
	watchers: AtomicUsize,
	started: AtomicBool,
	stop_source: StopSource,
	result: Mutex<Option<Completion<S::Value>>>,
	waiters: Mutex<WaiterList>,
	child: Mutex<Option<Pin<Box<ChildOperation<S>>>>>,
	env: Env,
}

enum WaiterList {
	Open(Vec<Arc<dyn Waiter>>),
	/// The tombstone: the completion has been published; later registrants
	/// are notified synchronously.
	Closed,
}

trait Waiter: Send + Sync {
	fn notify(&self);
}

pub(crate) enum Admission {
	Added,
	AlreadyComplete,
	StopRequested,
}

impl<S: Sender> SharedState<S> {
	pub(crate) fn new(sender: S) -> Arc<Self> {
		let stop_source = StopSource::new();
		let env = Env::new().with::<GetStopToken>(stop_source.token());
		let state = Arc::new(Self {
			watchers: AtomicUsize::new(1),
			started: AtomicBool::new(false),
			stop_source,
			result: Mutex::new(None),
			waiters: Mutex::new(WaiterList::Open(Vec::new())),
			child: Mutex::new(None),
			env,
		});
		let operation = Box::pin(sender.connect(SharedReceiver {
			state: state.clone(),
		}));
		*state.child.lock() = Some(operation);
		state
	}

	/// Starts the child the first time this is called; later calls are
	/// no-ops. A stop that was requested before the first start publishes an
	/// immediate stopped completion instead.
	pub(crate) fn try_start(&self) {
		if self.started.swap(true, Ordering::AcqRel) {
			return;
		}
		if self.stop_source.stop_requested() {
			self.publish();
			return;
		}
		trace!("starting shared child operation");
		let mut child = self.child.lock();
		if let Some(operation) = child.as_mut() {
			operation.as_mut().start();
		}
	}

	fn complete(&self, completion: Completion<S::Value>) {
		*self.result.lock() = Some(completion);
		self.publish();
	}

	fn publish(&self) {
		let drained = {
			let mut waiters = self.waiters.lock();
			match core::mem::replace(&mut *waiters, WaiterList::Closed) {
				WaiterList::Open(drained) => drained,
				WaiterList::Closed => Vec::new(),
			}
		};
		trace!(waiters = drained.len(), "publishing shared completion");
		for waiter in drained {
			waiter.notify();
		}
	}

	fn admit(&self, waiter: Arc<dyn Waiter>, token: &StopToken) -> Admission {
		let mut waiters = self.waiters.lock();
		match &mut *waiters {
			WaiterList::Closed => Admission::AlreadyComplete,
			WaiterList::Open(_) if token.stop_requested() => Admission::StopRequested,
			WaiterList::Open(list) => {
				list.push(waiter);
				Admission::Added
			}
		}
	}

	fn remove_waiter(&self, target: *const ()) -> bool {
		let mut waiters = self.waiters.lock();
		let WaiterList::Open(list) = &mut *waiters else {
			return false;
		};
		let before = list.len();
		list.retain(|waiter| Arc::as_ptr(waiter) as *const () != target);
		before != list.len()
	}

	pub(crate) fn attach(&self) {
		self.watchers.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn detach(&self) {
		if self.watchers.fetch_sub(1, Ordering::AcqRel) != 1 {
			return;
		}
		// The child has no remaining audience.
		trace!("last watcher detached from shared state");
		self.stop_source.request_stop();
		if !self.started.load(Ordering::Acquire) {
			// Never started: reclaim the child operation, and with it the
			// receiver's reference back to this record.
			*self.child.lock() = None;
		}
	}
}

/// The receiver the shared child completes into.
pub(crate) struct SharedReceiver<S: Sender> {
	state: Arc<SharedState<S>>,
}

impl<S: Sender> Receiver<S::Value> for SharedReceiver<S> {
	fn set_value(self, value: S::Value) {
		self.state.complete(Completion::Value(value));
	}

	fn set_error(self, error: Error) {
		self.state.complete(Completion::Error(error));
	}

	fn set_stopped(self) {
		self.state.complete(Completion::Stopped);
	}

	fn env(&self) -> Env {
		self.state.env.clone()
	}
}

/// How a consumer extracts the buffered completion: `split` clones it out,
/// `ensure_started` moves it out.
pub(crate) type Deliver<S> =
	fn(&SharedState<S>) -> Option<Completion<<S as Sender>::Value>>;

pub(crate) fn cloned_completion<S: Sender>(
	state: &SharedState<S>,
) -> Option<Completion<S::Value>>
where
	S::Value: Clone,
{
	state.result.lock().clone()
}

pub(crate) fn taken_completion<S: Sender>(
	state: &SharedState<S>,
) -> Option<Completion<S::Value>> {
	state.result.lock().take()
}

struct ConsumerNode<S: Sender, R> {
	state: Arc<SharedState<S>>,
	receiver: Mutex<Option<R>>,
	stop_callback: Mutex<Option<StopCallback>>,
	deliver: Deliver<S>,
}

impl<S: Sender, R: Receiver<S::Value>> ConsumerNode<S, R> {
	/// Runs from the stop callback: withdraw from the waiter list and
	/// complete stopped locally. A closed list means the publication path
	/// owns the notification instead.
	fn on_stop(&self) {
		if self.state.remove_waiter(self as *const Self as *const ()) {
			if let Some(receiver) = self.receiver.lock().take() {
				receiver.set_stopped();
			}
		}
	}
}

impl<S: Sender, R: Receiver<S::Value>> Waiter for ConsumerNode<S, R> {
	fn notify(&self) {
		// Deregister first; a stop request racing this notification settles
		// against the already-closed waiter list and backs off.
		*self.stop_callback.lock() = None;
		let receiver = self.receiver.lock().take();
		let Some(receiver) = receiver else { return };
		match (self.deliver)(&self.state) {
			Some(Completion::Value(value)) => receiver.set_value(value),
			Some(Completion::Error(error)) => receiver.set_error(error),
			Some(Completion::Stopped) | None => receiver.set_stopped(),
		}
	}
}

/// The downstream operation state shared by `split` and `ensure_started`.
pub struct SharedConsumer<S: Sender, R> {
	node: Arc<ConsumerNode<S, R>>,
	state: Arc<SharedState<S>>,
}

pub(crate) fn consumer<S: Sender, R: Receiver<S::Value>>(
	state: &Arc<SharedState<S>>,
	receiver: R,
	deliver: Deliver<S>,
) -> SharedConsumer<S, R> {
	state.attach();
	SharedConsumer {
		node: Arc::new(ConsumerNode {
			state: state.clone(),
			receiver: Mutex::new(Some(receiver)),
			stop_callback: Mutex::new(None),
			deliver,
		}),
		state: state.clone(),
	}
}

impl<S: Sender, R: Receiver<S::Value>> OperationState for SharedConsumer<S, R> {
	fn start(self: Pin<&mut Self>) {
		let this = self.get_mut();
		let token = {
			let receiver = this.node.receiver.lock();
			let Some(receiver) = receiver.as_ref() else {
				return;
			};
			receiver.env().stop_token()
		};
		let node = this.node.clone();
		let callback = token.on_stop(move || node.on_stop());
		*this.node.stop_callback.lock() = Some(callback);
		this.state.try_start();
		match this.state.admit(this.node.clone(), &token) {
			Admission::Added => {}
			Admission::AlreadyComplete => this.node.notify(),
			Admission::StopRequested => {
				if let Some(receiver) = this.node.receiver.lock().take() {
					receiver.set_stopped();
				}
			}
		}
	}
}

impl<S: Sender, R> Drop for SharedConsumer<S, R> {
	fn drop(&mut self) {
		self.state.detach();
	}
}
