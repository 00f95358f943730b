//! `start_detached` and `execute`: fire-and-forget consumers.
//!
//! The operation state lives on the heap and reclaims itself after its one
//! completion: a completion arriving while `start` is still on the caller's
//! stack is reclaimed by the caller, a later one by the completing thread.
//! The two hand-off paths are serialised through the slot mutex.

use core::marker::PhantomData;
use std::{process::abort, sync::Arc};

use headwater::{Error, OperationState, Receiver, Scheduler, Sender};
use parking_lot::Mutex;
use tracing::error;

use crate::{adaptors::then::then, factories::schedule};

type DetachedOperation = core::pin::Pin<Box<dyn OperationState>>;

enum DetachedStage {
	Running,
	Parked(DetachedOperation),
	Completed,
}

struct DetachedSlot {
	stage: Mutex<DetachedStage>,
}

/// Connects and starts `sender` with a receiver that discards the value,
/// aborts the process on an error (there is no consumer left to receive
/// it), and ignores a stopped completion.
pub fn start_detached<S: Sender>(sender: S) {
	let slot = Arc::new(DetachedSlot {
		stage: Mutex::new(DetachedStage::Running),
	});
	let mut operation: DetachedOperation = Box::pin(sender.connect(DetachedReceiver::<S::Value> {
		slot: slot.clone(),
		_value: PhantomData,
	}));
	operation.as_mut().start();
	let mut stage = slot.stage.lock();
	if matches!(*stage, DetachedStage::Completed) {
		drop(stage);
		drop(operation);
	} else {
		*stage = DetachedStage::Parked(operation);
	}
}

/// Runs `task` on `scheduler`'s execution context, detached.
pub fn execute<Sch, F>(scheduler: &Sch, task: F)
where
	Sch: Scheduler,
	F: FnOnce() + Send + 'static,
{
	start_detached(then(schedule(scheduler), move |()| task()));
}

struct DetachedReceiver<T> {
	slot: Arc<DetachedSlot>,
	_value: PhantomData<fn(T)>,
}

impl<T> DetachedReceiver<T> {
	fn reclaim(self) {
		let parked = {
			let mut stage = self.slot.stage.lock();
			match core::mem::replace(&mut *stage, DetachedStage::Completed) {
				DetachedStage::Parked(operation) => Some(operation),
				DetachedStage::Running | DetachedStage::Completed => None,
			}
		};
		// Dropped outside the lock; the operation is inert once completed.
		drop(parked);
	}
}

impl<T: Send + 'static> Receiver<T> for DetachedReceiver<T> {
	fn set_value(self, value: T) {
		drop(value);
		self.reclaim();
	}

	fn set_error(self, error: Error) {
		error!(%error, "detached operation completed with an error");
		abort();
	}

	fn set_stopped(self) {
		self.reclaim();
	}
}
