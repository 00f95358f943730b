//! `sync_wait`: block the calling thread on a computation.
//!
//! A per-call [`RunLoop`] is driven on the calling thread while the
//! connected operation runs; the receiver records the completion and
//! finishes the loop. The receiver's environment exposes the loop's
//! scheduler as both the current and the delegatee scheduler, so work the
//! computation wants to run "here" lands on this thread.
//!
//! `sync_wait` installs no stop callback: it cannot be cancelled from
//! outside.

use std::{pin::pin, sync::Arc};

use headwater::{
	env::{GetDelegateeScheduler, GetScheduler},
	erased::AnyScheduler,
	Completion, Env, Error, OperationState, Receiver, RunLoop, Sender,
};
use parking_lot::Mutex;

/// Runs `sender` to completion on the calling thread.
///
/// **Returns** `Ok(Some(value))` for a value completion, `Ok(None)` for a
/// stopped completion, and `Err(error)` for an error completion — except
/// that an error wrapping a captured panic is resumed on the calling thread
/// instead.
///
/// # Panics
///
/// Panics (by resumption) when the computation buffered a panic from user
/// code.
pub fn sync_wait<S: Sender>(sender: S) -> Result<Option<S::Value>, Error> {
	let run_loop = RunLoop::new();
	let outcome = Arc::new(Mutex::new(None));
	let scheduler = AnyScheduler::new(run_loop.scheduler());
	let env = Env::new()
		.with::<GetScheduler>(scheduler.clone())
		.with::<GetDelegateeScheduler>(scheduler);
	let receiver = BlockingReceiver {
		outcome: outcome.clone(),
		run_loop: run_loop.clone(),
		env,
	};
	let mut operation = pin!(sender.connect(receiver));
	operation.as_mut().start();
	run_loop.run();
	let completion = outcome
		.lock()
		.take()
		.expect("the run loop finished without a completion");
	match completion {
		Completion::Value(value) => Ok(Some(value)),
		Completion::Stopped => Ok(None),
		Completion::Error(error) => Err(error.resume_panic()),
	}
}

/// [`sync_wait`] under its wider surface name; with typed senders the value
/// is already a single signature.
pub fn sync_wait_with_variant<S: Sender>(sender: S) -> Result<Option<S::Value>, Error> {
	sync_wait(sender)
}

struct BlockingReceiver<T> {
	outcome: Arc<Mutex<Option<Completion<T>>>>,
	run_loop: RunLoop,
	env: Env,
}

impl<T> BlockingReceiver<T> {
	fn finish(self, completion: Completion<T>) {
		*self.outcome.lock() = Some(completion);
		self.run_loop.finish();
	}
}

impl<T: Send + 'static> Receiver<T> for BlockingReceiver<T> {
	fn set_value(self, value: T) {
		self.finish(Completion::Value(value));
	}

	fn set_error(self, error: Error) {
		self.finish(Completion::Error(error));
	}

	fn set_stopped(self) {
		self.finish(Completion::Stopped);
	}

	fn env(&self) -> Env {
		self.env.clone()
	}
}
