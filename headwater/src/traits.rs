//! The sender/receiver/operation-state contract.
//!
//! A *sender* describes an asynchronous computation without running it.
//! [`Sender::connect`] pairs it with a *receiver* — the three-channel
//! continuation it will eventually complete into — and yields an *operation
//! state* that owns everything one execution needs. Nothing observable
//! happens until [`OperationState::start`]; after it, exactly one of the
//! receiver's terminal operations runs, on whatever thread the computation's
//! scheduler permits.

use core::pin::Pin;

use crate::{
	env::{Env, ForwardProgressGuarantee},
	erased::AnyScheduler,
	error::Error,
};

/// The consuming continuation of an asynchronous computation.
///
/// Exactly one of the three terminal operations is invoked per connected
/// operation; taking `self` by value makes a second completion unwritable.
/// Terminal operations **must not** unwind.
pub trait Receiver<T>: Send + 'static {
	/// Completes with a value.
	fn set_value(self, value: T);

	/// Completes with an error.
	fn set_error(self, error: Error);

	/// Completes by cooperative cancellation.
	fn set_stopped(self);

	/// The environment queried by the computation this receiver is connected
	/// to.
	fn env(&self) -> Env {
		Env::new()
	}
}

/// One execution of a connected computation.
///
/// The state is pinned from [`start`](`OperationState::start`) until its
/// completion has run, and must be kept alive by its owner until then.
pub trait OperationState: Send {
	/// Begins execution.
	///
	/// # Panics
	///
	/// **May** panic if called more than once.
	fn start(self: Pin<&mut Self>);
}

/// A lazily described asynchronous computation.
///
/// Senders are movable values; connecting consumes them.
pub trait Sender: Send + Sized + 'static {
	/// The payload of this sender's value completion.
	type Value: Send + 'static;

	/// The operation state produced by connecting an `R`.
	type Operation<R>: 'static + OperationState
	where
		R: Receiver<Self::Value>;

	/// Folds this description and `receiver` into an operation state.
	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<Self::Value>;

	/// The scheduler this sender is advertised to complete on for `channel`,
	/// if any.
	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		let _ = channel;
		None
	}
}

/// One of the three completion channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
	Value,
	Error,
	Stopped,
}

/// A handle onto an execution context.
///
/// The value completion of [`schedule`](`Scheduler::schedule`)'s sender runs
/// on that context.
pub trait Scheduler: Clone + Send + Sync + 'static {
	type Sender: Sender<Value = ()>;

	fn schedule(&self) -> Self::Sender;

	fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
		ForwardProgressGuarantee::Concurrent
	}
}

/// A buffered completion, for adaptors that must hold one until it can be
/// replayed.
#[derive(Clone, Debug)]
pub enum Completion<T> {
	Value(T),
	Error(Error),
	Stopped,
}
