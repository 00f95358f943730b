//! Scheduler affinity: `schedule_from` and its pipeable spelling
//! `continue_on`.
//!
//! `schedule_from(sch, child)` buffers the child's completion, hops onto
//! `sch` through its schedule sender, and replays the buffered completion on
//! the new context. All three channels are replayed there, so the adaptor
//! advertises `sch` as its completion scheduler on every channel.

use core::pin::Pin;
use std::sync::Arc;

use headwater::{
	erased::AnyScheduler, Channel, Completion, Env, Error, OperationState, Receiver, Scheduler,
	Sender,
};
use parking_lot::Mutex;
use pin_project::pin_project;

/// Completes with `child`'s completion, on `scheduler`'s execution context.
pub fn schedule_from<Sch: Scheduler, C: Sender>(
	scheduler: Sch,
	child: C,
) -> ScheduleFrom<Sch, C> {
	ScheduleFrom { scheduler, child }
}

/// `continue_on(child, sch)` is `schedule_from(sch, child)`.
pub fn continue_on<C: Sender, Sch: Scheduler>(child: C, scheduler: Sch) -> ScheduleFrom<Sch, C> {
	schedule_from(scheduler, child)
}

#[derive(Clone, Debug)]
pub struct ScheduleFrom<Sch, C> {
	scheduler: Sch,
	child: C,
}

/// The hop operation: `scheduler`'s schedule sender connected to [`Replay`].
type Hop<Sch, T, R> =
	<<Sch as Scheduler>::Sender as Sender>::Operation<Replay<Sch, T, R>>;

pub struct HopState<Sch: Scheduler, T: Send + 'static, R: Receiver<T>> {
	result: Mutex<Option<Completion<T>>>,
	parked: Mutex<Option<Pin<Box<Hop<Sch, T, R>>>>>,
	receiver: Mutex<Option<R>>,
	scheduler: Sch,
	env: Env,
}

impl<Sch, C> Sender for ScheduleFrom<Sch, C>
where
	Sch: Scheduler,
	C: Sender,
{
	type Value = C::Value;

	type Operation<R> = ScheduleFromOperation<
		C::Operation<Buffer<Sch, C::Value, R>>,
		HopState<Sch, C::Value, R>,
	>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		let env = receiver.env();
		let state = Arc::new(HopState {
			result: Mutex::new(None),
			parked: Mutex::new(None),
			receiver: Mutex::new(Some(receiver)),
			scheduler: self.scheduler,
			env,
		});
		ScheduleFromOperation {
			child: self.child.connect(Buffer {
				state: state.clone(),
			}),
			state,
		}
	}

	fn completion_scheduler(&self, _channel: Channel) -> Option<AnyScheduler> {
		Some(AnyScheduler::new(self.scheduler.clone()))
	}
}

#[pin_project]
pub struct ScheduleFromOperation<O, S> {
	#[pin]
	child: O,
	state: Arc<S>,
}

impl<O, S> OperationState for ScheduleFromOperation<O, S>
where
	O: OperationState,
	S: Send + Sync + 'static,
{
	fn start(self: Pin<&mut Self>) {
		self.project().child.start();
	}
}

/// The child-side receiver: buffers the completion, then starts the hop.
pub struct Buffer<Sch: Scheduler, T: Send + 'static, R: Receiver<T>> {
	state: Arc<HopState<Sch, T, R>>,
}

impl<Sch, T, R> Buffer<Sch, T, R>
where
	Sch: Scheduler,
	T: Send + 'static,
	R: Receiver<T>,
{
	fn hop(self, completion: Completion<T>) {
		// `state` outlives the start call below even if it completes the
		// outer receiver synchronously and the owner begins teardown.
		let state = self.state;
		*state.result.lock() = Some(completion);
		let mut operation = Box::pin(state.scheduler.schedule().connect(Replay {
			state: state.clone(),
		}));
		operation.as_mut().start();
		*state.parked.lock() = Some(operation);
	}
}

impl<Sch, T, R> Receiver<T> for Buffer<Sch, T, R>
where
	Sch: Scheduler,
	T: Send + 'static,
	R: Receiver<T>,
{
	fn set_value(self, value: T) {
		self.hop(Completion::Value(value));
	}

	fn set_error(self, error: Error) {
		self.hop(Completion::Error(error));
	}

	fn set_stopped(self) {
		self.hop(Completion::Stopped);
	}

	fn env(&self) -> Env {
		self.state.env.clone()
	}
}

/// The hop-side receiver: replays the buffered completion on the new
/// context.
pub struct Replay<Sch: Scheduler, T: Send + 'static, R: Receiver<T>> {
	state: Arc<HopState<Sch, T, R>>,
}

impl<Sch, T, R> Receiver<()> for Replay<Sch, T, R>
where
	Sch: Scheduler,
	T: Send + 'static,
	R: Receiver<T>,
{
	fn set_value(self, (): ()) {
		let receiver = self.state.receiver.lock().take();
		let Some(receiver) = receiver else { return };
		let completion = self
			.state
			.result
			.lock()
			.take()
			.expect("completion buffered before the hop was started");
		match completion {
			Completion::Value(value) => receiver.set_value(value),
			Completion::Error(error) => receiver.set_error(error),
			Completion::Stopped => receiver.set_stopped(),
		}
	}

	fn set_error(self, error: Error) {
		if let Some(receiver) = self.state.receiver.lock().take() {
			receiver.set_error(error);
		}
	}

	fn set_stopped(self) {
		if let Some(receiver) = self.state.receiver.lock().take() {
			receiver.set_stopped();
		}
	}

	fn env(&self) -> Env {
		self.state.env.clone()
	}
}
