//! Dynamic continuations: `let_value`, `let_error`, `let_stopped`.
//!
//! Each targets one completion channel. On that channel it invokes the bound
//! function with the completion's payload, connects the sender it returns,
//! and splices the new operation into the chain; the other two channels are
//! forwarded unchanged.
//!
//! The continuation receiver rewires the environment: its scheduler entry
//! becomes the child's advertised completion scheduler for the targeted
//! channel (or is removed when the child advertises none), and the domain
//! entry is removed so the spliced sender's domain is re-derived.

use core::{any::Any, marker::PhantomData, pin::Pin};
use std::{
	panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
	sync::Arc,
};

use headwater::{
	env::{GetDomain, GetScheduler},
	erased::AnyScheduler,
	Channel, Env, Error, OperationState, Receiver, Sender,
};
use parking_lot::Mutex;
use pin_project::pin_project;

/// On value completion, runs `bind` and splices the returned sender in.
pub fn let_value<C, F, N>(child: C, bind: F) -> LetValue<C, F, N>
where
	C: Sender,
	N: Sender,
	F: FnOnce(C::Value) -> N + Send + 'static,
{
	LetValue {
		child,
		bind,
		_next: PhantomData,
	}
}

/// On error completion, runs `bind` and splices the returned sender in.
pub fn let_error<C, F, N>(child: C, bind: F) -> LetError<C, F, N>
where
	C: Sender,
	N: Sender<Value = C::Value>,
	F: FnOnce(Error) -> N + Send + 'static,
{
	LetError {
		child,
		bind,
		_next: PhantomData,
	}
}

/// On stopped completion, runs `bind` and splices the returned sender in.
pub fn let_stopped<C, F, N>(child: C, bind: F) -> LetStopped<C, F, N>
where
	C: Sender,
	N: Sender<Value = C::Value>,
	F: FnOnce() -> N + Send + 'static,
{
	LetStopped {
		child,
		bind,
		_next: PhantomData,
	}
}

/// The pinned-boxed spliced operation, parked until the outer operation is
/// torn down.
type Spliced<N, R> =
	Pin<Box<<N as Sender>::Operation<LetContinuation<<N as Sender>::Value, R>>>>;

type ParkingSlot<N, R> = Arc<Mutex<Option<Spliced<N, R>>>>;

/// The operation state of a `let_*` adaptor: the child operation plus the
/// slot the spliced continuation is parked in.
#[pin_project]
pub struct LetOperation<O, P> {
	#[pin]
	child: O,
	parked: Arc<Mutex<Option<P>>>,
}

impl<O: OperationState, P: Send> OperationState for LetOperation<O, P> {
	fn start(self: Pin<&mut Self>) {
		self.project().child.start();
	}
}

/// The downstream receiver of a spliced sender.
///
/// Holds the outer receiver in a shared cell so a `connect` that unwinds can
/// still route the failure out through it.
pub struct LetContinuation<T, R> {
	receiver: Arc<Mutex<Option<R>>>,
	scheduler: Option<AnyScheduler>,
	_marker: PhantomData<fn(T)>,
}

impl<T, R> Receiver<T> for LetContinuation<T, R>
where
	T: Send + 'static,
	R: Receiver<T>,
{
	fn set_value(self, value: T) {
		if let Some(receiver) = self.receiver.lock().take() {
			receiver.set_value(value);
		}
	}

	fn set_error(self, error: Error) {
		if let Some(receiver) = self.receiver.lock().take() {
			receiver.set_error(error);
		}
	}

	fn set_stopped(self) {
		if let Some(receiver) = self.receiver.lock().take() {
			receiver.set_stopped();
		}
	}

	fn env(&self) -> Env {
		let receiver = self.receiver.lock();
		let Some(receiver) = receiver.as_ref() else {
			return Env::new();
		};
		let env = receiver.env().without::<GetDomain>();
		match &self.scheduler {
			Some(scheduler) => env.with::<GetScheduler>(scheduler.clone()),
			None => env.without::<GetScheduler>(),
		}
	}
}

/// Connects and starts the sender produced by a `let_*` binding, completing
/// the outer receiver on failure.
fn splice<N, R>(
	bound: Result<N, Box<dyn Any + Send>>,
	receiver: R,
	scheduler: Option<AnyScheduler>,
	parked: &Mutex<Option<Spliced<N, R>>>,
) where
	N: Sender,
	R: Receiver<N::Value>,
{
	let next = match bound {
		Ok(next) => next,
		Err(payload) => return receiver.set_error(Error::from_panic(payload)),
	};
	let cell = Arc::new(Mutex::new(Some(receiver)));
	let continuation = LetContinuation {
		receiver: cell.clone(),
		scheduler,
		_marker: PhantomData,
	};
	let connected = catch_unwind(AssertUnwindSafe(move || Box::pin(next.connect(continuation))));
	let mut operation = match connected {
		Ok(operation) => operation,
		Err(payload) => {
			return match cell.lock().take() {
				Some(receiver) => receiver.set_error(Error::from_panic(payload)),
				None => resume_unwind(payload),
			}
		}
	};
	operation.as_mut().start();
	// The spliced operation keeps its address until the outer operation is
	// torn down, which the protocol orders after completion.
	*parked.lock() = Some(operation);
}

#[derive(Clone, Debug)]
pub struct LetValue<C, F, N> {
	child: C,
	bind: F,
	_next: PhantomData<fn() -> N>,
}

impl<C, F, N> Sender for LetValue<C, F, N>
where
	C: Sender,
	N: Sender,
	F: FnOnce(C::Value) -> N + Send + 'static,
{
	type Value = N::Value;

	type Operation<R> = LetOperation<
		C::Operation<LetValueReceiver<C::Value, N, R, F>>,
		Spliced<N, R>,
	>
	where
		R: Receiver<N::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<N::Value>,
	{
		let scheduler = self.child.completion_scheduler(Channel::Value);
		let parked = Arc::new(Mutex::new(None));
		LetOperation {
			child: self.child.connect(LetValueReceiver {
				bind: self.bind,
				receiver,
				scheduler,
				parked: parked.clone(),
				_marker: PhantomData,
			}),
			parked,
		}
	}
}

pub struct LetValueReceiver<T, N: Sender, R: Receiver<N::Value>, F> {
	bind: F,
	receiver: R,
	scheduler: Option<AnyScheduler>,
	parked: ParkingSlot<N, R>,
	_marker: PhantomData<fn(T)>,
}

impl<T, N, R, F> Receiver<T> for LetValueReceiver<T, N, R, F>
where
	T: Send + 'static,
	N: Sender,
	R: Receiver<N::Value>,
	F: FnOnce(T) -> N + Send + 'static,
{
	fn set_value(self, value: T) {
		let Self {
			bind,
			receiver,
			scheduler,
			parked,
			..
		} = self;
		let bound = catch_unwind(AssertUnwindSafe(move || bind(value)));
		splice(bound, receiver, scheduler, &parked);
	}

	fn set_error(self, error: Error) {
		self.receiver.set_error(error);
	}

	fn set_stopped(self) {
		self.receiver.set_stopped();
	}

	fn env(&self) -> Env {
		self.receiver.env()
	}
}

#[derive(Clone, Debug)]
pub struct LetError<C, F, N> {
	child: C,
	bind: F,
	_next: PhantomData<fn() -> N>,
}

impl<C, F, N> Sender for LetError<C, F, N>
where
	C: Sender,
	N: Sender<Value = C::Value>,
	F: FnOnce(Error) -> N + Send + 'static,
{
	type Value = C::Value;

	type Operation<R> = LetOperation<
		C::Operation<LetErrorReceiver<N, R, F>>,
		Spliced<N, R>,
	>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		let scheduler = self.child.completion_scheduler(Channel::Error);
		let parked = Arc::new(Mutex::new(None));
		LetOperation {
			child: self.child.connect(LetErrorReceiver {
				bind: self.bind,
				receiver,
				scheduler,
				parked: parked.clone(),
			}),
			parked,
		}
	}
}

pub struct LetErrorReceiver<N: Sender, R: Receiver<N::Value>, F> {
	bind: F,
	receiver: R,
	scheduler: Option<AnyScheduler>,
	parked: ParkingSlot<N, R>,
}

impl<N, R, F> Receiver<N::Value> for LetErrorReceiver<N, R, F>
where
	N: Sender,
	R: Receiver<N::Value>,
	F: FnOnce(Error) -> N + Send + 'static,
{
	fn set_value(self, value: N::Value) {
		self.receiver.set_value(value);
	}

	fn set_error(self, error: Error) {
		let Self {
			bind,
			receiver,
			scheduler,
			parked,
		} = self;
		let bound = catch_unwind(AssertUnwindSafe(move || bind(error)));
		splice(bound, receiver, scheduler, &parked);
	}

	fn set_stopped(self) {
		self.receiver.set_stopped();
	}

	fn env(&self) -> Env {
		self.receiver.env()
	}
}

#[derive(Clone, Debug)]
pub struct LetStopped<C, F, N> {
	child: C,
	bind: F,
	_next: PhantomData<fn() -> N>,
}

impl<C, F, N> Sender for LetStopped<C, F, N>
where
	C: Sender,
	N: Sender<Value = C::Value>,
	F: FnOnce() -> N + Send + 'static,
{
	type Value = C::Value;

	type Operation<R> = LetOperation<
		C::Operation<LetStoppedReceiver<N, R, F>>,
		Spliced<N, R>,
	>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		let scheduler = self.child.completion_scheduler(Channel::Stopped);
		let parked = Arc::new(Mutex::new(None));
		LetOperation {
			child: self.child.connect(LetStoppedReceiver {
				bind: self.bind,
				receiver,
				scheduler,
				parked: parked.clone(),
			}),
			parked,
		}
	}
}

pub struct LetStoppedReceiver<N: Sender, R: Receiver<N::Value>, F> {
	bind: F,
	receiver: R,
	scheduler: Option<AnyScheduler>,
	parked: ParkingSlot<N, R>,
}

impl<N, R, F> Receiver<N::Value> for LetStoppedReceiver<N, R, F>
where
	N: Sender,
	R: Receiver<N::Value>,
	F: FnOnce() -> N + Send + 'static,
{
	fn set_value(self, value: N::Value) {
		self.receiver.set_value(value);
	}

	fn set_error(self, error: Error) {
		self.receiver.set_error(error);
	}

	fn set_stopped(self) {
		let Self {
			bind,
			receiver,
			scheduler,
			parked,
		} = self;
		let bound = catch_unwind(AssertUnwindSafe(bind));
		splice(bound, receiver, scheduler, &parked);
	}

	fn env(&self) -> Env {
		self.receiver.env()
	}
}
