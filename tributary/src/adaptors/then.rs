//! Channel-mapping adaptors: `then`, `upon_error`, `upon_stopped`.
//!
//! Each wraps the downstream receiver and runs a user function on exactly
//! one channel, forwarding the other two unchanged. The function runs on
//! the thread the child completed on; an unwinding function becomes an
//! error completion.

use core::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use headwater::{erased::AnyScheduler, Channel, Env, Error, Receiver, Sender};

/// Maps the value channel through `map`.
pub fn then<C, F, U>(child: C, map: F) -> Then<C, F>
where
	C: Sender,
	F: FnOnce(C::Value) -> U + Send + 'static,
	U: Send + 'static,
{
	Then { child, map }
}

/// Maps the error channel into a value through `map`.
pub fn upon_error<C, F>(child: C, map: F) -> UponError<C, F>
where
	C: Sender,
	F: FnOnce(Error) -> C::Value + Send + 'static,
{
	UponError { child, map }
}

/// Maps the stopped channel into a value through `map`.
pub fn upon_stopped<C, F>(child: C, map: F) -> UponStopped<C, F>
where
	C: Sender,
	F: FnOnce() -> C::Value + Send + 'static,
{
	UponStopped { child, map }
}

#[derive(Clone, Debug)]
pub struct Then<C, F> {
	child: C,
	map: F,
}

impl<C, F, U> Sender for Then<C, F>
where
	C: Sender,
	F: FnOnce(C::Value) -> U + Send + 'static,
	U: Send + 'static,
{
	type Value = U;

	type Operation<R> = C::Operation<ThenReceiver<C::Value, U, R, F>>
	where
		R: Receiver<U>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<U>,
	{
		self.child.connect(ThenReceiver {
			receiver,
			map: self.map,
			_marker: PhantomData,
		})
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		self.child.completion_scheduler(channel)
	}
}

pub struct ThenReceiver<T, U, R, F> {
	receiver: R,
	map: F,
	_marker: PhantomData<fn(T) -> U>,
}

impl<T, U, R, F> Receiver<T> for ThenReceiver<T, U, R, F>
where
	T: Send + 'static,
	U: Send + 'static,
	R: Receiver<U>,
	F: FnOnce(T) -> U + Send + 'static,
{
	fn set_value(self, value: T) {
		let Self { receiver, map, .. } = self;
		match catch_unwind(AssertUnwindSafe(move || map(value))) {
			Ok(mapped) => receiver.set_value(mapped),
			Err(payload) => receiver.set_error(Error::from_panic(payload)),
		}
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
pub struct UponError<C, F> {
	child: C,
	map: F,
}

impl<C, F> Sender for UponError<C, F>
where
	C: Sender,
	F: FnOnce(Error) -> C::Value + Send + 'static,
{
	type Value = C::Value;

	type Operation<R> = C::Operation<UponErrorReceiver<C::Value, R, F>>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		self.child.connect(UponErrorReceiver {
			receiver,
			map: self.map,
			_marker: PhantomData,
		})
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		self.child.completion_scheduler(channel)
	}
}

pub struct UponErrorReceiver<T, R, F> {
	receiver: R,
	map: F,
	_marker: PhantomData<fn() -> T>,
}

impl<T, R, F> Receiver<T> for UponErrorReceiver<T, R, F>
where
	T: Send + 'static,
	R: Receiver<T>,
	F: FnOnce(Error) -> T + Send + 'static,
{
	fn set_value(self, value: T) {
		self.receiver.set_value(value);
	}

	fn set_error(self, error: Error) {
		let Self { receiver, map, .. } = self;
		match catch_unwind(AssertUnwindSafe(move || map(error))) {
			Ok(mapped) => receiver.set_value(mapped),
			Err(payload) => receiver.set_error(Error::from_panic(payload)),
		}
	}

	fn set_stopped(self) {
		self.receiver.set_stopped();
	}

	fn env(&self) -> Env {
		self.receiver.env()
	}
}

#[derive(Clone, Debug)]
pub struct UponStopped<C, F> {
	child: C,
	map: F,
}

impl<C, F> Sender for UponStopped<C, F>
where
	C: Sender,
	F: FnOnce() -> C::Value + Send + 'static,
{
	type Value = C::Value;

	type Operation<R> = C::Operation<UponStoppedReceiver<C::Value, R, F>>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		self.child.connect(UponStoppedReceiver {
			receiver,
			map: self.map,
			_marker: PhantomData,
		})
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		self.child.completion_scheduler(channel)
	}
}

pub struct UponStoppedReceiver<T, R, F> {
	receiver: R,
	map: F,
	_marker: PhantomData<fn() -> T>,
}

impl<T, R, F> Receiver<T> for UponStoppedReceiver<T, R, F>
where
	T: Send + 'static,
	R: Receiver<T>,
	F: FnOnce() -> T + Send + 'static,
{
	fn set_value(self, value: T) {
		self.receiver.set_value(value);
	}

	fn set_error(self, error: Error) {
		self.receiver.set_error(error);
	}

	fn set_stopped(self) {
		let Self { receiver, map, .. } = self;
		match catch_unwind(AssertUnwindSafe(map)) {
			Ok(mapped) => receiver.set_value(mapped),
			Err(payload) => receiver.set_error(Error::from_panic(payload)),
		}
	}

	fn env(&self) -> Env {
		self.receiver.env()
	}
}
