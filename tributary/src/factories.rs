//! Leaf senders: computations that complete as soon as they are started.

use core::{any::type_name, marker::PhantomData, pin::Pin};

use headwater::{
	env::{Query, QueryMissing},
	Error, OperationState, Receiver, Scheduler, Sender,
};
use pin_project::pin_project;

use crate::adaptors::{continue_on, ScheduleFrom};

/// Completes with `value` (moved) as soon as it is started.
pub fn just<T: Send + 'static>(value: T) -> Just<T> {
	Just { value }
}

/// Completes with `error` as soon as it is started.
///
/// The value type is free; inference or a turbofish picks it.
pub fn just_error<T: Send + 'static>(error: impl Into<Error>) -> JustError<T> {
	JustError {
		error: error.into(),
		_value: PhantomData,
	}
}

/// Completes `set_stopped` as soon as it is started.
pub fn just_stopped<T: Send + 'static>() -> JustStopped<T> {
	JustStopped {
		_value: PhantomData,
	}
}

/// Completes with the connected receiver's environment entry for `Q`, or
/// with a [`QueryMissing`] error when there is none.
pub fn read<Q: Query>() -> Read<Q> {
	Read {
		_query: PhantomData,
	}
}

/// The schedule sender of `scheduler`: completes `set_value(())` on that
/// scheduler's execution context.
pub fn schedule<Sch: Scheduler>(scheduler: &Sch) -> Sch::Sender {
	scheduler.schedule()
}

/// Completes with `value` on `scheduler`'s execution context.
pub fn transfer_just<Sch: Scheduler, T: Send + 'static>(
	scheduler: Sch,
	value: T,
) -> ScheduleFrom<Sch, Just<T>> {
	continue_on(just(value), scheduler)
}

#[derive(Clone, Debug)]
pub struct Just<T> {
	value: T,
}

impl<T: Send + 'static> Sender for Just<T> {
	type Value = T;

	type Operation<R> = JustOperation<T, R>
	where
		R: Receiver<T>;

	fn connect<R>(self, receiver: R) -> JustOperation<T, R>
	where
		R: Receiver<T>,
	{
		JustOperation {
			inner: Some((self.value, receiver)),
		}
	}
}

#[pin_project]
pub struct JustOperation<T, R> {
	inner: Option<(T, R)>,
}

impl<T: Send + 'static, R: Receiver<T>> OperationState for JustOperation<T, R> {
	fn start(self: Pin<&mut Self>) {
		let (value, receiver) = self
			.project()
			.inner
			.take()
			.expect("operation started more than once");
		receiver.set_value(value);
	}
}

#[derive(Clone, Debug)]
pub struct JustError<T> {
	error: Error,
	_value: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Sender for JustError<T> {
	type Value = T;

	type Operation<R> = JustErrorOperation<T, R>
	where
		R: Receiver<T>;

	fn connect<R>(self, receiver: R) -> JustErrorOperation<T, R>
	where
		R: Receiver<T>,
	{
		JustErrorOperation {
			inner: Some((self.error, receiver)),
			_value: PhantomData,
		}
	}
}

#[pin_project]
pub struct JustErrorOperation<T, R> {
	inner: Option<(Error, R)>,
	_value: PhantomData<fn() -> T>,
}

impl<T: Send + 'static, R: Receiver<T>> OperationState for JustErrorOperation<T, R> {
	fn start(self: Pin<&mut Self>) {
		let (error, receiver) = self
			.project()
			.inner
			.take()
			.expect("operation started more than once");
		receiver.set_error(error);
	}
}

#[derive(Clone, Debug)]
pub struct JustStopped<T> {
	_value: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Sender for JustStopped<T> {
	type Value = T;

	type Operation<R> = JustStoppedOperation<T, R>
	where
		R: Receiver<T>;

	fn connect<R>(self, receiver: R) -> JustStoppedOperation<T, R>
	where
		R: Receiver<T>,
	{
		JustStoppedOperation {
			receiver: Some(receiver),
			_value: PhantomData,
		}
	}
}

#[pin_project]
pub struct JustStoppedOperation<T, R> {
	receiver: Option<R>,
	_value: PhantomData<fn() -> T>,
}

impl<T: Send + 'static, R: Receiver<T>> OperationState for JustStoppedOperation<T, R> {
	fn start(self: Pin<&mut Self>) {
		self.project()
			.receiver
			.take()
			.expect("operation started more than once")
			.set_stopped();
	}
}

pub struct Read<Q> {
	_query: PhantomData<fn() -> Q>,
}

impl<Q: Query> Sender for Read<Q> {
	type Value = Q::Value;

	type Operation<R> = ReadOperation<Q, R>
	where
		R: Receiver<Q::Value>;

	fn connect<R>(self, receiver: R) -> ReadOperation<Q, R>
	where
		R: Receiver<Q::Value>,
	{
		ReadOperation {
			receiver: Some(receiver),
			_query: PhantomData,
		}
	}
}

#[pin_project]
pub struct ReadOperation<Q, R> {
	receiver: Option<R>,
	_query: PhantomData<fn() -> Q>,
}

impl<Q: Query, R: Receiver<Q::Value>> OperationState for ReadOperation<Q, R> {
	fn start(self: Pin<&mut Self>) {
		let receiver = self
			.project()
			.receiver
			.take()
			.expect("operation started more than once");
		match receiver.env().get::<Q>() {
			Some(value) => receiver.set_value(value),
			None => receiver.set_error(Error::failure(QueryMissing {
				query: type_name::<Q>(),
			})),
		}
	}
}
