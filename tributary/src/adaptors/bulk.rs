//! `bulk`: iterate a shape over the value completion before forwarding it.

use core::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use headwater::{erased::AnyScheduler, Channel, Env, Error, Receiver, Sender};

/// Runs `each(index, &mut value)` for every `index in 0..shape` on the value
/// completion, then forwards the value unchanged. An unwinding `each`
/// becomes an error completion.
pub fn bulk<C, F>(child: C, shape: usize, each: F) -> Bulk<C, F>
where
	C: Sender,
	F: FnMut(usize, &mut C::Value) + Send + 'static,
{
	Bulk { child, shape, each }
}

#[derive(Clone, Debug)]
pub struct Bulk<C, F> {
	child: C,
	shape: usize,
	each: F,
}

impl<C, F> Sender for Bulk<C, F>
where
	C: Sender,
	F: FnMut(usize, &mut C::Value) + Send + 'static,
{
	type Value = C::Value;

	type Operation<R> = C::Operation<BulkReceiver<C::Value, R, F>>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		self.child.connect(BulkReceiver {
			receiver,
			shape: self.shape,
			each: self.each,
			_marker: PhantomData,
		})
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		self.child.completion_scheduler(channel)
	}
}

pub struct BulkReceiver<T, R, F> {
	receiver: R,
	shape: usize,
	each: F,
	_marker: PhantomData<fn(T)>,
}

impl<T, R, F> Receiver<T> for BulkReceiver<T, R, F>
where
	T: Send + 'static,
	R: Receiver<T>,
	F: FnMut(usize, &mut T) + Send + 'static,
{
	fn set_value(self, mut value: T) {
		let Self {
			receiver,
			shape,
			mut each,
			..
		} = self;
		let iterated = catch_unwind(AssertUnwindSafe(move || {
			for index in 0..shape {
				each(index, &mut value);
			}
			value
		}));
		match iterated {
			Ok(value) => receiver.set_value(value),
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
