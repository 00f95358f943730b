//! Adaptors that reify the stopped channel: `stopped_as_optional`,
//! `stopped_as_error`.

use core::marker::PhantomData;

use headwater::{erased::AnyScheduler, Channel, Env, Error, Receiver, Sender};

/// Maps value completions to `Some(value)` and stopped to `set_value(None)`.
pub fn stopped_as_optional<C: Sender>(child: C) -> StoppedAsOptional<C> {
	StoppedAsOptional { child }
}

/// Maps the stopped completion to `set_error(error)`.
pub fn stopped_as_error<C: Sender>(child: C, error: impl Into<Error>) -> StoppedAsError<C> {
	StoppedAsError {
		child,
		error: error.into(),
	}
}

#[derive(Clone, Debug)]
pub struct StoppedAsOptional<C> {
	child: C,
}

impl<C: Sender> Sender for StoppedAsOptional<C> {
	type Value = Option<C::Value>;

	type Operation<R> = C::Operation<OptionalReceiver<C::Value, R>>
	where
		R: Receiver<Option<C::Value>>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<Option<C::Value>>,
	{
		self.child.connect(OptionalReceiver {
			receiver,
			_marker: PhantomData,
		})
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		// Value completions may also originate from the child's stopped
		// channel; only the untouched error channel keeps its advertisement.
		match channel {
			Channel::Error => self.child.completion_scheduler(Channel::Error),
			Channel::Value | Channel::Stopped => None,
		}
	}
}

pub struct OptionalReceiver<T, R> {
	receiver: R,
	_marker: PhantomData<fn(T)>,
}

impl<T, R> Receiver<T> for OptionalReceiver<T, R>
where
	T: Send + 'static,
	R: Receiver<Option<T>>,
{
	fn set_value(self, value: T) {
		self.receiver.set_value(Some(value));
	}

	fn set_error(self, error: Error) {
		self.receiver.set_error(error);
	}

	fn set_stopped(self) {
		self.receiver.set_value(None);
	}

	fn env(&self) -> Env {
		self.receiver.env()
	}
}

#[derive(Clone, Debug)]
pub struct StoppedAsError<C> {
	child: C,
	error: Error,
}

impl<C: Sender> Sender for StoppedAsError<C> {
	type Value = C::Value;

	type Operation<R> = C::Operation<StopToErrorReceiver<C::Value, R>>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		self.child.connect(StopToErrorReceiver {
			receiver,
			error: self.error,
			_marker: PhantomData,
		})
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		// Error completions may also originate from the child's stopped
		// channel; only the untouched value channel keeps its advertisement.
		match channel {
			Channel::Value => self.child.completion_scheduler(Channel::Value),
			Channel::Error | Channel::Stopped => None,
		}
	}
}

pub struct StopToErrorReceiver<T, R> {
	receiver: R,
	error: Error,
	_marker: PhantomData<fn(T)>,
}

impl<T, R> Receiver<T> for StopToErrorReceiver<T, R>
where
	T: Send + 'static,
	R: Receiver<T>,
{
	fn set_value(self, value: T) {
		self.receiver.set_value(value);
	}

	fn set_error(self, error: Error) {
		self.receiver.set_error(error);
	}

	fn set_stopped(self) {
		self.receiver.set_error(self.error);
	}

	fn env(&self) -> Env {
		self.receiver.env()
	}
}
