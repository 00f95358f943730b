//! The pipeable spelling of the adaptor surface.

use headwater::{Error, Scheduler, Sender};

use crate::adaptors::{
	bulk::{bulk, Bulk},
	ensure_started::{ensure_started, EnsureStarted},
	into_variant::{into_variant, IntoVariant},
	let_::{let_error, let_stopped, let_value, LetError, LetStopped, LetValue},
	schedule_from::{continue_on, ScheduleFrom},
	split::{split, Split},
	stopped_as::{stopped_as_error, stopped_as_optional, StoppedAsError, StoppedAsOptional},
	then::{then, upon_error, upon_stopped, Then, UponError, UponStopped},
};

/// Method spellings for every pipeable adaptor, so chains read in data-flow
/// order: `just(1).then(f).continue_on(scheduler)`.
pub trait SenderExt: Sender {
	fn then<F, U>(self, map: F) -> Then<Self, F>
	where
		F: FnOnce(Self::Value) -> U + Send + 'static,
		U: Send + 'static,
	{
		then(self, map)
	}

	fn upon_error<F>(self, map: F) -> UponError<Self, F>
	where
		F: FnOnce(Error) -> Self::Value + Send + 'static,
	{
		upon_error(self, map)
	}

	fn upon_stopped<F>(self, map: F) -> UponStopped<Self, F>
	where
		F: FnOnce() -> Self::Value + Send + 'static,
	{
		upon_stopped(self, map)
	}

	fn let_value<F, N>(self, bind: F) -> LetValue<Self, F, N>
	where
		N: Sender,
		F: FnOnce(Self::Value) -> N + Send + 'static,
	{
		let_value(self, bind)
	}

	fn let_error<F, N>(self, bind: F) -> LetError<Self, F, N>
	where
		N: Sender<Value = Self::Value>,
		F: FnOnce(Error) -> N + Send + 'static,
	{
		let_error(self, bind)
	}

	fn let_stopped<F, N>(self, bind: F) -> LetStopped<Self, F, N>
	where
		N: Sender<Value = Self::Value>,
		F: FnOnce() -> N + Send + 'static,
	{
		let_stopped(self, bind)
	}

	fn bulk<F>(self, shape: usize, each: F) -> Bulk<Self, F>
	where
		F: FnMut(usize, &mut Self::Value) + Send + 'static,
	{
		bulk(self, shape, each)
	}

	fn into_variant(self) -> IntoVariant<Self> {
		into_variant(self)
	}

	fn stopped_as_optional(self) -> StoppedAsOptional<Self> {
		stopped_as_optional(self)
	}

	fn stopped_as_error(self, error: impl Into<Error>) -> StoppedAsError<Self> {
		stopped_as_error(self, error)
	}

	fn continue_on<Sch: Scheduler>(self, scheduler: Sch) -> ScheduleFrom<Sch, Self> {
		continue_on(self, scheduler)
	}

	fn split(self) -> Split<Self>
	where
		Self::Value: Clone,
	{
		split(self)
	}

	fn ensure_started(self) -> EnsureStarted<Self> {
		ensure_started(self)
	}
}

impl<S: Sender> SenderExt for S {}
