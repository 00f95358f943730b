//! `when_all`: run several computations concurrently and join their
//! completions.
//!
//! The aggregate completes with the tuple of every child's value; the first
//! error to arrive wins over values and over any later stop, and a stop wins
//! over values. Either transition requests stop on an internal source whose
//! token every child observes, so losing children are cancelled rather than
//! abandoned. The countdown of child completions is the join barrier: the
//! child that decrements it to zero publishes the aggregate completion.

use core::{
	pin::Pin,
	sync::atomic::{AtomicU8, AtomicUsize, Ordering},
};
use std::sync::Arc;

use headwater::{
	env::GetStopToken,
	stop::{StopCallback, StopSource, StopToken},
	Env, Error, OperationState, Receiver, Scheduler, Sender,
};
use parking_lot::Mutex;
use pin_project::pin_project;

use crate::adaptors::schedule_from::{continue_on, ScheduleFrom};

/// Joins a tuple of senders (arity 0 through 8).
pub fn when_all<L: SenderList>(senders: L) -> WhenAll<L> {
	WhenAll { senders }
}

/// With typed senders every child already has exactly one value signature,
/// so this is [`when_all`] under its wider surface name.
pub fn when_all_with_variant<L: SenderList>(senders: L) -> WhenAll<L> {
	when_all(senders)
}

/// [`when_all`], completing on `scheduler`'s execution context.
pub fn transfer_when_all<Sch: Scheduler, L: SenderList>(
	scheduler: Sch,
	senders: L,
) -> ScheduleFrom<Sch, WhenAll<L>> {
	continue_on(when_all(senders), scheduler)
}

#[derive(Clone, Debug)]
pub struct WhenAll<L> {
	senders: L,
}

impl<L: SenderList> Sender for WhenAll<L> {
	type Value = L::Values;

	type Operation<R> = L::Operation<R>
	where
		R: Receiver<L::Values>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<L::Values>,
	{
		L::connect_list(self.senders, receiver)
	}
}

/// A tuple of senders joinable by [`when_all`].
pub trait SenderList: Send + Sized + 'static {
	/// The tuple of every member's value.
	type Values: Send + 'static;

	type Operation<R>: 'static + OperationState
	where
		R: Receiver<Self::Values>;

	fn connect_list<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<Self::Values>;
}

const STARTED: u8 = 0;
const ERROR: u8 = 1;
const STOPPED: u8 = 2;

struct JoinState<Slots, V, R> {
	remaining: AtomicUsize,
	disposition: AtomicU8,
	slots: Mutex<Slots>,
	collect: fn(&mut Slots) -> V,
	failure: Mutex<Option<Error>>,
	stop_source: StopSource,
	outer_token: StopToken,
	receiver: Mutex<Option<R>>,
	stop_callback: Mutex<Option<StopCallback>>,
	child_env: Env,
}

impl<Slots, V, R> JoinState<Slots, V, R>
where
	Slots: Send + 'static,
	V: Send + 'static,
	R: Receiver<V>,
{
	/// The join barrier: the child that decrements the countdown to zero
	/// publishes.
	fn arrive(&self) {
		if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
			return;
		}
		// Deregister before publishing; this waits out an external stop
		// request whose callback is mid-flight.
		*self.stop_callback.lock() = None;
		let receiver = self.receiver.lock().take();
		let Some(receiver) = receiver else { return };
		match self.disposition.load(Ordering::Acquire) {
			ERROR => {
				let error = self
					.failure
					.lock()
					.take()
					.expect("error disposition without a stored error");
				receiver.set_error(error);
			}
			STOPPED => receiver.set_stopped(),
			_ => {
				let values = {
					let mut slots = self.slots.lock();
					(self.collect)(&mut slots)
				};
				receiver.set_value(values);
			}
		}
	}

	fn note_error(&self, error: Error) {
		let won = self
			.disposition
			.compare_exchange(STARTED, ERROR, Ordering::AcqRel, Ordering::Acquire)
			.is_ok();
		if won {
			*self.failure.lock() = Some(error);
			self.stop_source.request_stop();
		}
	}

	fn note_stopped(&self) {
		let won = self
			.disposition
			.compare_exchange(STARTED, STOPPED, Ordering::AcqRel, Ordering::Acquire)
			.is_ok();
		if won {
			self.stop_source.request_stop();
		}
	}
}

trait JoinCore: Send + Sync + 'static {
	fn arrive(&self);
	fn note_error(&self, error: Error);
	fn note_stopped(&self);
	fn child_env(&self) -> Env;
}

impl<Slots, V, R> JoinCore for JoinState<Slots, V, R>
where
	Slots: Send + 'static,
	V: Send + 'static,
	R: Receiver<V>,
{
	fn arrive(&self) {
		JoinState::arrive(self);
	}

	fn note_error(&self, error: Error) {
		JoinState::note_error(self, error);
	}

	fn note_stopped(&self) {
		JoinState::note_stopped(self);
	}

	fn child_env(&self) -> Env {
		self.child_env.clone()
	}
}

trait ChildPort<T>: Send + Sync {
	fn child_value(&self, value: T);
	fn child_error(&self, error: Error);
	fn child_stopped(&self);
	fn port_env(&self) -> Env;
}

/// Binds one child to its slot in the join state.
struct IndexedPort<J, T> {
	state: Arc<J>,
	write: fn(&J, T),
}

impl<J, T> ChildPort<T> for IndexedPort<J, T>
where
	J: JoinCore,
	T: Send + 'static,
{
	fn child_value(&self, value: T) {
		(self.write)(&self.state, value);
		self.state.arrive();
	}

	fn child_error(&self, error: Error) {
		self.state.note_error(error);
		self.state.arrive();
	}

	fn child_stopped(&self) {
		self.state.note_stopped();
		self.state.arrive();
	}

	fn port_env(&self) -> Env {
		self.state.child_env()
	}
}

/// The receiver one joined child completes into.
pub struct JoinChild<T> {
	port: Arc<dyn ChildPort<T>>,
}

fn indexed_port<J, T>(state: &Arc<J>, write: fn(&J, T)) -> JoinChild<T>
where
	J: JoinCore,
	T: Send + 'static,
{
	JoinChild {
		port: Arc::new(IndexedPort {
			state: state.clone(),
			write,
		}),
	}
}

impl<T: Send + 'static> Receiver<T> for JoinChild<T> {
	fn set_value(self, value: T) {
		self.port.child_value(value);
	}

	fn set_error(self, error: Error) {
		self.port.child_error(error);
	}

	fn set_stopped(self) {
		self.port.child_stopped();
	}

	fn env(&self) -> Env {
		self.port.port_env()
	}
}

/// The empty join: completes `set_value(())` synchronously.
#[pin_project]
pub struct ImmediateJoin<R> {
	receiver: Option<R>,
}

impl<R: Receiver<()>> OperationState for ImmediateJoin<R> {
	fn start(self: Pin<&mut Self>) {
		self.project()
			.receiver
			.take()
			.expect("operation started more than once")
			.set_value(());
	}
}

impl SenderList for () {
	type Values = ();

	type Operation<R> = ImmediateJoin<R>
	where
		R: Receiver<()>;

	fn connect_list<R>(self, receiver: R) -> ImmediateJoin<R>
	where
		R: Receiver<()>,
	{
		ImmediateJoin {
			receiver: Some(receiver),
		}
	}
}

macro_rules! impl_sender_list {
	($operation:ident; $(($S:ident, $field:ident, $index:tt)),+ $(,)?) => {
		#[pin_project]
		pub struct $operation<$($S: Sender,)+ R>
		where
			R: Receiver<($($S::Value,)+)>,
		{
			state: Arc<JoinState<($(Option<$S::Value>,)+), ($($S::Value,)+), R>>,
			$(
				#[pin]
				$field: <$S as Sender>::Operation<JoinChild<<$S as Sender>::Value>>,
			)+
		}

		impl<$($S: Sender,)+ R> OperationState for $operation<$($S,)+ R>
		where
			R: Receiver<($($S::Value,)+)>,
		{
			fn start(self: Pin<&mut Self>) {
				let this = self.project();
				let state = this.state;
				let forward = state.clone();
				let callback = state
					.outer_token
					.on_stop(move || {
						forward.stop_source.request_stop();
					});
				*state.stop_callback.lock() = Some(callback);
				$(
					this.$field.start();
				)+
			}
		}

		impl<$($S: Sender,)+> SenderList for ($($S,)+) {
			type Values = ($($S::Value,)+);

			type Operation<R> = $operation<$($S,)+ R>
			where
				R: Receiver<($($S::Value,)+)>;

			fn connect_list<R>(self, receiver: R) -> Self::Operation<R>
			where
				R: Receiver<($($S::Value,)+)>,
			{
				let ($($field,)+) = self;
				let outer_env = receiver.env();
				let outer_token = outer_env.stop_token();
				let stop_source = StopSource::new();
				let child_env = outer_env.with::<GetStopToken>(stop_source.token());
				let state = Arc::new(JoinState {
					remaining: AtomicUsize::new([$(stringify!($field),)+].len()),
					disposition: AtomicU8::new(STARTED),
					slots: Mutex::new(($(Option::<<$S as Sender>::Value>::None,)+)),
					collect: |slots| ($(
						slots
							.$index
							.take()
							.expect("joined value missing at publish"),
					)+),
					failure: Mutex::new(None),
					stop_source,
					outer_token,
					receiver: Mutex::new(Some(receiver)),
					stop_callback: Mutex::new(None),
					child_env,
				});
				$operation {
					$(
						$field: $field.connect(indexed_port(&state, |state, value| {
							if state.disposition.load(Ordering::Acquire) == STARTED {
								state.slots.lock().$index = Some(value);
							}
						})),
					)+
					state,
				}
			}
		}
	};
}

impl_sender_list!(JoinOperation1; (S0, child0, 0));
impl_sender_list!(JoinOperation2; (S0, child0, 0), (S1, child1, 1));
impl_sender_list!(JoinOperation3; (S0, child0, 0), (S1, child1, 1), (S2, child2, 2));
impl_sender_list!(
	JoinOperation4;
	(S0, child0, 0),
	(S1, child1, 1),
	(S2, child2, 2),
	(S3, child3, 3)
);
impl_sender_list!(
	JoinOperation5;
	(S0, child0, 0),
	(S1, child1, 1),
	(S2, child2, 2),
	(S3, child3, 3),
	(S4, child4, 4)
);
impl_sender_list!(
	JoinOperation6;
	(S0, child0, 0),
	(S1, child1, 1),
	(S2, child2, 2),
	(S3, child3, 3),
	(S4, child4, 4),
	(S5, child5, 5)
);
impl_sender_list!(
	JoinOperation7;
	(S0, child0, 0),
	(S1, child1, 1),
	(S2, child2, 2),
	(S3, child3, 3),
	(S4, child4, 4),
	(S5, child5, 5),
	(S6, child6, 6)
);
impl_sender_list!(
	JoinOperation8;
	(S0, child0, 0),
	(S1, child1, 1),
	(S2, child2, 2),
	(S3, child3, 3),
	(S4, child4, 4),
	(S5, child5, 5),
	(S6, child6, 6),
	(S7, child7, 7)
);
