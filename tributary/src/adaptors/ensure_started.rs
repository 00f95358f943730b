//! `ensure_started`: start a computation eagerly, hand the result to one
//! later consumer.
//!
//! The handle is move-only; the underlying child is started at construction
//! time. Dropping the handle without ever connecting requests stop on the
//! child and reclaims the shared record.

use std::sync::Arc;

use headwater::{Receiver, Sender};

use crate::adaptors::shared::{consumer, taken_completion, SharedConsumer, SharedState};

/// Starts `sender` immediately; the returned sender completes with the
/// (possibly already buffered) result, moved out to the single consumer.
pub fn ensure_started<S: Sender>(sender: S) -> EnsureStarted<S> {
	let state = SharedState::new(sender);
	state.try_start();
	EnsureStarted { state }
}

pub struct EnsureStarted<S: Sender> {
	state: Arc<SharedState<S>>,
}

impl<S: Sender> Drop for EnsureStarted<S> {
	fn drop(&mut self) {
		self.state.detach();
	}
}

impl<S: Sender> Sender for EnsureStarted<S> {
	type Value = S::Value;

	type Operation<R> = SharedConsumer<S, R>
	where
		R: Receiver<S::Value>;

	fn connect<R>(self, receiver: R) -> SharedConsumer<S, R>
	where
		R: Receiver<S::Value>,
	{
		consumer(&self.state, receiver, taken_completion::<S>)
	}
}
