//! `split`: share one computation among any number of consumers.
//!
//! The handle is clonable; every clone connects to the same underlying
//! child, which is started by the first consumer to start. Each consumer
//! observes a clone of the one buffered completion.

use std::sync::Arc;

use headwater::{Receiver, Sender};

use crate::adaptors::shared::{cloned_completion, consumer, SharedConsumer, SharedState};

/// Shares `sender` among any number of consumers; the child starts on the
/// first downstream `start`.
pub fn split<S>(sender: S) -> Split<S>
where
	S: Sender,
	S::Value: Clone,
{
	Split {
		state: SharedState::new(sender),
	}
}

pub struct Split<S: Sender>
where
	S::Value: Clone,
{
	state: Arc<SharedState<S>>,
}

impl<S: Sender> Clone for Split<S>
where
	S::Value: Clone,
{
	fn clone(&self) -> Self {
		self.state.attach();
		Self {
			state: self.state.clone(),
		}
	}
}

impl<S: Sender> Drop for Split<S>
where
	S::Value: Clone,
{
	fn drop(&mut self) {
		self.state.detach();
	}
}

impl<S> Sender for Split<S>
where
	S: Sender,
	S::Value: Clone,
{
	type Value = S::Value;

	type Operation<R> = SharedConsumer<S, R>
	where
		R: Receiver<S::Value>;

	fn connect<R>(self, receiver: R) -> SharedConsumer<S, R>
	where
		R: Receiver<S::Value>,
	{
		// The consumer state takes its own watcher reference; the handle's
		// is released when `self` drops at the end of this call.
		consumer(&self.state, receiver, cloned_completion::<S>)
	}
}
