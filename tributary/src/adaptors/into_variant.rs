//! `into_variant`: normalise a sender's value completions into one
//! signature.
//!
//! With typed senders every sender already has exactly one value signature,
//! so this adaptor forwards the child unchanged. It exists so pipelines
//! written against the wider surface keep composing.

use headwater::{erased::AnyScheduler, Channel, Receiver, Sender};

/// See the module documentation.
pub fn into_variant<C: Sender>(child: C) -> IntoVariant<C> {
	IntoVariant { child }
}

#[derive(Clone, Debug)]
pub struct IntoVariant<C> {
	child: C,
}

impl<C: Sender> Sender for IntoVariant<C> {
	type Value = C::Value;

	type Operation<R> = C::Operation<R>
	where
		R: Receiver<C::Value>;

	fn connect<R>(self, receiver: R) -> Self::Operation<R>
	where
		R: Receiver<C::Value>,
	{
		self.child.connect(receiver)
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		self.child.completion_scheduler(channel)
	}
}
