//! A small type-erased layer over the sender/receiver contract.
//!
//! Generic composition stays monomorphised; erasure is only needed where a
//! value must cross a `dyn` seam — most prominently [`AnyScheduler`], which
//! lets an environment carry "the current scheduler" without naming its
//! concrete type.

use core::pin::Pin;
use std::sync::Arc;

use crate::{
	env::{Env, ForwardProgressGuarantee},
	error::Error,
	traits::{Channel, OperationState, Receiver, Scheduler, Sender},
};

trait ReceiverObj<T>: Send {
	fn set_value_obj(self: Box<Self>, value: T);
	fn set_error_obj(self: Box<Self>, error: Error);
	fn set_stopped_obj(self: Box<Self>);
	fn env_obj(&self) -> Env;
}

impl<T, R> ReceiverObj<T> for R
where
	T: Send + 'static,
	R: Receiver<T>,
{
	fn set_value_obj(self: Box<Self>, value: T) {
		(*self).set_value(value);
	}

	fn set_error_obj(self: Box<Self>, error: Error) {
		(*self).set_error(error);
	}

	fn set_stopped_obj(self: Box<Self>) {
		(*self).set_stopped();
	}

	fn env_obj(&self) -> Env {
		self.env()
	}
}

/// A boxed receiver of `T`.
pub struct AnyReceiver<T> {
	inner: Box<dyn ReceiverObj<T>>,
}

impl<T: Send + 'static> AnyReceiver<T> {
	pub fn new(receiver: impl Receiver<T>) -> Self {
		Self {
			inner: Box::new(receiver),
		}
	}
}

impl<T: Send + 'static> Receiver<T> for AnyReceiver<T> {
	fn set_value(self, value: T) {
		self.inner.set_value_obj(value);
	}

	fn set_error(self, error: Error) {
		self.inner.set_error_obj(error);
	}

	fn set_stopped(self) {
		self.inner.set_stopped_obj();
	}

	fn env(&self) -> Env {
		self.inner.env_obj()
	}
}

/// A pinned, boxed operation state.
pub struct BoxedOperation {
	inner: Pin<Box<dyn OperationState>>,
}

impl OperationState for BoxedOperation {
	fn start(self: Pin<&mut Self>) {
		self.get_mut().inner.as_mut().start();
	}
}

trait SenderObj<T>: Send {
	fn connect_obj(self: Box<Self>, receiver: AnyReceiver<T>) -> BoxedOperation;
	fn completion_scheduler_obj(&self, channel: Channel) -> Option<AnyScheduler>;
}

impl<T, S> SenderObj<T> for S
where
	T: Send + 'static,
	S: Sender<Value = T>,
{
	fn connect_obj(self: Box<Self>, receiver: AnyReceiver<T>) -> BoxedOperation {
		BoxedOperation {
			inner: Box::pin((*self).connect(receiver)),
		}
	}

	fn completion_scheduler_obj(&self, channel: Channel) -> Option<AnyScheduler> {
		self.completion_scheduler(channel)
	}
}

/// A boxed sender completing with `T`.
pub struct AnySender<T> {
	inner: Box<dyn SenderObj<T>>,
}

impl<T: Send + 'static> AnySender<T> {
	pub fn new(sender: impl Sender<Value = T>) -> Self {
		Self {
			inner: Box::new(sender),
		}
	}
}

impl<T: Send + 'static> Sender for AnySender<T> {
	type Value = T;

	type Operation<R> = BoxedOperation
	where
		R: Receiver<T>;

	fn connect<R>(self, receiver: R) -> BoxedOperation
	where
		R: Receiver<T>,
	{
		self.inner.connect_obj(AnyReceiver::new(receiver))
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		self.inner.completion_scheduler_obj(channel)
	}
}

trait SchedulerObj: Send + Sync {
	fn schedule_obj(&self) -> AnySender<()>;
	fn forward_progress_obj(&self) -> ForwardProgressGuarantee;
}

impl<S: Scheduler> SchedulerObj for S {
	fn schedule_obj(&self) -> AnySender<()> {
		AnySender::new(self.schedule())
	}

	fn forward_progress_obj(&self) -> ForwardProgressGuarantee {
		self.forward_progress_guarantee()
	}
}

/// A shared, type-erased scheduler handle.
///
/// Usable wherever a concrete [`Scheduler`] is — in particular, a scheduler
/// recovered from an environment can be scheduled onto directly.
#[derive(Clone)]
pub struct AnyScheduler {
	inner: Arc<dyn SchedulerObj>,
}

impl AnyScheduler {
	pub fn new(scheduler: impl Scheduler) -> Self {
		Self {
			inner: Arc::new(scheduler),
		}
	}
}

impl Scheduler for AnyScheduler {
	type Sender = AnySender<()>;

	fn schedule(&self) -> AnySender<()> {
		self.inner.schedule_obj()
	}

	fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
		self.inner.forward_progress_obj()
	}
}
