//! A cooperative FIFO event loop and its scheduler.
//!
//! [`RunLoop`] is the built-in execution context: a mutex-and-condvar task
//! queue that [`run`](`RunLoop::run`) drains on the calling thread until
//! [`finish`](`RunLoop::finish`). Its [`RunLoopScheduler`] completes
//! schedule operations on whichever thread is driving `run`, checking the
//! receiver's stop token at dequeue time.

use core::pin::Pin;
use std::{collections::VecDeque, sync::Arc};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::{
	env::ForwardProgressGuarantee,
	erased::AnyScheduler,
	traits::{Channel, OperationState, Receiver, Scheduler, Sender},
};

trait LoopTask: Send + Sync {
	fn execute(self: Arc<Self>);
}

/// A single-threaded cooperative FIFO task queue.
#[derive(Clone)]
pub struct RunLoop {
	inner: Arc<LoopInner>,
}

struct LoopInner {
	queue: Mutex<LoopQueue>,
	ready: Condvar,
}

#[derive(Default)]
struct LoopQueue {
	tasks: VecDeque<Arc<dyn LoopTask>>,
	finishing: bool,
}

impl RunLoop {
	#[must_use]
	pub fn new() -> Self {
		Self {
			inner: Arc::new(LoopInner {
				queue: Mutex::new(LoopQueue::default()),
				ready: Condvar::new(),
			}),
		}
	}

	/// Executes queued tasks on the calling thread until the loop is
	/// [finished](`RunLoop::finish`) and drained.
	pub fn run(&self) {
		loop {
			let task = {
				let mut queue = self.inner.queue.lock();
				loop {
					if let Some(task) = queue.tasks.pop_front() {
						break Some(task);
					}
					if queue.finishing {
						break None;
					}
					self.inner.ready.wait(&mut queue);
				}
			};
			match task {
				Some(task) => task.execute(),
				None => {
					trace!("run loop drained");
					return;
				}
			}
		}
	}

	/// Makes [`run`](`RunLoop::run`) return once the queue is drained.
	///
	/// Operations scheduled afterwards complete `set_stopped` immediately.
	pub fn finish(&self) {
		let mut queue = self.inner.queue.lock();
		queue.finishing = true;
		self.inner.ready.notify_all();
	}

	#[must_use]
	pub fn scheduler(&self) -> RunLoopScheduler {
		RunLoopScheduler {
			inner: self.inner.clone(),
		}
	}
}

impl Default for RunLoop {
	fn default() -> Self {
		Self::new()
	}
}

/// Schedules onto the thread driving the owning [`RunLoop`].
#[derive(Clone)]
pub struct RunLoopScheduler {
	inner: Arc<LoopInner>,
}

impl Scheduler for RunLoopScheduler {
	type Sender = Schedule;

	fn schedule(&self) -> Schedule {
		Schedule {
			inner: self.inner.clone(),
		}
	}

	fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
		ForwardProgressGuarantee::Parallel
	}
}

/// The schedule sender of a [`RunLoopScheduler`].
pub struct Schedule {
	inner: Arc<LoopInner>,
}

impl Sender for Schedule {
	type Value = ();

	type Operation<R> = ScheduleOperation<R>
	where
		R: Receiver<()>;

	fn connect<R>(self, receiver: R) -> ScheduleOperation<R>
	where
		R: Receiver<()>,
	{
		ScheduleOperation {
			task: Arc::new(ScheduleTask {
				receiver: Mutex::new(Some(receiver)),
			}),
			inner: self.inner,
		}
	}

	fn completion_scheduler(&self, channel: Channel) -> Option<AnyScheduler> {
		matches!(channel, Channel::Value).then(|| {
			AnyScheduler::new(RunLoopScheduler {
				inner: self.inner.clone(),
			})
		})
	}
}

pub struct ScheduleOperation<R> {
	task: Arc<ScheduleTask<R>>,
	inner: Arc<LoopInner>,
}

impl<R: Receiver<()>> OperationState for ScheduleOperation<R> {
	fn start(self: Pin<&mut Self>) {
		let this = self.get_mut();
		let enqueued = {
			let mut queue = this.inner.queue.lock();
			if queue.finishing {
				false
			} else {
				queue.tasks.push_back(this.task.clone() as Arc<dyn LoopTask>);
				true
			}
		};
		if enqueued {
			trace!("task enqueued");
			this.inner.ready.notify_one();
		} else if let Some(receiver) = this.task.receiver.lock().take() {
			receiver.set_stopped();
		}
	}
}

struct ScheduleTask<R> {
	receiver: Mutex<Option<R>>,
}

impl<R: Receiver<()>> LoopTask for ScheduleTask<R> {
	fn execute(self: Arc<Self>) {
		let receiver = self.receiver.lock().take();
		let Some(receiver) = receiver else { return };
		if receiver.env().stop_token().stop_requested() {
			receiver.set_stopped();
		} else {
			receiver.set_value(());
		}
	}
}
