//! Scheduler affinity and the run loop's completion rules.

use std::{
	pin::pin,
	thread::{self, ThreadId},
};

use tributary::{
	env::GetStopToken, just, schedule, start_on, sync_wait, transfer_just, Env, OperationState,
	RunLoop, Sender, SenderExt, StopSource,
};

mod _receiver;
use _receiver::{recording, Seen};

fn on_dedicated_thread<T: Send + 'static>(
	work: impl FnOnce(RunLoop) -> T,
) -> (T, ThreadId) {
	let run_loop = RunLoop::new();
	let driver = {
		let run_loop = run_loop.clone();
		thread::spawn(move || {
			let id = thread::current().id();
			run_loop.run();
			id
		})
	};
	let result = work(run_loop.clone());
	run_loop.finish();
	let id = driver.join().unwrap();
	(result, id)
}

#[test]
fn continue_on_completes_on_the_target_context() {
	let (observed, driver) = on_dedicated_thread(|run_loop| {
		sync_wait(
			just(())
				.continue_on(run_loop.scheduler())
				.then(|()| thread::current().id()),
		)
		.unwrap()
		.unwrap()
	});
	assert_eq!(observed, driver);
}

#[test]
fn then_does_not_reschedule() {
	// Without an explicit hop, the mapping runs on the thread the child
	// completed on.
	let here = thread::current().id();
	let observed = sync_wait(just(()).then(|()| thread::current().id()))
		.unwrap()
		.unwrap();
	assert_eq!(observed, here);
}

#[test]
fn start_on_runs_the_sender_on_the_scheduler() {
	let (observed, driver) = on_dedicated_thread(|run_loop| {
		sync_wait(start_on(
			&run_loop.scheduler(),
			just(()).then(|()| thread::current().id()),
		))
		.unwrap()
		.unwrap()
	});
	assert_eq!(observed, driver);
}

#[test]
fn transfer_just_is_continue_on_over_just() {
	let (observed, driver) = on_dedicated_thread(|run_loop| {
		sync_wait(
			transfer_just(run_loop.scheduler(), ()).then(|()| thread::current().id()),
		)
		.unwrap()
		.unwrap()
	});
	assert_eq!(observed, driver);
}

#[test]
fn the_run_loop_is_fifo() {
	let run_loop = RunLoop::new();
	let scheduler = run_loop.scheduler();
	let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));

	let mut operations: Vec<std::pin::Pin<Box<dyn OperationState>>> = Vec::new();
	for index in 0..4 {
		let order = order.clone();
		let (receiver, _) = recording::<()>(Env::new());
		let sender = schedule(&scheduler).then(move |()| order.lock().unwrap().push(index));
		operations.push(Box::pin(sender.connect(receiver)));
	}
	for operation in &mut operations {
		operation.as_mut().start();
	}
	run_loop.finish();
	run_loop.run();
	// Tasks complete in the order their operations were started.
	assert_eq!(*order.lock().unwrap(), [0, 1, 2, 3]);
}

#[test]
fn a_stopped_receiver_is_not_scheduled_into() {
	// Stop is checked at dequeue time: the task completes stopped instead
	// of running on the loop.
	let run_loop = RunLoop::new();
	let source = StopSource::new();
	let (receiver, seen) =
		recording::<()>(Env::new().with::<GetStopToken>(source.token()));
	let mut operation = pin!(schedule(&run_loop.scheduler()).connect(receiver));
	operation.as_mut().start();
	source.request_stop();
	run_loop.finish();
	run_loop.run();
	assert_eq!(*seen.lock().unwrap(), [Seen::Stopped]);
}

#[test]
fn scheduling_onto_a_finished_loop_completes_stopped() {
	let run_loop = RunLoop::new();
	run_loop.finish();
	let (receiver, seen) = recording::<()>(Env::new());
	let mut operation = pin!(schedule(&run_loop.scheduler()).connect(receiver));
	operation.as_mut().start();
	assert_eq!(*seen.lock().unwrap(), [Seen::Stopped]);
}
