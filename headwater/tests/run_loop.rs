//! The cooperative FIFO loop in isolation.

use std::{pin::pin, sync::Arc, thread};

use headwater::{env::GetStopToken, Env, Error, OperationState, Receiver, RunLoop, Scheduler, Sender, StopSource};

struct Push {
	order: Arc<std::sync::Mutex<Vec<usize>>>,
	index: usize,
	env: Env,
}

impl Receiver<()> for Push {
	fn set_value(self, (): ()) {
		self.order.lock().unwrap().push(self.index);
	}

	fn set_error(self, error: Error) {
		panic!("unexpected error completion: {error}");
	}

	fn set_stopped(self) {
		self.order.lock().unwrap().push(usize::MAX);
	}

	fn env(&self) -> Env {
		self.env.clone()
	}
}

#[test]
fn tasks_run_in_schedule_order() {
	let run_loop = RunLoop::new();
	let scheduler = run_loop.scheduler();
	let order = Arc::new(std::sync::Mutex::new(Vec::new()));

	let mut operations: Vec<std::pin::Pin<Box<dyn OperationState>>> = Vec::new();
	for index in 0..3 {
		operations.push(Box::pin(scheduler.schedule().connect(Push {
			order: order.clone(),
			index,
			env: Env::new(),
		})));
	}
	for operation in &mut operations {
		operation.as_mut().start();
	}
	run_loop.finish();
	run_loop.run();
	assert_eq!(*order.lock().unwrap(), [0, 1, 2]);
}

#[test]
fn producers_on_other_threads_wake_the_driver() {
	let run_loop = RunLoop::new();
	let scheduler = run_loop.scheduler();
	let order = Arc::new(std::sync::Mutex::new(Vec::new()));

	let producer = {
		let run_loop = run_loop.clone();
		let order = order.clone();
		thread::spawn(move || {
			let mut operation = pin!(scheduler.schedule().connect(Push {
				order,
				index: 1,
				env: Env::new(),
			}));
			operation.as_mut().start();
			run_loop.finish();
		})
	};
	run_loop.run();
	producer.join().unwrap();
	assert_eq!(*order.lock().unwrap(), [1]);
}

#[test]
fn a_stop_requested_receiver_completes_stopped_at_dequeue() {
	let run_loop = RunLoop::new();
	let source = StopSource::new();
	let order = Arc::new(std::sync::Mutex::new(Vec::new()));

	let mut operation = pin!(run_loop.scheduler().schedule().connect(Push {
		order: order.clone(),
		index: 0,
		env: Env::new().with::<GetStopToken>(source.token()),
	}));
	operation.as_mut().start();
	source.request_stop();
	run_loop.finish();
	run_loop.run();
	assert_eq!(*order.lock().unwrap(), [usize::MAX]);
}
