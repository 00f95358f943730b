//! Sharing one computation: `split` and `ensure_started`.

use std::{
	pin::pin,
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Arc,
	},
	thread,
};

use tributary::{
	env::GetStopToken, just, schedule, split, sync_wait, when_all, Env, OperationState, Receiver,
	RunLoop, Sender, SenderExt, StopCallback, StopSource,
};

mod _receiver;
use _receiver::{recording, Seen};

#[test]
fn every_consumer_observes_the_same_value() {
	let shared = split(just(String::from("shared")));
	assert_eq!(
		sync_wait(when_all((shared.clone(), shared))).unwrap(),
		Some((String::from("shared"), String::from("shared")))
	);
}

#[test]
fn the_child_runs_at_most_once() {
	let runs = Arc::new(AtomicUsize::new(0));
	let shared = split(just(()).then({
		let runs = runs.clone();
		move |()| {
			runs.fetch_add(1, Ordering::SeqCst);
			7
		}
	}));
	assert_eq!(
		sync_wait(when_all((shared.clone(), shared.clone(), shared))).unwrap(),
		Some((7, 7, 7))
	);
	assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn a_late_consumer_is_notified_from_its_own_start() {
	let shared = split(just(11));
	// The first consumer completes the child synchronously.
	let (first, seen_first) = recording::<i32>(Env::new());
	let mut operation = pin!(shared.clone().connect(first));
	operation.as_mut().start();
	assert_eq!(*seen_first.lock().unwrap(), [Seen::Value(11)]);

	// A consumer connecting after completion is notified synchronously too.
	let (late, seen_late) = recording::<i32>(Env::new());
	let mut operation = pin!(shared.connect(late));
	operation.as_mut().start();
	assert_eq!(*seen_late.lock().unwrap(), [Seen::Value(11)]);
}

#[test]
fn a_stopped_consumer_withdraws_without_spoiling_the_others() {
	let run_loop = RunLoop::new();
	let shared = split(schedule(&run_loop.scheduler()).then(|()| 5));

	let stopped = StopSource::new();
	stopped.request_stop();
	let (cancelled, seen_cancelled) =
		recording::<i32>(Env::new().with::<GetStopToken>(stopped.token()));
	let mut cancelled_op = pin!(shared.clone().connect(cancelled));
	cancelled_op.as_mut().start();
	assert_eq!(*seen_cancelled.lock().unwrap(), [Seen::Stopped]);

	let (kept, seen_kept) = recording::<i32>(Env::new());
	let mut kept_op = pin!(shared.connect(kept));
	kept_op.as_mut().start();
	run_loop.finish();
	run_loop.run();
	assert_eq!(*seen_kept.lock().unwrap(), [Seen::Value(5)]);
}

#[test]
fn consumers_on_other_threads_share_the_buffered_completion() {
	for _ in 0..64 {
		let run_loop = RunLoop::new();
		let shared = split(schedule(&run_loop.scheduler()).then(|()| 3));
		let mut joins = Vec::new();
		for _ in 0..2 {
			let shared = shared.clone();
			joins.push(thread::spawn(move || sync_wait(shared)));
		}
		drop(shared);
		run_loop.finish();
		run_loop.run();
		for join in joins {
			assert_eq!(join.join().unwrap().unwrap(), Some(3));
		}
	}
}

/// A sender that never completes but records a stop request on its
/// receiver's token.
struct Pending {
	stopped: Arc<AtomicBool>,
}

struct PendingOperation<R> {
	stopped: Arc<AtomicBool>,
	receiver: Option<R>,
	callback: std::sync::Mutex<Option<StopCallback>>,
}

impl Sender for Pending {
	type Value = ();

	type Operation<R> = PendingOperation<R>
	where
		R: Receiver<()>;

	fn connect<R>(self, receiver: R) -> PendingOperation<R>
	where
		R: Receiver<()>,
	{
		PendingOperation {
			stopped: self.stopped,
			receiver: Some(receiver),
			callback: std::sync::Mutex::new(None),
		}
	}
}

impl<R: Receiver<()>> OperationState for PendingOperation<R> {
	fn start(self: std::pin::Pin<&mut Self>) {
		let this = self.into_ref().get_ref();
		let token = this
			.receiver
			.as_ref()
			.expect("started more than once")
			.env()
			.stop_token();
		let stopped = this.stopped.clone();
		*this.callback.lock().unwrap() =
			Some(token.on_stop(move || stopped.store(true, Ordering::SeqCst)));
	}
}

#[test]
fn ensure_started_is_eager() {
	let ran = Arc::new(AtomicBool::new(false));
	let eager = just(())
		.then({
			let ran = ran.clone();
			move |()| ran.store(true, Ordering::SeqCst)
		})
		.ensure_started();
	// Started at construction, before any consumer connected.
	assert!(ran.load(Ordering::SeqCst));
	assert_eq!(sync_wait(eager).unwrap(), Some(()));
}

#[test]
fn dropping_an_unconsumed_ensure_started_requests_stop() {
	let stopped = Arc::new(AtomicBool::new(false));
	let eager = Pending {
		stopped: stopped.clone(),
	}
	.ensure_started();
	assert!(!stopped.load(Ordering::SeqCst));
	drop(eager);
	assert!(stopped.load(Ordering::SeqCst));
}
