//! The stop-source contract: exactly-once synchronous callbacks, scoped
//! deregistration, and the races between them.

use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Barrier,
	},
	thread,
	time::Duration,
};

use headwater::{StopSource, StopToken};

#[test]
fn request_stop_reports_the_winning_call() {
	let source = StopSource::new();
	assert!(!source.stop_requested());
	assert!(source.request_stop());
	assert!(!source.request_stop());
	assert!(source.stop_requested());
	assert!(source.token().stop_requested());
}

#[test]
fn callbacks_run_exactly_once_on_the_requesting_thread() {
	let source = StopSource::new();
	let runs = Arc::new(AtomicUsize::new(0));
	let here = thread::current().id();

	let observed = runs.clone();
	let _registered = source.token().on_stop(move || {
		assert_eq!(thread::current().id(), here);
		observed.fetch_add(1, Ordering::SeqCst);
	});
	source.request_stop();
	source.request_stop();
	assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn registering_on_a_stopped_source_invokes_synchronously() {
	let source = StopSource::new();
	source.request_stop();
	let runs = Arc::new(AtomicUsize::new(0));
	let observed = runs.clone();
	let registered = source.token().on_stop(move || {
		observed.fetch_add(1, Ordering::SeqCst);
	});
	assert_eq!(runs.load(Ordering::SeqCst), 1);
	drop(registered);
	assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn a_dropped_registration_never_runs() {
	let source = StopSource::new();
	let runs = Arc::new(AtomicUsize::new(0));
	let observed = runs.clone();
	let registered = source.token().on_stop(move || {
		observed.fetch_add(1, Ordering::SeqCst);
	});
	drop(registered);
	source.request_stop();
	assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn the_never_token_is_inert() {
	let token = StopToken::never();
	assert!(!token.stop_possible());
	assert!(!token.stop_requested());
	let _registered = token.on_stop(|| unreachable!());
}

#[test]
fn a_callback_may_drop_its_own_registration() {
	// Deregistering from inside the running callback must not deadlock.
	let source = StopSource::new();
	let slot = Arc::new(std::sync::Mutex::new(None));
	let shared = slot.clone();
	let registered = source.token().on_stop(move || {
		drop(shared.lock().unwrap().take());
	});
	*slot.lock().unwrap() = Some(registered);
	source.request_stop();
	assert!(slot.lock().unwrap().is_none());
}

#[test]
fn deregistration_waits_for_a_running_callback() {
	let source = Arc::new(StopSource::new());
	let entered = Arc::new(Barrier::new(2));
	let finished = Arc::new(AtomicUsize::new(0));

	let callback_entered = entered.clone();
	let callback_finished = finished.clone();
	let registered = source.token().on_stop(move || {
		callback_entered.wait();
		thread::sleep(Duration::from_millis(50));
		callback_finished.store(1, Ordering::SeqCst);
	});

	let requester = {
		let source = source.clone();
		thread::spawn(move || {
			source.request_stop();
		})
	};

	// Once the callback is running, dropping the registration must block
	// until it has finished.
	entered.wait();
	drop(registered);
	assert_eq!(finished.load(Ordering::SeqCst), 1);
	requester.join().unwrap();
}
