//! Channel-mapping adaptors and their laws.

use std::pin::pin;

use tributary::{
	env::Query, just, just_error, just_stopped, read, sync_wait, OperationState, Sender,
	SenderExt,
};

mod _receiver;
use _receiver::{recording, Seen};
use tributary::Env;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code {0}")]
struct Code(i32);

#[test]
fn then_applies_on_the_value_channel_only() {
	assert_eq!(sync_wait(just(20).then(|n| n * 2 + 2)).unwrap(), Some(42));

	let error = sync_wait(just_error::<i32>(Code(1)).then(|n| n * 2)).unwrap_err();
	assert_eq!(error.downcast_ref::<Code>(), Some(&Code(1)));

	assert_eq!(
		sync_wait(just_stopped::<i32>().then(|n| n * 2)).unwrap(),
		None
	);
}

#[test]
fn a_panicking_map_becomes_an_error() {
	let (receiver, seen) = recording::<i32>(Env::new());
	let mut operation = pin!(just(1).then(|_| -> i32 { panic!("boom") }).connect(receiver));
	operation.as_mut().start();
	assert_eq!(
		*seen.lock().unwrap(),
		[Seen::Error(String::from("panicked: boom"))]
	);
}

#[test]
fn upon_error_recovers_into_a_value() {
	assert_eq!(
		sync_wait(just_error::<i32>(Code(7)).upon_error(|error| {
			error.downcast_ref::<Code>().map_or(-1, |code| code.0)
		}))
		.unwrap(),
		Some(7)
	);
	// The value channel is untouched.
	assert_eq!(
		sync_wait(just(1).upon_error(|_| unreachable!())).unwrap(),
		Some(1)
	);
}

#[test]
fn upon_stopped_recovers_into_a_value() {
	assert_eq!(
		sync_wait(just_stopped::<i32>().upon_stopped(|| 9)).unwrap(),
		Some(9)
	);
}

#[test]
fn bulk_iterates_the_shape_before_forwarding() {
	assert_eq!(
		sync_wait(just(0usize).bulk(5, |index, total| *total += index)).unwrap(),
		Some(1 + 2 + 3 + 4)
	);
}

#[test]
fn bulk_routes_a_panicking_iteration_to_the_error_channel() {
	let (receiver, seen) = recording::<i32>(Env::new());
	let mut operation = pin!(just(0)
		.bulk(3, |index, _: &mut i32| assert!(index < 2, "too far"))
		.connect(receiver));
	operation.as_mut().start();
	assert_eq!(seen.lock().unwrap().len(), 1);
	assert!(matches!(&seen.lock().unwrap()[0], Seen::Error(message) if message.contains("too far")));
}

#[test]
fn into_variant_is_the_identity_on_typed_senders() {
	assert_eq!(sync_wait(just(5).into_variant()).unwrap(), Some(5));
}

#[test]
fn stopped_as_optional_reifies_cancellation() {
	assert_eq!(
		sync_wait(just_stopped::<i32>().stopped_as_optional()).unwrap(),
		Some(None)
	);
	assert_eq!(
		sync_wait(just(3).stopped_as_optional()).unwrap(),
		Some(Some(3))
	);
}

#[test]
fn stopped_as_error_reifies_cancellation() {
	let error = sync_wait(just_stopped::<i32>().stopped_as_error(Code(13))).unwrap_err();
	assert_eq!(error.downcast_ref::<Code>(), Some(&Code(13)));
}

struct Marker;

impl Query for Marker {
	type Value = u8;
}

#[test]
fn read_completes_with_the_environment_entry() {
	let (receiver, seen) = recording::<u8>(Env::new().with::<Marker>(17));
	let mut operation = pin!(read::<Marker>().connect(receiver));
	operation.as_mut().start();
	assert_eq!(*seen.lock().unwrap(), [Seen::Value(17)]);
}

#[test]
fn read_errors_when_the_entry_is_absent() {
	let (receiver, seen) = recording::<u8>(Env::new());
	let mut operation = pin!(read::<Marker>().connect(receiver));
	operation.as_mut().start();
	assert!(matches!(&seen.lock().unwrap()[0], Seen::Error(_)));
}
