//! The end-to-end round trips everything else builds on.

use tributary::{just, just_error, split, sync_wait, when_all, SenderExt};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code {0}")]
struct Code(i32);

#[test]
fn waits_for_an_immediate_value() {
	assert_eq!(sync_wait(just(42)).unwrap(), Some(42));
}

#[test]
fn maps_through_then() {
	assert_eq!(
		sync_wait(just((1, 2)).then(|(a, b)| a + b)).unwrap(),
		Some(3)
	);
}

#[test]
fn splices_a_dynamic_continuation() {
	assert_eq!(
		sync_wait(just(()).let_value(|()| just(String::from("hi")))).unwrap(),
		Some(String::from("hi"))
	);
}

#[test]
fn joins_heterogeneous_children() {
	assert_eq!(
		sync_wait(when_all((just(1), just(2.5), just(String::from("x"))))).unwrap(),
		Some((1, 2.5, String::from("x")))
	);
}

#[test]
fn first_error_wins_the_join() {
	let error = sync_wait(when_all((just(1), just_error::<i32>(Code(42))))).unwrap_err();
	assert_eq!(error.downcast_ref::<Code>(), Some(&Code(42)));
}

#[test]
fn split_shares_one_completion() {
	let shared = split(just(7));
	assert_eq!(
		sync_wait(when_all((shared.clone(), shared))).unwrap(),
		Some((7, 7))
	);
}
