//! Lazy, composable asynchronous computations with explicit schedulers and
//! cancellation.
//!
//! A computation is described by a [`Sender`]: a pure value that does
//! nothing until [`connect`](`Sender::connect`)ed to a [`Receiver`] and
//! [`start`](`OperationState::start`)ed. Adaptors compose descriptions;
//! consumers ([`sync_wait`], [`start_detached`]) connect them and run them.
//! Completion travels back through exactly one of three channels — value,
//! error, or stopped — and stays on the thread it was produced on unless an
//! adaptor like [`continue_on`] explicitly moves it.
//!
//! ```
//! use tributary::{just, sync_wait, SenderExt};
//!
//! let work = just((1, 2)).then(|(a, b)| a + b);
//! assert_eq!(sync_wait(work).unwrap(), Some(3));
//! ```

#![warn(clippy::pedantic)]

pub mod adaptors;
mod ext;
mod factories;
mod start_detached;
mod sync_wait;

pub use adaptors::{
	bulk, continue_on, ensure_started, into_variant, let_error, let_stopped, let_value, on,
	schedule_from, split, start_on, stopped_as_error, stopped_as_optional, then,
	transfer_when_all, upon_error, upon_stopped, when_all, when_all_with_variant, Bulk,
	EnsureStarted, IntoVariant, LetError, LetStopped, LetValue, ScheduleFrom, SenderList, Split,
	StoppedAsError, StoppedAsOptional, Then, UponError, UponStopped, WhenAll,
};
pub use ext::SenderExt;
pub use factories::{
	just, just_error, just_stopped, read, schedule, transfer_just, Just, JustError, JustStopped,
	Read,
};
pub use headwater::{
	self, env, erased, run_loop, stop, Channel, Completion, Env, Error, OperationState, Receiver,
	RunLoop, RunLoopScheduler, Scheduler, Sender, StopCallback, StopSource, StopToken,
};
pub use start_detached::{execute, start_detached};
pub use sync_wait::{sync_wait, sync_wait_with_variant};
