//! `start_on`: hop to a scheduler, then run a sender there.

use headwater::{Scheduler, Sender};

use crate::{
	adaptors::let_::{let_value, LetValue},
	factories::schedule,
};

/// Runs `sender` on `scheduler`'s execution context: a hop through the
/// scheduler's schedule sender, continued with `sender` itself.
pub fn start_on<Sch, S>(
	scheduler: &Sch,
	sender: S,
) -> LetValue<Sch::Sender, impl FnOnce(()) -> S + Send + 'static, S>
where
	Sch: Scheduler,
	S: Sender,
{
	let_value(schedule(scheduler), move |()| sender)
}

/// The older surface name of [`start_on`].
pub fn on<Sch, S>(
	scheduler: &Sch,
	sender: S,
) -> LetValue<Sch::Sender, impl FnOnce(()) -> S + Send + 'static, S>
where
	Sch: Scheduler,
	S: Sender,
{
	start_on(scheduler, sender)
}
