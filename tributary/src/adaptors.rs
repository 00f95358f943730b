//! The composition algebra: every adaptor over a child sender.
//!
//! Constructing an adaptor is pure — it only records *what* to run.
//! `connect` folds the description into an operation state, most commonly
//! by wrapping the downstream receiver and delegating to the child.

pub mod bulk;
pub mod ensure_started;
pub mod into_variant;
pub mod let_;
pub mod schedule_from;
mod shared;
pub mod split;
pub mod start_on;
pub mod stopped_as;
pub mod then;
pub mod when_all;

pub use bulk::{bulk, Bulk};
pub use ensure_started::{ensure_started, EnsureStarted};
pub use into_variant::{into_variant, IntoVariant};
pub use let_::{let_error, let_stopped, let_value, LetError, LetStopped, LetValue};
pub use schedule_from::{continue_on, schedule_from, ScheduleFrom};
pub use shared::SharedConsumer;
pub use split::{split, Split};
pub use start_on::{on, start_on};
pub use stopped_as::{stopped_as_error, stopped_as_optional, StoppedAsError, StoppedAsOptional};
pub use then::{then, upon_error, upon_stopped, Then, UponError, UponStopped};
pub use when_all::{
	transfer_when_all, when_all, when_all_with_variant, SenderList, WhenAll,
};
