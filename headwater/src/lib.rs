//! headwater is the execution-primitive runtime backing tributary.
//!
//! It provides the pieces every structured asynchronous computation stands
//! on: receiver [environments](`env`), [cooperative cancellation](`stop`),
//! the [sender/receiver/operation-state contract](`Sender`), a
//! [type-erased layer](`erased`) for values that must cross `dyn` seams,
//! and the built-in cooperative [run loop](`run_loop`).

#![warn(clippy::pedantic)]

pub mod env;
pub mod erased;
mod error;
pub mod run_loop;
pub mod stop;
mod traits;

pub use env::Env;
pub use error::Error;
pub use run_loop::{RunLoop, RunLoopScheduler};
pub use stop::{StopCallback, StopSource, StopToken};
pub use traits::{Channel, Completion, OperationState, Receiver, Scheduler, Sender};
