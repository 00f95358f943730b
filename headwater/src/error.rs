//! The payload carried on every error completion channel.
//!
//! An [`Error`] is either a captured panic (the escape hatch for user code
//! that unwinds inside an adaptor) or an arbitrary [`std::error::Error`]
//! value. Both forms are cheaply clonable so a buffered error can be fanned
//! out to several consumers of a shared computation.

use core::fmt::{self, Debug, Display, Formatter};
use std::{any::Any, error::Error as StdError, panic::resume_unwind, sync::Arc};

use parking_lot::Mutex;

/// The error payload of an error completion.
#[derive(Clone)]
pub struct Error {
	repr: Repr,
}

#[derive(Clone)]
enum Repr {
	Panic(Arc<PanicCell>),
	Failure(Arc<dyn StdError + Send + Sync>),
}

/// A captured unwind payload plus a message rendered at capture time.
///
/// The payload itself can be resumed at most once; clones made after it was
/// taken still carry the rendered message.
struct PanicCell {
	message: String,
	payload: Mutex<Option<Box<dyn Any + Send>>>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
struct MessageError(String);

impl Error {
	/// Wraps an arbitrary error value.
	pub fn failure<E: StdError + Send + Sync + 'static>(error: E) -> Self {
		Self {
			repr: Repr::Failure(Arc::new(error)),
		}
	}

	/// Wraps a plain message.
	pub fn message(message: impl Into<String>) -> Self {
		Self::failure(MessageError(message.into()))
	}

	/// Captures the payload of an unwound panic, as produced by
	/// [`std::panic::catch_unwind`].
	#[must_use]
	pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
		let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
			(*message).to_owned()
		} else if let Some(message) = payload.downcast_ref::<String>() {
			message.clone()
		} else {
			"(opaque panic payload)".to_owned()
		};
		Self {
			repr: Repr::Panic(Arc::new(PanicCell {
				message,
				payload: Mutex::new(Some(payload)),
			})),
		}
	}

	/// Whether this error was captured from a panic.
	#[must_use]
	pub fn is_panic(&self) -> bool {
		matches!(self.repr, Repr::Panic(_))
	}

	/// Borrows the wrapped error value, if it is a failure of type `E`.
	#[must_use]
	pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
		match &self.repr {
			Repr::Failure(error) => {
				let error: &(dyn StdError + 'static) = &**error;
				error.downcast_ref()
			}
			Repr::Panic(_) => None,
		}
	}

	/// Resumes a captured panic on the calling thread.
	///
	/// Failures (and panics whose payload was already resumed through another
	/// clone) are returned unchanged.
	pub fn resume_panic(self) -> Self {
		if let Repr::Panic(cell) = &self.repr {
			let payload = cell.payload.lock().take();
			if let Some(payload) = payload {
				resume_unwind(payload);
			}
		}
		self
	}
}

impl<E: StdError + Send + Sync + 'static> From<E> for Error {
	fn from(error: E) -> Self {
		Self::failure(error)
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.repr {
			Repr::Panic(cell) => write!(f, "panicked: {}", cell.message),
			Repr::Failure(error) => Display::fmt(error, f),
		}
	}
}

impl Debug for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.repr {
			Repr::Panic(cell) => f.debug_tuple("Error::Panic").field(&cell.message).finish(),
			Repr::Failure(error) => f.debug_tuple("Error::Failure").field(error).finish(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::Error;

	#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
	#[error("code {0}")]
	struct Code(i32);

	#[test]
	fn downcasts_failures() {
		let error = Error::failure(Code(42));
		assert_eq!(error.downcast_ref::<Code>(), Some(&Code(42)));
		assert!(!error.is_panic());
	}

	#[test]
	fn renders_panic_messages() {
		let error = Error::from_panic(Box::new("boom"));
		assert!(error.is_panic());
		assert_eq!(error.to_string(), "panicked: boom");
	}

	#[test]
	fn resumes_a_panic_at_most_once() {
		let error = Error::from_panic(Box::new(String::from("boom")));
		let spare = error.clone();
		let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
			let _ = error.resume_panic();
		}));
		assert!(caught.is_err());
		// The payload is spent; the clone degrades to a plain value.
		let spare = spare.resume_panic();
		assert!(spare.is_panic());
	}
}
