//! A recording receiver for driving operations by hand in tests.

use std::sync::{Arc, Mutex};

use tributary::{Completion, Env, Error, Receiver};

/// A completion flattened into something comparable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen<T> {
	Value(T),
	Error(String),
	Stopped,
}

pub struct Recording<T> {
	seen: Arc<Mutex<Vec<Seen<T>>>>,
	env: Env,
}

/// A receiver that appends each completion to a shared log.
pub fn recording<T>(env: Env) -> (Recording<T>, Arc<Mutex<Vec<Seen<T>>>>) {
	let seen = Arc::new(Mutex::new(Vec::new()));
	(
		Recording {
			seen: seen.clone(),
			env,
		},
		seen,
	)
}

impl<T: Send + 'static> Receiver<T> for Recording<T> {
	fn set_value(self, value: T) {
		self.seen.lock().unwrap().push(Seen::Value(value));
	}

	fn set_error(self, error: Error) {
		self.seen.lock().unwrap().push(Seen::Error(error.to_string()));
	}

	fn set_stopped(self) {
		self.seen.lock().unwrap().push(Seen::Stopped);
	}

	fn env(&self) -> Env {
		self.env.clone()
	}
}

/// Converts a buffered [`Completion`] for comparison.
#[allow(dead_code)]
pub fn seen<T>(completion: Completion<T>) -> Seen<T> {
	match completion {
		Completion::Value(value) => Seen::Value(value),
		Completion::Error(error) => Seen::Error(error.to_string()),
		Completion::Stopped => Seen::Stopped,
	}
}
