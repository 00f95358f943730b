//! Cooperative cancellation: stop sources, tokens, and scoped callback
//! registration.
//!
//! A [`StopSource`] owns the stop flag and the registered-callback list.
//! [`StopToken`]s are cheap handles onto the source; [`StopCallback`] is the
//! scoped registration of one callback, removed again on drop.
//!
//! # Logic
//!
//! [`StopSource::request_stop`] invokes every registered callback exactly
//! once, synchronously, on the requesting thread. Registering on an
//! already-stopped source invokes the callback synchronously on the
//! *registering* thread instead. Dropping a [`StopCallback`] whose callback
//! is currently running on another thread blocks until that callback has
//! returned; dropping it from *inside* the running callback does not.

use core::{
	fmt::{self, Debug, Formatter},
	sync::atomic::{AtomicBool, Ordering},
};
use std::{
	sync::Arc,
	thread::{self, ThreadId},
};

use parking_lot::{Condvar, Mutex};
use scopeguard::guard;
use tracing::debug;

/// Owns the stop flag and the callbacks to run when it is set.
pub struct StopSource {
	state: Arc<StopState>,
}

/// A lightweight handle referring to a [`StopSource`] (or to nothing, for
/// [`StopToken::never`]).
#[derive(Clone)]
pub struct StopToken {
	state: Option<Arc<StopState>>,
}

/// The scoped registration of a stop callback.
///
/// Inert when the token was [`never`](`StopToken::never`) or when the
/// callback already ran at registration time.
pub struct StopCallback {
	state: Option<Arc<StopState>>,
	id: u64,
}

struct StopState {
	stopped: AtomicBool,
	registrations: Mutex<Registrations>,
	unblock: Condvar,
}

struct Registrations {
	next_id: u64,
	entries: Vec<Registration>,
	/// The callback currently being invoked by [`StopSource::request_stop`],
	/// and the thread invoking it.
	running: Option<(u64, ThreadId)>,
}

struct Registration {
	id: u64,
	callback: Box<dyn FnOnce() + Send>,
}

impl StopSource {
	#[must_use]
	pub fn new() -> Self {
		Self {
			state: Arc::new(StopState {
				stopped: AtomicBool::new(false),
				registrations: Mutex::new(Registrations {
					next_id: 0,
					entries: Vec::new(),
					running: None,
				}),
				unblock: Condvar::new(),
			}),
		}
	}

	#[must_use]
	pub fn token(&self) -> StopToken {
		StopToken {
			state: Some(self.state.clone()),
		}
	}

	#[must_use]
	pub fn stop_requested(&self) -> bool {
		self.state.stopped.load(Ordering::SeqCst)
	}

	/// Sets the stop flag and runs every registered callback.
	///
	/// **Returns** whether this call was the one that set the flag; callbacks
	/// have all returned by the time this function returns `true`.
	pub fn request_stop(&self) -> bool {
		let mut registrations = self.state.registrations.lock();
		if self.state.stopped.swap(true, Ordering::SeqCst) {
			return false;
		}
		debug!("stop requested");
		while let Some(entry) = registrations.entries.pop() {
			registrations.running = Some((entry.id, thread::current().id()));
			drop(registrations);
			{
				// Clear the running marker even if the callback unwinds.
				let state = &self.state;
				let _clear = guard((), |()| {
					state.registrations.lock().running = None;
					state.unblock.notify_all();
				});
				(entry.callback)();
			}
			registrations = self.state.registrations.lock();
		}
		true
	}
}

impl Default for StopSource {
	fn default() -> Self {
		Self::new()
	}
}

impl StopToken {
	/// A token that can never reach the stopped state.
	#[must_use]
	pub const fn never() -> Self {
		Self { state: None }
	}

	#[must_use]
	pub fn stop_requested(&self) -> bool {
		self.state
			.as_ref()
			.is_some_and(|state| state.stopped.load(Ordering::SeqCst))
	}

	/// Whether a stop request can ever be observed through this token.
	#[must_use]
	pub fn stop_possible(&self) -> bool {
		self.state.is_some()
	}

	/// Registers `callback` to run when the source is stopped.
	///
	/// # Logic
	///
	/// Iff the source is already stopped, `callback` runs synchronously on
	/// the calling thread and the returned registration is inert.
	pub fn on_stop(&self, callback: impl FnOnce() + Send + 'static) -> StopCallback {
		let Some(state) = &self.state else {
			return StopCallback { state: None, id: 0 };
		};
		let mut registrations = state.registrations.lock();
		if state.stopped.load(Ordering::SeqCst) {
			drop(registrations);
			callback();
			return StopCallback { state: None, id: 0 };
		}
		let id = registrations.next_id;
		registrations.next_id += 1;
		registrations.entries.push(Registration {
			id,
			callback: Box::new(callback),
		});
		StopCallback {
			state: Some(state.clone()),
			id,
		}
	}
}

impl Drop for StopCallback {
	fn drop(&mut self) {
		let Some(state) = self.state.take() else { return };
		let mut registrations = state.registrations.lock();
		if let Some(index) = registrations
			.entries
			.iter()
			.position(|entry| entry.id == self.id)
		{
			registrations.entries.swap_remove(index);
			return;
		}
		// The callback already ran, or is running right now. Wait it out,
		// unless this drop happens from inside the callback itself.
		while let Some((running, invoker)) = registrations.running {
			if running != self.id || invoker == thread::current().id() {
				break;
			}
			state.unblock.wait(&mut registrations);
		}
	}
}

impl Debug for StopSource {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("StopSource")
			.field("stopped", &self.stop_requested())
			.finish_non_exhaustive()
	}
}

impl Debug for StopToken {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("StopToken")
			.field("stop_possible", &self.stop_possible())
			.field("stop_requested", &self.stop_requested())
			.finish()
	}
}

impl Debug for StopCallback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("StopCallback")
			.field("registered", &self.state.is_some())
			.finish()
	}
}
