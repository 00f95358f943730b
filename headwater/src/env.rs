//! Receiver environments: keyed read-only queries resolved through a shared
//! chain.
//!
//! An [`Env`] is a persistent map from *query keys* (types implementing
//! [`Query`]) to values. Environments compose by prepending: entries added
//! later shadow entries added earlier, and [`Env::without`] masks a key for
//! the rest of the chain. Cloning an [`Env`] shares the chain.

use core::any::{Any, TypeId};
use std::sync::Arc;

use crate::{erased::AnyScheduler, stop::StopToken};

/// A typed environment key.
///
/// The key type itself is the lookup identity; `Value` is what a lookup
/// yields. Downstream code can define additional keys freely.
pub trait Query: 'static {
	type Value: Clone + Send + Sync + 'static;
}

/// The keyed read-only environment exposed by a receiver.
#[derive(Clone, Default)]
pub struct Env {
	head: Option<Arc<EnvNode>>,
}

struct EnvNode {
	key: TypeId,
	/// `None` masks any older entry for the same key.
	value: Option<Box<dyn Any + Send + Sync>>,
	parent: Option<Arc<EnvNode>>,
}

impl Env {
	/// The empty environment.
	#[must_use]
	pub const fn new() -> Self {
		Self { head: None }
	}

	/// Returns this environment with an entry for `Q` prepended, shadowing
	/// any earlier entry for the same key.
	#[must_use]
	pub fn with<Q: Query>(&self, value: Q::Value) -> Self {
		Self {
			head: Some(Arc::new(EnvNode {
				key: TypeId::of::<Q>(),
				value: Some(Box::new(value)),
				parent: self.head.clone(),
			})),
		}
	}

	/// Returns this environment with any entry for `Q` masked.
	#[must_use]
	pub fn without<Q: Query>(&self) -> Self {
		Self {
			head: Some(Arc::new(EnvNode {
				key: TypeId::of::<Q>(),
				value: None,
				parent: self.head.clone(),
			})),
		}
	}

	/// Looks `Q` up, newest entry first.
	#[must_use]
	pub fn get<Q: Query>(&self) -> Option<Q::Value> {
		let mut node = self.head.as_deref();
		while let Some(current) = node {
			if current.key == TypeId::of::<Q>() {
				return current
					.value
					.as_ref()
					.and_then(|value| value.downcast_ref::<Q::Value>())
					.cloned();
			}
			node = current.parent.as_deref();
		}
		None
	}

	/// The stop token under which the owning receiver runs.
	///
	/// Falls back to [`StopToken::never`] when no token was installed.
	#[must_use]
	pub fn stop_token(&self) -> StopToken {
		self.get::<GetStopToken>().unwrap_or(StopToken::never())
	}

	/// The scheduler the current computation nominally runs on, if known.
	#[must_use]
	pub fn scheduler(&self) -> Option<AnyScheduler> {
		self.get::<GetScheduler>()
	}
}

/// Key: the scheduler the current computation nominally runs on.
pub struct GetScheduler;

impl Query for GetScheduler {
	type Value = AnyScheduler;
}

/// Key: the scheduler that blocking consumers may delegate queued work to.
pub struct GetDelegateeScheduler;

impl Query for GetDelegateeScheduler {
	type Value = AnyScheduler;
}

/// Key: the stop token the owning receiver observes.
pub struct GetStopToken;

impl Query for GetStopToken {
	type Value = StopToken;
}

/// Key: the composition-time dispatch domain.
pub struct GetDomain;

impl Query for GetDomain {
	type Value = Domain;
}

/// An opaque composition-time dispatch tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain(pub &'static str);

/// How far a scheduler's execution agents are guaranteed to make progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardProgressGuarantee {
	Concurrent,
	Parallel,
	WeaklyParallel,
}

/// The error reported when a required environment entry is absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("environment query `{query}` has no value")]
pub struct QueryMissing {
	pub query: &'static str,
}
