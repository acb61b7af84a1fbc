// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory pub/sub for flag-set change notifications.
//!
//! The registry is fire-and-forget from the store's point of view: each
//! callback runs on its own spawned task, so a slow or panicking subscriber
//! cannot block the store or starve the other subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;
use uuid::Uuid;

use beacon_flags_core::FeatureFlag;

use crate::store::FlagsCallback;

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for SubscriptionId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Registry of flag-change subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
	subscribers: Mutex<HashMap<SubscriptionId, FlagsCallback>>,
}

impl SubscriberRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a callback and returns its subscription handle.
	pub fn subscribe(self: &Arc<Self>, callback: FlagsCallback) -> Subscription {
		let id = SubscriptionId::new();
		self.subscribers
			.lock()
			.expect("subscriber registry lock poisoned")
			.insert(id, callback);
		debug!(subscription_id = %id, "subscriber registered");

		Subscription {
			id,
			registry: Arc::downgrade(self),
		}
	}

	/// Removes a subscription. Returns false when it was already gone.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let removed = self
			.subscribers
			.lock()
			.expect("subscriber registry lock poisoned")
			.remove(&id)
			.is_some();
		if removed {
			debug!(subscription_id = %id, "subscriber removed");
		}
		removed
	}

	/// Notifies every subscriber with the full current flag list.
	///
	/// Each callback runs on its own task; panics and slowness stay contained
	/// to that task.
	pub fn notify(&self, flags: Vec<FeatureFlag>) {
		let callbacks: Vec<FlagsCallback> = self
			.subscribers
			.lock()
			.expect("subscriber registry lock poisoned")
			.values()
			.cloned()
			.collect();

		for callback in callbacks {
			let flags = flags.clone();
			tokio::spawn(async move {
				callback(flags);
			});
		}
	}

	/// Number of live subscriptions.
	pub fn len(&self) -> usize {
		self.subscribers
			.lock()
			.expect("subscriber registry lock poisoned")
			.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Handle to a registered subscription.
///
/// `unsubscribe` is explicit and idempotent; dropping the handle does not
/// remove the subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
	id: SubscriptionId,
	registry: Weak<SubscriberRegistry>,
}

impl Subscription {
	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Removes the subscription. Safe to call any number of times, including
	/// after the owning store is gone.
	pub fn unsubscribe(&self) {
		if let Some(registry) = self.registry.upgrade() {
			registry.unsubscribe(self.id);
		}
	}
}
