// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory reference implementation of the flag store contract.
//!
//! The flag set is held as an immutable snapshot behind an `Arc`; mutations
//! build a new snapshot and swap it in, so a concurrent reader always sees
//! either the old set or the new one, never a half-applied update. Every
//! mutation notifies subscribers with the full current flag list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use beacon_flags_core::{FeatureFlag, FlagUpdate};

use crate::error::{Result, StoreError};
use crate::registry::{SubscriberRegistry, Subscription};
use crate::store::{FlagChange, FlagStore, FlagsCallback};

type Snapshot = Arc<HashMap<String, FeatureFlag>>;

/// In-memory flag store, used as the reference backend and in tests.
#[derive(Default)]
pub struct MemoryFlagStore {
	flags: RwLock<Snapshot>,
	initialized: AtomicBool,
	registry: Arc<SubscriberRegistry>,
}

impl MemoryFlagStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store pre-seeded with `flags`. Definitions are validated up
	/// front so the evaluation path never sees a malformed flag.
	pub fn with_flags(flags: Vec<FeatureFlag>) -> Result<Self> {
		let store = Self::new();
		let mut map = HashMap::with_capacity(flags.len());
		for flag in flags {
			flag.validate()?;
			map.insert(flag.key.clone(), flag);
		}
		*store.write_lock() = Arc::new(map);
		Ok(store)
	}

	/// Inserts or replaces a flag, then notifies subscribers.
	pub fn upsert_flag(&self, flag: FeatureFlag) -> Result<()> {
		self.ensure_initialized()?;
		flag.validate()?;

		let key = flag.key.clone();
		self.mutate(|map| {
			map.insert(key.clone(), flag);
			Ok(())
		})?;
		debug!(flag_key = %key, "flag upserted");
		Ok(())
	}

	/// Removes a flag, then notifies subscribers. Removing an absent key is a
	/// no-op that still succeeds.
	pub fn remove_flag(&self, key: &str) -> Result<()> {
		self.ensure_initialized()?;
		self.mutate(|map| {
			map.remove(key);
			Ok(())
		})
	}

	/// Applies one push event as a store mutation followed by a full-list
	/// subscriber notification.
	pub fn apply_change(&self, change: FlagChange) -> Result<()> {
		self.ensure_initialized()?;
		debug!(event_type = change.event_type(), "applying flag change");

		match change {
			FlagChange::Snapshot(data) => {
				let mut map = HashMap::with_capacity(data.flags.len());
				for flag in data.flags {
					flag.validate()?;
					map.insert(flag.key.clone(), flag);
				}
				let snapshot: Snapshot = Arc::new(map);
				*self.write_lock() = snapshot;
				self.notify_subscribers();
				Ok(())
			}
			FlagChange::FlagUpdated(data) => self.mutate(|map| {
				let flag = map
					.get_mut(&data.flag_key)
					.ok_or_else(|| StoreError::flag_not_found(&data.flag_key))?;
				data.update.apply(flag);
				flag.validate()?;
				Ok(())
			}),
			FlagChange::FlagRemoved(data) => self.mutate(|map| {
				map.remove(&data.flag_key);
				Ok(())
			}),
		}
	}

	/// Number of live subscriptions, exposed for diagnostics.
	pub fn subscriber_count(&self) -> usize {
		self.registry.len()
	}

	fn ensure_initialized(&self) -> Result<()> {
		if !self.initialized.load(Ordering::Acquire) {
			return Err(StoreError::NotInitialized);
		}
		Ok(())
	}

	/// Clones the current snapshot, applies `f`, swaps the new snapshot in,
	/// and notifies subscribers. Readers never observe the intermediate map.
	fn mutate(&self, f: impl FnOnce(&mut HashMap<String, FeatureFlag>) -> Result<()>) -> Result<()> {
		{
			let mut guard = self.write_lock();
			let mut next: HashMap<String, FeatureFlag> = (**guard).clone();
			f(&mut next)?;
			*guard = Arc::new(next);
		}
		self.notify_subscribers();
		Ok(())
	}

	fn notify_subscribers(&self) {
		self.registry.notify(self.sorted_flags());
	}

	fn sorted_flags(&self) -> Vec<FeatureFlag> {
		let snapshot = Arc::clone(&*self.read_lock());
		let mut flags: Vec<FeatureFlag> = snapshot.values().cloned().collect();
		flags.sort_by(|a, b| a.key.cmp(&b.key));
		flags
	}

	fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
		self.flags.read().unwrap_or_else(|e| e.into_inner())
	}

	fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, Snapshot> {
		self.flags.write().unwrap_or_else(|e| e.into_inner())
	}
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
	async fn initialize(&self) -> Result<()> {
		self.initialized.store(true, Ordering::Release);
		info!(flags = self.read_lock().len(), "memory flag store initialized");
		Ok(())
	}

	async fn get_all_flags(&self) -> Result<Vec<FeatureFlag>> {
		self.ensure_initialized()?;
		Ok(self.sorted_flags())
	}

	async fn get_flag(&self, key: &str) -> Result<Option<FeatureFlag>> {
		self.ensure_initialized()?;
		Ok(self.read_lock().get(key).cloned())
	}

	async fn update_flag(&self, key: &str, update: FlagUpdate) -> Result<()> {
		self.ensure_initialized()?;
		self.mutate(|map| {
			let flag = map
				.get_mut(key)
				.ok_or_else(|| StoreError::flag_not_found(key))?;
			update.apply(flag);
			flag.validate()?;
			Ok(())
		})?;
		debug!(flag_key = %key, "flag updated");
		Ok(())
	}

	fn subscribe(&self, callback: FlagsCallback) -> Subscription {
		self.registry.subscribe(callback)
	}
}
