// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! TTL read-cache decorator for flag stores.
//!
//! Wraps any [`FlagStore`] and serves reads from an in-memory snapshot until
//! the TTL elapses. A refresh fetches the full flag set first and swaps the
//! snapshot in one write, so a concurrent reader sees either the previous
//! snapshot or the new one in full. Writes go straight through to the inner
//! store and drop the snapshot immediately, keeping read-your-writes within
//! one process even before the TTL expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use beacon_flags_core::{FeatureFlag, FlagUpdate};

use crate::error::Result;
use crate::registry::Subscription;
use crate::store::{FlagStore, FlagsCallback};

struct CachedSnapshot {
	flags: Arc<Vec<FeatureFlag>>,
	fetched_at: Instant,
}

/// Caches reads from an inner flag store behind a TTL.
pub struct CachedFlagStore<S> {
	inner: S,
	ttl: Duration,
	snapshot: RwLock<Option<CachedSnapshot>>,
}

impl<S: FlagStore> CachedFlagStore<S> {
	pub fn new(inner: S, ttl: Duration) -> Self {
		Self {
			inner,
			ttl,
			snapshot: RwLock::new(None),
		}
	}

	/// Drops the cached snapshot; the next read refetches from the inner
	/// store.
	pub async fn invalidate(&self) {
		*self.snapshot.write().await = None;
	}

	/// Returns the cached flag list, refreshing from the inner store when the
	/// snapshot is missing or older than the TTL.
	async fn snapshot(&self) -> Result<Arc<Vec<FeatureFlag>>> {
		{
			let guard = self.snapshot.read().await;
			if let Some(cached) = guard.as_ref() {
				if cached.fetched_at.elapsed() < self.ttl {
					return Ok(Arc::clone(&cached.flags));
				}
			}
		}

		// Fetch outside the lock, then publish the complete snapshot.
		let flags = Arc::new(self.inner.get_all_flags().await?);
		debug!(flags = flags.len(), "flag cache refreshed");

		let mut guard = self.snapshot.write().await;
		*guard = Some(CachedSnapshot {
			flags: Arc::clone(&flags),
			fetched_at: Instant::now(),
		});
		Ok(flags)
	}
}

#[async_trait]
impl<S: FlagStore> FlagStore for CachedFlagStore<S> {
	async fn initialize(&self) -> Result<()> {
		self.inner.initialize().await?;
		self.invalidate().await;
		Ok(())
	}

	async fn get_all_flags(&self) -> Result<Vec<FeatureFlag>> {
		Ok(self.snapshot().await?.as_ref().clone())
	}

	async fn get_flag(&self, key: &str) -> Result<Option<FeatureFlag>> {
		let snapshot = self.snapshot().await?;
		Ok(snapshot.iter().find(|f| f.key == key).cloned())
	}

	async fn update_flag(&self, key: &str, update: FlagUpdate) -> Result<()> {
		self.inner.update_flag(key, update).await?;
		self.invalidate().await;
		Ok(())
	}

	fn subscribe(&self, callback: FlagsCallback) -> Subscription {
		self.inner.subscribe(callback)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::StoreError;
	use beacon_flags_core::{FlagStatus, FlagType, FlagValue};
	use std::collections::HashMap;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	fn test_flag(key: &str) -> FeatureFlag {
		FeatureFlag {
			key: key.to_string(),
			name: key.to_string(),
			description: None,
			flag_type: FlagType::Boolean,
			status: FlagStatus::Enabled,
			default_value: FlagValue::Boolean(true),
			rules: vec![],
			variants: vec![],
			rollout_percentage: None,
			start_date: None,
			end_date: None,
			tags: vec![],
			metadata: None,
		}
	}

	/// Inner store that counts full reads.
	#[derive(Default)]
	struct CountingStore {
		flags: Mutex<HashMap<String, FeatureFlag>>,
		reads: AtomicUsize,
	}

	impl CountingStore {
		fn with_flags(flags: Vec<FeatureFlag>) -> Self {
			let store = Self::default();
			{
				let mut guard = store.flags.lock().unwrap();
				for flag in flags {
					guard.insert(flag.key.clone(), flag);
				}
			}
			store
		}

		fn reads(&self) -> usize {
			self.reads.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl FlagStore for CountingStore {
		async fn initialize(&self) -> Result<()> {
			Ok(())
		}

		async fn get_all_flags(&self) -> Result<Vec<FeatureFlag>> {
			self.reads.fetch_add(1, Ordering::SeqCst);
			Ok(self.flags.lock().unwrap().values().cloned().collect())
		}

		async fn get_flag(&self, key: &str) -> Result<Option<FeatureFlag>> {
			Ok(self.flags.lock().unwrap().get(key).cloned())
		}

		async fn update_flag(&self, key: &str, update: FlagUpdate) -> Result<()> {
			let mut guard = self.flags.lock().unwrap();
			let flag = guard
				.get_mut(key)
				.ok_or_else(|| StoreError::flag_not_found(key))?;
			update.apply(flag);
			Ok(())
		}

		fn subscribe(&self, _callback: FlagsCallback) -> Subscription {
			unimplemented!("not exercised by cache tests")
		}
	}

	#[tokio::test]
	async fn test_reads_within_ttl_hit_the_cache() {
		let inner = CountingStore::with_flags(vec![test_flag("beta")]);
		let cached = CachedFlagStore::new(inner, Duration::from_secs(60));
		cached.initialize().await.unwrap();

		assert_eq!(cached.get_all_flags().await.unwrap().len(), 1);
		assert!(cached.get_flag("beta").await.unwrap().is_some());
		assert!(cached.get_flag("nonexistent").await.unwrap().is_none());

		assert_eq!(cached.inner.reads(), 1);
	}

	#[tokio::test]
	async fn test_expired_snapshot_is_refetched() {
		let inner = CountingStore::with_flags(vec![test_flag("beta")]);
		// Zero TTL: every read is already stale.
		let cached = CachedFlagStore::new(inner, Duration::ZERO);
		cached.initialize().await.unwrap();

		cached.get_all_flags().await.unwrap();
		cached.get_all_flags().await.unwrap();

		assert_eq!(cached.inner.reads(), 2);
	}

	#[tokio::test]
	async fn test_update_invalidates_immediately() {
		let inner = CountingStore::with_flags(vec![test_flag("beta")]);
		let cached = CachedFlagStore::new(inner, Duration::from_secs(60));
		cached.initialize().await.unwrap();

		// Prime the cache, then write through.
		assert_eq!(
			cached.get_flag("beta").await.unwrap().unwrap().status,
			FlagStatus::Enabled
		);
		cached
			.update_flag("beta", FlagUpdate::status(FlagStatus::Disabled))
			.await
			.unwrap();

		// Read-your-writes without waiting for the TTL.
		assert_eq!(
			cached.get_flag("beta").await.unwrap().unwrap().status,
			FlagStatus::Disabled
		);
		assert_eq!(cached.inner.reads(), 2);
	}
}
