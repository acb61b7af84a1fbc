// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The flag manager façade.
//!
//! [`FlagManager`] is the single entry point applications hold: it owns
//! lifecycle (single-flight initialization of the backing store), merges
//! per-call contexts over configured defaults, evaluates flags with a
//! disabled fallback instead of surfaced errors, passes mutations through to
//! the store, and reports every call to the configured [`MonitorHook`].
//!
//! The manager is constructed explicitly by the host (no import-time
//! singleton); build one at startup and share it by `Arc`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use beacon_flags_core::{
	EvaluationContext, EvaluationResult, FeatureFlag, FlagStatus, FlagUpdate,
};
use beacon_flags_store::{FlagStore, FlagsCallback, StoreError, Subscription};

use crate::error::{FlagsError, Result};
use crate::monitor::{MonitorEvent, MonitorHook, NoOpMonitorHook, SharedMonitorHook};

/// Default soft latency budget for one evaluation.
const DEFAULT_EVALUATION_WARN_THRESHOLD: Duration = Duration::from_millis(100);

/// Manager configuration, owned by the host application.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
	/// Environment name merged into contexts that do not set one.
	/// e.g., "dev", "staging", "prod"
	pub environment: String,
	/// Whether this process runs in production. Gates [`FlagManager::toggle_flag`].
	pub production: bool,
	/// Defaults merged under every per-call context.
	pub default_context: EvaluationContext,
	/// Soft latency budget; slower evaluations log a warning but still return
	/// their result.
	pub evaluation_warn_threshold: Duration,
}

impl Default for ManagerConfig {
	fn default() -> Self {
		Self {
			environment: "dev".to_string(),
			production: false,
			default_context: EvaluationContext::new(),
			evaluation_warn_threshold: DEFAULT_EVALUATION_WARN_THRESHOLD,
		}
	}
}

/// Shared, clonable future for one in-flight initialization. The error is
/// carried as a message so every waiter can observe the same failure.
type InitFuture = Shared<BoxFuture<'static, std::result::Result<(), String>>>;

/// Public façade over a flag store and the shared evaluation engine.
pub struct FlagManager {
	store: Arc<dyn FlagStore>,
	monitor: SharedMonitorHook,
	config: ManagerConfig,
	initialized: AtomicBool,
	init_in_flight: Mutex<Option<(u64, InitFuture)>>,
	init_seq: AtomicU64,
}

impl FlagManager {
	/// Starts building a manager around `store`.
	pub fn builder(store: Arc<dyn FlagStore>) -> FlagManagerBuilder {
		FlagManagerBuilder {
			store,
			monitor: Arc::new(NoOpMonitorHook),
			config: ManagerConfig::default(),
		}
	}

	/// True once the backing store has been initialized.
	pub fn is_initialized(&self) -> bool {
		self.initialized.load(Ordering::Acquire)
	}

	/// Initializes the backing store, single-flight.
	///
	/// Concurrent callers all await the same in-flight initialization; the
	/// store's `initialize` runs at most once per attempt. On failure the
	/// manager stays uninitialized, every waiter observes the error, and a
	/// later call may retry.
	pub async fn initialize(&self) -> Result<()> {
		if self.is_initialized() {
			return Ok(());
		}

		let (generation, fut) = {
			let mut slot = self.init_in_flight.lock().await;
			if self.is_initialized() {
				return Ok(());
			}
			match slot.as_ref() {
				Some((generation, fut)) => (*generation, fut.clone()),
				None => {
					let generation = self.init_seq.fetch_add(1, Ordering::Relaxed);
					let store = Arc::clone(&self.store);
					let fut: InitFuture = async move {
						info!("initializing flag store");
						store.initialize().await.map_err(|e| e.to_string())
					}
					.boxed()
					.shared();
					*slot = Some((generation, fut.clone()));
					(generation, fut)
				}
			}
		};

		let outcome = fut.await;

		// Clear the slot only if it still holds our attempt; a newer retry
		// may already be in flight.
		{
			let mut slot = self.init_in_flight.lock().await;
			if matches!(slot.as_ref(), Some((current, _)) if *current == generation) {
				*slot = None;
			}
		}

		match outcome {
			Ok(()) => {
				self.initialized.store(true, Ordering::Release);
				Ok(())
			}
			Err(message) => {
				error!(error = %message, "flag store initialization failed");
				Err(FlagsError::InitializationFailed { message })
			}
		}
	}

	/// Evaluates one flag, never failing.
	///
	/// The per-call context is merged over the configured defaults (explicit
	/// fields win; environment and timestamp are filled in when absent). Any
	/// error on the way - store failure, unevaluable flag, failed lazy
	/// initialization - is logged, reported to the monitor, and converted
	/// into a disabled result with reason "Evaluation error".
	pub async fn evaluate(&self, key: &str, overrides: &EvaluationContext) -> EvaluationResult {
		let started = Instant::now();
		let context = self.merge_context(overrides);

		let result = match self.try_evaluate(key, &context).await {
			Ok(result) => {
				self.monitor
					.track(MonitorEvent::evaluated(key, context, result.clone()))
					.await;
				result
			}
			Err(e) => {
				error!(flag_key = %key, error = %e, "flag evaluation failed, returning disabled fallback");
				self.monitor
					.track(MonitorEvent::error(key, Some(context), &e))
					.await;
				EvaluationResult::error_fallback(key)
			}
		};

		let elapsed = started.elapsed();
		if elapsed > self.config.evaluation_warn_threshold {
			warn!(
				flag_key = %key,
				elapsed_ms = elapsed.as_millis() as u64,
				"flag evaluation exceeded soft latency budget"
			);
		}

		result
	}

	/// Evaluates every flag in the store, never failing.
	///
	/// Per-flag failures become disabled results for their own key; a store
	/// read failure yields an empty map.
	pub async fn evaluate_all(
		&self,
		overrides: &EvaluationContext,
	) -> HashMap<String, EvaluationResult> {
		let context = self.merge_context(overrides);
		match self.try_evaluate_all(&context).await {
			Ok(results) => results,
			Err(e) => {
				error!(error = %e, "bulk flag evaluation failed, returning empty result set");
				HashMap::new()
			}
		}
	}

	/// Flips a flag between enabled and disabled.
	///
	/// Rejected outright in production - this convenience API is for
	/// development and staging; production changes go through the store's own
	/// change process. The rejection is fatal (not retried) and leaves the
	/// store untouched.
	pub async fn toggle_flag(&self, key: &str) -> Result<()> {
		if self.config.production {
			error!(
				flag_key = %key,
				environment = %self.config.environment,
				"refusing to toggle flag in production"
			);
			return Err(FlagsError::ProductionToggleBlocked {
				key: key.to_string(),
			});
		}
		self.initialize().await?;

		let flag = self
			.store
			.get_flag(key)
			.await
			.map_err(FlagsError::from)?
			.ok_or_else(|| StoreError::flag_not_found(key))?;

		// Partial counts as live, so toggling parks it at disabled.
		let next = match flag.status {
			FlagStatus::Disabled => FlagStatus::Enabled,
			FlagStatus::Enabled | FlagStatus::Partial => FlagStatus::Disabled,
		};

		self.store
			.update_flag(key, FlagUpdate::status(next))
			.await
			.map_err(FlagsError::from)?;
		info!(flag_key = %key, status = ?next, "flag toggled");
		self.monitor.track(MonitorEvent::updated(key)).await;
		Ok(())
	}

	/// Applies a partial update to a flag. Mutation failures propagate.
	pub async fn update_flag(&self, key: &str, update: FlagUpdate) -> Result<()> {
		self.initialize().await?;
		match self.store.update_flag(key, update).await {
			Ok(()) => {
				self.monitor.track(MonitorEvent::updated(key)).await;
				Ok(())
			}
			Err(e) => {
				error!(flag_key = %key, error = %e, "flag update failed");
				self.monitor
					.track(MonitorEvent::error(key, None, &e))
					.await;
				Err(e.into())
			}
		}
	}

	/// Returns one flag definition from the store.
	pub async fn get_flag(&self, key: &str) -> Result<Option<FeatureFlag>> {
		self.initialize().await?;
		Ok(self.store.get_flag(key).await?)
	}

	/// Returns every flag definition in the store.
	pub async fn get_all_flags(&self) -> Result<Vec<FeatureFlag>> {
		self.initialize().await?;
		Ok(self.store.get_all_flags().await?)
	}

	/// Registers a callback for flag-set changes; pass-through to the store.
	/// The returned handle's `unsubscribe` is idempotent.
	pub fn subscribe(&self, callback: FlagsCallback) -> Subscription {
		self.store.subscribe(callback)
	}

	async fn try_evaluate(
		&self,
		key: &str,
		context: &EvaluationContext,
	) -> Result<EvaluationResult> {
		self.initialize().await?;
		Ok(self.store.evaluate(key, context).await?)
	}

	async fn try_evaluate_all(
		&self,
		context: &EvaluationContext,
	) -> Result<HashMap<String, EvaluationResult>> {
		self.initialize().await?;
		Ok(self.store.evaluate_all(context).await?)
	}

	fn merge_context(&self, overrides: &EvaluationContext) -> EvaluationContext {
		let mut context = overrides.merged_over(&self.config.default_context);
		if context.environment.is_none() {
			context.environment = Some(self.config.environment.clone());
		}
		if context.timestamp.is_none() {
			context.timestamp = Some(Utc::now());
		}
		context
	}
}

/// Builder for [`FlagManager`].
pub struct FlagManagerBuilder {
	store: Arc<dyn FlagStore>,
	monitor: SharedMonitorHook,
	config: ManagerConfig,
}

impl FlagManagerBuilder {
	/// Sets the monitor hook receiving evaluation and mutation events.
	pub fn monitor(mut self, monitor: impl MonitorHook) -> Self {
		self.monitor = Arc::new(monitor);
		self
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: ManagerConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the environment name merged into contexts.
	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.config.environment = environment.into();
		self
	}

	/// Marks this process as production, blocking `toggle_flag`.
	pub fn production(mut self, production: bool) -> Self {
		self.config.production = production;
		self
	}

	/// Sets the defaults merged under every per-call context.
	pub fn default_context(mut self, context: EvaluationContext) -> Self {
		self.config.default_context = context;
		self
	}

	/// Sets the soft latency budget for one evaluation.
	pub fn evaluation_warn_threshold(mut self, threshold: Duration) -> Self {
		self.config.evaluation_warn_threshold = threshold;
		self
	}

	pub fn build(self) -> FlagManager {
		FlagManager {
			store: self.store,
			monitor: self.monitor,
			config: self.config,
			initialized: AtomicBool::new(false),
			init_in_flight: Mutex::new(None),
			init_seq: AtomicU64::new(0),
		}
	}
}
