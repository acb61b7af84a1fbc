// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The storage contract every flag backend implements.
//!
//! Backends own persistence and transport; the evaluation pipeline is shared.
//! `evaluate` and `evaluate_all` are provided methods that delegate to the
//! canonical engine in `beacon-flags-core`, so a backend cannot accidentally
//! ship its own divergent pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_flags_core::{
	engine, EvaluationContext, EvaluationResult, FeatureFlag, FlagUpdate,
};

use crate::error::Result;
use crate::registry::Subscription;

/// Callback invoked with the full updated flag list whenever the underlying
/// flag set changes.
pub type FlagsCallback = Arc<dyn Fn(Vec<FeatureFlag>) + Send + Sync>;

/// Contract for flag storage backends.
///
/// `initialize` must be called before reads and mutations. Backends may cache
/// reads behind a TTL, but must invalidate no later than the TTL elapses, and
/// a refresh must never expose a partially-updated flag set to a concurrent
/// reader (replace the snapshot, then publish it).
#[async_trait]
pub trait FlagStore: Send + Sync {
	/// Prepares the backend for reads and mutations.
	async fn initialize(&self) -> Result<()>;

	/// Returns every flag currently in the store.
	async fn get_all_flags(&self) -> Result<Vec<FeatureFlag>>;

	/// Returns one flag by key, or `None` when absent.
	async fn get_flag(&self, key: &str) -> Result<Option<FeatureFlag>>;

	/// Applies a partial update to an existing flag.
	async fn update_flag(&self, key: &str, update: FlagUpdate) -> Result<()>;

	/// Registers a callback for flag-set changes.
	///
	/// The callback always receives the full current flag list, never a diff.
	/// The returned handle's `unsubscribe` is idempotent.
	fn subscribe(&self, callback: FlagsCallback) -> Subscription;

	/// Evaluates one flag through the shared engine.
	///
	/// An absent key yields a disabled result with reason "Flag not found";
	/// only backend failures and unevaluable flag definitions error.
	async fn evaluate(
		&self,
		key: &str,
		context: &EvaluationContext,
	) -> Result<EvaluationResult> {
		match self.get_flag(key).await? {
			Some(flag) => Ok(engine::evaluate_flag(&flag, context)?),
			None => Ok(EvaluationResult::not_found(key)),
		}
	}

	/// Evaluates every flag through the shared engine.
	///
	/// Per-flag failures are isolated into disabled results; only a backend
	/// read failure errors.
	async fn evaluate_all(
		&self,
		context: &EvaluationContext,
	) -> Result<HashMap<String, EvaluationResult>> {
		let flags = self.get_all_flags().await?;
		Ok(engine::evaluate_all(&flags, context))
	}
}

/// One change to the flag set, as delivered by a push transport.
///
/// A backend with real-time push converts each event into a store mutation
/// followed by a subscriber notification carrying the full flag list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum FlagChange {
	/// Full replacement of the flag set.
	#[serde(rename = "snapshot")]
	Snapshot(SnapshotData),

	/// One flag was patched.
	#[serde(rename = "flag.updated")]
	FlagUpdated(FlagUpdatedData),

	/// One flag was removed.
	#[serde(rename = "flag.removed")]
	FlagRemoved(FlagRemovedData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
	pub flags: Vec<FeatureFlag>,
	pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagUpdatedData {
	pub flag_key: String,
	pub update: FlagUpdate,
	pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRemovedData {
	pub flag_key: String,
	pub timestamp: DateTime<Utc>,
}

impl FlagChange {
	/// Returns the event type name as a string.
	pub fn event_type(&self) -> &'static str {
		match self {
			FlagChange::Snapshot(_) => "snapshot",
			FlagChange::FlagUpdated(_) => "flag.updated",
			FlagChange::FlagRemoved(_) => "flag.removed",
		}
	}

	/// Creates a snapshot event carrying the full flag set.
	pub fn snapshot(flags: Vec<FeatureFlag>) -> Self {
		FlagChange::Snapshot(SnapshotData {
			flags,
			timestamp: Utc::now(),
		})
	}

	/// Creates a flag-updated event.
	pub fn flag_updated(flag_key: impl Into<String>, update: FlagUpdate) -> Self {
		FlagChange::FlagUpdated(FlagUpdatedData {
			flag_key: flag_key.into(),
			update,
			timestamp: Utc::now(),
		})
	}

	/// Creates a flag-removed event.
	pub fn flag_removed(flag_key: impl Into<String>) -> Self {
		FlagChange::FlagRemoved(FlagRemovedData {
			flag_key: flag_key.into(),
			timestamp: Utc::now(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_event_type_matches_serialized_tag() {
		let events = vec![
			FlagChange::snapshot(vec![]),
			FlagChange::flag_updated("beta", FlagUpdate::default()),
			FlagChange::flag_removed("beta"),
		];

		for event in events {
			let event_type = event.event_type();
			let json = serde_json::to_string(&event).unwrap();
			assert!(json.contains(&format!(r#""event":"{}""#, event_type)));
		}
	}

	#[test]
	fn test_flag_change_roundtrip() {
		let event = FlagChange::flag_removed("checkout.new_flow");
		let json = serde_json::to_string(&event).unwrap();
		let parsed: FlagChange = serde_json::from_str(&json).unwrap();

		if let FlagChange::FlagRemoved(data) = parsed {
			assert_eq!(data.flag_key, "checkout.new_flow");
		} else {
			panic!("Expected FlagRemoved event");
		}
	}
}
