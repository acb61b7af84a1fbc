// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Monitor integration for flag evaluation tracking.
//!
//! The manager reports every evaluation, mutation, and failure to a
//! [`MonitorHook`]. Hosts implement the trait to feed dashboards, exposure
//! analytics, or alerting; the default [`NoOpMonitorHook`] discards events.
//!
//! Hooks run on the evaluation path. Keep implementations fast and
//! non-blocking; queue expensive work (HTTP, database writes) onto a
//! background task and swallow internal failures rather than letting them
//! reach callers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_flags_core::{EvaluationContext, EvaluationResult};

/// What kind of manager activity an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorEventKind {
	/// A flag was evaluated (successfully).
	Evaluated,
	/// A flag was mutated through the manager.
	Updated,
	/// An evaluation or mutation failed.
	Error,
}

/// One tracked manager event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
	#[serde(rename = "type")]
	pub kind: MonitorEventKind,
	pub flag_key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub context: Option<EvaluationContext>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<EvaluationResult>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub timestamp: DateTime<Utc>,
}

impl MonitorEvent {
	/// Creates an event for a successful evaluation.
	pub fn evaluated(
		flag_key: impl Into<String>,
		context: EvaluationContext,
		result: EvaluationResult,
	) -> Self {
		Self {
			kind: MonitorEventKind::Evaluated,
			flag_key: flag_key.into(),
			context: Some(context),
			result: Some(result),
			error: None,
			timestamp: Utc::now(),
		}
	}

	/// Creates an event for a flag mutation.
	pub fn updated(flag_key: impl Into<String>) -> Self {
		Self {
			kind: MonitorEventKind::Updated,
			flag_key: flag_key.into(),
			context: None,
			result: None,
			error: None,
			timestamp: Utc::now(),
		}
	}

	/// Creates an event for a failed evaluation or mutation.
	pub fn error(
		flag_key: impl Into<String>,
		context: Option<EvaluationContext>,
		error: impl std::fmt::Display,
	) -> Self {
		Self {
			kind: MonitorEventKind::Error,
			flag_key: flag_key.into(),
			context,
			result: None,
			error: Some(error.to_string()),
			timestamp: Utc::now(),
		}
	}
}

/// Trait for receiving flag manager events.
#[async_trait]
pub trait MonitorHook: Send + Sync + 'static {
	/// Called after every evaluation (success or fallback) and after every
	/// mutation through the manager.
	async fn track(&self, event: MonitorEvent);
}

/// Type alias for a shared monitor hook.
pub type SharedMonitorHook = Arc<dyn MonitorHook>;

/// A no-op monitor hook that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMonitorHook;

#[async_trait]
impl MonitorHook for NoOpMonitorHook {
	async fn track(&self, _event: MonitorEvent) {
		// No-op: discard the event
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use beacon_flags_core::EvaluationReason;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn test_event_constructors() {
		let ctx = EvaluationContext::new().with_user_id("user42");
		let result = EvaluationResult::enabled("beta", EvaluationReason::Default);

		let event = MonitorEvent::evaluated("beta", ctx.clone(), result);
		assert_eq!(event.kind, MonitorEventKind::Evaluated);
		assert_eq!(event.flag_key, "beta");
		assert!(event.result.is_some());
		assert!(event.error.is_none());

		let event = MonitorEvent::updated("beta");
		assert_eq!(event.kind, MonitorEventKind::Updated);

		let event = MonitorEvent::error("beta", Some(ctx), "backend error: timeout");
		assert_eq!(event.kind, MonitorEventKind::Error);
		assert_eq!(event.error.as_deref(), Some("backend error: timeout"));
	}

	#[test]
	fn test_event_serializes_kind_as_type() {
		let event = MonitorEvent::updated("beta");
		let json = serde_json::to_string(&event).unwrap();
		assert!(json.contains(r#""type":"updated""#));
	}

	struct CountingHook {
		count: AtomicUsize,
	}

	#[async_trait]
	impl MonitorHook for CountingHook {
		async fn track(&self, _event: MonitorEvent) {
			self.count.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[tokio::test]
	async fn test_hook_is_called() {
		let hook = CountingHook {
			count: AtomicUsize::new(0),
		};
		hook.track(MonitorEvent::updated("beta")).await;
		assert_eq!(hook.count.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_noop_hook_does_nothing() {
		NoOpMonitorHook.track(MonitorEvent::updated("beta")).await;
	}
}
