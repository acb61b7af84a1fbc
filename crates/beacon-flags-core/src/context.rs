// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied identity and environment data used to evaluate rules and
/// buckets.
///
/// Contexts are created per evaluation and discarded; they carry no cross-call
/// identity. Every field is optional so a partial context can be merged over a
/// manager-level default with [`EvaluationContext::merged_over`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_email: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub user_groups: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub custom_attributes: HashMap<String, serde_json::Value>,
	/// Defaults to the evaluation instant when unset.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<DateTime<Utc>>,
}

impl EvaluationContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());
		self
	}

	pub fn with_user_email(mut self, user_email: impl Into<String>) -> Self {
		self.user_email = Some(user_email.into());
		self
	}

	pub fn with_group(mut self, group: impl Into<String>) -> Self {
		self.user_groups.push(group.into());
		self
	}

	pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.custom_attributes.insert(key.into(), value);
		self
	}

	pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = Some(timestamp);
		self
	}

	/// The identity string used for bucketing: user id, else user email, else
	/// the empty string. Anonymous callers therefore share one bucket per
	/// seed.
	pub fn identity(&self) -> &str {
		self.user_id
			.as_deref()
			.or(self.user_email.as_deref())
			.unwrap_or("")
	}

	/// The context timestamp, resolved to the current instant when unset.
	pub fn timestamp_or_now(&self) -> DateTime<Utc> {
		self.timestamp.unwrap_or_else(Utc::now)
	}

	/// Merges this context over `defaults`. Explicit fields here win; empty
	/// collections and unset options fall back to the default context.
	pub fn merged_over(&self, defaults: &EvaluationContext) -> EvaluationContext {
		EvaluationContext {
			user_id: self.user_id.clone().or_else(|| defaults.user_id.clone()),
			user_email: self
				.user_email
				.clone()
				.or_else(|| defaults.user_email.clone()),
			user_groups: if self.user_groups.is_empty() {
				defaults.user_groups.clone()
			} else {
				self.user_groups.clone()
			},
			environment: self
				.environment
				.clone()
				.or_else(|| defaults.environment.clone()),
			custom_attributes: if self.custom_attributes.is_empty() {
				defaults.custom_attributes.clone()
			} else {
				self.custom_attributes.clone()
			},
			timestamp: self.timestamp.or(defaults.timestamp),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn test_identity_prefers_user_id() {
		let ctx = EvaluationContext::new()
			.with_user_id("user42")
			.with_user_email("user42@example.com");
		assert_eq!(ctx.identity(), "user42");
	}

	#[test]
	fn test_identity_falls_back_to_email_then_empty() {
		let ctx = EvaluationContext::new().with_user_email("user42@example.com");
		assert_eq!(ctx.identity(), "user42@example.com");

		assert_eq!(EvaluationContext::new().identity(), "");
	}

	#[test]
	fn test_timestamp_or_now_uses_explicit_value() {
		let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
		let ctx = EvaluationContext::new().with_timestamp(ts);
		assert_eq!(ctx.timestamp_or_now(), ts);
	}

	#[test]
	fn test_merged_over_explicit_fields_win() {
		let defaults = EvaluationContext::new()
			.with_environment("prod")
			.with_user_id("default_user")
			.with_attribute("plan", serde_json::json!("free"));

		let overrides = EvaluationContext::new().with_user_id("user42");
		let merged = overrides.merged_over(&defaults);

		assert_eq!(merged.user_id.as_deref(), Some("user42"));
		assert_eq!(merged.environment.as_deref(), Some("prod"));
		assert_eq!(
			merged.custom_attributes.get("plan"),
			Some(&serde_json::json!("free"))
		);
	}

	#[test]
	fn test_merged_over_override_attributes_replace_defaults() {
		let defaults = EvaluationContext::new().with_attribute("plan", serde_json::json!("free"));
		let overrides = EvaluationContext::new().with_attribute("seats", serde_json::json!(5));

		let merged = overrides.merged_over(&defaults);

		// Non-empty override attribute maps replace the defaults wholesale.
		assert!(merged.custom_attributes.contains_key("seats"));
		assert!(!merged.custom_attributes.contains_key("plan"));
	}

	#[test]
	fn test_serde_skips_empty_fields() {
		let json = serde_json::to_string(&EvaluationContext::new()).unwrap();
		assert_eq!(json, "{}");

		let ctx: EvaluationContext = serde_json::from_str(r#"{"user_id": "user42"}"#).unwrap();
		assert_eq!(ctx.user_id.as_deref(), Some("user42"));
	}
}
