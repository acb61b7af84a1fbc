// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// Why an evaluation produced its result.
///
/// The `Display` form of each variant is a stable, human-readable short code
/// that callers may log or assert on; these strings are part of the public
/// contract and must not drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationReason {
	/// The requested key does not exist in the store.
	FlagNotFound,
	/// The flag status is `disabled`.
	Disabled,
	/// The activation window has not opened yet.
	NotYetActive,
	/// The activation window has closed.
	Expired,
	/// A targeting rule matched the context.
	RuleMatch,
	/// The identity's bucket fell outside the rollout percentage.
	NotInRollout,
	/// No rule or rollout gate applied; the flag is enabled by default.
	Default,
	/// Evaluation failed; the caller received the disabled fallback.
	Error,
}

impl std::fmt::Display for EvaluationReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::FlagNotFound => "Flag not found",
			Self::Disabled => "Flag is disabled",
			Self::NotYetActive => "Flag not yet active",
			Self::Expired => "Flag has expired",
			Self::RuleMatch => "Rule matched",
			Self::NotInRollout => "Not in rollout percentage",
			Self::Default => "Default enabled",
			Self::Error => "Evaluation error",
		};
		write!(f, "{}", s)
	}
}

/// Outcome of evaluating one flag against one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
	pub flag_key: String,
	pub enabled: bool,
	/// Selected variant key, for `variant`-type flags.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variant: Option<String>,
	pub reason: EvaluationReason,
	/// Payload of the selected variant, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<serde_json::Value>,
}

impl EvaluationResult {
	/// Creates an enabled result with the given reason.
	pub fn enabled(flag_key: impl Into<String>, reason: EvaluationReason) -> Self {
		Self {
			flag_key: flag_key.into(),
			enabled: true,
			variant: None,
			reason,
			metadata: None,
		}
	}

	/// Creates a disabled result with the given reason.
	pub fn disabled(flag_key: impl Into<String>, reason: EvaluationReason) -> Self {
		Self {
			flag_key: flag_key.into(),
			enabled: false,
			variant: None,
			reason,
			metadata: None,
		}
	}

	/// The disabled result for a key that does not exist in the store.
	pub fn not_found(flag_key: impl Into<String>) -> Self {
		Self::disabled(flag_key, EvaluationReason::FlagNotFound)
	}

	/// The disabled fallback returned when evaluation itself failed.
	pub fn error_fallback(flag_key: impl Into<String>) -> Self {
		Self::disabled(flag_key, EvaluationReason::Error)
	}

	/// Attaches the selected variant key and its payload.
	pub fn with_variant(mut self, key: impl Into<String>, payload: Option<serde_json::Value>) -> Self {
		self.variant = Some(key.into());
		self.metadata = payload;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_reason_display_strings_are_stable() {
		assert_eq!(EvaluationReason::FlagNotFound.to_string(), "Flag not found");
		assert_eq!(EvaluationReason::Disabled.to_string(), "Flag is disabled");
		assert_eq!(
			EvaluationReason::NotYetActive.to_string(),
			"Flag not yet active"
		);
		assert_eq!(EvaluationReason::Expired.to_string(), "Flag has expired");
		assert_eq!(EvaluationReason::RuleMatch.to_string(), "Rule matched");
		assert_eq!(
			EvaluationReason::NotInRollout.to_string(),
			"Not in rollout percentage"
		);
		assert_eq!(EvaluationReason::Default.to_string(), "Default enabled");
		assert_eq!(EvaluationReason::Error.to_string(), "Evaluation error");
	}

	#[test]
	fn test_constructors() {
		let result = EvaluationResult::not_found("nonexistent");
		assert!(!result.enabled);
		assert_eq!(result.reason, EvaluationReason::FlagNotFound);

		let result = EvaluationResult::enabled("beta", EvaluationReason::Default)
			.with_variant("control", Some(serde_json::json!({"color": "blue"})));
		assert!(result.enabled);
		assert_eq!(result.variant.as_deref(), Some("control"));
		assert_eq!(
			result.metadata,
			Some(serde_json::json!({"color": "blue"}))
		);
	}

	#[test]
	fn test_result_serde_roundtrip() {
		let result = EvaluationResult::enabled("beta", EvaluationReason::RuleMatch);
		let json = serde_json::to_string(&result).unwrap();
		let parsed: EvaluationResult = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, result);
		assert!(json.contains(r#""reason":"rule_match""#));
	}
}
