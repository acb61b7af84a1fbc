// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FlagsError, Result};
use crate::rule::FeatureRule;

/// The kind of decision a flag resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
	/// Plain on/off toggle.
	Boolean,
	/// On/off toggle gated by a percentage rollout.
	Percentage,
	/// Resolves to one of several weighted variants.
	Variant,
	/// Progressive release toggle; behaves like `Percentage` with a window.
	Release,
}

/// Coarse override gate, checked before any rule or rollout logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagStatus {
	Enabled,
	Disabled,
	/// Enabled, but subject to rules and rollout percentage.
	Partial,
}

/// A flag's default value when no rule or rollout logic overrides it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
	Boolean(bool),
	Number(f64),
	String(String),
}

/// One of several named alternatives a `variant`-type flag can resolve to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVariant {
	pub key: String,
	pub name: String,
	/// Percentage share of traffic. All-zero weights fall back to a uniform
	/// split over the variant list.
	pub weight: u32,
	/// Arbitrary payload attached to evaluation results for this variant.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<serde_json::Value>,
}

/// Definition of one feature toggle.
///
/// Flags are created and mutated through a flag store backend; the
/// evaluation engine only reads them. `key` is the immutable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
	/// Unique identifier, immutable after creation. e.g., "checkout.new_flow"
	pub key: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(rename = "type")]
	pub flag_type: FlagType,
	pub status: FlagStatus,
	pub default_value: FlagValue,
	/// Ordered: the first matching rule wins.
	#[serde(default)]
	pub rules: Vec<FeatureRule>,
	/// Required (non-empty) when `flag_type` is [`FlagType::Variant`].
	#[serde(default)]
	pub variants: Vec<FeatureVariant>,
	/// Share of identities enabled by default, `0..=100`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rollout_percentage: Option<u8>,
	/// Start of the activation window, inclusive.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_date: Option<DateTime<Utc>>,
	/// End of the activation window, inclusive.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end_date: Option<DateTime<Utc>>,
	/// Free-form annotations; never evaluated.
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<serde_json::Value>,
}

impl FeatureFlag {
	/// Validates the flag key format.
	///
	/// Valid keys:
	/// - Start with a lowercase letter
	/// - Lowercase alphanumeric with underscores and dots
	/// - 3-100 characters
	pub fn validate_key(key: &str) -> bool {
		if key.len() < 3 || key.len() > 100 {
			return false;
		}

		let mut chars = key.chars();

		match chars.next() {
			Some(c) if c.is_ascii_lowercase() => {}
			_ => return false,
		}

		chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
	}

	/// Validates the flag definition at load time.
	///
	/// Catching malformed definitions here keeps the evaluation path free of
	/// structural checks: a flag that passes `validate` can always be
	/// evaluated without error.
	pub fn validate(&self) -> Result<()> {
		if !Self::validate_key(&self.key) {
			return Err(FlagsError::invalid_flag(&self.key, "malformed key"));
		}

		if self.flag_type == FlagType::Variant && self.variants.is_empty() {
			return Err(FlagsError::invalid_flag(
				&self.key,
				"variant flag has no variants",
			));
		}

		if let Some(pct) = self.rollout_percentage {
			if pct > 100 {
				return Err(FlagsError::invalid_flag(
					&self.key,
					format!("rollout percentage {} is out of range", pct),
				));
			}
		}

		for rule in &self.rules {
			rule.validate(&self.key)?;
		}

		Ok(())
	}
}

/// Partial update applied to an existing flag by a store backend.
///
/// Unset fields leave the flag untouched; `key` is immutable and cannot be
/// patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagUpdate {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<FlagStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default_value: Option<FlagValue>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rules: Option<Vec<FeatureRule>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variants: Option<Vec<FeatureVariant>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rollout_percentage: Option<u8>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_date: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end_date: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tags: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<serde_json::Value>,
}

impl FlagUpdate {
	/// Returns an update that only changes the flag status.
	pub fn status(status: FlagStatus) -> Self {
		Self {
			status: Some(status),
			..Self::default()
		}
	}

	/// Applies this patch to `flag`, leaving unset fields untouched.
	pub fn apply(&self, flag: &mut FeatureFlag) {
		if let Some(name) = &self.name {
			flag.name = name.clone();
		}
		if let Some(description) = &self.description {
			flag.description = Some(description.clone());
		}
		if let Some(status) = self.status {
			flag.status = status;
		}
		if let Some(default_value) = &self.default_value {
			flag.default_value = default_value.clone();
		}
		if let Some(rules) = &self.rules {
			flag.rules = rules.clone();
		}
		if let Some(variants) = &self.variants {
			flag.variants = variants.clone();
		}
		if let Some(pct) = self.rollout_percentage {
			flag.rollout_percentage = Some(pct);
		}
		if let Some(start) = self.start_date {
			flag.start_date = Some(start);
		}
		if let Some(end) = self.end_date {
			flag.end_date = Some(end);
		}
		if let Some(tags) = &self.tags {
			flag.tags = tags.clone();
		}
		if let Some(metadata) = &self.metadata {
			flag.metadata = Some(metadata.clone());
		}
	}
}


#[cfg(test)]
mod proptest_tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn flag_key_starts_with_lowercase(s in "[a-z][a-z0-9_.]{2,99}") {
			prop_assert!(FeatureFlag::validate_key(&s));
		}

		#[test]
		fn flag_key_rejects_uppercase(s in "[A-Z][a-z0-9_.]{2,99}") {
			prop_assert!(!FeatureFlag::validate_key(&s));
		}

		#[test]
		fn flag_key_rejects_too_short(s in "[a-z][a-z0-9_.]{0,1}") {
			prop_assert!(!FeatureFlag::validate_key(&s));
		}
	}
}
