// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Targeting rules and their matching semantics.
//!
//! A rule is a predicate over the evaluation context. Rules are stored as an
//! ordered list on the flag; the first rule that matches wins, regardless of
//! its type, and forces the flag to evaluate as enabled.
//!
//! Each rule type is its own enum variant carrying only the fields its
//! semantics need, so malformed definitions are caught when flags are loaded
//! instead of silently misbehaving at evaluation time. Anything that still
//! cannot be interpreted at evaluation time (unknown rule type, unknown
//! operator, missing attribute) never matches; it does not error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bucket::bucket;
use crate::context::EvaluationContext;
use crate::error::{FlagsError, Result};

/// Seed for percentage-rule bucketing, shared by every percentage rule so a
/// user's inclusion is consistent across flags that use the same threshold.
const PERCENTAGE_RULE_SEED: &str = "percentage";

/// Comparison operator used by `date` and `custom` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOperator {
	Equals,
	Contains,
	Gt,
	Lt,
	Gte,
	Lte,
}

impl RuleOperator {
	/// True for the operators that order two values (`gt`, `lt`, `gte`, `lte`).
	pub fn is_ordering(self) -> bool {
		matches!(self, Self::Gt | Self::Lt | Self::Gte | Self::Lte)
	}

	/// Compares a context attribute against an expected value.
	///
	/// `equals` compares string forms, `contains` checks substring inclusion
	/// of string forms, and the ordering operators compare numerically after
	/// coercion. Values that cannot be coerced never match.
	pub fn compare(self, actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
		match self {
			Self::Equals => string_form(actual) == string_form(expected),
			Self::Contains => string_form(actual).contains(&string_form(expected)),
			Self::Gt | Self::Lt | Self::Gte | Self::Lte => {
				match (numeric_form(actual), numeric_form(expected)) {
					(Some(a), Some(b)) => self.compare_ordered(a, b),
					_ => false,
				}
			}
		}
	}

	fn compare_ordered<T: PartialOrd>(self, a: T, b: T) -> bool {
		match self {
			Self::Gt => a > b,
			Self::Lt => a < b,
			Self::Gte => a >= b,
			Self::Lte => a <= b,
			Self::Equals | Self::Contains => false,
		}
	}
}

fn string_form(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn numeric_form(value: &serde_json::Value) -> Option<f64> {
	match value {
		serde_json::Value::Number(n) => n.as_f64(),
		serde_json::Value::String(s) => s.parse().ok(),
		_ => None,
	}
}

/// One targeting predicate on a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeatureRule {
	/// Matches when the context user id is one of `ids`.
	User { ids: Vec<String> },
	/// Matches when any context group is one of `groups`.
	Group { groups: Vec<String> },
	/// Matches when the identity's bucket falls below `value`.
	Percentage { value: u8 },
	/// Matches when the context environment is one of `environments`.
	Environment { environments: Vec<String> },
	/// Compares the context timestamp against `value`. Only the ordering
	/// operators are meaningful here.
	Date {
		operator: RuleOperator,
		value: DateTime<Utc>,
	},
	/// Compares a custom context attribute against `value`.
	Custom {
		attribute: String,
		operator: RuleOperator,
		value: serde_json::Value,
	},
	/// Catch-all for rule types this engine does not know. Never matches.
	#[serde(other)]
	Unknown,
}

impl FeatureRule {
	/// Validates rule data at flag-load time.
	pub fn validate(&self, flag_key: &str) -> Result<()> {
		match self {
			Self::Percentage { value } if *value > 100 => Err(FlagsError::invalid_flag(
				flag_key,
				format!("percentage rule value {} is out of range", value),
			)),
			Self::Date { operator, .. } if !operator.is_ordering() => Err(FlagsError::invalid_flag(
				flag_key,
				"date rule requires an ordering operator",
			)),
			_ => Ok(()),
		}
	}

	/// Returns true when this rule matches the context.
	///
	/// Never errors: data the rule cannot interpret simply fails to match.
	pub fn matches(&self, context: &EvaluationContext) -> bool {
		match self {
			Self::User { ids } => match context.user_id.as_deref() {
				Some(user_id) => ids.iter().any(|id| id == user_id),
				None => false,
			},
			Self::Group { groups } => context
				.user_groups
				.iter()
				.any(|g| groups.iter().any(|candidate| candidate == g)),
			Self::Percentage { value } => {
				if *value > 100 {
					return false;
				}
				bucket(PERCENTAGE_RULE_SEED, context.identity()) < u32::from(*value)
			}
			Self::Environment { environments } => match context.environment.as_deref() {
				Some(env) => environments.iter().any(|candidate| candidate == env),
				None => false,
			},
			Self::Date { operator, value } => {
				if !operator.is_ordering() {
					return false;
				}
				operator.compare_ordered(context.timestamp_or_now(), *value)
			}
			Self::Custom {
				attribute,
				operator,
				value,
			} => match context.custom_attributes.get(attribute) {
				Some(actual) => operator.compare(actual, value),
				None => false,
			},
			Self::Unknown => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn context_for(user_id: &str) -> EvaluationContext {
		EvaluationContext::new().with_user_id(user_id)
	}

	#[test]
	fn test_user_rule() {
		let rule = FeatureRule::User {
			ids: vec!["user42".to_string(), "user7".to_string()],
		};

		assert!(rule.matches(&context_for("user42")));
		assert!(rule.matches(&context_for("user7")));
		assert!(!rule.matches(&context_for("user8")));
		assert!(!rule.matches(&EvaluationContext::new()));
	}

	#[test]
	fn test_group_rule() {
		let rule = FeatureRule::Group {
			groups: vec!["beta_testers".to_string()],
		};

		let ctx = EvaluationContext::new().with_group("beta_testers");
		assert!(rule.matches(&ctx));

		let ctx = EvaluationContext::new().with_group("staff");
		assert!(!rule.matches(&ctx));

		assert!(!rule.matches(&EvaluationContext::new()));
	}

	#[test]
	fn test_percentage_rule_uses_shared_seed() {
		// bucket("percentage", "user42") == 59, pinned in bucket.rs.
		let ctx = context_for("user42");

		assert!(FeatureRule::Percentage { value: 60 }.matches(&ctx));
		assert!(!FeatureRule::Percentage { value: 59 }.matches(&ctx));
		assert!(!FeatureRule::Percentage { value: 0 }.matches(&ctx));
		assert!(FeatureRule::Percentage { value: 100 }.matches(&ctx));
	}

	#[test]
	fn test_percentage_rule_out_of_range_never_matches() {
		let rule = FeatureRule::Percentage { value: 101 };
		assert!(!rule.matches(&context_for("user42")));
		assert!(rule.validate("beta").is_err());
	}

	#[test]
	fn test_environment_rule() {
		let rule = FeatureRule::Environment {
			environments: vec!["staging".to_string(), "dev".to_string()],
		};

		let ctx = EvaluationContext::new().with_environment("staging");
		assert!(rule.matches(&ctx));

		let ctx = EvaluationContext::new().with_environment("prod");
		assert!(!rule.matches(&ctx));

		assert!(!rule.matches(&EvaluationContext::new()));
	}

	#[test]
	fn test_date_rule() {
		let cutoff = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
		let before = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
		let after = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();

		let rule = FeatureRule::Date {
			operator: RuleOperator::Gte,
			value: cutoff,
		};

		assert!(rule.matches(&EvaluationContext::new().with_timestamp(after)));
		assert!(rule.matches(&EvaluationContext::new().with_timestamp(cutoff)));
		assert!(!rule.matches(&EvaluationContext::new().with_timestamp(before)));

		let rule = FeatureRule::Date {
			operator: RuleOperator::Lt,
			value: cutoff,
		};
		assert!(rule.matches(&EvaluationContext::new().with_timestamp(before)));
		assert!(!rule.matches(&EvaluationContext::new().with_timestamp(after)));
	}

	#[test]
	fn test_date_rule_non_ordering_operator_never_matches() {
		let cutoff = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
		let rule = FeatureRule::Date {
			operator: RuleOperator::Equals,
			value: cutoff,
		};

		assert!(!rule.matches(&EvaluationContext::new().with_timestamp(cutoff)));
		assert!(rule.validate("beta").is_err());
	}

	#[test]
	fn test_custom_rule_equals_and_contains() {
		let ctx = EvaluationContext::new()
			.with_attribute("plan", serde_json::json!("enterprise"))
			.with_attribute("seats", serde_json::json!(25));

		let rule = FeatureRule::Custom {
			attribute: "plan".to_string(),
			operator: RuleOperator::Equals,
			value: serde_json::json!("enterprise"),
		};
		assert!(rule.matches(&ctx));

		let rule = FeatureRule::Custom {
			attribute: "plan".to_string(),
			operator: RuleOperator::Contains,
			value: serde_json::json!("enter"),
		};
		assert!(rule.matches(&ctx));

		// Numeric equality goes through string form.
		let rule = FeatureRule::Custom {
			attribute: "seats".to_string(),
			operator: RuleOperator::Equals,
			value: serde_json::json!(25),
		};
		assert!(rule.matches(&ctx));
	}

	#[test]
	fn test_custom_rule_numeric_comparison_coerces() {
		let ctx = EvaluationContext::new().with_attribute("seats", serde_json::json!("25"));

		let rule = FeatureRule::Custom {
			attribute: "seats".to_string(),
			operator: RuleOperator::Gt,
			value: serde_json::json!(10),
		};
		assert!(rule.matches(&ctx));

		let rule = FeatureRule::Custom {
			attribute: "seats".to_string(),
			operator: RuleOperator::Lte,
			value: serde_json::json!(24),
		};
		assert!(!rule.matches(&ctx));
	}

	#[test]
	fn test_custom_rule_missing_attribute_never_matches() {
		let rule = FeatureRule::Custom {
			attribute: "plan".to_string(),
			operator: RuleOperator::Equals,
			value: serde_json::json!("enterprise"),
		};

		assert!(!rule.matches(&EvaluationContext::new()));
	}

	#[test]
	fn test_custom_rule_non_numeric_ordering_never_matches() {
		let ctx = EvaluationContext::new().with_attribute("plan", serde_json::json!("enterprise"));

		let rule = FeatureRule::Custom {
			attribute: "plan".to_string(),
			operator: RuleOperator::Gt,
			value: serde_json::json!(10),
		};
		assert!(!rule.matches(&ctx));
	}

	#[test]
	fn test_unknown_rule_type_deserializes_and_never_matches() {
		let rule: FeatureRule =
			serde_json::from_str(r#"{"type": "geolocation", "region": "EU"}"#).unwrap();
		assert_eq!(rule, FeatureRule::Unknown);
		assert!(!rule.matches(&context_for("user42")));
	}

	#[test]
	fn test_rule_serde_tagging() {
		let rule = FeatureRule::User {
			ids: vec!["user42".to_string()],
		};
		let json = serde_json::to_string(&rule).unwrap();
		assert!(json.contains(r#""type":"user""#));

		let parsed: FeatureRule = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, rule);
	}
}

#[cfg(test)]
mod proptest_tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn percentage_rule_matches_are_deterministic(user_id in "[a-zA-Z0-9]{1,32}", value in 0u8..=100) {
			let rule = FeatureRule::Percentage { value };
			let ctx = EvaluationContext::new().with_user_id(&user_id);
			prop_assert_eq!(rule.matches(&ctx), rule.matches(&ctx));
		}

		#[test]
		fn percentage_rule_inclusion_is_monotonic(user_id in "[a-zA-Z0-9]{1,32}", low in 0u8..=100, high in 0u8..=100) {
			let (low, high) = (low.min(high), low.max(high));
			let ctx = EvaluationContext::new().with_user_id(&user_id);
			if (FeatureRule::Percentage { value: low }).matches(&ctx) {
				let high_matches = (FeatureRule::Percentage { value: high }).matches(&ctx);
				prop_assert!(high_matches);
			}
		}

		#[test]
		fn equals_matches_identical_strings(s in "[a-zA-Z0-9]{0,32}") {
			let a = serde_json::json!(s);
			prop_assert!(RuleOperator::Equals.compare(&a, &a));
		}

		#[test]
		fn contains_matches_own_substring(s in "[a-zA-Z0-9]{1,32}", start in 0usize..16, len in 0usize..16) {
			let start = start.min(s.len());
			let end = (start + len).min(s.len());
			let needle = serde_json::json!(&s[start..end]);
			let haystack = serde_json::json!(s);
			prop_assert!(RuleOperator::Contains.compare(&haystack, &needle));
		}

		#[test]
		fn ordering_operators_agree_with_f64(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
			let va = serde_json::json!(a);
			let vb = serde_json::json!(b);
			prop_assert_eq!(RuleOperator::Gt.compare(&va, &vb), a > b);
			prop_assert_eq!(RuleOperator::Lt.compare(&va, &vb), a < b);
			prop_assert_eq!(RuleOperator::Gte.compare(&va, &vb), a >= b);
			prop_assert_eq!(RuleOperator::Lte.compare(&va, &vb), a <= b);
		}
	}
}
