// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The flag evaluation pipeline.
//!
//! Evaluation is a strict, ordered pipeline; the first decisive step wins:
//!
//! 1. `status == disabled` — disabled, "Flag is disabled"
//! 2. `start_date` in the future — disabled, "Flag not yet active"
//! 3. `end_date` in the past — disabled, "Flag has expired"
//! 4. Any rule matches (first match wins) — enabled, "Rule matched"
//! 5. Rollout percentage set and below 100, bucket outside it — disabled,
//!    "Not in rollout percentage"
//! 6. Otherwise — enabled, "Default enabled"
//!
//! Variant-type flags additionally attach the selected variant and its
//! payload in steps 4 and 6.
//!
//! # A flag with rules is enabled for everyone the rules do not exclude
//!
//! Note the shape of steps 4-6 carefully: when a flag's rules all *miss*, the
//! pipeline does not stop — it falls through to the rollout gate and then to
//! "Default enabled", even when `default_value` is `false`. A boolean flag
//! with a rule list and no rollout percentage is therefore enabled for every
//! caller, not just rule matches. Rules widen the audience past the rollout
//! gate; they do not narrow it. To restrict a flag to rule matches only, set
//! `rollout_percentage` to `0`.
//!
//! The pipeline is pure and free of shared mutable state, so any number of
//! callers may evaluate concurrently, and every backend shares this one
//! implementation rather than carrying its own.

use std::collections::HashMap;

use tracing::warn;

use crate::bucket::bucket;
use crate::context::EvaluationContext;
use crate::error::{FlagsError, Result};
use crate::evaluation::{EvaluationReason, EvaluationResult};
use crate::flag::{FeatureFlag, FeatureVariant, FlagStatus, FlagType};

/// Evaluates one flag against a context.
///
/// Returns `Err` only when the flag definition itself cannot be evaluated
/// (e.g. a variant flag with an empty variant list, which
/// [`FeatureFlag::validate`] normally rejects at load time). Malformed rule
/// data never errors; it simply never matches.
pub fn evaluate_flag(flag: &FeatureFlag, context: &EvaluationContext) -> Result<EvaluationResult> {
	if flag.status == FlagStatus::Disabled {
		return Ok(EvaluationResult::disabled(
			&flag.key,
			EvaluationReason::Disabled,
		));
	}

	let now = context.timestamp_or_now();
	if let Some(start) = flag.start_date {
		if now < start {
			return Ok(EvaluationResult::disabled(
				&flag.key,
				EvaluationReason::NotYetActive,
			));
		}
	}
	if let Some(end) = flag.end_date {
		if now > end {
			return Ok(EvaluationResult::disabled(
				&flag.key,
				EvaluationReason::Expired,
			));
		}
	}

	// First matching rule wins, regardless of rule type, and bypasses the
	// rollout gate.
	if flag.rules.iter().any(|rule| rule.matches(context)) {
		return attach_variant(
			EvaluationResult::enabled(&flag.key, EvaluationReason::RuleMatch),
			flag,
			context,
		);
	}

	if let Some(pct) = flag.rollout_percentage {
		if pct < 100 && bucket(&flag.key, context.identity()) >= u32::from(pct) {
			return Ok(EvaluationResult::disabled(
				&flag.key,
				EvaluationReason::NotInRollout,
			));
		}
	}

	attach_variant(
		EvaluationResult::enabled(&flag.key, EvaluationReason::Default),
		flag,
		context,
	)
}

/// Evaluates every flag in `flags`, isolating failures per key.
///
/// A flag whose evaluation errors contributes a disabled result with reason
/// "Evaluation error" for its own key only; the batch call itself never
/// fails, and the other flags are unaffected.
pub fn evaluate_all(
	flags: &[FeatureFlag],
	context: &EvaluationContext,
) -> HashMap<String, EvaluationResult> {
	flags
		.iter()
		.map(|flag| {
			let result = match evaluate_flag(flag, context) {
				Ok(result) => result,
				Err(e) => {
					warn!(flag_key = %flag.key, error = %e, "flag evaluation failed, returning disabled fallback");
					EvaluationResult::error_fallback(&flag.key)
				}
			};
			(flag.key.clone(), result)
		})
		.collect()
}

/// Selects a variant deterministically by weighted bucketing.
///
/// The bucket is seeded with the flag key, so the same `(flag_key, identity)`
/// always yields the same variant and the long-run distribution converges to
/// the configured weights. All-zero weights fall back to a uniform split over
/// the variant list by index.
pub fn select_variant<'a>(
	variants: &'a [FeatureVariant],
	context: &EvaluationContext,
	flag_key: &str,
) -> Result<&'a FeatureVariant> {
	if variants.is_empty() {
		return Err(FlagsError::invalid_flag(
			flag_key,
			"variant flag has no variants",
		));
	}

	let total_weight: u32 = variants.iter().map(|v| v.weight).sum();
	let b = bucket(flag_key, context.identity());

	if total_weight == 0 {
		return Ok(&variants[b as usize % variants.len()]);
	}

	// 1-indexed position inside the cumulative weight range.
	let target = b % total_weight + 1;
	let mut cumulative = 0u32;
	for variant in variants {
		cumulative += variant.weight;
		if cumulative >= target {
			return Ok(variant);
		}
	}

	// Unreachable when weights sum correctly; kept so selection never fails.
	Ok(&variants[0])
}

fn attach_variant(
	result: EvaluationResult,
	flag: &FeatureFlag,
	context: &EvaluationContext,
) -> Result<EvaluationResult> {
	if flag.flag_type != FlagType::Variant {
		return Ok(result);
	}

	let variant = select_variant(&flag.variants, context, &flag.key)?;
	Ok(result.with_variant(variant.key.clone(), variant.payload.clone()))
}
