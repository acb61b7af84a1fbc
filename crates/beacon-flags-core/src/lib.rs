// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types and evaluation engine for the Beacon feature flags system.
//!
//! This crate provides the shared flag model (flags, rules, variants,
//! contexts, results) and the pure evaluation pipeline used by every storage
//! backend. It is consumed by `beacon-flags-store` (storage contract and
//! reference backends) and `beacon-flags` (the manager façade).
//!
//! # Overview
//!
//! The engine supports:
//! - Boolean, percentage, variant, and release flags
//! - Ordered targeting rules (user, group, percentage, environment, date,
//!   custom attribute); the first matching rule wins
//! - Deterministic percentage rollout and weighted variant selection via
//!   stable bucketing (same identity, same bucket, across processes)
//! - Activation windows (`start_date` / `end_date`)
//! - Batch evaluation with per-flag failure isolation
//!
//! # Audience semantics
//!
//! A flag whose rules all miss still falls through to the rollout gate and
//! then to "Default enabled" — rules widen the audience, they do not narrow
//! it. See the [`engine`] module docs before reaching for a rule list to
//! restrict a flag.
//!
//! # Example
//!
//! ```
//! use beacon_flags_core::{
//!     evaluate_flag, EvaluationContext, EvaluationReason, FeatureFlag, FeatureRule,
//!     FlagStatus, FlagType, FlagValue,
//! };
//!
//! let flag = FeatureFlag {
//!     key: "checkout.new_flow".to_string(),
//!     name: "New checkout flow".to_string(),
//!     description: None,
//!     flag_type: FlagType::Percentage,
//!     status: FlagStatus::Partial,
//!     default_value: FlagValue::Boolean(false),
//!     rules: vec![FeatureRule::Group { groups: vec!["beta_testers".to_string()] }],
//!     variants: vec![],
//!     rollout_percentage: Some(30),
//!     start_date: None,
//!     end_date: None,
//!     tags: vec![],
//!     metadata: None,
//! };
//!
//! let ctx = EvaluationContext::new()
//!     .with_user_id("user42")
//!     .with_group("beta_testers");
//!
//! let result = evaluate_flag(&flag, &ctx).unwrap();
//! assert!(result.enabled);
//! assert_eq!(result.reason, EvaluationReason::RuleMatch);
//! ```

pub mod bucket;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod flag;
pub mod rule;

pub use bucket::bucket;
pub use context::EvaluationContext;
pub use engine::{evaluate_all, evaluate_flag, select_variant};
pub use error::{FlagsError, Result};
pub use evaluation::{EvaluationReason, EvaluationResult};
pub use flag::{FeatureFlag, FeatureVariant, FlagStatus, FlagType, FlagUpdate, FlagValue};
pub use rule::{FeatureRule, RuleOperator};
