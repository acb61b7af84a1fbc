// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flags client for Beacon.
//!
//! # Overview
//!
//! This crate is the surface applications hold: a [`FlagManager`] built over
//! any [`FlagStore`](beacon_flags_store::FlagStore) backend. The manager owns
//! lifecycle (single-flight initialization), merges call contexts over
//! configured defaults, and never lets an evaluation failure reach the caller:
//! a broken store or flag definition degrades to a disabled result with reason
//! "Evaluation error".
//!
//! Evaluation semantics live in `beacon-flags-core`; storage backends live in
//! `beacon-flags-store`. This crate adds policy: lazy init, fallbacks, the
//! production toggle guard, and [`MonitorHook`] event reporting.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use beacon_flags::{EvaluationContext, FlagManager};
//! use beacon_flags_store::MemoryFlagStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryFlagStore::new());
//! let manager = FlagManager::builder(store)
//!     .environment("dev")
//!     .build();
//!
//! let ctx = EvaluationContext::new().with_user_id("user42");
//! let result = manager.evaluate("checkout.new_flow", &ctx).await;
//! assert!(!result.enabled); // not seeded: "Flag not found"
//! # }
//! ```

pub mod error;
pub mod manager;
pub mod monitor;

pub use error::{FlagsError, Result};
pub use manager::{FlagManager, FlagManagerBuilder, ManagerConfig};
pub use monitor::{
	MonitorEvent, MonitorEventKind, MonitorHook, NoOpMonitorHook, SharedMonitorHook,
};

// Re-export the types callers need to evaluate and mutate flags
pub use beacon_flags_core::{
	EvaluationContext, EvaluationReason, EvaluationResult, FeatureFlag, FeatureRule,
	FeatureVariant, FlagStatus, FlagType, FlagUpdate, FlagValue,
};
pub use beacon_flags_store::{FlagStore, FlagsCallback, Subscription};
