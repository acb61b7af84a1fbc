// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag storage contract and reference backends for Beacon.
//!
//! This crate defines the [`FlagStore`] trait that every backend implements,
//! plus the pieces a backend composes:
//!
//! - [`MemoryFlagStore`] - in-memory reference implementation with
//!   copy-on-write snapshots and full-list change notifications
//! - [`CachedFlagStore`] - TTL read-cache decorator over any store
//! - [`SubscriberRegistry`] / [`Subscription`] - in-memory pub/sub with
//!   per-callback task isolation
//! - [`FlagChange`] - push-update events a backend converts into mutations
//!
//! Evaluation never lives in a backend: `FlagStore::evaluate` and
//! `FlagStore::evaluate_all` are provided methods that delegate to the shared
//! engine in `beacon-flags-core`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use beacon_flags_core::EvaluationContext;
//! use beacon_flags_store::{FlagStore, MemoryFlagStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryFlagStore::new();
//! store.initialize().await?;
//!
//! let _sub = store.subscribe(Arc::new(|flags| {
//!     println!("flag set changed, {} flags", flags.len());
//! }));
//!
//! let ctx = EvaluationContext::new().with_user_id("user42");
//! let result = store.evaluate("checkout.new_flow", &ctx).await?;
//! assert!(!result.enabled); // not seeded: "Flag not found"
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod memory;
pub mod registry;
pub mod store;

pub use cache::CachedFlagStore;
pub use error::{Result, StoreError};
pub use memory::MemoryFlagStore;
pub use registry::{SubscriberRegistry, Subscription, SubscriptionId};
pub use store::{FlagChange, FlagStore, FlagsCallback};

// Re-export core types for convenience
pub use beacon_flags_core::{
	EvaluationContext, EvaluationResult, FeatureFlag, FeatureVariant, FlagStatus, FlagType,
	FlagUpdate, FlagValue,
};
