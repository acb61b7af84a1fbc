// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors surfaced by the flag manager.
///
/// Only lifecycle and mutation calls return these. `evaluate` and
/// `evaluate_all` never error: evaluation failures become a disabled fallback
/// result (or an empty map) and are logged and reported to the monitor hook.
#[derive(Debug, Error)]
pub enum FlagsError {
	/// The underlying flag store failed.
	#[error(transparent)]
	Store(#[from] beacon_flags_store::StoreError),

	/// A flag definition could not be evaluated.
	#[error(transparent)]
	Evaluation(#[from] beacon_flags_core::FlagsError),

	/// Store initialization failed; the manager stays uninitialized and a
	/// later call may retry.
	#[error("initialization failed: {message}")]
	InitializationFailed { message: String },

	/// `toggle_flag` was called in a production environment. This is a
	/// deliberate safety rail: toggles in production go through the store's
	/// own change process, never through the convenience API.
	#[error("toggling flag `{key}` is blocked in production")]
	ProductionToggleBlocked { key: String },
}

pub type Result<T> = std::result::Result<T, FlagsError>;
