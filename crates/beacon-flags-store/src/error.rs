// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors produced by flag store backends.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The store was used before `initialize()` completed.
	#[error("flag store is not initialized")]
	NotInitialized,

	/// A mutation targeted a key that does not exist.
	///
	/// Only mutation paths use this; on the evaluation path an absent flag is
	/// a normal disabled result, not an error.
	#[error("flag `{key}` not found")]
	FlagNotFound { key: String },

	/// The backend itself failed (I/O, malformed response, timeout).
	#[error("backend error: {message}")]
	Backend { message: String },

	/// A mutation would have left a flag definition invalid.
	#[error(transparent)]
	InvalidFlag(#[from] beacon_flags_core::FlagsError),
}

impl StoreError {
	pub fn backend(message: impl Into<String>) -> Self {
		Self::Backend {
			message: message.into(),
		}
	}

	pub fn flag_not_found(key: impl Into<String>) -> Self {
		Self::FlagNotFound { key: key.into() }
	}
}

pub type Result<T> = std::result::Result<T, StoreError>;
