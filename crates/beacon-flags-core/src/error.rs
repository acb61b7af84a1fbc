// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors produced by flag validation and evaluation.
///
/// Malformed rule data is deliberately *not* an error: a rule that cannot be
/// interpreted simply never matches. Errors are reserved for flag definitions
/// that cannot be evaluated at all, such as a variant flag with no variants.
#[derive(Debug, Error)]
pub enum FlagsError {
	/// The flag definition is structurally invalid.
	#[error("flag `{key}` is invalid: {reason}")]
	InvalidFlag { key: String, reason: String },
}

impl FlagsError {
	pub fn invalid_flag(key: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidFlag {
			key: key.into(),
			reason: reason.into(),
		}
	}
}

pub type Result<T> = std::result::Result<T, FlagsError>;
