// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deterministic bucketing for rollout and variant selection.
//!
//! Maps a `(seed, identity)` pair to a stable integer in `[0, 100)`. The same
//! inputs always land in the same bucket, across processes and across
//! runtimes, so percentage rollouts stay sticky per user and multi-instance
//! deployments agree on who is inside a rollout.
//!
//! The hash is a rolling 32-bit multiply-add over the UTF-16 code units of
//! `seed + identity` (`h = h * 31 + unit`, wrapping on overflow), reduced with
//! `|h| % 100`. This exact algorithm is pinned: it must not be swapped for a
//! language-default hasher or a different hash family, because stored
//! fixtures and sibling SDKs in other languages reproduce it bit-for-bit.

/// Returns the rolling 31-multiply hash of `input` as a signed 32-bit value.
fn hash32(input: impl Iterator<Item = u16>) -> i32 {
	let mut hash: i32 = 0;
	for unit in input {
		hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
	}
	hash
}

/// Maps `(seed, identity)` to a stable bucket in `[0, 100)`.
///
/// An empty identity is valid: all anonymous callers collapse into the same
/// bucket for a given seed.
pub fn bucket(seed: &str, identity: &str) -> u32 {
	let hash = hash32(seed.encode_utf16().chain(identity.encode_utf16()));
	hash.unsigned_abs() % 100
}
