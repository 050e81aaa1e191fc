// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Security parameters and explicit configuration.
//!
//! Every component that needs an algorithm choice receives one of the
//! configuration structs below in its constructor. There is no process-wide
//! mutable default; [`KeyguardConfig::default()`] is a pure function and the
//! caller decides whether to use it or deserialize its own.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of transcript bytes drawn for a Fiat-Shamir challenge.
///
/// The challenge is kept at full width inside the proof and only reduced
/// modulo `q` for the group arithmetic, so that a forged response is
/// rejected even over very small test groups.
pub(crate) const CHALLENGE_BYTES: usize = 32;

/// Length in bytes of the random salt prefixed to every keystore entry.
pub(crate) const KEYSTORE_SALT_BYTES: usize = 16;

/// Length in bytes of keys derived for keystore sealing.
pub(crate) const KEYSTORE_KEY_BYTES: usize = 32;

/// Upper bound on the number of evaluation points in a single split. The
/// x-coordinate of a share is serialized as four bytes.
pub(crate) const MAX_SHARES: usize = u32::MAX as usize;

/// The AEAD used to protect a serialized share.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymmetricAlgorithm {
    /// ChaCha20-Poly1305 with a 96-bit nonce (RFC 8439).
    ChaCha20Poly1305,
    /// XChaCha20-Poly1305 with a 192-bit nonce.
    XChaCha20Poly1305,
}

impl SymmetricAlgorithm {
    /// Nonce length in bytes.
    pub fn nonce_length(&self) -> usize {
        match self {
            SymmetricAlgorithm::ChaCha20Poly1305 => 12,
            SymmetricAlgorithm::XChaCha20Poly1305 => 24,
        }
    }

    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        32
    }
}

/// Configuration of the symmetric step of share protection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricConfig {
    /// Which AEAD to use.
    pub algorithm: SymmetricAlgorithm,
}

impl SymmetricConfig {
    /// Length in bytes of the per-share keys drawn under this configuration.
    pub fn key_length(&self) -> usize {
        self.algorithm.key_length()
    }
}

impl Default for SymmetricConfig {
    fn default() -> Self {
        Self {
            algorithm: SymmetricAlgorithm::ChaCha20Poly1305,
        }
    }
}

/// Configuration of an [`ObjectPool`](crate::pool::ObjectPool).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of instances alive at any time (idle or borrowed).
    pub capacity: usize,
    /// How long a borrow waits for an instance before failing.
    pub borrow_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            borrow_timeout: Duration::from_secs(30),
        }
    }
}

/// Aggregated configuration for the services in [`crate::service`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyguardConfig {
    /// Share protection settings.
    pub symmetric: SymmetricConfig,
    /// Pool settings for the per-service RNG pool.
    pub pool: PoolConfig,
}
