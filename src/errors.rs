// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! A list of error types which are produced by the key-protection and proof
//! operations of this crate.
//!
//! The variants are coarse on purpose: a caller must be able to tell "bad
//! input" ([`InternalError::InvalidArgument`]) from "integrity violation"
//! ([`InternalError::ShareIntegrityError`], [`InternalError::DecryptionFailed`])
//! from "infrastructure failure"
//! ([`InternalError::CryptoOperationFailed`], [`InternalError::PoolExhausted`]).
//! A proof that does not verify is *not* an error; see
//! [`Proof::verify`](crate::zkp::Proof::verify).
use core::fmt::Debug;
use thiserror::Error;

/// The default Result type used in this crate
pub type Result<T> = std::result::Result<T, InternalError>;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Clone, Eq, PartialEq, Error, Debug)]
#[allow(missing_docs)]
pub enum InternalError {
    #[error("Function call contained invalid arguments: `{0}`")]
    InvalidArgument(String),
    #[error("Value is not a valid element of the subgroup")]
    InvalidElement,
    #[error("Operands belong to different subgroups")]
    GroupMismatch,
    #[error("Underlying cryptographic primitive failed: `{0}`")]
    CryptoOperationFailed(String),
    #[error("Signature over the encrypted share does not verify")]
    ShareIntegrityError,
    #[error("Decryption failed: wrong key or corrupted ciphertext")]
    DecryptionFailed,
    #[error("Serialization Error")]
    Serialization,
    #[error("Could not decode input: `{0}`")]
    DecodeFailed(String),
    #[error("Storage does not contain the requested item")]
    KeyNotFound,
    #[error("No pooled instance became available before the timeout")]
    PoolExhausted,
    #[error("Represents some code assumption that was checked at runtime but failed to be true")]
    InternalInvariantFailed,
}

macro_rules! serialize {
    ($x:expr) => {{
        bincode::serialize($x).or(Err(crate::errors::InternalError::Serialization))
    }};
}

macro_rules! deserialize {
    ($x:expr) => {{
        bincode::deserialize($x).or(Err(crate::errors::InternalError::Serialization))
    }};
}

macro_rules! arg_err {
    ($x:expr) => {{
        Err(crate::errors::InternalError::InvalidArgument(String::from(
            $x,
        )))
    }};
}
