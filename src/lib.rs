// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Threshold protection of board keys and zero-knowledge proofs over
//! prime-order subgroups of `Z_p^*`.
//!
//! The crate provides three capabilities built on a common [group] layer:
//!
//! - [`sharing`]: Shamir splitting of one or several same-length secrets into
//!   `N` shares with threshold `T`, and recovery from any `T` of them. ElGamal
//!   private keys are split one sub-key at a time and bundled per holder in a
//!   [`ShareContainer`](sharing::ShareContainer).
//! - [`protection`]: wrapping of a share for storage on an external token.
//!   The share is encrypted under a fresh key with an AEAD and the ciphertext
//!   is signed with the board key. Reading a share checks the signature
//!   before anything else.
//! - [`zkp`]: non-interactive exponentiation and plaintext-equality proofs,
//!   each with an optional offline precomputation of the commitments.
//!
//! [`codec`] encodes lists, maps and single ElGamal ciphertexts in a compact
//! Base64 form, and [`service`] exposes everything through thread-safe
//! facades that draw randomness from a pool of generators.
//!
//! Secret values (private exponents, share values, witnesses, symmetric keys)
//! are zeroed when dropped and never appear in `Debug` output.

#![cfg_attr(feature = "flame_it", feature(proc_macro_hygiene))]
#[cfg(feature = "flame_it")]
extern crate flame;
#[cfg(feature = "flame_it")]
#[macro_use]
extern crate flamer;

#[macro_use]
pub mod errors;

pub mod codec;
pub mod elgamal;
pub mod group;
pub mod keystore;
pub mod parameters;
pub mod pool;
pub mod protection;
mod serialization;
pub mod service;
pub mod sharing;
pub mod signature;
mod utils;
pub mod zkp;

pub use elgamal::{Ciphertext, KeyPair, PrivateKey, PublicKey};
pub use errors::{InternalError, Result};
pub use group::{Exponent, GroupElement, Subgroup};
pub use service::{ProofService, ShareService};
pub use sharing::{recover, split, Recovery, Share, ShareContainer, ShareType};
