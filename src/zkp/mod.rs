// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2023 Bolt Labs, Inc.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Implements a trait for zero-knowledge proofs.
//!
//! In more detail, this module provides a trait [`Proof`] for constructing a
//! non-interactive zero knowledge proof of knowledge of a preimage under a
//! group homomorphism. The trait provides [`Proof::prove`] and
//! [`Proof::verify`]; the former builds a proof and the latter checks it
//! using public values only.
//!
//! Proving is split in two phases. The commitment phase only depends on the
//! public bases of the homomorphism and can run ahead of time (see
//! [`Precomputation`]); the response phase needs the witness.

pub mod exponentiation;
pub(crate) mod phi;
pub mod plaintext_equality;

pub use phi::Precomputation;

use crate::{errors::Result, group::Exponent};
use rand::{CryptoRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use zeroize::ZeroizeOnDrop;

/// A trait for constructing zero knowledge proofs.
///
/// The associated type [`Proof::CommonInput`] denotes the data known the both
/// the prover and verifier, and the associated type [`Proof::ProverSecret`]
/// denotes the data known only to the prover.
///
/// The auxiliary data passed to both sides is bound into the Fiat-Shamir
/// challenge; a proof only verifies against the auxiliary data it was built
/// with.
pub trait Proof: Sized + Serialize + DeserializeOwned {
    type CommonInput;
    type ProverSecret;

    /// Auxiliary data used when the caller has none of its own.
    const DEFAULT_AUXILIARY_DATA: &'static [u8];

    /// Runs the commitment phase for `input`.
    fn precompute_for<R: RngCore + CryptoRng>(
        input: &Self::CommonInput,
        rng: &mut R,
    ) -> Result<Precomputation>;

    /// Builds the proof from commitments produced earlier. The
    /// precomputation is consumed, so it can never be used twice.
    fn prove_with_precomputation(
        input: &Self::CommonInput,
        secret: &Self::ProverSecret,
        precomputation: Precomputation,
        auxiliary_data: &[u8],
    ) -> Result<Self>;

    /// Constructs a zero knowledge proof over [`Proof::ProverSecret`] and
    /// [`Proof::CommonInput`].
    fn prove<R: RngCore + CryptoRng>(
        input: &Self::CommonInput,
        secret: &Self::ProverSecret,
        auxiliary_data: &[u8],
        rng: &mut R,
    ) -> Result<Self> {
        let precomputation = Self::precompute_for(input, rng)?;
        Self::prove_with_precomputation(input, secret, precomputation, auxiliary_data)
    }

    /// Verifies a zero knowledge proof using the provided
    /// [`Proof::CommonInput`].
    ///
    /// A proof that does not check out yields `Ok(false)`. An `Err` means the
    /// statement itself is malformed.
    fn verify(&self, input: &Self::CommonInput, auxiliary_data: &[u8]) -> Result<bool>;
}

/// A secret exponent known only to the prover.
#[derive(ZeroizeOnDrop)]
pub struct Witness {
    exponent: Exponent,
}

impl Debug for Witness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Witness")
            .field("exponent", &"[redacted]")
            .finish()
    }
}

impl Witness {
    pub fn new(exponent: Exponent) -> Self {
        Self { exponent }
    }

    pub(crate) fn exponent(&self) -> &Exponent {
        &self.exponent
    }
}
