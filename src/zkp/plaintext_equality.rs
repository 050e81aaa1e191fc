// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2023 Bolt Labs, Inc.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Proof that two ElGamal ciphertexts, under two different public keys,
//! encrypt the same messages.
//!
//! With `C1 = (g^w1, pk1_i^w1 * m_i)` and `C2 = (g^w2, pk2_i^w2 * m_i)`, the
//! messages cancel in `phi1_i / phi2_i`, so the statement is the preimage of
//! `(gamma1, gamma2, phi1_i / phi2_i)` under
//! `phi(w1, w2) = (g^w1, g^w2, pk1_i^w1 * (pk2_i^-1)^w2)`.

use super::{
    phi::{self, PhiFunction},
    Precomputation, Proof, Witness,
};
use crate::{
    elgamal::{Ciphertext, PublicKey},
    errors::{InternalError, Result},
    group::{GroupElement, Subgroup},
};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

const LABEL: &[u8] = b"PlaintextEqualityProof";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextEqualityProof {
    challenge: BigNumber,
    responses: Vec<BigNumber>,
}

#[derive(Clone, Debug)]
pub struct PlaintextEqualityInput {
    phi: PhiFunction,
    image: Vec<GroupElement>,
}

impl PlaintextEqualityInput {
    pub fn new(
        first: &Ciphertext,
        first_key: &PublicKey,
        second: &Ciphertext,
        second_key: &PublicKey,
    ) -> Result<Self> {
        if first.phis().len() != first_key.len() || second.phis().len() != second_key.len() {
            error!("Ciphertext length does not match its public key");
            return arg_err!("each ciphertext must have one phi per public key element");
        }
        let phi = phi_function(first_key, second_key)?;
        let group = phi.group();
        if **first.group() != **group || **second.group() != **group {
            error!("Ciphertexts and public keys belong to different subgroups");
            return Err(InternalError::GroupMismatch);
        }

        let mut image = vec![first.gamma().clone(), second.gamma().clone()];
        for (phi1, phi2) in first.phis().iter().zip(second.phis()) {
            image.push(phi1.divide(phi2)?);
        }
        Ok(Self { phi, image })
    }
}

fn phi_function(first_key: &PublicKey, second_key: &PublicKey) -> Result<PhiFunction> {
    if first_key.len() != second_key.len() {
        error!(
            "Public keys have {} and {} elements",
            first_key.len(),
            second_key.len()
        );
        return arg_err!("public keys must have the same length");
    }
    if !first_key.elements()[0].same_group(&second_key.elements()[0]) {
        error!("Public keys belong to different subgroups");
        return Err(InternalError::GroupMismatch);
    }
    let n = first_key.len();
    let mut bases = Vec::with_capacity(1 + 2 * n);
    bases.push(Subgroup::generator(first_key.group()));
    bases.extend_from_slice(first_key.elements());
    for element in second_key.elements() {
        bases.push(element.invert()?);
    }

    let mut rules = vec![vec![(0, 0)], vec![(0, 1)]];
    rules.extend((0..n).map(|i| vec![(1 + i, 0), (1 + n + i, 1)]));
    PhiFunction::new(bases, rules, 2)
}

/// The encryption randomness of both ciphertexts.
#[derive(Debug)]
pub struct PlaintextEqualityWitness {
    pub first: Witness,
    pub second: Witness,
}

impl PlaintextEqualityProof {
    /// Commitment phase. Depends only on the two public keys.
    pub fn precompute<R: RngCore + CryptoRng>(
        first_key: &PublicKey,
        second_key: &PublicKey,
        rng: &mut R,
    ) -> Result<Precomputation> {
        Precomputation::generate(&phi_function(first_key, second_key)?, rng)
    }

    pub fn challenge(&self) -> &BigNumber {
        &self.challenge
    }

    pub fn responses(&self) -> &[BigNumber] {
        &self.responses
    }
}

impl Proof for PlaintextEqualityProof {
    type CommonInput = PlaintextEqualityInput;
    type ProverSecret = PlaintextEqualityWitness;

    const DEFAULT_AUXILIARY_DATA: &'static [u8] = LABEL;

    fn precompute_for<R: RngCore + CryptoRng>(
        input: &Self::CommonInput,
        rng: &mut R,
    ) -> Result<Precomputation> {
        Precomputation::generate(&input.phi, rng)
    }

    #[cfg_attr(feature = "flame_it", flame("PlaintextEqualityProof"))]
    #[instrument(skip_all, err(Debug))]
    fn prove_with_precomputation(
        input: &Self::CommonInput,
        secret: &Self::ProverSecret,
        precomputation: Precomputation,
        auxiliary_data: &[u8],
    ) -> Result<Self> {
        let (challenge, responses) = phi::prove(
            LABEL,
            &input.phi,
            &input.image,
            &[secret.first.exponent(), secret.second.exponent()],
            precomputation,
            auxiliary_data,
        )?;
        Ok(Self {
            challenge,
            responses,
        })
    }

    #[cfg_attr(feature = "flame_it", flame("PlaintextEqualityProof"))]
    fn verify(&self, input: &Self::CommonInput, auxiliary_data: &[u8]) -> Result<bool> {
        phi::verify(
            LABEL,
            &input.phi,
            &input.image,
            &self.challenge,
            &self.responses,
            auxiliary_data,
        )
    }
}
