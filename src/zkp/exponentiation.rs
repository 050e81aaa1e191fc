// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2023 Bolt Labs, Inc.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Proof that a list of elements are the same power of a list of bases:
//! `e_i = b_i^w` for every `i`, for a single secret `w`.

use super::{
    phi::{self, PhiFunction},
    Precomputation, Proof, Witness,
};
use crate::{
    errors::{InternalError, Result},
    group::GroupElement,
};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

const LABEL: &[u8] = b"ExponentiationProof";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentiationProof {
    challenge: BigNumber,
    responses: Vec<BigNumber>,
}

/// The public statement `(b_i, e_i)`.
#[derive(Clone, Debug)]
pub struct ExponentiationInput {
    phi: PhiFunction,
    exponentiated: Vec<GroupElement>,
}

impl ExponentiationInput {
    /// Fails if either list is empty, the lists differ in length, or the
    /// elements do not all belong to one subgroup.
    pub fn new(bases: &[GroupElement], exponentiated: &[GroupElement]) -> Result<Self> {
        if bases.len() != exponentiated.len() {
            error!(
                "Got {} bases but {} exponentiated elements",
                bases.len(),
                exponentiated.len()
            );
            return arg_err!("bases and exponentiated elements differ in length");
        }
        let phi = phi_function(bases)?;
        if exponentiated
            .iter()
            .any(|element| !element.same_group(&bases[0]))
        {
            error!("Exponentiated elements belong to a different subgroup");
            return Err(InternalError::GroupMismatch);
        }
        Ok(Self {
            phi,
            exponentiated: exponentiated.to_vec(),
        })
    }

    pub fn bases(&self) -> &[GroupElement] {
        self.phi.bases()
    }

    pub fn exponentiated(&self) -> &[GroupElement] {
        &self.exponentiated
    }
}

/// `phi(w) = (b_1^w, ..., b_k^w)`.
fn phi_function(bases: &[GroupElement]) -> Result<PhiFunction> {
    if bases.is_empty() {
        return arg_err!("at least one base is required");
    }
    let rules = (0..bases.len()).map(|i| vec![(i, 0)]).collect();
    PhiFunction::new(bases.to_vec(), rules, 1)
}

impl ExponentiationProof {
    /// Commitment phase. Depends only on the bases, so it can run before the
    /// witness exists.
    pub fn precompute<R: RngCore + CryptoRng>(
        bases: &[GroupElement],
        rng: &mut R,
    ) -> Result<Precomputation> {
        Precomputation::generate(&phi_function(bases)?, rng)
    }

    /// The full-width Fiat-Shamir challenge.
    pub fn challenge(&self) -> &BigNumber {
        &self.challenge
    }

    pub fn responses(&self) -> &[BigNumber] {
        &self.responses
    }
}

impl Proof for ExponentiationProof {
    type CommonInput = ExponentiationInput;
    type ProverSecret = Witness;

    const DEFAULT_AUXILIARY_DATA: &'static [u8] = LABEL;

    fn precompute_for<R: RngCore + CryptoRng>(
        input: &Self::CommonInput,
        rng: &mut R,
    ) -> Result<Precomputation> {
        Precomputation::generate(&input.phi, rng)
    }

    #[cfg_attr(feature = "flame_it", flame("ExponentiationProof"))]
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
            &input.exponentiated,
            &[secret.exponent()],
            precomputation,
            auxiliary_data,
        )?;
        Ok(Self {
            challenge,
            responses,
        })
    }

    #[cfg_attr(feature = "flame_it", flame("ExponentiationProof"))]
    fn verify(&self, input: &Self::CommonInput, auxiliary_data: &[u8]) -> Result<bool> {
        phi::verify(
            LABEL,
            &input.phi,
            &input.exponentiated,
            &self.challenge,
            &self.responses,
            auxiliary_data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        group::{Exponent, Subgroup},
        utils::testing::{init_testing, small_group, test_group},
    };
    use rand::Rng;
    use std::sync::Arc;

    fn statement<R: RngCore + CryptoRng>(
        group: &Arc<Subgroup>,
        count: usize,
        rng: &mut R,
    ) -> (Vec<GroupElement>, Vec<GroupElement>, Exponent) {
        let g = Subgroup::generator(group);
        let one = Exponent::new(BigNumber::one(), group.q()).unwrap();
        // Bases are never the identity, so that every response bit matters.
        let bases: Vec<GroupElement> = (0..count)
            .map(|_| {
                let x = group.random_exponent(rng);
                let x = if x.value() == &BigNumber::zero() { one.clone() } else { x };
                g.exponentiate(&x).unwrap()
            })
            .collect();
        let w = group.random_exponent(rng);
        let exponentiated = bases.iter().map(|b| b.exponentiate(&w).unwrap()).collect();
        (bases, exponentiated, w)
    }

    fn flip_bit(value: &BigNumber, bit: usize) -> BigNumber {
        let mut bytes = value.to_bytes();
        if bytes.is_empty() {
            bytes.push(0);
        }
        let index = bytes.len() - 1 - (bit / 8) % bytes.len();
        bytes[index] ^= 1 << (bit % 8);
        BigNumber::from_slice(bytes)
    }

    #[test]
    fn honest_proofs_verify() {
        let mut rng = init_testing();
        let group = test_group();
        for count in [1, 2, 5] {
            let (bases, exponentiated, w) = statement(&group, count, &mut rng);
            let input = ExponentiationInput::new(&bases, &exponentiated).unwrap();
            let proof = ExponentiationProof::prove(
                &input,
                &Witness::new(w),
                ExponentiationProof::DEFAULT_AUXILIARY_DATA,
                &mut rng,
            )
            .unwrap();
            assert!(proof
                .verify(&input, ExponentiationProof::DEFAULT_AUXILIARY_DATA)
                .unwrap());
        }
    }

    #[test]
    fn precomputed_proofs_verify() {
        let mut rng = init_testing();
        let group = test_group();
        let (bases, exponentiated, w) = statement(&group, 3, &mut rng);
        let precomputation = ExponentiationProof::precompute(&bases, &mut rng).unwrap();
        let input = ExponentiationInput::new(&bases, &exponentiated).unwrap();
        let proof = ExponentiationProof::prove_with_precomputation(
            &input,
            &Witness::new(w),
            precomputation,
            b"custom",
        )
        .unwrap();
        assert!(proof.verify(&input, b"custom").unwrap());
        assert!(!proof
            .verify(&input, ExponentiationProof::DEFAULT_AUXILIARY_DATA)
            .unwrap());
    }

    #[test]
    fn wrong_witness_does_not_verify() {
        let mut rng = init_testing();
        let group = test_group();
        let (bases, exponentiated, w) = statement(&group, 2, &mut rng);
        let input = ExponentiationInput::new(&bases, &exponentiated).unwrap();
        let wrong = w.add(&Exponent::new(BigNumber::one(), group.q()).unwrap()).unwrap();
        let proof =
            ExponentiationProof::prove(&input, &Witness::new(wrong), b"", &mut rng).unwrap();
        assert!(!proof.verify(&input, b"").unwrap());
    }

    #[test]
    fn tampered_proofs_are_rejected_over_a_tiny_group() {
        let mut rng = init_testing();
        let group = small_group();
        let (bases, exponentiated, w) = statement(&group, 2, &mut rng);
        let input = ExponentiationInput::new(&bases, &exponentiated).unwrap();
        let proof = ExponentiationProof::prove(&input, &Witness::new(w), b"", &mut rng).unwrap();
        assert!(proof.verify(&input, b"").unwrap());

        for _ in 0..20 {
            let bit = rng.gen_range(0..256);
            let mut forged = proof.clone();
            forged.challenge = flip_bit(&forged.challenge, bit);
            assert!(!forged.verify(&input, b"").unwrap());
        }
        for bit in 0..4 {
            let mut forged = proof.clone();
            forged.responses[0] = flip_bit(&forged.responses[0], bit);
            assert!(!forged.verify(&input, b"").unwrap());
        }

        let mut forged = proof.clone();
        forged.responses.push(BigNumber::one());
        assert!(!forged.verify(&input, b"").unwrap());
        forged.responses.clear();
        assert!(!forged.verify(&input, b"").unwrap());
    }

    #[test]
    fn substituted_elements_are_rejected() {
        let mut rng = init_testing();
        let group = small_group();
        let (bases, exponentiated, w) = statement(&group, 2, &mut rng);
        let input = ExponentiationInput::new(&bases, &exponentiated).unwrap();
        let proof = ExponentiationProof::prove(&input, &Witness::new(w), b"", &mut rng).unwrap();

        let mut substituted = exponentiated.clone();
        substituted[1] = substituted[1]
            .multiply(&Subgroup::generator(&group))
            .unwrap();
        let other = ExponentiationInput::new(&bases, &substituted).unwrap();
        assert!(!proof.verify(&other, b"").unwrap());

        // 5 generates all of Z_23^*, so it is outside the order-11 subgroup.
        let mut outsider = exponentiated;
        outsider[0] = GroupElement::new(BigNumber::from(5u64), &group).unwrap();
        let other = ExponentiationInput::new(&bases, &outsider).unwrap();
        assert!(!proof.verify(&other, b"").unwrap());
    }

    #[test]
    fn malformed_statements_are_errors() {
        let mut rng = init_testing();
        let group = test_group();
        let (bases, exponentiated, _) = statement(&group, 2, &mut rng);
        assert!(matches!(
            ExponentiationInput::new(&[], &[]),
            Err(InternalError::InvalidArgument(_))
        ));
        assert!(matches!(
            ExponentiationInput::new(&bases, &exponentiated[..1]),
            Err(InternalError::InvalidArgument(_))
        ));
        let (small_bases, _, _) = statement(&small_group(), 1, &mut rng);
        assert_eq!(
            ExponentiationInput::new(&[bases[0].clone(), small_bases[0].clone()], &exponentiated)
                .unwrap_err(),
            InternalError::GroupMismatch
        );
        assert!(ExponentiationProof::precompute(&[], &mut rng).is_err());
    }

    #[test]
    fn proof_roundtrips_through_bincode() {
        let mut rng = init_testing();
        let group = test_group();
        let (bases, exponentiated, w) = statement(&group, 2, &mut rng);
        let input = ExponentiationInput::new(&bases, &exponentiated).unwrap();
        let proof = ExponentiationProof::prove(&input, &Witness::new(w), b"", &mut rng).unwrap();
        let bytes = bincode::serialize(&proof).unwrap();
        let decoded: ExponentiationProof = bincode::deserialize(&bytes).unwrap();
        assert_eq!(proof, decoded);
        assert!(decoded.verify(&input, b"").unwrap());
    }
}
