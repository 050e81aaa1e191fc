// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2023 Bolt Labs, Inc.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The generic sigma protocol behind every proof in this crate.
//!
//! A [`PhiFunction`] is a homomorphism from `Z_q^n` into `G^m` given by a set
//! of base elements and one computation rule per output. Output `i` is the
//! product of `base[b]^input[j]` over the `(b, j)` pairs of rule `i`.
//!
//! For an image `y = phi(w)` the prover commits to `t = phi(r)` for random
//! `r`, derives `C` from a transcript over the statement and `t`, and answers
//! with `s = r + (C mod q) w`. The verifier recomputes
//! `t = phi(s) * y^{-(C mod q)}` and accepts iff the transcript yields `C`
//! again.

use crate::{
    errors::{InternalError, Result},
    group::{Exponent, GroupElement, Subgroup},
    utils::challenge_from_transcript,
};
use libpaillier::unknown_order::BigNumber;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use std::{fmt::Debug, sync::Arc};
use tracing::{error, warn};
use zeroize::ZeroizeOnDrop;

/// A homomorphism described by base elements and computation rules.
#[derive(Clone, Debug)]
pub(crate) struct PhiFunction {
    group: Arc<Subgroup>,
    bases: Vec<GroupElement>,
    rules: Vec<Vec<(usize, usize)>>,
    input_count: usize,
}

impl PhiFunction {
    pub(crate) fn new(
        bases: Vec<GroupElement>,
        rules: Vec<Vec<(usize, usize)>>,
        input_count: usize,
    ) -> Result<Self> {
        let group = match bases.first() {
            Some(first) => Arc::clone(first.group()),
            None => return arg_err!("phi function needs at least one base"),
        };
        if bases.iter().any(|base| **base.group() != *group) {
            error!("Phi function bases belong to different subgroups");
            return Err(InternalError::GroupMismatch);
        }
        if bases.iter().any(|base| !base.is_member()) {
            error!("Phi function base is not a subgroup member");
            return Err(InternalError::InvalidElement);
        }
        if input_count == 0 || rules.is_empty() || rules.iter().any(Vec::is_empty) {
            return arg_err!("phi function needs inputs and non-empty rules");
        }
        let in_range = rules
            .iter()
            .flatten()
            .all(|(base, input)| *base < bases.len() && *input < input_count);
        if !in_range {
            error!("Phi function rule refers to a missing base or input");
            return Err(InternalError::InternalInvariantFailed);
        }
        Ok(Self {
            group,
            bases,
            rules,
            input_count,
        })
    }

    pub(crate) fn group(&self) -> &Arc<Subgroup> {
        &self.group
    }

    pub(crate) fn bases(&self) -> &[GroupElement] {
        &self.bases
    }

    pub(crate) fn input_count(&self) -> usize {
        self.input_count
    }

    pub(crate) fn output_count(&self) -> usize {
        self.rules.len()
    }

    pub(crate) fn evaluate(&self, inputs: &[Exponent]) -> Result<Vec<GroupElement>> {
        if inputs.len() != self.input_count {
            error!(
                "Phi function takes {} inputs but got {}",
                self.input_count,
                inputs.len()
            );
            return Err(InternalError::InternalInvariantFailed);
        }
        self.rules
            .iter()
            .map(|rule| {
                rule.iter()
                    .try_fold(Subgroup::identity(&self.group), |acc, (base, input)| {
                        acc.multiply(&self.bases[*base].exponentiate(&inputs[*input])?)
                    })
            })
            .collect()
    }

    fn append_to_transcript(&self, transcript: &mut Transcript) {
        transcript.append_message(b"p", &self.group.p().to_bytes());
        transcript.append_message(b"q", &self.group.q().to_bytes());
        transcript.append_message(b"g", &self.group.g().to_bytes());
        transcript.append_u64(b"base count", self.bases.len() as u64);
        for base in &self.bases {
            transcript.append_message(b"base", &base.to_bytes());
        }
    }
}

/// Commitments computed ahead of the witness being known.
///
/// The random exponents are the only secret; they are zeroed when the
/// precomputation is dropped, which happens at the latest when it is consumed
/// by a proof.
#[derive(ZeroizeOnDrop)]
pub struct Precomputation {
    randomness: Vec<Exponent>,
    #[zeroize(skip)]
    commitments: Vec<GroupElement>,
    #[zeroize(skip)]
    bases: Vec<GroupElement>,
}

impl Debug for Precomputation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("zkp::Precomputation")
            .field("randomness", &"[redacted]")
            .field("commitments", &self.commitments)
            .field("bases", &self.bases)
            .finish()
    }
}

impl Precomputation {
    pub(crate) fn generate<R: RngCore + CryptoRng>(
        phi: &PhiFunction,
        rng: &mut R,
    ) -> Result<Self> {
        let randomness: Vec<Exponent> = (0..phi.input_count())
            .map(|_| phi.group().random_exponent(rng))
            .collect();
        let commitments = phi.evaluate(&randomness)?;
        Ok(Self {
            randomness,
            commitments,
            bases: phi.bases().to_vec(),
        })
    }

    /// The public commitments `phi(r)`.
    pub fn commitments(&self) -> &[GroupElement] {
        &self.commitments
    }
}

fn challenge(
    label: &'static [u8],
    phi: &PhiFunction,
    image: &[GroupElement],
    commitments: &[GroupElement],
    auxiliary_data: &[u8],
) -> BigNumber {
    let mut transcript = Transcript::new(label);
    phi.append_to_transcript(&mut transcript);
    transcript.append_u64(b"image count", image.len() as u64);
    for element in image {
        transcript.append_message(b"image", &element.to_bytes());
    }
    for commitment in commitments {
        transcript.append_message(b"commitment", &commitment.to_bytes());
    }
    transcript.append_message(b"auxiliary data", auxiliary_data);
    challenge_from_transcript(&mut transcript)
}

fn check_image(phi: &PhiFunction, image: &[GroupElement]) -> Result<()> {
    if image.len() != phi.output_count() {
        error!(
            "Statement has {} image elements but the phi function has {} outputs",
            image.len(),
            phi.output_count()
        );
        return arg_err!("image length does not match the phi function");
    }
    if image.iter().any(|element| **element.group() != **phi.group()) {
        error!("Image elements belong to a different subgroup than the bases");
        return Err(InternalError::GroupMismatch);
    }
    Ok(())
}

/// Response phase: returns the full-width challenge and the responses.
pub(crate) fn prove(
    label: &'static [u8],
    phi: &PhiFunction,
    image: &[GroupElement],
    witnesses: &[&Exponent],
    precomputation: Precomputation,
    auxiliary_data: &[u8],
) -> Result<(BigNumber, Vec<BigNumber>)> {
    check_image(phi, image)?;
    if witnesses.len() != phi.input_count() {
        error!(
            "Proof needs {} witnesses but got {}",
            phi.input_count(),
            witnesses.len()
        );
        return arg_err!("wrong number of witnesses");
    }
    if precomputation.bases != phi.bases() {
        error!("Precomputation was generated for a different statement");
        return arg_err!("precomputation does not match the proof bases");
    }

    let challenge = challenge(
        label,
        phi,
        image,
        &precomputation.commitments,
        auxiliary_data,
    );
    let c = Exponent::reduced(challenge.clone(), phi.group().q());
    let responses = precomputation
        .randomness
        .iter()
        .zip(witnesses)
        .map(|(r, w)| Ok(r.add(&c.multiply(w)?)?.value().clone()))
        .collect::<Result<Vec<_>>>()?;
    Ok((challenge, responses))
}

/// Recompute the commitments from the responses and check the challenge.
pub(crate) fn verify(
    label: &'static [u8],
    phi: &PhiFunction,
    image: &[GroupElement],
    challenge: &BigNumber,
    responses: &[BigNumber],
    auxiliary_data: &[u8],
) -> Result<bool> {
    check_image(phi, image)?;
    let q = phi.group().q();
    if responses.len() != phi.input_count() {
        warn!(
            "Proof carries {} responses, expected {}",
            responses.len(),
            phi.input_count()
        );
        return Ok(false);
    }
    if responses
        .iter()
        .any(|s| s < &BigNumber::zero() || s >= q)
    {
        warn!("Proof response is out of range");
        return Ok(false);
    }
    if image.iter().any(|element| !element.is_member()) {
        warn!("Proof statement contains an element outside of the subgroup");
        return Ok(false);
    }

    let responses: Vec<Exponent> = responses
        .iter()
        .map(|s| Exponent::reduced(s.clone(), q))
        .collect();
    let negated_c = Exponent::reduced(challenge.clone(), q).negate();
    let commitments = phi
        .evaluate(&responses)?
        .iter()
        .zip(image)
        .map(|(phi_s, y)| phi_s.multiply(&y.exponentiate(&negated_c)?))
        .collect::<Result<Vec<_>>>()?;

    let expected = self::challenge(label, phi, image, &commitments, auxiliary_data);
    if &expected != challenge {
        warn!("Fiat-Shamir consistency check failed");
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::{init_testing, small_group, test_group};

    #[test]
    fn evaluate_follows_the_rules() {
        let group = small_group();
        let g = Subgroup::generator(&group);
        let h = GroupElement::new(BigNumber::from(4u64), &group).unwrap();
        // outputs: g^a, g^a * h^b
        let phi = PhiFunction::new(
            vec![g.clone(), h.clone()],
            vec![vec![(0, 0)], vec![(0, 0), (1, 1)]],
            2,
        )
        .unwrap();
        let a = Exponent::new(BigNumber::from(3u64), group.q()).unwrap();
        let b = Exponent::new(BigNumber::from(5u64), group.q()).unwrap();
        let outputs = phi.evaluate(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(outputs[0], g.exponentiate(&a).unwrap());
        assert_eq!(
            outputs[1],
            g.exponentiate(&a)
                .unwrap()
                .multiply(&h.exponentiate(&b).unwrap())
                .unwrap()
        );
    }

    #[test]
    fn construction_rejects_bad_descriptions() {
        let group = small_group();
        let g = Subgroup::generator(&group);
        assert!(PhiFunction::new(vec![], vec![vec![(0, 0)]], 1).is_err());
        assert!(PhiFunction::new(vec![g.clone()], vec![], 1).is_err());
        assert!(PhiFunction::new(vec![g.clone()], vec![vec![(1, 0)]], 1).is_err());
        assert!(PhiFunction::new(vec![g.clone()], vec![vec![(0, 1)]], 1).is_err());
        // 5 is not in the order-11 subgroup
        let outsider = GroupElement::new(BigNumber::from(5u64), &group).unwrap();
        assert_eq!(
            PhiFunction::new(vec![outsider], vec![vec![(0, 0)]], 1).unwrap_err(),
            InternalError::InvalidElement
        );
        let other = Subgroup::generator(&test_group());
        assert_eq!(
            PhiFunction::new(vec![g, other], vec![vec![(0, 0)]], 1).unwrap_err(),
            InternalError::GroupMismatch
        );
    }

    #[test]
    fn sigma_protocol_is_complete() {
        let mut rng = init_testing();
        let group = test_group();
        let g = Subgroup::generator(&group);
        let h = g.exponentiate(&group.random_exponent(&mut rng)).unwrap();
        let phi = PhiFunction::new(
            vec![g, h],
            vec![vec![(0, 0)], vec![(0, 0), (1, 1)]],
            2,
        )
        .unwrap();
        let w = [
            group.random_exponent(&mut rng),
            group.random_exponent(&mut rng),
        ];
        let image = phi.evaluate(&w).unwrap();
        let precomputation = Precomputation::generate(&phi, &mut rng).unwrap();
        let (challenge, responses) =
            prove(b"test", &phi, &image, &[&w[0], &w[1]], precomputation, b"aux").unwrap();
        assert!(verify(b"test", &phi, &image, &challenge, &responses, b"aux").unwrap());
        assert!(!verify(b"test", &phi, &image, &challenge, &responses, b"other").unwrap());
        assert!(!verify(b"other", &phi, &image, &challenge, &responses, b"aux").unwrap());
    }

    #[test]
    fn precomputation_must_match_bases() {
        let mut rng = init_testing();
        let group = small_group();
        let g = Subgroup::generator(&group);
        let h = GroupElement::new(BigNumber::from(4u64), &group).unwrap();
        let phi_g = PhiFunction::new(vec![g], vec![vec![(0, 0)]], 1).unwrap();
        let phi_h = PhiFunction::new(vec![h], vec![vec![(0, 0)]], 1).unwrap();
        let w = group.random_exponent(&mut rng);
        let image = phi_g.evaluate(&[w.clone()]).unwrap();
        let precomputation = Precomputation::generate(&phi_h, &mut rng).unwrap();
        assert!(prove(b"test", &phi_g, &image, &[&w], precomputation, b"").is_err());
    }

    #[test]
    fn precomputation_debug_is_redacted() {
        let mut rng = init_testing();
        let group = small_group();
        let phi = PhiFunction::new(
            vec![Subgroup::generator(&group)],
            vec![vec![(0, 0)]],
            1,
        )
        .unwrap();
        let precomputation = Precomputation::generate(&phi, &mut rng).unwrap();
        assert!(format!("{precomputation:?}").contains("[redacted]"));
    }
}
