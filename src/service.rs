// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Thread-safe entry points.
//!
//! The services own their configuration and a pool of random number
//! generators, so they can be shared between threads behind an `Arc`. Each
//! operation borrows one generator for its duration.

use crate::{
    elgamal::{Ciphertext, KeyPair, PrivateKey, PublicKey},
    errors::{InternalError, Result},
    group::{GroupElement, Subgroup},
    parameters::{KeyguardConfig, PoolConfig},
    pool::ObjectPool,
    protection::EncryptedShare,
    sharing::{self, Recovery, Share, ShareContainer, ShareType},
    signature::SignatureScheme,
    zkp::{
        exponentiation::{ExponentiationInput, ExponentiationProof},
        plaintext_equality::{
            PlaintextEqualityInput, PlaintextEqualityProof, PlaintextEqualityWitness,
        },
        Precomputation, Proof, Witness,
    },
};
use libpaillier::unknown_order::BigNumber;
use rand::{rngs::OsRng, rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tracing::{error, info, instrument};

fn rng_pool(config: &PoolConfig) -> Result<ObjectPool<StdRng>> {
    ObjectPool::new(*config, || {
        StdRng::from_rng(OsRng).map_err(|e| {
            error!("Could not seed a random number generator: {}", e);
            InternalError::CryptoOperationFailed(String::from("RNG seeding failed"))
        })
    })
}

/// Proof generation and verification over one subgroup.
#[derive(Debug)]
pub struct ProofService {
    group: Arc<Subgroup>,
    rngs: ObjectPool<StdRng>,
}

impl ProofService {
    pub fn new(group: &Arc<Subgroup>, config: &KeyguardConfig) -> Result<Self> {
        Ok(Self {
            group: Arc::clone(group),
            rngs: rng_pool(&config.pool)?,
        })
    }

    pub fn group(&self) -> &Arc<Subgroup> {
        &self.group
    }

    fn check_group(&self, elements: &[GroupElement]) -> Result<()> {
        if elements.iter().any(|e| **e.group() != *self.group) {
            error!("Element does not belong to the service's subgroup");
            return Err(InternalError::GroupMismatch);
        }
        Ok(())
    }

    /// Generate an ElGamal key pair with `sub_keys` sub-keys.
    #[instrument(skip_all, err(Debug))]
    pub fn generate_key_pair(&self, sub_keys: usize) -> Result<KeyPair> {
        self.rngs
            .with(|rng| KeyPair::generate(&self.group, sub_keys, rng))
    }

    /// Encrypt `messages`, returning the randomness as a [`Witness`].
    #[instrument(skip_all, err(Debug))]
    pub fn encrypt(
        &self,
        public_key: &PublicKey,
        messages: &[GroupElement],
    ) -> Result<(Ciphertext, Witness)> {
        self.check_group(public_key.elements())?;
        self.rngs.with(|rng| public_key.encrypt(messages, rng))
    }

    #[instrument(skip_all, err(Debug))]
    pub fn precompute_exponentiation(&self, bases: &[GroupElement]) -> Result<Precomputation> {
        self.check_group(bases)?;
        self.rngs
            .with(|rng| ExponentiationProof::precompute(bases, rng))
    }

    /// Prove `exponentiated[i] = bases[i]^w`. Without a precomputation the
    /// commitments are computed on the spot.
    #[instrument(skip_all, err(Debug))]
    pub fn prove_exponentiation(
        &self,
        bases: &[GroupElement],
        exponentiated: &[GroupElement],
        witness: &Witness,
        precomputation: Option<Precomputation>,
        auxiliary_data: Option<&[u8]>,
    ) -> Result<ExponentiationProof> {
        self.check_group(bases)?;
        let input = ExponentiationInput::new(bases, exponentiated)?;
        let auxiliary_data =
            auxiliary_data.unwrap_or(ExponentiationProof::DEFAULT_AUXILIARY_DATA);
        let proof = match precomputation {
            Some(precomputation) => ExponentiationProof::prove_with_precomputation(
                &input,
                witness,
                precomputation,
                auxiliary_data,
            ),
            None => self
                .rngs
                .with(|rng| ExponentiationProof::prove(&input, witness, auxiliary_data, rng)),
        }?;
        info!("Generated an exponentiation proof over {} bases", bases.len());
        Ok(proof)
    }

    #[instrument(skip_all, err(Debug))]
    pub fn verify_exponentiation(
        &self,
        proof: &ExponentiationProof,
        bases: &[GroupElement],
        exponentiated: &[GroupElement],
        auxiliary_data: Option<&[u8]>,
    ) -> Result<bool> {
        self.check_group(bases)?;
        let input = ExponentiationInput::new(bases, exponentiated)?;
        proof.verify(
            &input,
            auxiliary_data.unwrap_or(ExponentiationProof::DEFAULT_AUXILIARY_DATA),
        )
    }

    #[instrument(skip_all, err(Debug))]
    pub fn precompute_plaintext_equality(
        &self,
        first_key: &PublicKey,
        second_key: &PublicKey,
    ) -> Result<Precomputation> {
        self.check_group(first_key.elements())?;
        self.check_group(second_key.elements())?;
        self.rngs
            .with(|rng| PlaintextEqualityProof::precompute(first_key, second_key, rng))
    }

    /// Prove that `first` and `second` encrypt the same messages.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, err(Debug))]
    pub fn prove_plaintext_equality(
        &self,
        first: &Ciphertext,
        first_key: &PublicKey,
        second: &Ciphertext,
        second_key: &PublicKey,
        witness: &PlaintextEqualityWitness,
        precomputation: Option<Precomputation>,
        auxiliary_data: Option<&[u8]>,
    ) -> Result<PlaintextEqualityProof> {
        self.check_group(first_key.elements())?;
        let input = PlaintextEqualityInput::new(first, first_key, second, second_key)?;
        let auxiliary_data =
            auxiliary_data.unwrap_or(PlaintextEqualityProof::DEFAULT_AUXILIARY_DATA);
        let proof = match precomputation {
            Some(precomputation) => PlaintextEqualityProof::prove_with_precomputation(
                &input,
                witness,
                precomputation,
                auxiliary_data,
            ),
            None => self.rngs.with(|rng| {
                PlaintextEqualityProof::prove(&input, witness, auxiliary_data, rng)
            }),
        }?;
        info!(
            "Generated a plaintext equality proof over {} phis",
            first.phis().len()
        );
        Ok(proof)
    }

    #[instrument(skip_all, err(Debug))]
    pub fn verify_plaintext_equality(
        &self,
        proof: &PlaintextEqualityProof,
        first: &Ciphertext,
        first_key: &PublicKey,
        second: &Ciphertext,
        second_key: &PublicKey,
        auxiliary_data: Option<&[u8]>,
    ) -> Result<bool> {
        self.check_group(first_key.elements())?;
        let input = PlaintextEqualityInput::new(first, first_key, second, second_key)?;
        proof.verify(
            &input,
            auxiliary_data.unwrap_or(PlaintextEqualityProof::DEFAULT_AUXILIARY_DATA),
        )
    }
}

/// Splitting, protection and recovery of board secrets.
#[derive(Debug)]
pub struct ShareService<S: SignatureScheme> {
    scheme: S,
    config: KeyguardConfig,
    rngs: ObjectPool<StdRng>,
}

impl<S: SignatureScheme> ShareService<S> {
    pub fn new(scheme: S, config: &KeyguardConfig) -> Result<Self> {
        Ok(Self {
            scheme,
            config: *config,
            rngs: rng_pool(&config.pool)?,
        })
    }

    pub fn config(&self) -> &KeyguardConfig {
        &self.config
    }

    /// Split raw secrets. The buffers in `secrets` are zeroed.
    #[instrument(skip_all, err(Debug))]
    pub fn split_secrets(
        &self,
        secrets: &mut [Vec<u8>],
        number_of_parts: usize,
        threshold: usize,
        modulus: &BigNumber,
        share_type: ShareType,
    ) -> Result<Vec<Share>> {
        self.rngs.with(|rng| {
            sharing::split(
                secrets,
                number_of_parts,
                threshold,
                modulus,
                share_type,
                rng,
            )
        })
    }

    #[instrument(skip_all, err(Debug))]
    pub fn recover_secrets(&self, shares: &[Share], expected_secrets: usize) -> Result<Recovery> {
        sharing::recover(shares, expected_secrets)
    }

    #[instrument(skip_all, err(Debug))]
    pub fn split_private_key(
        &self,
        private_key: &PrivateKey,
        number_of_parts: usize,
        threshold: usize,
    ) -> Result<Vec<ShareContainer>> {
        self.rngs.with(|rng| {
            sharing::split_private_key(private_key, number_of_parts, threshold, rng)
        })
    }

    #[instrument(skip_all, err(Debug))]
    pub fn recover_private_key(
        &self,
        containers: &[ShareContainer],
        public_key: &PublicKey,
    ) -> Result<PrivateKey> {
        sharing::recover_private_key(containers, public_key)
    }

    /// Encrypt and sign `share` for storage outside the trusted boundary.
    #[instrument(skip_all, err(Debug))]
    pub fn protect(&self, share: Share, signing_key: &S::SigningKey) -> Result<EncryptedShare> {
        self.rngs.with(|rng| {
            EncryptedShare::encrypt(
                share,
                signing_key,
                &self.scheme,
                &self.config.symmetric,
                rng,
            )
        })
    }

    /// Check the signature over a stored share and decrypt it.
    #[instrument(skip_all, err(Debug))]
    pub fn unprotect(
        &self,
        encrypted_share: &[u8],
        signature: &[u8],
        verifying_key: &S::VerifyingKey,
        secret_key: &[u8],
    ) -> Result<Share> {
        let opened = EncryptedShare::open(
            encrypted_share,
            signature,
            verifying_key,
            &self.scheme,
            &self.config.symmetric,
        )?;
        match opened.decrypt(Some(secret_key))? {
            Some(share) => Ok(share),
            None => Err(InternalError::InternalInvariantFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        group::Exponent,
        signature::EcdsaSecp256k1,
        utils::testing::{init_testing, small_group, test_group},
    };
    use rand::seq::SliceRandom;
    use serde::{Deserialize, Serialize};
    use std::thread;

    /// Wire shape of an exponentiation proof, for corrupting it in transit.
    #[derive(Serialize, Deserialize)]
    struct RawProof {
        challenge: BigNumber,
        responses: Vec<BigNumber>,
    }

    fn corrupt_response(proof: &ExponentiationProof) -> ExponentiationProof {
        let mut raw: RawProof = bincode::deserialize(&bincode::serialize(proof).unwrap()).unwrap();
        let mut bytes = raw.responses[0].to_bytes();
        if bytes.is_empty() {
            bytes.push(0);
        }
        let last = bytes.len() - 1;
        bytes[last] ^= 1;
        raw.responses[0] = BigNumber::from_slice(bytes);
        bincode::deserialize(&bincode::serialize(&raw).unwrap()).unwrap()
    }

    #[test]
    fn split_recover_and_prove_over_the_tiny_group() {
        let mut rng = init_testing();
        let group = small_group();
        let config = KeyguardConfig::default();
        let proofs = ProofService::new(&group, &config).unwrap();
        let shares = ShareService::new(EcdsaSecp256k1, &config).unwrap();

        let keys = proofs.generate_key_pair(1).unwrap();
        let mut containers = shares
            .split_private_key(keys.private_key(), 5, 3)
            .unwrap();
        assert_eq!(containers.len(), 5);
        containers.shuffle(&mut rng);
        containers.truncate(3);

        let recovered = shares
            .recover_private_key(&containers, keys.public_key())
            .unwrap();
        let exponent = recovered.exponents()[0].clone();
        assert_eq!(&exponent, &keys.private_key().exponents()[0]);

        let g = Subgroup::generator(&group);
        let exponentiated = g.exponentiate(&exponent).unwrap();
        let witness = Witness::new(exponent);
        let bases = [g];
        let images = [exponentiated];
        let proof = proofs
            .prove_exponentiation(&bases, &images, &witness, None, None)
            .unwrap();
        assert!(proofs
            .verify_exponentiation(&proof, &bases, &images, None)
            .unwrap());

        let corrupted = corrupt_response(&proof);
        assert!(!proofs
            .verify_exponentiation(&corrupted, &bases, &images, None)
            .unwrap());
    }

    #[test]
    fn protected_shares_recover_the_key() {
        let group = test_group();
        let config = KeyguardConfig::default();
        let proofs = ProofService::new(&group, &config).unwrap();
        let service = ShareService::new(EcdsaSecp256k1, &config).unwrap();
        let mut rng = init_testing();
        let (signing_key, verifying_key) = EcdsaSecp256k1::generate_key(&mut rng);

        let keys = proofs.generate_key_pair(2).unwrap();
        let containers = service
            .split_private_key(keys.private_key(), 3, 2)
            .unwrap();

        let mut restored = Vec::new();
        for container in &containers[..2] {
            let mut shares = Vec::new();
            for share in container.shares() {
                let protected = service.protect(share.clone(), &signing_key).unwrap();
                shares.push(
                    service
                        .unprotect(
                            protected.encrypted_share(),
                            protected.signature(),
                            &verifying_key,
                            protected.secret_key(),
                        )
                        .unwrap(),
                );
            }
            restored.push(ShareContainer::new(shares).unwrap());
        }
        let recovered = service
            .recover_private_key(&restored, keys.public_key())
            .unwrap();
        assert!(recovered.matches(keys.public_key()));
    }

    #[test]
    fn plaintext_equality_with_precomputation() {
        let group = test_group();
        let config = KeyguardConfig::default();
        let service = ProofService::new(&group, &config).unwrap();
        let first_keys = service.generate_key_pair(2).unwrap();
        let second_keys = service.generate_key_pair(2).unwrap();
        let messages = vec![Subgroup::generator(&group); 2];

        let precomputation = service
            .precompute_plaintext_equality(first_keys.public_key(), second_keys.public_key())
            .unwrap();
        let (first, first_witness) = service.encrypt(first_keys.public_key(), &messages).unwrap();
        let (second, second_witness) = service
            .encrypt(second_keys.public_key(), &messages)
            .unwrap();
        let witness = PlaintextEqualityWitness {
            first: first_witness,
            second: second_witness,
        };
        let proof = service
            .prove_plaintext_equality(
                &first,
                first_keys.public_key(),
                &second,
                second_keys.public_key(),
                &witness,
                Some(precomputation),
                Some(&b"ballot box 1"[..]),
            )
            .unwrap();
        assert!(service
            .verify_plaintext_equality(
                &proof,
                &first,
                first_keys.public_key(),
                &second,
                second_keys.public_key(),
                Some(&b"ballot box 1"[..]),
            )
            .unwrap());
        assert!(!service
            .verify_plaintext_equality(
                &proof,
                &first,
                first_keys.public_key(),
                &second,
                second_keys.public_key(),
                None,
            )
            .unwrap());
    }

    #[test]
    fn elements_of_other_groups_are_rejected() {
        let config = KeyguardConfig::default();
        let service = ProofService::new(&test_group(), &config).unwrap();
        let other = small_group();
        let g = Subgroup::generator(&other);
        let witness = Witness::new(Exponent::zero(other.q()));
        assert_eq!(
            service
                .prove_exponentiation(&[g.clone()], &[g], &witness, None, None)
                .unwrap_err(),
            InternalError::GroupMismatch
        );
    }

    #[test]
    fn services_are_shared_between_threads() {
        let group = test_group();
        let service = Arc::new(ProofService::new(&group, &KeyguardConfig::default()).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    let keys = service.generate_key_pair(1).unwrap();
                    let g = Subgroup::generator(service.group());
                    let witness = Witness::new(keys.private_key().exponents()[0].clone());
                    let bases = [g];
                    let proof = service
                        .prove_exponentiation(
                            &bases,
                            keys.public_key().elements(),
                            &witness,
                            None,
                            None,
                        )
                        .unwrap();
                    service
                        .verify_exponentiation(&proof, &bases, keys.public_key().elements(), None)
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
