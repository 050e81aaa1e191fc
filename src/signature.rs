// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The digital signature capability used to authenticate protected shares.

use crate::errors::{InternalError, Result};
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use rand::{CryptoRng, RngCore};
use tracing::{error, warn};

/// Sign and verify byte strings with keys of a particular algorithm.
pub trait SignatureScheme {
    type SigningKey;
    type VerifyingKey;

    /// Sign `message`, returning the encoded signature.
    fn sign(&self, message: &[u8], key: &Self::SigningKey) -> Result<Vec<u8>>;

    /// Check an encoded signature. Malformed signatures do not verify.
    fn verify(&self, message: &[u8], signature: &[u8], key: &Self::VerifyingKey) -> bool;
}

/// ECDSA over secp256k1 with SHA-256, with fixed-width `r || s` signatures.
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaSecp256k1;

impl EcdsaSecp256k1 {
    /// Generate a fresh key pair.
    pub fn generate_key<R: RngCore + CryptoRng>(rng: &mut R) -> (SigningKey, VerifyingKey) {
        let signing_key = SigningKey::random(rng);
        let verifying_key = VerifyingKey::from(&signing_key);
        (signing_key, verifying_key)
    }

    /// Parse a signing key from its 32-byte scalar encoding.
    pub fn signing_key_from_bytes(bytes: &[u8]) -> Result<SigningKey> {
        SigningKey::from_bytes(bytes).map_err(|_| {
            error!("Could not parse ECDSA signing key");
            InternalError::Serialization
        })
    }

    /// Parse a verifying key from its SEC1 encoding.
    pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(bytes).map_err(|_| {
            error!("Could not parse ECDSA verifying key");
            InternalError::Serialization
        })
    }
}

impl SignatureScheme for EcdsaSecp256k1 {
    type SigningKey = SigningKey;
    type VerifyingKey = VerifyingKey;

    fn sign(&self, message: &[u8], key: &SigningKey) -> Result<Vec<u8>> {
        let signature: Signature = key.try_sign(message).map_err(|e| {
            error!("ECDSA signing failed: {}", e);
            InternalError::CryptoOperationFailed(String::from("ECDSA signing failed"))
        })?;
        Ok(signature.as_ref().to_vec())
    }

    fn verify(&self, message: &[u8], signature: &[u8], key: &VerifyingKey) -> bool {
        let signature = match Signature::try_from(signature) {
            Ok(signature) => signature,
            Err(_) => {
                warn!("Malformed ECDSA signature");
                return false;
            }
        };
        key.verify(message, &signature).is_ok()
    }
}
