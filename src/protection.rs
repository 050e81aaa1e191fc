// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Storage-safe wrapping of [`Share`]s.
//!
//! A share leaving the trusted boundary is serialized, encrypted under a
//! fresh symmetric key with an AEAD, and the resulting ciphertext is signed
//! with the board's signing key. On the way back the signature is checked
//! before the ciphertext is trusted at all.

use crate::{
    errors::{InternalError, Result},
    parameters::{SymmetricAlgorithm, SymmetricConfig},
    sharing::Share,
    signature::SignatureScheme,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce, XChaCha20Poly1305, XNonce,
};
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use tracing::{error, instrument};
use zeroize::{Zeroize, Zeroizing};

/// Encrypt `plaintext` under `key` with a random nonce. Output is
/// `nonce || ciphertext`.
pub(crate) fn seal<R: RngCore + CryptoRng>(
    algorithm: SymmetricAlgorithm,
    key: &[u8],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let mut nonce = vec![0u8; algorithm.nonce_length()];
    rng.fill_bytes(&mut nonce);
    let ciphertext = match algorithm {
        SymmetricAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| InternalError::InvalidArgument(String::from("bad key length")))?
            .encrypt(Nonce::from_slice(&nonce), plaintext),
        SymmetricAlgorithm::XChaCha20Poly1305 => XChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| InternalError::InvalidArgument(String::from("bad key length")))?
            .encrypt(XNonce::from_slice(&nonce), plaintext),
    }
    .map_err(|_| {
        error!("AEAD encryption failed");
        InternalError::CryptoOperationFailed(String::from("AEAD encryption failed"))
    })?;
    nonce.extend_from_slice(&ciphertext);
    Ok(nonce)
}

/// Inverse of [`seal`]. Any authentication failure is a
/// [`InternalError::DecryptionFailed`].
pub(crate) fn unseal(
    algorithm: SymmetricAlgorithm,
    key: &[u8],
    sealed: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if key.len() != algorithm.key_length() {
        error!(
            "Symmetric key has {} bytes, expected {}",
            key.len(),
            algorithm.key_length()
        );
        return arg_err!("bad key length");
    }
    if sealed.len() < algorithm.nonce_length() {
        error!("Sealed data is shorter than a nonce");
        return Err(InternalError::DecryptionFailed);
    }
    let (nonce, ciphertext) = sealed.split_at(algorithm.nonce_length());
    let plaintext = match algorithm {
        SymmetricAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| InternalError::InvalidArgument(String::from("bad key length")))?
            .decrypt(Nonce::from_slice(nonce), ciphertext),
        SymmetricAlgorithm::XChaCha20Poly1305 => XChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| InternalError::InvalidArgument(String::from("bad key length")))?
            .decrypt(XNonce::from_slice(nonce), ciphertext),
    }
    .map_err(|_| {
        error!("AEAD decryption failed");
        InternalError::DecryptionFailed
    })?;
    Ok(Zeroizing::new(plaintext))
}

/// An encrypted, signed share.
///
/// Built either by [`EncryptedShare::encrypt`], in which case it also holds
/// the symmetric key, or by [`EncryptedShare::open`] from persisted bytes, in
/// which case the key has to be supplied to [`EncryptedShare::decrypt`].
pub struct EncryptedShare {
    encrypted_share: Vec<u8>,
    signature: Vec<u8>,
    secret_key: Vec<u8>,
    config: SymmetricConfig,
    destroyed: bool,
}

impl Debug for EncryptedShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedShare")
            .field("encrypted_share", &hex::encode(&self.encrypted_share))
            .field("signature", &hex::encode(&self.signature))
            .field("secret_key", &"[redacted]")
            .field("config", &self.config)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl EncryptedShare {
    /// Encrypt `share` under a fresh key and sign the ciphertext. The share is
    /// consumed and zeroed.
    #[instrument(skip_all, err(Debug))]
    pub fn encrypt<S: SignatureScheme, R: RngCore + CryptoRng>(
        share: Share,
        signing_key: &S::SigningKey,
        scheme: &S,
        config: &SymmetricConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let mut secret_key = vec![0u8; config.key_length()];
        rng.fill_bytes(&mut secret_key);
        let secret_key = Zeroizing::new(secret_key);

        let serialized = share.to_bytes()?;
        drop(share);

        let encrypted_share = seal(config.algorithm, &secret_key, &serialized, rng)?;
        let signature = scheme.sign(&encrypted_share, signing_key)?;
        Ok(Self {
            encrypted_share,
            signature,
            secret_key: secret_key.to_vec(),
            config: *config,
            destroyed: false,
        })
    }

    /// Check `signature` over `encrypted_share` and wrap both for decryption.
    #[instrument(skip_all, err(Debug))]
    pub fn open<S: SignatureScheme>(
        encrypted_share: &[u8],
        signature: &[u8],
        verifying_key: &S::VerifyingKey,
        scheme: &S,
        config: &SymmetricConfig,
    ) -> Result<Self> {
        if !scheme.verify(encrypted_share, signature, verifying_key) {
            error!("Signature over the encrypted share does not verify");
            return Err(InternalError::ShareIntegrityError);
        }
        Ok(Self {
            encrypted_share: encrypted_share.to_vec(),
            signature: signature.to_vec(),
            secret_key: Vec::new(),
            config: *config,
            destroyed: false,
        })
    }

    /// Decrypt with `secret_key`. No key yields `Ok(None)`.
    pub fn decrypt(&self, secret_key: Option<&[u8]>) -> Result<Option<Share>> {
        if self.destroyed {
            return arg_err!("encrypted share was destroyed");
        }
        let secret_key = match secret_key {
            Some(secret_key) => secret_key,
            None => return Ok(None),
        };
        let plaintext = unseal(self.config.algorithm, secret_key, &self.encrypted_share)?;
        Ok(Some(Share::from_slice(&plaintext)?))
    }

    /// `nonce || ciphertext`.
    pub fn encrypted_share(&self) -> &[u8] {
        &self.encrypted_share
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The symmetric key. Empty for shares built with
    /// [`EncryptedShare::open`].
    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Zero every buffer. Safe to call more than once.
    pub fn destroy(&mut self) {
        self.encrypted_share.as_mut_slice().zeroize();
        self.signature.as_mut_slice().zeroize();
        self.secret_key.as_mut_slice().zeroize();
        self.destroyed = true;
    }
}

impl Drop for EncryptedShare {
    fn drop(&mut self) {
        self.destroy();
    }
}
