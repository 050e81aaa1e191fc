// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Password-protected storage of key material.
//!
//! Entries are sealed individually: every [`InMemoryKeyStore::store`] draws a
//! fresh salt, derives a sealing key from the password with HKDF-SHA256 and
//! encrypts the entry with ChaCha20-Poly1305. The stored bytes are
//! `salt || nonce || ciphertext`.

use crate::{
    elgamal::PrivateKey,
    errors::{InternalError, Result},
    parameters::{SymmetricAlgorithm, KEYSTORE_KEY_BYTES, KEYSTORE_SALT_BYTES},
    protection::{seal, unseal},
};
use hkdf::Hkdf;
use k256::ecdsa::SigningKey;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use std::{collections::HashMap, fmt::Debug};
use tracing::{error, instrument};
use zeroize::Zeroizing;

const KEYSTORE_ALGORITHM: SymmetricAlgorithm = SymmetricAlgorithm::ChaCha20Poly1305;
const KEY_DERIVATION_INFO: &[u8] = b"board-keyguard keystore entry";

/// A piece of key material held by a [`KeyStore`].
pub enum KeyEntry {
    /// Encoded private key of a [`SignatureScheme`](crate::signature::SignatureScheme).
    SigningKey(Zeroizing<Vec<u8>>),
    /// Raw symmetric key bytes.
    SecretKey(Zeroizing<Vec<u8>>),
    ElGamalPrivateKey(PrivateKey),
}

impl Debug for KeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            KeyEntry::SigningKey(_) => "SigningKey",
            KeyEntry::SecretKey(_) => "SecretKey",
            KeyEntry::ElGamalPrivateKey(_) => "ElGamalPrivateKey",
        };
        f.debug_tuple(kind).field(&"[redacted]").finish()
    }
}

impl From<&SigningKey> for KeyEntry {
    fn from(key: &SigningKey) -> Self {
        KeyEntry::SigningKey(Zeroizing::new(key.to_bytes().to_vec()))
    }
}

impl KeyEntry {
    fn tag(&self) -> u8 {
        match self {
            KeyEntry::SigningKey(_) => 0,
            KeyEntry::SecretKey(_) => 1,
            KeyEntry::ElGamalPrivateKey(_) => 2,
        }
    }

    fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        let mut output = Zeroizing::new(vec![self.tag()]);
        match self {
            KeyEntry::SigningKey(bytes) | KeyEntry::SecretKey(bytes) => {
                output.extend_from_slice(bytes)
            }
            KeyEntry::ElGamalPrivateKey(key) => {
                let bytes = Zeroizing::new(serialize!(key)?);
                output.extend_from_slice(&bytes);
            }
        }
        Ok(output)
    }

    fn from_slice(input: &[u8]) -> Result<Self> {
        let (tag, body) = match input.split_first() {
            Some(split) => split,
            None => return Err(InternalError::Serialization),
        };
        match tag {
            0 => Ok(KeyEntry::SigningKey(Zeroizing::new(body.to_vec()))),
            1 => Ok(KeyEntry::SecretKey(Zeroizing::new(body.to_vec()))),
            2 => Ok(KeyEntry::ElGamalPrivateKey(deserialize!(body)?)),
            _ => {
                error!("Unknown keystore entry tag {}", tag);
                Err(InternalError::Serialization)
            }
        }
    }
}

/// Storage of key material under string aliases, protected by a password.
pub trait KeyStore {
    /// Seal `entry` under `password` and store it, replacing any previous
    /// entry with the same alias.
    fn store<R: RngCore + CryptoRng>(
        &mut self,
        alias: &str,
        entry: &KeyEntry,
        password: &[u8],
        rng: &mut R,
    ) -> Result<()>;

    /// Unseal the entry under `alias`.
    fn retrieve(&self, alias: &str, password: &[u8]) -> Result<KeyEntry>;

    fn remove(&mut self, alias: &str) -> Result<()>;

    fn contains(&self, alias: &str) -> bool;

    /// Every stored alias, sorted.
    fn aliases(&self) -> Vec<String>;
}

/// A [`KeyStore`] that lives in process memory.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore(HashMap<String, Vec<u8>>);

fn derive_sealing_key(salt: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let mut key = Zeroizing::new(vec![0u8; KEYSTORE_KEY_BYTES]);
    Hkdf::<Sha256>::new(Some(salt), password)
        .expand(KEY_DERIVATION_INFO, &mut key)
        .map_err(|_| {
            error!("HKDF expansion failed");
            InternalError::CryptoOperationFailed(String::from("key derivation failed"))
        })?;
    Ok(key)
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl KeyStore for InMemoryKeyStore {
    #[instrument(skip_all, err(Debug))]
    fn store<R: RngCore + CryptoRng>(
        &mut self,
        alias: &str,
        entry: &KeyEntry,
        password: &[u8],
        rng: &mut R,
    ) -> Result<()> {
        if alias.is_empty() {
            return arg_err!("keystore aliases must not be empty");
        }
        let mut salt = vec![0u8; KEYSTORE_SALT_BYTES];
        rng.fill_bytes(&mut salt);
        let key = derive_sealing_key(&salt, password)?;
        let sealed = seal(KEYSTORE_ALGORITHM, &key, &entry.to_bytes()?, rng)?;

        salt.extend_from_slice(&sealed);
        let _ = self.0.insert(alias.to_owned(), salt);
        Ok(())
    }

    #[instrument(skip_all, err(Debug))]
    fn retrieve(&self, alias: &str, password: &[u8]) -> Result<KeyEntry> {
        let stored = self.0.get(alias).ok_or(InternalError::KeyNotFound)?;
        if stored.len() < KEYSTORE_SALT_BYTES {
            error!("Keystore entry is shorter than its salt");
            return Err(InternalError::InternalInvariantFailed);
        }
        let (salt, sealed) = stored.split_at(KEYSTORE_SALT_BYTES);
        let key = derive_sealing_key(salt, password)?;
        let plaintext = unseal(KEYSTORE_ALGORITHM, &key, sealed)?;
        KeyEntry::from_slice(&plaintext)
    }

    fn remove(&mut self, alias: &str) -> Result<()> {
        self.0
            .remove(alias)
            .map(|_| ())
            .ok_or(InternalError::KeyNotFound)
    }

    fn contains(&self, alias: &str) -> bool {
        self.0.contains_key(alias)
    }

    fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.0.keys().cloned().collect();
        aliases.sort();
        aliases
    }
}
