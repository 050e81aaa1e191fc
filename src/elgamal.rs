// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Multi-key ElGamal over a [`Subgroup`].
//!
//! A key pair holds one or more sub-keys; a [`Ciphertext`] encrypts up to one
//! message per sub-key under a single randomness `r`:
//! `gamma = g^r`, `phi_i = pk_i^r * m_i`.

use crate::{
    errors::{InternalError, Result},
    group::{Exponent, GroupElement, Subgroup},
    zkp::Witness,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};
use tracing::error;
use zeroize::ZeroizeOnDrop;

/// The secret exponents of an ElGamal key.
#[derive(Serialize, Deserialize, ZeroizeOnDrop)]
#[serde(try_from = "PrivateKeyRepr")]
pub struct PrivateKey {
    exponents: Vec<Exponent>,
    #[zeroize(skip)]
    group: Arc<Subgroup>,
}

#[derive(Deserialize)]
struct PrivateKeyRepr {
    exponents: Vec<Exponent>,
    group: Arc<Subgroup>,
}

impl TryFrom<PrivateKeyRepr> for PrivateKey {
    type Error = InternalError;

    fn try_from(repr: PrivateKeyRepr) -> Result<Self> {
        PrivateKey::new(repr.exponents, &repr.group)
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("elgamal::PrivateKey")
            .field("exponents", &"[redacted]")
            .field("group", &self.group)
            .finish()
    }
}

impl PrivateKey {
    /// Build a private key from exponents reduced modulo the group order.
    pub fn new(exponents: Vec<Exponent>, group: &Arc<Subgroup>) -> Result<Self> {
        if exponents.is_empty() {
            return arg_err!("a private key needs at least one exponent");
        }
        if exponents.iter().any(|x| x.modulus() != group.q()) {
            error!("Private key exponent is not reduced modulo the group order");
            return Err(InternalError::GroupMismatch);
        }
        Ok(Self {
            exponents,
            group: Arc::clone(group),
        })
    }

    pub fn exponents(&self) -> &[Exponent] {
        &self.exponents
    }

    pub fn group(&self) -> &Arc<Subgroup> {
        &self.group
    }

    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Compute `g^x_i` for every sub-key.
    pub fn public_key(&self) -> Result<PublicKey> {
        let g = Subgroup::generator(&self.group);
        let elements = self
            .exponents
            .iter()
            .map(|x| g.exponentiate(x))
            .collect::<Result<Vec<_>>>()?;
        PublicKey::new(elements)
    }

    /// Whether `public` is exactly `g^x_i` for every sub-key of this key.
    pub fn matches(&self, public: &PublicKey) -> bool {
        if self.len() != public.len() || *self.group != **public.group() {
            return false;
        }
        match self.public_key() {
            Ok(derived) => derived == *public,
            Err(_) => false,
        }
    }

    /// Recover the messages of a ciphertext: `m_i = phi_i / gamma^{x_i}`.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Vec<GroupElement>> {
        if **ciphertext.gamma.group() != *self.group {
            error!("Ciphertext and private key belong to different subgroups");
            return Err(InternalError::GroupMismatch);
        }
        if ciphertext.phis.len() > self.exponents.len() {
            error!(
                "Ciphertext has {} components but the key only has {} sub-keys",
                ciphertext.phis.len(),
                self.exponents.len()
            );
            return arg_err!("ciphertext has more components than the key has sub-keys");
        }
        ciphertext
            .phis
            .iter()
            .zip(self.exponents.iter())
            .map(|(phi, x)| phi.divide(&ciphertext.gamma.exponentiate(x)?))
            .collect()
    }
}

/// The public elements `g^x_i` of an ElGamal key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyRepr", into = "PublicKeyRepr")]
pub struct PublicKey {
    elements: Vec<GroupElement>,
}

#[derive(Serialize, Deserialize)]
struct PublicKeyRepr {
    elements: Vec<GroupElement>,
}

impl TryFrom<PublicKeyRepr> for PublicKey {
    type Error = InternalError;

    fn try_from(repr: PublicKeyRepr) -> Result<Self> {
        PublicKey::new(repr.elements)
    }
}

impl From<PublicKey> for PublicKeyRepr {
    fn from(key: PublicKey) -> Self {
        Self {
            elements: key.elements,
        }
    }
}

impl PublicKey {
    /// Build a public key. All elements must be members of one subgroup.
    pub fn new(elements: Vec<GroupElement>) -> Result<Self> {
        let first = match elements.first() {
            Some(first) => first,
            None => return arg_err!("a public key needs at least one element"),
        };
        if elements.iter().any(|e| !e.same_group(first)) {
            error!("Public key elements belong to different subgroups");
            return Err(InternalError::GroupMismatch);
        }
        if elements.iter().any(|e| !e.is_member()) {
            error!("Public key element is not a subgroup member");
            return Err(InternalError::InvalidElement);
        }
        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[GroupElement] {
        &self.elements
    }

    pub fn group(&self) -> &Arc<Subgroup> {
        // Non-empty by construction.
        self.elements[0].group()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Encrypt `messages` under fresh randomness. The randomness is returned
    /// as a [`Witness`] so that the caller can prove statements about the
    /// ciphertext.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        messages: &[GroupElement],
        rng: &mut R,
    ) -> Result<(Ciphertext, Witness)> {
        let r = self.group().random_exponent(rng);
        let ciphertext = self.encrypt_with_randomness(messages, &r)?;
        Ok((ciphertext, Witness::new(r)))
    }

    /// Encrypt `messages` with caller-chosen randomness `r`.
    pub fn encrypt_with_randomness(
        &self,
        messages: &[GroupElement],
        r: &Exponent,
    ) -> Result<Ciphertext> {
        if messages.is_empty() {
            return arg_err!("nothing to encrypt");
        }
        if messages.len() > self.elements.len() {
            error!(
                "Tried to encrypt {} messages with a key of {} sub-keys",
                messages.len(),
                self.elements.len()
            );
            return arg_err!("more messages than sub-keys");
        }
        let gamma = Subgroup::generator(self.group()).exponentiate(r)?;
        let phis = messages
            .iter()
            .zip(self.elements.iter())
            .map(|(m, pk)| pk.exponentiate(r)?.multiply(m))
            .collect::<Result<Vec<_>>>()?;
        Ciphertext::new(gamma, phis)
    }
}

/// A private key together with its public key.
#[derive(Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Draw `sub_key_count` independent exponents uniformly from `[0, q)`.
    pub fn generate<R: RngCore + CryptoRng>(
        group: &Arc<Subgroup>,
        sub_key_count: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if sub_key_count == 0 {
            return arg_err!("a key pair needs at least one sub-key");
        }
        let exponents = (0..sub_key_count)
            .map(|_| group.random_exponent(rng))
            .collect();
        let private = PrivateKey::new(exponents, group)?;
        let public = private.public_key()?;
        Ok(Self { private, public })
    }

    /// Pair up existing keys, checking `public[i] == g^private[i]`.
    pub fn from_parts(private: PrivateKey, public: PublicKey) -> Result<Self> {
        if !private.matches(&public) {
            error!("Public key does not correspond to the private key");
            return arg_err!("public key does not match private key");
        }
        Ok(Self { private, public })
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn group(&self) -> &Arc<Subgroup> {
        self.private.group()
    }

    pub fn into_parts(self) -> (PrivateKey, PublicKey) {
        (self.private, self.public)
    }
}

/// An ElGamal ciphertext `(gamma, phi_1, ..., phi_n)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ciphertext {
    gamma: GroupElement,
    phis: Vec<GroupElement>,
}

impl Ciphertext {
    /// Build a ciphertext. `phis` must be non-empty and every component must
    /// belong to the same subgroup as `gamma`.
    pub fn new(gamma: GroupElement, phis: Vec<GroupElement>) -> Result<Self> {
        if phis.is_empty() {
            return arg_err!("a ciphertext needs at least one phi");
        }
        if phis.iter().any(|phi| !phi.same_group(&gamma)) {
            error!("Ciphertext components belong to different subgroups");
            return Err(InternalError::GroupMismatch);
        }
        Ok(Self { gamma, phis })
    }

    /// Build a ciphertext from `[gamma, phi_1, ..., phi_n]`.
    pub fn from_elements(mut elements: Vec<GroupElement>) -> Result<Self> {
        if elements.len() < 2 {
            return arg_err!("a ciphertext needs gamma and at least one phi");
        }
        let phis = elements.split_off(1);
        let gamma = elements.remove(0);
        Self::new(gamma, phis)
    }

    pub fn gamma(&self) -> &GroupElement {
        &self.gamma
    }

    pub fn phis(&self) -> &[GroupElement] {
        &self.phis
    }

    pub fn group(&self) -> &Arc<Subgroup> {
        self.gamma.group()
    }

    /// `[gamma, phi_1, ..., phi_n]`.
    pub fn elements(&self) -> impl Iterator<Item = &GroupElement> {
        std::iter::once(&self.gamma).chain(self.phis.iter())
    }
}
