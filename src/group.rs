// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Arithmetic in a prime-order subgroup of `Z_p^*`.
//!
//! A [`Subgroup`] is shared by reference ([`Arc`]) between all of its
//! [`GroupElement`]s, so that operations can cheaply check that both operands
//! live in the same group. An [`Exponent`] carries the order `q` it is reduced
//! by; exponentiating an element by an exponent of a different order is a
//! [`InternalError::GroupMismatch`].

use crate::{
    errors::{InternalError, Result},
    utils::{modpow, random_positive_bn},
};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, sync::Arc};
use tracing::error;
use zeroize::Zeroize;

/// Numeric ordering of two non-negative numbers, via their minimal big-endian
/// encodings.
fn compare_magnitude(a: &BigNumber, b: &BigNumber) -> Ordering {
    fn significant(bytes: &[u8]) -> &[u8] {
        let start = bytes
            .iter()
            .position(|byte| *byte != 0)
            .unwrap_or(bytes.len());
        &bytes[start..]
    }
    let (a, b) = (a.to_bytes(), b.to_bytes());
    let (a, b) = (significant(&a), significant(&b));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// A subgroup of prime order `q` of the multiplicative group modulo the prime
/// `p`, generated by `g`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubgroupParameters", into = "SubgroupParameters")]
pub struct Subgroup {
    p: BigNumber,
    q: BigNumber,
    g: BigNumber,
}

#[derive(Serialize, Deserialize)]
struct SubgroupParameters {
    p: BigNumber,
    q: BigNumber,
    g: BigNumber,
}

impl TryFrom<SubgroupParameters> for Subgroup {
    type Error = InternalError;

    fn try_from(params: SubgroupParameters) -> Result<Self> {
        Subgroup::new(params.p, params.q, params.g)
    }
}

impl From<Subgroup> for SubgroupParameters {
    fn from(group: Subgroup) -> Self {
        Self {
            p: group.p,
            q: group.q,
            g: group.g,
        }
    }
}

impl Subgroup {
    /// Validate and build a subgroup.
    ///
    /// Fails with [`InternalError::InvalidArgument`] unless `p` and `q` are
    /// (probable) primes, `q` divides `p - 1`, and `g` is an element of order
    /// `q`.
    pub fn new(p: BigNumber, q: BigNumber, g: BigNumber) -> Result<Self> {
        let one = BigNumber::one();
        if p <= BigNumber::from(2u64) || !p.is_prime() {
            error!("Subgroup modulus is not an odd prime");
            return arg_err!("p must be an odd prime");
        }
        if q <= one || !q.is_prime() {
            error!("Subgroup order is not a prime");
            return arg_err!("q must be prime");
        }
        if (&p - &one) % q.clone() != BigNumber::zero() {
            error!("Subgroup order does not divide p - 1");
            return arg_err!("q must divide p - 1");
        }
        // Since q is prime, g != 1 and g^q == 1 means g has order exactly q.
        if g <= one || g >= p || modpow(&g, &q, &p) != one {
            error!("Subgroup generator does not have order q");
            return arg_err!("g must generate the subgroup of order q");
        }
        Ok(Self { p, q, g })
    }

    /// The modulus `p`.
    pub fn p(&self) -> &BigNumber {
        &self.p
    }

    /// The order `q`.
    pub fn q(&self) -> &BigNumber {
        &self.q
    }

    /// The raw generator value `g`.
    pub fn g(&self) -> &BigNumber {
        &self.g
    }

    /// The generator as an element of `group`.
    pub fn generator(group: &Arc<Self>) -> GroupElement {
        GroupElement {
            value: group.g.clone(),
            group: Arc::clone(group),
        }
    }

    /// The identity element of `group`.
    pub fn identity(group: &Arc<Self>) -> GroupElement {
        GroupElement {
            value: BigNumber::one(),
            group: Arc::clone(group),
        }
    }

    /// Whether `value` lies in `[1, p)` and has order dividing `q`.
    pub fn is_member(&self, value: &BigNumber) -> bool {
        value >= &BigNumber::one()
            && value < &self.p
            && modpow(value, &self.q, &self.p) == BigNumber::one()
    }

    /// A uniformly random exponent for this group.
    pub fn random_exponent<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Exponent {
        Exponent::random(&self.q, rng)
    }
}

/// An element of a [`Subgroup`].
///
/// The lenient constructor [`GroupElement::new`] only range-checks the value,
/// matching what ElGamal ciphertext components require; use
/// [`GroupElement::new_member`] when subgroup membership must be enforced.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "ElementRepr", into = "ElementRepr")]
pub struct GroupElement {
    value: BigNumber,
    group: Arc<Subgroup>,
}

#[derive(Serialize, Deserialize)]
struct ElementRepr {
    value: BigNumber,
    group: Arc<Subgroup>,
}

impl TryFrom<ElementRepr> for GroupElement {
    type Error = InternalError;

    fn try_from(repr: ElementRepr) -> Result<Self> {
        GroupElement::new(repr.value, &repr.group)
    }
}

impl From<GroupElement> for ElementRepr {
    fn from(element: GroupElement) -> Self {
        Self {
            value: element.value,
            group: element.group,
        }
    }
}

impl PartialEq for GroupElement {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && (Arc::ptr_eq(&self.group, &other.group) || self.group == other.group)
    }
}

impl Eq for GroupElement {}

impl PartialOrd for GroupElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupElement {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_magnitude(&self.group.p, &other.group.p)
            .then_with(|| compare_magnitude(&self.group.q, &other.group.q))
            .then_with(|| compare_magnitude(&self.group.g, &other.group.g))
            .then_with(|| compare_magnitude(&self.value, &other.value))
    }
}

impl GroupElement {
    /// Wrap `value`, checking only that `0 <= value < p`.
    pub fn new(value: BigNumber, group: &Arc<Subgroup>) -> Result<Self> {
        if value < BigNumber::zero() || value >= group.p {
            error!("Group element value is outside of [0, p)");
            return Err(InternalError::InvalidElement);
        }
        Ok(Self {
            value,
            group: Arc::clone(group),
        })
    }

    /// Wrap `value`, checking that it is a member of the order-`q` subgroup.
    pub fn new_member(value: BigNumber, group: &Arc<Subgroup>) -> Result<Self> {
        if !group.is_member(&value) {
            error!("Value is not a member of the subgroup");
            return Err(InternalError::InvalidElement);
        }
        Ok(Self {
            value,
            group: Arc::clone(group),
        })
    }

    pub fn value(&self) -> &BigNumber {
        &self.value
    }

    pub fn group(&self) -> &Arc<Subgroup> {
        &self.group
    }

    /// Whether this element lies in the order-`q` subgroup.
    pub fn is_member(&self) -> bool {
        self.group.is_member(&self.value)
    }

    /// Whether both elements belong to the same subgroup.
    pub fn same_group(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.group, &other.group) || self.group == other.group
    }

    fn check_group(&self, other: &Self) -> Result<()> {
        if !self.same_group(other) {
            error!("Tried to combine elements of different subgroups");
            return Err(InternalError::GroupMismatch);
        }
        Ok(())
    }

    /// `self * other mod p`.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        self.check_group(other)?;
        Ok(Self {
            value: self.value.modmul(&other.value, &self.group.p),
            group: Arc::clone(&self.group),
        })
    }

    /// `self * other^{-1} mod p`.
    pub fn divide(&self, other: &Self) -> Result<Self> {
        self.check_group(other)?;
        self.multiply(&other.invert()?)
    }

    /// The multiplicative inverse. Zero has none.
    pub fn invert(&self) -> Result<Self> {
        let value = self.value.invert(&self.group.p).ok_or_else(|| {
            error!("Tried to invert a non-invertible group element");
            InternalError::InvalidElement
        })?;
        Ok(Self {
            value,
            group: Arc::clone(&self.group),
        })
    }

    /// `self^exponent mod p`. The exponent must be reduced modulo this
    /// group's order.
    pub fn exponentiate(&self, exponent: &Exponent) -> Result<Self> {
        if exponent.q != self.group.q {
            error!("Exponent modulus does not match the subgroup order");
            return Err(InternalError::GroupMismatch);
        }
        Ok(Self {
            value: modpow(&self.value, &exponent.value, &self.group.p),
            group: Arc::clone(&self.group),
        })
    }

    /// Big-endian bytes of the value.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.value.to_bytes()
    }
}

/// An integer modulo a group order `q`.
///
/// Exponents are used as private keys and witnesses, so `Debug` does not print
/// the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
#[serde(try_from = "ExponentRepr")]
pub struct Exponent {
    value: BigNumber,
    q: BigNumber,
}

impl std::fmt::Debug for Exponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exponent")
            .field("value", &"[redacted]")
            .field("q", &self.q)
            .finish()
    }
}

#[derive(Deserialize)]
struct ExponentRepr {
    value: BigNumber,
    q: BigNumber,
}

impl TryFrom<ExponentRepr> for Exponent {
    type Error = InternalError;

    fn try_from(repr: ExponentRepr) -> Result<Self> {
        if repr.value >= repr.q {
            error!("Deserialized exponent is not reduced");
            return arg_err!("exponent value must be below its modulus");
        }
        Exponent::new(repr.value, &repr.q)
    }
}

impl Exponent {
    /// Reduce a non-negative `value` modulo `q`.
    pub fn new(value: BigNumber, q: &BigNumber) -> Result<Self> {
        if q <= &BigNumber::zero() {
            return arg_err!("exponent modulus must be positive");
        }
        if value < BigNumber::zero() {
            return arg_err!("exponent value must be non-negative");
        }
        Ok(Self::reduced(value, q))
    }

    /// Build from a value the caller already knows to be non-negative, with a
    /// positive `q`.
    pub(crate) fn reduced(value: BigNumber, q: &BigNumber) -> Self {
        let value = if &value >= q { &value % q.clone() } else { value };
        Self {
            value,
            q: q.clone(),
        }
    }

    pub fn zero(q: &BigNumber) -> Self {
        Self {
            value: BigNumber::zero(),
            q: q.clone(),
        }
    }

    /// Uniform in `[0, q)`.
    pub fn random<R: RngCore + CryptoRng>(q: &BigNumber, rng: &mut R) -> Self {
        Self {
            value: random_positive_bn(rng, q),
            q: q.clone(),
        }
    }

    pub fn value(&self) -> &BigNumber {
        &self.value
    }

    pub fn modulus(&self) -> &BigNumber {
        &self.q
    }

    fn check_modulus(&self, other: &Self) -> Result<()> {
        if self.q != other.q {
            error!("Tried to combine exponents with different moduli");
            return Err(InternalError::GroupMismatch);
        }
        Ok(())
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_modulus(other)?;
        Ok(Self {
            value: self.value.modadd(&other.value, &self.q),
            q: self.q.clone(),
        })
    }

    pub fn subtract(&self, other: &Self) -> Result<Self> {
        self.check_modulus(other)?;
        Ok(Self {
            value: self.value.modsub(&other.value, &self.q),
            q: self.q.clone(),
        })
    }

    pub fn multiply(&self, other: &Self) -> Result<Self> {
        self.check_modulus(other)?;
        Ok(Self {
            value: self.value.modmul(&other.value, &self.q),
            q: self.q.clone(),
        })
    }

    /// `-self mod q`.
    pub fn negate(&self) -> Self {
        let value = if self.value == BigNumber::zero() {
            BigNumber::zero()
        } else {
            &self.q - &self.value
        };
        Self {
            value,
            q: self.q.clone(),
        }
    }

    /// `self^{-1} mod q`. Zero has no inverse.
    pub fn invert(&self) -> Result<Self> {
        if self.value == BigNumber::zero() {
            return arg_err!("zero exponent has no inverse");
        }
        let value = self.value.invert(&self.q).ok_or_else(|| {
            error!("Exponent is not invertible modulo q");
            InternalError::InvalidArgument(String::from("exponent is not invertible"))
        })?;
        Ok(Self {
            value,
            q: self.q.clone(),
        })
    }
}
