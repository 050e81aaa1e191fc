// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{InternalError, Result},
    serialization::{append_framed, i2osp, read_usize, tokenize},
};
use libpaillier::unknown_order::BigNumber;
use std::fmt::Debug;
use tracing::error;
use zeroize::{ZeroizeOnDrop, Zeroizing};

/// Width of the count and coordinate fields of the share format.
const COUNT_BYTES: usize = 4;
/// Width of the length prefix of every big-integer field.
const LENGTH_BYTES: usize = 2;

/// Which board a share belongs to. Recorded in every share so that shares of
/// different boards can never be combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareType {
    AdministrationBoard,
    ElectoralBoard,
}

impl ShareType {
    fn to_byte(self) -> u8 {
        match self {
            ShareType::AdministrationBoard => 0,
            ShareType::ElectoralBoard => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(ShareType::AdministrationBoard),
            1 => Ok(ShareType::ElectoralBoard),
            _ => {
                error!("Unknown share type {}", byte);
                Err(InternalError::Serialization)
            }
        }
    }
}

/// One evaluation point of the sharing polynomials, together with the
/// parameters of the split it came from.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct Share {
    #[zeroize(skip)]
    number_of_parts: usize,
    #[zeroize(skip)]
    threshold: usize,
    #[zeroize(skip)]
    modulus: BigNumber,
    #[zeroize(skip)]
    secret_length: usize,
    #[zeroize(skip)]
    share_type: ShareType,
    #[zeroize(skip)]
    x: usize,
    values: Vec<BigNumber>,
}

impl Debug for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Share")
            .field("number_of_parts", &self.number_of_parts)
            .field("threshold", &self.threshold)
            .field("secret_length", &self.secret_length)
            .field("share_type", &self.share_type)
            .field("x", &self.x)
            .field("values", &"[redacted]")
            .finish()
    }
}

impl Share {
    pub(super) fn new(
        number_of_parts: usize,
        threshold: usize,
        modulus: &BigNumber,
        secret_length: usize,
        share_type: ShareType,
        x: usize,
        values: Vec<BigNumber>,
    ) -> Self {
        Self {
            number_of_parts,
            threshold,
            modulus: modulus.clone(),
            secret_length,
            share_type,
            x,
            values,
        }
    }

    /// Total number of shares produced by the split.
    pub fn number_of_parts(&self) -> usize {
        self.number_of_parts
    }

    /// Number of shares required to recover.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn modulus(&self) -> &BigNumber {
        &self.modulus
    }

    /// Byte length of every shared secret.
    pub fn secret_length(&self) -> usize {
        self.secret_length
    }

    pub fn share_type(&self) -> ShareType {
        self.share_type
    }

    /// The x-coordinate, in `1..=number_of_parts`.
    pub fn x(&self) -> usize {
        self.x
    }

    /// Number of secrets shared in this split.
    pub fn number_of_secrets(&self) -> usize {
        self.values.len()
    }

    pub(super) fn values(&self) -> &[BigNumber] {
        &self.values
    }

    /// Whether both shares come from splits with identical parameters.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.number_of_parts == other.number_of_parts
            && self.threshold == other.threshold
            && self.modulus == other.modulus
            && self.secret_length == other.secret_length
            && self.share_type == other.share_type
            && self.values.len() == other.values.len()
    }

    /// Serialize to the framed share format:
    ///
    /// `N || T || x || type || secret length || frame(M) || count || frame(y_k)...`
    ///
    /// The buffer holds secret material and is zeroed on drop.
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        let mut output = Zeroizing::new(Vec::new());
        output.extend_from_slice(&i2osp(self.number_of_parts, COUNT_BYTES)?);
        output.extend_from_slice(&i2osp(self.threshold, COUNT_BYTES)?);
        output.extend_from_slice(&i2osp(self.x, COUNT_BYTES)?);
        output.push(self.share_type.to_byte());
        output.extend_from_slice(&i2osp(self.secret_length, COUNT_BYTES)?);
        append_framed(&mut output, &self.modulus.to_bytes(), LENGTH_BYTES)?;
        output.extend_from_slice(&i2osp(self.values.len(), COUNT_BYTES)?);
        for value in &self.values {
            let bytes = Zeroizing::new(value.to_bytes());
            append_framed(&mut output, &bytes, LENGTH_BYTES)?;
        }
        Ok(output)
    }

    /// Parse the format written by [`Share::to_bytes`]. Truncated input,
    /// trailing bytes, and inconsistent fields are rejected.
    pub fn from_slice(input: &[u8]) -> Result<Self> {
        let (number_of_parts, rest) = read_usize(input, COUNT_BYTES)?;
        let (threshold, rest) = read_usize(rest, COUNT_BYTES)?;
        let (x, rest) = read_usize(rest, COUNT_BYTES)?;
        let (share_type, rest) = match rest.split_first() {
            Some((byte, rest)) => (ShareType::from_byte(*byte)?, rest),
            None => return Err(InternalError::Serialization),
        };
        let (secret_length, rest) = read_usize(rest, COUNT_BYTES)?;
        let (modulus, rest) = tokenize(rest, LENGTH_BYTES)?;
        let modulus = BigNumber::from_slice(modulus);
        let (count, mut rest) = read_usize(rest, COUNT_BYTES)?;

        if threshold == 0 || threshold > number_of_parts || x == 0 || x > number_of_parts {
            error!("Share parameters are inconsistent");
            return Err(InternalError::Serialization);
        }
        if count == 0 || secret_length == 0 || modulus <= BigNumber::one() {
            error!("Share does not describe any secret");
            return Err(InternalError::Serialization);
        }
        // Recovery interpolates at x = 1..=N, which must stay distinct mod M.
        if BigNumber::from(number_of_parts as u64) >= modulus {
            error!("Share has more parts than its modulus allows");
            return Err(InternalError::Serialization);
        }
        if secret_length > modulus.to_bytes().len() {
            error!("Share secret length exceeds the width of its modulus");
            return Err(InternalError::Serialization);
        }

        let mut values = Vec::new();
        for _ in 0..count {
            let (value, remainder) = tokenize(rest, LENGTH_BYTES)?;
            let value = BigNumber::from_slice(value);
            if value >= modulus {
                error!("Share value is not reduced modulo M");
                return Err(InternalError::Serialization);
            }
            values.push(value);
            rest = remainder;
        }
        if !rest.is_empty() {
            error!("Share has {} trailing bytes", rest.len());
            return Err(InternalError::Serialization);
        }

        Ok(Self {
            number_of_parts,
            threshold,
            modulus,
            secret_length,
            share_type,
            x,
            values,
        })
    }
}
