// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{InternalError, Result},
    parameters::CHALLENGE_BYTES,
};
use libpaillier::unknown_order::BigNumber;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use tracing::error;
use zeroize::Zeroizing;

/// Compute a^e (mod n).
#[cfg_attr(feature = "flame_it", flame("utils"))]
pub(crate) fn modpow(a: &BigNumber, e: &BigNumber, n: &BigNumber) -> BigNumber {
    a.modpow(e, n)
}

/// Sample a number uniformly at random from the range [0, n). This can be used
/// for sampling from a prime field `F_p` or the integers modulo `n` (for any
/// `n`).
pub(crate) fn random_positive_bn<R: RngCore + CryptoRng>(rng: &mut R, n: &BigNumber) -> BigNumber {
    BigNumber::from_rng(n, rng)
}

/// Derive the Fiat-Shamir challenge from the [`Transcript`].
///
/// The output is the full-width unsigned integer; callers reduce it modulo
/// the group order where it is used as an exponent.
pub(crate) fn challenge_from_transcript(transcript: &mut Transcript) -> BigNumber {
    let mut bytes = [0u8; CHALLENGE_BYTES];
    transcript.challenge_bytes(b"challenge", bytes.as_mut_slice());
    BigNumber::from_slice(bytes)
}

/// Encode a non-negative number as exactly `length` big-endian bytes.
///
/// The returned buffer is zeroed on drop since this is used to hand recovered
/// secrets back to the caller.
pub(crate) fn to_fixed_width(value: &BigNumber, length: usize) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = Zeroizing::new(value.to_bytes());
    let significant = bytes
        .iter()
        .position(|byte| *byte != 0)
        .map(|start| &bytes[start..])
        .unwrap_or(&[]);
    if significant.len() > length {
        error!(
            "Value needs {} bytes but only {} are available",
            significant.len(),
            length
        );
        return Err(InternalError::InternalInvariantFailed);
    }
    let mut output = Zeroizing::new(vec![0u8; length]);
    output[length - significant.len()..].copy_from_slice(significant);
    Ok(output)
}

/// Minimal big-endian two's-complement encoding of a non-negative number: the
/// magnitude, with a leading zero byte when its top bit is set. Zero encodes
/// as a single zero byte.
pub(crate) fn to_twos_complement(value: &BigNumber) -> Vec<u8> {
    let magnitude = value.to_bytes();
    let significant = magnitude
        .iter()
        .position(|byte| *byte != 0)
        .map(|start| &magnitude[start..])
        .unwrap_or(&[]);
    match significant.first() {
        None => vec![0u8],
        Some(first) if first & 0x80 != 0 => [&[0u8][..], significant].concat(),
        Some(_) => significant.to_vec(),
    }
}

/// Inverse of [`to_twos_complement`]. Negative encodings are rejected since
/// no value handled by this crate is negative.
pub(crate) fn from_twos_complement(bytes: &[u8]) -> Result<BigNumber> {
    match bytes.first() {
        None => Err(InternalError::DecodeFailed(String::from(
            "empty integer encoding",
        ))),
        Some(first) if first & 0x80 != 0 => Err(InternalError::DecodeFailed(String::from(
            "negative integer encoding",
        ))),
        Some(_) => Ok(BigNumber::from_slice(bytes)),
    }
}


////////////////////////////
// Test Utility Functions //
////////////////////////////
