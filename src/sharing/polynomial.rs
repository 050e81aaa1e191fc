// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{InternalError, Result},
    utils::random_positive_bn,
};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use tracing::error;
use zeroize::ZeroizeOnDrop;

/// A polynomial over `Z_M` whose free term is a secret.
#[derive(ZeroizeOnDrop)]
pub(super) struct Polynomial {
    coefficients: Vec<BigNumber>,
    #[zeroize(skip)]
    modulus: BigNumber,
}

impl Polynomial {
    /// Degree `degree` polynomial with free term `secret` and the other
    /// coefficients uniform in `[0, modulus)`.
    pub(super) fn random<R: RngCore + CryptoRng>(
        secret: BigNumber,
        degree: usize,
        modulus: &BigNumber,
        rng: &mut R,
    ) -> Self {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(secret);
        for _ in 0..degree {
            coefficients.push(random_positive_bn(rng, modulus));
        }
        Self {
            coefficients,
            modulus: modulus.clone(),
        }
    }

    /// Horner evaluation at `x`.
    pub(super) fn evaluate(&self, x: &BigNumber) -> BigNumber {
        self.coefficients
            .iter()
            .rev()
            .fold(BigNumber::zero(), |acc, coefficient| {
                acc.modmul(x, &self.modulus)
                    .modadd(coefficient, &self.modulus)
            })
    }
}

/// Interpolate the polynomial through `points` and evaluate it at zero.
///
/// The x-coordinates must be distinct and non-zero modulo `modulus`.
pub(super) fn interpolate_at_zero(
    points: &[(BigNumber, &BigNumber)],
    modulus: &BigNumber,
) -> Result<BigNumber> {
    let mut secret = BigNumber::zero();
    for (i, (x_i, y_i)) in points.iter().enumerate() {
        let mut numerator = BigNumber::one();
        let mut denominator = BigNumber::one();
        for (j, (x_j, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            // l_i(0) = prod (0 - x_j) / (x_i - x_j)
            numerator = numerator.modmul(&BigNumber::zero().modsub(x_j, modulus), modulus);
            denominator = denominator.modmul(&x_i.modsub(x_j, modulus), modulus);
        }
        let inverse = denominator.invert(modulus).ok_or_else(|| {
            error!("Lagrange denominator is not invertible");
            InternalError::InternalInvariantFailed
        })?;
        let coefficient = numerator.modmul(&inverse, modulus);
        secret = secret.modadd(&coefficient.modmul(y_i, modulus), modulus);
    }
    Ok(secret)
}
