// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Shamir secret sharing of byte-string secrets over a prime field.
//!
//! [`split`] shares one or more secrets of equal length among `N` holders so
//! that any `T` of them can [`recover`] the secrets and fewer learn nothing.
//! Each secret gets its own random polynomial; all polynomials are evaluated
//! at the same points `x = 1..=N`, so share `j` carries one value per secret.
//!
//! The [`container`] module builds on this to share the exponents of an
//! ElGamal private key.

pub mod container;
mod polynomial;
mod share;

pub use container::{recover_private_key, split_private_key, ShareContainer};
pub use share::{Share, ShareType};

use crate::{
    errors::{InternalError, Result},
    parameters::MAX_SHARES,
    utils::to_fixed_width,
};
use libpaillier::unknown_order::BigNumber;
use polynomial::{interpolate_at_zero, Polynomial};
use rand::{CryptoRng, RngCore};
use std::{collections::BTreeMap, fmt::Debug};
use tracing::{debug, error, instrument};
use zeroize::{Zeroize, Zeroizing};

/// Outcome of [`recover`].
pub enum Recovery {
    /// The recovered secrets, in the order they were split.
    Recovered(Vec<Zeroizing<Vec<u8>>>),
    /// Fewer than the threshold of distinct shares were supplied.
    Insufficient,
}

impl Debug for Recovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recovery::Recovered(_) => f.write_str("Recovered([redacted])"),
            Recovery::Insufficient => f.write_str("Insufficient"),
        }
    }
}

/// Split `secrets` into `number_of_parts` shares, any `threshold` of which
/// recover them.
///
/// A threshold above the number of parts is lowered to the number of parts.
/// The secret buffers are zeroed before this returns, whether or not the
/// split succeeded.
#[instrument(skip_all, err(Debug))]
pub fn split<R: RngCore + CryptoRng>(
    secrets: &mut [Vec<u8>],
    number_of_parts: usize,
    threshold: usize,
    modulus: &BigNumber,
    share_type: ShareType,
    rng: &mut R,
) -> Result<Vec<Share>> {
    let result = split_secrets(
        secrets,
        number_of_parts,
        threshold,
        modulus,
        share_type,
        rng,
    );
    secrets
        .iter_mut()
        .for_each(|secret| secret.as_mut_slice().zeroize());
    result
}

fn split_secrets<R: RngCore + CryptoRng>(
    secrets: &[Vec<u8>],
    number_of_parts: usize,
    threshold: usize,
    modulus: &BigNumber,
    share_type: ShareType,
    rng: &mut R,
) -> Result<Vec<Share>> {
    if number_of_parts == 0 || number_of_parts > MAX_SHARES {
        return arg_err!("number of parts must be between 1 and 2^32 - 1");
    }
    if threshold == 0 {
        return arg_err!("threshold must be at least 1");
    }
    let threshold = if threshold > number_of_parts {
        debug!(
            "Lowering threshold {} to the number of parts {}",
            threshold, number_of_parts
        );
        number_of_parts
    } else {
        threshold
    };

    let secret_length = match secrets.first() {
        Some(first) if !first.is_empty() => first.len(),
        Some(_) => return arg_err!("secrets must not be empty"),
        None => return arg_err!("at least one secret is required"),
    };
    if secrets.iter().any(|secret| secret.len() != secret_length) {
        error!("Secrets to split have different lengths");
        return arg_err!("all secrets must have the same length");
    }
    if modulus <= &BigNumber::one() || !modulus.is_prime() {
        error!("Sharing modulus is not prime");
        return arg_err!("modulus must be prime");
    }
    // The x-coordinates 1..=N must be distinct and non-zero modulo M.
    if BigNumber::from(number_of_parts as u64) >= *modulus {
        error!("Sharing modulus is too small for {} parts", number_of_parts);
        return arg_err!("number of parts must be smaller than the modulus");
    }
    if secret_length > modulus.to_bytes().len() {
        error!("Secrets of {} bytes are longer than the sharing modulus", secret_length);
        return arg_err!("secrets must not be longer than the modulus");
    }

    let mut polynomials = Vec::with_capacity(secrets.len());
    for secret in secrets {
        let value = BigNumber::from_slice(secret);
        if &value >= modulus {
            error!("Secret does not fit below the sharing modulus");
            return arg_err!("secret must be smaller than the modulus");
        }
        polynomials.push(Polynomial::random(value, threshold - 1, modulus, rng));
    }

    let shares = (1..=number_of_parts)
        .map(|x| {
            let point = BigNumber::from(x as u64);
            let values = polynomials.iter().map(|f| f.evaluate(&point)).collect();
            Share::new(
                number_of_parts,
                threshold,
                modulus,
                secret_length,
                share_type,
                x,
                values,
            )
        })
        .collect();
    Ok(shares)
}

/// Recover the secrets from `shares`.
///
/// Returns [`Recovery::Insufficient`] when fewer than the threshold of
/// distinct shares are supplied. Shares from different splits, two different
/// shares with the same x-coordinate, or an `expected_secrets` that does not
/// match the shares are an [`InternalError::InvalidArgument`].
#[instrument(skip_all, err(Debug))]
pub fn recover(shares: &[Share], expected_secrets: usize) -> Result<Recovery> {
    let first = match shares.first() {
        Some(first) => first,
        None => return Ok(Recovery::Insufficient),
    };
    if shares.iter().any(|share| !share.is_compatible(first)) {
        error!("Shares come from splits with different parameters");
        return arg_err!("shares are not compatible");
    }
    if first.number_of_secrets() != expected_secrets {
        error!(
            "Expected {} secrets but the shares carry {}",
            expected_secrets,
            first.number_of_secrets()
        );
        return arg_err!("unexpected number of secrets");
    }

    let mut distinct: BTreeMap<usize, &Share> = BTreeMap::new();
    for share in shares {
        match distinct.get(&share.x()) {
            Some(existing) if existing.values() != share.values() => {
                error!("Two different shares have x-coordinate {}", share.x());
                return arg_err!("conflicting shares for the same x-coordinate");
            }
            Some(_) => {}
            None => {
                distinct.insert(share.x(), share);
            }
        }
    }

    let threshold = first.threshold();
    if distinct.len() < threshold {
        debug!(
            "Got {} distinct shares, {} are required",
            distinct.len(),
            threshold
        );
        return Ok(Recovery::Insufficient);
    }

    // The threshold lowest x-coordinates, so the result does not depend on
    // the order the shares were supplied in.
    let selected: Vec<&Share> = distinct.into_values().take(threshold).collect();
    let modulus = first.modulus();
    let mut secrets = Vec::with_capacity(expected_secrets);
    for k in 0..expected_secrets {
        let value = if threshold == 1 {
            selected[0].values()[k].clone()
        } else {
            let points: Vec<(BigNumber, &BigNumber)> = selected
                .iter()
                .map(|share| (BigNumber::from(share.x() as u64), &share.values()[k]))
                .collect();
            interpolate_at_zero(&points, modulus)?
        };
        let secret = to_fixed_width(&value, first.secret_length()).map_err(|_| {
            error!("Recovered value does not fit the declared secret length");
            InternalError::InvalidArgument(String::from(
                "shares do not interpolate to a secret of the declared length",
            ))
        })?;
        secrets.push(secret);
    }
    Ok(Recovery::Recovered(secrets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    /// `2^256 + 297`, the smallest prime above `2^256`.
    const MODULUS_HEX: &str = "010000000000000000000000000000000000000000000000000000000000000129";

    fn modulus() -> BigNumber {
        BigNumber::from_slice(hex::decode(MODULUS_HEX).unwrap())
    }

    fn random_secrets<R: Rng>(count: usize, length: usize, rng: &mut R) -> Vec<Vec<u8>> {
        (0..count)
            .map(|_| (0..length).map(|_| rng.gen()).collect())
            .collect()
    }

    fn recovered(recovery: Recovery) -> Vec<Vec<u8>> {
        match recovery {
            Recovery::Recovered(secrets) => secrets.iter().map(|s| s.to_vec()).collect(),
            Recovery::Insufficient => panic!("expected a recovery"),
        }
    }

    #[test]
    fn split_then_recover_with_every_threshold() {
        let mut rng = init_testing();
        let modulus = modulus();
        for n in [1, 2, 5, 8] {
            for t in 1..=n {
                let secrets = random_secrets(2, 32, &mut rng);
                let mut input = secrets.clone();
                let shares = split(
                    &mut input,
                    n,
                    t,
                    &modulus,
                    ShareType::AdministrationBoard,
                    &mut rng,
                )
                .unwrap();
                assert_eq!(shares.len(), n);
                assert!(input.iter().all(|s| s.iter().all(|byte| *byte == 0)));

                let mut subset = shares.clone();
                subset.shuffle(&mut rng);
                subset.truncate(t);
                assert_eq!(recovered(recover(&subset, 2).unwrap()), secrets);
            }
        }
    }

    #[test]
    fn fewer_than_threshold_is_insufficient() {
        let mut rng = init_testing();
        let mut secrets = random_secrets(1, 32, &mut rng);
        let shares = split(
            &mut secrets,
            5,
            3,
            &modulus(),
            ShareType::ElectoralBoard,
            &mut rng,
        )
        .unwrap();
        assert!(matches!(recover(&shares[..2], 1).unwrap(), Recovery::Insufficient));
        assert!(matches!(recover(&[], 1).unwrap(), Recovery::Insufficient));
        // Duplicates do not count twice.
        let duplicated = vec![shares[0].clone(), shares[0].clone(), shares[1].clone()];
        assert!(matches!(recover(&duplicated, 1).unwrap(), Recovery::Insufficient));
    }

    #[test]
    fn threshold_above_parts_is_clamped() {
        let mut rng = init_testing();
        let secrets = random_secrets(1, 16, &mut rng);
        let shares = split(
            &mut secrets.clone(),
            3,
            7,
            &modulus(),
            ShareType::AdministrationBoard,
            &mut rng,
        )
        .unwrap();
        assert!(shares.iter().all(|share| share.threshold() == 3));
        assert_eq!(recovered(recover(&shares, 1).unwrap()), secrets);
    }

    #[test]
    fn leading_zero_bytes_survive() {
        let mut rng = init_testing();
        let mut secret = vec![0u8; 32];
        secret[31] = 1;
        let shares = split(
            &mut [secret.clone()],
            4,
            2,
            &modulus(),
            ShareType::AdministrationBoard,
            &mut rng,
        )
        .unwrap();
        assert_eq!(recovered(recover(&shares[2..], 1).unwrap()), vec![secret]);
    }

    #[test]
    fn invalid_split_arguments_are_rejected_and_secrets_zeroed() {
        let mut rng = init_testing();
        let modulus = modulus();
        let cases: Vec<(Vec<Vec<u8>>, usize, usize)> = vec![
            (vec![vec![1; 8]], 0, 1),
            (vec![vec![1; 8]], 3, 0),
            (vec![], 3, 2),
            (vec![vec![]], 3, 2),
            (vec![vec![1; 8], vec![1; 9]], 3, 2),
        ];
        for (mut secrets, n, t) in cases {
            let result = split(
                &mut secrets,
                n,
                t,
                &modulus,
                ShareType::AdministrationBoard,
                &mut rng,
            );
            assert!(matches!(result, Err(InternalError::InvalidArgument(_))));
            assert!(secrets.iter().all(|s| s.iter().all(|byte| *byte == 0)));
        }

        // Not prime.
        let mut secrets = vec![vec![1u8; 4]];
        assert!(split(
            &mut secrets,
            3,
            2,
            &BigNumber::from(7917u64),
            ShareType::AdministrationBoard,
            &mut rng
        )
        .is_err());
        assert_eq!(secrets, vec![vec![0u8; 4]]);

        // Secret not below the modulus.
        let mut secrets = vec![vec![0xff; 33]];
        assert!(split(
            &mut secrets,
            3,
            2,
            &modulus,
            ShareType::AdministrationBoard,
            &mut rng
        )
        .is_err());
        assert_eq!(secrets, vec![vec![0u8; 33]]);

        // Small enough in value, but wider than the modulus.
        let mut secrets = vec![vec![0u8; 34]];
        assert!(matches!(
            split(
                &mut secrets,
                3,
                2,
                &modulus,
                ShareType::AdministrationBoard,
                &mut rng
            ),
            Err(InternalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn incompatible_shares_are_rejected() {
        let mut rng = init_testing();
        let modulus = modulus();
        let first = split(
            &mut random_secrets(1, 32, &mut rng),
            4,
            2,
            &modulus,
            ShareType::AdministrationBoard,
            &mut rng,
        )
        .unwrap();
        let second = split(
            &mut random_secrets(1, 32, &mut rng),
            4,
            2,
            &modulus,
            ShareType::ElectoralBoard,
            &mut rng,
        )
        .unwrap();
        let third = split(
            &mut random_secrets(1, 32, &mut rng),
            4,
            2,
            &modulus,
            ShareType::AdministrationBoard,
            &mut rng,
        )
        .unwrap();

        let mixed_type = vec![first[0].clone(), second[1].clone()];
        assert!(matches!(
            recover(&mixed_type, 1),
            Err(InternalError::InvalidArgument(_))
        ));
        // Same parameters, same x, different polynomials.
        let conflicting = vec![first[0].clone(), third[0].clone()];
        assert!(matches!(
            recover(&conflicting, 1),
            Err(InternalError::InvalidArgument(_))
        ));
        assert!(matches!(
            recover(&first, 2),
            Err(InternalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn recovery_ignores_supply_order() {
        let mut rng = init_testing();
        let secrets = random_secrets(3, 32, &mut rng);
        let shares = split(
            &mut secrets.clone(),
            6,
            3,
            &modulus(),
            ShareType::ElectoralBoard,
            &mut rng,
        )
        .unwrap();
        let mut reversed = shares.clone();
        reversed.reverse();
        assert_eq!(recovered(recover(&reversed, 3).unwrap()), secrets);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_threshold_subset_recovers(
            seed in any::<[u8; 32]>(),
            n in 1usize..=50,
            t_fraction in 0.0f64..1.0,
            length in 1usize..=32,
        ) {
            let mut rng = StdRng::from_seed(seed);
            let t = 1 + ((n as f64 - 1.0) * t_fraction) as usize;
            let secrets = random_secrets(2, length, &mut rng);
            let shares = split(
                &mut secrets.clone(),
                n,
                t,
                &modulus(),
                ShareType::AdministrationBoard,
                &mut rng,
            )
            .unwrap();
            let mut subset = shares.clone();
            subset.shuffle(&mut rng);
            subset.truncate(t);
            prop_assert_eq!(recovered(recover(&subset, 2).unwrap()), secrets);
            if t > 1 {
                subset.truncate(t - 1);
                prop_assert!(matches!(recover(&subset, 2).unwrap(), Recovery::Insufficient));
            }
        }
    }
}
