// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Sharing of multi-key ElGamal private keys.
//!
//! Every sub-key exponent is split on its own, over the group order `q`. The
//! `i`-th share of every sub-key goes to holder `i`, bundled in a
//! [`ShareContainer`].

use super::{recover, split, Recovery, Share, ShareType};
use crate::{
    elgamal::{PrivateKey, PublicKey},
    errors::{InternalError, Result},
    group::Exponent,
    parameters::MAX_SHARES,
    serialization::{append_framed, i2osp, read_usize, tokenize},
    utils::to_fixed_width,
};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use tracing::{error, info, instrument};
use zeroize::Zeroizing;

const COUNT_BYTES: usize = 4;
const LENGTH_BYTES: usize = 4;

/// The shares of one holder, one per sub-key of the shared private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareContainer {
    shares: Vec<Share>,
}

impl ShareContainer {
    /// Bundle shares. They must all come from splits with the same
    /// parameters and the same x-coordinate.
    pub fn new(shares: Vec<Share>) -> Result<Self> {
        let first = match shares.first() {
            Some(first) => first,
            None => return arg_err!("a share container needs at least one share"),
        };
        if shares
            .iter()
            .any(|share| !share.is_compatible(first) || share.x() != first.x())
        {
            error!("Share container mixes shares of different splits or holders");
            return arg_err!("shares in a container must be compatible");
        }
        Ok(Self { shares })
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// Total number of holders. `None` once the container was destroyed.
    pub fn number_of_parts(&self) -> Option<usize> {
        self.shares.first().map(Share::number_of_parts)
    }

    pub fn threshold(&self) -> Option<usize> {
        self.shares.first().map(Share::threshold)
    }

    pub fn modulus(&self) -> Option<&BigNumber> {
        self.shares.first().map(Share::modulus)
    }

    /// Drop every share. The share values are zeroed as they are dropped.
    pub fn destroy(&mut self) {
        self.shares.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.shares.is_empty()
    }

    /// `count || frame(share)...`, each share in the format of
    /// [`Share::to_bytes`].
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        if self.is_destroyed() {
            return arg_err!("share container was destroyed");
        }
        let mut output = Zeroizing::new(i2osp(self.shares.len(), COUNT_BYTES)?);
        for share in &self.shares {
            append_framed(&mut output, &share.to_bytes()?, LENGTH_BYTES)?;
        }
        Ok(output)
    }

    pub fn from_slice(input: &[u8]) -> Result<Self> {
        let (count, mut rest) = read_usize(input, COUNT_BYTES)?;
        let mut shares = Vec::new();
        for _ in 0..count {
            let (share, remainder) = tokenize(rest, LENGTH_BYTES)?;
            shares.push(Share::from_slice(share)?);
            rest = remainder;
        }
        if !rest.is_empty() {
            error!("Share container has {} trailing bytes", rest.len());
            return Err(InternalError::Serialization);
        }
        Self::new(shares).map_err(|_| InternalError::Serialization)
    }
}

/// Split every exponent of `private_key` into `number_of_parts` shares with
/// the given threshold, and return one container per holder.
#[instrument(skip_all, err(Debug))]
pub fn split_private_key<R: RngCore + CryptoRng>(
    private_key: &PrivateKey,
    number_of_parts: usize,
    threshold: usize,
    rng: &mut R,
) -> Result<Vec<ShareContainer>> {
    let q = private_key.group().q();
    if number_of_parts == 0 || number_of_parts > MAX_SHARES {
        error!("Cannot split a private key into {} containers", number_of_parts);
        return arg_err!("number of parts out of range");
    }
    if BigNumber::from(number_of_parts as u64) >= *q {
        error!("Number of parts must be below the group order");
        return arg_err!("number of parts must be below the group order");
    }
    let secret_length = q.to_bytes().len();

    let mut holders: Vec<Vec<Share>> = (0..number_of_parts).map(|_| Vec::new()).collect();
    for exponent in private_key.exponents() {
        let mut secret = vec![to_fixed_width(exponent.value(), secret_length)?.to_vec()];
        let shares = split(
            &mut secret,
            number_of_parts,
            threshold,
            q,
            ShareType::ElectoralBoard,
            rng,
        )?;
        for (holder, share) in holders.iter_mut().zip(shares) {
            holder.push(share);
        }
    }
    info!(
        "Split a private key of {} sub-keys into {} containers",
        private_key.len(),
        number_of_parts
    );
    holders.into_iter().map(ShareContainer::new).collect()
}

/// Recover a private key from the containers of at least a threshold of
/// holders, and check it against `public_key`.
#[instrument(skip_all, err(Debug))]
pub fn recover_private_key(
    containers: &[ShareContainer],
    public_key: &PublicKey,
) -> Result<PrivateKey> {
    let group = public_key.group();
    if containers.is_empty() {
        return arg_err!("insufficient");
    }
    if containers
        .iter()
        .any(|container| container.shares.len() != public_key.len())
    {
        error!("Share containers do not hold one share per public key element");
        return arg_err!("containers do not match the public key");
    }
    if containers
        .iter()
        .flat_map(|container| container.shares.iter())
        .any(|share| share.modulus() != group.q())
    {
        error!("Shares were not made over the group order");
        return arg_err!("shares do not belong to this group");
    }

    let mut exponents = Vec::with_capacity(public_key.len());
    for k in 0..public_key.len() {
        let shares: Vec<Share> = containers
            .iter()
            .map(|container| container.shares[k].clone())
            .collect();
        let secret = match recover(&shares, 1)? {
            Recovery::Recovered(mut secrets) => secrets.pop(),
            Recovery::Insufficient => None,
        };
        let secret = match secret {
            Some(secret) => secret,
            None => return arg_err!("insufficient"),
        };
        let value = BigNumber::from_slice(secret.as_slice());
        if &value >= group.q() {
            error!("Recovered exponent is not reduced modulo q");
            return arg_err!("recovered exponent is out of range");
        }
        exponents.push(Exponent::new(value, group.q())?);
    }

    let private_key = PrivateKey::new(exponents, group)?;
    if !private_key.matches(public_key) {
        error!("Recovered private key does not match the public key");
        return arg_err!("recovered private key does not match the public key");
    }
    Ok(private_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        elgamal::KeyPair,
        utils::testing::{init_testing, small_group, test_group},
    };

    #[test]
    fn private_key_roundtrip() {
        let mut rng = init_testing();
        let keys = KeyPair::generate(&test_group(), 3, &mut rng).unwrap();
        let containers = split_private_key(keys.private_key(), 5, 3, &mut rng).unwrap();
        assert_eq!(containers.len(), 5);
        assert!(containers.iter().all(|c| c.shares().len() == 3));

        let recovered = recover_private_key(&containers[1..4], keys.public_key()).unwrap();
        assert!(recovered.matches(keys.public_key()));
        assert_eq!(recovered.exponents(), keys.private_key().exponents());
    }

    #[test]
    fn too_few_containers_are_insufficient() {
        let mut rng = init_testing();
        let keys = KeyPair::generate(&test_group(), 2, &mut rng).unwrap();
        let containers = split_private_key(keys.private_key(), 4, 3, &mut rng).unwrap();
        assert_eq!(
            recover_private_key(&containers[..2], keys.public_key()).unwrap_err(),
            InternalError::InvalidArgument(String::from("insufficient"))
        );
        assert!(recover_private_key(&[], keys.public_key()).is_err());
    }

    #[test]
    fn holder_counts_are_checked_before_splitting() {
        let mut rng = init_testing();
        let keys = KeyPair::generate(&small_group(), 2, &mut rng).unwrap();
        for parts in [0, 11, 12, usize::MAX] {
            assert!(matches!(
                split_private_key(keys.private_key(), parts, 2, &mut rng),
                Err(InternalError::InvalidArgument(_))
            ));
        }
        assert_eq!(
            split_private_key(keys.private_key(), 10, 2, &mut rng)
                .unwrap()
                .len(),
            10
        );
    }

    #[test]
    fn wrong_public_key_is_rejected() {
        let mut rng = init_testing();
        let group = small_group();
        let keys = KeyPair::generate(&group, 1, &mut rng).unwrap();
        let containers = split_private_key(keys.private_key(), 3, 2, &mut rng).unwrap();
        let g = crate::group::Subgroup::generator(&group);
        let other = keys.public_key().elements()[0].multiply(&g).unwrap();
        let other = PublicKey::new(vec![other]).unwrap();
        assert!(recover_private_key(&containers, &other).is_err());
    }

    #[test]
    fn containers_roundtrip_and_destroy() {
        let mut rng = init_testing();
        let keys = KeyPair::generate(&test_group(), 2, &mut rng).unwrap();
        let mut containers = split_private_key(keys.private_key(), 3, 2, &mut rng).unwrap();
        let bytes = containers[0].to_bytes().unwrap();
        let decoded = ShareContainer::from_slice(&bytes).unwrap();
        assert_eq!(decoded, containers[0]);
        assert_eq!(decoded.threshold(), Some(2));

        let mut truncated = bytes.to_vec();
        truncated.pop();
        assert!(ShareContainer::from_slice(&truncated).is_err());

        containers[0].destroy();
        assert!(containers[0].is_destroyed());
        assert!(containers[0].to_bytes().is_err());
        assert_eq!(containers[0].number_of_parts(), None);
        // The remaining holders still recover.
        assert!(recover_private_key(&containers[1..], keys.public_key()).is_ok());
    }

    #[test]
    fn mixed_holders_cannot_share_a_container() {
        let mut rng = init_testing();
        let keys = KeyPair::generate(&test_group(), 1, &mut rng).unwrap();
        let containers = split_private_key(keys.private_key(), 3, 2, &mut rng).unwrap();
        let mixed = vec![
            containers[0].shares()[0].clone(),
            containers[1].shares()[0].clone(),
        ];
        assert!(ShareContainer::new(mixed).is_err());
    }
}
