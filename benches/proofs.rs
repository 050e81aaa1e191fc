// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use board_keyguard::{
    zkp::{
        exponentiation::{ExponentiationInput, ExponentiationProof},
        Proof, Witness,
    },
    KeyPair, ShareType, Subgroup,
};
use criterion::{criterion_group, criterion_main, Criterion};
use libpaillier::unknown_order::BigNumber;
use rand::rngs::OsRng;
use std::sync::Arc;

/// A 257-bit safe prime `p = 2q + 1`.
const P: &str = "01741633159e5016908712692e8ffd98cd0e4d72ac91759bbed353546986c75dc7";
const Q: &str = "ba0b198acf280b484389349747fecc668726b95648bacddf69a9aa34c363aee3";

fn group() -> Arc<Subgroup> {
    let p = BigNumber::from_slice(hex::decode(P).unwrap());
    let q = BigNumber::from_slice(hex::decode(Q).unwrap());
    Arc::new(Subgroup::new(p, q, BigNumber::from(4u64)).unwrap())
}

fn exponentiation(c: &mut Criterion) {
    let group = group();
    let keys = KeyPair::generate(&group, 5, &mut OsRng).unwrap();
    let bases = keys.public_key().elements().to_vec();
    let w = group.random_exponent(&mut OsRng);
    let exponentiated: Vec<_> = bases.iter().map(|b| b.exponentiate(&w).unwrap()).collect();
    let input = ExponentiationInput::new(&bases, &exponentiated).unwrap();
    let witness = Witness::new(w);

    c.bench_function("exponentiation proof (5 bases)", |b| {
        b.iter(|| {
            ExponentiationProof::prove(
                &input,
                &witness,
                ExponentiationProof::DEFAULT_AUXILIARY_DATA,
                &mut OsRng,
            )
            .unwrap()
        })
    });

    let proof = ExponentiationProof::prove(
        &input,
        &witness,
        ExponentiationProof::DEFAULT_AUXILIARY_DATA,
        &mut OsRng,
    )
    .unwrap();
    c.bench_function("exponentiation verify (5 bases)", |b| {
        b.iter(|| {
            assert!(proof
                .verify(&input, ExponentiationProof::DEFAULT_AUXILIARY_DATA)
                .unwrap())
        })
    });
}

fn sharing(c: &mut Criterion) {
    let modulus = group().q().clone();
    c.bench_function("split and recover (N = 10, T = 6)", |b| {
        b.iter(|| {
            let mut secrets = vec![vec![0x11u8; 31]];
            let shares = board_keyguard::split(
                &mut secrets,
                10,
                6,
                &modulus,
                ShareType::ElectoralBoard,
                &mut OsRng,
            )
            .unwrap();
            board_keyguard::recover(&shares[..6], 1).unwrap()
        })
    });
}

criterion_group!(proof_benches, exponentiation, sharing);
criterion_main!(proof_benches);
