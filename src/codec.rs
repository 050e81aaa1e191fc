// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Compact Base64 encoding of ElGamal ciphertexts.
//!
//! The binary layout, before Base64, is
//!
//! ```text
//! [table size] ([length] [two's-complement bytes])*  [payload]
//! ```
//!
//! where every count, length and index is a big-endian `i32`. Each integer
//! appearing in the payload (`p`, `q` and the value of every element) is
//! stored once in the table, in first-use order, and referenced by index.
//! The payload is one of
//!
//! * a list: `[count] ciphertext*`,
//! * a map: `[count] (key ciphertext, value ciphertext)*`, in key order,
//! * a single ciphertext,
//!
//! and a ciphertext is `[element count] ([p index] [q index] [value index])*`
//! with `gamma` first.

use crate::{
    elgamal::Ciphertext,
    errors::{InternalError, Result},
    group::{GroupElement, Subgroup},
    utils::{from_twos_complement, to_twos_complement},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use libpaillier::unknown_order::BigNumber;
use std::{collections::BTreeMap, collections::HashMap, sync::Arc};
use tracing::{error, instrument};

const INT_BYTES: usize = 4;

fn decode_err<T>(reason: &str) -> Result<T> {
    error!("Could not decode ciphertexts: {}", reason);
    Err(InternalError::DecodeFailed(String::from(reason)))
}

fn to_i32(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        InternalError::InvalidArgument(String::from("count does not fit the encoding"))
    })
}

/// Encodes and decodes ciphertexts of one subgroup.
///
/// The wire format only carries `p` and `q`; decoded elements are attached
/// to the codec's subgroup and must carry exactly its `p` and `q`.
#[derive(Clone, Debug)]
pub struct CiphertextCodec {
    group: Arc<Subgroup>,
}

impl CiphertextCodec {
    pub fn new(group: &Arc<Subgroup>) -> Self {
        Self {
            group: Arc::clone(group),
        }
    }

    pub fn group(&self) -> &Arc<Subgroup> {
        &self.group
    }

    #[instrument(skip_all, err(Debug))]
    pub fn encode_list(&self, ciphertexts: &[Ciphertext]) -> Result<String> {
        let mut encoder = Encoder::default();
        encoder.write_count(ciphertexts.len())?;
        for ciphertext in ciphertexts {
            encoder.write_ciphertext(ciphertext)?;
        }
        encoder.finish()
    }

    #[instrument(skip_all, err(Debug))]
    pub fn encode_map(&self, ciphertexts: &BTreeMap<Ciphertext, Ciphertext>) -> Result<String> {
        let mut encoder = Encoder::default();
        encoder.write_count(ciphertexts.len())?;
        for (key, value) in ciphertexts {
            encoder.write_ciphertext(key)?;
            encoder.write_ciphertext(value)?;
        }
        encoder.finish()
    }

    #[instrument(skip_all, err(Debug))]
    pub fn encode_single(&self, ciphertext: &Ciphertext) -> Result<String> {
        let mut encoder = Encoder::default();
        encoder.write_ciphertext(ciphertext)?;
        encoder.finish()
    }

    #[instrument(skip_all, err(Debug))]
    pub fn decode_list(&self, encoding: &str) -> Result<Vec<Ciphertext>> {
        let bytes = decode_base64(encoding)?;
        let mut decoder = Decoder::new(&bytes, &self.group)?;
        let count = decoder.read_count()?;
        let mut ciphertexts = Vec::new();
        for _ in 0..count {
            ciphertexts.push(decoder.read_ciphertext()?);
        }
        decoder.finish()?;
        Ok(ciphertexts)
    }

    /// Decode a map. A key appearing twice keeps its last value.
    #[instrument(skip_all, err(Debug))]
    pub fn decode_map(&self, encoding: &str) -> Result<BTreeMap<Ciphertext, Ciphertext>> {
        let bytes = decode_base64(encoding)?;
        let mut decoder = Decoder::new(&bytes, &self.group)?;
        let count = decoder.read_count()?;
        let mut ciphertexts = BTreeMap::new();
        for _ in 0..count {
            let key = decoder.read_ciphertext()?;
            let value = decoder.read_ciphertext()?;
            let _ = ciphertexts.insert(key, value);
        }
        decoder.finish()?;
        Ok(ciphertexts)
    }

    #[instrument(skip_all, err(Debug))]
    pub fn decode_single(&self, encoding: &str) -> Result<Ciphertext> {
        let bytes = decode_base64(encoding)?;
        let mut decoder = Decoder::new(&bytes, &self.group)?;
        let ciphertext = decoder.read_ciphertext()?;
        decoder.finish()?;
        Ok(ciphertext)
    }
}

fn decode_base64(encoding: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoding)
        .or_else(|_| decode_err("invalid Base64"))
}

/// Builds the integer table and the payload side by side; the table is
/// written first once the payload is complete.
#[derive(Default)]
struct Encoder {
    indices: HashMap<Vec<u8>, i32>,
    table: Vec<Vec<u8>>,
    payload: Vec<u8>,
}

impl Encoder {
    fn write_count(&mut self, count: usize) -> Result<()> {
        self.payload.extend_from_slice(&to_i32(count)?.to_be_bytes());
        Ok(())
    }

    fn write_integer(&mut self, value: &BigNumber) -> Result<()> {
        let bytes = to_twos_complement(value);
        let index = match self.indices.get(&bytes) {
            Some(index) => *index,
            None => {
                let index = to_i32(self.table.len())?;
                self.table.push(bytes.clone());
                let _ = self.indices.insert(bytes, index);
                index
            }
        };
        self.payload.extend_from_slice(&index.to_be_bytes());
        Ok(())
    }

    fn write_ciphertext(&mut self, ciphertext: &Ciphertext) -> Result<()> {
        self.write_count(ciphertext.phis().len() + 1)?;
        for element in ciphertext.elements() {
            self.write_integer(element.group().p())?;
            self.write_integer(element.group().q())?;
            self.write_integer(element.value())?;
        }
        Ok(())
    }

    fn finish(self) -> Result<String> {
        let mut output = Vec::with_capacity(self.payload.len());
        output.extend_from_slice(&to_i32(self.table.len())?.to_be_bytes());
        for integer in &self.table {
            output.extend_from_slice(&to_i32(integer.len())?.to_be_bytes());
            output.extend_from_slice(integer);
        }
        output.extend_from_slice(&self.payload);
        Ok(STANDARD.encode(output))
    }
}

struct Decoder<'a> {
    input: &'a [u8],
    table: Vec<BigNumber>,
    group: &'a Arc<Subgroup>,
}

impl<'a> Decoder<'a> {
    /// Read the integer table at the start of `input`.
    fn new(input: &'a [u8], group: &'a Arc<Subgroup>) -> Result<Self> {
        let mut decoder = Self {
            input,
            table: Vec::new(),
            group,
        };
        let size = decoder.read_count()?;
        for _ in 0..size {
            let length = decoder.read_count()?;
            let bytes = decoder.take(length)?;
            decoder.table.push(from_twos_complement(bytes)?);
        }
        Ok(decoder)
    }

    fn take(&mut self, length: usize) -> Result<&'a [u8]> {
        if self.input.len() < length {
            return decode_err("not enough data to decode");
        }
        let (head, tail) = self.input.split_at(length);
        self.input = tail;
        Ok(head)
    }

    fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.take(INT_BYTES)?;
        let mut buffer = [0u8; INT_BYTES];
        buffer.copy_from_slice(bytes);
        Ok(i32::from_be_bytes(buffer))
    }

    fn read_count(&mut self) -> Result<usize> {
        let value = self.read_i32()?;
        usize::try_from(value).or_else(|_| decode_err("negative count"))
    }

    fn read_integer(&mut self) -> Result<&BigNumber> {
        let index = self.read_i32()?;
        match usize::try_from(index).ok().and_then(|i| self.table.get(i)) {
            Some(integer) => Ok(integer),
            None => decode_err("integer index out of range"),
        }
    }

    fn read_element(&mut self) -> Result<GroupElement> {
        let p = self.read_integer()?.clone();
        let q = self.read_integer()?.clone();
        let value = self.read_integer()?.clone();
        if &p != self.group.p() || &q != self.group.q() {
            error!("Decoded element does not belong to the codec's subgroup");
            return Err(InternalError::GroupMismatch);
        }
        GroupElement::new(value, self.group)
    }

    fn read_ciphertext(&mut self) -> Result<Ciphertext> {
        let count = self.read_count()?;
        if count < 2 {
            return decode_err("a ciphertext needs gamma and at least one phi");
        }
        let mut elements = Vec::new();
        for _ in 0..count {
            elements.push(self.read_element()?);
        }
        Ciphertext::from_elements(elements)
    }

    fn finish(self) -> Result<()> {
        if !self.input.is_empty() {
            return decode_err("trailing bytes after the payload");
        }
        Ok(())
    }
}
