// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Length-prefixed framing for the share formats.
//!
//! A frame is `I2OSP(len(field), width) || field`. Tokenizing borrows from the
//! input instead of copying it, since the fields are usually secret share
//! values.

use crate::errors::*;

// Corresponds to the I2OSP() function from RFC8017
pub(crate) fn i2osp(input: usize, length: usize) -> Result<Vec<u8>> {
    let sizeof_usize = core::mem::size_of::<usize>();

    // Check if input >= 256^length
    if (sizeof_usize as u32 - input.leading_zeros() / 8) > length as u32 {
        return Err(InternalError::Serialization);
    }

    if length <= sizeof_usize {
        return Ok(input.to_be_bytes()[sizeof_usize - length..].to_vec());
    }

    let mut output = vec![0u8; length];
    output[length - sizeof_usize..].copy_from_slice(&input.to_be_bytes());
    Ok(output)
}

// Corresponds to the OS2IP() function from RFC8017
pub(crate) fn os2ip(input: &[u8]) -> Result<usize> {
    let sizeof_usize = core::mem::size_of::<usize>();
    // Leading zero bytes beyond the width of usize are harmless.
    let overflow = input.len().saturating_sub(sizeof_usize);
    if input[..overflow].iter().any(|byte| *byte != 0) {
        return Err(InternalError::Serialization);
    }
    let input = &input[overflow..];

    let mut output_array = [0u8; core::mem::size_of::<usize>()];
    output_array[sizeof_usize - input.len()..].copy_from_slice(input);
    Ok(usize::from_be_bytes(output_array))
}

// Appends I2OSP(len(input), max_bytes) || input to the output buffer
pub(crate) fn append_framed(output: &mut Vec<u8>, input: &[u8], max_bytes: usize) -> Result<()> {
    output.extend_from_slice(&i2osp(input.len(), max_bytes)?);
    output.extend_from_slice(input);
    Ok(())
}

// Tokenizes an input of the format I2OSP(len(input), size_bytes) || input, outputting
// (input, remainder)
pub(crate) fn tokenize(input: &[u8], size_bytes: usize) -> Result<(&[u8], &[u8])> {
    if input.len() < size_bytes {
        return Err(InternalError::Serialization);
    }

    let size = os2ip(&input[..size_bytes])?;
    let rest = &input[size_bytes..];
    if size > rest.len() {
        return Err(InternalError::Serialization);
    }

    Ok(rest.split_at(size))
}

// Reads a fixed-width big-endian integer, outputting (value, remainder)
pub(crate) fn read_usize(input: &[u8], size_bytes: usize) -> Result<(usize, &[u8])> {
    if input.len() < size_bytes {
        return Err(InternalError::Serialization);
    }
    let (head, rest) = input.split_at(size_bytes);
    Ok((os2ip(head)?, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i2osp_rejects_values_wider_than_the_frame() {
        assert_eq!(i2osp(0x0102, 2).unwrap(), vec![1, 2]);
        assert_eq!(i2osp(0x0102, 4).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(i2osp(7, 12).unwrap().len(), 12);
        assert!(i2osp(256, 1).is_err());
    }

    #[test]
    fn tokenize_splits_frames_in_order() {
        let mut buffer = Vec::new();
        append_framed(&mut buffer, b"first", 2).unwrap();
        append_framed(&mut buffer, b"", 2).unwrap();
        append_framed(&mut buffer, b"third", 4).unwrap();

        let (first, rest) = tokenize(&buffer, 2).unwrap();
        let (second, rest) = tokenize(rest, 2).unwrap();
        let (third, rest) = tokenize(rest, 4).unwrap();
        assert_eq!(first, b"first");
        assert!(second.is_empty());
        assert_eq!(third, b"third");
        assert!(rest.is_empty());
    }

    #[test]
    fn tokenize_rejects_truncated_input() {
        let mut buffer = Vec::new();
        append_framed(&mut buffer, b"payload", 2).unwrap();
        assert!(tokenize(&buffer[..buffer.len() - 1], 2).is_err());
        assert!(tokenize(&buffer[..1], 2).is_err());
        assert!(read_usize(&[0, 1], 4).is_err());
    }

    #[test]
    fn os2ip_accepts_wide_zero_prefixed_input() {
        let mut wide = vec![0u8; 12];
        wide[11] = 9;
        assert_eq!(os2ip(&wide).unwrap(), 9);
        wide[0] = 1;
        assert!(os2ip(&wide).is_err());
    }
}
