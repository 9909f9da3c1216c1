//! Utility functions for cipher modes

use crate::error::{CipherModeError, Result};

/// Add PKCS#7 padding to data
///
/// Always appends between 1 and `block_size` bytes, each holding the pad
/// length. Block-aligned input gets a full extra block.
pub fn add_padding(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad, pad as u8);
    padded
}

/// Remove PKCS#7 padding from data
///
/// Only the final byte is inspected. A value of 0, a value above
/// `block_size`, or one longer than the data itself is rejected; nothing is
/// returned in that case.
pub fn remove_padding(mut data: Vec<u8>, block_size: usize) -> Result<Vec<u8>> {
    let pad = match data.last() {
        Some(&last) => last as usize,
        None => return Err(CipherModeError::InvalidPadding),
    };
    if pad == 0 || pad > block_size || pad > data.len() {
        return Err(CipherModeError::InvalidPadding);
    }
    data.truncate(data.len() - pad);
    Ok(data)
}

/// XOR `src` into `dst` byte by byte
///
/// Both slices must have the same length.
pub fn xor_blocks(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Increment a big-endian counter of arbitrary width, wrapping to zero.
pub fn increment_counter(counter: &mut [u8]) {
    for byte in counter.iter_mut().rev() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            return;
        }
    }
}

/// Null-pad or truncate `iv` to exactly `block_size` bytes.
pub fn fit_iv(iv: &[u8], block_size: usize) -> Vec<u8> {
    let mut fitted = vec![0u8; block_size];
    let n = iv.len().min(block_size);
    fitted[..n].copy_from_slice(&iv[..n]);
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_appends_full_block_when_aligned() {
        let padded = add_padding(&[0xAA; 16], 16);
        assert_eq!(padded.len(), 32);
        assert!(padded[16..].iter().all(|&b| b == 16));
    }

    #[test]
    fn padding_round_trips_every_length() {
        for len in 0..40 {
            let data: Vec<u8> = (0..len as u8).collect();
            let padded = add_padding(&data, 8);
            assert_eq!(padded.len() % 8, 0);
            assert_eq!(remove_padding(padded, 8).unwrap(), data);
        }
    }

    #[test]
    fn remove_padding_rejects_zero_and_oversized() {
        let mut block = vec![0u8; 16];
        assert_eq!(
            remove_padding(block.clone(), 16),
            Err(CipherModeError::InvalidPadding)
        );
        block[15] = 17;
        assert_eq!(
            remove_padding(block, 16),
            Err(CipherModeError::InvalidPadding)
        );
        assert_eq!(
            remove_padding(Vec::new(), 16),
            Err(CipherModeError::InvalidPadding)
        );
    }

    #[test]
    fn counter_wraps_to_zero() {
        let mut counter = [0xFFu8; 16];
        increment_counter(&mut counter);
        assert_eq!(counter, [0u8; 16]);

        let mut counter = [0x00, 0x00, 0x01, 0xFF];
        increment_counter(&mut counter);
        assert_eq!(counter, [0x00, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn fit_iv_pads_and_truncates() {
        assert_eq!(fit_iv(&[1, 2, 3], 8), vec![1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(fit_iv(&[9; 20], 16), vec![9; 16]);
    }

    #[test]
    fn xor_blocks_in_place() {
        let mut a = [0b1010u8, 0xFF];
        xor_blocks(&mut a, &[0b0110, 0x0F]);
        assert_eq!(a, [0b1100, 0xF0]);
    }
}
