//! CBC (Cipher Block Chaining) mode implementation

use crate::cipher::BlockCipher;
use crate::utils;

use super::StreamState;

/// CBC mode encryption
///
/// Algorithm:
/// 1. C_0 = IV
/// 2. C_i = E(K, P_i ⊕ C_{i-1})
///
/// The last ciphertext block is left in `state.iv` for the next call.
pub fn encrypt(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    for block in data.chunks_exact_mut(cipher.block_size()) {
        utils::xor_blocks(block, &state.iv);
        cipher.encrypt_block(block);
        state.iv.copy_from_slice(block);
    }
}

/// CBC mode decryption
///
/// P_i = D(K, C_i) ⊕ C_{i-1}
pub fn decrypt(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    let block_size = cipher.block_size();
    let mut saved = vec![0u8; block_size];
    for block in data.chunks_exact_mut(block_size) {
        saved.copy_from_slice(block);
        cipher.decrypt_block(block);
        utils::xor_blocks(block, &state.iv);
        std::mem::swap(&mut state.iv, &mut saved);
    }
}
