//! OFB (Output Feedback) mode implementation

use crate::cipher::BlockCipher;
use crate::utils;

use super::StreamState;

/// OFB mode transform (encryption and decryption are identical)
///
/// Algorithm:
/// 1. O_0 = IV, O_i = E(K, O_{i-1})
/// 2. C_i = P_i ⊕ O_i
///
/// `state.iv` holds the current keystream block O_i.
pub fn apply(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    let block_size = cipher.block_size();
    let mut offset = 0;
    while offset < data.len() {
        if state.pos == 0 {
            cipher.encrypt_block(&mut state.iv);
        }
        let take = (block_size - state.pos).min(data.len() - offset);
        utils::xor_blocks(
            &mut data[offset..offset + take],
            &state.iv[state.pos..state.pos + take],
        );
        offset += take;
        state.pos = (state.pos + take) % block_size;
    }
}
