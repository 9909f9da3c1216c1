//! CTR (Counter) mode implementation

use crate::cipher::BlockCipher;
use crate::utils;

use super::StreamState;

/// CTR mode transform (encryption and decryption are identical)
///
/// Algorithm:
/// 1. T_1 = IV, T_{i+1} = T_i + 1 mod 2^(8 * block_size)
/// 2. C_i = P_i ⊕ E(K, T_i)
///
/// A partially used keystream block is kept in `state.carry` and consumed
/// first on the next call.
pub fn apply(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    let block_size = cipher.block_size();
    let mut offset = 0;
    while offset < data.len() {
        if state.pos == 0 {
            state.carry.copy_from_slice(&state.iv);
            cipher.encrypt_block(&mut state.carry);
            utils::increment_counter(&mut state.iv);
        }
        let take = (block_size - state.pos).min(data.len() - offset);
        utils::xor_blocks(
            &mut data[offset..offset + take],
            &state.carry[state.pos..state.pos + take],
        );
        offset += take;
        state.pos = (state.pos + take) % block_size;
    }
}
