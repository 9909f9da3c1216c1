//! CFB-8 mode implementation, one byte of feedback per step

use crate::cipher::BlockCipher;

use super::StreamState;

/// CFB-8 mode encryption
///
/// For every byte: K = E(K, R)[0], C = P ⊕ K, then R is shifted left by
/// one byte and C is appended.
pub fn encrypt(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    let mut scratch = vec![0u8; cipher.block_size()];
    for byte in data.iter_mut() {
        *byte ^= keystream_byte(cipher, &state.iv, &mut scratch);
        shift_in(&mut state.iv, *byte);
    }
}

/// CFB-8 mode decryption
pub fn decrypt(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    let mut scratch = vec![0u8; cipher.block_size()];
    for byte in data.iter_mut() {
        let ciphertext = *byte;
        *byte ^= keystream_byte(cipher, &state.iv, &mut scratch);
        shift_in(&mut state.iv, ciphertext);
    }
}

fn keystream_byte(cipher: &dyn BlockCipher, register: &[u8], scratch: &mut [u8]) -> u8 {
    scratch.copy_from_slice(register);
    cipher.encrypt_block(scratch);
    scratch[0]
}

fn shift_in(register: &mut [u8], byte: u8) {
    register.rotate_left(1);
    if let Some(last) = register.last_mut() {
        *last = byte;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_in_appends_at_the_end() {
        let mut register = [1u8, 2, 3, 4];
        shift_in(&mut register, 9);
        assert_eq!(register, [2, 3, 4, 9]);
    }
}
