//! CFB (Cipher Feedback) mode implementation, full-block feedback

use crate::cipher::BlockCipher;

use super::StreamState;

/// CFB mode encryption
///
/// Algorithm:
/// 1. C_0 = IV
/// 2. C_i = P_i ⊕ E(K, C_{i-1})
///
/// `state.iv` is encrypted in place at the start of each block, then each
/// ciphertext byte overwrites the keystream byte it used. After a full
/// block the register holds C_i again.
pub fn encrypt(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    let block_size = cipher.block_size();
    for byte in data.iter_mut() {
        if state.pos == 0 {
            cipher.encrypt_block(&mut state.iv);
        }
        *byte ^= state.iv[state.pos];
        state.iv[state.pos] = *byte;
        state.pos = (state.pos + 1) % block_size;
    }
}

/// CFB mode decryption
///
/// P_i = C_i ⊕ E(K, C_{i-1})
pub fn decrypt(cipher: &dyn BlockCipher, state: &mut StreamState, data: &mut [u8]) {
    let block_size = cipher.block_size();
    for byte in data.iter_mut() {
        if state.pos == 0 {
            cipher.encrypt_block(&mut state.iv);
        }
        let ciphertext = *byte;
        *byte ^= state.iv[state.pos];
        state.iv[state.pos] = ciphertext;
        state.pos = (state.pos + 1) % block_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::KeySchedule;
    use crate::primitives::Des;

    #[test]
    fn register_holds_last_ciphertext_block() {
        let des = Des::derive(b"k3y-0001").unwrap();
        let mut state = StreamState::new(&[0u8; 8]);
        let mut data = vec![0x11u8; 16];
        encrypt(&des, &mut state, &mut data);
        assert_eq!(state.position(), 0);
        assert_eq!(state.iv(), &data[8..]);
    }

    #[test]
    fn split_inside_a_block_round_trips() {
        let des = Des::derive(b"k3y-0002").unwrap();
        let iv = [0xA5u8; 8];
        let plaintext: Vec<u8> = (0..11).collect();

        let mut data = plaintext.clone();
        let mut state = StreamState::new(&iv);
        let (head, tail) = data.split_at_mut(3);
        encrypt(&des, &mut state, head);
        encrypt(&des, &mut state, tail);

        let mut state = StreamState::new(&iv);
        let (head, tail) = data.split_at_mut(9);
        decrypt(&des, &mut state, head);
        decrypt(&des, &mut state, tail);
        assert_eq!(data, plaintext);
    }
}
