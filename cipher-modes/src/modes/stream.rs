//! STREAM mode: the keystream primitive is applied directly

use crate::cipher::KeystreamCipher;

/// Encryption and decryption are both a keystream XOR.
pub fn apply(cipher: &mut dyn KeystreamCipher, data: &mut [u8]) {
    if !data.is_empty() {
        cipher.apply_keystream(data);
    }
}
