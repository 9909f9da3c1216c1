//! ECB (Electronic Code Book) mode implementation

use crate::cipher::BlockCipher;

/// ECB mode encryption
///
/// Every block is encrypted independently: C_i = E(K, P_i).
/// `data` must be block aligned.
pub fn encrypt(cipher: &dyn BlockCipher, data: &mut [u8]) {
    for block in data.chunks_exact_mut(cipher.block_size()) {
        cipher.encrypt_block(block);
    }
}

/// ECB mode decryption
///
/// P_i = D(K, C_i)
pub fn decrypt(cipher: &dyn BlockCipher, data: &mut [u8]) {
    for block in data.chunks_exact_mut(cipher.block_size()) {
        cipher.decrypt_block(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::KeySchedule;
    use crate::primitives::Des;

    #[test]
    fn equal_blocks_give_equal_ciphertext() {
        let des = Des::derive(&hex::decode("133457799bbcdff1").unwrap()).unwrap();
        let mut data = hex::decode("0123456789abcdef0123456789abcdef").unwrap();
        encrypt(&des, &mut data);
        assert_eq!(hex::encode(&data[..8]), "85e813540f0ab405");
        assert_eq!(data[..8], data[8..]);

        decrypt(&des, &mut data);
        assert_eq!(hex::encode(data), "0123456789abcdef0123456789abcdef");
    }
}
