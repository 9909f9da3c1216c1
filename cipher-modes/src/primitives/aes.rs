//! AES (FIPS-197) software primitive
//!
//! The state is held as a 4x4 byte matrix filled column by column. Key
//! expansion supports 128, 192 and 256-bit keys (10, 12 and 14 rounds).

use zeroize::Zeroize;

use crate::algorithm::Algorithm;
use crate::cipher::{BlockCipher, KeySchedule};
use crate::error::{CipherModeError, Result};

pub const BLOCK_SIZE: usize = 16;

// S-box for SubBytes
const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab, 0x76,
    0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0,
    0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15,
    0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2, 0xeb, 0x27, 0xb2, 0x75,
    0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84,
    0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf,
    0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8,
    0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5, 0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2,
    0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73,
    0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb,
    0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79,
    0xe7, 0xc8, 0x37, 0x6d, 0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08,
    0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a,
    0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e,
    0xe1, 0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb, 0x16,
];

// Inverse S-box for decryption
const INV_SBOX: [u8; 256] = [
    0x52, 0x09, 0x6a, 0xd5, 0x30, 0x36, 0xa5, 0x38, 0xbf, 0x40, 0xa3, 0x9e, 0x81, 0xf3, 0xd7, 0xfb,
    0x7c, 0xe3, 0x39, 0x82, 0x9b, 0x2f, 0xff, 0x87, 0x34, 0x8e, 0x43, 0x44, 0xc4, 0xde, 0xe9, 0xcb,
    0x54, 0x7b, 0x94, 0x32, 0xa6, 0xc2, 0x23, 0x3d, 0xee, 0x4c, 0x95, 0x0b, 0x42, 0xfa, 0xc3, 0x4e,
    0x08, 0x2e, 0xa1, 0x66, 0x28, 0xd9, 0x24, 0xb2, 0x76, 0x5b, 0xa2, 0x49, 0x6d, 0x8b, 0xd1, 0x25,
    0x72, 0xf8, 0xf6, 0x64, 0x86, 0x68, 0x98, 0x16, 0xd4, 0xa4, 0x5c, 0xcc, 0x5d, 0x65, 0xb6, 0x92,
    0x6c, 0x70, 0x48, 0x50, 0xfd, 0xed, 0xb9, 0xda, 0x5e, 0x15, 0x46, 0x57, 0xa7, 0x8d, 0x9d, 0x84,
    0x90, 0xd8, 0xab, 0x00, 0x8c, 0xbc, 0xd3, 0x0a, 0xf7, 0xe4, 0x58, 0x05, 0xb8, 0xb3, 0x45, 0x06,
    0xd0, 0x2c, 0x1e, 0x8f, 0xca, 0x3f, 0x0f, 0x02, 0xc1, 0xaf, 0xbd, 0x03, 0x01, 0x13, 0x8a, 0x6b,
    0x3a, 0x91, 0x11, 0x41, 0x4f, 0x67, 0xdc, 0xea, 0x97, 0xf2, 0xcf, 0xce, 0xf0, 0xb4, 0xe6, 0x73,
    0x96, 0xac, 0x74, 0x22, 0xe7, 0xad, 0x35, 0x85, 0xe2, 0xf9, 0x37, 0xe8, 0x1c, 0x75, 0xdf, 0x6e,
    0x47, 0xf1, 0x1a, 0x71, 0x1d, 0x29, 0xc5, 0x89, 0x6f, 0xb7, 0x62, 0x0e, 0xaa, 0x18, 0xbe, 0x1b,
    0xfc, 0x56, 0x3e, 0x4b, 0xc6, 0xd2, 0x79, 0x20, 0x9a, 0xdb, 0xc0, 0xfe, 0x78, 0xcd, 0x5a, 0xf4,
    0x1f, 0xdd, 0xa8, 0x33, 0x88, 0x07, 0xc7, 0x31, 0xb1, 0x12, 0x10, 0x59, 0x27, 0x80, 0xec, 0x5f,
    0x60, 0x51, 0x7f, 0xa9, 0x19, 0xb5, 0x4a, 0x0d, 0x2d, 0xe5, 0x7a, 0x9f, 0x93, 0xc9, 0x9c, 0xef,
    0xa0, 0xe0, 0x3b, 0x4d, 0xae, 0x2a, 0xf5, 0xb0, 0xc8, 0xeb, 0xbb, 0x3c, 0x83, 0x53, 0x99, 0x61,
    0x17, 0x2b, 0x04, 0x7e, 0xba, 0x77, 0xd6, 0x26, 0xe1, 0x69, 0x14, 0x63, 0x55, 0x21, 0x0c, 0x7d,
];

// Round constants for key expansion
const RCON: [u8; 10] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x1b, 0x36];

/// One AES state: 4x4 matrix, filled column by column
#[derive(Clone, Copy)]
struct AesBlock {
    data: [[u8; 4]; 4],
}

impl AesBlock {
    fn new(bytes: &[u8]) -> Self {
        let mut data = [[0u8; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                data[row][col] = bytes[col * 4 + row];
            }
        }
        AesBlock { data }
    }

    fn write_to(&self, bytes: &mut [u8]) {
        for col in 0..4 {
            for row in 0..4 {
                bytes[col * 4 + row] = self.data[row][col];
            }
        }
    }
}

fn sub_bytes(block: &mut AesBlock) {
    for row in block.data.iter_mut() {
        for byte in row.iter_mut() {
            *byte = SBOX[*byte as usize];
        }
    }
}

fn inv_sub_bytes(block: &mut AesBlock) {
    for row in block.data.iter_mut() {
        for byte in row.iter_mut() {
            *byte = INV_SBOX[*byte as usize];
        }
    }
}

/// Row r rotates left by r positions
fn shift_rows(block: &mut AesBlock) {
    for row in 1..4 {
        block.data[row].rotate_left(row);
    }
}

fn inv_shift_rows(block: &mut AesBlock) {
    for row in 1..4 {
        block.data[row].rotate_right(row);
    }
}

/// Multiplication in GF(2^8) modulo x^8 + x^4 + x^3 + x + 1
fn gf_mult(a: u8, b: u8) -> u8 {
    let mut result = 0;
    let mut a = a;
    let mut b = b;

    for _ in 0..8 {
        if b & 1 != 0 {
            result ^= a;
        }
        let high_bit = a & 0x80;
        a <<= 1;
        if high_bit != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    result
}

/// MixColumns matrix:
/// [2 3 1 1]
/// [1 2 3 1]
/// [1 1 2 3]
/// [3 1 1 2]
fn mix_columns(block: &mut AesBlock) {
    for col in 0..4 {
        let t = [
            block.data[0][col],
            block.data[1][col],
            block.data[2][col],
            block.data[3][col],
        ];
        block.data[0][col] = gf_mult(2, t[0]) ^ gf_mult(3, t[1]) ^ t[2] ^ t[3];
        block.data[1][col] = t[0] ^ gf_mult(2, t[1]) ^ gf_mult(3, t[2]) ^ t[3];
        block.data[2][col] = t[0] ^ t[1] ^ gf_mult(2, t[2]) ^ gf_mult(3, t[3]);
        block.data[3][col] = gf_mult(3, t[0]) ^ t[1] ^ t[2] ^ gf_mult(2, t[3]);
    }
}

/// Inverse MixColumns matrix:
/// [0xE 0xB 0xD 0x9]
/// [0x9 0xE 0xB 0xD]
/// [0xD 0x9 0xE 0xB]
/// [0xB 0xD 0x9 0xE]
fn inv_mix_columns(block: &mut AesBlock) {
    for col in 0..4 {
        let t = [
            block.data[0][col],
            block.data[1][col],
            block.data[2][col],
            block.data[3][col],
        ];
        block.data[0][col] =
            gf_mult(0x0e, t[0]) ^ gf_mult(0x0b, t[1]) ^ gf_mult(0x0d, t[2]) ^ gf_mult(0x09, t[3]);
        block.data[1][col] =
            gf_mult(0x09, t[0]) ^ gf_mult(0x0e, t[1]) ^ gf_mult(0x0b, t[2]) ^ gf_mult(0x0d, t[3]);
        block.data[2][col] =
            gf_mult(0x0d, t[0]) ^ gf_mult(0x09, t[1]) ^ gf_mult(0x0e, t[2]) ^ gf_mult(0x0b, t[3]);
        block.data[3][col] =
            gf_mult(0x0b, t[0]) ^ gf_mult(0x0d, t[1]) ^ gf_mult(0x09, t[2]) ^ gf_mult(0x0e, t[3]);
    }
}

fn add_round_key(block: &mut AesBlock, round_key: &[u8; 16]) {
    let key_block = AesBlock::new(round_key);
    for row in 0..4 {
        for col in 0..4 {
            block.data[row][col] ^= key_block.data[row][col];
        }
    }
}

/// AES with an expanded key schedule
#[derive(Clone)]
pub struct Aes {
    round_keys: Vec<[u8; 16]>,
}

impl Aes {
    fn rounds(&self) -> usize {
        self.round_keys.len() - 1
    }
}

impl KeySchedule for Aes {
    /// Expands a 16, 24 or 32-byte key into Nr + 1 round keys.
    fn derive(key: &[u8]) -> Result<Self> {
        let nk = match key.len() {
            16 | 24 | 32 => key.len() / 4,
            length => {
                return Err(CipherModeError::InvalidKeyLength {
                    algorithm: Algorithm::Aes,
                    length,
                })
            }
        };
        let rounds = nk + 6;
        let total_words = 4 * (rounds + 1);

        let mut words: Vec<[u8; 4]> = key
            .chunks_exact(4)
            .map(|w| [w[0], w[1], w[2], w[3]])
            .collect();
        for i in nk..total_words {
            let mut temp = words[i - 1];
            if i % nk == 0 {
                temp.rotate_left(1);
                for byte in temp.iter_mut() {
                    *byte = SBOX[*byte as usize];
                }
                temp[0] ^= RCON[i / nk - 1];
            } else if nk > 6 && i % nk == 4 {
                for byte in temp.iter_mut() {
                    *byte = SBOX[*byte as usize];
                }
            }
            let prev = words[i - nk];
            words.push([
                prev[0] ^ temp[0],
                prev[1] ^ temp[1],
                prev[2] ^ temp[2],
                prev[3] ^ temp[3],
            ]);
        }

        let round_keys = words
            .chunks_exact(4)
            .map(|w| {
                let mut rk = [0u8; 16];
                for (i, word) in w.iter().enumerate() {
                    rk[i * 4..i * 4 + 4].copy_from_slice(word);
                }
                rk
            })
            .collect();
        words.zeroize();

        Ok(Aes { round_keys })
    }
}

impl BlockCipher for Aes {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    /// Initial AddRoundKey, Nr - 1 full rounds, final round without
    /// MixColumns.
    fn encrypt_block(&self, bytes: &mut [u8]) {
        let nr = self.rounds();
        let mut block = AesBlock::new(bytes);

        add_round_key(&mut block, &self.round_keys[0]);
        for round in 1..nr {
            sub_bytes(&mut block);
            shift_rows(&mut block);
            mix_columns(&mut block);
            add_round_key(&mut block, &self.round_keys[round]);
        }
        sub_bytes(&mut block);
        shift_rows(&mut block);
        add_round_key(&mut block, &self.round_keys[nr]);

        block.write_to(bytes);
    }

    fn decrypt_block(&self, bytes: &mut [u8]) {
        let nr = self.rounds();
        let mut block = AesBlock::new(bytes);

        add_round_key(&mut block, &self.round_keys[nr]);
        for round in (1..nr).rev() {
            inv_shift_rows(&mut block);
            inv_sub_bytes(&mut block);
            add_round_key(&mut block, &self.round_keys[round]);
            inv_mix_columns(&mut block);
        }
        inv_shift_rows(&mut block);
        inv_sub_bytes(&mut block);
        add_round_key(&mut block, &self.round_keys[0]);

        block.write_to(bytes);
    }
}

impl Drop for Aes {
    fn drop(&mut self) {
        self.round_keys.zeroize();
    }
}
