//! DES (FIPS 46-3) and Triple DES
//!
//! Tables use the standard 1-based bit numbering, bit 1 being the most
//! significant bit of the input. [`TripleDes`] composes three independent
//! DES schedules as encrypt-decrypt-encrypt.

use zeroize::Zeroize;

use crate::algorithm::Algorithm;
use crate::cipher::{BlockCipher, KeySchedule};
use crate::error::{CipherModeError, Result};

pub const BLOCK_SIZE: usize = 8;
pub const KEY_SIZE: usize = 8;

// Initial permutation
const IP: [u8; 64] = [
    58, 50, 42, 34, 26, 18, 10, 2, 60, 52, 44, 36, 28, 20, 12, 4,
    62, 54, 46, 38, 30, 22, 14, 6, 64, 56, 48, 40, 32, 24, 16, 8,
    57, 49, 41, 33, 25, 17, 9, 1, 59, 51, 43, 35, 27, 19, 11, 3,
    61, 53, 45, 37, 29, 21, 13, 5, 63, 55, 47, 39, 31, 23, 15, 7,
];

const fn invert(table: &[u8; 64]) -> [u8; 64] {
    let mut out = [0u8; 64];
    let mut i = 0;
    while i < 64 {
        out[(table[i] - 1) as usize] = (i + 1) as u8;
        i += 1;
    }
    out
}

// Final permutation (IP^-1)
const FP: [u8; 64] = invert(&IP);

// Expansion of the 32-bit half block to 48 bits
const E: [u8; 48] = [
    32, 1, 2, 3, 4, 5, 4, 5, 6, 7, 8, 9,
    8, 9, 10, 11, 12, 13, 12, 13, 14, 15, 16, 17,
    16, 17, 18, 19, 20, 21, 20, 21, 22, 23, 24, 25,
    24, 25, 26, 27, 28, 29, 28, 29, 30, 31, 32, 1,
];

// Permutation of the S-box output
const P: [u8; 32] = [
    16, 7, 20, 21, 29, 12, 28, 17, 1, 15, 23, 26, 5, 18, 31, 10,
    2, 8, 24, 14, 32, 27, 3, 9, 19, 13, 30, 6, 22, 11, 4, 25,
];

// Permuted choice 1: 64-bit key to 56 bits (parity bits dropped)
const PC1: [u8; 56] = [
    57, 49, 41, 33, 25, 17, 9, 1, 58, 50, 42, 34, 26, 18,
    10, 2, 59, 51, 43, 35, 27, 19, 11, 3, 60, 52, 44, 36,
    63, 55, 47, 39, 31, 23, 15, 7, 62, 54, 46, 38, 30, 22,
    14, 6, 61, 53, 45, 37, 29, 21, 13, 5, 28, 20, 12, 4,
];

// Permuted choice 2: 56-bit C||D to a 48-bit round key
const PC2: [u8; 48] = [
    14, 17, 11, 24, 1, 5, 3, 28, 15, 6, 21, 10,
    23, 19, 12, 4, 26, 8, 16, 7, 27, 20, 13, 2,
    41, 52, 31, 37, 47, 55, 30, 40, 51, 45, 33, 48,
    44, 49, 39, 56, 34, 53, 46, 42, 50, 36, 29, 32,
];

// Left rotations of C and D per round
const SHIFTS: [u32; 16] = [1, 1, 2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 1];

// S-boxes, four rows of 16 each
const SBOXES: [[u8; 64]; 8] = [
    [
        14, 4, 13, 1, 2, 15, 11, 8, 3, 10, 6, 12, 5, 9, 0, 7,
        0, 15, 7, 4, 14, 2, 13, 1, 10, 6, 12, 11, 9, 5, 3, 8,
        4, 1, 14, 8, 13, 6, 2, 11, 15, 12, 9, 7, 3, 10, 5, 0,
        15, 12, 8, 2, 4, 9, 1, 7, 5, 11, 3, 14, 10, 0, 6, 13,
    ],
    [
        15, 1, 8, 14, 6, 11, 3, 4, 9, 7, 2, 13, 12, 0, 5, 10,
        3, 13, 4, 7, 15, 2, 8, 14, 12, 0, 1, 10, 6, 9, 11, 5,
        0, 14, 7, 11, 10, 4, 13, 1, 5, 8, 12, 6, 9, 3, 2, 15,
        13, 8, 10, 1, 3, 15, 4, 2, 11, 6, 7, 12, 0, 5, 14, 9,
    ],
    [
        10, 0, 9, 14, 6, 3, 15, 5, 1, 13, 12, 7, 11, 4, 2, 8,
        13, 7, 0, 9, 3, 4, 6, 10, 2, 8, 5, 14, 12, 11, 15, 1,
        13, 6, 4, 9, 8, 15, 3, 0, 11, 1, 2, 12, 5, 10, 14, 7,
        1, 10, 13, 0, 6, 9, 8, 7, 4, 15, 14, 3, 11, 5, 2, 12,
    ],
    [
        7, 13, 14, 3, 0, 6, 9, 10, 1, 2, 8, 5, 11, 12, 4, 15,
        13, 8, 11, 5, 6, 15, 0, 3, 4, 7, 2, 12, 1, 10, 14, 9,
        10, 6, 9, 0, 12, 11, 7, 13, 15, 1, 3, 14, 5, 2, 8, 4,
        3, 15, 0, 6, 10, 1, 13, 8, 9, 4, 5, 11, 12, 7, 2, 14,
    ],
    [
        2, 12, 4, 1, 7, 10, 11, 6, 8, 5, 3, 15, 13, 0, 14, 9,
        14, 11, 2, 12, 4, 7, 13, 1, 5, 0, 15, 10, 3, 9, 8, 6,
        4, 2, 1, 11, 10, 13, 7, 8, 15, 9, 12, 5, 6, 3, 0, 14,
        11, 8, 12, 7, 1, 14, 2, 13, 6, 15, 0, 9, 10, 4, 5, 3,
    ],
    [
        12, 1, 10, 15, 9, 2, 6, 8, 0, 13, 3, 4, 14, 7, 5, 11,
        10, 15, 4, 2, 7, 12, 9, 5, 6, 1, 13, 14, 0, 11, 3, 8,
        9, 14, 15, 5, 2, 8, 12, 3, 7, 0, 4, 10, 1, 13, 11, 6,
        4, 3, 2, 12, 9, 5, 15, 10, 11, 14, 1, 7, 6, 0, 8, 13,
    ],
    [
        4, 11, 2, 14, 15, 0, 8, 13, 3, 12, 9, 7, 5, 10, 6, 1,
        13, 0, 11, 7, 4, 9, 1, 10, 14, 3, 5, 12, 2, 15, 8, 6,
        1, 4, 11, 13, 12, 3, 7, 14, 10, 15, 6, 8, 0, 5, 9, 2,
        6, 11, 13, 8, 1, 4, 10, 7, 9, 5, 0, 15, 14, 2, 3, 12,
    ],
    [
        13, 2, 8, 4, 6, 15, 11, 1, 10, 9, 3, 14, 5, 0, 12, 7,
        1, 15, 13, 8, 10, 3, 7, 4, 12, 5, 6, 11, 0, 14, 9, 2,
        7, 11, 4, 1, 9, 12, 14, 2, 0, 6, 10, 13, 15, 3, 5, 8,
        2, 1, 14, 7, 4, 10, 8, 13, 15, 12, 9, 0, 3, 5, 6, 11,
    ],
];

/// Selects `table.len()` bits out of the low `input_bits` bits of `input`.
fn permute(input: u64, input_bits: u32, table: &[u8]) -> u64 {
    table.iter().fold(0u64, |acc, &pos| {
        (acc << 1) | ((input >> (input_bits - pos as u32)) & 1)
    })
}

fn rotate28(half: u64, n: u32) -> u64 {
    ((half << n) | (half >> (28 - n))) & 0x0fff_ffff
}

/// The round function: expand, mix in the round key, substitute, permute.
fn feistel(right: u32, subkey: u64) -> u32 {
    let x = permute(right as u64, 32, &E) ^ subkey;
    let mut out = 0u64;
    for (i, sbox) in SBOXES.iter().enumerate() {
        let six = (x >> (42 - 6 * i)) & 0x3f;
        let row = ((six >> 4) & 0x2) | (six & 0x1);
        let col = (six >> 1) & 0xf;
        out = (out << 4) | sbox[(row * 16 + col) as usize] as u64;
    }
    permute(out, 32, &P) as u32
}

/// Single DES with its 16 round subkeys
#[derive(Clone)]
pub struct Des {
    subkeys: [u64; 16],
}

impl Des {
    fn crypt(&self, block: u64, decrypt: bool) -> u64 {
        let permuted = permute(block, 64, &IP);
        let mut left = (permuted >> 32) as u32;
        let mut right = permuted as u32;

        for round in 0..16 {
            let subkey = if decrypt {
                self.subkeys[15 - round]
            } else {
                self.subkeys[round]
            };
            let next = left ^ feistel(right, subkey);
            left = right;
            right = next;
        }

        // halves are swapped before the final permutation
        permute(((right as u64) << 32) | left as u64, 64, &FP)
    }

    fn apply(&self, block: &mut [u8], decrypt: bool) {
        let mut word = [0u8; 8];
        word.copy_from_slice(&block[..BLOCK_SIZE]);
        let out = self.crypt(u64::from_be_bytes(word), decrypt);
        block[..BLOCK_SIZE].copy_from_slice(&out.to_be_bytes());
    }
}

impl KeySchedule for Des {
    fn derive(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(CipherModeError::InvalidKeyLength {
                algorithm: Algorithm::Des,
                length: key.len(),
            });
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(key);
        let cd = permute(u64::from_be_bytes(raw), 64, &PC1);
        raw.zeroize();

        let mut c = cd >> 28;
        let mut d = cd & 0x0fff_ffff;
        let mut subkeys = [0u64; 16];
        for (subkey, &shift) in subkeys.iter_mut().zip(SHIFTS.iter()) {
            c = rotate28(c, shift);
            d = rotate28(d, shift);
            *subkey = permute((c << 28) | d, 56, &PC2);
        }

        Ok(Des { subkeys })
    }
}

impl BlockCipher for Des {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        self.apply(block, false);
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        self.apply(block, true);
    }
}

impl Drop for Des {
    fn drop(&mut self) {
        self.subkeys.zeroize();
    }
}

/// Expands an 8, 16 or 24-byte key to the 24-byte K1||K2||K3 form.
///
/// 8 bytes collapse to K||K||K (plain DES), 16 bytes become K1||K2||K1.
pub fn expand_triple_key(algorithm: Algorithm, key: &[u8]) -> Result<Vec<u8>> {
    let mut expanded = Vec::with_capacity(3 * KEY_SIZE);
    match key.len() {
        8 => {
            for _ in 0..3 {
                expanded.extend_from_slice(key);
            }
        }
        16 => {
            expanded.extend_from_slice(key);
            expanded.extend_from_slice(&key[..KEY_SIZE]);
        }
        24 => expanded.extend_from_slice(key),
        length => return Err(CipherModeError::InvalidKeyLength { algorithm, length }),
    }
    Ok(expanded)
}

/// Derives the three DES schedules of a Triple DES key.
pub fn triple_schedules(algorithm: Algorithm, key: &[u8]) -> Result<[Des; 3]> {
    let mut expanded = expand_triple_key(algorithm, key)?;
    let stages = [
        Des::derive(&expanded[..8])?,
        Des::derive(&expanded[8..16])?,
        Des::derive(&expanded[16..])?,
    ];
    expanded.zeroize();
    Ok(stages)
}

/// Triple DES, EDE3: `E_k3(D_k2(E_k1(x)))`
#[derive(Clone)]
pub struct TripleDes {
    stages: [Des; 3],
}

impl KeySchedule for TripleDes {
    fn derive(key: &[u8]) -> Result<Self> {
        Ok(TripleDes {
            stages: triple_schedules(Algorithm::TripleDes, key)?,
        })
    }
}

impl BlockCipher for TripleDes {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        self.stages[0].encrypt_block(block);
        self.stages[1].decrypt_block(block);
        self.stages[2].encrypt_block(block);
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        self.stages[2].decrypt_block(block);
        self.stages[1].encrypt_block(block);
        self.stages[0].decrypt_block(block);
    }
}
