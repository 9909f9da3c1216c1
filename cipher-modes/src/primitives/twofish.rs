//! Twofish software primitive
//!
//! The key schedule produces 40 round subkeys and four key-dependent
//! S-boxes, one per byte lane, with the MDS multiplication folded in so that
//! `g(x)` is four table lookups. Encryption runs 16 Feistel rounds, two per
//! loop iteration, between input and output whitening.

use zeroize::Zeroize;

use crate::algorithm::Algorithm;
use crate::cipher::{BlockCipher, KeySchedule};
use crate::error::{CipherModeError, Result};

pub const BLOCK_SIZE: usize = 16;

const MDS_POLY: u16 = 0x169;
const RS_POLY: u16 = 0x14d;
const RHO: u32 = 0x0101_0101;

// 4-bit permutations t0..t3 defining q0 and q1
const Q0_T: [[u8; 16]; 4] = [
    [0x8, 0x1, 0x7, 0xD, 0x6, 0xF, 0x3, 0x2, 0x0, 0xB, 0x5, 0x9, 0xE, 0xC, 0xA, 0x4],
    [0xE, 0xC, 0xB, 0x8, 0x1, 0x2, 0x3, 0x5, 0xF, 0x4, 0xA, 0x6, 0x7, 0x0, 0x9, 0xD],
    [0xB, 0xA, 0x5, 0xE, 0x6, 0xD, 0x9, 0x0, 0xC, 0x8, 0xF, 0x3, 0x2, 0x4, 0x7, 0x1],
    [0xD, 0x7, 0xF, 0x4, 0x1, 0x2, 0x6, 0xE, 0x9, 0xB, 0x3, 0x0, 0x8, 0x5, 0xC, 0xA],
];

const Q1_T: [[u8; 16]; 4] = [
    [0x2, 0x8, 0xB, 0xD, 0xF, 0x7, 0x6, 0xE, 0x3, 0x1, 0x9, 0x4, 0x0, 0xA, 0xC, 0x5],
    [0x1, 0xE, 0x2, 0xB, 0x4, 0xC, 0x3, 0x7, 0x6, 0xD, 0xA, 0x5, 0xF, 0x9, 0x0, 0x8],
    [0x4, 0xC, 0x7, 0x5, 0x1, 0x6, 0x9, 0xA, 0x0, 0xE, 0xD, 0x8, 0x2, 0xB, 0x3, 0xF],
    [0xB, 0x9, 0x5, 0x1, 0xC, 0x3, 0xD, 0xE, 0x6, 0x4, 0x7, 0xF, 0x2, 0x0, 0x8, 0xA],
];

const fn ror4(x: u8) -> u8 {
    ((x >> 1) | (x << 3)) & 0x0f
}

const fn build_q(t: &[[u8; 16]; 4]) -> [u8; 256] {
    let mut q = [0u8; 256];
    let mut x = 0;
    while x < 256 {
        let a0 = (x >> 4) as u8;
        let b0 = (x & 0x0f) as u8;
        let a1 = a0 ^ b0;
        let b1 = a0 ^ ror4(b0) ^ ((a0 << 3) & 0x0f);
        let a2 = t[0][a1 as usize];
        let b2 = t[1][b1 as usize];
        let a3 = a2 ^ b2;
        let b3 = a2 ^ ror4(b2) ^ ((a2 << 3) & 0x0f);
        let a4 = t[2][a3 as usize];
        let b4 = t[3][b3 as usize];
        q[x] = (b4 << 4) | a4;
        x += 1;
    }
    q
}

const Q0: [u8; 256] = build_q(&Q0_T);
const Q1: [u8; 256] = build_q(&Q1_T);

/// Permutation applied at each stage of a byte lane, outermost last:
/// [4-word stage, 3-word stage, inner, middle, outer].
const LANE_STAGES: [[&[u8; 256]; 5]; 4] = [
    [&Q1, &Q1, &Q0, &Q0, &Q1],
    [&Q0, &Q1, &Q1, &Q0, &Q0],
    [&Q0, &Q0, &Q0, &Q1, &Q1],
    [&Q1, &Q0, &Q1, &Q1, &Q0],
];

const MDS: [[u8; 4]; 4] = [
    [0x01, 0xEF, 0x5B, 0x5B],
    [0x5B, 0xEF, 0xEF, 0x01],
    [0xEF, 0x5B, 0x01, 0xEF],
    [0xEF, 0x01, 0xEF, 0x5B],
];

const RS: [[u8; 8]; 4] = [
    [0x01, 0xA4, 0x55, 0x87, 0x5A, 0x58, 0xDB, 0x9E],
    [0xA4, 0x56, 0x82, 0xF3, 0x1E, 0xC6, 0x68, 0xE5],
    [0x02, 0xA1, 0xFC, 0xC1, 0x47, 0xAE, 0x3D, 0x19],
    [0xA4, 0x55, 0x87, 0x5A, 0x58, 0xDB, 0x9E, 0x03],
];

fn gf_mult(a: u8, mut b: u8, poly: u16) -> u8 {
    let mut a = a as u16;
    let mut result = 0u16;
    while b != 0 {
        if b & 1 != 0 {
            result ^= a;
        }
        a <<= 1;
        if a & 0x100 != 0 {
            a ^= poly;
        }
        b >>= 1;
    }
    result as u8
}

fn lane_byte(word: u32, lane: usize) -> u8 {
    (word >> (8 * lane)) as u8
}

/// One byte lane of the h function over the key word list `l`.
fn lane(index: usize, mut y: u8, l: &[u32]) -> u8 {
    let stages = &LANE_STAGES[index];
    if l.len() == 4 {
        y = stages[0][y as usize] ^ lane_byte(l[3], index);
    }
    if l.len() >= 3 {
        y = stages[1][y as usize] ^ lane_byte(l[2], index);
    }
    y = stages[2][y as usize] ^ lane_byte(l[1], index);
    y = stages[3][y as usize] ^ lane_byte(l[0], index);
    stages[4][y as usize]
}

/// Column `index` of the MDS matrix multiplied by `y`.
fn mds_column(index: usize, y: u8) -> u32 {
    (0..4).fold(0u32, |acc, row| {
        acc | (gf_mult(MDS[row][index], y, MDS_POLY) as u32) << (8 * row)
    })
}

fn h(x: u32, l: &[u32]) -> u32 {
    (0..4).fold(0u32, |acc, i| {
        acc ^ mds_column(i, lane(i, lane_byte(x, i), l))
    })
}

/// Reed-Solomon remainder of one 8-byte key chunk.
fn rs_word(chunk: &[u8]) -> u32 {
    (0..4).fold(0u32, |acc, row| {
        let s = chunk
            .iter()
            .zip(RS[row].iter())
            .fold(0u8, |s, (&m, &r)| s ^ gf_mult(r, m, RS_POLY));
        acc | (s as u32) << (8 * row)
    })
}

/// Null-pads a key to the next of 16, 24 or 32 bytes; longer keys are cut
/// to 32. Empty keys are rejected.
pub fn normalize_key(key: &[u8]) -> Result<Vec<u8>> {
    let target = match key.len() {
        0 => {
            return Err(CipherModeError::InvalidKeyLength {
                algorithm: Algorithm::Twofish,
                length: 0,
            })
        }
        1..=16 => 16,
        17..=24 => 24,
        _ => 32,
    };
    let mut normalized = vec![0u8; target];
    let n = key.len().min(target);
    normalized[..n].copy_from_slice(&key[..n]);
    Ok(normalized)
}

#[derive(Clone)]
pub struct Twofish {
    subkeys: [u32; 40],
    sboxes: [[u32; 256]; 4],
}

impl Twofish {
    #[inline]
    fn g(&self, x: u32) -> u32 {
        self.sboxes[0][lane_byte(x, 0) as usize]
            ^ self.sboxes[1][lane_byte(x, 1) as usize]
            ^ self.sboxes[2][lane_byte(x, 2) as usize]
            ^ self.sboxes[3][lane_byte(x, 3) as usize]
    }
}

impl KeySchedule for Twofish {
    fn derive(key: &[u8]) -> Result<Self> {
        let mut key = normalize_key(key)?;
        let k = key.len() / 8;

        let mut words: Vec<u32> = key
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        let mut even: Vec<u32> = words.iter().step_by(2).copied().collect();
        let mut odd: Vec<u32> = words.iter().skip(1).step_by(2).copied().collect();
        let mut s: Vec<u32> = key.chunks_exact(8).map(rs_word).rev().collect();
        debug_assert_eq!(s.len(), k);

        let mut subkeys = [0u32; 40];
        for i in 0..20u32 {
            let a = h(2 * i * RHO, &even);
            let b = h((2 * i + 1) * RHO, &odd).rotate_left(8);
            subkeys[2 * i as usize] = a.wrapping_add(b);
            subkeys[2 * i as usize + 1] = a.wrapping_add(b.wrapping_mul(2)).rotate_left(9);
        }

        let mut sboxes = [[0u32; 256]; 4];
        for x in 0..256 {
            for (index, table) in sboxes.iter_mut().enumerate() {
                table[x] = mds_column(index, lane(index, x as u8, &s));
            }
        }

        key.zeroize();
        words.zeroize();
        even.zeroize();
        odd.zeroize();
        s.zeroize();

        Ok(Twofish { subkeys, sboxes })
    }
}

impl BlockCipher for Twofish {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let k = &self.subkeys;
        let word = |i: usize| {
            u32::from_le_bytes([block[4 * i], block[4 * i + 1], block[4 * i + 2], block[4 * i + 3]])
                ^ k[i]
        };
        let (mut a, mut b, mut c, mut d) = (word(0), word(1), word(2), word(3));

        for r in 0..8 {
            let t0 = self.g(a);
            let t1 = self.g(b.rotate_left(8));
            c = (c ^ t0.wrapping_add(t1).wrapping_add(k[8 + 4 * r])).rotate_right(1);
            d = d.rotate_left(1) ^ t0.wrapping_add(t1.wrapping_mul(2)).wrapping_add(k[9 + 4 * r]);

            let t0 = self.g(c);
            let t1 = self.g(d.rotate_left(8));
            a = (a ^ t0.wrapping_add(t1).wrapping_add(k[10 + 4 * r])).rotate_right(1);
            b = b.rotate_left(1) ^ t0.wrapping_add(t1.wrapping_mul(2)).wrapping_add(k[11 + 4 * r]);
        }

        for (i, w) in [c ^ k[4], d ^ k[5], a ^ k[6], b ^ k[7]].iter().enumerate() {
            block[4 * i..4 * i + 4].copy_from_slice(&w.to_le_bytes());
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let k = &self.subkeys;
        let word = |i: usize| {
            u32::from_le_bytes([block[4 * i], block[4 * i + 1], block[4 * i + 2], block[4 * i + 3]])
                ^ k[4 + i]
        };
        let (mut c, mut d, mut a, mut b) = (word(0), word(1), word(2), word(3));

        for r in (0..8).rev() {
            let t0 = self.g(c);
            let t1 = self.g(d.rotate_left(8));
            a = a.rotate_left(1) ^ t0.wrapping_add(t1).wrapping_add(k[10 + 4 * r]);
            b = (b ^ t0.wrapping_add(t1.wrapping_mul(2)).wrapping_add(k[11 + 4 * r])).rotate_right(1);

            let t0 = self.g(a);
            let t1 = self.g(b.rotate_left(8));
            c = c.rotate_left(1) ^ t0.wrapping_add(t1).wrapping_add(k[8 + 4 * r]);
            d = (d ^ t0.wrapping_add(t1.wrapping_mul(2)).wrapping_add(k[9 + 4 * r])).rotate_right(1);
        }

        for (i, w) in [a ^ k[0], b ^ k[1], c ^ k[2], d ^ k[3]].iter().enumerate() {
            block[4 * i..4 * i + 4].copy_from_slice(&w.to_le_bytes());
        }
    }
}

impl Drop for Twofish {
    fn drop(&mut self) {
        self.subkeys.zeroize();
        for table in self.sboxes.iter_mut() {
            table.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_permutations_match_reference_entries() {
        assert_eq!(Q0[0], 0xA9);
        assert_eq!(Q1[0], 0x75);
        let mut seen = [false; 256];
        for &v in Q0.iter() {
            seen[v as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn known_answer_vectors() {
        let cases = [
            (
                "00000000000000000000000000000000",
                "9f589f5cf6122c32b6bfec2f2ae8c35a",
            ),
            (
                "0123456789abcdeffedcba98765432100011223344556677",
                "cfd1d2e5a9be9cdf501f13b892bd2248",
            ),
            (
                "0123456789abcdeffedcba987654321000112233445566778899aabbccddeeff",
                "37527be0052334b89f0cfccae87cfa20",
            ),
        ];
        for (key, expected) in cases {
            let cipher = Twofish::derive(&hex::decode(key).unwrap()).unwrap();
            let mut block = [0u8; 16];
            cipher.encrypt_block(&mut block);
            assert_eq!(hex::encode(block), expected);
            cipher.decrypt_block(&mut block);
            assert_eq!(block, [0u8; 16]);
        }
    }

    #[test]
    fn short_keys_are_null_padded() {
        let padded = Twofish::derive(&[7u8; 16]).unwrap();
        let mut short_key = vec![7u8; 10];
        short_key.resize(16, 0);
        let explicit = Twofish::derive(&short_key).unwrap();
        let short = Twofish::derive(&[7u8; 10]).unwrap();

        let mut a = [1u8; 16];
        let mut b = [1u8; 16];
        let mut c = [1u8; 16];
        padded.encrypt_block(&mut a);
        explicit.encrypt_block(&mut b);
        short.encrypt_block(&mut c);
        assert_eq!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn normalize_key_lengths() {
        assert_eq!(normalize_key(&[1; 17]).unwrap().len(), 24);
        assert_eq!(normalize_key(&[1; 40]).unwrap(), vec![1; 32]);
        assert!(normalize_key(&[]).is_err());
    }
}
