//! Password-based key derivation (PBKDF1, PBKDF2) and the hash service
//! behind it.

use std::fmt;
use std::str::FromStr;

use hmac::digest::{KeyInit, OutputSizeUser};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use zeroize::Zeroize;

use crate::error::{CipherModeError, Result};

/// Salt used when the caller does not supply one
pub const DEFAULT_SALT: &[u8] = b"cipher-modes/salt";
pub const DEFAULT_ITERATIONS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 6] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes
    pub fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub fn digest(self, input: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Md5 => Md5::digest(input).to_vec(),
            HashAlgorithm::Sha1 => Sha1::digest(input).to_vec(),
            HashAlgorithm::Sha224 => Sha224::digest(input).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(input).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(input).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(input).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CipherModeError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_ascii_lowercase().replace('-', "");
        HashAlgorithm::ALL
            .iter()
            .copied()
            .find(|h| h.as_str() == normalized)
            .ok_or_else(|| CipherModeError::UnsupportedHash(s.to_string()))
    }
}

/// Hashes `input` with the algorithm called `name`.
pub fn hash(name: &str, input: &[u8]) -> Result<Vec<u8>> {
    Ok(name.parse::<HashAlgorithm>()?.digest(input))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdfMethod {
    /// RFC 8018 section 5.1, output limited to one digest
    Pbkdf1,
    #[default]
    Pbkdf2,
}

/// Parameters for [`CipherContext::set_password`](crate::CipherContext::set_password)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordOptions {
    pub method: KdfMethod,
    pub hash: HashAlgorithm,
    pub salt: Vec<u8>,
    pub iterations: u32,
    /// Output length in bytes; `None` uses the context's key length.
    pub key_length: Option<usize>,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        PasswordOptions {
            method: KdfMethod::Pbkdf2,
            hash: HashAlgorithm::Sha1,
            salt: DEFAULT_SALT.to_vec(),
            iterations: DEFAULT_ITERATIONS,
            key_length: None,
        }
    }
}

/// Derives `output_length` bytes from `password` with PBKDF2-HMAC.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    hash: HashAlgorithm,
    iterations: u32,
    output_length: usize,
) -> Result<Vec<u8>> {
    if iterations == 0 {
        return Err(CipherModeError::InvalidIterationCount);
    }
    match hash {
        HashAlgorithm::Md5 => pbkdf2::<Hmac<Md5>>(password, salt, iterations, output_length),
        HashAlgorithm::Sha1 => pbkdf2::<Hmac<Sha1>>(password, salt, iterations, output_length),
        HashAlgorithm::Sha224 => pbkdf2::<Hmac<Sha224>>(password, salt, iterations, output_length),
        HashAlgorithm::Sha256 => pbkdf2::<Hmac<Sha256>>(password, salt, iterations, output_length),
        HashAlgorithm::Sha384 => pbkdf2::<Hmac<Sha384>>(password, salt, iterations, output_length),
        HashAlgorithm::Sha512 => pbkdf2::<Hmac<Sha512>>(password, salt, iterations, output_length),
    }
}

/// PBKDF1: T_1 = H(P || S), T_i = H(T_{i-1}), DK = T_c[..len]
pub fn pbkdf1(
    password: &[u8],
    salt: &[u8],
    hash: HashAlgorithm,
    iterations: u32,
    output_length: usize,
) -> Result<Vec<u8>> {
    if iterations == 0 {
        return Err(CipherModeError::InvalidIterationCount);
    }
    if output_length > hash.output_size() {
        return Err(CipherModeError::DerivedKeyTooLong {
            requested: output_length,
            max: hash.output_size(),
        });
    }

    let mut input = Vec::with_capacity(password.len() + salt.len());
    input.extend_from_slice(password);
    input.extend_from_slice(salt);
    let mut t = hash.digest(&input);
    input.zeroize();
    for _ in 1..iterations {
        let next = hash.digest(&t);
        t.zeroize();
        t = next;
    }
    t.truncate(output_length);
    Ok(t)
}

/// Runs the configured method.
pub fn derive_with(options: &PasswordOptions, password: &[u8], output_length: usize) -> Result<Vec<u8>> {
    match options.method {
        KdfMethod::Pbkdf1 => pbkdf1(password, &options.salt, options.hash, options.iterations, output_length),
        KdfMethod::Pbkdf2 => derive_key(password, &options.salt, options.hash, options.iterations, output_length),
    }
}

fn pbkdf2<M>(password: &[u8], salt: &[u8], iterations: u32, dk_len: usize) -> Result<Vec<u8>>
where
    M: Mac + KeyInit + Clone,
{
    let prf = <M as KeyInit>::new_from_slice(password).map_err(|_| {
        CipherModeError::UnsupportedHash("hmac rejected the password as key".to_string())
    })?;
    let h_len = <M as OutputSizeUser>::output_size();

    let mut dk = vec![0u8; dk_len];
    for (i, chunk) in dk.chunks_mut(h_len).enumerate() {
        let mut mac = prf.clone();
        mac.update(salt);
        mac.update(&(i as u32 + 1).to_be_bytes());
        let mut u = mac.finalize().into_bytes();
        let mut t = u.clone();

        for _ in 1..iterations {
            let mut mac = prf.clone();
            mac.update(&u);
            u = mac.finalize().into_bytes();
            for (acc, next) in t.iter_mut().zip(u.iter()) {
                *acc ^= next;
            }
        }

        chunk.copy_from_slice(&t[..chunk.len()]);
        t.as_mut_slice().zeroize();
        u.as_mut_slice().zeroize();
    }
    Ok(dk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_service_by_name() {
        assert_eq!(
            hex::encode(hash("sha256", b"abc").unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hex::encode(hash("MD5", b"abc").unwrap()),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            hash("whirlpool", b"abc"),
            Err(CipherModeError::UnsupportedHash("whirlpool".into()))
        );
    }

    #[test]
    fn output_sizes_match_digests() {
        for h in HashAlgorithm::ALL {
            assert_eq!(h.digest(b"").len(), h.output_size(), "{h}");
        }
    }

    #[test]
    fn pbkdf2_rfc6070_sha1() {
        let dk = derive_key(b"password", b"salt", HashAlgorithm::Sha1, 2, 20).unwrap();
        assert_eq!(hex::encode(dk), "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957");
    }

    #[test]
    fn pbkdf2_sha256_single_iteration() {
        let dk = derive_key(b"password", b"salt", HashAlgorithm::Sha256, 1, 32).unwrap();
        assert_eq!(
            hex::encode(dk),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }

    #[test]
    fn pbkdf2_spans_several_blocks() {
        let dk = derive_key(b"password", b"salt", HashAlgorithm::Md5, 3, 40).unwrap();
        assert_eq!(
            hex::encode(dk),
            "f6acd4bda3e4d3d831a5f61da9ca9d5c3877566e979f4928778d81be4f2e9433a31043bbf3945c35"
        );
    }

    #[test]
    fn pbkdf2_sha512() {
        let dk = derive_key(b"password", b"salt", HashAlgorithm::Sha512, 2, 64).unwrap();
        assert_eq!(
            hex::encode(dk),
            "e1d9c16aa681708a45f5c7c4e215ceb66e011a2e9f0040713f18aefdb866d53c\
             f76cab2868a39b9f7840edce4fef5a82be67335c77a6068e04112754f27ccf4e"
        );
    }

    #[test]
    fn pbkdf1_sha1() {
        let dk = pbkdf1(b"password", b"salt", HashAlgorithm::Sha1, 1000, 16).unwrap();
        assert_eq!(hex::encode(dk), "4a8fd48e426ed081b535be5769892fa3");
    }

    #[test]
    fn pbkdf1_is_capped_at_one_digest() {
        assert_eq!(
            pbkdf1(b"pw", b"salt", HashAlgorithm::Md5, 1, 17),
            Err(CipherModeError::DerivedKeyTooLong {
                requested: 17,
                max: 16
            })
        );
    }

    #[test]
    fn zero_iterations_rejected() {
        assert_eq!(
            derive_key(b"pw", b"salt", HashAlgorithm::Sha1, 0, 16),
            Err(CipherModeError::InvalidIterationCount)
        );
    }

    #[test]
    fn default_options() {
        let options = PasswordOptions::default();
        assert_eq!(options.hash, HashAlgorithm::Sha1);
        assert_eq!(options.iterations, 1000);
        assert_eq!(options.salt, DEFAULT_SALT);
        assert_eq!(options.method, KdfMethod::Pbkdf2);
    }
}
