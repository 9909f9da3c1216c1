//! Accelerated backend over the RustCrypto block cipher crates.
//!
//! ECB and CBC run natively (CBC through the `cbc` crate). Every other mode
//! is emulated by the generic driver over [`RawCipher`].

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{
    BlockCipher as RcBlockCipher, BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut,
    InnerIvInit, KeyInit,
};
use tracing::trace;

use crate::algorithm::Algorithm;
use crate::cipher::BlockCipher;
use crate::error::{CipherModeError, Result};
use crate::modes::Mode;

use super::{Backend, BackendSession, Direction};

const NAME: &str = "rustcrypto";

fn failure(reason: impl Into<String>) -> CipherModeError {
    CipherModeError::BackendOperationFailed {
        backend: NAME,
        reason: reason.into(),
    }
}

/// A keyed RustCrypto block cipher.
#[derive(Clone)]
pub enum RawCipher {
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
    Twofish(twofish::Twofish),
    Des(des::Des),
    TdesEde3(des::TdesEde3),
}

macro_rules! with_cipher {
    ($raw:expr, $c:ident => $body:expr) => {
        match $raw {
            RawCipher::Aes128($c) => $body,
            RawCipher::Aes192($c) => $body,
            RawCipher::Aes256($c) => $body,
            RawCipher::Twofish($c) => $body,
            RawCipher::Des($c) => $body,
            RawCipher::TdesEde3($c) => $body,
        }
    };
}

impl RawCipher {
    pub fn new(algorithm: Algorithm, key: &[u8]) -> Result<Self> {
        let keyed = match (algorithm, key.len()) {
            (Algorithm::Aes, 16) => aes::Aes128::new_from_slice(key).map(RawCipher::Aes128),
            (Algorithm::Aes, 24) => aes::Aes192::new_from_slice(key).map(RawCipher::Aes192),
            (Algorithm::Aes, 32) => aes::Aes256::new_from_slice(key).map(RawCipher::Aes256),
            (Algorithm::Twofish, _) => twofish::Twofish::new_from_slice(key).map(RawCipher::Twofish),
            (Algorithm::Des, _) => des::Des::new_from_slice(key).map(RawCipher::Des),
            (Algorithm::TripleDes, _) => des::TdesEde3::new_from_slice(key).map(RawCipher::TdesEde3),
            (algorithm, _) => return Err(failure(format!("{algorithm} is not provided"))),
        };
        keyed.map_err(|_| failure(format!("{algorithm} rejected a {}-byte key", key.len())))
    }

    fn supports(algorithm: Algorithm, key_length: usize) -> bool {
        match algorithm {
            Algorithm::Aes | Algorithm::Twofish => matches!(key_length, 16 | 24 | 32),
            Algorithm::Des => key_length == 8,
            Algorithm::TripleDes => key_length == 24,
            Algorithm::TripleDesInnerCbc | Algorithm::Rc4 => false,
        }
    }
}

impl BlockCipher for RawCipher {
    fn block_size(&self) -> usize {
        match self {
            RawCipher::Des(_) | RawCipher::TdesEde3(_) => 8,
            _ => 16,
        }
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        with_cipher!(self, c => c.encrypt_block(GenericArray::from_mut_slice(block)))
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        with_cipher!(self, c => c.decrypt_block(GenericArray::from_mut_slice(block)))
    }
}

/// Native chaining for one session.
trait Chain: Send {
    fn encrypt(&mut self, data: &mut [u8]);
    fn decrypt(&mut self, data: &mut [u8]);
}

struct Ecb(RawCipher);

impl Chain for Ecb {
    fn encrypt(&mut self, data: &mut [u8]) {
        let bs = self.0.block_size();
        for block in data.chunks_exact_mut(bs) {
            self.0.encrypt_block(block);
        }
    }

    fn decrypt(&mut self, data: &mut [u8]) {
        let bs = self.0.block_size();
        for block in data.chunks_exact_mut(bs) {
            self.0.decrypt_block(block);
        }
    }
}

struct Cbc<C>
where
    C: RcBlockCipher + BlockEncryptMut + BlockDecryptMut,
{
    encryptor: cbc::Encryptor<C>,
    decryptor: cbc::Decryptor<C>,
    block_size: usize,
}

impl<C> Cbc<C>
where
    C: RcBlockCipher + BlockEncryptMut + BlockDecryptMut + Clone + Send + 'static,
{
    fn boxed(cipher: &C, iv: &[u8], block_size: usize) -> Result<Box<dyn Chain>> {
        let encryptor = cbc::Encryptor::inner_iv_slice_init(cipher.clone(), iv)
            .map_err(|_| failure(format!("iv of {} bytes rejected", iv.len())))?;
        let decryptor = cbc::Decryptor::inner_iv_slice_init(cipher.clone(), iv)
            .map_err(|_| failure(format!("iv of {} bytes rejected", iv.len())))?;
        Ok(Box::new(Cbc {
            encryptor,
            decryptor,
            block_size,
        }))
    }
}

impl<C> Chain for Cbc<C>
where
    C: RcBlockCipher + BlockEncryptMut + BlockDecryptMut + Send,
{
    fn encrypt(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(self.block_size) {
            self.encryptor
                .encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }

    fn decrypt(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(self.block_size) {
            self.decryptor
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

fn chain(mode: Mode, raw: &RawCipher, iv: &[u8]) -> Result<Box<dyn Chain>> {
    match mode {
        Mode::Ecb => Ok(Box::new(Ecb(raw.clone()))),
        Mode::Cbc => with_cipher!(raw, c => Cbc::boxed(c, iv, raw.block_size())),
        other => Err(failure(format!("no native {other} mode"))),
    }
}

pub struct RustCryptoSession {
    mode: Mode,
    raw: RawCipher,
    chain: Box<dyn Chain>,
}

impl BackendSession for RustCryptoSession {
    fn transform(&mut self, direction: Direction, input: &[u8]) -> Result<Vec<u8>> {
        let bs = self.raw.block_size();
        if input.len() % bs != 0 {
            return Err(failure(format!(
                "{} bytes is not a multiple of the {bs}-byte block",
                input.len()
            )));
        }
        let mut output = input.to_vec();
        match direction {
            Direction::Encrypt => self.chain.encrypt(&mut output),
            Direction::Decrypt => self.chain.decrypt(&mut output),
        }
        Ok(output)
    }

    fn restart(&mut self, iv: &[u8]) -> Result<()> {
        self.chain = chain(self.mode, &self.raw, iv)?;
        Ok(())
    }

    fn close(&mut self) {
        trace!(mode = %self.mode, "rustcrypto session closed");
    }
}

/// RustCrypto `aes`, `twofish` and `des` ciphers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoBackend;

impl Backend for RustCryptoBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self, algorithm: Algorithm, mode: Mode, key_length: usize) -> bool {
        matches!(mode, Mode::Ecb | Mode::Cbc) && RawCipher::supports(algorithm, key_length)
    }

    fn supports_raw_block(&self, algorithm: Algorithm, key_length: usize) -> bool {
        RawCipher::supports(algorithm, key_length)
    }

    fn init(
        &self,
        algorithm: Algorithm,
        mode: Mode,
        key: &[u8],
        iv: &[u8],
    ) -> Result<Box<dyn BackendSession>> {
        let raw = RawCipher::new(algorithm, key)?;
        let chain = chain(mode, &raw, iv)?;
        Ok(Box::new(RustCryptoSession { mode, raw, chain }))
    }

    fn raw_block(&self, algorithm: Algorithm, key: &[u8]) -> Result<Box<dyn BlockCipher + Send>> {
        Ok(Box::new(RawCipher::new(algorithm, key)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::KeySchedule;
    use crate::primitives::{Aes, Des, TripleDes, Twofish};

    fn agree<C: BlockCipher>(software: &C, raw: &RawCipher) {
        let mut a: Vec<u8> = (0..software.block_size() as u8).collect();
        let mut b = a.clone();
        software.encrypt_block(&mut a);
        raw.encrypt_block(&mut b);
        assert_eq!(a, b);
        software.decrypt_block(&mut a);
        raw.decrypt_block(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn raw_blocks_match_software() {
        for len in [16, 24, 32] {
            let key: Vec<u8> = (0..len as u8).collect();
            agree(&Aes::derive(&key).unwrap(), &RawCipher::new(Algorithm::Aes, &key).unwrap());
            agree(
                &Twofish::derive(&key).unwrap(),
                &RawCipher::new(Algorithm::Twofish, &key).unwrap(),
            );
        }
        let key = hex::decode("0123456789abcdef23456789abcdef01456789abcdef0123").unwrap();
        agree(
            &TripleDes::derive(&key).unwrap(),
            &RawCipher::new(Algorithm::TripleDes, &key).unwrap(),
        );
        agree(
            &Des::derive(&key[..8]).unwrap(),
            &RawCipher::new(Algorithm::Des, &key[..8]).unwrap(),
        );
    }

    #[test]
    fn availability() {
        let backend = RustCryptoBackend;
        assert!(backend.is_available(Algorithm::Aes, Mode::Cbc, 16));
        assert!(!backend.is_available(Algorithm::Aes, Mode::Ctr, 16));
        assert!(backend.supports_raw_block(Algorithm::Aes, 16));
        assert!(!backend.supports_raw_block(Algorithm::Aes, 20));
        assert!(!backend.supports_raw_block(Algorithm::Rc4, 16));
        assert!(!backend.is_available(Algorithm::TripleDesInnerCbc, Mode::Cbc, 24));
    }

    #[test]
    fn session_rejects_misaligned_input() {
        let mut session = RustCryptoBackend
            .init(Algorithm::Des, Mode::Cbc, b"8bytekey", &[0u8; 8])
            .unwrap();
        assert!(matches!(
            session.transform(Direction::Encrypt, &[0u8; 5]),
            Err(CipherModeError::BackendOperationFailed { backend: "rustcrypto", .. })
        ));
    }
}
