//! Cipher modes implementation
//!
//! [`ModeDriver`] chains a [`BlockCipher`] over arbitrary input. It keeps an
//! independent [`StreamState`] per direction so that, with continuous
//! buffering, a sequence of calls behaves like one call over the
//! concatenated input.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::cipher::{BlockCipher, KeystreamCipher};
use crate::error::{CipherModeError, Result};

pub mod cbc;
pub mod cfb;
pub mod cfb8;
pub mod ctr;
pub mod ecb;
pub mod ofb;
pub mod stream;

/// Mode of operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Ecb,
    Cbc,
    Ctr,
    /// Full-block feedback CFB
    Cfb,
    /// 8-bit feedback CFB
    Cfb8,
    Ofb,
    /// Keystream primitive applied directly, no chaining
    Stream,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Ecb,
        Mode::Cbc,
        Mode::Ctr,
        Mode::Cfb,
        Mode::Cfb8,
        Mode::Ofb,
        Mode::Stream,
    ];

    /// ECB and CBC work on whole blocks and take PKCS#7 padding.
    pub fn is_block_mode(self) -> bool {
        matches!(self, Mode::Ecb | Mode::Cbc)
    }

    pub fn uses_iv(self) -> bool {
        !matches!(self, Mode::Ecb | Mode::Stream)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Ecb => "ecb",
            Mode::Cbc => "cbc",
            Mode::Ctr => "ctr",
            Mode::Cfb => "cfb",
            Mode::Cfb8 => "cfb8",
            Mode::Ofb => "ofb",
            Mode::Stream => "stream",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CipherModeError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Mode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == lower)
            .ok_or_else(|| CipherModeError::UnknownMode(s.to_string()))
    }
}

/// Chaining state for one direction.
///
/// `iv` is the working register: the previous ciphertext block (CBC, CFB),
/// the counter (CTR), the last keystream block (OFB) or the shift register
/// (CFB8). `carry` holds the current CTR keystream block. `pos` is the
/// number of bytes of the current keystream block already consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    pub(crate) iv: Vec<u8>,
    pub(crate) carry: Vec<u8>,
    pub(crate) pos: usize,
}

impl StreamState {
    pub fn new(iv: &[u8]) -> Self {
        StreamState {
            iv: iv.to_vec(),
            carry: vec![0u8; iv.len()],
            pos: 0,
        }
    }

    pub fn reset(&mut self, iv: &[u8]) {
        self.iv.clear();
        self.iv.extend_from_slice(iv);
        self.carry.clear();
        self.carry.resize(iv.len(), 0);
        self.pos = 0;
    }

    /// Current chaining register.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Offset into the current keystream block.
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Chaining driver over a block cipher
#[derive(Debug, Clone)]
pub struct ModeDriver {
    mode: Mode,
    encrypt_state: StreamState,
    decrypt_state: StreamState,
}

impl ModeDriver {
    /// `iv` must already be exactly one block long.
    pub fn new(mode: Mode, iv: &[u8]) -> Self {
        ModeDriver {
            mode,
            encrypt_state: StreamState::new(iv),
            decrypt_state: StreamState::new(iv),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Restores both directions to `iv` and drops any buffered keystream.
    pub fn reset(&mut self, iv: &[u8]) {
        trace!(mode = %self.mode, "resetting chaining state");
        self.encrypt_state.reset(iv);
        self.decrypt_state.reset(iv);
    }

    pub fn encrypt_state(&self) -> &StreamState {
        &self.encrypt_state
    }

    pub fn decrypt_state(&self) -> &StreamState {
        &self.decrypt_state
    }

    /// Encrypts `data` in place. Block modes require aligned input.
    pub fn encrypt(&mut self, cipher: &dyn BlockCipher, data: &mut [u8]) -> Result<()> {
        self.check_alignment(cipher, data)?;
        let state = &mut self.encrypt_state;
        match self.mode {
            Mode::Ecb => ecb::encrypt(cipher, data),
            Mode::Cbc => cbc::encrypt(cipher, state, data),
            Mode::Ctr => ctr::apply(cipher, state, data),
            Mode::Cfb => cfb::encrypt(cipher, state, data),
            Mode::Cfb8 => cfb8::encrypt(cipher, state, data),
            Mode::Ofb => ofb::apply(cipher, state, data),
            Mode::Stream => return Err(CipherModeError::StreamModeOnBlockCipher),
        }
        Ok(())
    }

    /// Decrypts `data` in place. Block modes require aligned input.
    pub fn decrypt(&mut self, cipher: &dyn BlockCipher, data: &mut [u8]) -> Result<()> {
        self.check_alignment(cipher, data)?;
        let state = &mut self.decrypt_state;
        match self.mode {
            Mode::Ecb => ecb::decrypt(cipher, data),
            Mode::Cbc => cbc::decrypt(cipher, state, data),
            Mode::Ctr => ctr::apply(cipher, state, data),
            // CFB always runs the forward transform on its feedback register
            Mode::Cfb => cfb::decrypt(cipher, state, data),
            Mode::Cfb8 => cfb8::decrypt(cipher, state, data),
            Mode::Ofb => ofb::apply(cipher, state, data),
            Mode::Stream => return Err(CipherModeError::StreamModeOnBlockCipher),
        }
        Ok(())
    }

    fn check_alignment(&self, cipher: &dyn BlockCipher, data: &[u8]) -> Result<()> {
        let block_size = cipher.block_size();
        if self.mode.is_block_mode() && data.len() % block_size != 0 {
            return Err(CipherModeError::MisalignedInput {
                length: data.len(),
                block_size,
            });
        }
        Ok(())
    }
}

/// Keystream states for [`Mode::Stream`]: the freshly keyed primitive plus
/// one working copy per direction.
#[derive(Clone)]
pub struct StreamDriver {
    keyed: Box<dyn KeystreamCipher>,
    encrypt_state: Box<dyn KeystreamCipher>,
    decrypt_state: Box<dyn KeystreamCipher>,
}

impl StreamDriver {
    pub fn new(keyed: Box<dyn KeystreamCipher>) -> Self {
        StreamDriver {
            encrypt_state: keyed.clone(),
            decrypt_state: keyed.clone(),
            keyed,
        }
    }

    pub fn reset(&mut self) {
        trace!("resetting keystream state");
        self.encrypt_state = self.keyed.clone();
        self.decrypt_state = self.keyed.clone();
    }

    pub fn encrypt(&mut self, data: &mut [u8]) {
        stream::apply(self.encrypt_state.as_mut(), data);
    }

    pub fn decrypt(&mut self, data: &mut [u8]) {
        stream::apply(self.decrypt_state.as_mut(), data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::KeySchedule;
    use crate::primitives::{Aes, Des};

    #[test]
    fn mode_names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
        assert_eq!("CBC".parse::<Mode>().unwrap(), Mode::Cbc);
        assert!(matches!(
            "xts".parse::<Mode>(),
            Err(CipherModeError::UnknownMode(_))
        ));
    }

    #[test]
    fn ecb_and_stream_take_no_iv() {
        let with_iv: Vec<Mode> = Mode::ALL.into_iter().filter(|m| m.uses_iv()).collect();
        assert_eq!(with_iv, [Mode::Cbc, Mode::Ctr, Mode::Cfb, Mode::Cfb8, Mode::Ofb]);
    }

    #[test]
    fn block_modes_reject_misaligned_input() {
        let aes = Aes::derive(&[0u8; 16]).unwrap();
        let mut driver = ModeDriver::new(Mode::Cbc, &[0u8; 16]);
        let mut data = vec![0u8; 15];
        assert_eq!(
            driver.encrypt(&aes, &mut data),
            Err(CipherModeError::MisalignedInput {
                length: 15,
                block_size: 16
            })
        );
    }

    #[test]
    fn directions_keep_independent_state() {
        let des = Des::derive(b"abcdefgh").unwrap();
        let iv = [7u8; 8];
        let mut driver = ModeDriver::new(Mode::Ofb, &iv);

        let mut data = vec![0u8; 5];
        driver.encrypt(&des, &mut data).unwrap();
        assert_eq!(driver.encrypt_state().position(), 5);
        assert_eq!(driver.decrypt_state().position(), 0);
        assert_eq!(driver.decrypt_state().iv(), &iv);

        driver.reset(&iv);
        assert_eq!(driver.encrypt_state().position(), 0);
        assert_eq!(driver.encrypt_state().iv(), &iv);
    }

    #[test]
    fn stream_mode_needs_a_keystream_primitive() {
        let aes = Aes::derive(&[0u8; 16]).unwrap();
        let mut driver = ModeDriver::new(Mode::Stream, &[0u8; 16]);
        assert_eq!(
            driver.encrypt(&aes, &mut [0u8; 4]),
            Err(CipherModeError::StreamModeOnBlockCipher)
        );
    }
}
