//! RC4 keystream primitive for stream mode

use zeroize::Zeroize;

use crate::algorithm::Algorithm;
use crate::cipher::KeystreamCipher;
use crate::error::{CipherModeError, Result};

pub const MAX_KEY_SIZE: usize = 256;

#[derive(Clone)]
pub struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Runs the key-scheduling algorithm over a 1..=256 byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.is_empty() || key.len() > MAX_KEY_SIZE {
            return Err(CipherModeError::InvalidKeyLength {
                algorithm: Algorithm::Rc4,
                length: key.len(),
            });
        }

        let mut state = [0u8; 256];
        for (i, s) in state.iter_mut().enumerate() {
            *s = i as u8;
        }
        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        Ok(Rc4 { state, i: 0, j: 0 })
    }
}

impl KeystreamCipher for Rc4 {
    fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.state[self.i as usize]);
            self.state.swap(self.i as usize, self.j as usize);
            let k = self.state[self.state[self.i as usize].wrapping_add(self.state[self.j as usize]) as usize];
            *byte ^= k;
        }
    }

    fn box_clone(&self) -> Box<dyn KeystreamCipher> {
        Box::new(self.clone())
    }
}

impl Drop for Rc4 {
    fn drop(&mut self) {
        self.state.zeroize();
        self.i = 0;
        self.j = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keystream_xor(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut rc4 = Rc4::new(key).unwrap();
        let mut out = data.to_vec();
        rc4.apply_keystream(&mut out);
        out
    }

    #[test]
    fn known_answers() {
        assert_eq!(hex::encode(keystream_xor(b"Key", b"Plaintext")), "bbf316e8d940af0ad3");
        assert_eq!(
            hex::encode(keystream_xor(b"Secret", b"Attack at dawn")),
            "45a01f645fc35b383552544b9bf5"
        );
    }

    #[test]
    fn split_application_matches_single_call() {
        let mut rc4 = Rc4::new(b"Secret").unwrap();
        let mut first = b"Attack ".to_vec();
        let mut second = b"at dawn".to_vec();
        rc4.apply_keystream(&mut first);
        rc4.apply_keystream(&mut second);
        first.extend(second);
        assert_eq!(hex::encode(first), "45a01f645fc35b383552544b9bf5");
    }

    #[test]
    fn rejects_empty_and_oversized_keys() {
        assert!(Rc4::new(&[]).is_err());
        assert!(Rc4::new(&[0u8; 257]).is_err());
    }
}
