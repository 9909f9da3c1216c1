//! Algorithm identities and their key rules

use std::fmt;
use std::str::FromStr;

use tracing::trace;
use zeroize::Zeroizing;

use crate::cipher::{BlockCipher, KeySchedule, KeystreamCipher};
use crate::error::{CipherModeError, Result};
use crate::modes::Mode;
use crate::primitives::{aes, des, rc4, twofish, Aes, Des, Rc4, TripleDes, Twofish};

/// Symmetric algorithm served by a [`CipherContext`](crate::CipherContext)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Aes,
    Twofish,
    Des,
    /// Triple DES, EDE3 block composition
    TripleDes,
    /// Triple DES as three chained CBC layers, one per DES key
    TripleDesInnerCbc,
    Rc4,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Aes,
        Algorithm::Twofish,
        Algorithm::Des,
        Algorithm::TripleDes,
        Algorithm::TripleDesInnerCbc,
        Algorithm::Rc4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Aes => "aes",
            Algorithm::Twofish => "twofish",
            Algorithm::Des => "des",
            Algorithm::TripleDes => "3des",
            Algorithm::TripleDesInnerCbc => "3des-inner-cbc",
            Algorithm::Rc4 => "rc4",
        }
    }

    /// Block size in bytes; 1 for the stream primitive.
    pub fn block_size(self) -> usize {
        match self {
            Algorithm::Aes => aes::BLOCK_SIZE,
            Algorithm::Twofish => twofish::BLOCK_SIZE,
            Algorithm::Des | Algorithm::TripleDes | Algorithm::TripleDesInnerCbc => des::BLOCK_SIZE,
            Algorithm::Rc4 => 1,
        }
    }

    pub fn is_stream(self) -> bool {
        self == Algorithm::Rc4
    }

    /// Key length used when none was set explicitly.
    pub fn default_key_length(self) -> usize {
        match self {
            Algorithm::Aes | Algorithm::Twofish | Algorithm::Rc4 => 16,
            Algorithm::Des => des::KEY_SIZE,
            Algorithm::TripleDes | Algorithm::TripleDesInnerCbc => 3 * des::KEY_SIZE,
        }
    }

    /// Whether `length` bytes is a key this algorithm accepts.
    pub fn accepts_key_length(self, length: usize) -> bool {
        match self {
            Algorithm::Aes => matches!(length, 16 | 24 | 32),
            // longer keys are truncated
            Algorithm::Twofish => length > 0,
            Algorithm::Des => length == des::KEY_SIZE,
            Algorithm::TripleDes | Algorithm::TripleDesInnerCbc => matches!(length, 8 | 16 | 24),
            Algorithm::Rc4 => (1..=rc4::MAX_KEY_SIZE).contains(&length),
        }
    }

    pub fn supports(self, mode: Mode) -> bool {
        match self {
            _ if self.is_stream() => mode == Mode::Stream,
            Algorithm::TripleDesInnerCbc => mode == Mode::Cbc,
            _ => mode != Mode::Stream,
        }
    }

    pub fn check_mode(self, mode: Mode) -> Result<()> {
        if self.supports(mode) {
            Ok(())
        } else {
            Err(CipherModeError::UnsupportedMode {
                algorithm: self,
                mode,
            })
        }
    }

    /// Validates `key` and brings it to the form the primitive consumes:
    /// Twofish keys are null-padded, Triple DES keys expanded to 24 bytes.
    pub fn normalize_key(self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Algorithm::Twofish => Ok(Zeroizing::new(twofish::normalize_key(key)?)),
            Algorithm::TripleDes | Algorithm::TripleDesInnerCbc => {
                Ok(Zeroizing::new(des::expand_triple_key(self, key)?))
            }
            _ if self.accepts_key_length(key.len()) => Ok(Zeroizing::new(key.to_vec())),
            _ => Err(CipherModeError::InvalidKeyLength {
                algorithm: self,
                length: key.len(),
            }),
        }
    }

    /// Derives the software block primitive for a normalized key.
    pub fn block_cipher(self, key: &[u8]) -> Result<Box<dyn BlockCipher + Send>> {
        trace!(algorithm = %self, key_len = key.len(), "deriving key schedule");
        Ok(match self {
            Algorithm::Aes => Box::new(Aes::derive(key)?),
            Algorithm::Twofish => Box::new(Twofish::derive(key)?),
            Algorithm::Des => Box::new(Des::derive(key)?),
            Algorithm::TripleDes => Box::new(TripleDes::derive(key)?),
            Algorithm::TripleDesInnerCbc | Algorithm::Rc4 => {
                return Err(CipherModeError::UnsupportedMode {
                    algorithm: self,
                    mode: Mode::Ecb,
                })
            }
        })
    }

    /// The three independent DES layers of the inner-CBC variant.
    pub fn inner_cbc_layers(self, key: &[u8]) -> Result<[Des; 3]> {
        trace!(algorithm = %self, "deriving inner-CBC key schedules");
        des::triple_schedules(self, key)
    }

    /// Derives the keystream primitive for STREAM mode.
    pub fn keystream(self, key: &[u8]) -> Result<Box<dyn KeystreamCipher>> {
        match self {
            Algorithm::Rc4 => {
                trace!(algorithm = %self, key_len = key.len(), "deriving key schedule");
                Ok(Box::new(Rc4::new(key)?))
            }
            _ => Err(CipherModeError::UnsupportedMode {
                algorithm: self,
                mode: Mode::Stream,
            }),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CipherModeError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let algorithm = match lower.as_str() {
            "rijndael" => Algorithm::Aes,
            "tripledes" | "des3" | "des-ede3" => Algorithm::TripleDes,
            "3cbc" => Algorithm::TripleDesInnerCbc,
            "arcfour" => Algorithm::Rc4,
            other => Algorithm::ALL
                .iter()
                .copied()
                .find(|a| a.as_str() == other)
                .ok_or_else(|| CipherModeError::UnknownAlgorithm(s.to_string()))?,
        };
        Ok(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.as_str().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert_eq!("DES3".parse::<Algorithm>().unwrap(), Algorithm::TripleDes);
        assert_eq!(
            "blowfish".parse::<Algorithm>(),
            Err(CipherModeError::UnknownAlgorithm("blowfish".into()))
        );
    }

    #[test]
    fn only_rc4_is_a_stream_primitive() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.is_stream(), algorithm == Algorithm::Rc4);
            assert_eq!(algorithm.supports(Mode::Stream), algorithm.is_stream());
        }
    }

    #[test]
    fn mode_support_matrix() {
        assert!(Algorithm::Aes.supports(Mode::Cfb8));
        assert!(!Algorithm::Aes.supports(Mode::Stream));
        assert!(Algorithm::Rc4.supports(Mode::Stream));
        assert!(!Algorithm::Rc4.supports(Mode::Cbc));
        assert!(Algorithm::TripleDesInnerCbc.supports(Mode::Cbc));
        assert_eq!(
            Algorithm::TripleDesInnerCbc.check_mode(Mode::Ctr),
            Err(CipherModeError::UnsupportedMode {
                algorithm: Algorithm::TripleDesInnerCbc,
                mode: Mode::Ctr,
            })
        );
    }

    #[test]
    fn key_normalization() {
        assert_eq!(Algorithm::Twofish.normalize_key(b"abc").unwrap().len(), 16);
        assert_eq!(Algorithm::Twofish.normalize_key(&[1; 40]).unwrap().len(), 32);
        assert_eq!(Algorithm::TripleDes.normalize_key(&[1; 16]).unwrap().len(), 24);
        assert_eq!(Algorithm::Aes.normalize_key(&[0; 24]).unwrap().len(), 24);
        assert_eq!(
            Algorithm::Aes.normalize_key(&[0; 20]).map(|k| k.len()),
            Err(CipherModeError::InvalidKeyLength {
                algorithm: Algorithm::Aes,
                length: 20,
            })
        );
        assert!(Algorithm::Des.normalize_key(&[0; 16]).is_err());
        assert!(Algorithm::Rc4.normalize_key(&[]).is_err());
    }

    #[test]
    fn block_sizes() {
        assert_eq!(Algorithm::Aes.block_size(), 16);
        assert_eq!(Algorithm::Twofish.block_size(), 16);
        assert_eq!(Algorithm::TripleDesInnerCbc.block_size(), 8);
        assert_eq!(Algorithm::Rc4.block_size(), 1);
    }
}
