//! Error types for cipher engine operations

use thiserror::Error;

use crate::algorithm::Algorithm;
use crate::modes::Mode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherModeError {
    #[error("Invalid key length: {length} bytes is not accepted by {algorithm}")]
    InvalidKeyLength { algorithm: Algorithm, length: usize },

    #[error("Input length {length} is not a multiple of the {block_size}-byte block size")]
    MisalignedInput { length: usize, block_size: usize },

    /// The last plaintext byte is 0 or exceeds the block size. Usually a wrong
    /// key or corrupted ciphertext.
    #[error("Invalid padding")]
    InvalidPadding,

    #[error("Backend {backend} failed: {reason}")]
    BackendOperationFailed { backend: &'static str, reason: String },

    #[error("Mode {mode} is not supported by {algorithm}")]
    UnsupportedMode { algorithm: Algorithm, mode: Mode },

    #[error("Stream mode needs a keystream primitive, not a block cipher")]
    StreamModeOnBlockCipher,

    #[error("No key has been set")]
    KeyNotSet,

    /// A previous backend failure left the continuous stream in an unknown
    /// position. Cleared by `set_iv`, `set_key`, `reset` or disabling
    /// continuous buffering.
    #[error("Stream state is desynchronized; reset the IV before continuing")]
    StreamDesynchronized,

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHash(String),

    #[error("Derived key too long: {requested} bytes requested, at most {max} available")]
    DerivedKeyTooLong { requested: usize, max: usize },

    #[error("Iteration count must be at least 1")]
    InvalidIterationCount,

    #[error("Unknown cipher mode: {0}")]
    UnknownMode(String),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Unknown engine: {0}")]
    UnknownEngine(String),
}

pub type Result<T> = std::result::Result<T, CipherModeError>;
