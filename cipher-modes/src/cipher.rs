//! Block and stream primitive traits

use crate::error::Result;

/// Trait for a keyed block cipher
///
/// Implementations own their expanded key schedule. Callers always pass
/// exactly `block_size()` bytes; the transform happens in place.
pub trait BlockCipher {
    /// Returns the block size of the cipher in bytes
    fn block_size(&self) -> usize;

    /// Encrypts a single block in place
    fn encrypt_block(&self, block: &mut [u8]);

    /// Decrypts a single block in place
    fn decrypt_block(&self, block: &mut [u8]);
}

/// Key schedule derivation for a block primitive.
pub trait KeySchedule: BlockCipher + Sized {
    /// Expands raw key bytes into the round keys the primitive needs.
    fn derive(key: &[u8]) -> Result<Self>;
}

/// A primitive that produces keystream over arbitrary-length input.
///
/// Used by [`Mode::Stream`](crate::Mode::Stream). The state advances with
/// every byte processed; cloning captures the current position.
pub trait KeystreamCipher: Send {
    /// XORs the next `data.len()` keystream bytes into `data`.
    fn apply_keystream(&mut self, data: &mut [u8]);

    fn box_clone(&self) -> Box<dyn KeystreamCipher>;
}

impl Clone for Box<dyn KeystreamCipher> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
