//! Engine selection between the software primitives and accelerated
//! backends.
//!
//! A [`Backend`] is probed with [`Backend::is_available`] for native support
//! of an algorithm/mode/key-length triple. Backends that only offer a raw
//! single-block call are still usable: the generic [`ModeDriver`] then
//! emulates the mode on top of it.
//!
//! [`ModeDriver`]: crate::ModeDriver

use std::fmt;
use std::str::FromStr;

use crate::algorithm::Algorithm;
use crate::cipher::BlockCipher;
use crate::error::{CipherModeError, Result};
use crate::modes::Mode;

mod selector;

#[cfg(feature = "rustcrypto")]
pub mod rustcrypto;

pub use selector::{EngineSelector, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// Built-in primitives driven by [`ModeDriver`](crate::ModeDriver)
    Software,
    /// A registered [`Backend`]
    Accelerated,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Software => f.write_str("software"),
            Engine::Accelerated => f.write_str("accelerated"),
        }
    }
}

impl FromStr for Engine {
    type Err = CipherModeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "software" => Ok(Engine::Software),
            "accelerated" => Ok(Engine::Accelerated),
            _ => Err(CipherModeError::UnknownEngine(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// An external implementation of one or more algorithms.
///
/// Keys handed to a backend are already normalized by
/// [`Algorithm::normalize_key`].
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Native support for `mode` with a key of `key_length` bytes.
    fn is_available(&self, algorithm: Algorithm, mode: Mode, key_length: usize) -> bool;

    /// Whether [`Backend::raw_block`] works for this algorithm and key length.
    fn supports_raw_block(&self, algorithm: Algorithm, key_length: usize) -> bool;

    /// Opens a native session positioned at `iv`.
    fn init(
        &self,
        algorithm: Algorithm,
        mode: Mode,
        key: &[u8],
        iv: &[u8],
    ) -> Result<Box<dyn BackendSession>>;

    /// Single-block access used to emulate modes the backend lacks.
    fn raw_block(&self, algorithm: Algorithm, key: &[u8]) -> Result<Box<dyn BlockCipher + Send>>;
}

/// A live backend handle. Chaining state persists across
/// [`transform`](BackendSession::transform) calls until
/// [`restart`](BackendSession::restart).
pub trait BackendSession: Send {
    /// Input is block aligned; padding is handled by the caller.
    fn transform(&mut self, direction: Direction, input: &[u8]) -> Result<Vec<u8>>;

    /// Rewinds both directions to `iv`.
    fn restart(&mut self, iv: &[u8]) -> Result<()>;

    /// Releases backend resources. Called exactly once, by [`SessionGuard`].
    fn close(&mut self);
}

/// Owns a [`BackendSession`] and closes it when dropped.
pub struct SessionGuard {
    backend: &'static str,
    session: Box<dyn BackendSession>,
}

impl SessionGuard {
    pub fn new(backend: &'static str, session: Box<dyn BackendSession>) -> Self {
        SessionGuard { backend, session }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn session_mut(&mut self) -> &mut dyn BackendSession {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        tracing::trace!(backend = self.backend, "closing backend session");
        self.session.close();
    }
}
