//! The byte-in, byte-out cipher contract.

use tracing::{error, warn};
use zeroize::Zeroizing;

use crate::algorithm::Algorithm;
use crate::cipher::BlockCipher;
use crate::engine::{Direction, Engine, EngineSelector, Selection, SessionGuard};
use crate::error::{CipherModeError, Result};
use crate::kdf::{self, PasswordOptions};
use crate::modes::{Mode, ModeDriver, StreamDriver};
use crate::primitives::Des;
use crate::utils;

/// Keyed chaining machinery built on the first call after a change.
enum Transform {
    /// Software primitive, or a backend's raw block call, under the generic
    /// driver
    Chained {
        cipher: Box<dyn BlockCipher + Send>,
        driver: ModeDriver,
    },
    /// Three DES layers, each with its own CBC chain
    InnerCbc {
        layers: [Des; 3],
        drivers: [ModeDriver; 3],
    },
    Stream(StreamDriver),
    Native(SessionGuard),
}

impl Transform {
    fn restart(&mut self, iv: &[u8]) -> Result<()> {
        match self {
            Transform::Chained { driver, .. } => driver.reset(iv),
            Transform::InnerCbc { drivers, .. } => drivers.iter_mut().for_each(|d| d.reset(iv)),
            Transform::Stream(driver) => driver.reset(),
            Transform::Native(guard) => guard.session_mut().restart(iv)?,
        }
        Ok(())
    }

    fn apply(&mut self, direction: Direction, mut data: Vec<u8>) -> Result<Vec<u8>> {
        match (self, direction) {
            (Transform::Chained { cipher, driver }, Direction::Encrypt) => {
                driver.encrypt(&**cipher, &mut data)?
            }
            (Transform::Chained { cipher, driver }, Direction::Decrypt) => {
                driver.decrypt(&**cipher, &mut data)?
            }
            (Transform::InnerCbc { layers, drivers }, Direction::Encrypt) => {
                drivers[0].encrypt(&layers[0], &mut data)?;
                drivers[1].decrypt(&layers[1], &mut data)?;
                drivers[2].encrypt(&layers[2], &mut data)?;
            }
            (Transform::InnerCbc { layers, drivers }, Direction::Decrypt) => {
                drivers[2].decrypt(&layers[2], &mut data)?;
                drivers[1].encrypt(&layers[1], &mut data)?;
                drivers[0].decrypt(&layers[0], &mut data)?;
            }
            (Transform::Stream(driver), Direction::Encrypt) => driver.encrypt(&mut data),
            (Transform::Stream(driver), Direction::Decrypt) => driver.decrypt(&mut data),
            (Transform::Native(guard), direction) => {
                return guard.session_mut().transform(direction, &data)
            }
        }
        Ok(data)
    }
}

/// One cipher session: algorithm, mode, key, IV and chaining state.
///
/// Setters only record the change; the key schedule, engine and chaining
/// state are (re)built lazily on the next [`encrypt`](Self::encrypt) or
/// [`decrypt`](Self::decrypt). Not synchronized: share across threads only
/// behind a lock.
///
/// ```rust
/// use cipher_modes::{Algorithm, CipherContext, Mode};
///
/// let mut ctx = CipherContext::new(Algorithm::Twofish, Mode::Cbc)?;
/// ctx.set_key(b"0123456789abcdef")?;
/// ctx.set_iv(b"initialization16");
///
/// let ciphertext = ctx.encrypt(b"Hello, World!")?;
/// assert_eq!(ciphertext.len(), 16);
/// assert_eq!(ctx.decrypt(&ciphertext)?, b"Hello, World!");
/// # Ok::<(), cipher_modes::CipherModeError>(())
/// ```
pub struct CipherContext {
    algorithm: Algorithm,
    mode: Mode,
    key: Option<Zeroizing<Vec<u8>>>,
    key_length: usize,
    iv: Vec<u8>,
    continuous_buffer: bool,
    padding: bool,
    preferred_engine: Option<Engine>,
    selector: EngineSelector,
    engine: Option<Engine>,
    transform: Option<Transform>,
    changed: bool,
    restart: bool,
    desynchronized: bool,
}

impl CipherContext {
    /// A context using the backends compiled into this build.
    pub fn new(algorithm: Algorithm, mode: Mode) -> Result<Self> {
        Self::with_selector(algorithm, mode, EngineSelector::detect())
    }

    pub fn with_selector(algorithm: Algorithm, mode: Mode, selector: EngineSelector) -> Result<Self> {
        algorithm.check_mode(mode)?;
        Ok(CipherContext {
            algorithm,
            mode,
            key: None,
            key_length: algorithm.default_key_length(),
            iv: vec![0u8; algorithm.block_size()],
            continuous_buffer: false,
            padding: true,
            preferred_engine: None,
            selector,
            engine: None,
            transform: None,
            changed: true,
            restart: false,
            desynchronized: false,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn block_size(&self) -> usize {
        self.algorithm.block_size()
    }

    /// Key length in bytes used for password derivation.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn is_continuous_buffer(&self) -> bool {
        self.continuous_buffer
    }

    pub fn is_padding(&self) -> bool {
        self.padding
    }

    /// Sets the key. Invalid lengths are rejected here, not at encrypt time.
    ///
    /// The key length becomes that of the normalized key, so a short
    /// Twofish key counts as 16/24/32 bytes and a Triple DES key as 24.
    pub fn set_key(&mut self, key: &[u8]) -> Result<()> {
        let normalized = self.algorithm.normalize_key(key)?;
        self.key_length = normalized.len();
        self.key = Some(normalized);
        self.desynchronized = false;
        self.mark_changed();
        Ok(())
    }

    /// Sets the key length in bits used by [`set_password`](Self::set_password).
    pub fn set_key_length(&mut self, bits: usize) -> Result<()> {
        let bytes = bits / 8;
        if bits % 8 != 0 || !self.algorithm.accepts_key_length(bytes) {
            return Err(CipherModeError::InvalidKeyLength {
                algorithm: self.algorithm,
                length: bytes,
            });
        }
        self.key_length = bytes;
        Ok(())
    }

    /// Derives the key from a password.
    pub fn set_password(&mut self, password: &[u8], options: &PasswordOptions) -> Result<()> {
        let length = options.key_length.unwrap_or(self.key_length);
        let key = Zeroizing::new(kdf::derive_with(options, password, length)?);
        self.set_key(&key)
    }

    /// Null-pads or truncates `iv` to one block. Ignored by ECB and STREAM.
    pub fn set_iv(&mut self, iv: &[u8]) {
        self.iv = utils::fit_iv(iv, self.block_size());
        self.restart = true;
        self.desynchronized = false;
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.algorithm.check_mode(mode)?;
        self.mode = mode;
        self.mark_changed();
        Ok(())
    }

    /// Carries chaining state across calls, treating them as one stream.
    pub fn enable_continuous_buffer(&mut self) {
        self.continuous_buffer = true;
        self.mark_changed();
    }

    /// Every call starts again from the IV.
    pub fn disable_continuous_buffer(&mut self) {
        self.continuous_buffer = false;
        self.desynchronized = false;
        self.mark_changed();
    }

    pub fn enable_padding(&mut self) {
        self.padding = true;
    }

    pub fn disable_padding(&mut self) {
        self.padding = false;
    }

    /// Pins an engine; `None` restores automatic selection.
    pub fn set_preferred_engine(&mut self, engine: Option<Engine>) {
        self.preferred_engine = engine;
        self.mark_changed();
    }

    /// The engine in use, once selected after the last change.
    pub fn engine(&self) -> Option<Engine> {
        if self.changed {
            None
        } else {
            self.engine
        }
    }

    pub fn is_valid_engine(&self, engine: Engine) -> bool {
        let key_length = match &self.key {
            Some(key) => key.len(),
            None => self.key_length,
        };
        self.selector
            .is_valid(engine, self.algorithm, self.mode, key_length)
    }

    /// Rewinds chaining state to the IV and clears a desynchronized stream.
    pub fn reset(&mut self) {
        self.restart = true;
        self.desynchronized = false;
    }

    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.ensure_ready()?;
        let block_size = self.block_size();
        let data = if self.mode.is_block_mode() && self.padding {
            utils::add_padding(plaintext, block_size)
        } else {
            plaintext.to_vec()
        };
        self.check_alignment(data.len())?;
        self.run(Direction::Encrypt, data)
    }

    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.ensure_ready()?;
        self.check_alignment(ciphertext.len())?;
        let plaintext = self.run(Direction::Decrypt, ciphertext.to_vec())?;
        if self.mode.is_block_mode() && self.padding {
            utils::remove_padding(plaintext, self.block_size())
        } else {
            Ok(plaintext)
        }
    }

    fn mark_changed(&mut self) {
        self.changed = true;
    }

    fn check_alignment(&self, length: usize) -> Result<()> {
        let block_size = self.block_size();
        if self.mode.is_block_mode() && length % block_size != 0 {
            return Err(CipherModeError::MisalignedInput { length, block_size });
        }
        Ok(())
    }

    fn run(&mut self, direction: Direction, data: Vec<u8>) -> Result<Vec<u8>> {
        let transform = self.transform.as_mut().ok_or(CipherModeError::KeyNotSet)?;
        let result = transform.apply(direction, data);
        if let Err(CipherModeError::BackendOperationFailed { backend, reason }) = &result {
            if self.continuous_buffer {
                error!(backend, %reason, ?direction, "backend failed mid-stream, stream desynchronized");
                self.desynchronized = true;
            }
        }
        result
    }

    fn ensure_ready(&mut self) -> Result<()> {
        if self.desynchronized {
            return Err(CipherModeError::StreamDesynchronized);
        }
        if self.key.is_none() {
            return Err(CipherModeError::KeyNotSet);
        }
        if self.changed || self.transform.is_none() {
            return self.setup();
        }
        if !self.continuous_buffer || self.restart {
            if let Some(transform) = self.transform.as_mut() {
                transform.restart(&self.iv)?;
            }
            self.restart = false;
        }
        Ok(())
    }

    /// Selects the engine and builds fresh chaining state from the IV.
    fn setup(&mut self) -> Result<()> {
        // release the previous backend before acquiring a new one
        self.transform = None;
        self.engine = None;

        let key = self.key.as_ref().ok_or(CipherModeError::KeyNotSet)?;
        let selection = self
            .selector
            .select(self.algorithm, self.mode, key.len(), self.preferred_engine);

        let (engine, transform) = match selection {
            Selection::Software => (Engine::Software, self.software(key)?),
            Selection::Accelerated {
                backend,
                emulate: false,
            } => match backend.init(self.algorithm, self.mode, key, &self.iv) {
                Ok(session) => (
                    Engine::Accelerated,
                    Transform::Native(SessionGuard::new(backend.name(), session)),
                ),
                Err(err) => {
                    warn!(backend = backend.name(), error = %err, "backend init failed, using software");
                    (Engine::Software, self.software(key)?)
                }
            },
            Selection::Accelerated {
                backend,
                emulate: true,
            } => match backend.raw_block(self.algorithm, key) {
                Ok(cipher) => (
                    Engine::Accelerated,
                    Transform::Chained {
                        cipher,
                        driver: ModeDriver::new(self.mode, &self.iv),
                    },
                ),
                Err(err) => {
                    warn!(backend = backend.name(), error = %err, "backend init failed, using software");
                    (Engine::Software, self.software(key)?)
                }
            },
        };

        self.transform = Some(transform);
        self.engine = Some(engine);
        self.changed = false;
        self.restart = false;
        Ok(())
    }

    fn software(&self, key: &[u8]) -> Result<Transform> {
        let transform = match (self.algorithm, self.mode) {
            (Algorithm::TripleDesInnerCbc, _) => Transform::InnerCbc {
                layers: self.algorithm.inner_cbc_layers(key)?,
                drivers: [
                    ModeDriver::new(Mode::Cbc, &self.iv),
                    ModeDriver::new(Mode::Cbc, &self.iv),
                    ModeDriver::new(Mode::Cbc, &self.iv),
                ],
            },
            (_, Mode::Stream) => Transform::Stream(StreamDriver::new(self.algorithm.keystream(key)?)),
            _ => Transform::Chained {
                cipher: self.algorithm.block_cipher(key)?,
                driver: ModeDriver::new(self.mode, &self.iv),
            },
        };
        Ok(transform)
    }
}

impl std::fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherContext")
            .field("algorithm", &self.algorithm)
            .field("mode", &self.mode)
            .field("key_set", &self.key.is_some())
            .field("continuous_buffer", &self.continuous_buffer)
            .field("padding", &self.padding)
            .field("engine", &self.engine())
            .finish_non_exhaustive()
    }
}
