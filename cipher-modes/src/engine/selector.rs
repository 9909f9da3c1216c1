use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::algorithm::Algorithm;
use crate::modes::Mode;

use super::{Backend, Engine};

/// Outcome of [`EngineSelector::select`]
#[derive(Clone)]
pub enum Selection {
    Software,
    Accelerated {
        backend: Arc<dyn Backend>,
        /// The backend lacks the mode; drive its raw block call instead.
        emulate: bool,
    },
}

impl Selection {
    pub fn engine(&self) -> Engine {
        match self {
            Selection::Software => Engine::Software,
            Selection::Accelerated { .. } => Engine::Accelerated,
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Software => f.write_str("Software"),
            Selection::Accelerated { backend, emulate } => f
                .debug_struct("Accelerated")
                .field("backend", &backend.name())
                .field("emulate", emulate)
                .finish(),
        }
    }
}

/// Ordered list of backend probes. The first backend that validates wins;
/// software is the fallback and is always valid.
#[derive(Clone, Default)]
pub struct EngineSelector {
    backends: Vec<Arc<dyn Backend>>,
}

impl EngineSelector {
    /// A selector with no accelerated backends.
    pub fn software_only() -> Self {
        EngineSelector::default()
    }

    /// The backends compiled into this build, in preference order.
    pub fn detect() -> Self {
        #[allow(unused_mut)]
        let mut selector = EngineSelector::software_only();
        #[cfg(feature = "rustcrypto")]
        {
            selector = selector.with_backend(Arc::new(super::rustcrypto::RustCryptoBackend));
        }
        selector
    }

    /// Appends `backend` after the already registered ones.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn backends(&self) -> impl Iterator<Item = &str> + '_ {
        self.backends.iter().map(|b| b.name())
    }

    /// Picks the engine for a normalized key of `key_length` bytes.
    ///
    /// With no preference the first accelerated backend that validates is
    /// used. Asking for [`Engine::Accelerated`] when none validates falls
    /// back to software.
    pub fn select(
        &self,
        algorithm: Algorithm,
        mode: Mode,
        key_length: usize,
        preferred: Option<Engine>,
    ) -> Selection {
        let selection = match preferred {
            Some(Engine::Software) => Selection::Software,
            _ => self
                .accelerated(algorithm, mode, key_length)
                .unwrap_or(Selection::Software),
        };
        match &selection {
            Selection::Software => {
                debug!(%algorithm, %mode, key_length, backend = "software", "engine selected")
            }
            Selection::Accelerated { backend, emulate } => debug!(
                %algorithm,
                %mode,
                key_length,
                backend = backend.name(),
                emulate,
                "engine selected"
            ),
        }
        selection
    }

    /// Whether `engine` could serve this combination.
    pub fn is_valid(&self, engine: Engine, algorithm: Algorithm, mode: Mode, key_length: usize) -> bool {
        match engine {
            Engine::Software => algorithm.supports(mode),
            Engine::Accelerated => self.accelerated(algorithm, mode, key_length).is_some(),
        }
    }

    fn accelerated(&self, algorithm: Algorithm, mode: Mode, key_length: usize) -> Option<Selection> {
        // the stream primitive and the inner-CBC layering only run in software
        if !algorithm.supports(mode) || mode == Mode::Stream || algorithm == Algorithm::TripleDesInnerCbc {
            return None;
        }
        self.backends.iter().find_map(|backend| {
            if backend.is_available(algorithm, mode, key_length) {
                Some(Selection::Accelerated {
                    backend: Arc::clone(backend),
                    emulate: false,
                })
            } else if backend.supports_raw_block(algorithm, key_length) {
                Some(Selection::Accelerated {
                    backend: Arc::clone(backend),
                    emulate: true,
                })
            } else {
                None
            }
        })
    }
}

impl fmt::Debug for EngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.backends()).finish()
    }
}
