//! SMB session lifecycle
//!
//! A [`Session`] owns one protocol engine and the single lock that
//! serializes every call into it, whether the call comes from the session
//! itself or from any [`SmbFile`] opened on it.

use crate::config::SessionConfig;
use crate::engine::{Credentials, OpenFlags, ProtocolEngine, RawAttributes};
use crate::error::{Error, Result};
use crate::file::{Descriptor, SmbFile};
use crate::stat::{base_name, FileInfo};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Engine ownership and connection state, guarded by the session lock
pub(crate) enum EngineState {
    /// Engine allocated, no share bound
    Ready(Box<dyn ProtocolEngine>),
    /// Share tree-connected
    Connected {
        engine: Box<dyn ProtocolEngine>,
        host: String,
        share: String,
    },
    /// Engine destroyed; the session is permanently unusable
    Closed,
}

impl EngineState {
    /// The live engine, if it has not been destroyed
    pub(crate) fn engine_mut(&mut self) -> Option<&mut (dyn ProtocolEngine + 'static)> {
        match self {
            EngineState::Ready(engine) | EngineState::Connected { engine, .. } => {
                Some(engine.as_mut())
            }
            EngineState::Closed => None,
        }
    }

    fn status(&self) -> SessionStatus {
        match self {
            EngineState::Ready(_) => SessionStatus::Ready,
            EngineState::Connected { .. } => SessionStatus::Connected,
            EngineState::Closed => SessionStatus::Closed,
        }
    }
}

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    Connected,
    Closed,
}

/// A connection to one SMB2 share
pub struct Session {
    config: SessionConfig,
    state: Mutex<EngineState>,
}

impl Session {
    /// Wrap an unconnected engine
    pub fn new(engine: impl ProtocolEngine + 'static) -> Self {
        Self::with_config(engine, SessionConfig::default())
    }

    /// Wrap an unconnected engine with explicit identity settings
    pub fn with_config(engine: impl ProtocolEngine + 'static, config: SessionConfig) -> Self {
        Self {
            config,
            state: Mutex::new(EngineState::Ready(Box::new(engine))),
        }
    }

    /// Acquire the session lock
    ///
    /// A poisoned lock is recovered: every transition leaves the state
    /// structurally valid before calling into the engine.
    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == SessionStatus::Connected
    }

    /// `\\host\share` of the bound share, if connected
    pub fn unc_path(&self) -> Option<String> {
        match &*self.lock() {
            EngineState::Connected { host, share, .. } => Some(format!("\\\\{}\\{}", host, share)),
            _ => None,
        }
    }

    /// Authenticate and tree-connect to `share` on `host`
    ///
    /// On failure the engine is destroyed and the session is closed for
    /// good. Connecting twice is rejected.
    pub fn connect(&self, host: &str, share: &str, user: &str, password: &str) -> Result<()> {
        let mut state = self.lock();

        let mut engine = match std::mem::replace(&mut *state, EngineState::Closed) {
            EngineState::Ready(engine) => engine,
            EngineState::Connected {
                engine,
                host: bound_host,
                share: bound_share,
            } => {
                let err = Error::InvalidState(format!(
                    "session already connected to \\\\{}\\{}",
                    bound_host, bound_share
                ));
                *state = EngineState::Connected {
                    engine,
                    host: bound_host,
                    share: bound_share,
                };
                return Err(err);
            }
            EngineState::Closed => {
                return Err(Error::InvalidState(
                    "connecting a closed session".to_string(),
                ))
            }
        };

        engine.set_credentials(&Credentials {
            username: user.to_string(),
            password: password.to_string(),
            domain: self.config.domain.clone(),
            workstation: self.config.workstation.clone(),
            client_guid: self.config.client_guid,
        });

        let status = engine.connect_share(host, share, user);
        if status.is_success() {
            info!("Connected to \\\\{}\\{} as {}", host, share, user);
            *state = EngineState::Connected {
                engine,
                host: host.to_string(),
                share: share.to_string(),
            };
            return Ok(());
        }

        let message = engine.last_error();
        warn!(
            "Connection to \\\\{}\\{} failed: {} {}",
            host, share, status, message
        );
        // Never tree-connected, so destroying is the whole teardown.
        drop(engine);
        Err(Error::ConnectionFailed {
            host: host.to_string(),
            status,
            message,
        })
    }

    /// Tear down the share connection and destroy the engine
    ///
    /// Safe to call any number of times.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, EngineState::Closed) {
            EngineState::Connected {
                mut engine,
                host,
                share,
            } => {
                engine.disconnect_share();
                info!("Disconnected from \\\\{}\\{}", host, share);
            }
            EngineState::Ready(_) => debug!("Destroying unconnected engine"),
            EngineState::Closed => {}
        }
    }

    /// Open `path` as a file, falling back to a directory
    ///
    /// Both attempts run under one acquisition of the session lock.
    pub fn open_file(self: &Arc<Self>, path: &str, flags: OpenFlags) -> Result<SmbFile> {
        let mut state = self.lock();
        let engine = state
            .engine_mut()
            .ok_or_else(|| Error::InvalidState("opening file on closed session".to_string()))?;

        let name = base_name(path);
        let (descriptor, info) = if let Some(fd) = engine.open(path, flags) {
            let raw = engine.fstat(fd).unwrap_or_else(|| {
                warn!("fstat of {} failed: {}", path, engine.last_error());
                RawAttributes::default()
            });
            (Descriptor::File(fd), FileInfo::from_raw(name, &raw))
        } else if let Some(dir) = engine.open_dir(path) {
            debug!("{} opened as a directory", path);
            (Descriptor::Dir(dir), FileInfo::synthesized_dir(name))
        } else {
            let message = engine.last_error();
            debug!("Open of {} failed: {}", path, message);
            return Err(Error::NotFound(message));
        };
        drop(state);

        Ok(SmbFile::new(Arc::clone(self), path, descriptor, info))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}
