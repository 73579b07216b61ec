//! Lifecycle of the single shared vector store client.
//!
//! ```text
//! Uninitialized ──get_client──▶ Constructing ──ok──▶ Ready
//!       ▲                            │                 │
//!       └──────────── error ─────────┘            shutdown
//!       └───────────────────── ShuttingDown ◀──────────┘
//! ```
//!
//! Construction and teardown are serialized by one mutex, which also guards
//! the [`NetworkPolicy`]. Reading an already built handle only takes the slot's
//! read lock.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::client::{ClientFactory, ClientHandle, ClientSettings, DEFAULT_SOURCE_TAG};
use crate::config::VectorDbConfig;
use crate::credentials::{CredentialProvider, JsonFileCredentials};
use crate::error::ConnectionError;
use crate::policy::NetworkPolicy;

/// Observable lifecycle state of a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Uninitialized = 0,
    Constructing = 1,
    Ready = 2,
    ShuttingDown = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Constructing,
            2 => ConnectionState::Ready,
            3 => ConnectionState::ShuttingDown,
            _ => ConnectionState::Uninitialized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Constructing => "constructing",
            ConnectionState::Ready => "ready",
            ConnectionState::ShuttingDown => "shutting_down",
        }
    }
}

/// Read-only view of what the next (or current) handle is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub policy: NetworkPolicy,
    pub host: Option<String>,
    pub source_tag: Option<String>,
}

/// Sole owner of the live client handle.
///
/// Build one at the composition root and pass it (usually in an `Arc`) to
/// whatever needs a client. Repositories only keep weak references.
pub struct ConnectionManager {
    credentials: Box<dyn CredentialProvider>,
    factory: Box<dyn ClientFactory>,
    host: Option<String>,
    source_tag: Option<String>,
    transitions: Mutex<NetworkPolicy>,
    slot: RwLock<Option<ClientHandle>>,
    state: AtomicU8,
}

impl ConnectionManager {
    pub fn new(
        credentials: impl CredentialProvider + 'static,
        factory: impl ClientFactory + 'static,
    ) -> Self {
        Self {
            credentials: Box::new(credentials),
            factory: Box::new(factory),
            host: None,
            source_tag: Some(DEFAULT_SOURCE_TAG.to_string()),
            transitions: Mutex::new(NetworkPolicy::default()),
            slot: RwLock::new(None),
            state: AtomicU8::new(ConnectionState::Uninitialized as u8),
        }
    }

    /// Manager reading the key from `config.secrets_path`.
    pub fn from_config(config: &VectorDbConfig, factory: impl ClientFactory + 'static) -> Self {
        let mut manager = Self::new(JsonFileCredentials::new(&config.secrets_path), factory)
            .with_policy(config.policy.clone());
        manager.host = config.host.clone();
        manager.source_tag = config.source_tag.clone();
        manager
    }

    pub fn with_policy(self, policy: NetworkPolicy) -> Self {
        *self.transitions.lock().unwrap_or_else(PoisonError::into_inner) = policy;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = Some(tag.into());
        self
    }

    pub fn without_source_tag(mut self) -> Self {
        self.source_tag = None;
        self
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            policy: self.lock_transitions().clone(),
            host: self.host.clone(),
            source_tag: self.source_tag.clone(),
        }
    }

    /// Replace the network policy for the next construction.
    ///
    /// Rejected with [`ConnectionError::PolicyFrozen`] while a handle is live,
    /// since the running transport would silently keep the old values.
    pub fn update_policy(&self, policy: NetworkPolicy) -> Result<(), ConnectionError> {
        let mut current = self.lock_transitions();

        if self.current().is_some() {
            warn!("Ignoring network policy change: client already built, shut down to rebuild");
            return Err(ConnectionError::PolicyFrozen);
        }

        *current = policy;
        debug!("Network policy updated");
        Ok(())
    }

    /// Return the live handle, building it on first use.
    ///
    /// At most one caller builds; concurrent callers wait on the transition
    /// lock and then see the built handle. A failed build leaves the slot
    /// empty so the next call tries again.
    pub fn get_client(&self) -> Result<ClientHandle, ConnectionError> {
        if let Some(handle) = self.current() {
            return Ok(handle);
        }

        let policy = self.lock_transitions();

        if let Some(handle) = self.current() {
            return Ok(handle);
        }

        self.set_state(ConnectionState::Constructing);

        match self.construct(&policy) {
            Ok(handle) => {
                *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(handle.clone());
                self.set_state(ConnectionState::Ready);
                info!(
                    host = self.host.as_deref().unwrap_or("default"),
                    tls = policy.tls_enabled,
                    "Vector store client initialized"
                );
                Ok(handle)
            }
            Err(e) => {
                self.set_state(ConnectionState::Uninitialized);
                warn!(error = %e, "Vector store client initialization failed");
                Err(e)
            }
        }
    }

    /// Issue a cheap call (list indexes) through the client.
    ///
    /// Builds the client if needed. Any failure, including a failed build,
    /// is logged and reported as `false`.
    pub async fn test_connection(&self) -> bool {
        let client = match self.get_client() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Connection test failed: no client");
                return false;
            }
        };

        match client.list_indexes().await {
            Ok(indexes) => {
                debug!(indexes = indexes.len(), "Connection test succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                false
            }
        }
    }

    /// Release the handle. Idempotent and infallible.
    ///
    /// The slot is emptied under the transition lock; the detached handle is
    /// then closed, and a close failure is only logged. A later
    /// [`get_client`](Self::get_client) builds a fresh handle.
    pub async fn shutdown(&self) {
        let detached = {
            let _guard = self.lock_transitions();
            let taken = self
                .slot
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if taken.is_some() {
                self.set_state(ConnectionState::ShuttingDown);
            }
            taken
        };

        let Some(handle) = detached else {
            debug!("Shutdown requested with no live client");
            return;
        };

        if let Err(e) = handle.close().await {
            warn!(error = %e, "Error while closing vector store client");
        }
        drop(handle);

        {
            let _guard = self.lock_transitions();
            if self.state() == ConnectionState::ShuttingDown {
                self.set_state(ConnectionState::Uninitialized);
            }
        }

        info!("Vector store client shut down");
    }

    fn construct(&self, policy: &NetworkPolicy) -> Result<ClientHandle, ConnectionError> {
        policy.validate()?;

        if self.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ConnectionError::Configuration(
                "vector store host is set but blank".to_string(),
            ));
        }
        if self.source_tag.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConnectionError::Configuration(
                "source tag is set but blank".to_string(),
            ));
        }

        let api_key = self.credentials.load()?;

        let settings = ClientSettings {
            api_key,
            policy: policy.clone(),
            host: self.host.clone(),
            source_tag: self.source_tag.clone(),
        };

        self.factory
            .build(&settings)
            .map_err(ConnectionError::ClientInit)
    }

    fn current(&self) -> Option<ClientHandle> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_transitions(&self) -> MutexGuard<'_, NetworkPolicy> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}
