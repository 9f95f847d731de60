//! Back-end registry (spec.md §6): a process-wide `name → adapter` mapping
//! with an explicit `connect`/`disconnect` lifecycle.
//!
//! Grounded on the teacher's `platform/mod.rs` (`HostId`,
//! `available_hosts()`, `host_from_id()` — a name-keyed, dynamically
//! dispatched selection of a concrete host) and on `host/custom/mod.rs`
//! (letting a caller register an arbitrary `Backend` without any compiled-in
//! platform binding), plus the original `entry/entry.go`'s
//! `RegisterEntry`/`EntryFor`/`Names` free functions. Design Notes ask for
//! this guarded by a single mutex with "the first connect wins until
//! disconnect" — modeled here as one `Mutex`-protected slot rather than
//! ambient global state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::error::{BridgeError, Result};

struct State {
    backends: HashMap<String, Arc<dyn Backend>>,
    connected: Option<(String, Arc<dyn Backend>)>,
}

/// A process-wide registry of named back-ends with at most one "connected"
/// adapter at a time.
pub struct Registry {
    state: Mutex<State>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            state: Mutex::new(State {
                backends: HashMap::new(),
                connected: None,
            }),
        }
    }

    /// Registers a back-end under its own [`Backend::name`].
    ///
    /// Returns [`BridgeError::InvalidAdapterName`] if the name is empty.
    pub fn register(&self, backend: Arc<dyn Backend>) -> Result<()> {
        let name = backend.name().to_string();
        if name.is_empty() {
            return Err(BridgeError::InvalidAdapterName);
        }
        let mut state = self.state.lock().unwrap();
        state.backends.insert(name, backend);
        Ok(())
    }

    /// Names of every registered back-end, in no particular order.
    pub fn names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.backends.keys().cloned().collect()
    }

    /// Connects to the back-end registered under `name`.
    ///
    /// If an adapter is already connected: returns it if `name` matches,
    /// otherwise fails with [`BridgeError::AdapterInUse`] — a `connect`
    /// without a prior `disconnect` does not implicitly swap adapters.
    /// Fails with [`BridgeError::NoAdapterAvailable`] if no back-end is
    /// registered under `name`, or [`BridgeError::InvalidAdapterName`] if
    /// `name` is empty.
    pub fn connect(&self, name: &str) -> Result<Arc<dyn Backend>> {
        if name.is_empty() {
            return Err(BridgeError::InvalidAdapterName);
        }
        let mut state = self.state.lock().unwrap();
        if let Some((connected_name, backend)) = &state.connected {
            return if connected_name == name {
                Ok(backend.clone())
            } else {
                Err(BridgeError::AdapterInUse)
            };
        }
        let backend = state
            .backends
            .get(name)
            .cloned()
            .ok_or(BridgeError::NoAdapterAvailable)?;
        state.connected = Some((name.to_string(), backend.clone()));
        Ok(backend)
    }

    /// Releases the currently connected adapter, if any. Idempotent.
    pub fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        state.connected = None;
    }

    /// Name of the currently connected adapter, if any.
    pub fn connected_name(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.connected.as_ref().map(|(name, _)| name.clone())
    }
}
