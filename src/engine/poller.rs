//! Polling hotkey engine
//!
//! Samples key state on a dedicated thread at a fixed interval and steps
//! every registered binding. One loop runs at a time: each start bumps a
//! generation counter and a loop exits as soon as it is no longer current.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::registry::{BindingId, BindingRegistry, BindingSnapshot, Registration, RegistryError};
use crate::binding::Binding;
use crate::keys::{KeySnapshot, KeyState};

/// Timing knobs for the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause between ticks
    pub tick_interval: Duration,
    /// Pause between stopping and starting again in [`HotkeyEngine::restart`]
    pub restart_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(20),
            restart_delay: Duration::from_millis(700),
        }
    }
}

/// Errors from engine lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("hotkey polling is already running")]
    AlreadyRunning,

    #[error("failed to spawn polling thread: {0}")]
    ThreadSpawn(String),
}

impl EngineError {
    /// Stable identifier for IPC error responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::ThreadSpawn(_) => "thread_spawn",
        }
    }
}

struct EngineShared {
    registry: BindingRegistry,
    source: Arc<dyn KeyState + Send + Sync>,
    active: AtomicBool,
    generation: AtomicU64,
    config: EngineConfig,
}

impl EngineShared {
    fn is_current(&self, generation: u64) -> bool {
        self.active.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    fn tick(&self) {
        let keys = KeySnapshot::capture(self.source.as_ref());
        for dispatch in self.registry.advance(&keys) {
            dispatch.invoke();
        }
    }
}

/// Global hotkey engine: binding registry plus polling lifecycle
///
/// Construct one per process and share it by reference or `Arc`.
pub struct HotkeyEngine {
    shared: Arc<EngineShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HotkeyEngine {
    /// Create an engine with default timing
    pub fn new<S>(source: S) -> Self
    where
        S: KeyState + Send + Sync + 'static,
    {
        Self::with_source(Arc::new(source), EngineConfig::default())
    }

    /// Create an engine around a shared key-state source
    pub fn with_source(source: Arc<dyn KeyState + Send + Sync>, config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                registry: BindingRegistry::new(),
                source,
                active: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                config,
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.shared.config
    }

    pub(crate) fn registry(&self) -> &BindingRegistry {
        &self.shared.registry
    }

    /// Register a binding. Takes effect on the next tick.
    pub fn register(&self, registration: Registration) -> Result<BindingId, RegistryError> {
        self.shared.registry.register(registration)
    }

    /// Register several bindings; each one succeeds or fails on its own
    pub fn register_all(
        &self,
        registrations: impl IntoIterator<Item = Registration>,
    ) -> Vec<Result<BindingId, RegistryError>> {
        registrations
            .into_iter()
            .map(|registration| self.register(registration))
            .collect()
    }

    pub fn remove(&self, binding: &Binding) -> Result<BindingId, RegistryError> {
        self.shared.registry.remove(binding)
    }

    pub fn remove_all<'a>(
        &self,
        bindings: impl IntoIterator<Item = &'a Binding>,
    ) -> Vec<Result<BindingId, RegistryError>> {
        bindings.into_iter().map(|binding| self.remove(binding)).collect()
    }

    pub fn remove_by_id(&self, id: BindingId) -> Result<Binding, RegistryError> {
        self.shared.registry.remove_by_id(id)
    }

    pub fn is_registered(&self, binding: &Binding) -> bool {
        self.shared.registry.contains(binding)
    }

    pub fn bindings(&self) -> Vec<BindingSnapshot> {
        self.shared.registry.snapshot()
    }

    /// Stop polling and drop every binding
    pub fn clear_bindings(&self) -> usize {
        self.stop();
        let removed = self.shared.registry.clear();
        info!(removed, "all bindings cleared");
        removed
    }

    /// Run one evaluation pass on the calling thread
    pub fn tick(&self) {
        self.shared.tick();
    }

    pub fn is_running(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Start the polling thread
    pub fn start(&self) -> Result<(), EngineError> {
        if self.shared.active.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::downgrade(&self.shared);
        let interval = self.shared.config.tick_interval;

        let handle = thread::Builder::new()
            .name("hotkey-poller".to_string())
            .spawn(move || run_poll_loop(shared, generation, interval))
            .map_err(|e| {
                self.shared.active.store(false, Ordering::SeqCst);
                EngineError::ThreadSpawn(e.to_string())
            })?;

        // A previous handle can only remain if its loop already exited.
        *self.worker.lock() = Some(handle);
        info!(
            generation,
            interval_ms = interval.as_millis() as u64,
            bindings = self.shared.registry.len(),
            "hotkey polling started"
        );
        Ok(())
    }

    /// Stop the polling thread and wait for it to exit.
    ///
    /// Called from inside a callback this only requests the stop, since the
    /// polling thread cannot wait for itself.
    pub fn stop(&self) {
        let was_active = self.shared.active.swap(false, Ordering::SeqCst);
        let handle = self.worker.lock().take();

        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                debug!("stop requested from the polling thread");
            } else if handle.join().is_err() {
                error!("polling thread panicked");
            }
        }

        if was_active {
            info!("hotkey polling stopped");
        }
    }

    /// Stop, wait out the quiescence delay, and start again
    pub fn restart(&self) -> Result<(), EngineError> {
        self.stop();
        thread::sleep(self.shared.config.restart_delay);
        self.start()
    }
}

impl Drop for HotkeyEngine {
    fn drop(&mut self) {
        self.shared.active.store(false, Ordering::SeqCst);
    }
}

fn run_poll_loop(shared: Weak<EngineShared>, generation: u64, interval: Duration) {
    debug!(generation, "polling loop entered");

    loop {
        thread::sleep(interval);

        // The engine handle going away ends the loop, like the owning
        // application exiting.
        let Some(shared) = shared.upgrade() else {
            debug!(generation, "engine dropped");
            break;
        };
        if !shared.is_current(generation) {
            break;
        }
        shared.tick();
    }

    debug!(generation, "polling loop exited");
}
