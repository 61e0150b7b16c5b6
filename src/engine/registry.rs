//! Registered bindings and their callbacks
//!
//! The registry is the only state shared between the polling thread and
//! the rest of the application. The tick advances every record's progress
//! under the lock and hands back the callbacks to run; callbacks are invoked
//! after the lock is released so they may register or remove bindings.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::progress::{Progress, Stage, Transition};
use crate::binding::Binding;
use crate::keys::KeyState;

/// Press or release handler. Receives the params given at registration.
pub type Callback = Arc<dyn Fn(Option<&Value>) -> anyhow::Result<()> + Send + Sync>;

/// Identifier handed out on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(pub u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from registry mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("binding \"{0}\" is already registered")]
    AlreadyRegistered(Binding),

    #[error("binding \"{0}\" is not registered")]
    NotFound(Binding),

    #[error("no binding with id {0}")]
    UnknownId(BindingId),
}

impl RegistryError {
    /// Stable identifier for IPC error responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "already_registered",
            Self::NotFound(_) | Self::UnknownId(_) => "not_found",
        }
    }
}

/// Everything needed to register one binding
///
/// Release params default to the press params unless set explicitly.
pub struct Registration {
    binding: Binding,
    on_press: Option<Callback>,
    on_release: Option<Callback>,
    actuate_on_partial_release: bool,
    press_params: Option<Value>,
    release_params: Option<Option<Value>>,
}

impl Registration {
    pub fn new(binding: Binding) -> Self {
        Self {
            binding,
            on_press: None,
            on_release: None,
            actuate_on_partial_release: true,
            press_params: None,
            release_params: None,
        }
    }

    pub fn on_press<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<&Value>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_press = Some(Arc::new(callback));
        self
    }

    pub fn on_release<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<&Value>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_release = Some(Arc::new(callback));
        self
    }

    /// When false, the release callback waits until every key of the final
    /// chord is up
    pub fn actuate_on_partial_release(mut self, enabled: bool) -> Self {
        self.actuate_on_partial_release = enabled;
        self
    }

    /// Params for both callbacks
    pub fn params(mut self, params: Value) -> Self {
        self.press_params = Some(params);
        self
    }

    pub fn press_params(self, params: Value) -> Self {
        self.params(params)
    }

    /// Params for the release callback only; `None` passes nothing
    pub fn release_params(mut self, params: Option<Value>) -> Self {
        self.release_params = Some(params);
        self
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("binding", &self.binding.to_string())
            .field("on_press", &self.on_press.is_some())
            .field("on_release", &self.on_release.is_some())
            .field("actuate_on_partial_release", &self.actuate_on_partial_release)
            .field("press_params", &self.press_params)
            .field("release_params", &self.release_params)
            .finish()
    }
}

struct BindingRecord {
    id: BindingId,
    binding: Binding,
    on_press: Option<Callback>,
    on_release: Option<Callback>,
    actuate_on_partial_release: bool,
    press_params: Option<Value>,
    release_params: Option<Value>,
    progress: Progress,
}

impl BindingRecord {
    fn dispatch(&self, phase: Phase) -> Option<Dispatch> {
        let (callback, params) = match phase {
            Phase::Press => (self.on_press.as_ref()?, &self.press_params),
            Phase::Release => (self.on_release.as_ref()?, &self.release_params),
        };
        Some(Dispatch {
            id: self.id,
            binding: self.binding.clone(),
            phase,
            callback: Arc::clone(callback),
            params: params.clone(),
        })
    }
}

/// Read-only view of a registered binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    pub id: BindingId,
    pub binding: Binding,
    pub progress: Vec<Stage>,
    pub actuate_on_partial_release: bool,
    pub has_press_callback: bool,
    pub has_release_callback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Press,
    Release,
}

/// A callback ready to run outside the registry lock
pub(crate) struct Dispatch {
    id: BindingId,
    binding: Binding,
    phase: Phase,
    callback: Callback,
    params: Option<Value>,
}

impl Dispatch {
    /// Run the callback. Failures and panics are logged and swallowed.
    pub(crate) fn invoke(self) {
        let Dispatch {
            id,
            binding,
            phase,
            callback,
            params,
        } = self;

        match panic::catch_unwind(AssertUnwindSafe(|| callback(params.as_ref()))) {
            Ok(Ok(())) => {
                debug!(%id, %binding, ?phase, "callback completed");
            }
            Ok(Err(e)) => {
                warn!(%id, %binding, ?phase, error = %e, "callback failed");
            }
            Err(_) => {
                error!(%id, %binding, ?phase, "callback panicked");
            }
        }
    }
}

/// Set of registered bindings, at most one per distinct binding
#[derive(Default)]
pub struct BindingRegistry {
    records: Mutex<Vec<BindingRecord>>,
    next_id: AtomicU64,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding; fails if an equal binding is already present
    pub fn register(&self, registration: Registration) -> Result<BindingId, RegistryError> {
        let Registration {
            binding,
            on_press,
            on_release,
            actuate_on_partial_release,
            press_params,
            release_params,
        } = registration;

        let mut records = self.records.lock();
        if records.iter().any(|r| r.binding == binding) {
            return Err(RegistryError::AlreadyRegistered(binding));
        }

        let id = BindingId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let release_params = release_params.unwrap_or_else(|| press_params.clone());
        debug!(%id, %binding, actuate_on_partial_release, "binding registered");

        records.push(BindingRecord {
            id,
            progress: Progress::new(binding.len()),
            binding,
            on_press,
            on_release,
            actuate_on_partial_release,
            press_params,
            release_params,
        });
        Ok(id)
    }

    /// Remove a binding by structural equality
    pub fn remove(&self, binding: &Binding) -> Result<BindingId, RegistryError> {
        let mut records = self.records.lock();
        let index = records
            .iter()
            .position(|r| &r.binding == binding)
            .ok_or_else(|| RegistryError::NotFound(binding.clone()))?;
        let record = records.remove(index);
        debug!(id = %record.id, %binding, "binding removed");
        Ok(record.id)
    }

    pub fn remove_by_id(&self, id: BindingId) -> Result<Binding, RegistryError> {
        let mut records = self.records.lock();
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or(RegistryError::UnknownId(id))?;
        let record = records.remove(index);
        debug!(%id, binding = %record.binding, "binding removed");
        Ok(record.binding)
    }

    pub fn contains(&self, binding: &Binding) -> bool {
        self.records.lock().iter().any(|r| &r.binding == binding)
    }

    /// Drop every binding, returning how many there were.
    ///
    /// Callers outside the engine go through `HotkeyEngine::clear_bindings`,
    /// which stops polling first.
    pub(crate) fn clear(&self) -> usize {
        let mut records = self.records.lock();
        let count = records.len();
        records.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current bindings in registration order
    pub fn snapshot(&self) -> Vec<BindingSnapshot> {
        self.records
            .lock()
            .iter()
            .map(|r| BindingSnapshot {
                id: r.id,
                binding: r.binding.clone(),
                progress: r.progress.stages().to_vec(),
                actuate_on_partial_release: r.actuate_on_partial_release,
                has_press_callback: r.on_press.is_some(),
                has_release_callback: r.on_release.is_some(),
            })
            .collect()
    }

    /// Step every binding against `keys`, returning the callbacks to run
    pub(crate) fn advance<K: KeyState + ?Sized>(&self, keys: &K) -> Vec<Dispatch> {
        let mut records = self.records.lock();
        let mut dispatches = Vec::new();

        for record in records.iter_mut() {
            let transition = match record.progress.step(
                &record.binding,
                record.actuate_on_partial_release,
                keys,
            ) {
                Ok(transition) => transition,
                Err(e) => {
                    error!(
                        id = %record.id,
                        binding = %record.binding,
                        error = %e,
                        "binding progress is inconsistent; resetting"
                    );
                    record.progress.reset();
                    continue;
                }
            };

            let phase = match transition {
                Transition::Unchanged => continue,
                Transition::Armed { chord } | Transition::Advanced { chord } => {
                    debug!(
                        id = %record.id,
                        binding = %record.binding,
                        chord,
                        ?transition,
                        "sequence progressed"
                    );
                    continue;
                }
                Transition::Aborted { release } => {
                    debug!(
                        id = %record.id,
                        binding = %record.binding,
                        "sequence aborted by unrelated key"
                    );
                    if !release {
                        continue;
                    }
                    Phase::Release
                }
                Transition::Pressed => Phase::Press,
                Transition::Released => Phase::Release,
            };

            debug!(id = %record.id, binding = %record.binding, ?phase, "binding actuated");
            dispatches.extend(record.dispatch(phase));
        }

        dispatches
    }

    #[cfg(test)]
    pub(crate) fn corrupt_progress(&self, id: BindingId) {
        if let Some(record) = self.records.lock().iter_mut().find(|r| r.id == id) {
            let chords = record.binding.len();
            record.progress = Progress::consumed(chords);
        }
    }
}
