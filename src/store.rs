//! Model store boundary: where trained models are persisted and loaded from.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use parking_lot::Mutex;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::error::StoreError;
use crate::model::TrainedModel;

pub trait ModelStore: Send + Sync {
    /// Load the stored model. `StoreError::NotFound` when nothing is stored.
    fn load(&self) -> Result<TrainedModel, StoreError>;

    fn save(&self, model: &TrainedModel) -> Result<(), StoreError>;

    /// Human-readable location for logs and errors.
    fn location(&self) -> String;
}

fn decode(location: &str, bytes: &[u8]) -> Result<TrainedModel, StoreError> {
    let model: TrainedModel = serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        location: location.to_string(),
        reason: e.to_string(),
    })?;
    model.validate().map_err(|reason| StoreError::Corrupt {
        location: location.to_string(),
        reason,
    })?;
    Ok(model)
}

fn encode(location: &str, model: &TrainedModel) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(model).map_err(|e| StoreError::Corrupt {
        location: location.to_string(),
        reason: e.to_string(),
    })
}

// ---------- Local disk ----------

/// JSON artifact on local disk.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            location: self.location(),
            source,
        }
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> Result<TrainedModel, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    location: self.location(),
                })
            }
            Err(e) => return Err(self.io_error(e)),
        };
        decode(&self.location(), &bytes)
    }

    /// Written to a sibling temp file first, then renamed over the target,
    /// so readers see either the old artifact or the new one.
    fn save(&self, model: &TrainedModel) -> Result<(), StoreError> {
        let bytes = encode(&self.location(), model)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &bytes).map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(e));
        }
        tracing::info!(path = %self.path.display(), bytes = bytes.len(), "model saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------- In memory ----------

/// Keeps the serialized artifact in process memory.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    slot: Mutex<Option<Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self) -> Result<TrainedModel, StoreError> {
        match self.slot.lock().as_deref() {
            Some(bytes) => decode("memory", bytes),
            None => Err(StoreError::NotFound {
                location: self.location(),
            }),
        }
    }

    fn save(&self, model: &TrainedModel) -> Result<(), StoreError> {
        let bytes = encode("memory", model)?;
        *self.slot.lock() = Some(bytes);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

// ---------- Layered ----------

/// Loads from `primary`, falling back to `secondary` when the primary has no
/// artifact. Saves always go to the primary.
pub struct LayeredModelStore {
    primary: Box<dyn ModelStore>,
    secondary: Box<dyn ModelStore>,
}

impl LayeredModelStore {
    pub fn new(primary: Box<dyn ModelStore>, secondary: Box<dyn ModelStore>) -> Self {
        Self { primary, secondary }
    }
}

impl ModelStore for LayeredModelStore {
    fn load(&self) -> Result<TrainedModel, StoreError> {
        match self.primary.load() {
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    primary = %self.primary.location(),
                    secondary = %self.secondary.location(),
                    "model not found in primary store, trying secondary"
                );
                self.secondary.load()
            }
            other => other,
        }
    }

    fn save(&self, model: &TrainedModel) -> Result<(), StoreError> {
        self.primary.save(model)
    }

    fn location(&self) -> String {
        format!("{} (fallback {})", self.primary.location(), self.secondary.location())
    }
}

// ---------- Retry ----------

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Backoff base in milliseconds; the n-th delay is `base^n` ms.
    pub base_delay_ms: u64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Retries transient store failures with exponential backoff and jitter.
/// `NotFound` and `Corrupt` are returned immediately.
pub struct RetryingStore {
    inner: Box<dyn ModelStore>,
    policy: RetryPolicy,
}

impl RetryingStore {
    pub fn new(inner: Box<dyn ModelStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    fn run<T>(&self, op: &'static str, mut f: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut delays = ExponentialBackoff::from_millis(self.policy.base_delay_ms.max(1))
            .max_delay(self.policy.max_delay)
            .map(jitter)
            .take(self.policy.max_attempts.saturating_sub(1));
        let mut attempt = 1;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => match delays.next() {
                    Some(delay) => {
                        tracing::warn!(
                            op,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retryable model store error"
                        );
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                    None => {
                        tracing::error!(op, attempt, error = %e, "model store retries exhausted");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }
}

impl ModelStore for RetryingStore {
    fn load(&self) -> Result<TrainedModel, StoreError> {
        self.run("load", || self.inner.load())
    }

    fn save(&self, model: &TrainedModel) -> Result<(), StoreError> {
        self.run("save", || self.inner.save(model))
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}
