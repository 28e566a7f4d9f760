//! Origin-scoped preference storage
//!
//! A `PreferenceStore` is a small string key/value store shared by every
//! context (tab, process) of one origin. Writes made by one context are
//! announced to the *other* contexts through `subscribe`, never echoed back
//! to the writer. Two backends:
//! - `MemoryStore`: contexts inside one process, used by tests and demos
//! - `FileStore`: a TOML file, external edits picked up by a filesystem watcher

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A key changed in another context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed
    pub new_value: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("could not watch preference file: {0}")]
    Watch(#[from] notify::Error),
}

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Changes made by other contexts sharing this store
    fn subscribe(&self) -> flume::Receiver<StoreChange>;
}

// ============================================================================
// In-memory store
// ============================================================================

struct Origin {
    values: Mutex<BTreeMap<String, String>>,
    listeners: Mutex<Vec<(u64, flume::Sender<StoreChange>)>>,
    next_context: AtomicU64,
    writes_denied: AtomicBool,
}

impl Origin {
    fn notify(&self, writer: u64, change: StoreChange) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|(context, tx)| {
            if *context == writer {
                return !tx.is_disconnected();
            }
            tx.send(change.clone()).is_ok()
        });
    }
}

/// Shared in-process store; each `open_context` is one tab of the origin
#[derive(Clone)]
pub struct MemoryStore {
    origin: Arc<Origin>,
    context: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            origin: Arc::new(Origin {
                values: Mutex::new(BTreeMap::new()),
                listeners: Mutex::new(Vec::new()),
                next_context: AtomicU64::new(1),
                writes_denied: AtomicBool::new(false),
            }),
            context: 0,
        }
    }

    /// Another context over the same values
    pub fn open_context(&self) -> Self {
        Self {
            origin: Arc::clone(&self.origin),
            context: self.origin.next_context.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Make every write fail with `QuotaExceeded` (all contexts)
    pub fn deny_writes(&self, denied: bool) {
        self.origin.writes_denied.store(denied, Ordering::SeqCst);
    }

    /// Remove a key, notifying the other contexts
    pub fn remove(&self, key: &str) {
        let old = {
            let mut values = self.origin.values.lock().unwrap_or_else(|e| e.into_inner());
            values.remove(key)
        };
        if old.is_some() {
            self.origin.notify(
                self.context,
                StoreChange {
                    key: key.to_string(),
                    old_value: old,
                    new_value: None,
                },
            );
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.origin.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.origin.writes_denied.load(Ordering::SeqCst) {
            return Err(StoreError::QuotaExceeded);
        }

        let old = {
            let mut values = self.origin.values.lock().unwrap_or_else(|e| e.into_inner());
            values.insert(key.to_string(), value.to_string())
        };

        if old.as_deref() != Some(value) {
            self.origin.notify(
                self.context,
                StoreChange {
                    key: key.to_string(),
                    old_value: old,
                    new_value: Some(value.to_string()),
                },
            );
        }
        Ok(())
    }

    fn subscribe(&self) -> flume::Receiver<StoreChange> {
        let (tx, rx) = flume::unbounded();
        self.origin
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((self.context, tx));
        rx
    }
}

// ============================================================================
// File-backed store
// ============================================================================

struct FileShared {
    path: PathBuf,
    /// Values as last written or observed by this context
    known: Mutex<BTreeMap<String, String>>,
    listeners: Mutex<Vec<flume::Sender<StoreChange>>>,
}

impl FileShared {
    /// Re-read the file and announce keys that differ from what we know
    fn reload(&self) {
        let current = match read_values(&self.path) {
            Ok(values) => values,
            Err(e) => {
                tracing::debug!("Skipping unreadable preference file: {}", e);
                return;
            }
        };

        let changes = {
            let mut known = self.known.lock().unwrap_or_else(|e| e.into_inner());
            let changes = diff(&known, &current);
            *known = current;
            changes
        };

        if changes.is_empty() {
            return;
        }

        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for change in changes {
            tracing::debug!("Preference '{}' changed externally", change.key);
            listeners.retain(|tx| tx.send(change.clone()).is_ok());
        }
    }
}

const WATCH_DEBOUNCE: Duration = Duration::from_millis(150);

/// Preferences persisted as a flat TOML table
pub struct FileStore {
    shared: Arc<FileShared>,
    _watcher: Debouncer<notify::RecommendedWatcher>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let known = read_values(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed preference file {}: {}", path.display(), e);
            BTreeMap::new()
        });

        let shared = Arc::new(FileShared {
            path: path.clone(),
            known: Mutex::new(known),
            listeners: Mutex::new(Vec::new()),
        });

        let file_name = path.file_name().map(|n| n.to_os_string());
        let watched = Arc::clone(&shared);
        let mut watcher = new_debouncer(WATCH_DEBOUNCE, move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    let ours = events
                        .iter()
                        .any(|e| e.path.file_name().map(|n| n.to_os_string()) == file_name);
                    if ours {
                        watched.reload();
                    }
                }
                Err(e) => tracing::warn!("Preference watcher error: {:?}", e),
            }
        })?;
        watcher.watcher().watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            shared,
            _watcher: watcher,
        })
    }

    /// Default location: `<config dir>/folio-voice/preferences.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio-voice")
            .join("preferences.toml")
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let known = self.shared.known.lock().unwrap_or_else(|e| e.into_inner());
        known.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut known = self.shared.known.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = known.clone();
        next.insert(key.to_string(), value.to_string());
        write_values(&self.shared.path, &next)?;
        // Update before the watcher sees our own write so it is not echoed
        *known = next;
        Ok(())
    }

    fn subscribe(&self) -> flume::Receiver<StoreChange> {
        let (tx, rx) = flume::unbounded();
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }
}

/// Non-string values are kept in their TOML spelling so readers can reject them
/// File-backed store at `path`, or an in-memory one for this session when the
/// file can't be used
pub fn open_or_memory(path: &Path) -> Arc<dyn PreferenceStore> {
    match FileStore::open(path) {
        Ok(store) => {
            tracing::debug!("Preferences: {}", store.path().display());
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Preferences at {} unavailable ({}), not persisting this session",
                path.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, String>, String> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.to_string()),
    };

    let table: toml::Table = text.parse().map_err(|e: toml::de::Error| e.to_string())?;
    Ok(table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

/// Write through a temp file + rename so readers never see a partial file
fn write_values(path: &Path, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let encoded = toml::to_string(values)?;
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, encoded)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn diff(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> Vec<StoreChange> {
    let mut changes = Vec::new();
    for (key, value) in new {
        if old.get(key) != Some(value) {
            changes.push(StoreChange {
                key: key.clone(),
                old_value: old.get(key).cloned(),
                new_value: Some(value.clone()),
            });
        }
    }
    for (key, value) in old {
        if !new.contains_key(key) {
            changes.push(StoreChange {
                key: key.clone(),
                old_value: Some(value.clone()),
                new_value: None,
            });
        }
    }
    changes
}
