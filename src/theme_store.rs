//! Theme preference store
//!
//! Holds the active `Theme`, persists it in a `PreferenceStore` and keeps
//! every context that shares the store in step:
//! - `open`/`load` read the persisted value, correcting anything invalid to purple
//! - `set` is a no-op for the active theme, otherwise persist + apply + notify
//! - changes written by other contexts arrive through `watch_external`
//!
//! Persistence failures never surface: the in-memory theme stays
//! authoritative for the session.
//!
//! The `current` lock is held while persisting, applying and notifying, so
//! memory, storage and the visual layer always end on the same theme.

use crate::storage::{PreferenceStore, StoreChange};
use crate::theme::Theme;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const DEFAULT_STORAGE_KEY: &str = "portfolio-theme";

/// Applies a theme to the visual layer (colour tokens, active control)
pub trait ThemeApplier: Send + Sync {
    fn apply_theme(&self, theme: Theme);
}

pub struct ThemeStore {
    store: Arc<dyn PreferenceStore>,
    key: String,
    applier: Arc<dyn ThemeApplier>,
    current: Mutex<Theme>,
    changes: broadcast::Sender<Theme>,
}

impl ThemeStore {
    /// Create a store and load the persisted theme
    pub fn open(
        store: Arc<dyn PreferenceStore>,
        key: impl Into<String>,
        applier: Arc<dyn ThemeApplier>,
    ) -> Arc<Self> {
        let (changes, _) = broadcast::channel(16);
        let this = Arc::new(Self {
            store,
            key: key.into(),
            applier,
            current: Mutex::new(Theme::default()),
            changes,
        });
        this.load();
        this
    }

    /// Re-read the persisted theme; invalid or missing values reset to purple
    pub fn load(&self) -> Theme {
        let mut current = self.lock();
        let stored = self.store.get(&self.key);
        let theme = match Theme::from_stored(stored.as_deref()) {
            Some(theme) => theme,
            None => {
                tracing::debug!(
                    "Stored theme {:?} invalid or missing, resetting to {}",
                    stored,
                    Theme::default()
                );
                let theme = Theme::default();
                self.persist(theme);
                theme
            }
        };

        *current = theme;
        self.applier.apply_theme(theme);
        theme
    }

    pub fn get(&self) -> Theme {
        *self.lock()
    }

    /// Select a theme; returns `true` if it changed
    pub fn set(&self, theme: Theme) -> bool {
        let mut current = self.lock();
        if *current == theme {
            return false;
        }
        *current = theme;

        tracing::info!("Theme set to {}", theme);
        self.persist(theme);
        self.applier.apply_theme(theme);
        let _ = self.changes.send(theme);
        true
    }

    /// Theme change notifications (`set` and external changes, not `load`)
    pub fn subscribe(&self) -> broadcast::Receiver<Theme> {
        self.changes.subscribe()
    }

    /// Handle a change written by another context
    pub fn apply_external(&self, change: &StoreChange) {
        if change.key != self.key {
            return;
        }

        let mut current = self.lock();
        let theme = match Theme::from_stored(change.new_value.as_deref()) {
            Some(theme) => theme,
            None => {
                tracing::debug!(
                    "External theme value {:?} invalid, correcting to {}",
                    change.new_value,
                    Theme::default()
                );
                let theme = Theme::default();
                self.persist(theme);
                theme
            }
        };

        if *current == theme {
            return;
        }
        *current = theme;

        tracing::info!("Theme changed externally to {}", theme);
        self.applier.apply_theme(theme);
        let _ = self.changes.send(theme);
    }

    /// Spawn the listener for changes made by other contexts
    pub fn watch_external(self: &Arc<Self>) -> JoinHandle<()> {
        let rx = self.store.subscribe();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Ok(change) = rx.recv_async().await {
                this.apply_external(&change);
            }
        })
    }

    fn persist(&self, theme: Theme) {
        if let Err(e) = self.store.set(&self.key, theme.as_str()) {
            tracing::warn!("Could not save theme: {}", e);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Theme> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
