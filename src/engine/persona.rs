//! Persona overrides
//!
//! Lets operators pin a user's persona for testing. Lookups check the
//! in-memory map first, then the JSON file. When the registry is disabled
//! every lookup misses and the cached persona is used.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::types::Persona;

#[derive(Default)]
struct Overrides {
    in_memory: HashMap<String, Persona>,
    from_file: HashMap<String, Persona>,
}

/// Registry of per-user persona overrides
pub struct PersonaOverrides {
    enabled: bool,
    file: Option<PathBuf>,
    overrides: RwLock<Overrides>,
}

impl PersonaOverrides {
    /// Registry that never overrides anything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            file: None,
            overrides: RwLock::new(Overrides::default()),
        }
    }

    /// Enabled registry, optionally backed by a JSON `{user_id: persona}` file
    pub fn enabled(file: Option<PathBuf>) -> Self {
        let registry = Self {
            enabled: true,
            file,
            overrides: RwLock::new(Overrides::default()),
        };
        registry.reload_file();
        registry
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Override for `user_id`, if any
    pub fn get(&self, user_id: &str) -> Option<Persona> {
        if !self.enabled {
            return None;
        }
        let overrides = self.read();
        overrides
            .in_memory
            .get(user_id)
            .or_else(|| overrides.from_file.get(user_id))
            .copied()
    }

    /// Pin `user_id` to `persona`; returns false when the registry is disabled
    pub fn set(&self, user_id: &str, persona: Persona) -> bool {
        if !self.enabled {
            return false;
        }
        self.write().in_memory.insert(user_id.to_string(), persona);
        debug!(user_id, persona = %persona, "Persona override set");
        true
    }

    /// Drop the in-memory override for `user_id`; returns whether one existed
    pub fn remove(&self, user_id: &str) -> bool {
        self.write().in_memory.remove(user_id).is_some()
    }

    /// All overrides, in-memory entries winning over file entries
    pub fn all(&self) -> HashMap<String, Persona> {
        let overrides = self.read();
        let mut merged = overrides.from_file.clone();
        merged.extend(
            overrides
                .in_memory
                .iter()
                .map(|(user, persona)| (user.clone(), *persona)),
        );
        merged
    }

    /// Re-read the overrides file
    ///
    /// Entries with unknown personas are skipped. A missing or malformed
    /// file leaves the file layer empty.
    pub fn reload_file(&self) {
        let loaded = self
            .file
            .as_deref()
            .map(load_file)
            .unwrap_or_default();
        self.write().from_file = loaded;
    }

    fn read(&self) -> RwLockReadGuard<'_, Overrides> {
        self.overrides.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Overrides> {
        self.overrides.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_file(path: &Path) -> HashMap<String, Persona> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Persona overrides file unreadable");
            return HashMap::new();
        }
    };

    let entries: HashMap<String, String> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Persona overrides file malformed");
            return HashMap::new();
        }
    };

    let overrides: HashMap<String, Persona> = entries
        .into_iter()
        .filter_map(|(user, persona)| Persona::parse(&persona).map(|p| (user, p)))
        .collect();

    info!(
        path = %path.display(),
        count = overrides.len(),
        "Persona overrides loaded"
    );
    overrides
}
