//! External settings-store capability.
//!
//! Provider credentials, model selections, and the fusion-mode flag live
//! in a string-keyed store owned by the host application. The core only
//! needs get/set/remove; persistence and cross-process synchronization
//! stay outside.

use quorum_models::ProviderId;
use std::collections::HashMap;
use std::sync::RwLock;

/// Global flag key selecting fusion mode.
pub const FUSION_MODE_KEY: &str = "fusionMode";

/// Settings key for a provider's API credential.
#[must_use]
pub fn api_key_setting(provider: ProviderId) -> String {
    format!("{provider}_key")
}

/// Settings key for a provider's selected model.
#[must_use]
pub fn model_setting(provider: ProviderId) -> String {
    format!("{provider}_model")
}

/// Settings key for a provider's enabled flag ("true"/"false", absent
/// means enabled).
#[must_use]
pub fn enabled_setting(provider: ProviderId) -> String {
    format!("{provider}_enabled")
}

/// String-keyed settings store.
pub trait SettingsStore: Send + Sync {
    /// Reads a value, absent when the key was never set or was removed.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value.
    fn set(&self, key: &str, value: &str);

    /// Removes a key.
    fn remove(&self, key: &str);
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor seeding a provider with a key and model.
    #[must_use]
    pub fn with_provider(self, provider: ProviderId, api_key: &str, model: &str) -> Self {
        self.set(&api_key_setting(provider), api_key);
        self.set(&model_setting(provider), model);
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.write() {
            values.remove(key);
        }
    }
}
