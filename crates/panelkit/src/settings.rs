//! Persistent UI state.
//!
//! [`Settings`] is a thread-safe tree of JSON values addressed by
//! path-based keys. Widgets such as
//! [`SplitWidget`](crate::widget::widgets::SplitWidget) store their layout
//! state here so it survives between sessions.
//!
//! # Path-Based Access
//!
//! Paths use "." or "/" as separators; intermediate objects are created on
//! write:
//!
//! ```
//! use panelkit::settings::Settings;
//!
//! let settings = Settings::new();
//! settings.set("panels.network.sidebar", 240);
//! settings.set("panels/console/visible", true);
//!
//! assert_eq!(settings.get_deserialized::<u32>("panels.network.sidebar"), Some(240));
//! assert_eq!(settings.group_keys("panels").len(), 2);
//! ```
//!
//! # Persistence
//!
//! ```no_run
//! use panelkit::settings::Settings;
//!
//! # fn main() -> panelkit::error::SettingsResult<()> {
//! let settings = Settings::load_json("ui-state.json")?;
//! settings.set("theme", "dark");
//! settings.save_json("ui-state.json")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use panelkit_core::Signal;
use panelkit_core::logging::targets;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{SettingsError, SettingsResult};

/// A hierarchical key-value store of JSON values.
pub struct Settings {
    data: RwLock<Map<String, Value>>,
    /// Emitted with the key path after every change; empty after `clear`.
    changed: Signal<String>,
    auto_save: RwLock<Option<PathBuf>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("data", &*self.data.read())
            .field("auto_save", &*self.auto_save.read())
            .finish()
    }
}

impl Settings {
    /// Creates a new empty settings store.
    pub fn new() -> Self {
        Self::from_data(Map::new())
    }

    /// Creates settings from a JSON object.
    pub fn from_data(data: Map<String, Value>) -> Self {
        Self {
            data: RwLock::new(data),
            changed: Signal::new(),
            auto_save: RwLock::new(None),
        }
    }

    /// Signal emitted whenever a value is modified.
    pub fn changed(&self) -> &Signal<String> {
        &self.changed
    }

    /// Save to `path` after every change.
    pub fn set_auto_save(&self, path: impl AsRef<Path>) {
        *self.auto_save.write() = Some(path.as_ref().to_path_buf());
    }

    pub fn disable_auto_save(&self) {
        *self.auto_save.write() = None;
    }

    pub fn is_auto_save_enabled(&self) -> bool {
        self.auto_save.read().is_some()
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Sets a value at the specified path.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        let parts = parse_path(path);
        if parts.is_empty() {
            return;
        }
        set_nested(&mut self.data.write(), &parts, value.into());
        self.changed.emit(path.to_string());
        self.try_auto_save();
    }

    /// Stores any serializable value at the specified path.
    pub fn set_serialized<T: Serialize>(&self, path: &str, value: &T) -> SettingsResult<()> {
        let value = serde_json::to_value(value)?;
        self.set(path, value);
        Ok(())
    }

    /// Reads the value at `path` as `T`.
    ///
    /// Returns `None` if the path is missing or the value does not
    /// deserialize; the latter is logged, as it usually means the stored
    /// format changed.
    pub fn get_deserialized<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.get_raw(path)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(target: targets::SETTINGS, path, %error, "ignoring malformed setting");
                None
            }
        }
    }

    /// Like [`get_deserialized`](Self::get_deserialized), with a fallback.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get_deserialized(path).unwrap_or(default)
    }

    /// The raw JSON value at `path`.
    pub fn get_raw(&self, path: &str) -> Option<Value> {
        let data = self.data.read();
        get_nested(&data, &parse_path(path)).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        let data = self.data.read();
        get_nested(&data, &parse_path(path)).is_some()
    }

    /// Removes and returns the value at `path`.
    pub fn remove(&self, path: &str) -> Option<Value> {
        let parts = parse_path(path);
        let removed = remove_nested(&mut self.data.write(), &parts);
        if removed.is_some() {
            self.changed.emit(path.to_string());
            self.try_auto_save();
        }
        removed
    }

    pub fn clear(&self) {
        self.data.write().clear();
        self.changed.emit(String::new());
        self.try_auto_save();
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Keys of the object at `path`.
    pub fn group_keys(&self, path: &str) -> Vec<String> {
        let data = self.data.read();
        match get_nested(&data, &parse_path(path)) {
            Some(Value::Object(object)) => object.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Loads settings from a JSON file. A missing file yields empty settings.
    pub fn load_json(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: targets::SETTINGS, path = %path.display(), "no settings file, starting empty");
                return Ok(Self::new());
            }
            Err(error) => return Err(SettingsError::io(path, error)),
        };
        let data: Map<String, Value> = serde_json::from_str(&content)?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), keys = data.len(), "loaded settings");
        Ok(Self::from_data(data))
    }

    /// Saves settings to a JSON file.
    ///
    /// The file is replaced atomically by writing a sibling temporary file
    /// and renaming it over the target.
    pub fn save_json(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.data.read())?;
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        std::fs::write(&temp, json).map_err(|e| SettingsError::io(&temp, e))?;
        std::fs::rename(&temp, path).map_err(|e| SettingsError::io(path, e))?;
        Ok(())
    }

    /// Saves to the auto-save file, if one is configured.
    pub fn sync(&self) -> SettingsResult<()> {
        let path = self.auto_save.read().clone();
        match path {
            Some(path) => self.save_json(path),
            None => Ok(()),
        }
    }

    fn try_auto_save(&self) {
        if let Err(error) = self.sync() {
            tracing::error!(target: targets::SETTINGS, %error, "failed to auto-save settings");
        }
    }
}

/// Settings shared between widgets.
pub type SharedSettings = Arc<Settings>;

fn parse_path(path: &str) -> Vec<&str> {
    path.split(['.', '/']).filter(|part| !part.is_empty()).collect()
}

fn get_nested<'a>(data: &'a Map<String, Value>, parts: &[&str]) -> Option<&'a Value> {
    let (last, parents) = parts.split_last()?;
    let mut current = data;
    for part in parents {
        current = current.get(*part)?.as_object()?;
    }
    current.get(*last)
}

fn set_nested(data: &mut Map<String, Value>, parts: &[&str], value: Value) {
    let Some((last, parents)) = parts.split_last() else {
        return;
    };
    let mut current = data;
    for part in parents {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

fn remove_nested(data: &mut Map<String, Value>, parts: &[&str]) -> Option<Value> {
    let (last, parents) = parts.split_last()?;
    let mut current = data;
    for part in parents {
        current = current.get_mut(*part)?.as_object_mut()?;
    }
    current.remove(*last)
}
