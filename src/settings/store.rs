use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::camera::error::{CameraError, Result};
use crate::settings::types::SessionSettings;

/// Persistent session settings backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<SessionSettings>,
}

impl SettingsStore {
    /// Create a new store, loading from disk if the file exists.
    ///
    /// An unreadable file is logged and replaced by defaults on next save.
    pub fn new(path: PathBuf) -> Self {
        let data = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring settings at {}: {e}", path.display());
            SessionSettings::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Load settings from a JSON file, returning defaults on a missing file.
    pub fn load(path: &Path) -> Result<SessionSettings> {
        if !path.exists() {
            return Ok(SessionSettings::default());
        }
        let contents = std::fs::read_to_string(path).map_err(settings_err)?;
        serde_json::from_str(&contents).map_err(settings_err)
    }

    /// Save current settings to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data).map_err(settings_err)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(settings_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(settings_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(settings_err)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings.
    pub fn get(&self) -> SessionSettings {
        self.data.lock().clone()
    }

    /// Modify the settings in memory. Call [`Self::save`] to persist.
    pub fn update(&self, f: impl FnOnce(&mut SessionSettings)) {
        f(&mut self.data.lock());
    }
}

fn settings_err(e: impl std::fmt::Display) -> CameraError {
    CameraError::Settings(e.to_string())
}
