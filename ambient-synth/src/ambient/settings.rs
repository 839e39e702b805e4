use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Per-park choice of ambient character.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NatureStyle {
    /// Bird events only, no continuous noise bed.
    #[default]
    Birds,
    /// The preset as defined, noise bed included.
    Wind,
}

impl NatureStyle {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "birds" => Self::Birds,
            _ => Self::Wind,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Birds => "birds",
            Self::Wind => "wind",
        }
    }
}

impl fmt::Display for NatureStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the persisted sound preferences the engine consults
/// when a scene starts.
pub trait SoundSettings {
    /// Per-park sound flag. Parks are enabled unless explicitly muted.
    fn is_sound_enabled_for(&self, key: &str) -> bool;

    fn is_global_sound_enabled(&self) -> bool;

    fn nature_style_for(&self, key: &str) -> NatureStyle;
}

/// JSON model of the sound preferences, in the same shape the web page keeps
/// in local storage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsStore {
    sound_enabled: HashMap<String, bool>,
    nature_style: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    global_sound_enabled: Option<bool>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads settings from `path`. A missing file yields defaults; an
    /// unreadable or malformed one yields defaults and a warning.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).unwrap_or_else(|err| {
                log::warn!("Ignoring settings in {}: {}", path.display(), err);
                Self::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                log::warn!("Cannot read settings {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| EngineError::Settings {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn set_sound_enabled_for(&mut self, key: &str, enabled: bool) {
        self.sound_enabled.insert(key.to_string(), enabled);
    }

    pub fn set_nature_style_for(&mut self, key: &str, style: NatureStyle) {
        self.nature_style
            .insert(key.to_string(), style.as_str().to_string());
    }

    pub fn set_global_sound_enabled(&mut self, enabled: bool) {
        self.global_sound_enabled = Some(enabled);
    }
}

impl SoundSettings for SettingsStore {
    fn is_sound_enabled_for(&self, key: &str) -> bool {
        self.sound_enabled.get(key).copied().unwrap_or(true)
    }

    fn is_global_sound_enabled(&self) -> bool {
        self.global_sound_enabled.unwrap_or(true)
    }

    fn nature_style_for(&self, key: &str) -> NatureStyle {
        self.nature_style
            .get(key)
            .map(|style| NatureStyle::parse(style))
            .unwrap_or_default()
    }
}

/// Shared settings: the host keeps one handle to edit preferences while the
/// engine reads through another.
impl<T> SoundSettings for Arc<Mutex<T>>
where
    T: SoundSettings,
{
    fn is_sound_enabled_for(&self, key: &str) -> bool {
        self.lock()
            .map(|settings| settings.is_sound_enabled_for(key))
            .unwrap_or(true)
    }

    fn is_global_sound_enabled(&self) -> bool {
        self.lock()
            .map(|settings| settings.is_global_sound_enabled())
            .unwrap_or(true)
    }

    fn nature_style_for(&self, key: &str) -> NatureStyle {
        self.lock()
            .map(|settings| settings.nature_style_for(key))
            .unwrap_or_default()
    }
}
