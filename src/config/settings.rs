// Settings - User preferences persisted as RON

use log::{debug, info};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::SchedulerConfig;
use crate::audio::click::ClickSound;
use crate::sequencer::timeline::{Meter, Tempo};

const SETTINGS_DIR: &str = "metronome";
const SETTINGS_FILE: &str = "settings.ron";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("No configuration directory on this system")]
    NoConfigDir,
}

/// Everything the user can change, as saved between sessions
///
/// Tempo and meter clamp on deserialize, so a hand-edited file can never
/// carry out-of-range values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeSettings {
    pub bpm: Tempo,
    pub beats_per_bar: Meter,
    pub sound: ClickSound,
    pub sound_enabled: bool,
    pub haptics_enabled: bool,
    pub scheduler: SchedulerConfig,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        Self {
            bpm: Tempo::default(),
            beats_per_bar: Meter::default(),
            sound: ClickSound::default(),
            sound_enabled: true,
            haptics_enabled: false,
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Reads and writes `MetronomeSettings` at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/metronome/settings.ron`
    pub fn open_default() -> Result<Self, SettingsError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let base = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(base.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields the defaults
    pub fn load(&self) -> Result<MetronomeSettings, SettingsError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", self.path.display());
                return Ok(MetronomeSettings::default());
            }
            Err(err) => return Err(err.into()),
        };

        let settings = ron::from_str(&contents)?;
        debug!("Loaded settings from {}", self.path.display());
        Ok(settings)
    }

    /// Write settings, creating parent directories as needed
    pub fn save(&self, settings: &MetronomeSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = ron::ser::to_string_pretty(settings, PrettyConfig::default())?;
        fs::write(&self.path, contents)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
