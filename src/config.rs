use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MIN_THRESHOLD: u8 = 10;
pub const MAX_THRESHOLD: u8 = 100;
pub const DEFAULT_THRESHOLD: u8 = 90;

const SETTINGS_FILE: &str = "settings.json";
const AUDIO_DIR: &str = "audio";

/// Charge percentage at which the alert fires, always within 10..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(u8);

impl Threshold {
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(MIN_THRESHOLD as i64, MAX_THRESHOLD as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundMode {
    #[default]
    Default,
    Custom,
}

/// What the alarm plays: the generated tone or an audio file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SoundAsset {
    #[default]
    Default,
    File(PathBuf),
}

impl SoundAsset {
    pub fn mode(&self) -> SoundMode {
        match self {
            SoundAsset::Default => SoundMode::Default,
            SoundAsset::File(_) => SoundMode::Custom,
        }
    }

    pub fn label(&self) -> String {
        match self {
            SoundAsset::Default => "Current Sound: Default Beep".to_string(),
            SoundAsset::File(path) => format!(
                "Current Sound: {}",
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            ),
        }
    }
}

/// Monitoring configuration, published to the monitor as a whole snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorConfig {
    pub threshold: Threshold,
    pub sound: SoundAsset,
}

/// On-disk representation of the settings file
#[derive(Debug, Deserialize, Serialize)]
struct SettingsFile {
    #[serde(default = "default_threshold")]
    threshold: i64,

    #[serde(default)]
    sound_mode: SoundMode,

    #[serde(default)]
    custom_sound_path: Option<PathBuf>,
}

fn default_threshold() -> i64 {
    DEFAULT_THRESHOLD as i64
}

/// File-backed persistence for [`MonitorConfig`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    base_dir: PathBuf,
}

impl SettingsStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store rooted at ~/.config/chargeguard (or $XDG_CONFIG_HOME/chargeguard)
    pub fn default_location() -> Result<Self> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(Self::new(config_dir.join("chargeguard")))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }

    /// Directory imported custom sounds are copied into
    pub fn audio_dir(&self) -> PathBuf {
        self.base_dir.join(AUDIO_DIR)
    }

    /// Load the configuration. Never fails: a missing or unreadable file yields defaults.
    pub fn load(&self) -> MonitorConfig {
        let path = self.settings_path();

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Settings file not found at {:?}, using defaults", path);
                return MonitorConfig::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read settings file {:?}: {}", path, e);
                return MonitorConfig::default();
            }
        };

        let file: SettingsFile = match serde_json::from_str(&contents) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Failed to parse settings file {:?}: {}", path, e);
                return MonitorConfig::default();
            }
        };

        let sound = match (file.sound_mode, file.custom_sound_path) {
            (SoundMode::Custom, Some(stored)) => {
                let resolved = self.base_dir.join(stored);
                if resolved.is_file() {
                    SoundAsset::File(resolved)
                } else {
                    tracing::warn!(
                        "Custom sound {:?} no longer exists, falling back to default tone",
                        resolved
                    );
                    SoundAsset::Default
                }
            }
            _ => SoundAsset::Default,
        };

        let config = MonitorConfig {
            threshold: Threshold::clamped(file.threshold),
            sound,
        };
        tracing::info!("Loaded settings from {:?}", path);
        config
    }

    /// Persist the configuration atomically
    pub fn save(&self, config: &MonitorConfig) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("Failed to create settings directory: {:?}", self.base_dir))?;

        let custom_sound_path = match &config.sound {
            SoundAsset::Default => None,
            SoundAsset::File(path) => Some(
                path.strip_prefix(&self.base_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.clone()),
            ),
        };

        let file = SettingsFile {
            threshold: config.threshold.get() as i64,
            sound_mode: config.sound.mode(),
            custom_sound_path,
        };
        let contents =
            serde_json::to_string_pretty(&file).context("Failed to serialize settings")?;

        let path = self.settings_path();
        let mut temp = tempfile::NamedTempFile::new_in(&self.base_dir)
            .context("Failed to create temporary settings file")?;
        temp.write_all(contents.as_bytes())
            .context("Failed to write temporary settings file")?;
        temp.persist(&path)
            .with_context(|| format!("Failed to write settings file: {:?}", path))?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }
}
