use crate::audio::AlertPlayer;
use crate::battery::BatteryReader;
use crate::config::{MonitorConfig, SettingsStore, SoundAsset, SoundMode, Threshold};
use crate::messages::{AlertState, MonitorState, UiStatus};
use crate::notifications::NotificationSink;
use crate::services::MonitorLoop;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const SUPPORTED_SOUND_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

/// Why a custom sound could not be used. The config is left untouched.
#[derive(Debug, Error)]
pub enum SoundSelectionError {
    #[error("sound file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported sound format: {} (expected one of mp3, wav, ogg)", .0.display())]
    Unsupported(PathBuf),

    #[error("failed to import sound file: {0}")]
    Import(#[from] std::io::Error),
}

/// The threshold controls are disabled while monitoring
#[derive(Debug, Error, PartialEq, Eq)]
#[error("threshold is locked while monitoring, stop monitoring first")]
pub struct ThresholdLocked;

/// Everything the controller needs to run a monitor
pub struct MonitorDeps {
    pub reader: Arc<dyn BatteryReader>,
    pub notifier: Arc<dyn NotificationSink>,
    pub player: Arc<AlertPlayer>,
    pub tick_interval: Duration,
}

/// Applies UI commands to the monitor and the alert player
///
/// The controller is the only writer of both the config snapshot and the
/// monitor state; the running monitor only reads them.
pub struct Controller {
    store: SettingsStore,
    deps: MonitorDeps,
    config_tx: watch::Sender<MonitorConfig>,
    state_tx: watch::Sender<MonitorState>,
    monitor_task: Option<JoinHandle<()>>,
    /// Most recently imported custom sound, kept so the mode can be toggled back
    imported_sound: Option<PathBuf>,
}

impl Controller {
    pub fn new(store: SettingsStore, deps: MonitorDeps) -> Self {
        let config = store.load();
        let imported_sound = match &config.sound {
            SoundAsset::File(path) => Some(path.clone()),
            SoundAsset::Default => None,
        };
        let (config_tx, _) = watch::channel(config);
        let (state_tx, _) = watch::channel(MonitorState::Idle);

        Self {
            store,
            deps,
            config_tx,
            state_tx,
            monitor_task: None,
            imported_sound,
        }
    }

    pub fn config(&self) -> MonitorConfig {
        self.config_tx.borrow().clone()
    }

    pub fn monitor_state(&self) -> MonitorState {
        *self.state_tx.borrow()
    }

    pub fn alert_updates(&self) -> watch::Receiver<AlertState> {
        self.deps.player.subscribe()
    }

    pub fn status(&self) -> UiStatus {
        let config = self.config();
        let monitor = self.monitor_state();
        UiStatus {
            monitor,
            alert: self.deps.player.state(),
            threshold: config.threshold.get(),
            sound_label: config.sound.label(),
            threshold_controls_enabled: monitor == MonitorState::Idle,
        }
    }

    pub fn set_threshold(&mut self, value: i64) -> Threshold {
        let threshold = Threshold::clamped(value);
        if threshold.get() as i64 != value {
            tracing::info!("Threshold {} clamped to {}", value, threshold.get());
        }
        self.update_config(|config| config.threshold = threshold);
        threshold
    }

    /// Threshold edit coming from the UI controls, refused while they are disabled
    pub fn edit_threshold(&mut self, value: i64) -> Result<Threshold, ThresholdLocked> {
        if self.monitor_state() == MonitorState::Monitoring {
            return Err(ThresholdLocked);
        }
        Ok(self.set_threshold(value))
    }

    /// Import `path` as the alarm sound and switch to custom mode
    pub fn choose_custom_sound(&mut self, path: &Path) -> Result<PathBuf, SoundSelectionError> {
        if !path.is_file() {
            return Err(SoundSelectionError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| SUPPORTED_SOUND_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| SoundSelectionError::Unsupported(path.to_path_buf()))?;

        let audio_dir = self.store.audio_dir();
        std::fs::create_dir_all(&audio_dir)?;
        let imported = audio_dir.join(format!("custom_sound_{}.{}", uuid::Uuid::new_v4(), extension));
        std::fs::copy(path, &imported).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SoundSelectionError::NotFound(path.to_path_buf()),
            _ => SoundSelectionError::Import(e),
        })?;
        tracing::info!("Imported custom sound {:?} as {:?}", path, imported);

        if let Some(previous) = self.imported_sound.replace(imported.clone()) {
            if previous.starts_with(&audio_dir) && previous != imported {
                if let Err(e) = std::fs::remove_file(&previous) {
                    tracing::debug!("Could not remove previous sound {:?}: {}", previous, e);
                }
            }
        }

        let sound = SoundAsset::File(imported.clone());
        self.update_config(|config| config.sound = sound);
        Ok(imported)
    }

    /// Switch between the default tone and the last imported sound
    pub fn select_sound_mode(&mut self, mode: SoundMode) -> SoundAsset {
        let sound = match mode {
            SoundMode::Default => SoundAsset::Default,
            SoundMode::Custom => match &self.imported_sound {
                Some(path) if path.is_file() => SoundAsset::File(path.clone()),
                _ => {
                    tracing::warn!("No custom sound selected, using default tone");
                    self.imported_sound = None;
                    SoundAsset::Default
                }
            },
        };
        self.update_config(|config| config.sound = sound.clone());
        sound
    }

    /// Spawn the monitor loop unless one is already running
    pub fn start_monitoring(&mut self) -> bool {
        if self
            .monitor_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            tracing::debug!("Monitoring already running");
            return false;
        }

        self.state_tx.send_replace(MonitorState::Monitoring);
        let monitor = MonitorLoop::new(
            self.deps.reader.clone(),
            self.deps.notifier.clone(),
            self.deps.player.clone(),
            self.config_tx.subscribe(),
            self.state_tx.subscribe(),
            self.deps.tick_interval,
        );
        self.monitor_task = Some(tokio::spawn(monitor.run()));
        true
    }

    /// Stop monitoring and silence the alarm. Returns once the loop has exited.
    pub async fn stop_monitoring(&mut self) {
        self.state_tx.send_replace(MonitorState::Idle);
        self.deps.player.stop();

        if let Some(task) = self.monitor_task.take() {
            if let Err(e) = task.await {
                tracing::error!("Monitor task failed: {}", e);
            }
        }

        // A tick racing with the state change may have re-armed the alarm
        self.deps.player.stop();
    }

    pub async fn toggle_monitoring(&mut self) {
        match self.monitor_state() {
            MonitorState::Idle => {
                self.start_monitoring();
            }
            MonitorState::Monitoring => self.stop_monitoring().await,
        }
    }

    /// Release everything before the process exits
    pub async fn shutdown(&mut self) {
        self.stop_monitoring().await;
        tracing::info!("Controller shut down");
    }

    fn update_config(&mut self, apply: impl FnOnce(&mut MonitorConfig)) {
        let mut config = self.config();
        apply(&mut config);
        self.config_tx.send_replace(config.clone());

        if let Err(e) = self.store.save(&config) {
            tracing::warn!("Failed to save settings: {:#}", e);
        }
    }
}
