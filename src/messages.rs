use std::fmt;
use std::path::PathBuf;

use crate::config::SoundMode;

/// Monitoring state (observable via watch channel, written only by the Controller)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonitorState {
    #[default]
    Idle,
    Monitoring,
}

/// Alarm playback state, owned by the AlertPlayer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlertState {
    #[default]
    Silent,
    Playing,
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertState::Silent => f.write_str("silent"),
            AlertState::Playing => f.write_str("playing"),
        }
    }
}

/// Commands coming from the UI surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Start,
    Stop,
    Toggle,
    SetThreshold(i64),
    SelectSoundMode(SoundMode),
    ChooseSound(PathBuf),
    Status,
    Hide,
    Show,
    Quit,
}

/// Snapshot of everything the UI needs to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiStatus {
    pub monitor: MonitorState,
    pub alert: AlertState,
    pub threshold: u8,
    pub sound_label: String,
    pub threshold_controls_enabled: bool,
}

impl UiStatus {
    pub fn status_label(&self) -> &'static str {
        match self.monitor {
            MonitorState::Idle => "Status: Not monitoring",
            MonitorState::Monitoring => "Status: Monitoring",
        }
    }
}

impl fmt::Display for UiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Alert at {}%{} | {} | Alarm {}",
            self.status_label(),
            self.threshold,
            if self.threshold_controls_enabled {
                ""
            } else {
                " (locked)"
            },
            self.sound_label,
            self.alert
        )
    }
}
