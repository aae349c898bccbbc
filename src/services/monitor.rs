use crate::audio::{AlertPlayer, Liveness};
use crate::battery::{BatteryReader, BatteryReading};
use crate::config::MonitorConfig;
use crate::messages::MonitorState;
use crate::notifications::{APP_NAME, NotificationSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// What a single poll asks the alarm to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// No usable reading, leave everything as it is
    Skip,
    /// Plugged in at or above the threshold
    Raise { percent: u8 },
    /// Unplugged, silence regardless of charge
    Clear,
    /// Plugged in below the threshold
    Hold,
}

pub fn decide(reading: &BatteryReading, threshold: u8) -> TickDecision {
    if !reading.is_valid() {
        TickDecision::Skip
    } else if !reading.plugged_in {
        TickDecision::Clear
    } else if reading.percent >= threshold {
        TickDecision::Raise {
            percent: reading.percent,
        }
    } else {
        TickDecision::Hold
    }
}

/// Polls the battery and drives the alert player
///
/// Runs as a tokio task while the monitor state is `Monitoring`. Threshold and
/// sound are taken from the latest config snapshot on every tick.
pub struct MonitorLoop {
    reader: Arc<dyn BatteryReader>,
    notifier: Arc<dyn NotificationSink>,
    player: Arc<AlertPlayer>,
    config_rx: watch::Receiver<MonitorConfig>,
    state_rx: watch::Receiver<MonitorState>,
    tick_interval: Duration,
    in_episode: bool,
}

impl MonitorLoop {
    pub fn new(
        reader: Arc<dyn BatteryReader>,
        notifier: Arc<dyn NotificationSink>,
        player: Arc<AlertPlayer>,
        config_rx: watch::Receiver<MonitorConfig>,
        state_rx: watch::Receiver<MonitorState>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            reader,
            notifier,
            player,
            config_rx,
            state_rx,
            tick_interval,
            in_episode: false,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Battery monitoring started ({:?} interval)", self.tick_interval);

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *self.state_rx.borrow_and_update() != MonitorState::Monitoring {
                break;
            }

            tokio::select! {
                biased;

                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                _ = ticker.tick() => self.tick(),
            }
        }

        self.player.stop();
        tracing::info!("Battery monitoring stopped");
    }

    /// One polling decision
    pub fn tick(&mut self) {
        if *self.state_rx.borrow() != MonitorState::Monitoring {
            return;
        }

        let reading = self.reader.read();
        let config = self.config_rx.borrow().clone();
        let decision = decide(&reading, config.threshold.get());
        tracing::debug!("Tick: {:?} -> {:?}", reading, decision);

        match decision {
            TickDecision::Skip => {}
            TickDecision::Raise { percent } => {
                if !self.in_episode {
                    self.in_episode = true;
                    self.notifier.post_alert(
                        APP_NAME,
                        &format!("Battery at {}%! Please unplug.", percent),
                    );
                }
                self.player.start(config.sound, self.liveness());
            }
            TickDecision::Clear => {
                self.in_episode = false;
                self.player.stop();
            }
            TickDecision::Hold => {
                self.in_episode = false;
            }
        }
    }

    /// Still monitoring, and still plugged in at or above the current threshold
    fn liveness(&self) -> Liveness {
        let reader = self.reader.clone();
        let config_rx = self.config_rx.clone();
        let state_rx = self.state_rx.clone();

        Arc::new(move || {
            if *state_rx.borrow() != MonitorState::Monitoring {
                return false;
            }
            let threshold = config_rx.borrow().threshold.get();
            match decide(&reader.read(), threshold) {
                TickDecision::Raise { .. } | TickDecision::Skip => true,
                TickDecision::Clear | TickDecision::Hold => false,
            }
        })
    }
}
