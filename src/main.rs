mod app;
mod audio;
mod battery;
mod commands;
mod config;
mod controller;
mod messages;
mod notifications;
mod services;
#[cfg(test)]
mod test_support;

use app::App;
use audio::{AlertPlayer, PlaybackTiming, RodioBackend};
use battery::SysfsBattery;
use config::SettingsStore;
use controller::{Controller, MonitorDeps};
use notifications::DesktopNotifier;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting battery charge monitor");

    let store = SettingsStore::default_location().unwrap_or_else(|e| {
        tracing::warn!("{:#}, keeping settings in the working directory", e);
        SettingsStore::new(".chargeguard")
    });
    let deps = MonitorDeps {
        reader: Arc::new(SysfsBattery::default()),
        notifier: Arc::new(DesktopNotifier),
        player: Arc::new(AlertPlayer::new(
            Arc::new(RodioBackend),
            PlaybackTiming::default(),
        )),
        tick_interval: services::TICK_INTERVAL,
    };
    let controller = Controller::new(store, deps);

    let (command_tx, command_rx) = mpsc::channel(10);
    commands::spawn_console_reader(command_tx)?;

    App::new(controller, command_rx).run().await
}
