use crate::commands;
use crate::controller::Controller;
use crate::messages::UiCommand;

use anyhow::Result;
use std::ops::ControlFlow;
use tokio::sync::mpsc;

/// The interactive surface: feeds console commands to the controller
pub struct App {
    controller: Controller,
    command_rx: mpsc::Receiver<UiCommand>,
    console_open: bool,
    visible: bool,
    #[cfg(test)]
    shown: Vec<String>,
}

impl App {
    pub fn new(controller: Controller, command_rx: mpsc::Receiver<UiCommand>) -> Self {
        println!("{}", commands::HELP);
        println!("{}", controller.status());

        Self {
            controller,
            command_rx,
            console_open: true,
            visible: true,
            #[cfg(test)]
            shown: Vec::new(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut alert_rx = self.controller.alert_updates();

        loop {
            tokio::select! {
                Ok(()) = alert_rx.changed() => {
                    let state = *alert_rx.borrow_and_update();
                    self.feedback(&format!("Alarm {}", state));
                }
                command = self.command_rx.recv(), if self.console_open => match command {
                    Some(command) => {
                        if self.handle_command(command).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        self.console_open = false;
                        self.visible = false;
                        tracing::info!("Console closed, still running in the background (Ctrl+C to quit)");
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.controller.shutdown().await;
        tracing::info!("Battery monitor shutdown complete");
        Ok(())
    }

    async fn handle_command(&mut self, command: UiCommand) -> ControlFlow<()> {
        tracing::debug!("handle_command: {:?}", command);

        match command {
            UiCommand::Start => {
                if !self.controller.start_monitoring() {
                    self.feedback("Already monitoring");
                }
            }
            UiCommand::Stop => self.controller.stop_monitoring().await,
            UiCommand::Toggle => self.controller.toggle_monitoring().await,
            UiCommand::SetThreshold(value) => match self.controller.edit_threshold(value) {
                Ok(threshold) if threshold.get() as i64 != value => {
                    self.feedback(&format!("Threshold clamped to {}%", threshold.get()));
                }
                Ok(_) => {}
                Err(locked) => {
                    self.feedback(&locked.to_string());
                    return ControlFlow::Continue(());
                }
            },
            UiCommand::SelectSoundMode(mode) => {
                let sound = self.controller.select_sound_mode(mode);
                if sound.mode() != mode {
                    self.feedback("No custom sound selected, using Default Beep");
                }
            }
            UiCommand::ChooseSound(path) => {
                if let Err(e) = self.controller.choose_custom_sound(&path) {
                    tracing::error!("Error choosing sound: {}", e);
                    self.feedback(&e.to_string());
                }
            }
            UiCommand::Status => {}
            UiCommand::Hide => {
                self.visible = false;
                tracing::info!("Window hidden, monitoring continues in the background");
                return ControlFlow::Continue(());
            }
            UiCommand::Show => self.visible = true,
            UiCommand::Quit => return ControlFlow::Break(()),
        }

        let status = self.controller.status().to_string();
        self.feedback(&status);
        ControlFlow::Continue(())
    }

    fn feedback(&mut self, message: &str) {
        if self.visible {
            println!("{}", message);
        }
        #[cfg(test)]
        self.shown.push(message.to_string());
    }
}
