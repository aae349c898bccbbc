use crate::config::SoundMode;
use crate::messages::UiCommand;
use anyhow::{Context, Result, anyhow};
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc;

pub const HELP: &str = "commands: start | stop | toggle | threshold <10-100> | \
sound default | sound custom | sound <file> | status | hide | show | quit";

/// Parse one console line into a UI command
pub fn parse_command(line: &str) -> Result<UiCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match (word.to_ascii_lowercase().as_str(), rest) {
        ("start", "") => UiCommand::Start,
        ("stop", "") => UiCommand::Stop,
        ("toggle", "") => UiCommand::Toggle,
        ("status", "") => UiCommand::Status,
        ("hide", "") | ("close", "") => UiCommand::Hide,
        ("show", "") | ("open", "") => UiCommand::Show,
        ("quit", "") | ("exit", "") => UiCommand::Quit,
        ("threshold", value) if !value.is_empty() => {
            let value = value
                .trim_end_matches('%')
                .parse::<i64>()
                .map_err(|_| anyhow!("threshold must be a whole number, got {:?}", value))?;
            UiCommand::SetThreshold(value)
        }
        ("sound", "default") => UiCommand::SelectSoundMode(SoundMode::Default),
        ("sound", "custom") => UiCommand::SelectSoundMode(SoundMode::Custom),
        ("sound", path) if !path.is_empty() => UiCommand::ChooseSound(PathBuf::from(path)),
        _ => return Err(anyhow!("unknown command {:?}", line)),
    };

    Ok(command)
}

/// Read commands from stdin on a dedicated thread and forward them to the app loop
///
/// A blocking stdin read cannot be cancelled, so the thread is detached and
/// never holds up process exit. It ends when stdin closes or the app loop is gone.
pub fn spawn_console_reader(tx: mpsc::Sender<UiCommand>) -> Result<()> {
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            if let Err(e) = read_console(std::io::stdin().lock(), &tx) {
                tracing::warn!("Console input failed: {}", e);
            }
        })
        .context("Failed to spawn console thread")?;
    Ok(())
}

fn read_console(input: impl BufRead, tx: &mpsc::Sender<UiCommand>) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(command) => {
                tracing::debug!("Console command: {:?}", command);
                if tx.blocking_send(command).is_err() {
                    break;
                }
            }
            Err(e) => {
                println!("{}", e);
                println!("{}", HELP);
            }
        }
    }

    Ok(())
}
