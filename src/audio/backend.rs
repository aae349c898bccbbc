use anyhow::{Context, Result};
use rodio::source::SineWave;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

/// A fixed-frequency beep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration: Duration,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            frequency_hz: 2500.0,
            duration: Duration::from_millis(1000),
        }
    }
}

/// One unit of alarm audio
#[derive(Debug, Clone, PartialEq)]
pub enum Clip {
    Tone(Tone),
    File(PathBuf),
}

/// Blocking audio output used by the alert player
///
/// `play` returns once the clip has finished, or as soon as `keep_going`
/// returns false (checked every `poll`), in which case the output is halted
/// mid-clip.
pub trait AudioBackend: Send + Sync {
    fn play(&self, clip: &Clip, keep_going: &dyn Fn() -> bool, poll: Duration) -> Result<()>;
}

/// Plays clips on the default output device through rodio
#[derive(Debug, Default)]
pub struct RodioBackend;

impl AudioBackend for RodioBackend {
    fn play(&self, clip: &Clip, keep_going: &dyn Fn() -> bool, poll: Duration) -> Result<()> {
        let mut stream =
            OutputStreamBuilder::open_default_stream().context("Failed to open audio stream")?;
        stream.log_on_drop(false);

        let sink = Sink::connect_new(stream.mixer());
        match clip {
            Clip::Tone(tone) => {
                let source = SineWave::new(tone.frequency_hz)
                    .take_duration(tone.duration)
                    .amplify(0.25);
                sink.append(source);
            }
            Clip::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open sound file {}", path.display()))?;
                let source = Decoder::new(BufReader::new(file))
                    .with_context(|| format!("Failed to decode sound file {}", path.display()))?;
                sink.append(source);
            }
        }

        while !sink.empty() {
            if !keep_going() {
                sink.stop();
                break;
            }
            std::thread::sleep(poll);
        }

        Ok(())
    }
}
