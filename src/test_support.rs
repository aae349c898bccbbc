//! Fakes shared by unit tests

use crate::audio::{AudioBackend, Clip, PlaybackTiming, Tone};
use crate::battery::{BatteryReader, BatteryReading};
use crate::notifications::NotificationSink;
use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub fn fast_timing() -> PlaybackTiming {
    PlaybackTiming {
        tone: Tone {
            frequency_hz: 2500.0,
            duration: Duration::from_millis(20),
        },
        gap: Duration::from_millis(20),
        poll: Duration::from_millis(10),
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub struct ScriptedBattery {
    reading: Mutex<BatteryReading>,
}

impl ScriptedBattery {
    pub fn new(reading: BatteryReading) -> Arc<Self> {
        Arc::new(Self {
            reading: Mutex::new(reading),
        })
    }

    pub fn set(&self, reading: BatteryReading) {
        *self.reading.lock().unwrap() = reading;
    }
}

impl BatteryReader for ScriptedBattery {
    fn read(&self) -> BatteryReading {
        *self.reading.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    bodies: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn post_alert(&self, _title: &str, body: &str) {
        self.bodies.lock().unwrap().push(body.to_string());
    }
}

/// Simulated output device: every clip lasts `clip_length`, files must exist
pub struct FakeAudio {
    clip_length: Duration,
    dead: bool,
    attempts: AtomicUsize,
    playing: AtomicUsize,
    max_concurrent: AtomicUsize,
    started: AtomicUsize,
    tones: AtomicUsize,
}

impl FakeAudio {
    pub fn new(clip_length: Duration) -> Arc<Self> {
        Self::build(clip_length, false)
    }

    /// A device that cannot be opened: every clip fails
    pub fn dead() -> Arc<Self> {
        Self::build(Duration::ZERO, true)
    }

    fn build(clip_length: Duration, dead: bool) -> Arc<Self> {
        Arc::new(Self {
            clip_length,
            dead,
            attempts: AtomicUsize::new(0),
            playing: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            tones: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn playing(&self) -> usize {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    pub fn clips_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn tones_played(&self) -> usize {
        self.tones.load(Ordering::SeqCst)
    }
}

impl AudioBackend for FakeAudio {
    fn play(&self, clip: &Clip, keep_going: &dyn Fn() -> bool, poll: Duration) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.dead {
            anyhow::bail!("no audio output device");
        }

        match clip {
            Clip::File(path) if !path.is_file() => {
                anyhow::bail!("no such file: {}", path.display())
            }
            Clip::File(_) => {}
            Clip::Tone(_) => {
                self.tones.fetch_add(1, Ordering::SeqCst);
            }
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        let now_playing = self.playing.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now_playing, Ordering::SeqCst);

        let started = Instant::now();
        while started.elapsed() < self.clip_length && keep_going() {
            std::thread::sleep(poll);
        }

        self.playing.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
