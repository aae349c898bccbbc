use super::backend::{AudioBackend, Clip, Tone};
use crate::config::SoundAsset;
use crate::messages::AlertState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// Predicate re-checked during playback; playback continues only while it holds
pub type Liveness = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct PlaybackTiming {
    pub tone: Tone,
    /// Pause between two alarm cycles
    pub gap: Duration,
    /// How often the liveness predicate is re-checked
    pub poll: Duration,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            gap: Duration::from_secs(1),
            poll: Duration::from_millis(100),
        }
    }
}

struct Activity {
    generation: u64,
    cancel: Arc<AtomicBool>,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    active: Option<Activity>,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<AlertState>,
    /// Held by the playback thread for as long as it may touch the output device
    device: Mutex<()>,
}

/// Owns the alarm playback activity
///
/// At most one playback thread is live at a time. `start` is a no-op while
/// playing, `stop` interrupts the current clip and returns to Silent at once.
pub struct AlertPlayer {
    backend: Arc<dyn AudioBackend>,
    timing: PlaybackTiming,
    shared: Arc<Shared>,
}

impl AlertPlayer {
    pub fn new(backend: Arc<dyn AudioBackend>, timing: PlaybackTiming) -> Self {
        let (state_tx, _) = watch::channel(AlertState::Silent);
        Self {
            backend,
            timing,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                state_tx,
                device: Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> AlertState {
        *self.shared.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertState> {
        self.shared.state_tx.subscribe()
    }

    /// Begin the alarm unless it is already playing. Returns true if a new activity was started.
    pub fn start(&self, asset: SoundAsset, liveness: Liveness) -> bool {
        let mut inner = lock(&self.shared.inner);
        if inner.active.is_some() {
            return false;
        }

        inner.generation += 1;
        let generation = inner.generation;
        let cancel = Arc::new(AtomicBool::new(false));
        inner.active = Some(Activity {
            generation,
            cancel: cancel.clone(),
        });
        self.shared.state_tx.send_replace(AlertState::Playing);

        let shared = self.shared.clone();
        let backend = self.backend.clone();
        let timing = self.timing;
        let spawned = std::thread::Builder::new()
            .name("alert-player".to_string())
            .spawn(move || {
                run_cycles(&*backend, &asset, &liveness, &cancel, timing, &shared);
                finish(&shared, generation);
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn alert playback thread: {}", e);
            inner.active = None;
            self.shared.state_tx.send_replace(AlertState::Silent);
            return false;
        }

        tracing::info!("Alarm started");
        true
    }

    /// Silence the alarm immediately. Safe to call when already silent.
    pub fn stop(&self) {
        let mut inner = lock(&self.shared.inner);
        if let Some(activity) = inner.active.take() {
            activity.cancel.store(true, Ordering::SeqCst);
            self.shared.state_tx.send_replace(AlertState::Silent);
            tracing::info!("Alarm stopped");
        }
    }
}

impl Drop for AlertPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_cycles(
    backend: &dyn AudioBackend,
    asset: &SoundAsset,
    liveness: &Liveness,
    cancel: &AtomicBool,
    timing: PlaybackTiming,
    shared: &Shared,
) {
    let _device = lock(&shared.device);
    let keep_going = || !cancel.load(Ordering::SeqCst) && liveness();

    let mut failures = 0u32;
    while keep_going() {
        if play_cycle(backend, asset, &keep_going, timing, failures > 0) {
            if failures > 0 {
                tracing::info!("Audio output recovered after {} failed cycles", failures);
            }
            failures = 0;
        } else {
            failures += 1;
            if failures == 1 {
                tracing::warn!("Audio output unavailable, retrying with backoff");
            }
        }

        if !pause(retry_delay(timing.gap, failures), timing.poll, &keep_going) {
            break;
        }
    }
}

/// Gap before the next cycle, doubled per consecutive silent cycle up to 32x
fn retry_delay(gap: Duration, failures: u32) -> Duration {
    gap * 2u32.pow(failures.min(5))
}

/// Play one alarm cycle. Returns false if nothing could be played at all.
fn play_cycle(
    backend: &dyn AudioBackend,
    asset: &SoundAsset,
    keep_going: &dyn Fn() -> bool,
    timing: PlaybackTiming,
    quiet: bool,
) -> bool {
    let tone = Clip::Tone(timing.tone);

    if let SoundAsset::File(path) = asset {
        match backend.play(&Clip::File(path.clone()), keep_going, timing.poll) {
            Ok(()) => return true,
            Err(e) if quiet => {
                tracing::debug!("Failed to play {}: {:#}", path.display(), e);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to play {}: {:#}, falling back to default tone",
                    path.display(),
                    e
                );
            }
        }
        if !keep_going() {
            return true;
        }
    }

    match backend.play(&tone, keep_going, timing.poll) {
        Ok(()) => true,
        Err(e) => {
            if quiet {
                tracing::debug!("Failed to play default tone: {:#}", e);
            } else {
                tracing::warn!("Failed to play default tone: {:#}", e);
            }
            false
        }
    }
}

/// Sleep for `total` in `step` slices. Returns false as soon as `keep_going` fails.
fn pause(total: Duration, step: Duration, keep_going: &dyn Fn() -> bool) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if !keep_going() {
            return false;
        }
        let slice = remaining.min(step);
        std::thread::sleep(slice);
        remaining -= slice;
    }
    keep_going()
}

fn finish(shared: &Shared, generation: u64) {
    let mut inner = lock(&shared.inner);
    let current = inner
        .active
        .as_ref()
        .is_some_and(|activity| activity.generation == generation);

    if current {
        inner.active = None;
        shared.state_tx.send_replace(AlertState::Silent);
        tracing::info!("Alarm cycle ended");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
