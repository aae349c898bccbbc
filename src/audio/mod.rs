pub mod backend;
pub mod player;

pub use backend::{AudioBackend, Clip, RodioBackend, Tone};
pub use player::{AlertPlayer, Liveness, PlaybackTiming};
