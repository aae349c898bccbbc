pub mod monitor;

pub use monitor::{MonitorLoop, TICK_INTERVAL};
