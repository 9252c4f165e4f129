pub mod watchdog;

pub use watchdog::{LimitedReason, TrackingEvent, TrackingQuality, TrackingWatchdog};
