use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitedReason {
    Initializing,
    ExcessiveMotion,
    InsufficientFeatures,
    Relocalizing,
}

/// Camera pose tracking quality as reported by the AR subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackingQuality {
    #[default]
    Normal,
    Limited(LimitedReason),
    Unavailable,
}

impl TrackingQuality {
    pub fn is_normal(self) -> bool {
        self == Self::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    /// Tracking has not been normal for longer than the grace period.
    Degraded {
        quality: TrackingQuality,
        since: Instant,
    },
    /// Tracking returned to normal after a `Degraded` signal.
    Recovered,
}

/// Turns prolonged non-normal tracking into a single warning per episode.
pub struct TrackingWatchdog {
    quality: TrackingQuality,
    degraded_since: Option<Instant>,
    grace: Duration,
    signaled: bool,
}

impl TrackingWatchdog {
    pub fn new(grace: Duration) -> Self {
        Self {
            quality: TrackingQuality::Normal,
            degraded_since: None,
            grace,
            signaled: false,
        }
    }

    pub fn quality(&self) -> TrackingQuality {
        self.quality
    }

    pub fn degraded_since(&self) -> Option<Instant> {
        self.degraded_since
    }

    /// When the owner should call [`TrackingWatchdog::poll`] next.
    pub fn deadline(&self) -> Option<Instant> {
        match self.degraded_since {
            Some(since) if !self.signaled => Some(since + self.grace),
            _ => None,
        }
    }

    pub fn update(&mut self, quality: TrackingQuality, now: Instant) -> Option<TrackingEvent> {
        self.quality = quality;
        if quality.is_normal() {
            let was_signaled = self.signaled;
            self.degraded_since = None;
            self.signaled = false;
            if was_signaled {
                info!("Tracking recovered");
                return Some(TrackingEvent::Recovered);
            }
            return None;
        }

        // Moving between limited and unavailable keeps the original start.
        if self.degraded_since.is_none() {
            self.degraded_since = Some(now);
        }
        self.poll(now)
    }

    pub fn poll(&mut self, now: Instant) -> Option<TrackingEvent> {
        let since = self.degraded_since?;
        if self.signaled || now.duration_since(since) < self.grace {
            return None;
        }
        self.signaled = true;
        warn!(
            "Tracking {:?} for {:?}, past the {:?} grace period",
            self.quality,
            now.duration_since(since),
            self.grace
        );
        Some(TrackingEvent::Degraded {
            quality: self.quality,
            since,
        })
    }

    /// Disarms the grace timer. Quality is left as last reported.
    pub fn stop(&mut self) {
        self.degraded_since = None;
        self.signaled = false;
    }
}
