use serde::Serialize;
use std::time::Duration;

/// Why the admission gate turned a frame away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DropReason {
    Paused,
    PermissionNotGranted,
    TrackingNotNormal,
    RegionTooSmall,
    DetectionInFlight,
    Throttled,
}

impl DropReason {
    pub const ALL: [DropReason; 6] = [
        DropReason::Paused,
        DropReason::PermissionNotGranted,
        DropReason::TrackingNotNormal,
        DropReason::RegionTooSmall,
        DropReason::DetectionInFlight,
        DropReason::Throttled,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Counters kept by the scheduler, read through session snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdmissionStats {
    pub admitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub discarded_stale: u64,
    pub confirmations: u64,
    dropped: [u64; 6],
    pub avg_detection_us: f32,
    pub max_detection_us: u64,
}

impl AdmissionStats {
    const ALPHA: f32 = 0.1; // EWMA smoothing factor

    pub fn dropped(&self, reason: DropReason) -> u64 {
        self.dropped[reason.index()]
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.iter().sum()
    }

    pub(crate) fn record_drop(&mut self, reason: DropReason) {
        self.dropped[reason.index()] += 1;
    }

    pub(crate) fn record_completion(&mut self, latency: Duration, failed: bool) {
        let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.completed += 1;
        if failed {
            self.failed += 1;
        }
        self.avg_detection_us = if self.completed == 1 {
            latency_us as f32
        } else {
            Self::update_ewma(self.avg_detection_us, latency_us, Self::ALPHA)
        };
        self.max_detection_us = self.max_detection_us.max(latency_us);
    }

    fn update_ewma(current: f32, new_value: u64, alpha: f32) -> f32 {
        current * (1.0 - alpha) + new_value as f32 * alpha
    }
}
