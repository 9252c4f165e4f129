use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::detection::{DetectionFrame, DetectionResult};
use super::metrics::{AdmissionStats, DropReason};
use super::stability::StabilityTracker;
use crate::common::{Frame, ImageOrientation};
use crate::error::DetectionError;
use crate::geometry::Region;
use crate::permission::PermissionState;
use crate::tracking::TrackingQuality;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Minimum time between two admitted frames.
    pub frame_throttle: Duration,
    /// Cool-down after a completed detection before the next admission.
    pub detection_interval: Duration,
    pub confidence_threshold: f32,
    pub required_stable_count: usize,
    pub min_region_size: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_throttle: Duration::from_millis(500),
            detection_interval: Duration::ZERO,
            confidence_threshold: 0.5,
            required_stable_count: 10,
            min_region_size: 100.0,
        }
    }
}

/// Inputs to the admission gate owned by other components.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext<'a> {
    pub permission: PermissionState,
    pub tracking: TrackingQuality,
    pub region: &'a Region,
    pub orientation: ImageOrientation,
}

/// Identifies one detection call. Completions carrying a ticket that is not
/// the current in-flight one are stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionTicket {
    pub generation: u64,
    pub sequence: u64,
}

#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub ticket: DetectionTicket,
    pub frame: DetectionFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The ticket was stale (paused session, older generation, already done).
    Discarded,
    Observed {
        result: DetectionResult,
        confirmed: Option<String>,
    },
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: DetectionTicket,
    started_at: Instant,
}

/// Frame admission and the single in-flight detection slot.
///
/// Frames are never queued: a frame that fails any admission check is
/// dropped, so the next detection always runs on the newest frame.
pub struct DetectionScheduler {
    config: SchedulerConfig,
    tracker: StabilityTracker,
    generation: u64,
    next_sequence: u64,
    in_flight: Option<InFlight>,
    last_admitted: Option<Instant>,
    last_completed: Option<Instant>,
    running: bool,
    stats: AdmissionStats,
}

impl DetectionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            tracker: StabilityTracker::new(),
            generation: 0,
            next_sequence: 0,
            in_flight: None,
            last_admitted: None,
            last_completed: None,
            running: false,
            stats: AdmissionStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn in_flight(&self) -> Option<DetectionTicket> {
        self.in_flight.map(|in_flight| in_flight.ticket)
    }

    pub fn stats(&self) -> &AdmissionStats {
        &self.stats
    }

    pub fn tracker(&self) -> &StabilityTracker {
        &self.tracker
    }

    pub fn confirmed_label(&self) -> Option<&str> {
        self.tracker.confirmed(self.config.required_stable_count)
    }

    /// Starts a new session generation and enables admission. History from
    /// earlier generations is not replayed.
    pub fn resume(&mut self) {
        if self.running {
            return;
        }
        self.generation += 1;
        self.running = true;
        self.last_admitted = None;
        self.last_completed = None;
        debug!("Detection session generation {} started", self.generation);
    }

    /// Halts admission, abandons the in-flight call and clears stability.
    /// Returns the abandoned ticket so the caller can cancel the call.
    pub fn pause(&mut self) -> Option<DetectionTicket> {
        self.running = false;
        self.tracker.reset();
        let abandoned = self.in_flight.take().map(|in_flight| in_flight.ticket);
        if let Some(ticket) = abandoned {
            debug!("Abandoning in-flight detection {:?}", ticket);
        }
        abandoned
    }

    pub fn reset_stability(&mut self) {
        self.tracker.reset();
    }

    /// Runs the admission checks in order without changing any state.
    pub fn evaluate(&self, ctx: &AdmissionContext<'_>, now: Instant) -> Result<(), DropReason> {
        if !self.running {
            return Err(DropReason::Paused);
        }
        if !ctx.permission.is_granted() {
            return Err(DropReason::PermissionNotGranted);
        }
        if !ctx.tracking.is_normal() {
            return Err(DropReason::TrackingNotNormal);
        }
        if !ctx.region.meets_minimum(self.config.min_region_size) {
            return Err(DropReason::RegionTooSmall);
        }
        if self.in_flight.is_some() {
            return Err(DropReason::DetectionInFlight);
        }
        if let Some(last) = self.last_admitted {
            if now.duration_since(last) < self.config.frame_throttle {
                return Err(DropReason::Throttled);
            }
        }
        if let Some(last) = self.last_completed {
            if now.duration_since(last) < self.config.detection_interval {
                return Err(DropReason::Throttled);
            }
        }
        Ok(())
    }

    /// Admits `frame` if every check passes and marks the slot in flight.
    pub fn admit(
        &mut self,
        frame: Frame,
        ctx: &AdmissionContext<'_>,
        now: Instant,
    ) -> Result<DetectionRequest, DropReason> {
        if let Err(reason) = self.evaluate(ctx, now) {
            trace!("Dropping frame {}: {:?}", frame.frame_id(), reason);
            self.stats.record_drop(reason);
            return Err(reason);
        }

        self.next_sequence += 1;
        let ticket = DetectionTicket {
            generation: self.generation,
            sequence: self.next_sequence,
        };
        self.in_flight = Some(InFlight {
            ticket,
            started_at: now,
        });
        self.last_admitted = Some(now);
        self.stats.admitted += 1;

        debug!("Admitted frame {} as {:?}", frame.frame_id(), ticket);
        Ok(DetectionRequest {
            ticket,
            frame: DetectionFrame {
                frame,
                orientation: ctx.orientation,
                roi: ctx.region.normalized(),
            },
        })
    }

    /// Applies a detection outcome. Failures become empty results.
    pub fn complete(
        &mut self,
        ticket: DetectionTicket,
        outcome: Result<DetectionResult, DetectionError>,
        now: Instant,
    ) -> Completion {
        let in_flight = match self.in_flight {
            Some(in_flight)
                if self.running
                    && in_flight.ticket == ticket
                    && ticket.generation == self.generation =>
            {
                in_flight
            }
            _ => {
                debug!("Discarding stale detection {:?}", ticket);
                self.stats.discarded_stale += 1;
                return Completion::Discarded;
            }
        };
        self.in_flight = None;
        self.last_completed = Some(now);

        let failed = outcome.is_err();
        let result = match outcome {
            Ok(result) => result.gated(self.config.confidence_threshold),
            Err(err) => {
                warn!("Detection {:?} failed: {}", ticket, err);
                DetectionResult::empty()
            }
        };
        self.stats
            .record_completion(now.duration_since(in_flight.started_at), failed);

        let confirmed = self
            .tracker
            .observe(&result, self.config.required_stable_count);
        if let Some(label) = &confirmed {
            self.stats.confirmations += 1;
            debug!("Confirmed label {}", label);
        }

        Completion::Observed { result, confirmed }
    }
}
