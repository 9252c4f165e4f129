use serde::Serialize;

use crate::annotation::AnnotationCandidate;
use crate::common::DeviceOrientation;
use crate::geometry::Region;
use crate::permission::PermissionState;
use crate::pipeline::AdmissionStats;
use crate::tracking::TrackingQuality;

/// Published to subscribers. Dropping the receiver ends the subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PermissionChanged {
        state: PermissionState,
        needs_settings: bool,
    },
    TrackingDegraded(TrackingQuality),
    TrackingRecovered,
    RegionChanged(Region),
    LabelConfirmed {
        label: String,
        confidence: f32,
    },
    ConfirmationLost,
    AnnotationPlaced(AnnotationCandidate),
    Paused,
    Resumed,
}

/// Point-in-time view of the session for polling consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub permission: PermissionState,
    pub needs_settings: bool,
    pub tracking: TrackingQuality,
    pub region: Region,
    pub orientation: DeviceOrientation,
    pub confirmed_label: Option<String>,
    pub detection_in_flight: bool,
    pub paused: bool,
    pub generation: u64,
    pub stats: AdmissionStats,
}
