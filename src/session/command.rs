use tokio::sync::oneshot;

use super::events::SessionSnapshot;
use crate::annotation::{AnnotationCandidate, AnnotationId};
use crate::common::DeviceOrientation;
use crate::error::{AnnotationError, DetectionError, PermissionError};
use crate::geometry::{Rect, Size};
use crate::pipeline::{DetectionResult, DetectionTicket};
use crate::tracking::TrackingQuality;

/// Requests marshalled into the session from the UI and platform layers.
pub enum SessionCommand {
    ViewportChanged(Size),
    AdjustRegion(Rect),
    TrackingChanged(TrackingQuality),
    OrientationChanged(DeviceOrientation),
    Pause,
    Resume,
    RecheckPermission,
    PlaceAnnotation {
        responder: oneshot::Sender<Result<AnnotationCandidate, AnnotationError>>,
    },
    RemoveAnnotation {
        id: AnnotationId,
        responder: oneshot::Sender<Result<(), AnnotationError>>,
    },
    Snapshot {
        responder: oneshot::Sender<SessionSnapshot>,
    },
}

/// Results of work the session spawned, fed back into its own queue.
pub enum Completed {
    Detection {
        ticket: DetectionTicket,
        outcome: Result<DetectionResult, DetectionError>,
    },
    Authorization {
        outcome: Result<bool, PermissionError>,
    },
}
