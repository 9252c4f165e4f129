use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use super::command::{Completed, SessionCommand};
use super::events::{SessionEvent, SessionSnapshot};
use crate::annotation::{AnnotationCoordinator, AnnotationIntent};
use crate::common::{CameraPosition, DeviceOrientation, Frame};
use crate::config::Configuration;
use crate::error::DetectionError;
use crate::geometry::{self, Region, RegionLimits, Size};
use crate::permission::{GateAction, PermissionGate, PermissionProvider, PermissionState};
use crate::pipeline::{
    AdmissionContext, Completion, DetectionPort, DetectionRequest, DetectionScheduler,
};
use crate::tracking::{TrackingEvent, TrackingWatchdog};

/// Sole owner of the session state. Frames, UI commands and completions of
/// spawned work all arrive through its queues, so nothing here is locked.
pub struct Session {
    limits: RegionLimits,
    initial_region_fraction: f64,
    camera: CameraPosition,
    region: Region,
    orientation: DeviceOrientation,
    scheduler: DetectionScheduler,
    permission: PermissionGate,
    watchdog: TrackingWatchdog,
    annotations: AnnotationCoordinator,
    detector: Arc<dyn DetectionPort>,
    permissions: Arc<dyn PermissionProvider>,
    events: broadcast::Sender<SessionEvent>,
    completions: mpsc::UnboundedSender<Completed>,
    in_flight_cancel: Option<CancellationToken>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        configuration: &Configuration,
        detector: Arc<dyn DetectionPort>,
        permissions: Arc<dyn PermissionProvider>,
        intent_tx: mpsc::Sender<AnnotationIntent>,
        events: broadcast::Sender<SessionEvent>,
        completions: mpsc::UnboundedSender<Completed>,
        cancel: CancellationToken,
    ) -> Self {
        let limits = configuration.region_limits();
        Self {
            limits,
            initial_region_fraction: configuration.initial_region_fraction,
            camera: CameraPosition::Back,
            region: Region::initial(Size::default(), &limits, configuration.initial_region_fraction),
            orientation: DeviceOrientation::Portrait,
            scheduler: DetectionScheduler::new(configuration.scheduler_config()),
            permission: PermissionGate::new(
                Arc::clone(&permissions),
                configuration.permission_retry_interval(),
                configuration.diagnostic_interval(),
            ),
            watchdog: TrackingWatchdog::new(configuration.max_limited_tracking()),
            annotations: AnnotationCoordinator::new(intent_tx),
            detector,
            permissions,
            events,
            completions,
            in_flight_cancel: None,
            cancel,
        }
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.region = Region::initial(viewport, &self.limits, self.initial_region_fraction);
        self
    }

    pub fn with_camera(mut self, camera: CameraPosition) -> Self {
        self.camera = camera;
        self
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut frames: watch::Receiver<Option<Frame>>,
        mut completions: mpsc::UnboundedReceiver<Completed>,
    ) {
        let cancel = self.cancel.clone();
        let mut frames_open = true;
        self.start();

        loop {
            let permission_deadline = self.permission.next_deadline();
            let tracking_deadline = self.watchdog.deadline();

            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completed) = completions.recv() => self.handle_completion(completed),
                changed = frames.changed(), if frames_open => match changed {
                    Ok(()) => {
                        let frame = frames.borrow_and_update().clone();
                        if let Some(frame) = frame {
                            self.handle_frame(frame);
                        }
                    }
                    Err(_) => frames_open = false,
                },
                _ = sleep_until(permission_deadline.unwrap_or_else(Instant::now)),
                    if permission_deadline.is_some() => self.on_permission_tick(),
                _ = sleep_until(tracking_deadline.unwrap_or_else(Instant::now)),
                    if tracking_deadline.is_some() => self.on_tracking_tick(),
            }
        }

        self.teardown();
    }

    fn start(&mut self) {
        info!("Session starting with region {:?}", self.region.rect);
        let before = self.permission_status();
        let action = self.permission.start(Instant::now());
        self.apply_gate_action(action);
        self.after_permission_change(before);

        self.scheduler.resume();
    }

    fn teardown(&mut self) {
        self.permission.stop();
        self.watchdog.stop();
        self.scheduler.pause();
        self.cancel_in_flight();
        info!("Session stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        let now = Instant::now();
        match command {
            SessionCommand::ViewportChanged(viewport) => {
                let region = if self.region.viewport.is_degenerate() {
                    Region::initial(viewport, &self.limits, self.initial_region_fraction)
                } else {
                    geometry::resize(&self.region, self.region.viewport, viewport, &self.limits)
                };
                self.set_region(region);
            }
            SessionCommand::AdjustRegion(proposed) => {
                let region = geometry::adjust(&self.region, proposed, &self.limits);
                self.set_region(region);
            }
            SessionCommand::TrackingChanged(quality) => {
                if let Some(event) = self.watchdog.update(quality, now) {
                    self.publish_tracking(event);
                }
            }
            SessionCommand::OrientationChanged(orientation) => {
                if orientation.is_interface_relevant() {
                    self.orientation = orientation;
                }
            }
            SessionCommand::Pause => {
                if self.scheduler.is_running() {
                    self.scheduler.pause();
                    self.cancel_in_flight();
                    self.sync_confirmation();
                    self.publish(SessionEvent::Paused);
                }
            }
            SessionCommand::Resume => {
                if !self.scheduler.is_running() {
                    self.scheduler.resume();
                    self.publish(SessionEvent::Resumed);
                }
            }
            SessionCommand::RecheckPermission => {
                let before = self.permission_status();
                let action = self.permission.check_status(now);
                self.apply_gate_action(action);
                self.after_permission_change(before);
            }
            SessionCommand::PlaceAnnotation { responder } => {
                let outcome = self.annotations.place_annotation(&self.region, Utc::now());
                if let Ok(candidate) = &outcome {
                    self.publish(SessionEvent::AnnotationPlaced(candidate.clone()));
                }
                let _ = responder.send(outcome);
            }
            SessionCommand::RemoveAnnotation { id, responder } => {
                let _ = responder.send(self.annotations.remove_annotation(id));
            }
            SessionCommand::Snapshot { responder } => {
                let _ = responder.send(self.snapshot());
            }
        }
    }

    fn handle_completion(&mut self, completed: Completed) {
        let now = Instant::now();
        match completed {
            Completed::Detection { ticket, outcome } => {
                if self.scheduler.in_flight() == Some(ticket) {
                    self.in_flight_cancel = None;
                }
                match self.scheduler.complete(ticket, outcome, now) {
                    Completion::Discarded => {}
                    Completion::Observed { result, confirmed } => {
                        let lost = self.sync_confirmation();
                        if let Some(label) = confirmed {
                            self.publish(SessionEvent::LabelConfirmed {
                                label,
                                confidence: result.confidence,
                            });
                        } else if lost {
                            debug!("Confirmation lost after {:?}", result.label());
                        }
                    }
                }
            }
            Completed::Authorization { outcome } => {
                let before = self.permission_status();
                self.permission.complete_request(outcome, now);
                self.after_permission_change(before);
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        let ctx = AdmissionContext {
            permission: self.permission.state(),
            tracking: self.watchdog.quality(),
            region: &self.region,
            orientation: self.orientation.image_orientation(self.camera),
        };
        if let Ok(request) = self.scheduler.admit(frame, &ctx, Instant::now()) {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: DetectionRequest) {
        let detector = Arc::clone(&self.detector);
        let completions = self.completions.clone();
        let token = self.cancel.child_token();
        self.in_flight_cancel = Some(token.clone());

        tokio::spawn(async move {
            let ticket = request.ticket;
            let frame = request.frame;
            let detection = tokio::spawn(async move { detector.detect(&frame).await });
            let abort = detection.abort_handle();
            tokio::select! {
                _ = token.cancelled() => {
                    abort.abort();
                    debug!("Detection {:?} abandoned", ticket);
                }
                joined = detection => {
                    // A panicking detector still has to free the in-flight slot.
                    let outcome = joined.unwrap_or_else(|e| {
                        error!("Detection task {:?} failed: {}", ticket, e);
                        Err(DetectionError::Failed(e.to_string()))
                    });
                    let _ = completions.send(Completed::Detection { ticket, outcome });
                }
            }
        });
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight_cancel.take() {
            token.cancel();
        }
    }

    fn on_permission_tick(&mut self) {
        let before = self.permission_status();
        let action = self.permission.tick(Instant::now());
        self.apply_gate_action(action);
        self.after_permission_change(before);
    }

    fn on_tracking_tick(&mut self) {
        if let Some(event) = self.watchdog.poll(Instant::now()) {
            self.publish_tracking(event);
        }
    }

    fn apply_gate_action(&mut self, action: GateAction) {
        if action != GateAction::RequestAuthorization {
            return;
        }
        let permissions = Arc::clone(&self.permissions);
        let completions = self.completions.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                outcome = permissions.request_authorization() => {
                    let _ = completions.send(Completed::Authorization { outcome });
                }
            }
        });
    }

    fn permission_status(&self) -> (PermissionState, bool) {
        (self.permission.state(), self.permission.pending_alert())
    }

    fn after_permission_change(&mut self, before: (PermissionState, bool)) {
        let after = self.permission_status();
        if after == before {
            return;
        }
        if before.0.is_granted() && !after.0.is_granted() {
            self.scheduler.reset_stability();
            self.sync_confirmation();
        }
        self.publish(SessionEvent::PermissionChanged {
            state: after.0,
            needs_settings: after.1,
        });
    }

    fn set_region(&mut self, region: Region) {
        if region == self.region {
            return;
        }
        self.region = region;
        self.scheduler.reset_stability();
        self.sync_confirmation();
        self.publish(SessionEvent::RegionChanged(region));
    }

    /// Mirrors the scheduler's confirmed label into the annotation side.
    /// Returns true if a previously confirmed label went away.
    fn sync_confirmation(&mut self) -> bool {
        let current = self.scheduler.confirmed_label().map(str::to_string);
        let lost = current.is_none() && self.annotations.confirmed_label().is_some();
        self.annotations.set_confirmed(current);
        if lost {
            self.publish(SessionEvent::ConfirmationLost);
        }
        lost
    }

    fn publish_tracking(&self, event: TrackingEvent) {
        match event {
            TrackingEvent::Degraded { quality, .. } => {
                self.publish(SessionEvent::TrackingDegraded(quality))
            }
            TrackingEvent::Recovered => self.publish(SessionEvent::TrackingRecovered),
        }
    }

    fn publish(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            trace!("No subscribers for session event");
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            permission: self.permission.state(),
            needs_settings: self.permission.pending_alert(),
            tracking: self.watchdog.quality(),
            region: self.region,
            orientation: self.orientation,
            confirmed_label: self.annotations.confirmed_label().map(str::to_string),
            detection_in_flight: self.scheduler.in_flight().is_some(),
            paused: !self.scheduler.is_running(),
            generation: self.scheduler.generation(),
            stats: self.scheduler.stats().clone(),
        }
    }
}
