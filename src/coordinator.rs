use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

use crate::{
    annotation::{AnnotationCandidate, AnnotationId, AnnotationIntent, AnnotationWorker},
    common::{CameraPosition, DeviceOrientation, Frame},
    config::Configuration,
    error::{AppError, SessionError},
    geometry::{Rect, Size},
    permission::PermissionProvider,
    pipeline::DetectionPort,
    services::{PersistenceStore, SpeechProvider, TranslationProvider},
    session::{Session, SessionCommand, SessionEvent, SessionSnapshot},
    tracking::TrackingQuality,
};

/// Handle to a running session and its annotation worker.
pub struct Coordinator {
    commands: mpsc::Sender<SessionCommand>,
    frames: watch::Sender<Option<Frame>>,
    events: broadcast::Sender<SessionEvent>,
    session_task: Option<JoinHandle<()>>,
    worker_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    pub fn builder(configuration: Configuration) -> CoordinatorBuilder {
        CoordinatorBuilder::new(configuration)
    }

    /// Offers the newest camera frame. An unconsumed older frame is replaced.
    pub fn submit_frame(&self, frame: Frame) {
        self.frames.send_replace(Some(frame));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn event_stream(&self) -> BroadcastStream<SessionEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    pub async fn viewport_changed(&self, viewport: Size) -> Result<(), SessionError> {
        self.send(SessionCommand::ViewportChanged(viewport)).await
    }

    pub async fn adjust_region(&self, proposed: Rect) -> Result<(), SessionError> {
        self.send(SessionCommand::AdjustRegion(proposed)).await
    }

    pub async fn tracking_changed(&self, quality: TrackingQuality) -> Result<(), SessionError> {
        self.send(SessionCommand::TrackingChanged(quality)).await
    }

    pub async fn orientation_changed(
        &self,
        orientation: DeviceOrientation,
    ) -> Result<(), SessionError> {
        self.send(SessionCommand::OrientationChanged(orientation)).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Resume).await
    }

    /// Re-reads the camera authorization, e.g. when the app returns to the
    /// foreground.
    pub async fn recheck_permission(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::RecheckPermission).await
    }

    pub async fn place_annotation(&self) -> Result<AnnotationCandidate, AppError> {
        let (responder, response) = oneshot::channel();
        self.send(SessionCommand::PlaceAnnotation { responder }).await?;
        let placed = response
            .await
            .map_err(|_| SessionError::ResponseDropped("place_annotation"))??;
        Ok(placed)
    }

    pub async fn remove_annotation(&self, id: AnnotationId) -> Result<(), AppError> {
        let (responder, response) = oneshot::channel();
        self.send(SessionCommand::RemoveAnnotation { id, responder })
            .await?;
        response
            .await
            .map_err(|_| SessionError::ResponseDropped("remove_annotation"))??;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (responder, response) = oneshot::channel();
        self.send(SessionCommand::Snapshot { responder }).await?;
        response
            .await
            .map_err(|_| SessionError::ResponseDropped("snapshot"))
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Stops the session and waits for both tasks to wind down.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(session_task) = self.session_task.take() {
            if let Err(e) = session_task.await {
                tracing::error!("Session task failed: {}", e);
            }
        }
        if let Some(worker_task) = self.worker_task.take() {
            if let Err(e) = worker_task.await {
                tracing::error!("Annotation worker failed: {}", e);
            }
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    detector: Option<Arc<dyn DetectionPort>>,
    permissions: Option<Arc<dyn PermissionProvider>>,
    translator: Option<Arc<dyn TranslationProvider>>,
    store: Option<Arc<dyn PersistenceStore>>,
    speech: Option<Arc<dyn SpeechProvider>>,
    intent_sink: Option<mpsc::Sender<AnnotationIntent>>,
    viewport: Size,
    camera: CameraPosition,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            detector: None,
            permissions: None,
            translator: None,
            store: None,
            speech: None,
            intent_sink: None,
            viewport: Size::default(),
            camera: CameraPosition::Back,
        }
    }

    pub fn detector(mut self, detector: Arc<dyn DetectionPort>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn permissions(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn TranslationProvider>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn speech(mut self, speech: Arc<dyn SpeechProvider>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Routes annotation intents to the caller instead of the built-in worker.
    pub fn intent_sink(mut self, intent_sink: mpsc::Sender<AnnotationIntent>) -> Self {
        self.intent_sink = Some(intent_sink);
        self
    }

    pub fn viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn camera_position(mut self, camera: CameraPosition) -> Self {
        self.camera = camera;
        self
    }

    // Overrides the configured stability count.
    pub fn required_stable_count(mut self, required_stable_count: usize) -> Self {
        self.configuration.required_stable_count = required_stable_count;
        self
    }

    // Overrides the configured frame throttle.
    pub fn frame_throttle_interval_secs(mut self, seconds: f64) -> Self {
        self.configuration.frame_throttle_interval_secs = seconds;
        self
    }

    // Overrides the configured confidence gate.
    pub fn confidence_threshold(mut self, confidence_threshold: f32) -> Self {
        self.configuration.confidence_threshold = confidence_threshold;
        self
    }

    /// Spawns the session (and the annotation worker when a translator and a
    /// store were given). Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let detector = self
            .detector
            .ok_or(AppError::MissingCollaborator("detector"))?;
        let permissions = self
            .permissions
            .ok_or(AppError::MissingCollaborator("permissions"))?;

        let cancel_token = CancellationToken::new();
        let (intent_tx, worker_task) = match (self.intent_sink, self.translator, self.store) {
            (Some(sink), _, _) => (sink, None),
            (None, Some(translator), Some(store)) => {
                let (intent_tx, intent_rx) = mpsc::channel(self.configuration.intent_buffer_size);
                let mut worker = AnnotationWorker::new(
                    translator,
                    store,
                    self.configuration.source_language.clone(),
                    self.configuration.target_language.clone(),
                );
                if let Some(speech) = self.speech {
                    worker = worker.with_speech(speech, self.configuration.auto_speak);
                }
                let task = tokio::spawn(worker.run(intent_rx, cancel_token.clone()));
                (intent_tx, Some(task))
            }
            (None, None, _) => return Err(AppError::MissingCollaborator("translator")),
            (None, Some(_), None) => return Err(AppError::MissingCollaborator("store")),
        };

        let (commands_tx, commands_rx) = mpsc::channel(self.configuration.command_buffer_size);
        let (frames_tx, frames_rx) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(self.configuration.event_buffer_size);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let session = Session::new(
            &self.configuration,
            detector,
            permissions,
            intent_tx,
            events_tx.clone(),
            completions_tx,
            cancel_token.clone(),
        )
        .with_camera(self.camera)
        .with_viewport(self.viewport);
        let session_task = tokio::spawn(session.run(commands_rx, frames_rx, completions_rx));

        Ok(Coordinator {
            commands: commands_tx,
            frames: frames_tx,
            events: events_tx,
            session_task: Some(session_task),
            worker_task,
            cancel_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DetectionError, PermissionError};
    use crate::permission::PermissionState;
    use crate::pipeline::{DetectionFrame, DetectionResult};
    use async_trait::async_trait;

    struct NothingDetector;

    #[async_trait]
    impl DetectionPort for NothingDetector {
        async fn detect(&self, _request: &DetectionFrame) -> Result<DetectionResult, DetectionError> {
            Ok(DetectionResult::empty())
        }
    }

    struct Granted;

    #[async_trait]
    impl PermissionProvider for Granted {
        fn current_status(&self) -> Result<PermissionState, PermissionError> {
            Ok(PermissionState::Granted)
        }

        async fn request_authorization(&self) -> Result<bool, PermissionError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn build_requires_a_detector() {
        let (sink, _intents) = mpsc::channel(1);
        let outcome = CoordinatorBuilder::new(Configuration::default())
            .permissions(Arc::new(Granted))
            .intent_sink(sink)
            .build();

        assert!(matches!(outcome, Err(AppError::MissingCollaborator("detector"))));
    }

    #[tokio::test]
    async fn build_requires_somewhere_to_send_annotations() {
        let outcome = CoordinatorBuilder::new(Configuration::default())
            .detector(Arc::new(NothingDetector))
            .permissions(Arc::new(Granted))
            .build();

        assert!(matches!(outcome, Err(AppError::MissingCollaborator("translator"))));
    }

    #[tokio::test]
    async fn build_rejects_invalid_overrides() {
        let (sink, _intents) = mpsc::channel(1);
        let outcome = CoordinatorBuilder::new(Configuration::default())
            .detector(Arc::new(NothingDetector))
            .permissions(Arc::new(Granted))
            .intent_sink(sink)
            .required_stable_count(0)
            .build();

        assert!(matches!(outcome, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn commands_fail_once_the_session_is_stopped() {
        let (sink, _intents) = mpsc::channel(1);
        let coordinator = CoordinatorBuilder::new(Configuration::default())
            .detector(Arc::new(NothingDetector))
            .permissions(Arc::new(Granted))
            .intent_sink(sink)
            .viewport(Size::new(390.0, 844.0))
            .build()
            .expect("coordinator builds");

        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.permission, PermissionState::Granted);
        assert!(!snapshot.paused);

        coordinator.stop();
        // The session drops its receiver once it sees the cancellation.
        tokio::task::yield_now().await;
        let mut outcome = coordinator.pause().await;
        for _ in 0..10 {
            if outcome.is_err() {
                break;
            }
            tokio::task::yield_now().await;
            outcome = coordinator.pause().await;
        }
        assert_eq!(outcome, Err(SessionError::Closed));
    }
}
