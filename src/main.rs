use async_trait::async_trait;
use image::DynamicImage;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use uuid::Uuid;

use lens_translate::common::Frame;
use lens_translate::error::{AppError, DetectionError, PermissionError, TranslationError};
use lens_translate::geometry::Size;
use lens_translate::permission::{PermissionProvider, PermissionState};
use lens_translate::pipeline::{DetectionFrame, DetectionPort, DetectionResult, DropReason};
use lens_translate::services::{
    InMemoryStore, PersistenceStore, TranslationProvider, TranslationRequest,
};
use lens_translate::{Configuration, CoordinatorBuilder, SessionEvent};

const FRAME_RATE: u64 = 30;
const RUN_FOR: Duration = Duration::from_secs(8);

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

/// Mostly sees a cup, with the odd misread or blank frame.
struct ScriptedDetector {
    noise: f32,
}

#[async_trait]
impl DetectionPort for ScriptedDetector {
    async fn detect(&self, request: &DetectionFrame) -> Result<DetectionResult, DetectionError> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        let (roll, confidence) = {
            let mut rng = rand::rng();
            (rng.random::<f32>(), rng.random_range(0.4..1.0))
        };
        let crop = request.frame.crop(&request.roi);
        if crop.width() == 0 || crop.height() == 0 {
            return Err(DetectionError::Failed("empty region".to_string()));
        }
        Ok(if roll < self.noise / 2.0 {
            DetectionResult::empty()
        } else if roll < self.noise {
            DetectionResult::labeled("mug", confidence)
        } else {
            DetectionResult::labeled("cup", confidence)
        })
    }
}

struct AlwaysGranted;

#[async_trait]
impl PermissionProvider for AlwaysGranted {
    fn current_status(&self) -> Result<PermissionState, PermissionError> {
        Ok(PermissionState::Granted)
    }

    async fn request_authorization(&self) -> Result<bool, PermissionError> {
        Ok(true)
    }
}

struct PhraseBook;

#[async_trait]
impl TranslationProvider for PhraseBook {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        match request.text.as_str() {
            "cup" => Ok("taza".to_string()),
            "mug" => Ok("jarra".to_string()),
            other => Err(TranslationError::UnsupportedLanguage(other.to_string())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let path = std::env::args().nth(1).map(PathBuf::from);
    let configuration = Configuration::load(path.as_deref())?;

    let store = Arc::new(InMemoryStore::new());
    let coordinator = CoordinatorBuilder::new(configuration)
        .detector(Arc::new(ScriptedDetector { noise: 0.05 }))
        .permissions(Arc::new(AlwaysGranted))
        .translator(Arc::new(PhraseBook))
        .store(store.clone())
        .viewport(Size::new(390.0, 844.0))
        .build()?;

    let mut events = coordinator.subscribe();
    let camera = Uuid::new_v4();
    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / FRAME_RATE));
    let deadline = tokio::time::sleep(RUN_FOR);
    tokio::pin!(deadline);
    let mut placed = false;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = ticker.tick() => {
                coordinator.submit_frame(Frame::capture(camera, DynamicImage::new_rgb8(640, 480)));
            }
            event = events.recv() => match event {
                Ok(SessionEvent::LabelConfirmed { label, confidence }) => {
                    info!("Confirmed {} ({:.2})", label, confidence);
                    if !placed {
                        let candidate = coordinator.place_annotation().await?;
                        info!("Placed annotation {}", candidate.id);
                        placed = true;
                    }
                }
                Ok(event) => info!("Session event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} session events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    let snapshot = coordinator.snapshot().await?;
    info!(
        "Admitted {} frames, completed {}, avg detection {:.0}us",
        snapshot.stats.admitted, snapshot.stats.completed, snapshot.stats.avg_detection_us
    );
    for reason in DropReason::ALL {
        info!("Dropped ({:?}): {}", reason, snapshot.stats.dropped(reason));
    }

    coordinator.shutdown().await;
    match store.list().await {
        Ok(saved) => {
            for record in saved {
                info!("Saved {} -> {}", record.source_text, record.translated_text);
            }
        }
        Err(e) => warn!("Could not list saved translations: {}", e),
    }
    Ok(())
}
