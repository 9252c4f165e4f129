use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::sync::Arc;
use uuid::Uuid;

use crate::geometry::NormalizedRect;

/// Opaque camera frame handle. Cloning shares the pixel buffer.
#[derive(Clone)]
pub struct Frame {
    source_id: Uuid,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
    frame_id: Uuid,
}

impl Frame {
    pub fn new(source_id: Uuid, image: DynamicImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            source_id,
            image: Arc::new(image),
            captured_at,
            frame_id: Uuid::new_v4(),
        }
    }

    pub fn capture(source_id: Uuid, image: DynamicImage) -> Self {
        Self::new(source_id, image, Utc::now())
    }

    pub fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Copies out the part of the frame covered by `roi`.
    pub fn crop(&self, roi: &NormalizedRect) -> DynamicImage {
        let (width, height) = self.dimensions();
        let px = roi.to_pixels(width, height);
        self.image.crop_imm(px.x, px.y, px.width, px.height)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("Frame")
            .field("frame_id", &self.frame_id)
            .field("source_id", &self.source_id)
            .field("captured_at", &self.captured_at)
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}
