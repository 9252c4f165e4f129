use async_trait::async_trait;

use crate::common::{Frame, ImageOrientation};
use crate::error::DetectionError;
use crate::geometry::NormalizedRect;

/// Everything a detector needs for one call. Lives only for that call.
#[derive(Debug, Clone)]
pub struct DetectionFrame {
    pub frame: Frame,
    pub orientation: ImageOrientation,
    pub roi: NormalizedRect,
}

/// Outcome of one detector call. `label` is `None` when nothing was found.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    pub label: Option<String>,
    pub confidence: f32,
}

impl DetectionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn labeled(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: Some(label.into()),
            confidence,
        }
    }

    /// The label, if it is non-blank.
    pub fn label(&self) -> Option<&str> {
        self.label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.label().is_none()
    }

    /// Drops the label when confidence is below `threshold`.
    pub fn gated(self, threshold: f32) -> Self {
        if self.confidence >= threshold {
            self
        } else {
            Self {
                label: None,
                confidence: self.confidence,
            }
        }
    }
}

/// Object classifier the scheduler drives. Implementations own their timeouts.
#[async_trait]
pub trait DetectionPort: Send + Sync {
    async fn detect(&self, request: &DetectionFrame) -> Result<DetectionResult, DetectionError>;
}
