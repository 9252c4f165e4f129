use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::geometry::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AnnotationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A confirmed label pinned to the region it was seen in. Handed off once;
/// the core never touches it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationCandidate {
    pub id: AnnotationId,
    pub label: String,
    pub region: Region,
    pub created_at: DateTime<Utc>,
}

/// What the core asks the persistence side to do.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationIntent {
    Place(AnnotationCandidate),
    Remove(AnnotationId),
}
