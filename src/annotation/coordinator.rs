use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::candidate::{AnnotationCandidate, AnnotationId, AnnotationIntent};
use crate::error::AnnotationError;
use crate::geometry::Region;

/// Turns the current confirmed label plus a user action into intents.
pub struct AnnotationCoordinator {
    confirmed: Option<String>,
    transmitter: IntentTransmitter,
}

impl AnnotationCoordinator {
    pub fn new(intent_tx: mpsc::Sender<AnnotationIntent>) -> Self {
        Self {
            confirmed: None,
            transmitter: IntentTransmitter::new(intent_tx),
        }
    }

    pub fn confirmed_label(&self) -> Option<&str> {
        self.confirmed.as_deref()
    }

    pub fn set_confirmed(&mut self, label: Option<String>) {
        if self.confirmed != label {
            debug!("Confirmed label now {:?}", label);
            self.confirmed = label;
        }
    }

    /// Captures the confirmed label with a snapshot of `region`.
    pub fn place_annotation(
        &self,
        region: &Region,
        now: DateTime<Utc>,
    ) -> Result<AnnotationCandidate, AnnotationError> {
        let label = self
            .confirmed
            .clone()
            .ok_or(AnnotationError::NoStableDetection)?;

        let candidate = AnnotationCandidate {
            id: AnnotationId::new(),
            label,
            region: *region,
            created_at: now,
        };
        self.transmitter
            .send(AnnotationIntent::Place(candidate.clone()))?;
        info!("Placed annotation {} for {}", candidate.id, candidate.label);
        Ok(candidate)
    }

    pub fn remove_annotation(&self, id: AnnotationId) -> Result<(), AnnotationError> {
        self.transmitter.send(AnnotationIntent::Remove(id))?;
        info!("Requested removal of annotation {}", id);
        Ok(())
    }
}

/// Hands intents to the persistence side without blocking the session.
pub struct IntentTransmitter {
    intent_tx: mpsc::Sender<AnnotationIntent>,
}

impl IntentTransmitter {
    pub fn new(intent_tx: mpsc::Sender<AnnotationIntent>) -> Self {
        Self { intent_tx }
    }

    pub fn send(&self, intent: AnnotationIntent) -> Result<(), AnnotationError> {
        if let Err(e) = self.intent_tx.try_send(intent) {
            warn!("Failed to hand off annotation intent: {}", e);
            return Err(AnnotationError::SinkUnavailable(e.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Size};

    fn region() -> Region {
        Region::new(Rect::new(40.0, 80.0, 200.0, 200.0), Size::new(390.0, 844.0))
    }

    #[test]
    fn placing_without_a_confirmed_label_fails() {
        let (tx, mut rx) = mpsc::channel(4);
        let coordinator = AnnotationCoordinator::new(tx);

        let outcome = coordinator.place_annotation(&region(), Utc::now());

        assert_eq!(outcome, Err(AnnotationError::NoStableDetection));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn placing_emits_a_candidate_with_a_region_snapshot() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut coordinator = AnnotationCoordinator::new(tx);
        coordinator.set_confirmed(Some("cup".to_string()));
        let now = Utc::now();

        let candidate = coordinator.place_annotation(&region(), now).unwrap();

        assert_eq!(candidate.label, "cup");
        assert_eq!(candidate.region, region());
        assert_eq!(candidate.created_at, now);
        assert_eq!(rx.try_recv().unwrap(), AnnotationIntent::Place(candidate));
    }

    #[test]
    fn removal_is_forwarded_as_an_intent() {
        let (tx, mut rx) = mpsc::channel(4);
        let coordinator = AnnotationCoordinator::new(tx);
        let id = AnnotationId::new();

        coordinator.remove_annotation(id).unwrap();

        assert_eq!(rx.try_recv().unwrap(), AnnotationIntent::Remove(id));
    }

    #[test]
    fn closed_sink_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut coordinator = AnnotationCoordinator::new(tx);
        coordinator.set_confirmed(Some("cup".to_string()));

        let outcome = coordinator.place_annotation(&region(), Utc::now());

        assert!(matches!(outcome, Err(AnnotationError::SinkUnavailable(_))));
    }
}
