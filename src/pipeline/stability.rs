use tracing::debug;

use super::detection::DetectionResult;

/// Debounces per-frame labels: a label is confirmed only after `required`
/// consecutive agreeing detections. Empty results neither count nor reset.
#[derive(Debug, Default)]
pub struct StabilityTracker {
    current: Option<String>,
    consecutive: usize,
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one result and returns the confirmed label, if any. Confirmation
    /// repeats on every further agreeing result.
    pub fn observe(&mut self, result: &DetectionResult, required: usize) -> Option<String> {
        let label = result.label()?;

        if self.current.as_deref() == Some(label) {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            if let Some(previous) = &self.current {
                debug!("Stability reset: {} -> {}", previous, label);
            }
            self.current = Some(label.to_string());
            self.consecutive = 1;
        }

        self.confirmed(required).map(str::to_string)
    }

    pub fn confirmed(&self, required: usize) -> Option<&str> {
        if self.consecutive >= required.max(1) {
            self.current.as_deref()
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn consecutive(&self) -> usize {
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.consecutive = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cup() -> DetectionResult {
        DetectionResult::labeled("cup", 0.9)
    }

    #[test]
    fn confirms_on_the_nth_identical_label() {
        let mut tracker = StabilityTracker::new();

        for _ in 0..4 {
            assert_eq!(tracker.observe(&cup(), 5), None);
        }
        assert_eq!(tracker.observe(&cup(), 5).as_deref(), Some("cup"));
        assert_eq!(tracker.observe(&cup(), 5).as_deref(), Some("cup"));
    }

    #[test]
    fn differing_label_resets_the_count_to_one() {
        let mut tracker = StabilityTracker::new();
        tracker.observe(&cup(), 10);
        tracker.observe(&cup(), 10);

        tracker.observe(&DetectionResult::labeled("book", 0.9), 10);

        assert_eq!(tracker.current(), Some("book"));
        assert_eq!(tracker.consecutive(), 1);
    }

    #[test]
    fn empty_results_never_decrement_or_reset() {
        let mut tracker = StabilityTracker::new();
        tracker.observe(&cup(), 3);
        tracker.observe(&cup(), 3);

        for _ in 0..20 {
            assert_eq!(tracker.observe(&DetectionResult::empty(), 3), None);
        }

        assert_eq!(tracker.consecutive(), 2);
        assert_eq!(tracker.observe(&cup(), 3).as_deref(), Some("cup"));
    }

    #[test]
    fn interrupted_stream_confirms_only_after_a_full_run() {
        let mut tracker = StabilityTracker::new();
        let mut stream = vec![cup(); 4];
        stream.push(DetectionResult::labeled("book", 0.9));
        stream.extend(vec![cup(); 10]);

        let confirmations: Vec<usize> = stream
            .iter()
            .enumerate()
            .filter_map(|(index, result)| tracker.observe(result, 10).map(|_| index + 1))
            .collect();

        assert_eq!(confirmations, vec![15]);
    }

    #[test]
    fn reset_clears_state() {
        let mut tracker = StabilityTracker::new();
        tracker.observe(&cup(), 1);

        tracker.reset();

        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.confirmed(1), None);
    }
}
