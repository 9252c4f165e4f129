use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::provider::{PermissionProvider, PermissionState};
use crate::common::{LogThrottle, Ticker};
use crate::error::PermissionError;

/// Work the owner has to perform on behalf of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    None,
    /// Call `PermissionProvider::request_authorization` and feed the outcome
    /// back through [`PermissionGate::complete_request`].
    RequestAuthorization,
}

/// Camera authorization state machine.
///
/// While access is denied or restricted and the gate is active, the status is
/// re-read every `retry_interval` so a grant made from the system settings is
/// picked up without user action. The retry ticker is owned by the gate and is
/// disarmed by `stop()` and on reaching `Granted`.
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    state: PermissionState,
    active: bool,
    pending_alert: bool,
    request_pending: bool,
    retry: Ticker,
    diagnostics: LogThrottle,
}

impl PermissionGate {
    pub fn new(
        provider: Arc<dyn PermissionProvider>,
        retry_interval: Duration,
        diagnostic_interval: Duration,
    ) -> Self {
        Self {
            provider,
            state: PermissionState::Unknown,
            active: false,
            pending_alert: false,
            request_pending: false,
            retry: Ticker::new(retry_interval),
            diagnostics: LogThrottle::new(diagnostic_interval),
        }
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set while access is blocked and the user has to be sent to settings.
    pub fn pending_alert(&self) -> bool {
        self.pending_alert
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.retry.deadline()
    }

    /// Activates the gate and checks the status once. No-op when already active.
    pub fn start(&mut self, now: Instant) -> GateAction {
        if self.active {
            debug!("Permission gate already active");
            return GateAction::None;
        }
        self.active = true;
        self.check_status(now)
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.retry.stop();
    }

    pub fn check_status(&mut self, now: Instant) -> GateAction {
        let status = match self.provider.current_status() {
            Ok(status) => status,
            Err(err) => {
                if self.diagnostics.allow(now) {
                    warn!("Camera authorization status unavailable: {}", err);
                }
                if self.active {
                    self.retry.start(now);
                }
                return GateAction::None;
            }
        };

        match status {
            PermissionState::NotDetermined => {
                if self.request_pending {
                    return GateAction::None;
                }
                self.retry.stop();
                self.request_pending = true;
                self.transition(PermissionState::Requesting);
                GateAction::RequestAuthorization
            }
            PermissionState::Granted => {
                self.grant();
                GateAction::None
            }
            PermissionState::Denied | PermissionState::Restricted => {
                self.block(status, now);
                GateAction::None
            }
            PermissionState::Unknown | PermissionState::Requesting => {
                debug!("Transient authorization status {:?}, polling again", status);
                if self.active {
                    self.retry.start(now);
                }
                GateAction::None
            }
        }
    }

    /// Applies the outcome of an authorization prompt.
    pub fn complete_request(&mut self, outcome: Result<bool, PermissionError>, now: Instant) {
        self.request_pending = false;
        match outcome {
            Ok(true) => self.grant(),
            Ok(false) => self.block(PermissionState::Denied, now),
            Err(err) => {
                warn!("Camera authorization request failed: {}", err);
                self.block(PermissionState::Denied, now);
            }
        }
    }

    /// Fires the retry ticker if due. Does nothing once the gate is stopped.
    pub fn tick(&mut self, now: Instant) -> GateAction {
        if !self.active {
            self.retry.stop();
            return GateAction::None;
        }
        if !self.retry.poll(now) {
            return GateAction::None;
        }
        self.check_status(now)
    }

    fn grant(&mut self) {
        self.pending_alert = false;
        self.retry.stop();
        self.transition(PermissionState::Granted);
    }

    fn block(&mut self, state: PermissionState, now: Instant) {
        self.pending_alert = true;
        self.transition(state);
        if self.active {
            self.retry.start(now);
        }
        if self.diagnostics.allow(now) {
            warn!("Camera access is {:?}; polling for a change in settings", state);
        }
    }

    fn transition(&mut self, state: PermissionState) {
        if self.state != state {
            info!("Camera permission {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeProvider {
        status: Mutex<PermissionState>,
        status_reads: AtomicUsize,
    }

    impl FakeProvider {
        fn new(status: PermissionState) -> Arc<Self> {
            Arc::new(Self {
                status: Mutex::new(status),
                status_reads: AtomicUsize::new(0),
            })
        }

        fn set(&self, status: PermissionState) {
            *self.status.lock().unwrap() = status;
        }

        fn reads(&self) -> usize {
            self.status_reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PermissionProvider for FakeProvider {
        fn current_status(&self) -> Result<PermissionState, PermissionError> {
            self.status_reads.fetch_add(1, Ordering::SeqCst);
            Ok(*self.status.lock().unwrap())
        }

        async fn request_authorization(&self) -> Result<bool, PermissionError> {
            Ok(true)
        }
    }

    fn gate(provider: Arc<FakeProvider>) -> PermissionGate {
        PermissionGate::new(provider, Duration::from_secs(1), Duration::from_secs(5))
    }

    #[test]
    fn granted_status_does_not_schedule_retries() {
        let provider = FakeProvider::new(PermissionState::Granted);
        let mut gate = gate(provider.clone());

        assert_eq!(gate.start(Instant::now()), GateAction::None);

        assert_eq!(gate.state(), PermissionState::Granted);
        assert!(!gate.pending_alert());
        assert_eq!(gate.next_deadline(), None);
    }

    #[test]
    fn not_determined_requests_authorization_once() {
        let provider = FakeProvider::new(PermissionState::NotDetermined);
        let mut gate = gate(provider.clone());
        let now = Instant::now();

        assert_eq!(gate.start(now), GateAction::RequestAuthorization);
        assert_eq!(gate.state(), PermissionState::Requesting);
        assert_eq!(gate.check_status(now), GateAction::None);

        gate.complete_request(Ok(true), now);
        assert_eq!(gate.state(), PermissionState::Granted);
    }

    #[test]
    fn refused_prompt_blocks_and_polls() {
        let provider = FakeProvider::new(PermissionState::NotDetermined);
        let mut gate = gate(provider.clone());
        let now = Instant::now();
        gate.start(now);

        gate.complete_request(Ok(false), now);

        assert_eq!(gate.state(), PermissionState::Denied);
        assert!(gate.pending_alert());
        assert_eq!(gate.next_deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn denied_gate_polls_until_granted_then_stops() {
        let provider = FakeProvider::new(PermissionState::Denied);
        let mut gate = gate(provider.clone());
        let t0 = Instant::now();

        gate.start(t0);
        assert!(gate.pending_alert());
        assert_eq!(provider.reads(), 1);

        gate.tick(t0 + Duration::from_secs(1));
        gate.tick(t0 + Duration::from_secs(2));
        assert_eq!(provider.reads(), 3);
        assert_eq!(gate.state(), PermissionState::Denied);

        provider.set(PermissionState::Granted);
        gate.tick(t0 + Duration::from_secs(3));
        assert_eq!(gate.state(), PermissionState::Granted);
        assert!(!gate.pending_alert());
        assert_eq!(gate.next_deadline(), None);

        gate.tick(t0 + Duration::from_secs(4));
        gate.tick(t0 + Duration::from_secs(5));
        assert_eq!(provider.reads(), 4);
    }

    #[test]
    fn ticks_before_the_deadline_do_not_poll() {
        let provider = FakeProvider::new(PermissionState::Restricted);
        let mut gate = gate(provider.clone());
        let t0 = Instant::now();
        gate.start(t0);

        gate.tick(t0 + Duration::from_millis(400));
        gate.tick(t0 + Duration::from_millis(900));

        assert_eq!(provider.reads(), 1);
        assert_eq!(gate.state(), PermissionState::Restricted);
    }

    #[test]
    fn starting_an_active_gate_is_a_no_op() {
        let provider = FakeProvider::new(PermissionState::Denied);
        let mut gate = gate(provider.clone());
        let t0 = Instant::now();

        gate.start(t0);
        let deadline = gate.next_deadline();
        gate.start(t0 + Duration::from_millis(300));

        assert_eq!(provider.reads(), 1);
        assert_eq!(gate.next_deadline(), deadline);
    }

    #[test]
    fn stopped_gate_ignores_pending_ticks() {
        let provider = FakeProvider::new(PermissionState::Denied);
        let mut gate = gate(provider.clone());
        let t0 = Instant::now();
        gate.start(t0);

        gate.stop();
        gate.tick(t0 + Duration::from_secs(1));

        assert!(!gate.is_active());
        assert_eq!(gate.next_deadline(), None);
        assert_eq!(provider.reads(), 1);
    }

    #[test]
    fn transient_status_keeps_polling() {
        let provider = FakeProvider::new(PermissionState::Unknown);
        let mut gate = gate(provider.clone());
        let t0 = Instant::now();

        assert_eq!(gate.start(t0), GateAction::None);
        assert_eq!(gate.next_deadline(), Some(t0 + Duration::from_secs(1)));

        provider.set(PermissionState::Granted);
        gate.tick(t0 + Duration::from_secs(1));

        assert_eq!(provider.reads(), 2);
        assert_eq!(gate.state(), PermissionState::Granted);
        assert_eq!(gate.next_deadline(), None);
    }

    #[test]
    fn failed_request_is_treated_as_denied() {
        let provider = FakeProvider::new(PermissionState::NotDetermined);
        let mut gate = gate(provider.clone());
        let now = Instant::now();
        gate.start(now);

        gate.complete_request(
            Err(PermissionError::RequestFailed("prompt dismissed".to_string())),
            now,
        );

        assert_eq!(gate.state(), PermissionState::Denied);
        assert!(gate.pending_alert());
    }
}
