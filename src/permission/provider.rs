use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PermissionError;

/// Camera authorization as seen by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PermissionState {
    /// Not checked yet.
    #[default]
    Unknown,
    NotDetermined,
    Requesting,
    Granted,
    Denied,
    Restricted,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }

    /// Denied or restricted; only the system settings can change it.
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Denied | Self::Restricted)
    }
}

/// Platform camera authorization.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    fn current_status(&self) -> Result<PermissionState, PermissionError>;

    /// Shows the system prompt. Resolves to whether access was granted.
    async fn request_authorization(&self) -> Result<bool, PermissionError>;
}
