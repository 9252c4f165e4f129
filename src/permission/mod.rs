pub mod gate;
pub mod provider;

pub use gate::{GateAction, PermissionGate};
pub use provider::{PermissionProvider, PermissionState};
