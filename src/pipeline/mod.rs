pub mod detection;
pub mod metrics;
pub mod scheduler;
pub mod stability;

pub use detection::{DetectionFrame, DetectionPort, DetectionResult};
pub use metrics::{AdmissionStats, DropReason};
pub use scheduler::{
    AdmissionContext, Completion, DetectionRequest, DetectionScheduler, DetectionTicket,
    SchedulerConfig,
};
pub use stability::StabilityTracker;
