pub mod candidate;
pub mod coordinator;
pub mod worker;

pub use candidate::{AnnotationCandidate, AnnotationId, AnnotationIntent};
pub use coordinator::{AnnotationCoordinator, IntentTransmitter};
pub use worker::AnnotationWorker;
