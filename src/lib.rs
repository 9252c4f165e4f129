pub mod annotation;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod permission;
pub mod pipeline;
pub mod services;
pub mod session;
pub mod tracking;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AnnotationError, AppError, DetectionError, PermissionError, SessionError};
pub use session::{SessionEvent, SessionSnapshot};
