use thiserror::Error;

use crate::annotation::AnnotationId;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Annotation Error: {0}")]
    Annotation(#[from] AnnotationError),
    #[error("Session Error: {0}")]
    Session(#[from] SessionError),
    #[error("Coordinator is missing a collaborator: {0}")]
    MissingCollaborator(&'static str),
}

// Configuration Error Type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Session Error Type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("The session task is no longer running.")]
    Closed,
    #[error("The session dropped the response for {0}.")]
    ResponseDropped(&'static str),
}

// Detection Port Error Type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("Detector failed: {0}")]
    Failed(String),
    #[error("Detector is unavailable")]
    Unavailable,
    #[error("Detection was cancelled")]
    Cancelled,
}

// Permission Provider Error Type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Failed to read camera authorization status: {0}")]
    StatusUnavailable(String),
    #[error("Camera authorization request failed: {0}")]
    RequestFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("No stable detection to annotate")]
    NoStableDetection,
    #[error("Annotation sink is unavailable: {0}")]
    SinkUnavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("Translation network failure: {0}")]
    Network(String),
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Translation timed out")]
    Timeout,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Saved translation {0} was not found")]
    NotFound(AnnotationId),
    #[error("Storage failure: {0}")]
    Storage(String),
}

// Annotation Worker Error Type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),
    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}
