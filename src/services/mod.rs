pub mod persistence;
pub mod speech;
pub mod translation;

pub use persistence::{InMemoryStore, PersistenceStore, SavedTranslation};
pub use speech::{SpeechProvider, SpeechState};
pub use translation::{TranslationProvider, TranslationRequest};
