use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeechState {
    #[default]
    Idle,
    Loading,
    Speaking,
}

/// Text-to-speech output. `speak` returns immediately; progress is observed
/// through `state`.
pub trait SpeechProvider: Send + Sync {
    fn speak(&self, text: &str, language_code: &str);
    fn state(&self) -> SpeechState;
}
