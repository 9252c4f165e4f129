use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::candidate::{AnnotationCandidate, AnnotationIntent};
use crate::error::WorkerError;
use crate::services::{
    PersistenceStore, SavedTranslation, SpeechProvider, TranslationProvider, TranslationRequest,
};

/// Consumes annotation intents: translates placed labels, stores them and
/// optionally reads them out. Failed translations are logged and dropped.
pub struct AnnotationWorker {
    translator: Arc<dyn TranslationProvider>,
    store: Arc<dyn PersistenceStore>,
    speech: Option<Arc<dyn SpeechProvider>>,
    source_language: String,
    target_language: String,
    auto_speak: bool,
}

impl AnnotationWorker {
    pub fn new(
        translator: Arc<dyn TranslationProvider>,
        store: Arc<dyn PersistenceStore>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            store,
            speech: None,
            source_language: source_language.into(),
            target_language: target_language.into(),
            auto_speak: false,
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechProvider>, auto_speak: bool) -> Self {
        self.speech = Some(speech);
        self.auto_speak = auto_speak;
        self
    }

    /// Handles intents until the channel closes. On cancellation, intents
    /// already queued are still handled before returning.
    pub async fn run(self, mut intents: mpsc::Receiver<AnnotationIntent>, cancel: CancellationToken) {
        info!("Annotation worker started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    intents.close();
                    while let Some(intent) = intents.recv().await {
                        self.process(intent).await;
                    }
                    break;
                }
                intent = intents.recv() => match intent {
                    Some(intent) => self.process(intent).await,
                    None => break,
                },
            }
        }
        info!("Annotation worker stopped");
    }

    async fn process(&self, intent: AnnotationIntent) {
        if let Err(e) = self.handle(intent).await {
            warn!("Annotation intent failed: {}", e);
        }
    }

    pub async fn handle(&self, intent: AnnotationIntent) -> Result<(), WorkerError> {
        match intent {
            AnnotationIntent::Place(candidate) => {
                let record = self.translate(candidate).await?;
                if self.auto_speak {
                    if let Some(speech) = &self.speech {
                        speech.speak(&record.translated_text, &record.target_language);
                    }
                }
                self.store.save(record).await?;
                Ok(())
            }
            AnnotationIntent::Remove(id) => {
                self.store.delete(id).await?;
                debug!("Deleted saved translation {}", id);
                Ok(())
            }
        }
    }

    async fn translate(&self, candidate: AnnotationCandidate) -> Result<SavedTranslation, WorkerError> {
        let request = TranslationRequest {
            text: candidate.label.clone(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
        };
        let translated_text = self.translator.translate(&request).await?;
        debug!("Translated {} -> {}", request.text, translated_text);

        Ok(SavedTranslation {
            id: candidate.id,
            source_text: candidate.label,
            translated_text,
            source_language: request.source_language,
            target_language: request.target_language,
            region: candidate.region,
            created_at: candidate.created_at,
        })
    }
}
