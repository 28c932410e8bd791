//! OCR Service
//!
//! Serializes access to a single OCR engine and runs multi-pass recognition.
//!
//! Engines are not assumed to be safe for concurrent recognition, and every
//! outstanding call pins a decoded image in memory, so all calls for a
//! document go through one FIFO queue: one recognition at a time, in the
//! order they were requested.

use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use super::passes::{self, OcrPass};
use super::provider::OcrEngine;
use super::types::{OcrError, OcrParams, OcrResult};
use crate::config::ExtractionConfig;
use crate::fields::FieldProfile;

/// Winning candidate of a multi-pass recognition
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub pass: OcrPass,
    pub result: OcrResult,
    pub score: f64,
}

/// Serialized OCR queue over one engine
pub struct OcrService {
    engine: Arc<dyn OcrEngine>,
    language: String,
    /// Held for the duration of each recognition; tokio's mutex is FIFO-fair
    queue: Mutex<()>,
    ready: OnceCell<()>,
}

impl OcrService {
    /// Create a new OCR service
    pub fn new(engine: Arc<dyn OcrEngine>, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
            queue: Mutex::new(()),
            ready: OnceCell::new(),
        }
    }

    /// Create a service recognizing in the configured language
    pub fn from_config(engine: Arc<dyn OcrEngine>, config: &ExtractionConfig) -> Self {
        Self::new(engine, config.language.clone())
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Run one recognition pass, waiting for the queue
    pub async fn recognize(&self, image_png: &[u8], pass: &OcrPass) -> Result<OcrResult, OcrError> {
        let _turn = self.queue.lock().await;

        self.ready
            .get_or_try_init(|| self.engine.initialize())
            .await?;

        let params = OcrParams {
            psm: pass.psm,
            whitelist: pass.whitelist.map(str::to_string),
            language: self.language.clone(),
        };
        self.engine.recognize(image_png, &params).await
    }

    /// Run every pass planned for `profile` and keep the best candidate.
    ///
    /// Failed passes are logged and skipped. Initialization failures are
    /// returned immediately; if every pass fails, the last error is returned.
    pub async fn recognize_best(
        &self,
        image_png: &[u8],
        profile: FieldProfile,
    ) -> Result<PassOutcome, OcrError> {
        let plan = passes::plan(profile);
        let mut candidates = Vec::with_capacity(plan.len());
        let mut ran = Vec::with_capacity(plan.len());
        let mut last_error = None;

        for pass in &plan {
            match self.recognize(image_png, pass).await {
                Ok(result) => {
                    tracing::trace!(
                        psm = pass.psm.as_tesseract(),
                        confidence = result.confidence,
                        text = %result.text,
                        "OCR pass finished"
                    );
                    candidates.push(result);
                    ran.push(*pass);
                }
                Err(e) if e.is_initialization() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "OCR pass psm={} on {} failed: {}, trying next",
                        pass.psm.as_tesseract(),
                        self.engine.name(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match passes::select_best(candidates) {
            Some((index, result)) => Ok(PassOutcome {
                pass: ran[index],
                score: passes::score(&result),
                result,
            }),
            None => Err(last_error
                .unwrap_or_else(|| OcrError::ProcessingError("No OCR passes planned".to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::ocr::mock::MockOcrEngine;
    use crate::ocr::PageSegMode;

    fn service(engine: &Arc<MockOcrEngine>) -> OcrService {
        OcrService::new(Arc::clone(engine) as Arc<dyn OcrEngine>, "eng")
    }

    #[tokio::test]
    async fn test_best_pass_wins() {
        let engine = Arc::new(MockOcrEngine::with_responses(vec![
            OcrResult::new("A-1O1", 0.41),
            OcrResult::new("A-101", 0.93),
            OcrResult::new("A-101", 0.93),
        ]));
        let outcome = service(&engine)
            .recognize_best(b"png", FieldProfile::Identifier)
            .await
            .unwrap();

        // Second pass wins the tie against the third
        assert_eq!(outcome.pass.psm, PageSegMode::SingleWord);
        assert_eq!(outcome.result.text, "A-101");
        assert_eq!(engine.call_count(), 3);

        let calls = engine.calls.lock();
        assert!(calls.iter().all(|p| p.language == "eng"));
        assert!(calls.iter().all(|p| p.whitelist.is_some()));
    }

    #[tokio::test]
    async fn test_failed_pass_is_skipped() {
        let engine = Arc::new(MockOcrEngine::default());
        {
            let mut responses = engine.responses.lock();
            responses.push_back(Err("timeout".into()));
            responses.push_back(Ok(OcrResult::new("12/03/2024", 0.7)));
            responses.push_back(Err("timeout".into()));
        }
        let outcome = service(&engine)
            .recognize_best(b"png", FieldProfile::Date)
            .await
            .unwrap();
        assert_eq!(outcome.result.text, "12/03/2024");
    }

    #[tokio::test]
    async fn test_all_passes_failing_returns_error() {
        let engine = Arc::new(MockOcrEngine::default());
        {
            let mut responses = engine.responses.lock();
            for _ in 0..3 {
                responses.push_back(Err("crashed".into()));
            }
        }
        let err = service(&engine)
            .recognize_best(b"png", FieldProfile::FreeText)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::ProcessingError(_)));
    }

    #[tokio::test]
    async fn test_initialization_runs_once_and_failure_is_fatal() {
        let engine = Arc::new(MockOcrEngine::default());
        let svc = service(&engine);
        svc.recognize_best(b"png", FieldProfile::Date).await.unwrap();
        svc.recognize_best(b"png", FieldProfile::Date).await.unwrap();
        assert_eq!(engine.inits.load(Ordering::SeqCst), 1);

        let broken = Arc::new(MockOcrEngine {
            fail_init: true,
            ..Default::default()
        });
        let err = service(&broken)
            .recognize_best(b"png", FieldProfile::Date)
            .await
            .unwrap_err();
        assert!(err.is_initialization());
        assert_eq!(broken.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let engine = Arc::new(MockOcrEngine::default());
        let svc = Arc::new(service(&engine));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let svc = Arc::clone(&svc);
            tasks.push(tokio::spawn(async move {
                svc.recognize_best(b"png", FieldProfile::Identifier).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(engine.call_count(), 12);
        assert_eq!(engine.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
