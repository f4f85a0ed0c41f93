//! Translation of column texts through an external service.
//!
//! The pipeline only sees the `Translator` trait; the Google client is one
//! implementation and tests drive the pipeline with in-memory fakes.

pub mod client;
pub mod google;

use std::future::Future;
use std::pin::Pin;

use tracing::{error, info};

use crate::error::AppError;

pub use google::GoogleTranslator;

/// Default source language.
pub const DEFAULT_SOURCE_LANG: &str = "en";

/// Default target language.
pub const DEFAULT_TARGET_LANG: &str = "zh";

/// A service that translates a list of strings.
///
/// Implementations return exactly one translation per input, in order.
pub trait Translator: Send + Sync {
    fn translate<'a>(
        &'a self,
        texts: &'a [String],
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, AppError>> + Send + 'a>>;
}

/// Translates `texts` with a single call to `client`.
///
/// Failures never propagate: on any error, or if the service answers with
/// the wrong number of results, the error is logged and the input texts
/// are returned unchanged.
pub async fn translate_texts(
    texts: Vec<String>,
    client: &dyn Translator,
    source_lang: &str,
    target_lang: &str,
) -> Vec<String> {
    if texts.is_empty() {
        return texts;
    }

    match client.translate(&texts, source_lang, target_lang).await {
        Ok(translations) if translations.len() == texts.len() => {
            info!(
                "[TRANSLATE] Translated {} texts ({} -> {})",
                texts.len(),
                source_lang,
                target_lang
            );
            translations
        }
        Ok(translations) => {
            let e = AppError::TranslationMismatch {
                expected: texts.len(),
                got: translations.len(),
            };
            error!("[TRANSLATE] Translation failed: {}", e);
            texts
        }
        Err(e) => {
            error!("[TRANSLATE] Translation failed: {}", e);
            texts
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory translators for tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prefixes every text with `[zh]`, counting calls.
    #[derive(Default)]
    pub struct TaggingTranslator {
        pub calls: AtomicUsize,
    }

    impl Translator for TaggingTranslator {
        fn translate<'a>(
            &'a self,
            texts: &'a [String],
            _source_lang: &'a str,
            target_lang: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, AppError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(texts
                    .iter()
                    .map(|t| format!("[{}] {}", target_lang, t))
                    .collect())
            })
        }
    }

    /// Always fails, like an unreachable service.
    pub struct FailingTranslator;

    impl Translator for FailingTranslator {
        fn translate<'a>(
            &'a self,
            _texts: &'a [String],
            _source_lang: &'a str,
            _target_lang: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, AppError>> + Send + 'a>> {
            Box::pin(async { Err(AppError::ConnectionFailed("unreachable".into())) })
        }
    }

    /// Drops the last translation.
    pub struct TruncatingTranslator;

    impl Translator for TruncatingTranslator {
        fn translate<'a>(
            &'a self,
            texts: &'a [String],
            _source_lang: &'a str,
            _target_lang: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, AppError>> + Send + 'a>> {
            Box::pin(async move {
                Ok(texts
                    .iter()
                    .take(texts.len().saturating_sub(1))
                    .cloned()
                    .collect())
            })
        }
    }
}
