//! Google Translate client.
//!
//! Two transports:
//! - Cloud Translation v2 (`POST /language/translate/v2`) when an API key is
//!   configured; the whole list goes out in one request
//! - the public web endpoint (`GET /translate_a/single?client=gtx`) otherwise,
//!   one request per text

use std::future::Future;
use std::pin::Pin;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::client::HttpClient;
use super::Translator;
use crate::error::AppError;

/// Base URL of the public web endpoint.
pub const WEB_BASE_URL: &str = "https://translate.googleapis.com/";

/// Base URL of Cloud Translation.
pub const CLOUD_BASE_URL: &str = "https://translation.googleapis.com/";

const WEB_PATH: &str = "translate_a/single";
const CLOUD_PATH: &str = "language/translate/v2";

/// Maximum characters of an error body kept in error messages.
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, Deserialize)]
struct CloudResponse {
    data: CloudData,
}

#[derive(Debug, Deserialize)]
struct CloudData {
    translations: Vec<CloudTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudTranslation {
    translated_text: String,
}

/// Maps short language codes to the ones Google expects.
pub fn google_lang_code(code: &str) -> &str {
    match code {
        "zh" => "zh-CN",
        other => other,
    }
}

/// Extracts the translation from a web endpoint response.
///
/// The body looks like `[[["你好","Hello",null,null,10],["世界","World",...]],null,"en"]`;
/// long texts are split into segments, joined back here.
fn parse_web_response(body: &str) -> Result<String, AppError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AppError::Translation(format!("Response is not JSON: {}", e)))?;

    let segments = value
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Translation("Response has no segment array".into()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(AppError::Translation("Response has no translated text".into()));
    }
    Ok(text)
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    Err(AppError::Translation(format!(
        "HTTP {}: {}",
        status.as_u16(),
        preview
    )))
}

/// Google Translate client.
pub struct GoogleTranslator {
    http: HttpClient,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for GoogleTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslator")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GoogleTranslator {
    /// Creates a client; an empty API key selects the web endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the default base URL cannot be parsed.
    pub fn new(http: HttpClient, api_key: Option<String>) -> Result<Self, AppError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        let base = if api_key.is_some() {
            CLOUD_BASE_URL
        } else {
            WEB_BASE_URL
        };

        let base_url = Url::parse(base)
            .map_err(|e| AppError::Internal(format!("Invalid base URL {}: {}", base, e)))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Points the client at another host, e.g. a proxy or a mock server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `base_url` is not an absolute URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, AppError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid endpoint '{}': {}", base_url, e)))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn uses_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid path {}: {}", path, e)))
    }

    /// Translates one text through the web endpoint.
    pub async fn translate_web(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, AppError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let mut url = self.endpoint(WEB_PATH)?;
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", google_lang_code(source_lang))
            .append_pair("tl", google_lang_code(target_lang))
            .append_pair("dt", "t")
            .append_pair("q", text);

        let response = error_for_status(self.http.send(Method::GET, url, None).await?).await?;
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Translation(format!("Failed to read response: {}", e)))?;

        parse_web_response(&body)
    }

    /// Translates a list in one Cloud Translation request.
    pub async fn translate_cloud(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, AppError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::Config("Cloud Translation needs an API key".into()))?;

        // Blank texts are answered locally and spliced back in.
        let pending: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, t.as_str()))
            .collect();

        let mut results: Vec<String> = texts.to_vec();
        if pending.is_empty() {
            return Ok(results);
        }

        let mut url = self.endpoint(CLOUD_PATH)?;
        url.query_pairs_mut()
            .append_pair("key", api_key.expose_secret());

        let body = json!({
            "q": pending.iter().map(|(_, t)| *t).collect::<Vec<_>>(),
            "source": google_lang_code(source_lang),
            "target": google_lang_code(target_lang),
            "format": "text",
        });

        let response =
            error_for_status(self.http.send(Method::POST, url, Some(&body)).await?).await?;
        let parsed: CloudResponse = response
            .json()
            .await
            .map_err(|e| AppError::Translation(format!("Failed to parse response: {}", e)))?;

        let translations = parsed.data.translations;
        if translations.len() != pending.len() {
            return Err(AppError::TranslationMismatch {
                expected: pending.len(),
                got: translations.len(),
            });
        }

        for ((index, _), translation) in pending.iter().zip(translations) {
            results[*index] = translation.translated_text;
        }
        Ok(results)
    }

    async fn translate_all(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, AppError> {
        if self.uses_api_key() {
            return self.translate_cloud(texts, source_lang, target_lang).await;
        }

        let mut results = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            results.push(self.translate_web(text, source_lang, target_lang).await?);
            debug!("[TRANSLATE] {}/{} texts done", i + 1, texts.len());
        }
        Ok(results)
    }
}

impl Translator for GoogleTranslator {
    fn translate<'a>(
        &'a self,
        texts: &'a [String],
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, AppError>> + Send + 'a>> {
        Box::pin(self.translate_all(texts, source_lang, target_lang))
    }
}
