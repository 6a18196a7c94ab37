//! DeepL API provider for machine translation
//!
//! # Authentication
//!
//! The provider loads the API key from the `DEEPL_API_KEY` environment
//! variable. Keys ending in `:fx` belong to the free plan and are routed to
//! `api-free.deepl.com`; every other key goes to `api.deepl.com`.

use crate::mt::error::{MtError, MtResult};
use crate::mt::translator::{MachineTranslator, normalize_locale, validate_locale};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

const FREE_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";
const PRO_ENDPOINT: &str = "https://api.deepl.com/v2/translate";

/// DeepL API v2 provider
#[derive(Clone)]
pub struct DeepLProvider {
    api_key: String,
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

impl DeepLProvider {
    /// DeepL accepts up to 50 texts per request
    const MAX_BATCH_SIZE: usize = 50;

    /// Create a provider with an explicit API key
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance
    /// * `Err(MtError)` - If the key is empty or the HTTP client cannot be built
    pub fn new(api_key: String) -> MtResult<Self> {
        if api_key.trim().is_empty() {
            return Err(MtError::ConfigError("API key cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| MtError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = if api_key.ends_with(":fx") {
            FREE_ENDPOINT
        } else {
            PRO_ENDPOINT
        };

        Ok(Self {
            api_key,
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Create a provider from the `DEEPL_API_KEY` environment variable
    pub fn from_env() -> MtResult<Self> {
        let api_key = std::env::var("DEEPL_API_KEY").map_err(|_| {
            MtError::ConfigError("DEEPL_API_KEY environment variable not set".to_string())
        })?;

        Self::new(api_key)
    }

    /// Endpoint this provider posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the JSON request body for one chunk
    ///
    /// DeepL wants bare language codes for the source (`EN`) but accepts
    /// regional variants for the target (`PT-BR`).
    fn request_body(texts: &[String], source_locale: &str, target_locale: &str) -> Value {
        let source = normalize_locale(source_locale);
        let source = source.split('-').next().unwrap_or(&source).to_string();
        json!({
            "text": texts,
            "source_lang": source,
            "target_lang": normalize_locale(target_locale),
        })
    }

    /// Pull the translated strings out of a response body
    fn parse_response(body: &str, expected: usize) -> MtResult<Vec<String>> {
        let parsed: TranslateResponse = serde_json::from_str(body).map_err(|e| {
            MtError::TranslationError(format!("Failed to parse API response: {}", e))
        })?;

        if parsed.translations.len() != expected {
            return Err(MtError::TranslationError(format!(
                "Expected {} translations, got {}",
                expected,
                parsed.translations.len()
            )));
        }

        Ok(parsed.translations.into_iter().map(|t| t.text).collect())
    }

    async fn translate_chunk(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        let body = Self::request_body(texts, source_locale, target_locale);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(if status.is_client_error() {
                MtError::ConfigError(format!("API client error ({}): {}", status, error_text))
            } else {
                MtError::TranslationError(format!("API server error ({}): {}", status, error_text))
            });
        }

        let text = response.text().await?;
        Self::parse_response(&text, texts.len())
    }
}

impl std::fmt::Debug for DeepLProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLProvider")
            .field("api_key", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for DeepLProvider {
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;

        if text.is_empty() {
            return Ok(String::new());
        }

        let results = self
            .translate_chunk(&[text.to_string()], source_locale, target_locale)
            .await?;

        results
            .into_iter()
            .next()
            .ok_or_else(|| MtError::TranslationError("Empty translation response".to_string()))
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;

        let mut all_results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(Self::MAX_BATCH_SIZE) {
            let chunk_results = self
                .translate_chunk(chunk, source_locale, target_locale)
                .await?;
            all_results.extend(chunk_results);
        }

        Ok(all_results)
    }

    fn provider_name(&self) -> &str {
        "DeepL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Initialization Tests ==========

    #[test]
    fn test_new_with_empty_key() {
        match DeepLProvider::new("   ".to_string()) {
            Err(MtError::ConfigError(msg)) => assert!(msg.contains("empty")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_endpoint_selection() {
        let free = DeepLProvider::new("abc:fx".to_string()).unwrap();
        assert_eq!(free.endpoint(), FREE_ENDPOINT);

        let pro = DeepLProvider::new("abc".to_string()).unwrap();
        assert_eq!(pro.endpoint(), PRO_ENDPOINT);
        assert_eq!(pro.provider_name(), "DeepL");
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = DeepLProvider::new("secret-key".to_string()).unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("***"));
    }

    // ========== Request/Response Tests ==========

    #[test]
    fn test_request_body() {
        let texts = vec!["Hello".to_string(), "World".to_string()];
        let body = DeepLProvider::request_body(&texts, "en-US", "pt-br");
        assert_eq!(
            body,
            json!({"text": ["Hello", "World"], "source_lang": "EN", "target_lang": "PT-BR"})
        );
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"translations":[{"detected_source_language":"EN","text":"Hallo"}]}"#;
        let parsed = DeepLProvider::parse_response(body, 1).unwrap();
        assert_eq!(parsed, vec!["Hallo"]);
    }

    #[test]
    fn test_parse_response_count_mismatch() {
        let body = r#"{"translations":[]}"#;
        assert!(matches!(
            DeepLProvider::parse_response(body, 1),
            Err(MtError::TranslationError(_))
        ));
    }

    #[test]
    fn test_parse_response_malformed() {
        assert!(DeepLProvider::parse_response("not json", 1).is_err());
    }
}
