//! Mock Machine Translator for testing
//!
//! Deterministic, API-free translator used by the test suite and by the
//! `--mock` flag of the binary.
//!
//! # Example
//!
//! ```ignore
//! use contentful_translate::mt::{MachineTranslator, MockTranslator, MockMode};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockTranslator::new(MockMode::Suffix);
//!     let result = mock.translate("hello", "en", "de").await.unwrap();
//!     assert_eq!(result, "hello_de");
//! }
//! ```

use crate::mt::error::{MtError, MtResult};
use crate::mt::translator::MachineTranslator;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append locale suffix: "hello" → "hello_de"
    Suffix,

    /// Use predefined mappings, falling back to the suffix form
    /// (text, target_locale) → translation
    Mappings(HashMap<(String, String), String>),

    /// Every call fails with the given message
    Error(String),

    /// Suffix translation, except the listed source texts fail
    FailOn(HashSet<String>),

    /// Return input unchanged
    NoOp,
}

/// Mock translator that records every text it was asked to translate
#[derive(Debug)]
pub struct MockTranslator {
    mode: MockMode,
    calls: Mutex<Vec<String>>,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Build a `Mappings` translator from `(source, target_locale, translation)` triples
    pub fn with_mappings(mappings: &[(&str, &str, &str)]) -> Self {
        let map = mappings
            .iter()
            .map(|(text, locale, translated)| {
                ((text.to_string(), locale.to_string()), translated.to_string())
            })
            .collect();
        Self::new(MockMode::Mappings(map))
    }

    /// Texts passed to `translate`/`translate_batch`, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, text: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }
    }

    fn apply_translation(&self, text: &str, target: &str) -> MtResult<String> {
        match &self.mode {
            MockMode::Suffix => Ok(format!("{}_{}", text, target)),
            MockMode::Mappings(map) => {
                let key = (text.to_string(), target.to_string());
                Ok(map
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| format!("{}_{}", text, target)))
            }
            MockMode::Error(msg) => Err(MtError::TranslationError(msg.clone())),
            MockMode::FailOn(failing) if failing.contains(text) => Err(
                MtError::TranslationError(format!("mock failure for '{}'", text)),
            ),
            MockMode::FailOn(_) => Ok(format!("{}_{}", text, target)),
            MockMode::NoOp => Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl MachineTranslator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        self.record(text);
        self.apply_translation(text, target_locale)
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        _source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            self.record(text);
            results.push(self.apply_translation(text, target_locale)?);
        }
        Ok(results)
    }

    fn provider_name(&self) -> &str {
        "Mock Translator"
    }
}
