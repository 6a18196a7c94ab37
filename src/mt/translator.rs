//! Machine Translation trait and utilities
//!
//! This module defines the `MachineTranslator` trait for provider abstraction,
//! so the traversal and reconciliation code never depends on a concrete
//! backend (DeepL, mock, ...).
//!
//! # Example
//!
//! ```ignore
//! use contentful_translate::mt::{MachineTranslator, DeepLProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = DeepLProvider::from_env()?;
//!     let result = provider.translate("Hello, world!", "en", "de").await?;
//!     println!("{}", result); // "Hallo, Welt!"
//!     Ok(())
//! }
//! ```

use crate::mt::error::{MtError, MtResult};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Strings shorter than this are fragments and are never sent to a provider
pub const MIN_TRANSLATABLE_CHARS: usize = 3;

/// Generic trait for machine translation providers
///
/// All methods are async to support I/O-bound operations like network requests.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// Translate a single text string from source to target locale
    ///
    /// # Arguments
    ///
    /// * `text` - The text to translate
    /// * `source_locale` - Source language code (e.g., "en")
    /// * `target_locale` - Target language code (e.g., "de", "pt-BR")
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The translated text
    /// * `Err(MtError)` - If translation fails
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String>;

    /// Translate multiple strings in a single batch operation
    ///
    /// # Guarantees
    ///
    /// - Output order matches input order
    /// - Output length equals input length
    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>>;

    /// Name of this provider, used in log events
    fn provider_name(&self) -> &str;
}

/// Translate one leaf of content, absorbing provider failures
///
/// Fragments shorter than [`MIN_TRANSLATABLE_CHARS`] come back unchanged without a
/// provider call. A provider error is logged and surfaces as `None`, which callers
/// treat as a failed leaf rather than a failed run.
pub async fn translate_text(
    translator: &dyn MachineTranslator,
    text: &str,
    source_locale: &str,
    target_locale: &str,
) -> Option<String> {
    if text.chars().count() < MIN_TRANSLATABLE_CHARS {
        return Some(text.to_string());
    }

    debug!(
        provider = translator.provider_name(),
        target_locale,
        text = %truncate(text, 50),
        "translating"
    );

    match translator.translate(text, source_locale, target_locale).await {
        Ok(translated) => Some(translated),
        Err(err) => {
            warn!(
                provider = translator.provider_name(),
                target_locale,
                error = %err,
                "translation failed"
            );
            None
        }
    }
}

/// Shorten `text` to at most `max_chars` characters, appending `...` when cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Normalize a locale code to the upper-case form providers expect
///
/// - `de` → `DE`
/// - `pt-br` → `PT-BR`
/// - `en_GB` → `EN-GB`
pub fn normalize_locale(locale: &str) -> String {
    locale.replace('_', "-").to_uppercase()
}

/// Validate that a locale code is in acceptable format
///
/// Checks that the locale code contains only alphanumeric characters,
/// hyphens, and underscores.
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::InvalidLocale("Locale code is empty".to_string()));
    }

    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MtError::InvalidLocale(format!(
            "Invalid characters in locale code: {}",
            locale
        )));
    }

    Ok(())
}
