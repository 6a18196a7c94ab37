//! Run configuration.
//!
//! Loaded once at startup from `translate.config.json` and passed by reference
//! to everything that needs it.

use crate::error::ConfigError;
use icu_locale::Locale;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "translate.config.json";

/// Regular expressions that mark a string as a URL rather than prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlPatterns {
    pub absolute_url: String,
    pub relative_path: String,
    pub anchor_link: String,
}

impl Default for UrlPatterns {
    fn default() -> Self {
        Self {
            absolute_url: r"^https?://[^\s]+$".to_string(),
            relative_path: r"^/[\w/-]+$".to_string(),
            anchor_link: r"^#[\w-]+$".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub save_failed_translations: bool,
    pub failed_translations_path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            save_failed_translations: false,
            failed_translations_path: PathBuf::from("logs/failed-translations"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslateConfig {
    pub max_depth: usize,
    pub max_fields: usize,
    pub skip_fields: Vec<String>,
    pub supported_locales: Vec<String>,
    /// Locale whose values are read as source text
    pub source_locale: String,
    pub starting_content_type: Option<String>,
    pub url_patterns: UrlPatterns,
    pub logging: LoggingConfig,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_fields: 100,
            skip_fields: ["slug", "videoUrl", "linkTo", "pageType", "publicationLink"]
                .into_iter()
                .map(String::from)
                .collect(),
            supported_locales: ["de", "fr", "es", "nl"]
                .into_iter()
                .map(String::from)
                .collect(),
            source_locale: "en".to_string(),
            starting_content_type: None,
            url_patterns: UrlPatterns::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TranslateConfig {
    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: TranslateConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth < 1 {
            return Err(ConfigError::Invalid("maxDepth must be at least 1".into()));
        }
        if self.max_fields < 1 {
            return Err(ConfigError::Invalid("maxFields must be at least 1".into()));
        }
        if self.supported_locales.is_empty() {
            return Err(ConfigError::Invalid(
                "supportedLocales must list at least one locale".into(),
            ));
        }

        for locale in std::iter::once(&self.source_locale).chain(&self.supported_locales) {
            locale.parse::<Locale>().map_err(|e| {
                ConfigError::Invalid(format!("invalid locale code '{}': {}", locale, e))
            })?;
        }

        if self.supported_locales.contains(&self.source_locale) {
            return Err(ConfigError::Invalid(format!(
                "source locale '{}' cannot also be a target locale",
                self.source_locale
            )));
        }

        // Patterns must compile before any traversal starts.
        self.compile_patterns()?;
        Ok(())
    }

    /// Compile the URL patterns as `(absolute_url, relative_path, anchor_link)`
    pub fn compile_patterns(&self) -> Result<(Regex, Regex, Regex), ConfigError> {
        let compile = |name: &'static str, pattern: &str| {
            Regex::new(pattern).map_err(|source| ConfigError::Pattern { name, source })
        };
        Ok((
            compile("absoluteUrl", &self.url_patterns.absolute_url)?,
            compile("relativePath", &self.url_patterns.relative_path)?,
            compile("anchorLink", &self.url_patterns.anchor_link)?,
        ))
    }

    pub fn is_supported_locale(&self, locale: &str) -> bool {
        self.supported_locales.iter().any(|l| l == locale)
    }
}

/// Credentials for the content service and the translation provider.
#[derive(Clone)]
pub struct Credentials {
    pub space_id: String,
    pub management_token: String,
    pub environment: String,
    pub deepl_api_key: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment
    ///
    /// `require_translator` is false when the mock translator replaces DeepL,
    /// in which case `DEEPL_API_KEY` may be absent.
    pub fn from_env(require_translator: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), require_translator)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        require_translator: bool,
    ) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let space_id = get("CONTENTFUL_SPACE_ID");
        let management_token = get("CONTENTFUL_MANAGEMENT_TOKEN");
        let deepl_api_key = get("DEEPL_API_KEY");

        let mut missing = Vec::new();
        if space_id.is_none() {
            missing.push("CONTENTFUL_SPACE_ID".to_string());
        }
        if management_token.is_none() {
            missing.push("CONTENTFUL_MANAGEMENT_TOKEN".to_string());
        }
        if require_translator && deepl_api_key.is_none() {
            missing.push("DEEPL_API_KEY".to_string());
        }

        match (space_id, management_token) {
            (Some(space_id), Some(management_token)) if missing.is_empty() => Ok(Self {
                space_id,
                management_token,
                environment: get("CONTENTFUL_ENVIRONMENT").unwrap_or_else(|| "master".into()),
                deepl_api_key,
            }),
            _ => Err(ConfigError::MissingEnv(missing)),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("space_id", &self.space_id)
            .field("management_token", &"***")
            .field("environment", &self.environment)
            .field("deepl_api_key", &self.deepl_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = TranslateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.max_fields, 100);
        assert!(config.skip_fields.contains(&"slug".to_string()));
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let file = write_config(
            r#"{
                "maxDepth": 3,
                "startingContentType": "recipe",
                "skipFields": ["slug"],
                "supportedLocales": ["de", "fr"],
                "logging": { "saveFailedTranslations": true }
            }"#,
        );
        let config = TranslateConfig::load(file.path()).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_fields, 100);
        assert_eq!(config.starting_content_type.as_deref(), Some("recipe"));
        assert_eq!(config.supported_locales, vec!["de", "fr"]);
        assert!(config.logging.save_failed_translations);
        assert_eq!(
            config.logging.failed_translations_path,
            PathBuf::from("logs/failed-translations")
        );
        assert_eq!(config.url_patterns, UrlPatterns::default());
    }

    #[test]
    fn load_missing_file() {
        let result = TranslateConfig::load(Path::new("/nonexistent/translate.config.json"));
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn load_malformed_file() {
        let file = write_config("{ not json");
        assert!(matches!(
            TranslateConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_zero_limits() {
        let config = TranslateConfig {
            max_depth: 0,
            ..TranslateConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = TranslateConfig {
            max_fields: 0,
            ..TranslateConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_locale_and_pattern() {
        let config = TranslateConfig {
            supported_locales: vec!["not a locale!".into()],
            ..TranslateConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = TranslateConfig::default();
        config.url_patterns.anchor_link = "([unclosed".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Pattern { name: "anchorLink", .. })
        ));
    }

    #[test]
    fn rejects_source_locale_as_target() {
        let config = TranslateConfig {
            supported_locales: vec!["en".into(), "de".into()],
            ..TranslateConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn credentials_report_all_missing() {
        let env: HashMap<&str, &str> = HashMap::from([("CONTENTFUL_SPACE_ID", "space")]);
        let result = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()), true);
        match result {
            Err(ConfigError::MissingEnv(missing)) => assert_eq!(
                missing,
                vec!["CONTENTFUL_MANAGEMENT_TOKEN", "DEEPL_API_KEY"]
            ),
            other => panic!("Expected MissingEnv, got {:?}", other),
        }
    }

    #[test]
    fn credentials_without_translator_key() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CONTENTFUL_SPACE_ID", "space"),
            ("CONTENTFUL_MANAGEMENT_TOKEN", "s3cr3t"),
        ]);
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()), false)
            .unwrap();
        assert_eq!(creds.environment, "master");
        assert!(creds.deepl_api_key.is_none());
        assert!(!format!("{:?}", creds).contains("s3cr3t"));
    }
}
