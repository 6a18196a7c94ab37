//! JSON record of the updates that could not be applied in one run.

use crate::reconcile::FailureMap;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureLog {
    pub timestamp: String,
    pub locale: String,
    pub updates: FailureMap,
}

impl FailureLog {
    pub fn new(locale: &str, updates: FailureMap, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            locale: locale.to_string(),
            updates,
        }
    }

    pub fn file_name(locale: &str, at: DateTime<Utc>) -> String {
        format!("failed-translations-{}-{}.json", locale, at.timestamp_millis())
    }

    /// Write `failures` under `dir` and return the file's path
    pub fn write(dir: &Path, locale: &str, failures: &FailureMap) -> io::Result<PathBuf> {
        let now = Utc::now();
        fs::create_dir_all(dir)?;

        let path = dir.join(Self::file_name(locale, now));
        let log = Self::new(locale, failures.clone(), now);
        let body = serde_json::to_string_pretty(&log).map_err(io::Error::other)?;
        fs::write(&path, body)?;

        info!(path = %path.display(), locale, entries = failures.len(), "failed translations saved");
        Ok(path)
    }

    /// Load a log written by [`FailureLog::write`], for inspecting or
    /// retrying the failed updates of an earlier run
    pub fn read(path: &Path) -> io::Result<Self> {
        let body = fs::read_to_string(path)?;
        serde_json::from_str(&body).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::FieldFailure;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn failures() -> FailureMap {
        let mut map = FailureMap::new();
        map.insert(
            "e1".into(),
            vec![FieldFailure::field(
                "title",
                "Translation exceeds maximum length of 255 characters",
                Some(json!("Sehr langer Titel")),
            )],
        );
        map
    }

    #[test]
    fn file_name_uses_millis() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            FailureLog::file_name("de", at),
            "failed-translations-de-1714564800000.json"
        );
    }

    #[test]
    fn record_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let value = serde_json::to_value(FailureLog::new("de", failures(), at)).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": "2024-05-01T12:00:00.000Z",
                "locale": "de",
                "updates": {
                    "e1": [{
                        "fieldName": "title",
                        "error": "Translation exceeds maximum length of 255 characters",
                        "translation": "Sehr langer Titel"
                    }]
                }
            })
        );
    }

    #[test]
    fn write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("failed");
        let path = FailureLog::write(&nested, "fr", &failures()).unwrap();

        assert!(path.starts_with(&nested));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("failed-translations-fr-"));
        assert!(name.ends_with(".json"));

        let log = FailureLog::read(&path).unwrap();
        assert_eq!(log.locale, "fr");
        assert_eq!(log.updates, failures());
    }
}
