//! Units of translation work and the batch step that runs them.

use crate::classifier::{self, Classifier};
use crate::content::model::FieldValue;
use crate::mt::translator::{MachineTranslator, translate_text, truncate};
use crate::reconcile::{FailureMap, FieldFailure};
use crate::rich_text::{self, translate_document};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// One field of one entry, pending translation into one locale
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationEntry {
    pub entry_id: String,
    pub field_name: String,
    /// Source-locale value; `Null` when the field has no source text
    pub value: Value,
    pub source_locale: String,
    pub locale: String,
    pub is_rich_text: bool,
    /// The field already carries a locale besides the source locale
    pub has_existing_translation: bool,
    pub translation: Option<Value>,
    /// Why the last `translate` call failed or only partly succeeded
    pub failure: Option<String>,
}

impl TranslationEntry {
    pub fn new(
        entry_id: &str,
        field_name: &str,
        value: Value,
        source_locale: &str,
        locale: &str,
    ) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            field_name: field_name.to_string(),
            is_rich_text: classifier::is_rich_document(&value),
            value,
            source_locale: source_locale.to_string(),
            locale: locale.to_string(),
            has_existing_translation: false,
            translation: None,
            failure: None,
        }
    }

    pub fn with_existing_translation(mut self, existing: bool) -> Self {
        self.has_existing_translation = existing;
        self
    }

    pub fn field_value(&self) -> FieldValue<'_> {
        FieldValue::decode(&self.value)
    }

    pub fn is_translatable_content(&self, classifier: &Classifier) -> bool {
        classifier.is_translatable_value(&self.field_value())
    }

    pub fn should_translate(&self, classifier: &Classifier) -> bool {
        !self.has_existing_translation
            && !classifier.is_skippable(&self.field_name)
            && self.is_translatable_content(classifier)
    }

    /// Produce `translation` through `translator`
    ///
    /// Returns whether a translation was produced. Fields rejected by
    /// [`should_translate`](Self::should_translate) never reach the provider.
    /// Provider failures never escape: they are recorded in `failure`. A rich
    /// document whose leaves only partly translated still yields a
    /// translation, with the failed leaves left in the source language.
    pub async fn translate(
        &mut self,
        translator: &dyn MachineTranslator,
        classifier: &Classifier,
    ) -> bool {
        self.failure = None;
        if !self.should_translate(classifier) {
            return false;
        }

        if self.is_rich_text {
            let document = match rich_text::parse_document(&self.value) {
                Ok(document) => document,
                Err(err) => {
                    self.failure = Some(format!("Malformed rich text: {}", err));
                    return false;
                }
            };
            let result =
                translate_document(&document, translator, &self.source_locale, &self.locale).await;

            if !result.failed.is_empty() {
                self.failure = Some(format!(
                    "{} rich text segment(s) kept their source text",
                    result.failed.len()
                ));
            }
            return match serde_json::to_value(&result.document) {
                Ok(document) => {
                    self.translation = Some(document);
                    true
                }
                Err(err) => {
                    self.failure = Some(format!("Failed to serialize rich text: {}", err));
                    false
                }
            };
        }

        let Some(text) = self.value.as_str() else {
            return false;
        };
        match translate_text(translator, text, &self.source_locale, &self.locale).await {
            Some(translated) => {
                self.translation = Some(Value::String(translated));
                true
            }
            None => {
                self.failure = Some("Translation failed".to_string());
                false
            }
        }
    }

    /// One-line summary of the source value for logs and listings
    pub fn preview(&self, max_chars: usize) -> String {
        match self.field_value() {
            FieldValue::Text(text) => truncate(text, max_chars),
            FieldValue::RichDocument(_) => "[rich text]".to_string(),
            other => format!("[{}]", other.type_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    Text,
    RichText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    pub field_name: String,
    pub translation: Value,
    pub kind: UpdateKind,
    pub original: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdates {
    pub entry_id: String,
    pub fields: Vec<FieldUpdate>,
}

impl EntryUpdates {
    pub fn field(&self, name: &str) -> Option<&FieldUpdate> {
        self.fields.iter().find(|f| f.field_name == name)
    }
}

/// Translated values grouped by entry, in the order they were produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Updates {
    entries: Vec<EntryUpdates>,
}

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry_id: &str, update: FieldUpdate) {
        match self.entries.iter_mut().find(|e| e.entry_id == entry_id) {
            Some(entry) => entry.fields.push(update),
            None => self.entries.push(EntryUpdates {
                entry_id: entry_id.to_string(),
                fields: vec![update],
            }),
        }
    }

    pub fn get(&self, entry_id: &str) -> Option<&EntryUpdates> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryUpdates> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of field updates across all entries
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.fields.len()).sum()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationBatch {
    pub updates: Updates,
    pub failures: FailureMap,
}

/// Translate every entry in order, one provider call at a time
///
/// Entries that should not be translated are passed over without an update
/// or a failure record.
pub async fn translate_selected(
    entries: &mut [TranslationEntry],
    translator: &dyn MachineTranslator,
    classifier: &Classifier,
) -> TranslationBatch {
    let mut batch = TranslationBatch::default();

    for entry in entries.iter_mut() {
        if !entry.should_translate(classifier) {
            debug!(entry_id = %entry.entry_id, field = %entry.field_name, "not translatable, skipping");
            continue;
        }
        debug!(
            entry_id = %entry.entry_id,
            field = %entry.field_name,
            locale = %entry.locale,
            "translating field"
        );

        if entry.translate(translator, classifier).await {
            if let Some(note) = &entry.failure {
                warn!(entry_id = %entry.entry_id, field = %entry.field_name, "{}", note);
                batch
                    .failures
                    .entry(entry.entry_id.clone())
                    .or_default()
                    .push(FieldFailure::field(
                        &entry.field_name,
                        note,
                        entry.translation.clone(),
                    ));
            }
            if let Some(translation) = entry.translation.clone() {
                batch.updates.push(
                    &entry.entry_id,
                    FieldUpdate {
                        field_name: entry.field_name.clone(),
                        translation,
                        kind: if entry.is_rich_text {
                            UpdateKind::RichText
                        } else {
                            UpdateKind::Text
                        },
                        original: entry.value.clone(),
                    },
                );
            }
        } else {
            let error = entry
                .failure
                .clone()
                .unwrap_or_else(|| "Value is not translatable".to_string());
            warn!(entry_id = %entry.entry_id, field = %entry.field_name, %error, "field not translated");
            batch
                .failures
                .entry(entry.entry_id.clone())
                .or_default()
                .push(FieldFailure::field(&entry.field_name, &error, None));
        }
    }

    batch
}
