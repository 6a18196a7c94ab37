//! Writes translated values back onto entries and saves them as drafts.

use crate::content::client::ContentClient;
use crate::content::model::{ContentType, Entry};
use crate::error::ContentError;
use crate::translation::{EntryUpdates, Updates};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

/// One field (or whole entry) that could not be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFailure {
    /// `None` when the failure concerns the entry as a whole
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub error: String,
    /// The value that was about to be written, kept for manual recovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Value>,
}

impl FieldFailure {
    pub fn field(field_name: &str, error: &str, translation: Option<Value>) -> Self {
        Self {
            field_name: Some(field_name.to_string()),
            error: error.to_string(),
            translation,
        }
    }

    pub fn entry(error: &str) -> Self {
        Self {
            field_name: None,
            error: error.to_string(),
            translation: None,
        }
    }
}

/// Entry id → failures recorded for it
pub type FailureMap = BTreeMap<String, Vec<FieldFailure>>;

/// Add every failure of `other` to `into`
pub fn merge_failures(into: &mut FailureMap, other: FailureMap) {
    for (entry_id, failures) in other {
        into.entry(entry_id).or_default().extend(failures);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub has_changes: bool,
    /// Ids of entries saved successfully, in update order
    pub saved: Vec<String>,
    pub failures: FailureMap,
}

impl ReconcileReport {
    fn fail(&mut self, entry_id: &str, failure: FieldFailure) {
        self.failures
            .entry(entry_id.to_string())
            .or_default()
            .push(failure);
    }
}

pub struct Reconciler<'a> {
    client: &'a dyn ContentClient,
    source_locale: String,
    /// `None` caches a failed lookup so it is not retried
    content_types: HashMap<String, Option<ContentType>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a dyn ContentClient, source_locale: &str) -> Self {
        Self {
            client,
            source_locale: source_locale.to_string(),
            content_types: HashMap::new(),
        }
    }

    /// Apply `updates` for `locale`
    ///
    /// Updates addressed to `root` are written to it in place; every other
    /// entry is fetched live. An entry whose save fails is reset to a fresh
    /// copy, so `root` never carries unsaved local edits afterwards.
    pub async fn apply(&mut self, root: &mut Entry, updates: &Updates, locale: &str) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for entry_updates in updates.iter() {
            let entry_id = entry_updates.entry_id.as_str();

            if entry_id == root.id() {
                self.apply_entry(root, entry_updates, locale, &mut report)
                    .await;
                continue;
            }

            match self.client.get_entry(entry_id).await {
                Ok(Some(mut entry)) => {
                    self.apply_entry(&mut entry, entry_updates, locale, &mut report)
                        .await;
                }
                Ok(None) => {
                    warn!(entry_id, "entry not found during update");
                    report.fail(entry_id, FieldFailure::entry("Entry not found"));
                }
                Err(err) => {
                    error!(entry_id, error = %err, "failed to fetch entry for update");
                    report.fail(entry_id, FieldFailure::entry(&err.to_string()));
                }
            }
        }

        report
    }

    async fn apply_entry(
        &mut self,
        entry: &mut Entry,
        updates: &EntryUpdates,
        locale: &str,
        report: &mut ReconcileReport,
    ) {
        let entry_id = entry.id().to_string();
        let snapshot = entry.fields.clone();
        let mut written = 0;

        for update in &updates.fields {
            let field = update.field_name.as_str();

            if !entry.has_field(field) {
                warn!(entry_id = %entry_id, field, "field not found on entry");
                report.fail(
                    &entry_id,
                    FieldFailure::field(field, "Field not found", Some(update.translation.clone())),
                );
                continue;
            }

            if entry.value(field, locale).is_none() {
                if let Some(source) = entry.value(field, &self.source_locale).cloned() {
                    entry.set_value(field, locale, source);
                }
            }

            if let Some(text) = update.translation.as_str() {
                if let Some(max) = self.max_length(entry, field).await {
                    let length = text.chars().count();
                    if length > max {
                        warn!(entry_id = %entry_id, field, length, max, "translation too long");
                        report.fail(
                            &entry_id,
                            FieldFailure::field(
                                field,
                                &format!("Translation exceeds maximum length of {} characters", max),
                                Some(update.translation.clone()),
                            ),
                        );
                        continue;
                    }
                }
            }

            entry.set_value(field, locale, update.translation.clone());
            written += 1;
            debug!(entry_id = %entry_id, field, locale, "field updated");
        }

        if written == 0 {
            entry.fields = snapshot;
            return;
        }

        match self.client.update_entry(entry).await {
            Ok(saved) => {
                info!(entry_id = %entry_id, locale, fields = written, "entry saved as draft");
                *entry = saved;
                report.has_changes = true;
                report.saved.push(entry_id);
            }
            Err(err) => {
                error!(entry_id = %entry_id, locale, error = %err, "failed to save entry");
                match err {
                    ContentError::Validation(issues) => {
                        for issue in issues {
                            let field = issue.field_name().unwrap_or("unknown");
                            let translation = updates.field(field).map(|u| u.translation.clone());
                            report.fail(
                                &entry_id,
                                FieldFailure::field(field, &issue.details, translation),
                            );
                        }
                    }
                    other => report.fail(&entry_id, FieldFailure::entry(&other.to_string())),
                }
                self.rollback(entry, snapshot).await;
            }
        }
    }

    /// Replace local edits with the stored copy, or the pre-edit fields if
    /// the stored copy cannot be fetched
    async fn rollback(&self, entry: &mut Entry, snapshot: serde_json::Map<String, Value>) {
        match self.client.get_entry(entry.id()).await {
            Ok(Some(fresh)) => {
                debug!(entry_id = entry.id(), "local changes rolled back");
                *entry = fresh;
            }
            Ok(None) => {
                warn!(entry_id = entry.id(), "entry vanished during rollback");
                entry.fields = snapshot;
            }
            Err(err) => {
                warn!(entry_id = entry.id(), error = %err, "refetch failed, restoring local snapshot");
                entry.fields = snapshot;
            }
        }
    }

    async fn max_length(&mut self, entry: &Entry, field: &str) -> Option<usize> {
        let content_type_id = entry.content_type_id()?;

        if !self.content_types.contains_key(content_type_id) {
            let fetched = match self.client.get_content_type(content_type_id).await {
                Ok(content_type) => Some(content_type),
                Err(err) => {
                    warn!(content_type = content_type_id, error = %err, "content type unavailable, skipping length checks");
                    None
                }
            };
            self.content_types
                .insert(content_type_id.to_string(), fetched);
        }

        self.content_types
            .get(content_type_id)?
            .as_ref()?
            .field(field)?
            .max_length()
    }
}
